//! Point lookups by key and foreign-key following.

use std::future::Future;

use sqlx::postgres::PgRow;
use sqlx::FromRow;

use crate::key::Key;
use crate::plugin::PersistState;

/// A row type stored in a single table with a `BIGINT` primary key.
pub trait Entity: for<'r> FromRow<'r, PgRow> + Send + Unpin + 'static {
    const TABLE: &'static str;
    const PRIMARY_KEY: &'static str = "id";
}

/// Anything that can resolve a key of `E` to at most one row.
pub trait KeyLookup<E: Entity> {
    fn find(&self, key: Key<E>) -> impl Future<Output = Result<Option<E>, sqlx::Error>> + Send;
}

impl<E: Entity> KeyLookup<E> for PersistState {
    fn find(&self, key: Key<E>) -> impl Future<Output = Result<Option<E>, sqlx::Error>> + Send {
        get(self, key)
    }
}

fn select_by_key<E: Entity>() -> String {
    format!("SELECT * FROM {} WHERE {} = $1", E::TABLE, E::PRIMARY_KEY)
}

/// Fetch the row identified by `key`, or `None` if there is none.
pub async fn get<E: Entity>(state: &PersistState, key: Key<E>) -> Result<Option<E>, sqlx::Error> {
    let sql = select_by_key::<E>();
    let found = state
        .run(|pool| {
            let sql = sql.clone();
            async move {
                sqlx::query_as::<_, E>(&sql)
                    .bind(key)
                    .fetch_optional(&pool)
                    .await
            }
        })
        .await?;

    if found.is_none() {
        tracing::debug!(table = E::TABLE, key = %key, "No row for key");
    }
    Ok(found)
}

/// Resolve the entity referenced by `entity` through `project`.
///
/// One read per call. A dangling reference is `Ok(None)`, not an error.
pub async fn follow_foreign_key<A, B, F, L>(
    store: &L,
    entity: &A,
    project: F,
) -> Result<Option<B>, sqlx::Error>
where
    B: Entity,
    F: FnOnce(&A) -> Key<B>,
    L: KeyLookup<B>,
{
    store.find(project(entity)).await
}

/// Like [`follow_foreign_key`] for nullable references.
///
/// A `None` reference short-circuits without touching the database.
pub async fn follow_optional_foreign_key<A, B, F, L>(
    store: &L,
    entity: &A,
    project: F,
) -> Result<Option<B>, sqlx::Error>
where
    B: Entity,
    F: FnOnce(&A) -> Option<Key<B>>,
    L: KeyLookup<B>,
{
    match project(entity) {
        Some(key) => store.find(key).await,
        None => Ok(None),
    }
}
