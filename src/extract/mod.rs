//! Axum extractors for entity keys.

use axum::{
    extract::{FromRequestParts, Path},
    http::request::Parts,
};

use crate::errors::PersistError;
use crate::key::Key;

/// Entity key taken from the single path parameter of a route.
///
/// ```ignore
/// async fn handler(KeyPath(id): KeyPath<Book>) -> impl IntoResponse { ... }
/// ```
/// Anything that is not a decimal id is rejected with 400 before the handler runs.
#[derive(Debug)]
pub struct KeyPath<E>(pub Key<E>);

impl<S, E> FromRequestParts<S> for KeyPath<E>
where
    S: Send + Sync,
{
    type Rejection = PersistError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| PersistError::Validation(e.body_text()))?;

        let key = Key::parse_text(&raw)?;
        Ok(KeyPath(key))
    }
}
