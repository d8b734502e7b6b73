//! Book lookups and the authors they reference.

use axum::{extract::State, Json};

use crate::errors::{ApiResponse, PersistError};
use crate::extract::KeyPath;
use crate::follow;
use crate::models::catalog::{Author, Book};
use crate::plugin::PersistState;

async fn find_book(state: &PersistState, KeyPath(id): KeyPath<Book>) -> Result<Book, PersistError> {
    follow::get(state, id)
        .await?
        .ok_or_else(|| PersistError::NotFound(format!("Book {id} not found")))
}

/// GET /api/v1/books/{id} — get book by ID.
pub async fn get_by_id(
    State(state): State<PersistState>,
    id: KeyPath<Book>,
) -> Result<Json<ApiResponse<Book>>, PersistError> {
    let book = find_book(&state, id).await?;
    Ok(ApiResponse::success(book))
}

/// GET /api/v1/books/{id}/author — follow the author reference.
///
/// A book whose author row is gone yields `data: null` rather than 404.
pub async fn author(
    State(state): State<PersistState>,
    id: KeyPath<Book>,
) -> Result<Json<ApiResponse<Option<Author>>>, PersistError> {
    let book = find_book(&state, id).await?;
    let author = follow::follow_foreign_key(&state, &book, |b| b.author_id).await?;
    Ok(ApiResponse::success(author))
}

/// GET /api/v1/books/{id}/editor — follow the optional editor reference.
pub async fn editor(
    State(state): State<PersistState>,
    id: KeyPath<Book>,
) -> Result<Json<ApiResponse<Option<Author>>>, PersistError> {
    let book = find_book(&state, id).await?;
    let editor = follow::follow_optional_foreign_key(&state, &book, |b| b.editor_id).await?;
    Ok(ApiResponse::success(editor))
}
