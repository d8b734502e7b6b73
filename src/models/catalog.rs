//! Authors and the books that reference them.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::follow::Entity;
use crate::key::Key;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Author {
    pub id: Key<Author>,
    pub name: String,
}

impl Entity for Author {
    const TABLE: &'static str = "authors";
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Book {
    pub id: Key<Book>,
    pub title: String,
    pub author_id: Key<Author>,
    pub editor_id: Option<Key<Author>>,
}

impl Entity for Book {
    const TABLE: &'static str = "books";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn book_serializes_keys_as_integers() {
        let book = Book {
            id: Key::new(1),
            title: "Dune".to_string(),
            author_id: Key::new(7),
            editor_id: None,
        };
        let json = serde_json::to_value(&book).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["author_id"], 7);
        assert!(json["editor_id"].is_null());
    }

    #[test]
    fn book_round_trip() {
        let json = r#"{"id":3,"title":"Emma","author_id":4,"editor_id":5}"#;
        let book: Book = serde_json::from_str(json).unwrap();
        assert_eq!(book.editor_id, Some(Key::new(5)));
        assert_eq!(serde_json::to_string(&book).unwrap(), json);
    }
}
