//! Anki deck-package access
//!
//! - `.apkg`/`.colpkg` archive extraction of the embedded collection database
//! - Read-only SQLite queries for card ids and raw review-log rows

mod collection;
mod package;

pub use collection::Collection;
pub use package::extract_collection;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeckError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Deck package unreadable: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("No collection database in deck package (expected collection.anki21 or collection.anki2)")]
    MissingCollection,

    #[error("Collection database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, DeckError>;
