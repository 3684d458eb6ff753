use std::fs::File;
use std::io;
use std::path::Path;

use tempfile::NamedTempFile;
use zip::ZipArchive;

use super::{DeckError, Result};

/// Collection entry names in preference order. Anki 2.1+ exports the real
/// data as `collection.anki21` and keeps a stub `collection.anki2` for
/// older clients, so the newer entry must win when both are present.
const COLLECTION_ENTRIES: [&str; 2] = ["collection.anki21", "collection.anki2"];

/// Extract the collection database from a deck package into a temporary
/// file. The file deletes itself when the handle drops, so the caller must
/// keep it alive for as long as the database is open.
pub fn extract_collection(deck: &Path) -> Result<NamedTempFile> {
    let file = File::open(deck)?;
    let mut archive = ZipArchive::new(file)?;

    let index = COLLECTION_ENTRIES
        .iter()
        .find_map(|name| archive.index_for_name(name))
        .ok_or(DeckError::MissingCollection)?;

    let mut entry = archive.by_index(index)?;
    let mut database = NamedTempFile::new()?;
    let bytes = io::copy(&mut entry, &mut database)?;
    log::debug!(
        "extracted {} ({} bytes) from {}",
        entry.name(),
        bytes,
        deck.display()
    );

    Ok(database)
}
