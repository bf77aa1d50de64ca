//! Pure operations over the decoded entry index.
//!
//! None of these functions perform I/O or fail; unknown ids leave the collection untouched.
//! The collection is kept newest-first.

use super::model::{Entry, EntryPatch};
use crate::error::Result;

/// `max(id) + 1`, or 1 for an empty collection.
pub fn compute_next_id(entries: &[Entry]) -> u64 {
    entries.iter().map(|e| e.id).max().map_or(1, |max| max + 1)
}

pub fn insert_at_head(mut entries: Vec<Entry>, entry: Entry) -> Vec<Entry> {
    entries.insert(0, entry);
    entries
}

pub fn update_by_id(mut entries: Vec<Entry>, id: u64, patch: &EntryPatch) -> Vec<Entry> {
    if let Some(entry) = entries.iter_mut().find(|e| e.id == id) {
        patch.apply(entry);
    }
    entries
}

pub fn delete_by_id(mut entries: Vec<Entry>, id: u64) -> Vec<Entry> {
    entries.retain(|e| e.id != id);
    entries
}

pub fn find_image_path_by_id(entries: &[Entry], id: u64) -> Option<&str> {
    entries
        .iter()
        .find(|e| e.id == id)
        .map(|e| e.image_path.as_str())
}

pub fn find_by_image_path<'a>(entries: &'a [Entry], image_path: &str) -> Option<&'a Entry> {
    entries.iter().find(|e| e.image_path == image_path)
}

/// Decodes index file content.
pub fn decode_entries(bytes: &[u8]) -> Result<Vec<Entry>> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Encodes the index as pretty-printed JSON with a trailing newline.
pub fn encode_entries(entries: &[Entry]) -> Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(entries)?;
    bytes.push(b'\n');
    Ok(bytes)
}
