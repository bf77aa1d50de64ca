//! Entry domain module.
//!
//! An entry is one uploaded image plus its metadata, persisted in the JSON index file.
//!
//! - `model`: `Entry`, `EntryField`, `EntryPatch`
//! - `collection`: pure operations over the decoded index
//! - `path`: image path derivation

mod collection;
mod model;
mod path;

pub use collection::{
    compute_next_id, decode_entries, delete_by_id, encode_entries, find_by_image_path,
    find_image_path_by_id, insert_at_head, update_by_id,
};
pub use model::{Entry, EntryField, EntryPatch};
pub use path::{ImageLayout, ImagePath};
