//! Session domain module.
//!
//! A session tracks one conversation thread through the upload wizard.
//!
//! - `model`: `Session`, `SessionState` and the per-state TTL policy
//! - `store`: the TTL-bearing persistence contract

mod model;
mod store;

pub use model::{PendingImage, Session, SessionState, SessionTtl, TtlBucket};
pub use store::SessionStore;
