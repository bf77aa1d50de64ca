//! Application layer for picpost.
//!
//! Use cases that coordinate the domain traits: the atomic commit engine that keeps images
//! and the entry index consistent, the conversation flow controller, and the intake gate
//! that deduplicates inbound events.

pub mod commit_engine;
pub mod dedup;
pub mod flow;
pub mod intake;

pub use commit_engine::{AtomicCommitEngine, CommitOutcome, EntryChange};
pub use dedup::DedupCache;
pub use flow::FlowController;
pub use intake::{Acknowledgement, EventIntake};
