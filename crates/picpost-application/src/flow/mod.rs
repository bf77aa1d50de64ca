//! Conversation flow.
//!
//! - `controller`: the wizard state machine
//! - `messages`: the reply sent for each transition

mod controller;
pub mod messages;

pub use controller::FlowController;
