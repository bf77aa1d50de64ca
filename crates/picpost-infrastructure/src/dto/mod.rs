//! Wire-format DTOs for the external platforms.
//!
//! These mirror the JSON shapes of the GitHub REST API and the Slack Events / interactivity
//! payloads. Conversion into domain types happens here so nothing upstream sees them.

pub mod github;
pub mod slack;
