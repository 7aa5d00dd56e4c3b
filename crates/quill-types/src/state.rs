//! Closed sets of results an action can hand back to the client.
//!
//! Every variant serializes as `{"status": "<snake_case>"}` so form clients can
//! switch on a single field.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoginActionState {
    #[default]
    Idle,
    InProgress,
    Success,
    Failed,
    InvalidData,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RegisterActionState {
    #[default]
    Idle,
    InProgress,
    Success,
    Failed,
    UserExists,
    InvalidData,
}

/// Result of the chat, vote and document actions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ActionState {
    #[default]
    Idle,
    Success,
    Failed,
    InvalidData,
    NotFound,
    RateLimited,
}
