//! Response bodies returned by the REST endpoints.

use serde::Serialize;

pub mod activities;
pub mod contacts;
pub mod deals;
pub mod health;
pub mod tasks;
pub mod users;

/// `{"message": ...}` acknowledgement.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
