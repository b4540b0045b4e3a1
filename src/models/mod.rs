//! Database models shared across the CRM repository.

pub mod activity;
pub mod config;
pub mod contact;
pub mod deal;
pub mod user;
pub mod zmq;
