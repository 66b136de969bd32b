//! Core client, models and shared plumbing

pub mod api;
pub mod client;
pub mod config;
pub mod credentials;
pub mod errors;
pub mod models;
pub mod retry;
pub mod url;

#[cfg(test)]
pub(crate) mod testing;
