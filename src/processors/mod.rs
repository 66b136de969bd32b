//! Export workflow stages

pub mod configurations;
pub mod export;
pub mod names;
