//! Data models.

pub mod config;
pub mod invoice;
pub mod receipt;
