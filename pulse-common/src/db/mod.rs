//! Database initialization, schema, and canonical record models

pub mod init;
pub mod models;

pub use init::*;
pub use models::*;
