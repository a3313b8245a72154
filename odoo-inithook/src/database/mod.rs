// Database lifecycle (PostgreSQL)

pub mod connection;
pub mod lifecycle;
pub mod provisioning;
