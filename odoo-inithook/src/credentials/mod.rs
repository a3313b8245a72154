// Admin credential derivation and dual-sink synchronization

pub mod hash;
pub mod sync;
