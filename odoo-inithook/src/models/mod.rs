pub mod intent;
pub mod report;
