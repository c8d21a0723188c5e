pub mod asset;
pub mod schedule;
pub mod task;
pub mod template;
