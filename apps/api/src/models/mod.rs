pub mod job;
pub mod resume;
pub mod saved_job;
