pub mod log_event;
pub mod report;
pub mod validation;
