pub mod cycle_report;
pub mod mappers;
pub mod selector;
pub mod task;
