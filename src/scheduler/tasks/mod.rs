pub mod collectors;
pub mod minute;
