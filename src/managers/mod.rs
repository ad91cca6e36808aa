pub mod bridge;
pub mod operations;
