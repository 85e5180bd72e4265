pub mod aggregate;
pub mod distributions;
pub mod filter;
pub mod hypothesis;
pub mod statistics;
