pub mod datetime;
pub mod export;
pub mod loader;
pub mod normalize;
