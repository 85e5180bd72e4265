pub mod dataset;
pub mod trip;
