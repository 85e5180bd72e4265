//! Data pipeline behind the NYC taxi trip dashboard: load and normalize a
//! trip file, filter it, aggregate the view and run hypothesis tests.

pub mod cli;
pub mod data;
pub mod error;
pub mod processing;
pub mod report;
pub mod state;

pub use error::{CriteriaError, ExportError, LoadError};
pub use processing::filter::{Selection, Subset, TestCriteria, ViewCriteria};
pub use report::{build_report, DashboardReport};
pub use state::dataset::{Dataset, DatasetService};
pub use state::trip::{PaymentType, TripRecord, TripType, WeekOfMonth, Weekday};
