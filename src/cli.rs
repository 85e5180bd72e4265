//! Command-line arguments for taxiscope

use std::path::PathBuf;

use clap::Parser;

use crate::processing::filter::{Selection, TestCriteria, ViewCriteria};
use crate::state::dataset::Dataset;
use crate::state::trip::{PaymentType, TripType, WeekOfMonth, Weekday};

#[derive(Parser, Debug)]
#[command(name = "taxiscope")]
#[command(version)]
#[command(about = "Filter, summarize and test NYC taxi trip data", long_about = None)]
pub struct Cli {
    /// Trip data file (.parquet, .pq or .csv)
    #[arg(
        long,
        env = "TAXISCOPE_DATA",
        value_name = "PATH",
        default_value = "green_tripdata_2023-08.parquet"
    )]
    pub data: PathBuf,

    /// Week of month for the view (e.g. "2nd Week" or 2); all weeks when omitted
    #[arg(long, value_name = "WEEK")]
    pub week: Option<WeekOfMonth>,

    /// Day of week for the view
    #[arg(long, value_name = "DAY", default_value = "Monday")]
    pub weekday: Weekday,

    /// Payment type for the view
    #[arg(long, value_name = "TYPE", default_value = "Credit Card")]
    pub payment: PaymentType,

    /// Passenger count for the view (default: smallest count in the data)
    #[arg(long = "passengers", value_name = "N")]
    pub passengers: Option<u32>,

    /// Trip type for the view (default: Street-hail when the data has trip types)
    #[arg(long = "trip-type", value_name = "TYPE")]
    pub trip_type: Option<TripType>,

    /// Dropoff hour for the view, 0-23 (default: smallest hour in the data)
    #[arg(long, value_name = "HOUR", value_parser = clap::value_parser!(u32).range(0..24))]
    pub hour: Option<u32>,

    /// Day of week for the hypothesis tests, or "All"
    #[arg(long = "test-weekday", value_name = "DAY", default_value = "All")]
    pub test_weekday: Selection<Weekday>,

    /// Payment type for the hypothesis tests, or "All"
    #[arg(long = "test-payment", value_name = "TYPE", default_value = "All")]
    pub test_payment: Selection<PaymentType>,

    /// Week of month for the hypothesis tests, or "All"
    #[arg(long = "test-week", value_name = "WEEK", default_value = "All")]
    pub test_week: Selection<WeekOfMonth>,

    /// Write the filtered view as CSV to this path
    #[arg(long, value_name = "PATH")]
    pub export: Option<PathBuf>,

    /// Print single-line JSON instead of pretty JSON
    #[arg(long)]
    pub compact: bool,

    /// Seed for the scatter sample
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,
}

impl Cli {
    /// Resolve the view selection, filling unset dropdowns with the first option the data offers.
    pub fn view_criteria(&self, dataset: &Dataset) -> ViewCriteria {
        let trip_type = if dataset.has_trip_type() {
            Some(self.trip_type.unwrap_or(TripType::StreetHail))
        } else {
            self.trip_type
        };

        ViewCriteria {
            week: self.week,
            weekday: self.weekday,
            payment: self.payment,
            passenger_count: self
                .passengers
                .or_else(|| dataset.passenger_counts().first().copied())
                .unwrap_or(1),
            trip_type,
            hour_of_day: self.hour.or_else(|| dataset.hours().first().copied()).unwrap_or(0),
        }
    }

    pub fn test_criteria(&self) -> TestCriteria {
        TestCriteria {
            weekday: self.test_weekday,
            payment: self.test_payment,
            week: self.test_week,
        }
    }
}
