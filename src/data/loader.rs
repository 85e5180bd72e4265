use std::fs::File;
use std::path::Path;

use chrono::NaiveDateTime;
use polars::prelude::*;

use crate::data::datetime;
use crate::data::normalize::{self, RawTrips};
use crate::error::LoadError;
use crate::state::dataset::Dataset;

pub const PICKUP_COLUMNS: &[&str] = &["lpep_pickup_datetime", "tpep_pickup_datetime", "pickup_datetime"];
pub const DROPOFF_COLUMNS: &[&str] = &["lpep_dropoff_datetime", "tpep_dropoff_datetime", "dropoff_datetime"];

/// Source columns discarded before any derivation.
pub const DROPPED_COLUMNS: &[&str] = &["ehail_fee", "fare_amount"];

pub const TRIP_TYPE_COLUMN: &str = "trip_type";

/// Read, normalize and return the trip table at `path`.
pub fn load_dataset(path: &Path) -> Result<Dataset, LoadError> {
    let frame = read_frame(path)?;
    tracing::info!(
        "Read {} rows x {} columns from {:?}",
        frame.height(),
        frame.width(),
        path
    );
    let raw = extract_trips(&frame)?;
    Ok(normalize::normalize(raw))
}

/// Read a Parquet or CSV file into a polars frame, dispatching on extension.
pub fn read_frame(path: &Path) -> Result<DataFrame, LoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    let io_error = |source: std::io::Error| LoadError::Io {
        path: path.to_path_buf(),
        source,
    };

    match ext.as_str() {
        "parquet" | "pq" => {
            let file = File::open(path).map_err(io_error)?;
            Ok(ParquetReader::new(file).finish()?)
        }
        "csv" => {
            // Open first so a missing file surfaces as an i/o error, not a parse error.
            File::open(path).map_err(io_error)?;
            let frame = CsvReadOptions::default()
                .with_has_header(true)
                .try_into_reader_with_file_path(Some(path.to_path_buf()))?
                .finish()?;
            Ok(frame)
        }
        _ => Err(LoadError::UnsupportedFormat(ext)),
    }
}

/// Pull the trip record columns out of a frame, keeping missing values.
pub fn extract_trips(frame: &DataFrame) -> Result<RawTrips, LoadError> {
    let names: Vec<String> = frame
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    let has = |name: &str| names.iter().any(|n| n == name);

    for dropped in DROPPED_COLUMNS.iter().filter(|c| has(**c)) {
        tracing::debug!("Dropping source column {dropped}");
    }

    let pick = |aliases: &[&str]| -> Result<String, LoadError> {
        aliases
            .iter()
            .find(|alias| has(**alias))
            .map(|alias| alias.to_string())
            .ok_or_else(|| LoadError::MissingColumn(aliases[0].to_string()))
    };
    let pickup_column = pick(PICKUP_COLUMNS)?;
    let dropoff_column = pick(DROPOFF_COLUMNS)?;

    let numeric = |name: &str| -> Result<Vec<Option<f64>>, LoadError> {
        if !has(name) {
            return Err(LoadError::MissingColumn(name.to_string()));
        }
        numeric_column(frame, name)
    };

    let trip_type = if has(TRIP_TYPE_COLUMN) {
        Some(numeric_column(frame, TRIP_TYPE_COLUMN)?)
    } else {
        tracing::info!("No {TRIP_TYPE_COLUMN} column; trip type filters and tests are disabled");
        None
    };

    Ok(RawTrips {
        pickup: timestamp_column(frame, &pickup_column)?,
        dropoff: timestamp_column(frame, &dropoff_column)?,
        passenger_count: numeric("passenger_count")?,
        trip_distance: numeric("trip_distance")?,
        extra: numeric("extra")?,
        mta_tax: numeric("mta_tax")?,
        tip_amount: numeric("tip_amount")?,
        tolls_amount: numeric("tolls_amount")?,
        improvement_surcharge: numeric("improvement_surcharge")?,
        congestion_surcharge: numeric("congestion_surcharge")?,
        total_amount: numeric("total_amount")?,
        payment_type: numeric("payment_type")?,
        trip_type,
    })
}

fn numeric_column(frame: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, LoadError> {
    let series = frame
        .column(name)?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    let values = series.f64()?.into_iter().collect();
    Ok(values)
}

fn timestamp_column(frame: &DataFrame, name: &str) -> Result<Vec<Option<NaiveDateTime>>, LoadError> {
    let series = frame.column(name)?.as_materialized_series();
    match series.dtype() {
        DataType::Datetime(_, _) | DataType::Date => {
            let micros = series
                .cast(&DataType::Datetime(TimeUnit::Microseconds, None))?
                .cast(&DataType::Int64)?;
            let values = micros
                .i64()?
                .into_iter()
                .map(|v| v.and_then(datetime::from_epoch_micros))
                .collect();
            Ok(values)
        }
        DataType::String => {
            let text: Vec<Option<&str>> = series.str()?.into_iter().collect();
            if text.iter().all(Option::is_none) {
                return Ok(vec![None; text.len()]);
            }
            datetime::parse_column(&text)
                .ok_or_else(|| LoadError::UndetectedTimestampFormat(name.to_string()))
        }
        DataType::Null => Ok(vec![None; series.len()]),
        other => Err(LoadError::ColumnType {
            column: name.to_string(),
            dtype: other.to_string(),
        }),
    }
}
