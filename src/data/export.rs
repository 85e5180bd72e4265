use std::io::Write;
use std::path::Path;

use crate::data::datetime::format_timestamp;
use crate::error::ExportError;
use crate::state::trip::TripRecord;

const HEADER: &[&str] = &[
    "pickup_datetime",
    "dropoff_datetime",
    "passenger_count",
    "trip_distance",
    "payment_type",
    "payment_type_name",
    "extra",
    "mta_tax",
    "tip_amount",
    "tolls_amount",
    "improvement_surcharge",
    "congestion_surcharge",
    "total_amount",
    "trip_duration",
    "weekday",
    "hour_of_day",
    "day_of_month",
    "week_of_month",
    "week",
];

/// Trip type code and label, written after the payment columns when the dataset has them.
const TRIP_TYPE_HEADER: [&str; 2] = ["trip_type", "trip_type_name"];
const TRIP_TYPE_POSITION: usize = 6;

fn number(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        value.to_string()
    }
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn header(has_trip_type: bool) -> Vec<&'static str> {
    let mut header = HEADER.to_vec();
    if has_trip_type {
        header.splice(TRIP_TYPE_POSITION..TRIP_TYPE_POSITION, TRIP_TYPE_HEADER);
    }
    header
}

fn record(trip: &TripRecord, has_trip_type: bool) -> Vec<String> {
    let mut fields = vec![
        optional(trip.pickup_time.map(format_timestamp)),
        optional(trip.dropoff_time.map(format_timestamp)),
        optional(trip.passenger_count),
        number(trip.trip_distance),
        number(trip.payment_type_code),
        optional(trip.payment_type),
        number(trip.extra),
        number(trip.mta_tax),
        number(trip.tip_amount),
        number(trip.tolls_amount),
        number(trip.improvement_surcharge),
        number(trip.congestion_surcharge),
        number(trip.total_amount),
        number(trip.trip_duration),
        optional(trip.weekday),
        optional(trip.hour_of_day),
        optional(trip.day_of_month),
        optional(trip.week_of_month),
        optional(trip.week),
    ];
    if has_trip_type {
        fields.splice(
            TRIP_TYPE_POSITION..TRIP_TYPE_POSITION,
            [
                trip.trip_type_code.map(number).unwrap_or_default(),
                optional(trip.trip_type),
            ],
        );
    }
    fields
}

/// Write rows as CSV with a header. Missing values become empty fields.
/// Payment and trip type are written as source codes next to their labels,
/// so the file loads back through `load_dataset`.
pub fn write_csv<'a, W: Write>(
    writer: W,
    rows: impl IntoIterator<Item = &'a TripRecord>,
    has_trip_type: bool,
) -> Result<usize, ExportError> {
    let mut out = csv::Writer::from_writer(writer);

    out.write_record(header(has_trip_type))?;

    let mut written = 0;
    for trip in rows {
        out.write_record(record(trip, has_trip_type))?;
        written += 1;
    }
    out.flush()?;
    Ok(written)
}

pub fn to_csv_bytes<'a>(
    rows: impl IntoIterator<Item = &'a TripRecord>,
    has_trip_type: bool,
) -> Result<Vec<u8>, ExportError> {
    let mut buffer = Vec::new();
    write_csv(&mut buffer, rows, has_trip_type)?;
    Ok(buffer)
}

pub fn write_csv_file<'a>(
    path: &Path,
    rows: impl IntoIterator<Item = &'a TripRecord>,
    has_trip_type: bool,
) -> Result<usize, ExportError> {
    let file = std::fs::File::create(path)?;
    let written = write_csv(std::io::BufWriter::new(file), rows, has_trip_type)?;
    tracing::info!("Exported {written} rows to {:?}", path);
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::load_dataset;
    use crate::data::loader::tests::{write_fixture, THREE_TRIPS_CSV};
    use crate::processing::filter::tests::trip;
    use crate::state::trip::{PaymentType, TripType, Weekday};
    use proptest::prelude::*;

    fn read_back(bytes: &[u8]) -> Vec<std::collections::HashMap<String, String>> {
        let mut reader = csv::Reader::from_reader(bytes);
        let header: Vec<String> = reader.headers().unwrap().iter().map(str::to_string).collect();
        reader
            .records()
            .map(|r| header.iter().cloned().zip(r.unwrap().iter().map(str::to_string)).collect())
            .collect()
    }

    #[test]
    fn header_codes_and_labels() {
        let rows = [trip(Weekday::Monday, 3, PaymentType::CreditCard, None, 10.0)];
        let bytes = to_csv_bytes(&rows, false).unwrap();

        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        let names: Vec<String> = reader.headers().unwrap().iter().map(str::to_string).collect();
        assert_eq!(names, HEADER.to_vec());

        let records = read_back(&bytes);
        assert_eq!(records.len(), 1);
        let row = &records[0];
        assert_eq!(row["pickup_datetime"], "2023-08-03 09:00:00");
        assert_eq!(row["passenger_count"], "1");
        assert_eq!(row["payment_type"], "1");
        assert_eq!(row["payment_type_name"], "Credit Card");
        assert_eq!(row["total_amount"], "10");
        assert_eq!(row["weekday"], "Monday");
        assert_eq!(row["week"], "1st Week");
    }

    #[test]
    fn trip_type_columns_only_when_present() {
        let rows = [trip(Weekday::Friday, 9, PaymentType::Cash, Some(TripType::Dispatch), 5.0)];
        let with = read_back(&to_csv_bytes(&rows, true).unwrap());
        let row = &with[0];
        assert_eq!(row["trip_type"], "2");
        assert_eq!(row["trip_type_name"], "Dispatch");
        assert_eq!(row["payment_type"], "2");
        assert_eq!(row["payment_type_name"], "Cash");

        let names = header(true);
        assert_eq!(&names[TRIP_TYPE_POSITION..TRIP_TYPE_POSITION + 2], TRIP_TYPE_HEADER);
        assert_eq!(names.len(), HEADER.len() + 2);

        let without = to_csv_bytes(&rows, false).unwrap();
        assert!(!read_back(&without)[0].contains_key("trip_type"));
    }

    #[test]
    fn missing_values_are_empty_fields() {
        let mut row = trip(Weekday::Monday, 3, PaymentType::NoCharge, None, 10.0);
        row.pickup_time = None;
        row.passenger_count = None;
        row.payment_type = None;
        row.payment_type_code = f64::NAN;
        row.trip_distance = f64::NAN;
        let records = read_back(&to_csv_bytes([&row], false).unwrap());
        let record = &records[0];
        assert_eq!(record["pickup_datetime"], "");
        assert_eq!(record["passenger_count"], "");
        assert_eq!(record["trip_distance"], "");
        assert_eq!(record["payment_type"], "");
        assert_eq!(record["payment_type_name"], "");
    }

    #[test]
    fn exported_file_loads_back_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        // Fractional dropoff seconds must survive as well.
        let source = THREE_TRIPS_CSV.replace(":00,N,", ":00.000250,N,");
        let source_path = write_fixture(dir.path(), "trips.csv", &source);
        let original = load_dataset(&source_path).unwrap();

        let export_path = dir.path().join("filtered.csv");
        assert_eq!(write_csv_file(&export_path, original.trips(), true).unwrap(), 3);

        let reloaded = load_dataset(&export_path).unwrap();
        assert!(reloaded.has_trip_type());
        assert_eq!(reloaded.trips(), original.trips());
        assert_eq!(reloaded.trips()[1].payment_type, Some(PaymentType::Cash));
        assert_eq!(reloaded.trips()[1].trip_type, Some(TripType::Dispatch));
        assert!(reloaded.trips()[0].trip_duration > 15.0);
    }

    #[test]
    fn export_without_trip_type_loads_back_without_it() {
        let dir = tempfile::tempdir().unwrap();
        let rows = [
            trip(Weekday::Monday, 3, PaymentType::CreditCard, None, 10.0),
            trip(Weekday::Tuesday, 4, PaymentType::Cash, None, 12.5),
        ];
        let path = dir.path().join("filtered.csv");
        assert_eq!(write_csv_file(&path, &rows, false).unwrap(), 2);

        let reloaded = load_dataset(&path).unwrap();
        assert!(!reloaded.has_trip_type());
        let totals: Vec<f64> = reloaded.trips().iter().map(|t| t.total_amount).collect();
        assert_eq!(totals, vec![10.0, 12.5]);
        let payments: Vec<_> = reloaded.trips().iter().map(|t| t.payment_type).collect();
        assert_eq!(payments, vec![Some(PaymentType::CreditCard), Some(PaymentType::Cash)]);
    }

    #[test]
    fn unwritable_path_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.csv");
        let err = write_csv_file(&path, std::iter::empty(), false).unwrap_err();
        assert!(matches!(err, ExportError::Io(_)));
    }

    proptest! {
        #[test]
        fn totals_survive_export(totals in prop::collection::vec(0.0f64..500.0, 0..40)) {
            let rows: Vec<TripRecord> = totals
                .iter()
                .map(|&t| trip(Weekday::Sunday, 20, PaymentType::Cash, None, t))
                .collect();
            let records = read_back(&to_csv_bytes(&rows, false).unwrap());
            prop_assert_eq!(records.len(), totals.len());
            for (record, total) in records.iter().zip(&totals) {
                prop_assert_eq!(record["total_amount"].parse::<f64>().unwrap(), *total);
            }
        }
    }
}
