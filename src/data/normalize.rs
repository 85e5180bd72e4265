use chrono::NaiveDateTime;

use crate::data::datetime;
use crate::processing::statistics::median;
use crate::state::dataset::Dataset;
use crate::state::trip::{to_count, PaymentType, TripRecord, TripType, WeekOfMonth, Weekday};

/// Trip columns as read from the source, missing values intact.
#[derive(Debug, Clone, Default)]
pub struct RawTrips {
    pub pickup: Vec<Option<NaiveDateTime>>,
    pub dropoff: Vec<Option<NaiveDateTime>>,
    pub passenger_count: Vec<Option<f64>>,
    pub trip_distance: Vec<Option<f64>>,
    pub extra: Vec<Option<f64>>,
    pub mta_tax: Vec<Option<f64>>,
    pub tip_amount: Vec<Option<f64>>,
    pub tolls_amount: Vec<Option<f64>>,
    pub improvement_surcharge: Vec<Option<f64>>,
    pub congestion_surcharge: Vec<Option<f64>>,
    pub total_amount: Vec<Option<f64>>,
    pub payment_type: Vec<Option<f64>>,
    /// `None` when the source has no trip type column.
    pub trip_type: Option<Vec<Option<f64>>>,
}

/// Derive calendar fields, impute gaps and map codes to names.
///
/// Order matters: derived columns are computed from the raw timestamps
/// first, then every numeric column is median-imputed, then whatever is
/// still missing is forward-filled, and only then are codes mapped.
pub fn normalize(raw: RawTrips) -> Dataset {
    let RawTrips {
        mut pickup,
        mut dropoff,
        mut passenger_count,
        mut trip_distance,
        mut extra,
        mut mta_tax,
        mut tip_amount,
        mut tolls_amount,
        mut improvement_surcharge,
        mut congestion_surcharge,
        mut total_amount,
        mut payment_type,
        mut trip_type,
    } = raw;
    let row_count = pickup.len();
    let has_trip_type = trip_type.is_some();

    let mut duration: Vec<Option<f64>> = pickup
        .iter()
        .zip(&dropoff)
        .map(|(p, d)| Some(datetime::minutes_between((*p)?, (*d)?)))
        .collect();

    let mut weekday: Vec<Option<Weekday>> = dropoff.iter().map(|d| d.map(datetime::weekday_of)).collect();
    let mut hour: Vec<Option<f64>> = dropoff
        .iter()
        .map(|d| d.map(|ts| f64::from(datetime::hour_of(ts))))
        .collect();

    let mut day: Vec<Option<f64>> = pickup
        .iter()
        .map(|p| p.map(|ts| f64::from(datetime::day_of_month(ts))))
        .collect();
    let mut week_number: Vec<Option<f64>> = pickup
        .iter()
        .map(|p| p.map(|ts| f64::from(datetime::week_of_month(ts))))
        .collect();
    let mut week: Vec<Option<WeekOfMonth>> = week_number
        .iter()
        .map(|w| w.and_then(to_count).and_then(WeekOfMonth::from_number))
        .collect();

    let mut numeric_columns = vec![
        ("passenger_count", &mut passenger_count),
        ("trip_distance", &mut trip_distance),
        ("extra", &mut extra),
        ("mta_tax", &mut mta_tax),
        ("tip_amount", &mut tip_amount),
        ("tolls_amount", &mut tolls_amount),
        ("improvement_surcharge", &mut improvement_surcharge),
        ("congestion_surcharge", &mut congestion_surcharge),
        ("total_amount", &mut total_amount),
        ("payment_type", &mut payment_type),
        ("trip_duration", &mut duration),
        ("hour_of_day", &mut hour),
        ("day_of_month", &mut day),
        ("week_of_month", &mut week_number),
    ];
    if let Some(codes) = trip_type.as_mut() {
        numeric_columns.push(("trip_type", codes));
    }

    for (name, column) in numeric_columns.iter_mut() {
        let filled = fill_with_median(column.as_mut_slice());
        if filled > 0 {
            tracing::debug!("Imputed {filled} missing values in {name} with the column median");
        }
    }
    for (_, column) in numeric_columns.iter_mut() {
        forward_fill(column.as_mut_slice());
    }
    forward_fill(&mut pickup);
    forward_fill(&mut dropoff);
    forward_fill(&mut weekday);
    forward_fill(&mut week);

    let trips: Vec<TripRecord> = (0..row_count)
        .map(|i| {
            let payment_code = value(&payment_type, i);
            let trip_type_code = trip_type.as_ref().map(|codes| value(codes, i));
            TripRecord {
                pickup_time: pickup[i],
                dropoff_time: dropoff[i],
                trip_distance: value(&trip_distance, i),
                trip_duration: value(&duration, i),
                passenger_count: passenger_count[i].and_then(to_count),
                payment_type_code: payment_code,
                payment_type: PaymentType::from_code(payment_code),
                trip_type_code,
                trip_type: trip_type_code.and_then(TripType::from_code),
                extra: value(&extra, i),
                mta_tax: value(&mta_tax, i),
                tip_amount: value(&tip_amount, i),
                tolls_amount: value(&tolls_amount, i),
                improvement_surcharge: value(&improvement_surcharge, i),
                congestion_surcharge: value(&congestion_surcharge, i),
                total_amount: value(&total_amount, i),
                weekday: weekday[i],
                hour_of_day: hour[i].and_then(to_count),
                day_of_month: day[i].and_then(to_count),
                week_of_month: week_number[i].and_then(to_count),
                week: week[i],
            }
        })
        .collect();

    tracing::info!("Normalized {} trips (trip type present: {has_trip_type})", trips.len());
    Dataset::new(trips, has_trip_type)
}

fn value(column: &[Option<f64>], i: usize) -> f64 {
    column[i].unwrap_or(f64::NAN)
}

/// Replace missing values with the median of the present ones. Returns the
/// number of values filled; a column with no present values is left as is.
pub fn fill_with_median(column: &mut [Option<f64>]) -> usize {
    let present: Vec<f64> = column.iter().flatten().copied().collect();
    let Some(m) = median(&present) else {
        return 0;
    };
    let mut filled = 0;
    for slot in column.iter_mut().filter(|v| v.is_none()) {
        *slot = Some(m);
        filled += 1;
    }
    filled
}

/// Carry the nearest preceding present value forward. Leading gaps stay missing.
pub fn forward_fill<T: Clone>(column: &mut [Option<T>]) {
    let mut last: Option<T> = None;
    for slot in column.iter_mut() {
        if slot.is_some() {
            last = slot.clone();
        } else {
            *slot = last.clone();
        }
    }
}
