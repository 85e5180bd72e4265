use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Day of the week, ordered Monday first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
            Weekday::Sunday => "Sunday",
        }
    }

    /// Position in the Monday-first ordering.
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl From<chrono::Weekday> for Weekday {
    fn from(day: chrono::Weekday) -> Self {
        match day {
            chrono::Weekday::Mon => Weekday::Monday,
            chrono::Weekday::Tue => Weekday::Tuesday,
            chrono::Weekday::Wed => Weekday::Wednesday,
            chrono::Weekday::Thu => Weekday::Thursday,
            chrono::Weekday::Fri => Weekday::Friday,
            chrono::Weekday::Sat => Weekday::Saturday,
            chrono::Weekday::Sun => Weekday::Sunday,
        }
    }
}

impl FromStr for Weekday {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Weekday::ALL
            .iter()
            .copied()
            .find(|d| {
                let label = d.label().to_lowercase();
                label == lower || (lower.len() >= 3 && label.starts_with(&lower))
            })
            .ok_or_else(|| format!("Unknown weekday: {s}"))
    }
}

/// Seven-day bucket of the month, counted from day 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WeekOfMonth {
    #[serde(rename = "1st Week")]
    First,
    #[serde(rename = "2nd Week")]
    Second,
    #[serde(rename = "3rd Week")]
    Third,
    #[serde(rename = "4th Week")]
    Fourth,
    #[serde(rename = "5th Week")]
    Fifth,
}

impl WeekOfMonth {
    pub const ALL: [WeekOfMonth; 5] = [
        WeekOfMonth::First,
        WeekOfMonth::Second,
        WeekOfMonth::Third,
        WeekOfMonth::Fourth,
        WeekOfMonth::Fifth,
    ];

    /// Week number for a day of the month: days 1-7 are week 1, 8-14 week 2, and so on.
    pub fn number_for_day(day_of_month: u32) -> u32 {
        (day_of_month.saturating_sub(1) / 7) + 1
    }

    /// Ordinal for a week number. Only 1 through 5 have a label.
    pub fn from_number(week: u32) -> Option<Self> {
        match week {
            1 => Some(WeekOfMonth::First),
            2 => Some(WeekOfMonth::Second),
            3 => Some(WeekOfMonth::Third),
            4 => Some(WeekOfMonth::Fourth),
            5 => Some(WeekOfMonth::Fifth),
            _ => None,
        }
    }

    pub fn number(&self) -> u32 {
        *self as u32 + 1
    }

    pub fn label(&self) -> &'static str {
        match self {
            WeekOfMonth::First => "1st Week",
            WeekOfMonth::Second => "2nd Week",
            WeekOfMonth::Third => "3rd Week",
            WeekOfMonth::Fourth => "4th Week",
            WeekOfMonth::Fifth => "5th Week",
        }
    }

    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl FromStr for WeekOfMonth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(n) = trimmed.parse::<u32>() {
            return WeekOfMonth::from_number(n).ok_or_else(|| format!("Unknown week: {s}"));
        }
        let lower = trimmed.to_lowercase();
        WeekOfMonth::ALL
            .iter()
            .copied()
            .find(|w| {
                let label = w.label().to_lowercase();
                label == lower || label.split(' ').next() == Some(lower.as_str())
            })
            .ok_or_else(|| format!("Unknown week: {s}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PaymentType {
    #[serde(rename = "Credit Card")]
    CreditCard,
    Cash,
    #[serde(rename = "No Charge")]
    NoCharge,
}

impl PaymentType {
    pub const ALL: [PaymentType; 3] = [PaymentType::CreditCard, PaymentType::Cash, PaymentType::NoCharge];

    /// Map a raw payment code. Codes outside 1..=3 (and non-integral values) have no name.
    pub fn from_code(code: f64) -> Option<Self> {
        match code_to_int(code)? {
            1 => Some(PaymentType::CreditCard),
            2 => Some(PaymentType::Cash),
            3 => Some(PaymentType::NoCharge),
            _ => None,
        }
    }

    pub fn code(&self) -> i64 {
        *self as i64 + 1
    }

    pub fn label(&self) -> &'static str {
        match self {
            PaymentType::CreditCard => "Credit Card",
            PaymentType::Cash => "Cash",
            PaymentType::NoCharge => "No Charge",
        }
    }
}

impl FromStr for PaymentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        match normalized.as_str() {
            "creditcard" | "credit" | "card" | "1" => Ok(PaymentType::CreditCard),
            "cash" | "2" => Ok(PaymentType::Cash),
            "nocharge" | "free" | "3" => Ok(PaymentType::NoCharge),
            _ => Err(format!("Unknown payment type: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TripType {
    #[serde(rename = "Street-hail")]
    StreetHail,
    Dispatch,
}

impl TripType {
    pub const ALL: [TripType; 2] = [TripType::StreetHail, TripType::Dispatch];

    pub fn from_code(code: f64) -> Option<Self> {
        match code_to_int(code)? {
            1 => Some(TripType::StreetHail),
            2 => Some(TripType::Dispatch),
            _ => None,
        }
    }

    pub fn code(&self) -> i64 {
        *self as i64 + 1
    }

    pub fn label(&self) -> &'static str {
        match self {
            TripType::StreetHail => "Street-hail",
            TripType::Dispatch => "Dispatch",
        }
    }
}

impl FromStr for TripType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        match normalized.as_str() {
            "streethail" | "street" | "hail" | "1" => Ok(TripType::StreetHail),
            "dispatch" | "2" => Ok(TripType::Dispatch),
            _ => Err(format!("Unknown trip type: {s}")),
        }
    }
}

macro_rules! display_label {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        })*
    };
}

display_label!(Weekday, WeekOfMonth, PaymentType, TripType);

/// Exact integer value of an imputed numeric field, if it has one.
pub(crate) fn code_to_int(value: f64) -> Option<i64> {
    if value.is_finite() && value.fract() == 0.0 {
        Some(value as i64)
    } else {
        None
    }
}

/// Non-negative integral value as `u32`.
pub(crate) fn to_count(value: f64) -> Option<u32> {
    code_to_int(value).and_then(|v| u32::try_from(v).ok())
}

/// One normalized taxi trip.
///
/// Numeric fields hold `NaN` only when their whole source column was empty.
/// Integral attributes are `None` when missing or when imputation produced a
/// non-integral value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripRecord {
    pub pickup_time: Option<NaiveDateTime>,
    pub dropoff_time: Option<NaiveDateTime>,
    pub trip_distance: f64,
    /// Minutes between pickup and dropoff. Negative when dropoff precedes pickup.
    pub trip_duration: f64,
    pub passenger_count: Option<u32>,
    pub payment_type_code: f64,
    pub payment_type: Option<PaymentType>,
    /// `None` for every row when the source has no trip type column.
    pub trip_type_code: Option<f64>,
    pub trip_type: Option<TripType>,
    pub extra: f64,
    pub mta_tax: f64,
    pub tip_amount: f64,
    pub tolls_amount: f64,
    pub improvement_surcharge: f64,
    pub congestion_surcharge: f64,
    pub total_amount: f64,
    pub weekday: Option<Weekday>,
    pub hour_of_day: Option<u32>,
    pub day_of_month: Option<u32>,
    pub week_of_month: Option<u32>,
    pub week: Option<WeekOfMonth>,
}

/// Numeric columns of the correlation matrix, in display order.
pub const CORRELATION_COLUMNS: [&str; 10] = [
    "trip_distance",
    "extra",
    "mta_tax",
    "tip_amount",
    "tolls_amount",
    "improvement_surcharge",
    "congestion_surcharge",
    "trip_duration",
    "passenger_count",
    "total_amount",
];

impl TripRecord {
    /// Value of one of the `CORRELATION_COLUMNS` as `f64` (`NaN` when missing).
    pub fn numeric(&self, column: &str) -> f64 {
        match column {
            "trip_distance" => self.trip_distance,
            "extra" => self.extra,
            "mta_tax" => self.mta_tax,
            "tip_amount" => self.tip_amount,
            "tolls_amount" => self.tolls_amount,
            "improvement_surcharge" => self.improvement_surcharge,
            "congestion_surcharge" => self.congestion_surcharge,
            "trip_duration" => self.trip_duration,
            "passenger_count" => self.passenger_count.map_or(f64::NAN, f64::from),
            "total_amount" => self.total_amount,
            _ => f64::NAN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn week_buckets_are_seven_days() {
        assert_eq!(WeekOfMonth::number_for_day(1), 1);
        assert_eq!(WeekOfMonth::number_for_day(7), 1);
        assert_eq!(WeekOfMonth::number_for_day(8), 2);
        assert_eq!(WeekOfMonth::number_for_day(28), 4);
        assert_eq!(WeekOfMonth::number_for_day(29), 5);
        assert_eq!(WeekOfMonth::number_for_day(31), 5);
    }

    #[test]
    fn week_labels() {
        assert_eq!(WeekOfMonth::from_number(1).map(|w| w.label()), Some("1st Week"));
        assert_eq!(WeekOfMonth::from_number(5).map(|w| w.label()), Some("5th Week"));
        assert_eq!(WeekOfMonth::from_number(0), None);
        assert_eq!(WeekOfMonth::from_number(6), None);
        assert_eq!(WeekOfMonth::Third.number(), 3);
    }

    #[test]
    fn payment_codes_map_without_panicking() {
        assert_eq!(PaymentType::from_code(1.0), Some(PaymentType::CreditCard));
        assert_eq!(PaymentType::from_code(2.0), Some(PaymentType::Cash));
        assert_eq!(PaymentType::from_code(3.0), Some(PaymentType::NoCharge));
        assert_eq!(PaymentType::from_code(4.0), None);
        assert_eq!(PaymentType::from_code(5.0), None);
        assert_eq!(PaymentType::from_code(1.5), None);
        assert_eq!(PaymentType::from_code(f64::NAN), None);
    }

    #[test]
    fn trip_type_codes() {
        assert_eq!(TripType::from_code(1.0), Some(TripType::StreetHail));
        assert_eq!(TripType::from_code(2.0), Some(TripType::Dispatch));
        assert_eq!(TripType::from_code(0.0), None);
        assert_eq!(TripType::Dispatch.code(), 2);
    }

    #[test]
    fn labels_parse_back() {
        for day in Weekday::ALL {
            assert_eq!(day.label().parse::<Weekday>(), Ok(day));
        }
        for week in WeekOfMonth::ALL {
            assert_eq!(week.label().parse::<WeekOfMonth>(), Ok(week));
        }
        for payment in PaymentType::ALL {
            assert_eq!(payment.label().parse::<PaymentType>(), Ok(payment));
        }
        for trip in TripType::ALL {
            assert_eq!(trip.label().parse::<TripType>(), Ok(trip));
        }
    }

    #[test]
    fn short_forms_parse() {
        assert_eq!("mon".parse::<Weekday>(), Ok(Weekday::Monday));
        assert_eq!("3".parse::<WeekOfMonth>(), Ok(WeekOfMonth::Third));
        assert_eq!("1st".parse::<WeekOfMonth>(), Ok(WeekOfMonth::First));
        assert_eq!("credit card".parse::<PaymentType>(), Ok(PaymentType::CreditCard));
        assert_eq!("street hail".parse::<TripType>(), Ok(TripType::StreetHail));
        assert!("mo".parse::<Weekday>().is_err());
        assert!("bitcoin".parse::<PaymentType>().is_err());
    }

    #[test]
    fn serializes_as_display_labels() {
        assert_eq!(serde_json::to_string(&WeekOfMonth::Second).unwrap(), "\"2nd Week\"");
        assert_eq!(serde_json::to_string(&PaymentType::NoCharge).unwrap(), "\"No Charge\"");
        assert_eq!(serde_json::to_string(&TripType::StreetHail).unwrap(), "\"Street-hail\"");
        assert_eq!(serde_json::to_string(&Weekday::Friday).unwrap(), "\"Friday\"");
    }

    #[test]
    fn integral_helpers() {
        assert_eq!(to_count(2.0), Some(2));
        assert_eq!(to_count(-1.0), None);
        assert_eq!(to_count(1.5), None);
        assert_eq!(code_to_int(f64::INFINITY), None);
    }

    proptest! {
        #[test]
        fn every_day_of_month_has_a_week(day in 1u32..=31) {
            let number = WeekOfMonth::number_for_day(day);
            let week = WeekOfMonth::from_number(number).unwrap();
            prop_assert_eq!(week.number(), number);
            prop_assert!(day > (number - 1) * 7 && day <= number * 7);
        }
    }
}
