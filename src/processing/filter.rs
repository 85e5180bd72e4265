use std::str::FromStr;

use serde::Serialize;

use crate::error::CriteriaError;
use crate::state::dataset::Dataset;
use crate::state::trip::{PaymentType, TripRecord, TripType, WeekOfMonth, Weekday};

/// A single exact-match constraint on one trip attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    Week(WeekOfMonth),
    Weekday(Weekday),
    Payment(PaymentType),
    PassengerCount(u32),
    TripType(TripType),
    Hour(u32),
}

impl Predicate {
    /// Missing attribute values never match.
    pub fn matches(&self, trip: &TripRecord) -> bool {
        match *self {
            Predicate::Week(week) => trip.week == Some(week),
            Predicate::Weekday(day) => trip.weekday == Some(day),
            Predicate::Payment(payment) => trip.payment_type == Some(payment),
            Predicate::PassengerCount(count) => trip.passenger_count == Some(count),
            Predicate::TripType(trip_type) => trip.trip_type == Some(trip_type),
            Predicate::Hour(hour) => trip.hour_of_day == Some(hour),
        }
    }
}

/// A filter configuration: the set of predicates it turns on.
pub trait Criteria {
    fn predicates(&self) -> Vec<Predicate>;
}

/// Either no constraint or an exact value. Parses `All` (and `All Weeks`) as no constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Selection<T> {
    All,
    Only(T),
}

impl<T> Default for Selection<T> {
    fn default() -> Self {
        Selection::All
    }
}

impl<T: Copy> Selection<T> {
    pub fn value(&self) -> Option<T> {
        match self {
            Selection::All => None,
            Selection::Only(v) => Some(*v),
        }
    }
}

impl<T: FromStr<Err = String>> FromStr for Selection<T> {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" | "all weeks" | "*" => Ok(Selection::All),
            _ => s.parse().map(Selection::Only),
        }
    }
}

/// Selection for the exploratory view: one value per dropdown, week optional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ViewCriteria {
    pub week: Option<WeekOfMonth>,
    pub weekday: Weekday,
    pub payment: PaymentType,
    pub passenger_count: u32,
    /// Required when the dataset has trip types, ignored otherwise.
    pub trip_type: Option<TripType>,
    pub hour_of_day: u32,
}

impl Criteria for ViewCriteria {
    fn predicates(&self) -> Vec<Predicate> {
        let mut predicates = Vec::with_capacity(6);
        if let Some(week) = self.week {
            predicates.push(Predicate::Week(week));
        }
        predicates.push(Predicate::Weekday(self.weekday));
        predicates.push(Predicate::Payment(self.payment));
        predicates.push(Predicate::PassengerCount(self.passenger_count));
        if let Some(trip_type) = self.trip_type {
            predicates.push(Predicate::TripType(trip_type));
        }
        predicates.push(Predicate::Hour(self.hour_of_day));
        predicates
    }
}

/// Selection for the hypothesis tests: every dimension may be `All`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TestCriteria {
    pub weekday: Selection<Weekday>,
    pub payment: Selection<PaymentType>,
    pub week: Selection<WeekOfMonth>,
}

impl Criteria for TestCriteria {
    fn predicates(&self) -> Vec<Predicate> {
        [
            self.weekday.value().map(Predicate::Weekday),
            self.payment.value().map(Predicate::Payment),
            self.week.value().map(Predicate::Week),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

/// Rows of a dataset that passed a filter, borrowed from the dataset.
#[derive(Debug, Clone)]
pub struct Subset<'a> {
    rows: Vec<&'a TripRecord>,
    has_trip_type: bool,
}

impl<'a> Subset<'a> {
    pub fn all(dataset: &'a Dataset) -> Self {
        Self {
            rows: dataset.trips().iter().collect(),
            has_trip_type: dataset.has_trip_type(),
        }
    }

    pub fn rows(&self) -> &[&'a TripRecord] {
        &self.rows
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a TripRecord> + '_ {
        self.rows.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_trip_type(&self) -> bool {
        self.has_trip_type
    }

    /// Narrow by one more predicate.
    pub fn refine(&self, predicate: &Predicate) -> Subset<'a> {
        Subset {
            rows: self.iter().filter(|trip| predicate.matches(trip)).collect(),
            has_trip_type: self.has_trip_type,
        }
    }
}

/// Rows matching every predicate of `criteria`. An empty result is valid.
pub fn filter<'a, C: Criteria + ?Sized>(dataset: &'a Dataset, criteria: &C) -> Subset<'a> {
    let predicates = criteria.predicates();
    Subset {
        rows: dataset
            .trips()
            .iter()
            .filter(|trip| predicates.iter().all(|p| p.matches(trip)))
            .collect(),
        has_trip_type: dataset.has_trip_type(),
    }
}

/// Filter for the exploratory view, enforcing the trip type rule.
pub fn filter_view<'a>(dataset: &'a Dataset, criteria: &ViewCriteria) -> Result<Subset<'a>, CriteriaError> {
    let mut effective = *criteria;
    if dataset.has_trip_type() {
        if criteria.trip_type.is_none() {
            return Err(CriteriaError::TripTypeRequired);
        }
    } else if criteria.trip_type.is_some() {
        tracing::warn!("Dataset has no trip type column; ignoring the trip type selection");
        effective.trip_type = None;
    }

    let subset = filter(dataset, &effective);
    tracing::debug!("View filter kept {} of {} trips", subset.len(), dataset.len());
    Ok(subset)
}

/// Filter for the hypothesis tests.
pub fn filter_tests<'a>(dataset: &'a Dataset, criteria: &TestCriteria) -> Subset<'a> {
    let subset = filter(dataset, criteria);
    tracing::debug!("Test filter kept {} of {} trips", subset.len(), dataset.len());
    subset
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use proptest::prelude::*;

    pub(crate) fn trip(
        weekday: Weekday,
        day: u32,
        payment: PaymentType,
        trip_type: Option<TripType>,
        total: f64,
    ) -> TripRecord {
        let pickup = NaiveDateTime::parse_from_str(&format!("2023-08-{day:02} 09:00:00"), "%Y-%m-%d %H:%M:%S").ok();
        let week_of_month = WeekOfMonth::number_for_day(day);
        TripRecord {
            pickup_time: pickup,
            dropoff_time: pickup,
            trip_distance: total / 5.0,
            trip_duration: total / 2.0,
            passenger_count: Some(1),
            payment_type_code: payment.code() as f64,
            payment_type: Some(payment),
            trip_type_code: trip_type.map(|t| t.code() as f64),
            trip_type,
            extra: 0.5,
            mta_tax: 0.5,
            tip_amount: total / 10.0,
            tolls_amount: 0.0,
            improvement_surcharge: 1.0,
            congestion_surcharge: 0.0,
            total_amount: total,
            weekday: Some(weekday),
            hour_of_day: Some(9),
            day_of_month: Some(day),
            week_of_month: Some(week_of_month),
            week: WeekOfMonth::from_number(week_of_month),
        }
    }

    /// The three-row example: Monday the 3rd, Monday the 10th, Tuesday the 3rd.
    pub(crate) fn example_dataset() -> Dataset {
        Dataset::new(
            vec![
                trip(Weekday::Monday, 3, PaymentType::CreditCard, None, 10.0),
                trip(Weekday::Monday, 10, PaymentType::Cash, None, 20.0),
                trip(Weekday::Tuesday, 3, PaymentType::CreditCard, None, 30.0),
            ],
            false,
        )
    }

    fn view(weekday: Weekday, payment: PaymentType) -> ViewCriteria {
        ViewCriteria {
            week: None,
            weekday,
            payment,
            passenger_count: 1,
            trip_type: None,
            hour_of_day: 9,
        }
    }

    #[test]
    fn weekday_only_test_filter() {
        let dataset = example_dataset();
        let criteria = TestCriteria {
            weekday: Selection::Only(Weekday::Monday),
            ..Default::default()
        };
        let subset = filter_tests(&dataset, &criteria);
        assert_eq!(subset.len(), 2);
        assert!(subset.iter().all(|t| t.weekday == Some(Weekday::Monday)));
    }

    #[test]
    fn all_selections_keep_everything() {
        let dataset = example_dataset();
        assert_eq!(filter_tests(&dataset, &TestCriteria::default()).len(), 3);
        assert!(TestCriteria::default().predicates().is_empty());
    }

    #[test]
    fn view_filter_combines_with_and() {
        let dataset = example_dataset();
        let subset = filter_view(&dataset, &view(Weekday::Monday, PaymentType::CreditCard)).unwrap();
        assert_eq!(subset.len(), 1);
        assert_eq!(subset.rows()[0].total_amount, 10.0);

        let mut by_week = view(Weekday::Monday, PaymentType::Cash);
        by_week.week = Some(WeekOfMonth::First);
        assert!(filter_view(&dataset, &by_week).unwrap().is_empty());
        by_week.week = Some(WeekOfMonth::Second);
        assert_eq!(filter_view(&dataset, &by_week).unwrap().len(), 1);
    }

    #[test]
    fn empty_result_is_not_an_error() {
        let dataset = example_dataset();
        let subset = filter_view(&dataset, &view(Weekday::Sunday, PaymentType::NoCharge)).unwrap();
        assert!(subset.is_empty());
    }

    #[test]
    fn trip_type_required_when_present() {
        let dataset = Dataset::new(
            vec![
                trip(Weekday::Monday, 3, PaymentType::Cash, Some(TripType::StreetHail), 10.0),
                trip(Weekday::Monday, 3, PaymentType::Cash, Some(TripType::Dispatch), 12.0),
            ],
            true,
        );
        let mut criteria = view(Weekday::Monday, PaymentType::Cash);
        assert_eq!(filter_view(&dataset, &criteria).unwrap_err(), CriteriaError::TripTypeRequired);

        criteria.trip_type = Some(TripType::Dispatch);
        let subset = filter_view(&dataset, &criteria).unwrap();
        assert_eq!(subset.len(), 1);
        assert_eq!(subset.rows()[0].total_amount, 12.0);
    }

    #[test]
    fn trip_type_ignored_when_absent() {
        let dataset = example_dataset();
        let mut criteria = view(Weekday::Monday, PaymentType::CreditCard);
        criteria.trip_type = Some(TripType::Dispatch);
        assert_eq!(filter_view(&dataset, &criteria).unwrap().len(), 1);
    }

    #[test]
    fn missing_attributes_never_match() {
        let mut unnamed = trip(Weekday::Monday, 3, PaymentType::Cash, None, 10.0);
        unnamed.payment_type = None;
        unnamed.weekday = None;
        assert!(!Predicate::Payment(PaymentType::Cash).matches(&unnamed));
        assert!(!Predicate::Weekday(Weekday::Monday).matches(&unnamed));
        assert!(Predicate::Hour(9).matches(&unnamed));
    }

    #[test]
    fn selection_parsing() {
        assert_eq!("All".parse::<Selection<Weekday>>(), Ok(Selection::All));
        assert_eq!("All Weeks".parse::<Selection<WeekOfMonth>>(), Ok(Selection::All));
        assert_eq!(
            "Cash".parse::<Selection<PaymentType>>(),
            Ok(Selection::Only(PaymentType::Cash))
        );
        assert!("Someday".parse::<Selection<Weekday>>().is_err());
    }

    fn arb_trip() -> impl Strategy<Value = TripRecord> {
        (0usize..7, 1u32..=31, 0usize..3, 0.0f64..100.0).prop_map(|(d, day, p, total)| {
            trip(Weekday::ALL[d], day, PaymentType::ALL[p], None, total)
        })
    }

    proptest! {
        #[test]
        fn predicate_order_does_not_matter(
            trips in prop::collection::vec(arb_trip(), 0..60),
            d in 0usize..7,
            p in 0usize..3,
        ) {
            let dataset = Dataset::new(trips, false);
            let weekday = Predicate::Weekday(Weekday::ALL[d]);
            let payment = Predicate::Payment(PaymentType::ALL[p]);

            let all = Subset::all(&dataset);
            let weekday_first = all.refine(&weekday).refine(&payment);
            let payment_first = all.refine(&payment).refine(&weekday);
            let combined = filter(&dataset, &TestCriteria {
                weekday: Selection::Only(Weekday::ALL[d]),
                payment: Selection::Only(PaymentType::ALL[p]),
                week: Selection::All,
            });

            prop_assert_eq!(weekday_first.rows(), payment_first.rows());
            prop_assert_eq!(weekday_first.rows(), combined.rows());
        }
    }
}
