use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::data::loader;
use crate::error::LoadError;
use crate::state::trip::TripRecord;

/// The normalized trip table. Immutable once built; filters borrow from it.
#[derive(Debug, Clone)]
pub struct Dataset {
    trips: Vec<TripRecord>,
    has_trip_type: bool,
}

impl Dataset {
    pub fn new(trips: Vec<TripRecord>, has_trip_type: bool) -> Self {
        Self { trips, has_trip_type }
    }

    pub fn trips(&self) -> &[TripRecord] {
        &self.trips
    }

    pub fn len(&self) -> usize {
        self.trips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trips.is_empty()
    }

    /// Whether the source carried a trip type column. When it did not, every
    /// trip-type predicate, chart and test is skipped.
    pub fn has_trip_type(&self) -> bool {
        self.has_trip_type
    }

    /// Distinct passenger counts, ascending.
    pub fn passenger_counts(&self) -> Vec<u32> {
        let mut counts: Vec<u32> = self.trips.iter().filter_map(|t| t.passenger_count).collect();
        counts.sort_unstable();
        counts.dedup();
        counts
    }

    /// Distinct dropoff hours, ascending.
    pub fn hours(&self) -> Vec<u32> {
        let mut hours: Vec<u32> = self.trips.iter().filter_map(|t| t.hour_of_day).collect();
        hours.sort_unstable();
        hours.dedup();
        hours
    }
}

/// Owns the path to the trip file and loads it at most once.
///
/// The first caller of [`DatasetService::dataset`] performs the load while
/// holding the lock, so concurrent callers wait for that load instead of
/// starting their own. A failed load leaves the cache empty.
pub struct DatasetService {
    path: PathBuf,
    cached: Mutex<Option<Arc<Dataset>>>,
}

impl DatasetService {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_loaded(&self) -> bool {
        self.cached
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_some()
    }

    pub fn dataset(&self) -> Result<Arc<Dataset>, LoadError> {
        let mut lock = self
            .cached
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(dataset) = lock.as_ref() {
            return Ok(Arc::clone(dataset));
        }

        let dataset = Arc::new(loader::load_dataset(&self.path)?);
        *lock = Some(Arc::clone(&dataset));
        Ok(dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::tests::write_fixture;

    #[test]
    fn loads_once_and_reuses_the_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path(), "trips.csv", loader::tests::THREE_TRIPS_CSV);
        let service = DatasetService::new(&path);
        assert_eq!(service.path(), path.as_path());
        assert!(!service.is_loaded());

        let first = service.dataset().unwrap();
        // Removing the file proves the second call never touches the disk.
        std::fs::remove_file(&path).unwrap();
        let second = service.dataset().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.len(), 3);
        assert!(service.is_loaded());
    }

    #[test]
    fn failed_load_is_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("later.csv");
        let service = DatasetService::new(&path);

        assert!(matches!(service.dataset(), Err(LoadError::Io { .. })));
        assert!(!service.is_loaded());

        write_fixture(dir.path(), "later.csv", loader::tests::THREE_TRIPS_CSV);
        assert_eq!(service.dataset().unwrap().len(), 3);
    }

    #[test]
    fn concurrent_callers_share_one_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path(), "trips.csv", loader::tests::THREE_TRIPS_CSV);
        let service = Arc::new(DatasetService::new(&path));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let service = Arc::clone(&service);
                std::thread::spawn(move || service.dataset().unwrap())
            })
            .collect();
        let loaded: Vec<Arc<Dataset>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        for dataset in &loaded[1..] {
            assert!(Arc::ptr_eq(&loaded[0], dataset));
        }
    }

    #[test]
    fn distinct_dropdown_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path(), "trips.csv", loader::tests::THREE_TRIPS_CSV);
        let dataset = loader::load_dataset(&path).unwrap();
        assert_eq!(dataset.passenger_counts(), vec![1, 2]);
        assert_eq!(dataset.hours(), vec![9, 14]);
    }
}
