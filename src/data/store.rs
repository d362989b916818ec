use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::loader::{DataSource, describe_table};
use super::model::Dataset;
use super::summary::{ColumnSummary, summarize};
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Dataset store: one load per source for the life of the store
// ---------------------------------------------------------------------------

/// A per-source slot.  Its mutex is held for the whole read, so concurrent
/// first-time loads of one source queue up behind a single reader.
type Slot = Arc<Mutex<Option<Arc<Dataset>>>>;

/// Process-scoped owner of loaded datasets.
///
/// Construct once at startup and hand out by reference.  Every distinct
/// source identity is read at most once; later calls return the same
/// `Arc<Dataset>`.  Failed loads are not cached.
#[derive(Default)]
pub struct DatasetStore {
    slots: Mutex<HashMap<String, Slot>>,
}

impl DatasetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `source`, reading it only if no dataset is cached for its identity.
    pub fn load(&self, source: &dyn DataSource) -> Result<Arc<Dataset>> {
        let id = source.identity();
        let slot = self.slot(&id);
        let mut guard = lock(&slot);

        if let Some(dataset) = guard.as_ref() {
            log::debug!("Dataset cache hit for '{id}'");
            return Ok(Arc::clone(dataset));
        }

        let dataset = Arc::new(read_dataset(&id, source)?);
        *guard = Some(Arc::clone(&dataset));
        Ok(dataset)
    }

    /// Drop any cached dataset for `source` and read it again.
    pub fn reload(&self, source: &dyn DataSource) -> Result<Arc<Dataset>> {
        let id = source.identity();
        let slot = self.slot(&id);
        let mut guard = lock(&slot);
        *guard = None;

        log::info!("Reloading dataset '{id}'");
        let dataset = Arc::new(read_dataset(&id, source)?);
        *guard = Some(Arc::clone(&dataset));
        Ok(dataset)
    }

    /// The cached dataset for `source`, if it has been loaded.
    pub fn cached(&self, source: &dyn DataSource) -> Option<Arc<Dataset>> {
        let slot = lock(&self.slots).get(&source.identity()).cloned()?;
        let guard = lock(&slot);
        guard.clone()
    }

    /// Sorted unique non-null values of `column` in a loaded dataset.
    pub fn distinct_values(&self, source: &dyn DataSource, column: &str) -> Result<Vec<String>> {
        self.load(source)?.distinct_values(column)
    }

    /// Describe-style statistics for every column of a loaded dataset.
    pub fn summary_statistics(&self, source: &dyn DataSource) -> Result<Vec<ColumnSummary>> {
        let dataset = self.load(source)?;
        Ok(summarize(&dataset))
    }

    fn slot(&self, id: &str) -> Slot {
        let mut slots = lock(&self.slots);
        Arc::clone(slots.entry(id.to_string()).or_default())
    }
}

fn read_dataset(id: &str, source: &dyn DataSource) -> Result<Dataset> {
    let table = source.read().map_err(|e| {
        log::error!("Failed to read '{id}': {e:#}");
        Error::SourceUnavailable {
            source_id: id.to_string(),
            reason: format!("{e:#}"),
        }
    })?;
    log::debug!("Non-null cells per column in '{id}': {:?}", describe_table(&table));

    let dataset = Dataset::from_table(table).inspect_err(|e| {
        log::error!("Dataset '{id}' rejected: {e}");
    })?;
    log::info!(
        "Loaded {} records from '{id}' with columns {:?}",
        dataset.len(),
        dataset.columns()
    );
    Ok(dataset)
}

/// A poisoned lock only means another loader panicked; the slot contents
/// are still either empty or a complete dataset.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use super::*;
    use crate::data::model::{Column, RawTable, Value};
    use crate::data::summary::ColumnStats;

    struct CountingSource {
        id: String,
        reads: AtomicUsize,
        fail: bool,
    }

    impl CountingSource {
        fn new(id: &str) -> Self {
            Self {
                id: id.to_string(),
                reads: AtomicUsize::new(0),
                fail: false,
            }
        }

        fn reads(&self) -> usize {
            self.reads.load(Ordering::SeqCst)
        }
    }

    impl DataSource for CountingSource {
        fn identity(&self) -> String {
            self.id.clone()
        }

        fn read(&self) -> anyhow::Result<RawTable> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("disk on fire");
            }
            thread::sleep(std::time::Duration::from_millis(5));
            Ok(RawTable {
                headers: ["category", "gender", "age", "customer_id", "total_sale"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                rows: vec![
                    vec!["Electronics".into(), "M".into(), Value::Integer(30), Value::Integer(1), Value::Integer(100)],
                    vec!["Clothing".into(), "F".into(), Value::Integer(25), Value::Integer(2), Value::Integer(50)],
                ],
            })
        }
    }

    #[test]
    fn repeated_loads_read_once_and_share_the_dataset() {
        let store = DatasetStore::new();
        let source = CountingSource::new("mem://sales");

        let first = store.load(&source).unwrap();
        let second = store.load(&source).unwrap();

        assert_eq!(source.reads(), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(*first, *second);
    }

    #[test]
    fn concurrent_first_loads_are_serialized() {
        let store = DatasetStore::new();
        let source = CountingSource::new("mem://shared");

        let loaded: Vec<Arc<Dataset>> = thread::scope(|s| {
            let handles: Vec<_> = (0..8).map(|_| s.spawn(|| store.load(&source).unwrap())).collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(source.reads(), 1);
        assert!(loaded.iter().all(|d| Arc::ptr_eq(d, &loaded[0])));
    }

    #[test]
    fn distinct_sources_are_cached_separately() {
        let store = DatasetStore::new();
        let a = CountingSource::new("mem://a");
        let b = CountingSource::new("mem://b");
        store.load(&a).unwrap();
        store.load(&b).unwrap();
        store.load(&a).unwrap();
        assert_eq!((a.reads(), b.reads()), (1, 1));
    }

    #[test]
    fn reload_reads_again() {
        let store = DatasetStore::new();
        let source = CountingSource::new("mem://reload");
        let first = store.load(&source).unwrap();
        let reloaded = store.reload(&source).unwrap();
        assert_eq!(source.reads(), 2);
        assert!(!Arc::ptr_eq(&first, &reloaded));
        assert_eq!(*first, *reloaded);
    }

    #[test]
    fn failed_load_is_source_unavailable_and_not_cached() {
        let store = DatasetStore::new();
        let mut source = CountingSource::new("mem://broken");
        source.fail = true;

        let err = store.load(&source).unwrap_err();
        assert!(matches!(err, Error::SourceUnavailable { .. }));
        assert!(err.to_string().contains("disk on fire"));
        assert!(store.cached(&source).is_none());

        store.load(&source).unwrap_err();
        assert_eq!(source.reads(), 2);
    }

    #[test]
    fn distinct_values_go_through_the_cache() {
        let store = DatasetStore::new();
        let source = CountingSource::new("mem://domain");
        assert_eq!(
            store.distinct_values(&source, "category").unwrap(),
            vec!["Clothing", "Electronics"]
        );
        assert_eq!(store.distinct_values(&source, "gender").unwrap(), vec!["F", "M"]);
        assert!(matches!(
            store.distinct_values(&source, "region"),
            Err(Error::UnknownColumn(_))
        ));
        assert_eq!(source.reads(), 1);
    }

    #[test]
    fn summary_statistics_describe_the_cached_dataset() {
        let store = DatasetStore::new();
        let source = CountingSource::new("mem://stats");
        store.load(&source).unwrap();

        let stats = store.summary_statistics(&source).unwrap();
        assert_eq!(source.reads(), 1);

        let total = stats.iter().find(|s| s.column == Column::TotalSale).unwrap();
        assert_eq!(total.count, 2);
        match &total.stats {
            Some(ColumnStats::Numeric { mean, min, max, .. }) => {
                assert_eq!((*mean, *min, *max), (75.0, 50.0, 100.0));
            }
            other => panic!("expected numeric stats, got {other:?}"),
        }

        let category = stats.iter().find(|s| s.column == Column::Category).unwrap();
        assert!(matches!(
            &category.stats,
            Some(ColumnStats::Categorical { unique: 2, .. })
        ));
    }
}
