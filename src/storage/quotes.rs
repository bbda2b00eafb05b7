//! Quote store
//!
//! Owns the ordered list of quotes. Every mutation goes through this type and
//! ends with the full list being written back under [`QUOTES_KEY`].

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::storage::{KeyValueStore, StorageError, QUOTES_KEY};
use crate::types::{
    default_quotes, validate, validate_value, CategoryFilter, Quote, ValidationError,
};

/// Store handle shared by the viewer, the reconciler and the resolver
pub type SharedQuoteStore = Arc<Mutex<QuoteStore>>;

/// Outcome of an import batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Records appended to the store
    pub added: usize,
    /// Valid records already present
    pub skipped: usize,
    /// Candidates that were not valid quotes
    pub invalid: usize,
}

pub struct QuoteStore {
    quotes: Vec<Quote>,
    kv: Arc<dyn KeyValueStore>,
}

impl QuoteStore {
    /// Load quotes from `kv`, falling back to the default set
    ///
    /// Never fails. Missing or invalid stored data is logged and replaced
    /// with the defaults, which are then persisted. When the backend cannot
    /// be read at all the defaults are used in memory only, so stored quotes
    /// are never overwritten with them.
    pub fn load(kv: Arc<dyn KeyValueStore>) -> Self {
        let raw = match kv.get(QUOTES_KEY) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!("Could not read stored quotes, using defaults in memory: {}", e);
                return Self {
                    quotes: default_quotes(),
                    kv,
                };
            }
        };

        match raw.as_deref().map(parse_stored) {
            Some(Ok(quotes)) => {
                tracing::debug!("Loaded {} quotes from storage", quotes.len());
                Self { quotes, kv }
            }
            None => {
                tracing::info!("No stored quotes, using defaults");
                Self::with_defaults(kv)
            }
            Some(Err(e)) => {
                tracing::warn!("Stored quotes invalid, using defaults: {}", e);
                Self::with_defaults(kv)
            }
        }
    }

    /// Build a store around existing quotes without touching storage
    pub fn from_quotes(kv: Arc<dyn KeyValueStore>, quotes: Vec<Quote>) -> Self {
        Self { quotes, kv }
    }

    fn with_defaults(kv: Arc<dyn KeyValueStore>) -> Self {
        let store = Self {
            quotes: default_quotes(),
            kv,
        };
        store.persist();
        store
    }

    pub fn into_shared(self) -> SharedQuoteStore {
        Arc::new(Mutex::new(self))
    }

    pub fn quotes(&self) -> &[Quote] {
        &self.quotes
    }

    pub fn snapshot(&self) -> Vec<Quote> {
        self.quotes.clone()
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Quote> {
        self.quotes.get(index)
    }

    /// Validate and append a quote, then persist
    ///
    /// Does not dedupe against existing quotes.
    pub fn add(&mut self, text: &str, category: &str) -> Result<Quote, ValidationError> {
        let quote = validate(text, category)?;
        self.quotes.push(quote.clone());
        self.persist();
        tracing::info!("Added quote in category '{}'", quote.category);
        Ok(quote)
    }

    /// Merge untyped records, skipping invalid ones and `(text, category)` duplicates
    ///
    /// Persists once after the batch when anything was added.
    pub fn import_batch(&mut self, candidates: &[Value]) -> ImportSummary {
        let mut summary = ImportSummary::default();
        let mut existing: HashSet<String> = self.quotes.iter().map(Quote::dedupe_key).collect();

        for candidate in candidates {
            let quote = match validate_value(candidate) {
                Ok(quote) => quote,
                Err(e) => {
                    tracing::debug!("Skipping invalid import record: {}", e);
                    summary.invalid += 1;
                    continue;
                }
            };

            if existing.insert(quote.dedupe_key()) {
                self.quotes.push(quote);
                summary.added += 1;
            } else {
                summary.skipped += 1;
            }
        }

        if summary.added > 0 {
            self.persist();
        }
        tracing::info!(
            "Imported {} quotes ({} duplicates, {} invalid)",
            summary.added,
            summary.skipped,
            summary.invalid
        );
        summary
    }

    /// Append quotes that were already validated elsewhere, persisting once
    pub fn apply_additions(&mut self, additions: Vec<Quote>) -> usize {
        let count = additions.len();
        if count == 0 {
            return 0;
        }
        self.quotes.extend(additions);
        self.persist();
        count
    }

    /// Overwrite the category of the first quote matching each replacement's text
    ///
    /// Returns how many quotes changed. Persists once.
    pub fn replace_categories(&mut self, replacements: &[Quote]) -> usize {
        let mut changed = 0;
        for replacement in replacements {
            if let Some(quote) = self.quotes.iter_mut().find(|q| q.text == replacement.text) {
                if quote.category != replacement.category {
                    quote.category = replacement.category.clone();
                    changed += 1;
                }
            } else {
                tracing::warn!("No local quote matches '{}', skipping", replacement.text);
            }
        }

        if changed > 0 {
            self.persist();
        }
        changed
    }

    /// Sorted distinct categories
    pub fn categories(&self) -> Vec<String> {
        self.quotes
            .iter()
            .map(|q| q.category.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Uniformly random quote among those matching `filter`
    pub fn pick(&self, filter: &CategoryFilter) -> Option<&Quote> {
        self.pick_indexed(filter).map(|(_, quote)| quote)
    }

    /// Like [`pick`](Self::pick), also returning the quote's position in the store
    pub fn pick_indexed(&self, filter: &CategoryFilter) -> Option<(usize, &Quote)> {
        self.pick_with(filter, &mut rand::thread_rng())
    }

    pub fn pick_with<R: Rng + ?Sized>(
        &self,
        filter: &CategoryFilter,
        rng: &mut R,
    ) -> Option<(usize, &Quote)> {
        let candidates: Vec<(usize, &Quote)> = self
            .quotes
            .iter()
            .enumerate()
            .filter(|(_, q)| filter.matches(&q.category))
            .collect();

        candidates.choose(rng).copied()
    }

    /// Write the full list; failures are logged and the in-memory list kept
    fn persist(&self) {
        if let Err(e) = persist_internal(self.kv.as_ref(), &self.quotes) {
            tracing::error!("Could not save quotes: {}", e);
        }
    }
}

fn parse_stored(raw: &str) -> Result<Vec<Quote>, StorageError> {
    let value: Value = serde_json::from_str(raw)?;
    let records = value
        .as_array()
        .ok_or_else(|| StorageError::InvalidData("stored quotes are not an array".into()))?;

    records
        .iter()
        .map(|record| {
            validate_value(record).map_err(|e| StorageError::InvalidData(e.to_string()))
        })
        .collect()
}

fn persist_internal(kv: &dyn KeyValueStore, quotes: &[Quote]) -> Result<(), StorageError> {
    let json = serde_json::to_string(quotes)?;
    kv.set(QUOTES_KEY, &json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryKvStore;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;

    fn memory_kv() -> Arc<MemoryKvStore> {
        Arc::new(MemoryKvStore::new())
    }

    fn stored(kv: &MemoryKvStore) -> Vec<Quote> {
        serde_json::from_str(&kv.get(QUOTES_KEY).unwrap().unwrap()).unwrap()
    }

    /// Backend whose writes always fail
    struct ReadOnlyKv;

    impl KeyValueStore for ReadOnlyKv {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Ok(None)
        }
        fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only",
            )))
        }
        fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Ok(())
        }
    }

    /// Backend that cannot be read and counts attempted writes
    #[derive(Default)]
    struct UnreadableKv {
        writes: std::sync::atomic::AtomicUsize,
    }

    impl KeyValueStore for UnreadableKv {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "locked",
            )))
        }
        fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            self.writes.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        }
        fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Ok(())
        }
    }

    #[test]
    fn test_load_read_failure_keeps_stored_data() {
        let kv = Arc::new(UnreadableKv::default());
        let store = QuoteStore::load(kv.clone());

        assert_eq!(store.quotes(), default_quotes().as_slice());
        assert_eq!(kv.writes.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[test]
    fn test_load_defaults_when_absent() {
        let kv = memory_kv();
        let store = QuoteStore::load(kv.clone());
        assert_eq!(store.quotes(), default_quotes().as_slice());
        assert_eq!(stored(&kv), default_quotes());
    }

    #[test]
    fn test_load_defaults_when_invalid() {
        let invalid = [
            "not json",
            r#"{"text":"A"}"#,
            r#"[{"text":"A"}]"#,
            r#"[{"text":"","category":"X"}]"#,
        ];
        for bad in invalid {
            let kv = memory_kv();
            kv.set(QUOTES_KEY, bad).unwrap();
            let store = QuoteStore::load(kv.clone());
            assert_eq!(store.quotes(), default_quotes().as_slice(), "input: {bad}");
            assert_eq!(stored(&kv), default_quotes());
        }
    }

    #[test]
    fn test_load_existing() {
        let kv = memory_kv();
        kv.set(QUOTES_KEY, r#"[{"text":"A","category":"X"}]"#).unwrap();
        let store = QuoteStore::load(kv);
        assert_eq!(store.quotes(), &[Quote::new("A", "X")]);
    }

    #[test]
    fn test_add_appends_and_persists() {
        let kv = memory_kv();
        let mut store = QuoteStore::load(kv.clone());
        let before = store.len();

        let added = store.add(" New quote ", " Wisdom ").unwrap();
        assert_eq!(added, Quote::new("New quote", "Wisdom"));
        assert_eq!(store.len(), before + 1);
        assert_eq!(store.quotes().last(), Some(&added));
        assert_eq!(stored(&kv).last(), Some(&added));
    }

    #[test]
    fn test_add_allows_duplicate_text() {
        let mut store = QuoteStore::from_quotes(memory_kv(), vec![Quote::new("A", "X")]);
        store.add("A", "X").unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_add_rejects_empty_fields() {
        let kv = memory_kv();
        let mut store = QuoteStore::load(kv.clone());
        let before = store.snapshot();

        assert_eq!(store.add("", "x"), Err(ValidationError::EmptyText));
        assert_eq!(store.add("x", ""), Err(ValidationError::EmptyCategory));
        assert_eq!(store.add("", ""), Err(ValidationError::EmptyBoth));
        assert_eq!(store.add("   ", "\t"), Err(ValidationError::EmptyBoth));

        assert_eq!(store.snapshot(), before);
        assert_eq!(stored(&kv), before);
    }

    #[test]
    fn test_add_survives_storage_failure() {
        let mut store = QuoteStore::from_quotes(Arc::new(ReadOnlyKv), Vec::new());
        store.add("A", "X").unwrap();
        assert_eq!(store.quotes(), &[Quote::new("A", "X")]);
    }

    #[test]
    fn test_import_batch_dedupes() {
        let kv = memory_kv();
        let mut store = QuoteStore::from_quotes(kv.clone(), vec![Quote::new("A", "X")]);

        let batch = vec![
            json!({"text": "A", "category": "X"}),
            json!({"text": "A", "category": "Y"}),
            json!({"text": "B", "category": "X"}),
            json!({"text": "B", "category": "X"}),
            json!({"text": "", "category": "X"}),
            json!({"text": 42, "category": "X"}),
            json!("nope"),
        ];

        let summary = store.import_batch(&batch);
        assert_eq!(
            summary,
            ImportSummary {
                added: 2,
                skipped: 2,
                invalid: 3
            }
        );
        assert_eq!(
            store.quotes(),
            &[
                Quote::new("A", "X"),
                Quote::new("A", "Y"),
                Quote::new("B", "X")
            ]
        );
        assert_eq!(stored(&kv), store.snapshot());

        // Same file again adds nothing
        let again = store.import_batch(&batch);
        assert_eq!(again.added, 0);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_categories_sorted_and_distinct() {
        let mut store = QuoteStore::from_quotes(
            memory_kv(),
            vec![
                Quote::new("1", "Life"),
                Quote::new("2", "Art"),
                Quote::new("3", "Life"),
            ],
        );
        assert_eq!(store.categories(), vec!["Art", "Life"]);

        store.add("4", "Courage").unwrap();
        assert_eq!(store.categories(), vec!["Art", "Courage", "Life"]);

        store.replace_categories(&[Quote::new("2", "Zen")]);
        assert_eq!(store.categories(), vec!["Courage", "Life", "Zen"]);

        store.import_batch(&[json!({"text": "5", "category": "Beauty"})]);
        assert_eq!(store.categories(), vec!["Beauty", "Courage", "Life", "Zen"]);

        store.apply_additions(vec![Quote::new("6", "Server")]);
        assert_eq!(
            store.categories(),
            vec!["Beauty", "Courage", "Life", "Server", "Zen"]
        );
    }

    #[test]
    fn test_pick_empty() {
        let store = QuoteStore::from_quotes(memory_kv(), Vec::new());
        assert!(store.pick(&CategoryFilter::All).is_none());

        let store = QuoteStore::from_quotes(memory_kv(), vec![Quote::new("A", "X")]);
        assert!(store
            .pick(&CategoryFilter::Only("Missing".to_string()))
            .is_none());
    }

    #[test]
    fn test_pick_respects_filter() {
        let store = QuoteStore::from_quotes(
            memory_kv(),
            vec![
                Quote::new("1", "Life"),
                Quote::new("2", "Art"),
                Quote::new("3", "Life"),
            ],
        );
        let mut rng = StdRng::seed_from_u64(7);
        let filter = CategoryFilter::Only("Art".to_string());
        for _ in 0..20 {
            let (index, quote) = store.pick_with(&filter, &mut rng).unwrap();
            assert_eq!(index, 1);
            assert_eq!(quote.text, "2");
        }

        let life = CategoryFilter::Only("Life".to_string());
        let mut seen = HashSet::new();
        for _ in 0..100 {
            let (index, _) = store.pick_with(&life, &mut rng).unwrap();
            seen.insert(index);
        }
        assert_eq!(seen, HashSet::from([0, 2]));
    }

    #[test]
    fn test_replace_categories() {
        let kv = memory_kv();
        let mut store = QuoteStore::from_quotes(
            kv.clone(),
            vec![Quote::new("A", "X"), Quote::new("B", "X")],
        );

        let changed = store.replace_categories(&[Quote::new("A", "Y"), Quote::new("C", "Z")]);
        assert_eq!(changed, 1);
        assert_eq!(store.quotes(), &[Quote::new("A", "Y"), Quote::new("B", "X")]);
        assert_eq!(stored(&kv), store.snapshot());
    }
}
