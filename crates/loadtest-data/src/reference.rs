//! Reference corpus loading and pointer-ID partitioning.

use crate::error::ReferenceDataError;
use crate::record::{DocumentReference, PointerType};
use rand::seq::IndexedRandom;
use rand::Rng;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

/// Production pointer type codes the harness is permitted to use.
pub const DEFAULT_POINTER_TYPES: [(&str, &str); 7] = [
    ("736253002", "Mental Health Crisis Plan"),
    (
        "1363501000000100",
        "Royal College of Physicians NEWS2 (National Early Warning Score 2) chart",
    ),
    (
        "1382601000000107",
        "ReSPECT (Recommended Summary Plan for Emergency Care and Treatment) form",
    ),
    ("325691000000100", "Contingency plan"),
    ("736373009", "End of life care plan"),
    ("861421000000109", "End of Life Care Coordination Summary"),
    ("887701000000100", "Emergency Health Care Plans"),
];

/// On-disk shape of the reference data file.
///
/// `documents` and `nhs_numbers` are required; `ids` is optional and falls
/// back to the keys of `documents` in their original insertion order.
#[derive(Debug, Deserialize)]
struct ReferenceFile {
    documents: Map<String, Value>,
    nhs_numbers: Vec<String>,
    #[serde(default, alias = "pointer_ids")]
    ids: Option<Vec<String>>,
}

/// Single-use pool of pointer IDs reserved for delete requests.
///
/// `pop_random` hands each ID out at most once across the whole run, so two
/// workers can never race to delete the same pointer.
#[derive(Debug)]
pub struct DeletePool {
    ids: Mutex<Vec<String>>,
}

impl DeletePool {
    fn new(ids: Vec<String>) -> Self {
        Self {
            ids: Mutex::new(ids),
        }
    }

    /// Draw one ID uniformly at random, removing it from the pool.
    pub fn pop_random<R: Rng>(&self, rng: &mut R) -> Option<String> {
        let mut ids = self.ids.lock().unwrap_or_else(|e| e.into_inner());
        if ids.is_empty() {
            return None;
        }
        let index = rng.random_range(0..ids.len());
        Some(ids.swap_remove(index))
    }

    /// IDs remaining in the pool.
    pub fn remaining(&self) -> usize {
        self.ids.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// The reference corpus shared read-only across all workers.
#[derive(Debug)]
pub struct ReferenceDataset {
    nhs_numbers: Vec<String>,
    documents: HashMap<String, DocumentReference>,
    pointer_types: Vec<PointerType>,
    reusable_ids: Vec<String>,
    delete_pool: DeletePool,
    delete_pool_size: usize,
}

impl ReferenceDataset {
    /// Load the corpus from a JSON file and partition the pointer-ID universe.
    ///
    /// The first `delete_pool_size` IDs become the single-use delete pool; the
    /// rest form the reusable pool for read and update requests.
    pub fn load(path: &Path, delete_pool_size: usize) -> Result<Self, ReferenceDataError> {
        let content = std::fs::read_to_string(path).map_err(|source| ReferenceDataError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let file: ReferenceFile =
            serde_json::from_str(&content).map_err(|source| ReferenceDataError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        Self::from_parts(file.documents, file.nhs_numbers, file.ids, delete_pool_size)
    }

    fn from_parts(
        documents: Map<String, Value>,
        nhs_numbers: Vec<String>,
        ids: Option<Vec<String>>,
        delete_pool_size: usize,
    ) -> Result<Self, ReferenceDataError> {
        // Explicit list wins; otherwise the documents keys in insertion order
        let all_ids: Vec<String> = match ids {
            Some(ids) => ids,
            None => documents.keys().cloned().collect(),
        };

        if all_ids.is_empty() {
            return Err(ReferenceDataError::EmptyUniverse);
        }
        if delete_pool_size > all_ids.len() {
            return Err(ReferenceDataError::InsufficientData {
                requested: delete_pool_size,
                available: all_ids.len(),
            });
        }

        let mut parsed = HashMap::with_capacity(documents.len());
        for (id, body) in documents {
            let document: DocumentReference = serde_json::from_value(body)
                .map_err(|source| ReferenceDataError::InvalidDocument {
                    id: id.clone(),
                    source,
                })?;
            parsed.insert(id, document);
        }

        let delete_ids = all_ids[..delete_pool_size].to_vec();
        let reusable_ids = all_ids[delete_pool_size..].to_vec();

        info!(
            nhs_numbers = nhs_numbers.len(),
            pointer_ids = all_ids.len(),
            delete_pool = delete_ids.len(),
            reusable_pool = reusable_ids.len(),
            "reference data loaded"
        );

        Ok(Self {
            nhs_numbers,
            documents: parsed,
            pointer_types: DEFAULT_POINTER_TYPES
                .iter()
                .map(|(code, display)| PointerType::new(code, display))
                .collect(),
            reusable_ids,
            delete_pool: DeletePool::new(delete_ids),
            delete_pool_size,
        })
    }

    /// Patient identifiers in the corpus.
    pub fn nhs_numbers(&self) -> &[String] {
        &self.nhs_numbers
    }

    /// Permitted pointer types.
    pub fn pointer_types(&self) -> &[PointerType] {
        &self.pointer_types
    }

    /// Pointer IDs reused freely by read and update requests.
    pub fn reusable_ids(&self) -> &[String] {
        &self.reusable_ids
    }

    /// The single-use delete pool.
    pub fn delete_pool(&self) -> &DeletePool {
        &self.delete_pool
    }

    /// Stored document body for a pointer ID, if present.
    pub fn document(&self, id: &str) -> Option<&DocumentReference> {
        self.documents.get(id)
    }

    /// Draw one patient identifier uniformly at random.
    pub fn random_nhs_number<R: Rng>(&self, rng: &mut R) -> Option<&String> {
        self.nhs_numbers.choose(rng)
    }

    /// Draw one pointer type uniformly at random.
    pub fn random_pointer_type<R: Rng>(&self, rng: &mut R) -> Option<&PointerType> {
        self.pointer_types.choose(rng)
    }

    /// Draw one reusable pointer ID uniformly at random.
    pub fn random_reusable_id<R: Rng>(&self, rng: &mut R) -> Option<&String> {
        self.reusable_ids.choose(rng)
    }

    /// Human-readable partition summary for startup logging.
    pub fn describe(&self) -> String {
        format!(
            "reference data: {} patients, {} pointer types, {} delete-pool IDs, {} reusable IDs",
            self.nhs_numbers.len(),
            self.pointer_types.len(),
            self.delete_pool_size,
            self.reusable_ids.len(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;
    use std::io::Write;

    fn document_body(nhs_number: &str) -> Value {
        let mut template: Value =
            serde_json::from_str(crate::record::DEFAULT_TEMPLATE).expect("template parses");
        template["subject"]["identifier"]["value"] = Value::String(nhs_number.to_string());
        template
    }

    fn corpus(ids: &[&str], explicit_ids: bool) -> String {
        let mut documents = Map::new();
        for id in ids {
            documents.insert(id.to_string(), document_body("9278693472"));
        }
        let mut root = Map::new();
        root.insert("documents".to_string(), Value::Object(documents));
        root.insert(
            "nhs_numbers".to_string(),
            serde_json::json!(["9278693472", "9278693480"]),
        );
        if explicit_ids {
            root.insert("ids".to_string(), serde_json::json!(ids));
        }
        Value::Object(root).to_string()
    }

    fn write_corpus(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(content.as_bytes()).expect("write corpus");
        file
    }

    #[test]
    fn test_load_with_explicit_ids() {
        let file = write_corpus(&corpus(&["Y05868-a", "Y05868-b", "Y05868-c"], true));
        let dataset = ReferenceDataset::load(file.path(), 1).expect("loads");

        assert_eq!(dataset.nhs_numbers().len(), 2);
        assert_eq!(dataset.delete_pool().remaining(), 1);
        assert_eq!(dataset.reusable_ids(), &["Y05868-b", "Y05868-c"]);
    }

    #[test]
    fn test_ids_fall_back_to_document_keys_in_order() {
        let ids = ["Y05868-z", "Y05868-m", "Y05868-a"];
        let file = write_corpus(&corpus(&ids, false));
        let dataset = ReferenceDataset::load(file.path(), 1).expect("loads");

        // Insertion order preserved, not sorted
        assert_eq!(dataset.reusable_ids(), &["Y05868-m", "Y05868-a"]);
    }

    #[test]
    fn test_pools_are_disjoint_and_cover_universe() {
        let ids: Vec<String> = (0..20).map(|i| format!("Y05868-{i}")).collect();
        let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let file = write_corpus(&corpus(&id_refs, true));
        let dataset = ReferenceDataset::load(file.path(), 7).expect("loads");

        let mut rng = StdRng::seed_from_u64(42);
        let mut delete_ids = HashSet::new();
        while let Some(id) = dataset.delete_pool().pop_random(&mut rng) {
            delete_ids.insert(id);
        }
        let reusable: HashSet<String> = dataset.reusable_ids().iter().cloned().collect();

        assert_eq!(delete_ids.len(), 7);
        assert!(delete_ids.is_disjoint(&reusable));

        let union: HashSet<&String> = delete_ids.union(&reusable).collect();
        assert_eq!(union.len(), ids.len());
    }

    #[test]
    fn test_delete_pool_is_single_use() {
        let ids: Vec<String> = (0..50).map(|i| format!("Y05868-{i}")).collect();
        let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let file = write_corpus(&corpus(&id_refs, true));
        let dataset = ReferenceDataset::load(file.path(), 50).expect("loads");

        let mut rng = StdRng::seed_from_u64(1);
        let mut seen = HashSet::new();
        for _ in 0..50 {
            let id = dataset.delete_pool().pop_random(&mut rng).expect("id");
            assert!(seen.insert(id), "duplicate ID handed out");
        }
        assert!(dataset.delete_pool().pop_random(&mut rng).is_none());
    }

    #[test]
    fn test_delete_pool_is_exclusive_under_concurrent_pops() {
        let ids: Vec<String> = (0..64).map(|i| format!("Y05868-{i}")).collect();
        let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let file = write_corpus(&corpus(&id_refs, true));
        let dataset =
            std::sync::Arc::new(ReferenceDataset::load(file.path(), 64).expect("loads"));

        let mut handles = Vec::new();
        for worker in 0..8u64 {
            let dataset = std::sync::Arc::clone(&dataset);
            handles.push(std::thread::spawn(move || {
                let mut rng = StdRng::seed_from_u64(worker);
                let mut popped = Vec::new();
                while let Some(id) = dataset.delete_pool().pop_random(&mut rng) {
                    popped.push(id);
                }
                popped
            }));
        }

        let mut seen = HashSet::new();
        let mut total = 0;
        for handle in handles {
            for id in handle.join().expect("thread panicked") {
                assert!(seen.insert(id), "duplicate ID handed out across workers");
                total += 1;
            }
        }
        assert_eq!(total, 64);
        assert_eq!(dataset.delete_pool().remaining(), 0);
    }

    #[test]
    fn test_insufficient_data_for_oversized_delete_pool() {
        let file = write_corpus(&corpus(&["Y05868-a", "Y05868-b"], true));
        let err = ReferenceDataset::load(file.path(), 3).expect_err("must fail");
        assert!(matches!(
            err,
            ReferenceDataError::InsufficientData {
                requested: 3,
                available: 2
            }
        ));
    }

    #[test]
    fn test_missing_file_is_a_read_error() {
        let err = ReferenceDataset::load(Path::new("/nonexistent/reference.json"), 0)
            .expect_err("must fail");
        assert!(matches!(err, ReferenceDataError::Read { .. }));
    }

    #[test]
    fn test_missing_required_key_is_a_parse_error() {
        let file = write_corpus(r#"{"documents": {}}"#);
        let err = ReferenceDataset::load(file.path(), 0).expect_err("must fail");
        assert!(matches!(err, ReferenceDataError::Parse { .. }));
    }

    #[test]
    fn test_empty_universe_is_rejected() {
        let file = write_corpus(r#"{"documents": {}, "nhs_numbers": []}"#);
        let err = ReferenceDataset::load(file.path(), 0).expect_err("must fail");
        assert!(matches!(err, ReferenceDataError::EmptyUniverse));
    }

    #[test]
    fn test_random_draws_come_from_the_corpus() {
        let ids: Vec<String> = (0..10).map(|i| format!("Y05868-{i}")).collect();
        let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let file = write_corpus(&corpus(&id_refs, true));
        let dataset = ReferenceDataset::load(file.path(), 3).expect("loads");

        let mut rng = StdRng::seed_from_u64(3);
        let reusable: HashSet<&String> = dataset.reusable_ids().iter().collect();
        for _ in 0..1000 {
            let id = dataset.random_reusable_id(&mut rng).expect("id");
            assert!(reusable.contains(id));
        }
    }
}
