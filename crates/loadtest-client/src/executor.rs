//! Per-operation request construction from the reference corpus.

use crate::error::ClientError;
use crate::headers::{self, Surface};
use loadtest_data::{create_record, DocumentReference, ReferenceDataset};
use loadtest_engine::Operation;
use rand::rngs::StdRng;
use reqwest::header::HeaderMap;
use reqwest::{Method, Url};
use std::sync::{Arc, Mutex};

/// Identifier system qualifying patient numbers in search parameters.
pub const NHS_NUMBER_SYSTEM: &str = "https://fhir.nhs.uk/Id/nhs-number";

/// Attachment URL stamped into update request bodies.
pub const UPDATED_ATTACHMENT_URL: &str = "https://example.org/loadtest-updated-url.pdf";

/// Id prefix for upsert requests, deliberately outside the ODS namespace.
pub const UPSERT_ID_PREFIX: &str = "perf";

/// Connection settings shared by every request in a run.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Scheme and host, e.g. `https://api.example.net`
    pub base_url: String,
    pub ods_code: String,
    /// Application id stamped into the metadata headers
    pub app_id: String,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, ods_code: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ods_code: ods_code.into(),
            app_id: "PointerLoadTest".to_string(),
        }
    }
}

/// Mutable state scoped to one run: pointer IDs created by this harness.
///
/// Teardown reads this back to report what the run left behind on the target.
#[derive(Debug, Default)]
pub struct RunContext {
    created_ids: Mutex<Vec<String>>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_created(&self, id: String) {
        self.created_ids
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(id);
    }

    pub fn created_count(&self) -> usize {
        self.created_ids
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn created_ids(&self) -> Vec<String> {
        self.created_ids
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

/// A fully built request, ready to send.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub operation: Operation,
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<String>,
    pub expected_status: u16,
    /// Pointer id this request creates, recorded on success
    pub created_id: Option<String>,
}

/// Builds request descriptors from the corpus; pure except for delete-pool
/// draws, so every operation is testable without a network.
pub struct RequestFactory {
    dataset: Arc<ReferenceDataset>,
    config: ClientConfig,
    template: DocumentReference,
    producer_headers: HeaderMap,
    consumer_headers: HeaderMap,
}

impl RequestFactory {
    pub fn new(
        dataset: Arc<ReferenceDataset>,
        config: ClientConfig,
        template: DocumentReference,
    ) -> Result<Self, ClientError> {
        let producer_headers = headers::header_map(
            Surface::Producer,
            &config.ods_code,
            dataset.pointer_types(),
            &config.app_id,
        )?;
        let consumer_headers = headers::header_map(
            Surface::Consumer,
            &config.ods_code,
            dataset.pointer_types(),
            &config.app_id,
        )?;
        Ok(Self {
            dataset,
            config,
            template,
            producer_headers,
            consumer_headers,
        })
    }

    /// Build one request for `operation` on its default surface.
    ///
    /// `Ok(None)` means the operation has nothing left to do (the delete pool
    /// ran dry); every other outcome is a descriptor or a hard error.
    pub fn build(
        &self,
        operation: Operation,
        rng: &mut StdRng,
    ) -> Result<Option<RequestDescriptor>, ClientError> {
        self.build_on(operation, Surface::default_for(operation), rng)
    }

    /// Build one request for `operation` on an explicit surface.
    ///
    /// Read, search, and search-post honor `surface`; the remaining
    /// operations only exist on one side of the API and ignore it.
    pub fn build_on(
        &self,
        operation: Operation,
        surface: Surface,
        rng: &mut StdRng,
    ) -> Result<Option<RequestDescriptor>, ClientError> {
        match operation {
            Operation::Create => self.build_create(rng).map(Some),
            Operation::Read => self.build_read(surface, rng).map(Some),
            Operation::Update => self.build_update(rng).map(Some),
            Operation::Delete => self.build_delete(rng),
            Operation::Upsert => self.build_upsert(rng).map(Some),
            Operation::Search => self.build_search(surface, rng).map(Some),
            Operation::SearchPost => self.build_search_post(surface, rng).map(Some),
            Operation::Count => self.build_count(rng).map(Some),
        }
    }

    fn build_create(&self, rng: &mut StdRng) -> Result<RequestDescriptor, ClientError> {
        let nhs_number = self.random_nhs_number(rng)?;
        let pointer_type = self
            .dataset
            .random_pointer_type(rng)
            .ok_or(ClientError::EmptyCorpus {
                what: "pointer types",
            })?;

        let record = create_record(&self.template, &self.config.ods_code, nhs_number, pointer_type);
        let created_id = record.id.clone();

        Ok(RequestDescriptor {
            operation: Operation::Create,
            method: Method::POST,
            url: self.surface_url(Surface::Producer, &[])?,
            headers: self.producer_headers.clone(),
            body: Some(serde_json::to_string(&record)?),
            expected_status: Operation::Create.expected_status(),
            created_id,
        })
    }

    fn build_read(&self, surface: Surface, rng: &mut StdRng) -> Result<RequestDescriptor, ClientError> {
        let id = self.random_reusable_id(rng)?;
        Ok(RequestDescriptor {
            operation: Operation::Read,
            method: Method::GET,
            url: self.surface_url(surface, &[id.as_str()])?,
            headers: self.headers_for(surface).clone(),
            body: None,
            expected_status: Operation::Read.expected_status(),
            created_id: None,
        })
    }

    fn build_upsert(&self, rng: &mut StdRng) -> Result<RequestDescriptor, ClientError> {
        let nhs_number = self.random_nhs_number(rng)?;
        let pointer_type = self
            .dataset
            .random_pointer_type(rng)
            .ok_or(ClientError::EmptyCorpus {
                what: "pointer types",
            })?;

        // Same POST as create, but with a caller-chosen id outside the ODS
        // namespace so the target exercises its upsert path
        let mut record =
            create_record(&self.template, &self.config.ods_code, nhs_number, pointer_type);
        let id = format!("{UPSERT_ID_PREFIX}-{}", uuid::Uuid::new_v4());
        record.id = Some(id.clone());

        Ok(RequestDescriptor {
            operation: Operation::Upsert,
            method: Method::POST,
            url: self.surface_url(Surface::Producer, &[])?,
            headers: self.producer_headers.clone(),
            body: Some(serde_json::to_string(&record)?),
            expected_status: Operation::Upsert.expected_status(),
            created_id: Some(id),
        })
    }

    fn build_update(&self, rng: &mut StdRng) -> Result<RequestDescriptor, ClientError> {
        let id = self.random_reusable_id(rng)?.clone();
        let stored = self
            .dataset
            .document(&id)
            .ok_or_else(|| ClientError::UnknownDocument { id: id.clone() })?;

        let mut document = stored.clone();
        if let Some(content) = document.content.first_mut() {
            content.attachment.url = Some(UPDATED_ATTACHMENT_URL.to_string());
        }

        Ok(RequestDescriptor {
            operation: Operation::Update,
            method: Method::PUT,
            url: self.surface_url(Surface::Producer, &[id.as_str()])?,
            headers: self.producer_headers.clone(),
            body: Some(serde_json::to_string(&document)?),
            expected_status: Operation::Update.expected_status(),
            created_id: None,
        })
    }

    fn build_delete(&self, rng: &mut StdRng) -> Result<Option<RequestDescriptor>, ClientError> {
        let Some(id) = self.dataset.delete_pool().pop_random(rng) else {
            return Ok(None);
        };
        Ok(Some(RequestDescriptor {
            operation: Operation::Delete,
            method: Method::DELETE,
            url: self.surface_url(Surface::Producer, &[id.as_str()])?,
            headers: self.producer_headers.clone(),
            body: None,
            expected_status: Operation::Delete.expected_status(),
            created_id: None,
        }))
    }

    fn build_search(
        &self,
        surface: Surface,
        rng: &mut StdRng,
    ) -> Result<RequestDescriptor, ClientError> {
        let nhs_number = self.random_nhs_number(rng)?;
        let pointer_type = self
            .dataset
            .random_pointer_type(rng)
            .ok_or(ClientError::EmptyCorpus {
                what: "pointer types",
            })?;

        let mut url = self.surface_url(surface, &[])?;
        url.query_pairs_mut()
            .append_pair(
                "subject:identifier",
                &format!("{NHS_NUMBER_SYSTEM}|{nhs_number}"),
            )
            .append_pair("type", &pointer_type.qualified());

        Ok(RequestDescriptor {
            operation: Operation::Search,
            method: Method::GET,
            url,
            headers: self.headers_for(surface).clone(),
            body: None,
            expected_status: Operation::Search.expected_status(),
            created_id: None,
        })
    }

    fn build_search_post(
        &self,
        surface: Surface,
        rng: &mut StdRng,
    ) -> Result<RequestDescriptor, ClientError> {
        let nhs_number = self.random_nhs_number(rng)?;
        let pointer_type = self
            .dataset
            .random_pointer_type(rng)
            .ok_or(ClientError::EmptyCorpus {
                what: "pointer types",
            })?;

        let body = serde_json::json!({
            "subject:identifier": format!("{NHS_NUMBER_SYSTEM}|{nhs_number}"),
            "type": pointer_type.qualified(),
        });

        Ok(RequestDescriptor {
            operation: Operation::SearchPost,
            method: Method::POST,
            url: self.surface_url(surface, &["_search"])?,
            headers: self.headers_for(surface).clone(),
            body: Some(body.to_string()),
            expected_status: Operation::SearchPost.expected_status(),
            created_id: None,
        })
    }

    fn build_count(&self, rng: &mut StdRng) -> Result<RequestDescriptor, ClientError> {
        let nhs_number = self.random_nhs_number(rng)?;

        let mut url = self.surface_url(Surface::Consumer, &["_count"])?;
        url.query_pairs_mut().append_pair(
            "subject:identifier",
            &format!("{NHS_NUMBER_SYSTEM}|{nhs_number}"),
        );

        Ok(RequestDescriptor {
            operation: Operation::Count,
            method: Method::GET,
            url,
            headers: self.consumer_headers.clone(),
            body: None,
            expected_status: Operation::Count.expected_status(),
            created_id: None,
        })
    }

    fn headers_for(&self, surface: Surface) -> &HeaderMap {
        match surface {
            Surface::Producer => &self.producer_headers,
            Surface::Consumer => &self.consumer_headers,
        }
    }

    fn surface_url(&self, surface: Surface, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = format!(
            "{}/{}/DocumentReference",
            self.config.base_url.trim_end_matches('/'),
            surface.path_segment()
        );
        for segment in segments {
            url.push('/');
            url.push_str(segment);
        }
        Url::parse(&url).map_err(|e| ClientError::InvalidUrl {
            url,
            detail: e.to_string(),
        })
    }

    fn random_nhs_number(&self, rng: &mut StdRng) -> Result<&String, ClientError> {
        self.dataset
            .random_nhs_number(rng)
            .ok_or(ClientError::EmptyCorpus {
                what: "nhs numbers",
            })
    }

    fn random_reusable_id(&self, rng: &mut StdRng) -> Result<&String, ClientError> {
        self.dataset
            .random_reusable_id(rng)
            .ok_or(ClientError::EmptyCorpus {
                what: "reusable pointer ids",
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use serde_json::{json, Value};
    use std::collections::HashSet;
    use std::io::Write;

    fn dataset(pointer_ids: &[&str], delete_pool_size: usize) -> Arc<ReferenceDataset> {
        let template: Value =
            serde_json::from_str(loadtest_data::DEFAULT_TEMPLATE).expect("template parses");
        let mut documents = serde_json::Map::new();
        for id in pointer_ids {
            documents.insert(id.to_string(), template.clone());
        }
        let corpus = json!({
            "documents": documents,
            "nhs_numbers": ["9278693472", "9278693480", "9278693499"],
            "ids": pointer_ids,
        });

        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(corpus.to_string().as_bytes())
            .expect("write corpus");
        Arc::new(ReferenceDataset::load(file.path(), delete_pool_size).expect("loads"))
    }

    fn factory(pointer_ids: &[&str], delete_pool_size: usize) -> RequestFactory {
        RequestFactory::new(
            dataset(pointer_ids, delete_pool_size),
            ClientConfig::new("https://api.example.net", "Y05868"),
            DocumentReference::default_template().expect("template"),
        )
        .expect("factory")
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn test_read_draws_only_from_the_reusable_pool() {
        let ids: Vec<String> = (0..10).map(|i| format!("Y05868-{i}")).collect();
        let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let factory = factory(&id_refs, 4);
        let reusable: HashSet<&str> = id_refs[4..].iter().copied().collect();

        let mut rng = rng();
        for _ in 0..1000 {
            let descriptor = factory
                .build(Operation::Read, &mut rng)
                .expect("builds")
                .expect("never idle");
            let id = descriptor
                .url
                .path_segments()
                .and_then(|mut s| s.next_back())
                .expect("id segment");
            assert!(reusable.contains(id), "read drew a delete-pool id: {id}");
        }
    }

    #[test]
    fn test_create_body_is_a_fresh_record() {
        let factory = factory(&["Y05868-a"], 0);
        let mut rng = rng();

        let descriptor = factory
            .build(Operation::Create, &mut rng)
            .expect("builds")
            .expect("never idle");

        assert_eq!(descriptor.method, Method::POST);
        assert!(descriptor.url.path().ends_with("/producer/DocumentReference"));
        assert_eq!(descriptor.expected_status, 201);

        let body: Value =
            serde_json::from_str(descriptor.body.as_deref().expect("body")).expect("body is JSON");
        let id = body["id"].as_str().expect("id stamped");
        assert!(id.starts_with("Y05868-"));
        assert_eq!(descriptor.created_id.as_deref(), Some(id));
    }

    #[test]
    fn test_read_surface_follows_the_scenario() {
        let factory = factory(&["Y05868-a", "Y05868-b"], 0);
        let mut rng = rng();

        // Producer is the default side for read
        let producer = factory
            .build(Operation::Read, &mut rng)
            .expect("builds")
            .expect("never idle");
        assert!(producer.url.path().starts_with("/producer/"));
        assert!(producer.headers.get("X-Request-Id").is_some());

        let consumer = factory
            .build_on(Operation::Read, Surface::Consumer, &mut rng)
            .expect("builds")
            .expect("never idle");
        assert!(consumer.url.path().starts_with("/consumer/"));
        assert!(consumer.headers.get("X-Request-Id").is_none());
    }

    #[test]
    fn test_upsert_stamps_an_id_outside_the_ods_namespace() {
        let factory = factory(&["Y05868-a"], 0);
        let mut rng = rng();

        let descriptor = factory
            .build(Operation::Upsert, &mut rng)
            .expect("builds")
            .expect("never idle");

        assert_eq!(descriptor.method, Method::POST);
        assert!(descriptor.url.path().ends_with("/producer/DocumentReference"));
        assert_eq!(descriptor.expected_status, 201);

        let body: Value =
            serde_json::from_str(descriptor.body.as_deref().expect("body")).expect("body is JSON");
        let id = body["id"].as_str().expect("id stamped");
        assert!(id.starts_with("perf-"));
        assert!(!id.starts_with("Y05868-"));
        assert_eq!(descriptor.created_id.as_deref(), Some(id));
    }

    #[test]
    fn test_update_rewrites_the_attachment_url() {
        let factory = factory(&["Y05868-a", "Y05868-b"], 1);
        let mut rng = rng();

        let descriptor = factory
            .build(Operation::Update, &mut rng)
            .expect("builds")
            .expect("never idle");

        assert_eq!(descriptor.method, Method::PUT);
        let body: Value =
            serde_json::from_str(descriptor.body.as_deref().expect("body")).expect("body is JSON");
        assert_eq!(
            body["content"][0]["attachment"]["url"],
            UPDATED_ATTACHMENT_URL
        );
    }

    #[test]
    fn test_delete_goes_idle_when_the_pool_runs_dry() {
        let factory = factory(&["Y05868-a", "Y05868-b", "Y05868-c"], 2);
        let mut rng = rng();

        let mut deleted = HashSet::new();
        for _ in 0..2 {
            let descriptor = factory
                .build(Operation::Delete, &mut rng)
                .expect("builds")
                .expect("pool not yet dry");
            assert_eq!(descriptor.method, Method::DELETE);
            let id = descriptor
                .url
                .path_segments()
                .and_then(|mut s| s.next_back())
                .expect("id segment")
                .to_string();
            assert!(deleted.insert(id), "same id deleted twice");
        }

        assert!(factory
            .build(Operation::Delete, &mut rng)
            .expect("builds")
            .is_none());
    }

    #[test]
    fn test_search_url_embeds_corpus_values() {
        let factory = factory(&["Y05868-a"], 0);
        let types: HashSet<String> = loadtest_data::DEFAULT_POINTER_TYPES
            .iter()
            .map(|(code, _)| format!("http://snomed.info/sct|{code}"))
            .collect();
        let numbers: HashSet<String> = ["9278693472", "9278693480", "9278693499"]
            .iter()
            .map(|n| format!("{NHS_NUMBER_SYSTEM}|{n}"))
            .collect();

        let mut rng = rng();
        for _ in 0..100 {
            let descriptor = factory
                .build(Operation::Search, &mut rng)
                .expect("builds")
                .expect("never idle");
            assert!(descriptor.url.path().ends_with("/consumer/DocumentReference"));

            let pairs: Vec<(String, String)> = descriptor
                .url
                .query_pairs()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            assert_eq!(pairs.len(), 2);
            assert_eq!(pairs[0].0, "subject:identifier");
            assert!(numbers.contains(&pairs[0].1), "unknown subject {}", pairs[0].1);
            assert_eq!(pairs[1].0, "type");
            assert!(types.contains(&pairs[1].1), "unknown type {}", pairs[1].1);
        }
    }

    #[test]
    fn test_search_post_body_matches_the_query_parameters() {
        let factory = factory(&["Y05868-a"], 0);
        let mut rng = rng();

        let descriptor = factory
            .build(Operation::SearchPost, &mut rng)
            .expect("builds")
            .expect("never idle");

        assert_eq!(descriptor.method, Method::POST);
        assert!(descriptor.url.path().ends_with("/DocumentReference/_search"));

        let body: Value =
            serde_json::from_str(descriptor.body.as_deref().expect("body")).expect("body is JSON");
        assert!(body["subject:identifier"]
            .as_str()
            .expect("subject")
            .starts_with(NHS_NUMBER_SYSTEM));
        assert!(body["type"]
            .as_str()
            .expect("type")
            .starts_with("http://snomed.info/sct|"));
    }

    #[test]
    fn test_count_url_has_only_the_subject_parameter() {
        let factory = factory(&["Y05868-a"], 0);
        let mut rng = rng();

        let descriptor = factory
            .build(Operation::Count, &mut rng)
            .expect("builds")
            .expect("never idle");

        assert!(descriptor.url.path().ends_with("/DocumentReference/_count"));
        let keys: Vec<String> = descriptor
            .url
            .query_pairs()
            .map(|(k, _)| k.to_string())
            .collect();
        assert_eq!(keys, vec!["subject:identifier"]);
    }

    #[test]
    fn test_run_context_collects_created_ids_concurrently() {
        let run = Arc::new(RunContext::new());
        let mut handles = Vec::new();
        for worker in 0..4 {
            let run = Arc::clone(&run);
            handles.push(std::thread::spawn(move || {
                for i in 0..100 {
                    run.record_created(format!("Y05868-{worker}-{i}"));
                }
            }));
        }
        for handle in handles {
            handle.join().expect("thread panicked");
        }
        assert_eq!(run.created_count(), 400);

        let ids = run.created_ids();
        assert_eq!(ids.len(), 400);
        assert!(ids.contains(&"Y05868-0-0".to_string()));
        assert!(ids.contains(&"Y05868-3-99".to_string()));
    }
}
