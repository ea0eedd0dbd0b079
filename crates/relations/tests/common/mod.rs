//! Shared doubles for relationship collection tests
#![allow(dead_code)]

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use elif_relations::*;
use tokio::sync::oneshot;

/// Record double with optional links per association
#[derive(Debug)]
pub struct TestRecord {
    pub type_key: String,
    pub id: String,
    pub body: String,
    pub links: HashMap<String, String>,
}

impl TestRecord {
    pub fn new(type_key: &str, id: &str) -> Self {
        Self {
            type_key: type_key.to_string(),
            id: id.to_string(),
            body: String::new(),
            links: HashMap::new(),
        }
    }

    pub fn with_link(mut self, association: &str, link: &str) -> Self {
        self.links.insert(association.to_string(), link.to_string());
        self
    }

    pub fn into_ref(self) -> RecordRef {
        Arc::new(self)
    }
}

impl Record for TestRecord {
    fn type_key(&self) -> &str {
        &self.type_key
    }

    fn id(&self) -> String {
        self.id.clone()
    }

    fn link(&self, association: &str) -> Option<String> {
        self.links.get(association).cloned()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub fn comment(id: &str) -> RecordRef {
    TestRecord::new("comment", id).into_ref()
}

pub fn ids(records: &[RecordRef]) -> Vec<String> {
    records.iter().map(|record| record.id()).collect()
}

/// Ordered log shared by the repository and manager doubles
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: String) {
        self.entries.lock().unwrap().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.entries()
            .iter()
            .filter(|entry| entry.starts_with(prefix))
            .count()
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}

/// Manager double that only journals the notifications it receives
pub struct RecordingManager {
    journal: Journal,
}

impl RecordingManager {
    pub fn new(journal: Journal) -> Self {
        Self { journal }
    }
}

impl RelationshipManager for RecordingManager {
    fn add_records(&self, records: &[RecordRef], index: usize) -> RelationResult<()> {
        self.journal
            .push(format!("add [{}] @{}", ids(records).join(","), index));
        Ok(())
    }

    fn remove_records(&self, records: &[RecordRef]) -> RelationResult<()> {
        self.journal
            .push(format!("remove [{}]", ids(records).join(",")));
        Ok(())
    }
}

/// Repository double with scripted link payloads and gated reloads
pub struct FakeRepository {
    journal: Journal,
    related: Mutex<HashMap<String, Vec<RecordRef>>>,
    fetch_error: Mutex<Option<RelationError>>,
    populate_error: Mutex<Option<RelationError>>,
    gates: Mutex<HashMap<String, oneshot::Receiver<RelationResult<()>>>>,
}

impl FakeRepository {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            related: Mutex::new(HashMap::new()),
            fetch_error: Mutex::new(None),
            populate_error: Mutex::new(None),
            gates: Mutex::new(HashMap::new()),
        }
    }

    /// Members returned when `link` is fetched
    pub fn serve(&self, link: &str, records: Vec<RecordRef>) {
        self.related
            .lock()
            .unwrap()
            .insert(link.to_string(), records);
    }

    pub fn fail_fetches_with(&self, error: RelationError) {
        *self.fetch_error.lock().unwrap() = Some(error);
    }

    /// Fail fetches after the members were placed but before any of them signalled
    pub fn fail_after_populating_with(&self, error: RelationError) {
        *self.populate_error.lock().unwrap() = Some(error);
    }

    /// Hold the fetch of a link or the reload of a record id until the sender fires
    pub fn gate(&self, key: &str) -> oneshot::Sender<RelationResult<()>> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().insert(key.to_string(), rx);
        tx
    }

    async fn wait_gate(&self, key: &str) -> RelationResult<()> {
        let gate = self.gates.lock().unwrap().remove(key);
        if let Some(gate) = gate {
            gate.await
                .map_err(|_| RelationError::Task(format!("gate {} dropped", key)))??;
        }
        Ok(())
    }
}

#[async_trait]
impl EntityRepository for FakeRepository {
    async fn find_related(
        &self,
        owner: RecordRef,
        link: &str,
        meta: &RelationshipMeta,
        array: ManyArray,
    ) -> RelationResult<()> {
        self.journal
            .push(format!("find_related {} {} {}", RecordKey::of(owner.as_ref()), link, meta.name));
        self.wait_gate(link).await?;

        let error = self.fetch_error.lock().unwrap().clone();
        if let Some(error) = error {
            return Err(error);
        }

        let records = self
            .related
            .lock()
            .unwrap()
            .get(link)
            .cloned()
            .unwrap_or_default();

        array.set_expected_count(records.len())?;
        array.set_records(records.clone())?;

        let error = self.populate_error.lock().unwrap().clone();
        if let Some(error) = error {
            return Err(error);
        }

        for _ in &records {
            array.signal_member_loaded()?;
        }
        Ok(())
    }

    async fn reload_record(&self, record: RecordRef) -> RelationResult<RecordRef> {
        let id = record.id();
        self.journal.push(format!("reload {}", id));
        self.wait_gate(&id).await?;
        Ok(record)
    }

    fn create_record(&self, type_key: &str, attributes: Attributes) -> RelationResult<RecordRef> {
        self.journal.push(format!("create {}", type_key));
        let mut record = TestRecord::new(type_key, &uuid::Uuid::new_v4().to_string());
        if let Some(body) = attributes.get("body").and_then(|body| body.as_str()) {
            record.body = body.to_string();
        }
        Ok(record.into_ref())
    }
}

/// Observer double counting events
#[derive(Debug, Clone, Default)]
pub struct EventCounter {
    events: Arc<Mutex<Vec<ManyArrayEvent>>>,
}

impl EventCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ManyArrayEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn loads(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, ManyArrayEvent::DidLoad))
            .count()
    }
}

impl ManyArrayObserver for EventCounter {
    fn on_event(&self, _association: &str, event: &ManyArrayEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Owner, collection and doubles wired together
pub struct Fixture {
    pub owner: RecordRef,
    pub array: ManyArray,
    pub journal: Journal,
    pub repository: Arc<FakeRepository>,
}

pub fn fixture(owner: TestRecord, meta: RelationshipMeta, config: ManyArrayConfig) -> Fixture {
    let journal = Journal::new();
    let owner = owner.into_ref();
    let repository = Arc::new(FakeRepository::new(journal.clone()));
    let array = ManyArray::with_config(
        &owner,
        meta,
        Arc::new(RecordingManager::new(journal.clone())),
        repository.clone(),
        config,
    );

    Fixture {
        owner,
        array,
        journal,
        repository,
    }
}

pub fn comments_fixture() -> Fixture {
    fixture(
        TestRecord::new("post", "1"),
        RelationshipMeta::has_many("comments", "comment").with_inverse("post"),
        ManyArrayConfig::default(),
    )
}

pub fn linked_comments_fixture(config: ManyArrayConfig) -> Fixture {
    fixture(
        TestRecord::new("post", "1").with_link("comments", "/posts/1/comments"),
        RelationshipMeta::has_many("comments", "comment").with_inverse("post"),
        config,
    )
}
