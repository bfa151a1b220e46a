//! Common test utilities shared across integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use keyshelf_core::backend::{
    BackendStatus, CredentialBackend, FindAllReply, FindReply, FoundItem, MemoryBackend,
    PhysicalRecord,
};
use keyshelf_core::{
    Accessibility, ItemAttributes, ItemChanges, ItemQuery, QueryScope, SecureEntryStore,
};

pub const SERVICE: &str = "com.example.keyshelf.tests";

pub fn scope() -> QueryScope {
    QueryScope::new(SERVICE)
}

pub fn record(
    key: &str,
    value: &str,
    synchronizable: bool,
    accessibility: Accessibility,
) -> PhysicalRecord {
    PhysicalRecord {
        account: key.to_string(),
        service: Some(SERVICE.to_string()),
        access_group: None,
        synchronizable,
        accessibility,
        value: value.as_bytes().to_vec(),
    }
}

pub fn memory_store() -> (Arc<MemoryBackend>, SecureEntryStore) {
    let backend = Arc::new(MemoryBackend::new());
    (backend.clone(), SecureEntryStore::new(backend))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Find,
    FindAll,
    Insert,
    Update,
    Delete,
}

/// One backend call as seen by [`ScriptedBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub primitive: Primitive,
    pub account: Option<String>,
    pub synchronizable: Option<bool>,
    pub accessibility: Option<Accessibility>,
}

impl Call {
    fn query(primitive: Primitive, query: &ItemQuery) -> Self {
        Self {
            primitive,
            account: query.account.clone(),
            synchronizable: query.synchronizable,
            accessibility: query.accessibility,
        }
    }

    fn attributes(attributes: &ItemAttributes) -> Self {
        Self {
            primitive: Primitive::Insert,
            account: Some(attributes.account.clone()),
            synchronizable: attributes.synchronizable,
            accessibility: attributes.accessibility,
        }
    }
}

type Predicate = Box<dyn Fn(&Call) -> bool + Send + Sync>;
type InsertHook = Box<dyn FnMut(&MemoryBackend) + Send>;

struct Fault {
    primitive: Primitive,
    status: BackendStatus,
    applies: Predicate,
}

/// Memory backend wrapper that records calls, injects failures and can run a
/// hook right before an insert reaches the backend.
pub struct ScriptedBackend {
    pub inner: MemoryBackend,
    calls: Mutex<Vec<Call>>,
    faults: Mutex<Vec<Fault>>,
    hollow_finds: Mutex<Vec<Predicate>>,
    before_insert: Mutex<Option<InsertHook>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            inner: MemoryBackend::new(),
            calls: Mutex::new(Vec::new()),
            faults: Mutex::new(Vec::new()),
            hollow_finds: Mutex::new(Vec::new()),
            before_insert: Mutex::new(None),
        }
    }

    /// Answers every call to `primitive` with `status`.
    pub fn fail(&self, primitive: Primitive, status: BackendStatus) {
        self.fail_if(primitive, status, |_| true);
    }

    /// Answers calls to `primitive` accepted by `applies` with `status`.
    pub fn fail_if(
        &self,
        primitive: Primitive,
        status: BackendStatus,
        applies: impl Fn(&Call) -> bool + Send + Sync + 'static,
    ) {
        self.faults.lock().unwrap().push(Fault {
            primitive,
            status,
            applies: Box::new(applies),
        });
    }

    /// Answers finds accepted by `applies` with a match that carries no
    /// value bytes.
    pub fn hollow_find_if(&self, applies: impl Fn(&Call) -> bool + Send + Sync + 'static) {
        self.hollow_finds.lock().unwrap().push(Box::new(applies));
    }

    pub fn on_insert(&self, hook: impl FnMut(&MemoryBackend) + Send + 'static) {
        *self.before_insert.lock().unwrap() = Some(Box::new(hook));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, primitive: Primitive) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| call.primitive == primitive)
            .collect()
    }

    fn observe(&self, call: Call) -> Option<BackendStatus> {
        let fault = self
            .faults
            .lock()
            .unwrap()
            .iter()
            .find(|fault| fault.primitive == call.primitive && (fault.applies)(&call))
            .map(|fault| fault.status);
        self.calls.lock().unwrap().push(call);
        fault
    }
}

impl CredentialBackend for ScriptedBackend {
    fn find(&self, query: ItemQuery) -> FindReply {
        let call = Call::query(Primitive::Find, &query);
        let hollow = self.hollow_finds.lock().unwrap().iter().any(|applies| applies(&call));
        match self.observe(call) {
            Some(status) => FindReply::status(status),
            None if hollow => FindReply::found(FoundItem {
                account: query.account,
                value: None,
            }),
            None => self.inner.find(query),
        }
    }

    fn find_all(&self, query: ItemQuery) -> FindAllReply {
        match self.observe(Call::query(Primitive::FindAll, &query)) {
            Some(status) => FindAllReply::status(status),
            None => self.inner.find_all(query),
        }
    }

    fn insert(&self, attributes: ItemAttributes) -> BackendStatus {
        if let Some(status) = self.observe(Call::attributes(&attributes)) {
            return status;
        }
        if let Some(hook) = self.before_insert.lock().unwrap().as_mut() {
            hook(&self.inner);
        }
        self.inner.insert(attributes)
    }

    fn update(&self, query: ItemQuery, changes: ItemChanges) -> BackendStatus {
        match self.observe(Call::query(Primitive::Update, &query)) {
            Some(status) => status,
            None => self.inner.update(query, changes),
        }
    }

    fn delete(&self, query: ItemQuery) -> BackendStatus {
        match self.observe(Call::query(Primitive::Delete, &query)) {
            Some(status) => status,
            None => self.inner.delete(query),
        }
    }
}

pub fn scripted_store() -> (Arc<ScriptedBackend>, SecureEntryStore) {
    let backend = Arc::new(ScriptedBackend::new());
    (backend.clone(), SecureEntryStore::new(backend))
}
