use async_trait::async_trait;
use bson::oid::ObjectId;
use bson::{Bson, Document};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use super::eval::{bson_equal, eval_filter, parse_filter};
use super::update::apply_update;
use super::{CollectionHandle, Connection, DeleteReport, Driver, InsertReport, UpdateReport, persist};
use crate::errors::StoreError;
use crate::filter::UpdateOptions;

/// Documents of one collection plus the lock serializing its writers.
#[derive(Default)]
struct Shelf {
    docs: RwLock<Vec<Document>>,
    writer: tokio::sync::Mutex<()>,
}

type Docs = Arc<Shelf>;

/// Snapshot of connection bookkeeping for one driver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionStats {
    pub opened: u64,
    pub closed: u64,
}

impl ConnectionStats {
    /// Connections opened and not yet closed.
    #[must_use]
    pub const fn open(&self) -> u64 {
        self.opened.saturating_sub(self.closed)
    }
}

#[derive(Debug, Default)]
struct Counters {
    opened: AtomicU64,
    closed: AtomicU64,
}

enum Origin {
    Memory,
    Dir(PathBuf),
}

struct Database {
    origin: Origin,
    collections: RwLock<HashMap<String, Docs>>,
}

impl Database {
    fn in_memory() -> Self {
        Self { origin: Origin::Memory, collections: RwLock::new(HashMap::new()) }
    }

    fn from_dir(dir: PathBuf, loaded: HashMap<String, Vec<Document>>) -> Self {
        let collections = loaded
            .into_iter()
            .map(|(k, v)| (k, Arc::new(Shelf { docs: RwLock::new(v), writer: tokio::sync::Mutex::new(()) })))
            .collect();
        Self { origin: Origin::Dir(dir), collections: RwLock::new(collections) }
    }

    fn dir(&self) -> Option<&Path> {
        match &self.origin {
            Origin::Memory => None,
            Origin::Dir(dir) => Some(dir),
        }
    }

    fn collection(&self, name: &str) -> Docs {
        if let Some(docs) = self.collections.read().get(name) {
            return docs.clone();
        }
        self.collections.write().entry(name.to_string()).or_default().clone()
    }
}

enum Target {
    Memory(String),
    Dir(PathBuf),
}

fn parse_uri(uri: &str) -> Result<Target, StoreError> {
    if let Some(rest) = uri.strip_prefix("memory://") {
        let name = rest.trim_matches('/');
        if name.contains('/') {
            return Err(StoreError::Connect(format!("invalid database name in {uri}")));
        }
        let name = if name.is_empty() { "default" } else { name };
        return Ok(Target::Memory(name.to_string()));
    }
    if let Some(rest) = uri.strip_prefix("file://") {
        if rest.is_empty() {
            return Err(StoreError::Connect("file:// requires a directory".into()));
        }
        return Ok(Target::Dir(PathBuf::from(rest)));
    }
    Err(StoreError::Connect(format!("unsupported connection string: {uri}")))
}

/// In-process document store.
///
/// `memory://<name>` databases live as long as the driver and are shared by
/// every connection to the same name. `file://<dir>` databases are read from
/// `<dir>/*.ndjson` on the first connect, shared by every later connection to
/// the same directory, and each mutated collection is written through before
/// the operation returns.
#[derive(Default)]
pub struct MemoryDriver {
    databases: RwLock<HashMap<String, Arc<Database>>>,
    counters: Arc<Counters>,
    next_id: AtomicU64,
}

impl MemoryDriver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn stats(&self) -> ConnectionStats {
        ConnectionStats {
            opened: self.counters.opened.load(Ordering::SeqCst),
            closed: self.counters.closed.load(Ordering::SeqCst),
        }
    }

    /// Seeds a `memory://` database collection, bypassing the pipeline.
    pub fn seed(&self, database: &str, collection: &str, docs: impl IntoIterator<Item = Document>) {
        let shelf = self.memory_db(database).collection(collection);
        let mut guard = shelf.docs.write();
        for d in docs {
            guard.push(with_id(d));
        }
    }

    /// Copies every document of a `memory://` collection.
    #[must_use]
    pub fn dump(&self, database: &str, collection: &str) -> Vec<Document> {
        self.memory_db(database).collection(collection).docs.read().clone()
    }

    fn memory_db(&self, name: &str) -> Arc<Database> {
        if let Some(db) = self.databases.read().get(name) {
            return db.clone();
        }
        self.databases.write().entry(name.to_string()).or_insert_with(|| Arc::new(Database::in_memory())).clone()
    }

    async fn dir_db(&self, dir: PathBuf) -> Result<Arc<Database>, StoreError> {
        tokio::fs::create_dir_all(&dir).await?;
        let dir = tokio::fs::canonicalize(&dir).await?;
        // keys of memory databases never contain '/', so these cannot collide
        let key = format!("file://{}", dir.display());
        let cached = self.databases.read().get(&key).cloned();
        if let Some(db) = cached {
            return Ok(db);
        }
        let loaded = persist::load_dir(&dir).await?;
        let db = Arc::new(Database::from_dir(dir, loaded));
        Ok(self.databases.write().entry(key).or_insert(db).clone())
    }
}

impl std::fmt::Debug for MemoryDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDriver")
            .field("databases", &self.databases.read().keys().collect::<Vec<_>>())
            .field("stats", &self.stats())
            .finish()
    }
}

#[async_trait]
impl Driver for MemoryDriver {
    async fn connect(&self, uri: &str) -> Result<Arc<dyn Connection>, StoreError> {
        let db = match parse_uri(uri)? {
            Target::Memory(name) => self.memory_db(&name),
            Target::Dir(dir) => self.dir_db(dir).await?,
        };
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        log::debug!("connection #{id} opened ({uri})");
        Ok(Arc::new(MemoryConnection {
            id,
            db,
            closed: Arc::new(AtomicBool::new(false)),
            counters: self.counters.clone(),
        }))
    }
}

struct MemoryConnection {
    id: u64,
    db: Arc<Database>,
    closed: Arc<AtomicBool>,
    counters: Arc<Counters>,
}

#[async_trait]
impl Connection for MemoryConnection {
    fn collection(&self, name: &str) -> Result<Arc<dyn CollectionHandle>, StoreError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StoreError::Closed);
        }
        if name.is_empty() || name.contains(['/', '\\', '$', '\0']) {
            return Err(StoreError::Other(format!("invalid collection name: {name:?}")));
        }
        Ok(Arc::new(MemoryCollection {
            name: name.to_string(),
            shelf: self.db.collection(name),
            dir: self.db.dir().map(Path::to_path_buf),
            closed: self.closed.clone(),
        }))
    }

    async fn close(&self) -> Result<(), StoreError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(StoreError::Closed);
        }
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
        log::debug!("connection #{} closed", self.id);
        Ok(())
    }
}

struct MemoryCollection {
    name: String,
    shelf: Docs,
    dir: Option<PathBuf>,
    closed: Arc<AtomicBool>,
}

impl MemoryCollection {
    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::SeqCst) { Err(StoreError::Closed) } else { Ok(()) }
    }

    /// Runs `stage` on a copy of the collection, persists the copy for
    /// `file://` databases, then swaps it in. Any failure leaves the
    /// collection untouched.
    async fn commit<T, F>(&self, stage: F) -> Result<T, StoreError>
    where
        T: Send,
        F: FnOnce(&mut Vec<Document>) -> Result<T, StoreError> + Send,
    {
        let _writer = self.shelf.writer.lock().await;
        let mut staged = self.shelf.docs.read().clone();
        let out = stage(&mut staged)?;
        if let Some(dir) = &self.dir {
            persist::write_collection(dir, &self.name, &staged).await?;
        }
        *self.shelf.docs.write() = staged;
        Ok(out)
    }
}

fn with_id(document: Document) -> Document {
    if document.contains_key("_id") {
        return document;
    }
    let mut out = Document::new();
    out.insert("_id", ObjectId::new());
    for (k, v) in document {
        out.insert(k, v);
    }
    out
}

#[async_trait]
impl CollectionHandle for MemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn find(&self, filter: &Document) -> Result<Vec<Document>, StoreError> {
        self.ensure_open()?;
        let parsed = parse_filter(filter)?;
        let docs: Vec<Document> = self.shelf.docs.read().iter().filter(|d| eval_filter(d, &parsed)).cloned().collect();
        log::trace!("find on {} matched {}", self.name, docs.len());
        Ok(docs)
    }

    async fn remove(&self, filter: &Document) -> Result<DeleteReport, StoreError> {
        self.ensure_open()?;
        let parsed = parse_filter(filter)?;
        let deleted = self
            .commit(|docs| {
                let before = docs.len();
                docs.retain(|d| !eval_filter(d, &parsed));
                Ok((before - docs.len()) as u64)
            })
            .await?;
        log::trace!("remove on {} deleted {deleted}", self.name);
        Ok(DeleteReport { deleted })
    }

    async fn update(
        &self,
        filter: &Document,
        update: &Document,
        options: UpdateOptions,
    ) -> Result<UpdateReport, StoreError> {
        self.ensure_open()?;
        let parsed = parse_filter(filter)?;
        let report = self
            .commit(|docs| {
                let mut report = UpdateReport::default();
                for d in docs.iter_mut().filter(|d| eval_filter(d, &parsed)) {
                    report.matched += 1;
                    report.modified += u64::from(apply_update(d, update)?);
                    if !options.multi {
                        break;
                    }
                }
                Ok(report)
            })
            .await?;
        log::trace!("update on {} matched {} modified {}", self.name, report.matched, report.modified);
        Ok(report)
    }

    async fn insert(&self, document: Document) -> Result<InsertReport, StoreError> {
        self.ensure_open()?;
        let document = with_id(document);
        let inserted_id = document.get("_id").cloned().unwrap_or(Bson::Null);
        let id = inserted_id.clone();
        self.commit(move |docs| {
            if docs.iter().any(|d| d.get("_id").is_some_and(|existing| bson_equal(existing, &id))) {
                return Err(StoreError::DuplicateId(id.to_string()));
            }
            docs.push(document);
            Ok(())
        })
        .await?;
        log::trace!("insert on {} -> {inserted_id}", self.name);
        Ok(InsertReport { inserted_id })
    }
}
