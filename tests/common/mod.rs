#![allow(dead_code)]

use async_trait::async_trait;
use bson::{Document, doc};
use multivarka::UpdateOptions;
use multivarka::store::{
    CollectionHandle, Connection, DeleteReport, Driver, InsertReport, MemoryDriver, UpdateReport,
};
use multivarka::StoreError;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const URI: &str = "memory://app";

pub fn users() -> Vec<Document> {
    vec![
        doc! { "id": 1, "name": "ann", "age": 25, "role": "admin", "active": true },
        doc! { "id": 2, "name": "bob", "age": 30, "role": "owner", "active": true },
        doc! { "id": 3, "name": "cid", "age": 41, "role": "user", "active": true },
        doc! { "id": 7, "name": "dan", "age": 19, "role": "user", "active": true },
    ]
}

pub fn seeded() -> Arc<MemoryDriver> {
    let driver = Arc::new(MemoryDriver::new());
    driver.seed("app", "users", users());
    driver
}

pub fn names(docs: &[Document]) -> Vec<String> {
    let mut out: Vec<String> = docs.iter().map(|d| d.get_str("name").unwrap().to_string()).collect();
    out.sort();
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    None,
    Connect,
    Collection,
    Operation,
}

/// Wraps `MemoryDriver`, counting store calls and close attempts and failing
/// on demand.
pub struct FaultDriver {
    pub inner: MemoryDriver,
    pub fault: Fault,
    pub connects: Arc<AtomicUsize>,
    pub operations: Arc<AtomicUsize>,
    pub closes: Arc<AtomicUsize>,
}

impl FaultDriver {
    pub fn new(fault: Fault) -> Self {
        let inner = MemoryDriver::new();
        inner.seed("app", "users", users());
        Self {
            inner,
            fault,
            connects: Arc::default(),
            operations: Arc::default(),
            closes: Arc::default(),
        }
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn operations(&self) -> usize {
        self.operations.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Driver for FaultDriver {
    async fn connect(&self, uri: &str) -> Result<Arc<dyn Connection>, StoreError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.fault == Fault::Connect {
            return Err(StoreError::Connect("refused".into()));
        }
        let inner = self.inner.connect(uri).await?;
        Ok(Arc::new(FaultConnection {
            inner,
            fault: self.fault,
            operations: self.operations.clone(),
            closes: self.closes.clone(),
        }))
    }
}

struct FaultConnection {
    inner: Arc<dyn Connection>,
    fault: Fault,
    operations: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

#[async_trait]
impl Connection for FaultConnection {
    fn collection(&self, name: &str) -> Result<Arc<dyn CollectionHandle>, StoreError> {
        if self.fault == Fault::Collection {
            return Err(StoreError::Other("no such collection".into()));
        }
        Ok(Arc::new(FaultCollection {
            inner: self.inner.collection(name)?,
            fault: self.fault,
            operations: self.operations.clone(),
        }))
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.inner.close().await
    }
}

struct FaultCollection {
    inner: Arc<dyn CollectionHandle>,
    fault: Fault,
    operations: Arc<AtomicUsize>,
}

impl FaultCollection {
    fn enter(&self) -> Result<(), StoreError> {
        self.operations.fetch_add(1, Ordering::SeqCst);
        if self.fault == Fault::Operation {
            return Err(StoreError::Other("disk on fire".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl CollectionHandle for FaultCollection {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn find(&self, filter: &Document) -> Result<Vec<Document>, StoreError> {
        self.enter()?;
        self.inner.find(filter).await
    }

    async fn remove(&self, filter: &Document) -> Result<DeleteReport, StoreError> {
        self.enter()?;
        self.inner.remove(filter).await
    }

    async fn update(
        &self,
        filter: &Document,
        update: &Document,
        options: UpdateOptions,
    ) -> Result<UpdateReport, StoreError> {
        self.enter()?;
        self.inner.update(filter, update, options).await
    }

    async fn insert(&self, document: Document) -> Result<InsertReport, StoreError> {
        self.enter()?;
        self.inner.insert(document).await
    }
}
