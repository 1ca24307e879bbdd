//! The document-store seam the pipeline drives.
//!
//! A [`Driver`] opens connections from a connection string, a [`Connection`]
//! hands out collection handles and is closed once, and a
//! [`CollectionHandle`] performs the four filtered primitives.

mod eval;
mod memory;
mod persist;
mod update;

pub use eval::{Filter, FilterOp, eval_filter, parse_filter};
pub use memory::{ConnectionStats, MemoryDriver};
pub use update::apply_update;

use crate::errors::StoreError;
use crate::filter::UpdateOptions;
use async_trait::async_trait;
use bson::{Bson, Document};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateReport {
    pub matched: u64,
    pub modified: u64,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteReport {
    pub deleted: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertReport {
    pub inserted_id: Bson,
}

#[async_trait]
pub trait Driver: Send + Sync {
    async fn connect(&self, uri: &str) -> Result<Arc<dyn Connection>, StoreError>;
}

#[async_trait]
pub trait Connection: Send + Sync {
    fn collection(&self, name: &str) -> Result<Arc<dyn CollectionHandle>, StoreError>;

    async fn close(&self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait CollectionHandle: Send + Sync {
    fn name(&self) -> &str;

    async fn find(&self, filter: &Document) -> Result<Vec<Document>, StoreError>;

    async fn remove(&self, filter: &Document) -> Result<DeleteReport, StoreError>;

    async fn update(
        &self,
        filter: &Document,
        update: &Document,
        options: UpdateOptions,
    ) -> Result<UpdateReport, StoreError>;

    async fn insert(&self, document: Document) -> Result<InsertReport, StoreError>;
}
