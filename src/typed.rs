//! Phase-typed chains.
//!
//! [`Chain`] carries the same steps as [`Builder`] but encodes the current
//! phase in its type, so calls that would fail a precondition at run time do
//! not compile: `find` exists only once a filter is ready, `update` only once
//! both a filter and an assignment are queued.
//!
//! ```compile_fail
//! # use std::sync::Arc;
//! # use multivarka::{store::MemoryDriver, typed::Chain};
//! # async fn demo() {
//! // `equal` needs a field first.
//! let _ = Chain::new(Arc::new(MemoryDriver::new())).server("memory://").collection("users").equal(1);
//! # }
//! ```

use bson::{Bson, Document};
use std::marker::PhantomData;
use std::sync::Arc;

use crate::builder::Builder;
use crate::errors::PipelineError;
use crate::store::{DeleteReport, Driver, InsertReport, UpdateReport};

#[derive(Debug)]
pub struct Unconnected;
#[derive(Debug)]
pub struct Connected;
#[derive(Debug)]
pub struct CollectionBound;
#[derive(Debug)]
pub struct FieldSelected;
#[derive(Debug)]
pub struct FilterReady;
#[derive(Debug)]
pub struct UpdateReady;

#[derive(Debug)]
pub struct Chain<P> {
    inner: Builder,
    _phase: PhantomData<P>,
}

impl<P> Chain<P> {
    fn to<Q>(inner: Builder) -> Chain<Q> {
        Chain { inner, _phase: PhantomData }
    }

    /// The untyped builder holding the same steps.
    #[must_use]
    pub fn into_builder(self) -> Builder {
        self.inner
    }
}

impl Chain<Unconnected> {
    #[must_use]
    pub fn new(driver: Arc<dyn Driver>) -> Self {
        Self::to(Builder::new(driver))
    }

    #[must_use]
    pub fn server(self, uri: impl Into<String>) -> Chain<Connected> {
        Self::to(self.inner.server(uri))
    }
}

impl Chain<Connected> {
    #[must_use]
    pub fn collection(self, name: impl Into<String>) -> Chain<CollectionBound> {
        Self::to(self.inner.collection(name))
    }
}

impl Chain<CollectionBound> {
    #[must_use]
    pub fn where_(self, field: impl Into<String>) -> Chain<FieldSelected> {
        Self::to(self.inner.where_(field))
    }

    pub async fn insert(self, document: Document) -> Result<InsertReport, PipelineError> {
        self.inner.insert(document).await
    }
}

impl Chain<FieldSelected> {
    #[must_use]
    pub fn not(self) -> Self {
        Self::to(self.inner.not())
    }

    #[must_use]
    pub fn equal(self, value: impl Into<Bson>) -> Chain<FilterReady> {
        Self::to(self.inner.equal(value))
    }

    #[must_use]
    pub fn less_than(self, value: impl Into<Bson>) -> Chain<FilterReady> {
        Self::to(self.inner.less_than(value))
    }

    #[must_use]
    pub fn greater_than(self, value: impl Into<Bson>) -> Chain<FilterReady> {
        Self::to(self.inner.greater_than(value))
    }

    #[must_use]
    pub fn include<I, V>(self, values: I) -> Chain<FilterReady>
    where
        I: IntoIterator<Item = V>,
        V: Into<Bson>,
    {
        Self::to(self.inner.include(values))
    }
}

impl Chain<FilterReady> {
    /// Starts another clause; it is combined with the earlier ones.
    #[must_use]
    pub fn where_(self, field: impl Into<String>) -> Chain<FieldSelected> {
        Self::to(self.inner.where_(field))
    }

    #[must_use]
    pub fn set(self, field: impl Into<String>, value: impl Into<Bson>) -> Chain<UpdateReady> {
        Self::to(self.inner.set(field, value))
    }

    pub async fn find(self) -> Result<Vec<Document>, PipelineError> {
        self.inner.find().await
    }

    pub async fn remove(self) -> Result<DeleteReport, PipelineError> {
        self.inner.remove().await
    }
}

impl Chain<UpdateReady> {
    #[must_use]
    pub fn set(self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::to(self.inner.set(field, value))
    }

    pub async fn update(self) -> Result<UpdateReport, PipelineError> {
        self.inner.update().await
    }
}
