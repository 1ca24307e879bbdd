//! Fluent façade over the pipeline.
//!
//! ```no_run
//! use std::sync::Arc;
//! use multivarka::{Builder, store::MemoryDriver};
//!
//! # async fn demo() -> Result<(), multivarka::PipelineError> {
//! let driver = Arc::new(MemoryDriver::new());
//! let young = Builder::new(driver)
//!     .server("memory://app")
//!     .collection("users")
//!     .where_("age")
//!     .less_than(30)
//!     .find()
//!     .await?;
//! # let _ = young;
//! # Ok(())
//! # }
//! ```

use bson::{Bson, Document};
use std::fmt;
use std::sync::Arc;

use crate::errors::PipelineError;
use crate::filter::CompareOp;
use crate::pipeline::{self, Find, Insert, Remove, Step, Update};
use crate::store::{DeleteReport, Driver, InsertReport, UpdateReport};

/// Accumulates steps; nothing touches the store until a terminal call.
///
/// Non-terminal methods never validate. A chain in the wrong order fails
/// with [`PipelineError::Precondition`] when it runs.
#[derive(Clone)]
pub struct Builder {
    driver: Arc<dyn Driver>,
    steps: Vec<Step>,
}

impl Builder {
    #[must_use]
    pub fn new(driver: Arc<dyn Driver>) -> Self {
        Self { driver, steps: Vec::new() }
    }

    fn push(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Steps queued so far, in execution order.
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Drops every queued step, keeping the driver.
    #[must_use]
    pub fn reset(mut self) -> Self {
        self.steps.clear();
        self
    }

    #[must_use]
    pub fn server(self, uri: impl Into<String>) -> Self {
        self.push(Step::Server(uri.into()))
    }

    #[must_use]
    pub fn collection(self, name: impl Into<String>) -> Self {
        self.push(Step::Collection(name.into()))
    }

    /// Selects the field the following comparison applies to and clears any
    /// pending `not`.
    #[must_use]
    pub fn where_(self, field: impl Into<String>) -> Self {
        self.push(Step::Where(field.into()))
    }

    /// Negates comparisons on the current field. Calling it twice is the same
    /// as calling it once.
    #[must_use]
    pub fn not(self) -> Self {
        self.push(Step::Not)
    }

    #[must_use]
    pub fn equal(self, value: impl Into<Bson>) -> Self {
        self.push(Step::Compare { op: CompareOp::Equal, value: value.into() })
    }

    #[must_use]
    pub fn less_than(self, value: impl Into<Bson>) -> Self {
        self.push(Step::Compare { op: CompareOp::LessThan, value: value.into() })
    }

    #[must_use]
    pub fn greater_than(self, value: impl Into<Bson>) -> Self {
        self.push(Step::Compare { op: CompareOp::GreaterThan, value: value.into() })
    }

    #[must_use]
    pub fn include<I, V>(self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Bson>,
    {
        self.push(Step::Include(values.into_iter().map(Into::into).collect()))
    }

    /// Assigns `field = value` on every matching document when `update` runs.
    #[must_use]
    pub fn set(self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.push(Step::Set { field: field.into(), value: value.into() })
    }

    pub async fn find(self) -> Result<Vec<Document>, PipelineError> {
        self.find_with(|r| r).await
    }

    pub async fn find_with<F, R>(self, callback: F) -> R
    where
        F: FnOnce(Result<Vec<Document>, PipelineError>) -> R,
    {
        let Self { driver, steps } = self;
        pipeline::execute(driver.as_ref(), steps, Find, callback).await
    }

    pub async fn remove(self) -> Result<DeleteReport, PipelineError> {
        self.remove_with(|r| r).await
    }

    pub async fn remove_with<F, R>(self, callback: F) -> R
    where
        F: FnOnce(Result<DeleteReport, PipelineError>) -> R,
    {
        let Self { driver, steps } = self;
        pipeline::execute(driver.as_ref(), steps, Remove, callback).await
    }

    pub async fn update(self) -> Result<UpdateReport, PipelineError> {
        self.update_with(|r| r).await
    }

    pub async fn update_with<F, R>(self, callback: F) -> R
    where
        F: FnOnce(Result<UpdateReport, PipelineError>) -> R,
    {
        let Self { driver, steps } = self;
        pipeline::execute(driver.as_ref(), steps, Update, callback).await
    }

    /// Inserts `document`; no filter is needed.
    pub async fn insert(self, document: Document) -> Result<InsertReport, PipelineError> {
        self.insert_with(document, |r| r).await
    }

    pub async fn insert_with<F, R>(self, document: Document, callback: F) -> R
    where
        F: FnOnce(Result<InsertReport, PipelineError>) -> R,
    {
        let Self { driver, steps } = self;
        pipeline::execute(driver.as_ref(), steps, Insert(document), callback).await
    }
}

impl fmt::Debug for Builder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builder").field("steps", &self.steps).finish_non_exhaustive()
    }
}
