use async_trait::async_trait;
use bson::{Bson, Document};
use std::fmt;

use super::context::{Context, ContextKey};
use super::validate::required;
use crate::errors::PipelineError;
use crate::filter::{self, CompareOp, UpdateOptions};
use crate::store::{DeleteReport, Driver, InsertReport, UpdateReport};

use ContextKey as K;

/// Step identity used for precondition checks and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    Server,
    Collection,
    Where,
    Not,
    Equal,
    LessThan,
    GreaterThan,
    Include,
    Set,
    Find,
    Remove,
    Update,
    Insert,
}

impl StepKind {
    /// Context fields that must be present before the step runs.
    #[must_use]
    pub const fn requires(self) -> &'static [ContextKey] {
        match self {
            Self::Server => &[],
            Self::Collection => &[K::Connection],
            Self::Where | Self::Set | Self::Insert => &[K::Connection, K::Collection],
            Self::Not | Self::Equal | Self::LessThan | Self::GreaterThan | Self::Include => {
                &[K::Connection, K::Collection, K::TargetField, K::Negate]
            }
            Self::Find | Self::Remove => &[K::Connection, K::Collection, K::TargetField, K::Negate, K::Filter],
            Self::Update => &[
                K::Connection,
                K::Collection,
                K::TargetField,
                K::Negate,
                K::Filter,
                K::UpdateSpec,
                K::UpdateOptions,
            ],
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Server => "server",
            Self::Collection => "collection",
            Self::Where => "where",
            Self::Not => "not",
            Self::Equal => "equal",
            Self::LessThan => "less_than",
            Self::GreaterThan => "greater_than",
            Self::Include => "include",
            Self::Set => "set",
            Self::Find => "find",
            Self::Remove => "remove",
            Self::Update => "update",
            Self::Insert => "insert",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One deferred, non-terminal unit of work.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Server(String),
    Collection(String),
    Where(String),
    Not,
    Compare { op: CompareOp, value: Bson },
    Include(Vec<Bson>),
    Set { field: String, value: Bson },
}

impl Step {
    #[must_use]
    pub const fn kind(&self) -> StepKind {
        match self {
            Self::Server(_) => StepKind::Server,
            Self::Collection(_) => StepKind::Collection,
            Self::Where(_) => StepKind::Where,
            Self::Not => StepKind::Not,
            Self::Compare { op: CompareOp::Equal | CompareOp::NotEqual, .. } => StepKind::Equal,
            Self::Compare { op: CompareOp::LessThan, .. } => StepKind::LessThan,
            Self::Compare { op: CompareOp::GreaterThan, .. } => StepKind::GreaterThan,
            Self::Include(_) => StepKind::Include,
            Self::Set { .. } => StepKind::Set,
        }
    }

    /// Runs the step against `ctx`. Preconditions are checked by the caller.
    pub(crate) async fn apply(self, driver: &dyn Driver, ctx: &mut Context) -> Result<(), PipelineError> {
        let kind = self.kind();
        match self {
            Self::Server(uri) => {
                if ctx.connection.is_some() {
                    log::warn!("`server` called twice in one chain; closing the earlier connection");
                    ctx.release().await;
                    *ctx = Context::default();
                }
                let conn = driver.connect(&uri).await.map_err(PipelineError::Connect)?;
                ctx.connection = Some(conn);
            }
            Self::Collection(name) => {
                let conn = required(ctx.connection.as_ref(), kind, K::Connection)?;
                ctx.collection = Some(conn.collection(&name)?);
            }
            Self::Where(field) => {
                ctx.target_field = Some(field);
                ctx.negate = Some(false);
            }
            Self::Not => {
                ctx.negate = Some(true);
            }
            Self::Compare { op, value } => {
                let field = required(ctx.target_field.as_ref(), kind, K::TargetField)?;
                let fragment = filter::compare_fragment(field, op.resolve(ctx.negate()), value);
                ctx.filter = Some(filter::conjoin(ctx.filter.take(), fragment));
            }
            Self::Include(values) => {
                let field = required(ctx.target_field.as_ref(), kind, K::TargetField)?;
                let fragment = filter::membership_fragment(field, &values, ctx.negate());
                ctx.filter = Some(filter::conjoin(ctx.filter.take(), fragment));
            }
            Self::Set { field, value } => {
                ctx.update_spec = Some(filter::set_fragment(ctx.update_spec.take(), &field, value));
                ctx.update_options = Some(UpdateOptions::multi());
            }
        }
        Ok(())
    }
}

/// The final step of a chain: one store call producing the run's result.
#[async_trait]
pub trait Terminal: Send {
    type Output: Send;

    const KIND: StepKind;

    async fn run(self, ctx: &Context) -> Result<Self::Output, PipelineError>;
}

fn trace_documents(kind: StepKind, filter: Option<&Document>, update: Option<&Document>) {
    log::debug!(target: "multivarka::trace", "{kind} filter={filter:?} update={update:?}");
}

#[derive(Debug, Clone, Copy)]
pub struct Find;

#[async_trait]
impl Terminal for Find {
    type Output = Vec<Document>;
    const KIND: StepKind = StepKind::Find;

    async fn run(self, ctx: &Context) -> Result<Self::Output, PipelineError> {
        let coll = required(ctx.collection.as_ref(), Self::KIND, K::Collection)?;
        let filter = required(ctx.filter.as_ref(), Self::KIND, K::Filter)?;
        trace_documents(Self::KIND, Some(filter), None);
        Ok(coll.find(filter).await?)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Remove;

#[async_trait]
impl Terminal for Remove {
    type Output = DeleteReport;
    const KIND: StepKind = StepKind::Remove;

    async fn run(self, ctx: &Context) -> Result<Self::Output, PipelineError> {
        let coll = required(ctx.collection.as_ref(), Self::KIND, K::Collection)?;
        let filter = required(ctx.filter.as_ref(), Self::KIND, K::Filter)?;
        trace_documents(Self::KIND, Some(filter), None);
        Ok(coll.remove(filter).await?)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Update;

#[async_trait]
impl Terminal for Update {
    type Output = UpdateReport;
    const KIND: StepKind = StepKind::Update;

    async fn run(self, ctx: &Context) -> Result<Self::Output, PipelineError> {
        let coll = required(ctx.collection.as_ref(), Self::KIND, K::Collection)?;
        let filter = required(ctx.filter.as_ref(), Self::KIND, K::Filter)?;
        let spec = required(ctx.update_spec.as_ref(), Self::KIND, K::UpdateSpec)?;
        let options = *required(ctx.update_options.as_ref(), Self::KIND, K::UpdateOptions)?;
        trace_documents(Self::KIND, Some(filter), Some(spec));
        Ok(coll.update(filter, spec, options).await?)
    }
}

#[derive(Debug, Clone)]
pub struct Insert(pub Document);

#[async_trait]
impl Terminal for Insert {
    type Output = InsertReport;
    const KIND: StepKind = StepKind::Insert;

    async fn run(self, ctx: &Context) -> Result<Self::Output, PipelineError> {
        let coll = required(ctx.collection.as_ref(), Self::KIND, K::Collection)?;
        trace_documents(Self::KIND, None, Some(&self.0));
        Ok(coll.insert(self.0).await?)
    }
}
