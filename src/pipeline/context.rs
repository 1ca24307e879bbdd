use bson::Document;
use std::fmt;
use std::sync::Arc;

use crate::filter::UpdateOptions;
use crate::store::{CollectionHandle, Connection};

/// Names of the fields a [`Context`] may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContextKey {
    Connection,
    Collection,
    TargetField,
    Negate,
    Filter,
    UpdateSpec,
    UpdateOptions,
}

impl ContextKey {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connection => "connection",
            Self::Collection => "collection",
            Self::TargetField => "target_field",
            Self::Negate => "negate",
            Self::Filter => "filter",
            Self::UpdateSpec => "update_spec",
            Self::UpdateOptions => "update_options",
        }
    }
}

impl fmt::Display for ContextKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How far a run has progressed, derived from which fields are set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Unconnected,
    Connected,
    CollectionSelected,
    FieldSelected,
    FilterReady,
    /// The terminal step succeeded.
    Executed,
    /// A step or the terminal failed.
    Failed,
}

/// State threaded through the steps of one run.
///
/// Fields are only ever added; `negate` is the exception and is reset by
/// every `where` step.
#[derive(Default)]
pub struct Context {
    pub(crate) connection: Option<Arc<dyn Connection>>,
    pub(crate) collection: Option<Arc<dyn CollectionHandle>>,
    pub(crate) target_field: Option<String>,
    pub(crate) negate: Option<bool>,
    pub(crate) filter: Option<Document>,
    pub(crate) update_spec: Option<Document>,
    pub(crate) update_options: Option<UpdateOptions>,
    pub(crate) succeeded: Option<bool>,
}

impl Context {
    #[must_use]
    pub fn has(&self, key: ContextKey) -> bool {
        match key {
            ContextKey::Connection => self.connection.is_some(),
            ContextKey::Collection => self.collection.is_some(),
            ContextKey::TargetField => self.target_field.is_some(),
            ContextKey::Negate => self.negate.is_some(),
            ContextKey::Filter => self.filter.is_some(),
            ContextKey::UpdateSpec => self.update_spec.is_some(),
            ContextKey::UpdateOptions => self.update_options.is_some(),
        }
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        if let Some(ok) = self.succeeded {
            if ok { Phase::Executed } else { Phase::Failed }
        } else if self.connection.is_none() {
            Phase::Unconnected
        } else if self.collection.is_none() {
            Phase::Connected
        } else if self.filter.is_some() {
            Phase::FilterReady
        } else if self.target_field.is_some() {
            Phase::FieldSelected
        } else {
            Phase::CollectionSelected
        }
    }

    #[must_use]
    pub fn target_field(&self) -> Option<&str> {
        self.target_field.as_deref()
    }

    #[must_use]
    pub fn negate(&self) -> bool {
        self.negate.unwrap_or(false)
    }

    #[must_use]
    pub const fn filter(&self) -> Option<&Document> {
        self.filter.as_ref()
    }

    #[must_use]
    pub const fn update_spec(&self) -> Option<&Document> {
        self.update_spec.as_ref()
    }

    #[must_use]
    pub const fn update_options(&self) -> Option<UpdateOptions> {
        self.update_options
    }

    /// Records the run's outcome; [`Context::phase`] reports it from then on.
    pub(crate) fn finish(&mut self, ok: bool) {
        self.succeeded = Some(ok);
    }

    /// Closes the connection if one is open. Runs at most once per connection.
    pub(crate) async fn release(&mut self) {
        self.collection = None;
        if let Some(conn) = self.connection.take()
            && let Err(e) = conn.close().await
        {
            log::warn!("closing connection failed: {e}");
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("connection", &self.connection.is_some())
            .field("collection", &self.collection.as_ref().map(|c| c.name().to_string()))
            .field("target_field", &self.target_field)
            .field("negate", &self.negate)
            .field("filter", &self.filter)
            .field("update_spec", &self.update_spec)
            .field("update_options", &self.update_options)
            .field("phase", &self.phase())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Driver, MemoryDriver};

    #[tokio::test]
    async fn phase_follows_fields_then_outcome() {
        let mut ctx = Context::default();
        assert_eq!(ctx.phase(), Phase::Unconnected);

        let driver = MemoryDriver::new();
        let conn = driver.connect("memory://phase").await.unwrap();
        ctx.collection = Some(conn.collection("c").unwrap());
        ctx.connection = Some(conn);
        assert_eq!(ctx.phase(), Phase::CollectionSelected);
        ctx.target_field = Some("a".into());
        assert_eq!(ctx.phase(), Phase::FieldSelected);
        ctx.filter = Some(bson::doc! { "a": 1 });
        assert_eq!(ctx.phase(), Phase::FilterReady);

        ctx.finish(true);
        ctx.release().await;
        assert_eq!(ctx.phase(), Phase::Executed);
        assert_eq!(driver.stats().open(), 0);

        let mut failed = Context::default();
        failed.finish(false);
        assert_eq!(failed.phase(), Phase::Failed);
    }
}
