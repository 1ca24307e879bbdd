use super::context::{Context, ContextKey};
use super::step::StepKind;
use crate::errors::PipelineError;

/// Fields `kind` requires that `ctx` does not carry, in table order.
#[must_use]
pub fn missing(ctx: &Context, kind: StepKind) -> Vec<ContextKey> {
    kind.requires().iter().copied().filter(|k| !ctx.has(*k)).collect()
}

/// Fails with [`PipelineError::Precondition`] unless `ctx` carries every
/// field `kind` requires.
///
/// # Errors
/// Lists every missing field, not only the first.
pub fn validate(ctx: &Context, kind: StepKind) -> Result<(), PipelineError> {
    let missing = missing(ctx, kind);
    if missing.is_empty() {
        return Ok(());
    }
    log::debug!("precondition failed for {kind}: missing {missing:?}");
    Err(PipelineError::Precondition { step: kind, missing })
}

/// Borrows a single required field, reporting it as missing when absent.
pub(crate) fn required<T>(value: Option<&T>, step: StepKind, key: ContextKey) -> Result<&T, PipelineError> {
    value.ok_or_else(|| PipelineError::Precondition { step, missing: vec![key] })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_context_misses_everything_a_read_needs() {
        let ctx = Context::default();
        assert_eq!(
            missing(&ctx, StepKind::Find),
            vec![
                ContextKey::Connection,
                ContextKey::Collection,
                ContextKey::TargetField,
                ContextKey::Negate,
                ContextKey::Filter
            ]
        );
        assert!(validate(&ctx, StepKind::Server).is_ok());
    }

    #[test]
    fn field_state_without_connection_still_fails() {
        let ctx = Context { target_field: Some("age".into()), negate: Some(false), ..Context::default() };
        let err = validate(&ctx, StepKind::Equal).unwrap_err();
        assert_eq!(
            err,
            PipelineError::Precondition {
                step: StepKind::Equal,
                missing: vec![ContextKey::Connection, ContextKey::Collection]
            }
        );
        assert_eq!(
            err.to_string(),
            "insufficient parameters for `equal`: missing connection, collection"
        );
    }
}
