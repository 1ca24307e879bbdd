use super::context::Context;
use super::step::{Step, Terminal};
use super::validate::validate;
use crate::errors::PipelineError;
use crate::store::Driver;

/// Runs `steps` then `terminal` in order, hands the outcome to `complete`,
/// and closes the connection afterwards.
///
/// Each step is validated, then awaited to completion before the next one
/// starts. The first failure skips the remaining steps. The connection, if
/// one was opened, is closed exactly once after `complete` returns, whatever
/// the outcome.
pub async fn execute<T, F, R>(driver: &dyn Driver, steps: Vec<Step>, terminal: T, complete: F) -> R
where
    T: Terminal,
    F: FnOnce(Result<T::Output, PipelineError>) -> R,
{
    let mut ctx = Context::default();
    let outcome = drive(driver, &mut ctx, steps, terminal).await;
    match &outcome {
        Ok(_) => log::debug!("{} completed", T::KIND),
        Err(e) => log::warn!("{} aborted in phase {:?}: {e}", T::KIND, ctx.phase()),
    }
    ctx.finish(outcome.is_ok());
    let out = complete(outcome);
    ctx.release().await;
    log::trace!("{} finished in phase {:?}", T::KIND, ctx.phase());
    out
}

async fn drive<T: Terminal>(
    driver: &dyn Driver,
    ctx: &mut Context,
    steps: Vec<Step>,
    terminal: T,
) -> Result<T::Output, PipelineError> {
    let total = steps.len() + 1;
    for (n, step) in steps.into_iter().enumerate() {
        let kind = step.kind();
        validate(ctx, kind)?;
        log::trace!("step {}/{total}: {kind}", n + 1);
        step.apply(driver, ctx).await?;
    }
    validate(ctx, T::KIND)?;
    log::trace!("step {total}/{total}: {}", T::KIND);
    terminal.run(ctx).await
}
