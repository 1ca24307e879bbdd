//! Deferred execution: steps, the context they share, precondition checks and
//! the executor that runs them in order.

mod context;
mod exec;
mod step;
mod validate;

pub use context::{Context, ContextKey, Phase};
pub use exec::execute;
pub use step::{Find, Insert, Remove, Step, StepKind, Terminal, Update};
pub use validate::{missing, validate};
