use thiserror::Error;

/// Errors raised while building a plan.
///
/// These travel inside `anyhow::Error`; callers that need to react to a
/// specific failure can `downcast_ref::<PlanError>()`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("no join predicate or product connects table '{table}'")]
    NoJoinPossible { table: String },
    #[error("malformed conditional operator '{op}'")]
    MalformedOperator { op: String },
    #[error("unknown table '{table}'")]
    UnknownTable { table: String },
    #[error("unknown field '{field}'")]
    UnknownField { field: String },
    #[error("duplicate field '{field}' in schema")]
    DuplicateField { field: String },
    #[error("query mentions no tables")]
    EmptyQuery,
}
