use thiserror::Error;

/// Raised during `set_up`; the flow never starts executing.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("invalid {kind} name '{name}': {reason}")]
    InvalidName {
        kind: &'static str,
        name: String,
        reason: String,
    },

    #[error("actor '{actor}': missing option '{option}'")]
    MissingOption { actor: String, option: String },

    #[error("actor '{actor}': invalid option '{option}': {reason}")]
    InvalidOption {
        actor: String,
        option: String,
        reason: String,
    },

    #[error("actor '{actor}': {reason}")]
    InvalidStructure { actor: String, reason: String },

    #[error("callable actor '{name}' not found in any enclosing scope")]
    UnresolvedCallable { name: String },

    #[error("callable actor '{name}' already declared in this scope")]
    DuplicateCallable { name: String },

    #[error("unknown actor type '{0}'")]
    UnknownActorType(String),
}

impl ConfigError {
    pub fn invalid_structure(actor: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidStructure {
            actor: actor.into(),
            reason: reason.into(),
        }
    }
}

/// Raised during `input`/`execute`/`output`; handled per the active
/// error policy.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecError {
    #[error("actor '{actor}' failed: {reason}")]
    Failed { actor: String, reason: String },

    #[error("actor '{actor}' does not accept input")]
    UnexpectedInput { actor: String },

    #[error("actor '{actor}' was executed before being set up")]
    NotSetUp { actor: String },

    #[error("storage slot '{name}' not present")]
    MissingStorage { name: String },

    #[error("callable actor '{name}' is no longer alive")]
    DeadCallable { name: String },

    #[error("condition '{expression}' could not be evaluated: {reason}")]
    Condition { expression: String, reason: String },

    /// Failure already reported and judged fatal where it happened;
    /// enclosing levels unwind without reporting it again.
    #[error(transparent)]
    Aborted(Box<ExecError>),
}

impl ExecError {
    pub fn failed(actor: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Failed {
            actor: actor.into(),
            reason: reason.into(),
        }
    }

    /// Marks this error as handled so it unwinds without re-reporting.
    pub fn into_abort(self) -> Self {
        match self {
            Self::Aborted(_) => self,
            other => Self::Aborted(Box::new(other)),
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted(_))
    }
}

/// Umbrella error for controller-level callers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FlowError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("execution error: {0}")]
    Exec(#[from] ExecError),
}
