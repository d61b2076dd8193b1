//! Core abstractions for the treeflow engine
//!
//! This crate provides the fundamental types and traits that all other
//! components depend on: tokens, the dynamic value type, validated
//! names, the variable store, flow storage, callable-actor scoping,
//! the actor contract and the flow context, plus the error taxonomy
//! and the pluggable error/restart policies.

mod actor;
mod callable;
mod context;
mod error;
pub mod events;
mod names;
mod policy;
mod report;
mod storage;
mod token;
mod value;
mod variables;

pub use actor::{Actor, ActorBase, ActorKind, ActorState, BoxedActor, ExecResult, Outcome};
pub use callable::{CallableHandle, CallableScope, SharedActor};
pub use context::FlowContext;
pub use error::{ConfigError, ExecError, FlowError};
pub use events::{EventBus, EventEmitter, ExecutionEvent, ExecutionId};
pub use names::{StorageName, VariableName};
pub use policy::{
    ContinueOnError, ErrorAction, ErrorPolicy, NoRestart, PostRunHook, RestartLimit,
    RestartPolicy, StopOnError,
};
pub use report::{RunOutcome, RunReport};
pub use storage::Storage;
pub use token::Token;
pub use value::Value;
pub use variables::{Expandable, Variables};

/// Result type for flow operations
pub type Result<T> = std::result::Result<T, FlowError>;
