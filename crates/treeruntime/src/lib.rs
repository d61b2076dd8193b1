//! Flow execution runtime
//!
//! This crate provides the engine that runs actor trees: the director
//! that moves tokens through child chains, the control actors that
//! shape the tree, the flow root with its runner, boolean conditions,
//! the actor type registry and the tree outline producer.

pub mod condition;
pub mod control;
mod controller;
mod director;
mod flow;
mod registry;
pub mod tree;

pub use condition::{BooleanCondition, BoxedCondition, ConstCondition, Expression};
pub use controller::FlowRunner;
pub use director::{check_chain, Director};
pub use flow::Flow;
pub use registry::{optional_str, require_str, ActorConfig, ActorFactory, ActorRegistry, ActorTypeInfo};
