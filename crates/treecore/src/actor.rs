use crate::{ConfigError, ExecError, FlowContext, Token};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::fmt;

pub type BoxedActor = Box<dyn Actor>;
pub type ExecResult = Result<Outcome, ExecError>;

/// Role of an actor within the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorKind {
    /// Produces tokens, never consumes.
    Source,
    /// Consumes and produces tokens.
    Transformer,
    /// Consumes tokens, never produces.
    Sink,
    /// Owns and drives child actors.
    Control,
    /// Takes no part in token flow; executed once per activation pass.
    Standalone,
}

impl fmt::Display for ActorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ActorKind::Source => "source",
            ActorKind::Transformer => "transformer",
            ActorKind::Sink => "sink",
            ActorKind::Control => "control",
            ActorKind::Standalone => "standalone",
        };
        f.write_str(label)
    }
}

/// Lifecycle state: Created → SetUp → (Executing ↔ idle) → WrappedUp → Destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorState {
    Created,
    SetUp,
    Executing,
    WrappedUp,
    Destroyed,
}

impl fmt::Display for ActorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ActorState::Created => "created",
            ActorState::SetUp => "set-up",
            ActorState::Executing => "executing",
            ActorState::WrappedUp => "wrapped-up",
            ActorState::Destroyed => "destroyed",
        };
        f.write_str(label)
    }
}

/// Non-error completion status. `Stopped` reports a cooperative
/// cancellation; it never triggers failure handling but still reaches
/// wrap-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Stopped,
}

impl Outcome {
    pub fn is_stopped(&self) -> bool {
        matches!(self, Outcome::Stopped)
    }
}

/// The polymorphic unit of work.
///
/// Lifecycle protocol: `set_up` validates configuration and resolves
/// callable references (idempotent, re-enterable after `wrap_up` when a
/// flow is reused); `input` presents a token to a consumer; `execute`
/// performs one activation; `output` drains produced tokens; `wrap_up`
/// flushes and closes resources, exactly once per run for every actor
/// that reached `SetUp`; `destroy` is irreversible.
#[async_trait]
pub trait Actor: Send + Sync {
    /// Type tag, e.g. "control.tee" or "source.start".
    fn actor_type(&self) -> &str;

    fn name(&self) -> &str;

    fn kind(&self) -> ActorKind;

    fn state(&self) -> ActorState;

    /// Skipped actors are invisible to token flow.
    fn is_skipped(&self) -> bool {
        false
    }

    fn accepts_input(&self) -> bool {
        matches!(self.kind(), ActorKind::Transformer | ActorKind::Sink)
    }

    fn produces_output(&self) -> bool {
        matches!(self.kind(), ActorKind::Source | ActorKind::Transformer)
    }

    async fn set_up(&mut self, ctx: &FlowContext) -> Result<(), ConfigError>;

    fn input(&mut self, token: Token) -> Result<(), ExecError> {
        let _ = token;
        Err(ExecError::UnexpectedInput {
            actor: self.name().to_string(),
        })
    }

    async fn execute(&mut self) -> ExecResult;

    fn output(&mut self) -> Option<Token> {
        None
    }

    fn has_pending_output(&self) -> bool {
        false
    }

    async fn wrap_up(&mut self);

    fn destroy(&mut self);

    /// Read access to owned children, for diagnostics.
    fn children(&self) -> Vec<&dyn Actor> {
        Vec::new()
    }

    /// One-line summary used by the tree producer.
    fn describe(&self) -> String {
        format!("{} [{}: {}]", self.name(), self.actor_type(), self.kind())
    }
}

/// Shared plumbing embedded by every actor implementation: name,
/// lifecycle state, captured flow context, output queue, skip flag.
#[derive(Debug)]
pub struct ActorBase {
    name: String,
    state: ActorState,
    skipped: bool,
    ctx: Option<FlowContext>,
    output: VecDeque<Token>,
}

impl ActorBase {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: ActorState::Created,
            skipped: false,
            ctx: None,
            output: VecDeque::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn state(&self) -> ActorState {
        self.state
    }

    pub fn is_skipped(&self) -> bool {
        self.skipped
    }

    pub fn set_skipped(&mut self, skipped: bool) {
        self.skipped = skipped;
    }

    /// Transitions into `SetUp` and captures the context. Legal from
    /// `Created`, from `SetUp` (idempotent) and from `WrappedUp` (flow
    /// reuse).
    pub fn begin_set_up(&mut self, ctx: &FlowContext) -> Result<(), ConfigError> {
        match self.state {
            ActorState::Created | ActorState::SetUp | ActorState::WrappedUp => {
                self.ctx = Some(ctx.clone());
                self.output.clear();
                self.state = ActorState::SetUp;
                Ok(())
            }
            other => Err(ConfigError::invalid_structure(
                &self.name,
                format!("cannot set up from state '{other}'"),
            )),
        }
    }

    /// Replaces the captured context, e.g. with one carrying a derived
    /// callable scope for child actors.
    pub fn set_ctx(&mut self, ctx: FlowContext) {
        self.ctx = Some(ctx);
    }

    pub fn ctx(&self) -> Result<&FlowContext, ExecError> {
        self.ctx.as_ref().ok_or_else(|| ExecError::NotSetUp {
            actor: self.name.clone(),
        })
    }

    /// Transitions into `Executing`, handing back a context clone.
    pub fn enter_execute(&mut self) -> Result<FlowContext, ExecError> {
        let ctx = self.ctx()?.clone();
        if matches!(self.state, ActorState::SetUp | ActorState::Executing) {
            self.state = ActorState::Executing;
            Ok(ctx)
        } else {
            Err(ExecError::NotSetUp {
                actor: self.name.clone(),
            })
        }
    }

    /// Back to idle after an activation.
    pub fn leave_execute(&mut self) {
        if self.state == ActorState::Executing {
            self.state = ActorState::SetUp;
        }
    }

    /// True while the actor owes a wrap-up for the current run.
    pub fn was_set_up(&self) -> bool {
        matches!(self.state, ActorState::SetUp | ActorState::Executing)
    }

    pub fn finish_wrap_up(&mut self) {
        if self.was_set_up() {
            self.state = ActorState::WrappedUp;
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.state == ActorState::Destroyed
    }

    pub fn mark_destroyed(&mut self) {
        self.state = ActorState::Destroyed;
        self.ctx = None;
        self.output.clear();
    }

    pub fn queue_output(&mut self, token: Token) {
        self.output.push_back(token);
    }

    pub fn next_output(&mut self) -> Option<Token> {
        self.output.pop_front()
    }

    pub fn has_output(&self) -> bool {
        !self.output.is_empty()
    }

    pub fn clear_output(&mut self) {
        self.output.clear();
    }

    /// Guard for `input` implementations.
    pub fn require_set_up(&self) -> Result<(), ExecError> {
        if self.was_set_up() {
            Ok(())
        } else {
            Err(ExecError::NotSetUp {
                actor: self.name.clone(),
            })
        }
    }
}
