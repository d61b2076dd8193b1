use async_trait::async_trait;
use treecore::{
    Actor, ActorBase, ActorKind, ActorState, ConfigError, ExecError, ExecResult, Expandable,
    FlowContext, Outcome, Token,
};

/// Requests a cooperative stop of the whole flow. The run winds down as
/// `Stopped`, not as a failure; an optional message lands in the run
/// report.
pub struct Stop {
    base: ActorBase,
    message: Option<Expandable>,
}

impl Stop {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            base: ActorBase::new(name),
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<Expandable>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn skipped(mut self) -> Self {
        self.base.set_skipped(true);
        self
    }
}

#[async_trait]
impl Actor for Stop {
    fn actor_type(&self) -> &str {
        "control.stop"
    }

    fn name(&self) -> &str {
        self.base.name()
    }

    fn kind(&self) -> ActorKind {
        ActorKind::Sink
    }

    fn state(&self) -> ActorState {
        self.base.state()
    }

    fn is_skipped(&self) -> bool {
        self.base.is_skipped()
    }

    async fn set_up(&mut self, ctx: &FlowContext) -> Result<(), ConfigError> {
        self.base.begin_set_up(ctx)
    }

    fn input(&mut self, _token: Token) -> Result<(), ExecError> {
        self.base.require_set_up()
    }

    async fn execute(&mut self) -> ExecResult {
        let ctx = self.base.enter_execute()?;
        if let Some(message) = &mut self.message {
            let text = message.resolve(ctx.variables());
            ctx.push_message(format!("{}: {}", self.base.name(), text));
        }
        ctx.events().stop_requested(self.base.name());
        ctx.request_stop();
        self.base.leave_execute();
        Ok(Outcome::Stopped)
    }

    async fn wrap_up(&mut self) {
        self.base.finish_wrap_up();
    }

    fn destroy(&mut self) {
        self.base.mark_destroyed();
    }
}
