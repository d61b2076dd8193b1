use crate::condition::BoxedCondition;
use crate::director::{check_chain, Director};
use async_trait::async_trait;
use treecore::{
    Actor, ActorBase, ActorKind, ActorState, BoxedActor, ConfigError, ExecError, ExecResult,
    FlowContext, Outcome, Token,
};

/// Runs its body while the condition holds. The condition is evaluated
/// fresh before every iteration, including the first, so zero
/// iterations is a normal outcome. Each iteration re-seeds the body
/// with a copy of the incoming token, if any. Never produces output.
pub struct WhileLoop {
    base: ActorBase,
    condition: BoxedCondition,
    body: Vec<BoxedActor>,
    pending: Option<Token>,
    director: Director,
}

impl WhileLoop {
    pub fn new(name: impl Into<String>, condition: BoxedCondition) -> Self {
        Self {
            base: ActorBase::new(name),
            condition,
            body: Vec::new(),
            pending: None,
            director: Director::new(),
        }
    }

    pub fn push(mut self, child: BoxedActor) -> Self {
        self.body.push(child);
        self
    }

    pub fn skipped(mut self) -> Self {
        self.base.set_skipped(true);
        self
    }
}

#[async_trait]
impl Actor for WhileLoop {
    fn actor_type(&self) -> &str {
        "control.while"
    }

    fn name(&self) -> &str {
        self.base.name()
    }

    fn kind(&self) -> ActorKind {
        ActorKind::Control
    }

    fn state(&self) -> ActorState {
        self.base.state()
    }

    fn is_skipped(&self) -> bool {
        self.base.is_skipped()
    }

    fn accepts_input(&self) -> bool {
        true
    }

    fn produces_output(&self) -> bool {
        false
    }

    async fn set_up(&mut self, ctx: &FlowContext) -> Result<(), ConfigError> {
        self.base.begin_set_up(ctx)?;
        self.condition.set_up()?;
        check_chain(self.base.name(), &self.body)?;
        let child_ctx = ctx.child_scope();
        for child in &mut self.body {
            child.set_up(&child_ctx).await?;
        }
        self.base.set_ctx(child_ctx);
        self.pending = None;
        Ok(())
    }

    fn input(&mut self, token: Token) -> Result<(), ExecError> {
        self.base.require_set_up()?;
        self.pending = Some(token);
        Ok(())
    }

    async fn execute(&mut self) -> ExecResult {
        let ctx = self.base.enter_execute()?;
        let seed = self.pending.take();
        let result = loop {
            if ctx.is_stopped() {
                break Ok(Outcome::Stopped);
            }
            match self.condition.evaluate(&ctx, seed.as_ref()) {
                Ok(true) => {}
                Ok(false) => break Ok(Outcome::Completed),
                Err(err) => break Err(err),
            }
            match self.director.run(&mut self.body, &ctx, seed.clone()).await {
                Ok((Outcome::Completed, _)) => {}
                Ok((Outcome::Stopped, _)) => break Ok(Outcome::Stopped),
                Err(err) => break Err(err),
            }
        };
        self.base.leave_execute();
        result
    }

    async fn wrap_up(&mut self) {
        if !self.base.was_set_up() {
            return;
        }
        for child in self.body.iter_mut().rev() {
            child.wrap_up().await;
        }
        self.pending = None;
        self.base.finish_wrap_up();
    }

    fn destroy(&mut self) {
        for child in self.body.iter_mut().rev() {
            child.destroy();
        }
        self.base.mark_destroyed();
    }

    fn children(&self) -> Vec<&dyn Actor> {
        self.body.iter().map(|c| c.as_ref()).collect()
    }

    fn describe(&self) -> String {
        format!(
            "{} [{}: {}, while {}]",
            self.base.name(),
            self.actor_type(),
            self.kind(),
            self.condition.describe()
        )
    }
}
