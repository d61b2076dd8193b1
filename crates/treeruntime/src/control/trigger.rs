use crate::director::{check_chain, Director};
use async_trait::async_trait;
use treecore::{
    Actor, ActorBase, ActorKind, ActorState, BoxedActor, ConfigError, ExecError, ExecResult,
    FlowContext, Token,
};

/// Fires its sub-flow once per incoming token and discards the token.
/// The sub-flow starts unseeded, so its first active child is usually a
/// source. Never produces output.
pub struct Trigger {
    base: ActorBase,
    children: Vec<BoxedActor>,
    pending: Option<Token>,
    director: Director,
}

impl Trigger {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            base: ActorBase::new(name),
            children: Vec::new(),
            pending: None,
            director: Director::new(),
        }
    }

    pub fn push(mut self, child: BoxedActor) -> Self {
        self.children.push(child);
        self
    }

    pub fn skipped(mut self) -> Self {
        self.base.set_skipped(true);
        self
    }
}

#[async_trait]
impl Actor for Trigger {
    fn actor_type(&self) -> &str {
        "control.trigger"
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
        check_chain(self.base.name(), &self.children)?;
        let child_ctx = ctx.child_scope();
        for child in &mut self.children {
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
        // the incoming token only triggers; it is not forwarded
        self.pending = None;
        let result = self.director.run(&mut self.children, &ctx, None).await;
        self.base.leave_execute();
        let (outcome, _) = result?;
        Ok(outcome)
    }

    async fn wrap_up(&mut self) {
        if !self.base.was_set_up() {
            return;
        }
        for child in self.children.iter_mut().rev() {
            child.wrap_up().await;
        }
        self.pending = None;
        self.base.finish_wrap_up();
    }

    fn destroy(&mut self) {
        for child in self.children.iter_mut().rev() {
            child.destroy();
        }
        self.base.mark_destroyed();
    }

    fn children(&self) -> Vec<&dyn Actor> {
        self.children.iter().map(|c| c.as_ref()).collect()
    }
}
