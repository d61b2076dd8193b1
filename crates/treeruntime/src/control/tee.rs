use crate::director::{check_chain, Director};
use async_trait::async_trait;
use treecore::{
    Actor, ActorBase, ActorKind, ActorState, BoxedActor, ConfigError, ExecError, ExecResult,
    FlowContext, Token,
};

/// Side branch: feeds a copy of each incoming token through its
/// children, then forwards the original token unchanged. The copy
/// shares the payload, so the main path is untouched by whatever the
/// branch does.
pub struct Tee {
    base: ActorBase,
    children: Vec<BoxedActor>,
    pending: Option<Token>,
    director: Director,
}

impl Tee {
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
impl Actor for Tee {
    fn actor_type(&self) -> &str {
        "control.tee"
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
        true
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
        let token = self.pending.take().ok_or_else(|| ExecError::failed(
            self.base.name(),
            "no input token",
        ));
        let token = match token {
            Ok(t) => t,
            Err(err) => {
                self.base.leave_execute();
                return Err(err);
            }
        };
        let result = self
            .director
            .run(&mut self.children, &ctx, Some(token.clone()))
            .await;
        self.base.leave_execute();
        let (outcome, _) = result?;
        self.base.queue_output(token);
        Ok(outcome)
    }

    fn output(&mut self) -> Option<Token> {
        self.base.next_output()
    }

    fn has_pending_output(&self) -> bool {
        self.base.has_output()
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
