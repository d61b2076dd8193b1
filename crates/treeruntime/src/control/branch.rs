use crate::director::Director;
use async_trait::async_trait;
use treecore::{
    Actor, ActorBase, ActorKind, ActorState, BoxedActor, ConfigError, ExecError, ExecResult,
    FlowContext, Outcome, Token,
};

/// Fans one token out to several independent branches, each seeded with
/// its own copy. Branch outputs are discarded. Branches run one after
/// the other by default; [`parallel`](Branch::parallel) runs each on
/// its own task and joins them all before this actor completes.
pub struct Branch {
    base: ActorBase,
    branches: Vec<BoxedActor>,
    pending: Option<Token>,
    parallel: bool,
}

impl Branch {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            base: ActorBase::new(name),
            branches: Vec::new(),
            pending: None,
            parallel: false,
        }
    }

    pub fn push(mut self, branch: BoxedActor) -> Self {
        self.branches.push(branch);
        self
    }

    pub fn parallel(mut self) -> Self {
        self.parallel = true;
        self
    }

    pub fn skipped(mut self) -> Self {
        self.base.set_skipped(true);
        self
    }

    async fn run_sequential(&mut self, ctx: &FlowContext, seed: Option<Token>) -> ExecResult {
        let director = Director::new();
        for branch in &mut self.branches {
            if ctx.is_stopped() {
                return Ok(Outcome::Stopped);
            }
            let (outcome, _) = director
                .run(std::slice::from_mut(branch), ctx, seed.clone())
                .await?;
            if outcome.is_stopped() {
                return Ok(Outcome::Stopped);
            }
        }
        Ok(Outcome::Completed)
    }

    async fn run_parallel(&mut self, ctx: &FlowContext, seed: Option<Token>) -> ExecResult {
        let branches = std::mem::take(&mut self.branches);
        let mut handles = Vec::with_capacity(branches.len());
        for mut branch in branches {
            let ctx = ctx.clone();
            let seed = seed.clone();
            handles.push(tokio::spawn(async move {
                let director = Director::new();
                let result = director
                    .run(std::slice::from_mut(&mut branch), &ctx, seed)
                    .await;
                (branch, result)
            }));
        }

        // Join everything before reporting: the barrier holds even when
        // a branch failed.
        let mut outcome = Outcome::Completed;
        let mut first_error: Option<ExecError> = None;
        for handle in handles {
            match handle.await {
                Ok((branch, result)) => {
                    self.branches.push(branch);
                    match result {
                        Ok((Outcome::Completed, _)) => {}
                        Ok((Outcome::Stopped, _)) => outcome = Outcome::Stopped,
                        Err(err) => {
                            if first_error.is_none() {
                                first_error = Some(err);
                            }
                        }
                    }
                }
                Err(join_err) => {
                    tracing::error!(actor = self.base.name(), %join_err, "branch task panicked");
                    if first_error.is_none() {
                        first_error = Some(ExecError::failed(
                            self.base.name(),
                            "branch task panicked",
                        ));
                    }
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(outcome),
        }
    }
}

#[async_trait]
impl Actor for Branch {
    fn actor_type(&self) -> &str {
        "control.branch"
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
        if self.branches.is_empty() {
            return Err(ConfigError::invalid_structure(
                self.base.name(),
                "requires at least one branch",
            ));
        }
        let child_ctx = ctx.child_scope();
        for branch in &mut self.branches {
            branch.set_up(&child_ctx).await?;
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
        let result = if self.parallel {
            self.run_parallel(&ctx, seed).await
        } else {
            self.run_sequential(&ctx, seed).await
        };
        self.base.leave_execute();
        result
    }

    async fn wrap_up(&mut self) {
        if !self.base.was_set_up() {
            return;
        }
        for branch in self.branches.iter_mut().rev() {
            branch.wrap_up().await;
        }
        self.pending = None;
        self.base.finish_wrap_up();
    }

    fn destroy(&mut self) {
        for branch in self.branches.iter_mut().rev() {
            branch.destroy();
        }
        self.base.mark_destroyed();
    }

    fn children(&self) -> Vec<&dyn Actor> {
        self.branches.iter().map(|b| b.as_ref()).collect()
    }

    fn describe(&self) -> String {
        let mode = if self.parallel {
            "parallel"
        } else {
            "sequential"
        };
        format!(
            "{} [{}: {}, {mode}]",
            self.base.name(),
            self.actor_type(),
            self.kind()
        )
    }
}
