use crate::director::handle_failure;
use async_trait::async_trait;
use treecore::{
    Actor, ActorBase, ActorKind, ActorState, BoxedActor, ConfigError, ExecError, ExecResult,
    FlowContext, Outcome, StorageName, Token,
};

/// Threads a storage value through a chain of one-in-one-out steps,
/// writing the intermediate result back to the slot after every step,
/// then emits the final value as a token. Fails when the slot is
/// missing at execution time.
pub struct StorageValueSequence {
    base: ActorBase,
    slot: StorageName,
    steps: Vec<BoxedActor>,
}

impl StorageValueSequence {
    pub fn new(name: impl Into<String>, slot: StorageName) -> Self {
        Self {
            base: ActorBase::new(name),
            slot,
            steps: Vec::new(),
        }
    }

    pub fn push(mut self, step: BoxedActor) -> Self {
        self.steps.push(step);
        self
    }

    pub fn skipped(mut self) -> Self {
        self.base.set_skipped(true);
        self
    }
}

#[async_trait]
impl Actor for StorageValueSequence {
    fn actor_type(&self) -> &str {
        "control.storage-value-sequence"
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
        false
    }

    fn produces_output(&self) -> bool {
        true
    }

    async fn set_up(&mut self, ctx: &FlowContext) -> Result<(), ConfigError> {
        self.base.begin_set_up(ctx)?;
        for step in &self.steps {
            if !step.accepts_input() || !step.produces_output() {
                return Err(ConfigError::invalid_structure(
                    self.base.name(),
                    format!("step '{}' must consume and produce exactly one token", step.name()),
                ));
            }
        }
        let child_ctx = ctx.child_scope();
        for step in &mut self.steps {
            step.set_up(&child_ctx).await?;
        }
        self.base.set_ctx(child_ctx);
        Ok(())
    }

    async fn execute(&mut self) -> ExecResult {
        let ctx = self.base.enter_execute()?;
        let result = self.run_steps(&ctx).await;
        self.base.leave_execute();
        result
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
        for step in self.steps.iter_mut().rev() {
            step.wrap_up().await;
        }
        self.base.finish_wrap_up();
    }

    fn destroy(&mut self) {
        for step in self.steps.iter_mut().rev() {
            step.destroy();
        }
        self.base.mark_destroyed();
    }

    fn children(&self) -> Vec<&dyn Actor> {
        self.steps.iter().map(|s| s.as_ref()).collect()
    }

    fn describe(&self) -> String {
        format!(
            "{} [{}: {}, slot '{}']",
            self.base.name(),
            self.actor_type(),
            self.kind(),
            self.slot
        )
    }
}

impl StorageValueSequence {
    async fn run_steps(&mut self, ctx: &FlowContext) -> ExecResult {
        let mut value = ctx
            .storage()
            .get(&self.slot)
            .ok_or_else(|| ExecError::MissingStorage {
                name: self.slot.to_string(),
            })?;

        for step in &mut self.steps {
            if step.is_skipped() {
                continue;
            }
            if ctx.is_stopped() {
                return Ok(Outcome::Stopped);
            }
            let outcome = async {
                step.input(Token::new(value.clone()))?;
                step.execute().await
            }
            .await;
            match outcome {
                Ok(Outcome::Completed) => {}
                Ok(Outcome::Stopped) => return Ok(Outcome::Stopped),
                Err(err) => {
                    // the chain cannot continue without this step's value
                    handle_failure(step.name(), err, ctx)?;
                    return Ok(Outcome::Completed);
                }
            }
            match step.output() {
                Some(token) => value = token.payload().clone(),
                None => {
                    let err = ExecError::failed(step.name(), "step produced no output");
                    handle_failure(step.name(), err, ctx)?;
                    return Ok(Outcome::Completed);
                }
            }
            ctx.storage().put(self.slot.clone(), value.clone());
        }

        self.base.queue_output(Token::new(value));
        Ok(Outcome::Completed)
    }
}
