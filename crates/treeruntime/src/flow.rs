use crate::director::{check_chain, Director};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use treecore::{
    Actor, ActorBase, ActorKind, ActorState, BoxedActor, ConfigError, ErrorPolicy, EventEmitter,
    ExecResult, FlowContext, NoRestart, PostRunHook, RestartPolicy, StopOnError, Storage,
    Variables,
};

/// Root of an actor tree. Owns the variable store, the storage map and
/// the cancellation token, and carries the error/restart policies that
/// govern the run. Executed through [`FlowRunner`](crate::FlowRunner).
pub struct Flow {
    base: ActorBase,
    children: Vec<BoxedActor>,
    director: Director,
    variables: Arc<Variables>,
    storage: Arc<Storage>,
    error_policy: Arc<dyn ErrorPolicy>,
    restart_policy: Arc<dyn RestartPolicy>,
    post_run_hook: Option<PostRunHook>,
    cancel: CancellationToken,
}

impl Flow {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            base: ActorBase::new(name),
            children: Vec::new(),
            director: Director::new(),
            variables: Arc::new(Variables::new()),
            storage: Arc::new(Storage::new()),
            error_policy: Arc::new(StopOnError),
            restart_policy: Arc::new(NoRestart),
            post_run_hook: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn push(mut self, child: BoxedActor) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_error_policy(mut self, policy: impl ErrorPolicy + 'static) -> Self {
        self.error_policy = Arc::new(policy);
        self
    }

    pub fn with_restart_policy(mut self, policy: impl RestartPolicy + 'static) -> Self {
        self.restart_policy = Arc::new(policy);
        self
    }

    /// Invoked exactly once after every run attempt.
    pub fn with_post_run_hook(mut self, hook: PostRunHook) -> Self {
        self.post_run_hook = Some(hook);
        self
    }

    pub fn variables(&self) -> &Arc<Variables> {
        &self.variables
    }

    pub fn storage(&self) -> &Arc<Storage> {
        &self.storage
    }

    /// Handle for stopping the flow from outside, e.g. a signal handler.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn request_stop(&self) {
        self.cancel.cancel();
    }

    pub(crate) fn restart_policy(&self) -> &dyn RestartPolicy {
        self.restart_policy.as_ref()
    }

    pub(crate) fn post_run_hook(&self) -> Option<&PostRunHook> {
        self.post_run_hook.as_ref()
    }

    pub(crate) fn build_context(&self, events: EventEmitter) -> FlowContext {
        FlowContext::new(
            Arc::clone(&self.variables),
            Arc::clone(&self.storage),
            Arc::clone(&self.error_policy),
            self.cancel.clone(),
            events,
        )
    }

    /// Returns the flow to a runnable state between attempts: empty
    /// stores, fresh cancellation token.
    pub(crate) fn reset(&mut self) {
        self.variables.clear();
        self.storage.clear();
        self.cancel = CancellationToken::new();
    }
}

#[async_trait]
impl Actor for Flow {
    fn actor_type(&self) -> &str {
        "control.flow"
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

    fn accepts_input(&self) -> bool {
        false
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
        Ok(())
    }

    async fn execute(&mut self) -> ExecResult {
        let ctx = self.base.enter_execute()?;
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
