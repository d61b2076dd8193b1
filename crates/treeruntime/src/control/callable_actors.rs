use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use treecore::{
    Actor, ActorBase, ActorKind, ActorState, BoxedActor, ConfigError, ExecResult, FlowContext,
    Outcome, SharedActor,
};

/// Declares reusable actors into the enclosing callable scope. The
/// container owns its actors; call sites hold weak handles, so dropping
/// the container retires the callables. Declared actors are set up and
/// wrapped up with this container, and only execute when a referencing
/// actor invokes them.
pub struct CallableActors {
    base: ActorBase,
    staging: Vec<BoxedActor>,
    shared: Vec<SharedActor>,
    names: Vec<String>,
}

impl CallableActors {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            base: ActorBase::new(name),
            staging: Vec::new(),
            shared: Vec::new(),
            names: Vec::new(),
        }
    }

    pub fn push(mut self, actor: BoxedActor) -> Self {
        self.staging.push(actor);
        self
    }

    pub fn skipped(mut self) -> Self {
        self.base.set_skipped(true);
        self
    }

    /// Declares `actor` into `ctx`'s scope, tolerating a repeat of the
    /// exact same instance (idempotent re-setup within one run).
    fn declare(ctx: &FlowContext, name: &str, actor: &SharedActor) -> Result<(), ConfigError> {
        match ctx.scope().declare(name, actor) {
            Ok(()) => Ok(()),
            Err(ConfigError::DuplicateCallable { .. }) => {
                let already = ctx
                    .scope()
                    .resolve(name)
                    .and_then(|h| h.upgrade().ok())
                    .map(|existing| Arc::ptr_eq(&existing, actor))
                    .unwrap_or(false);
                if already {
                    Ok(())
                } else {
                    Err(ConfigError::DuplicateCallable {
                        name: name.to_string(),
                    })
                }
            }
            Err(err) => Err(err),
        }
    }
}

#[async_trait]
impl Actor for CallableActors {
    fn actor_type(&self) -> &str {
        "control.callable-actors"
    }

    fn name(&self) -> &str {
        self.base.name()
    }

    fn kind(&self) -> ActorKind {
        ActorKind::Standalone
    }

    fn state(&self) -> ActorState {
        self.base.state()
    }

    fn is_skipped(&self) -> bool {
        self.base.is_skipped()
    }

    async fn set_up(&mut self, ctx: &FlowContext) -> Result<(), ConfigError> {
        self.base.begin_set_up(ctx)?;
        for actor in self.staging.drain(..) {
            let name = actor.name().to_string();
            let arc: SharedActor = Arc::new(Mutex::new(actor));
            self.names.push(name);
            self.shared.push(arc);
        }
        for (name, arc) in self.names.iter().zip(&self.shared) {
            {
                let mut actor = arc.lock().await;
                actor.set_up(ctx).await?;
            }
            Self::declare(ctx, name, arc)?;
        }
        Ok(())
    }

    async fn execute(&mut self) -> ExecResult {
        // declared actors run on demand, not here
        self.base.enter_execute()?;
        self.base.leave_execute();
        Ok(Outcome::Completed)
    }

    async fn wrap_up(&mut self) {
        if !self.base.was_set_up() {
            return;
        }
        for arc in self.shared.iter().rev() {
            let mut actor = arc.lock().await;
            actor.wrap_up().await;
        }
        self.base.finish_wrap_up();
    }

    fn destroy(&mut self) {
        for arc in self.shared.iter().rev() {
            match arc.try_lock() {
                Ok(mut actor) => actor.destroy(),
                Err(_) => {
                    tracing::warn!(
                        container = self.base.name(),
                        "callable actor still borrowed at destroy"
                    );
                }
            }
        }
        self.shared.clear();
        self.names.clear();
        self.base.mark_destroyed();
    }

    fn describe(&self) -> String {
        format!(
            "{} [{}: {}, declares {}]",
            self.base.name(),
            self.actor_type(),
            self.kind(),
            self.names.join(", ")
        )
    }
}
