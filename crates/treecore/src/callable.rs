use crate::{Actor, ConfigError, ExecError};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, Weak};
use tokio::sync::Mutex;

/// A shared actor instance, owned by the callable container that
/// declared it.
pub type SharedActor = Arc<Mutex<Box<dyn Actor>>>;

/// Non-owning handle to a callable actor, held by call sites. The
/// declaring container controls the lifecycle; a handle outliving it
/// surfaces as `ExecError::DeadCallable` instead of keeping the actor
/// alive.
#[derive(Clone)]
pub struct CallableHandle {
    name: String,
    actor: Weak<Mutex<Box<dyn Actor>>>,
}

impl CallableHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn upgrade(&self) -> Result<SharedActor, ExecError> {
        self.actor.upgrade().ok_or_else(|| ExecError::DeadCallable {
            name: self.name.clone(),
        })
    }
}

impl std::fmt::Debug for CallableHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallableHandle")
            .field("name", &self.name)
            .field("alive", &(self.actor.strong_count() > 0))
            .finish()
    }
}

/// One level of the lexical scope chain for callable-actor resolution.
///
/// Resolution searches the nearest enclosing scope first, then walks
/// outward through the parent links. Entries are weak: the scope never
/// owns the actors registered into it.
#[derive(Default)]
pub struct CallableScope {
    parent: Option<Arc<CallableScope>>,
    entries: RwLock<HashMap<String, Weak<Mutex<Box<dyn Actor>>>>>,
}

impl CallableScope {
    pub fn root() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn child_of(parent: &Arc<CallableScope>) -> Arc<Self> {
        Arc::new(Self {
            parent: Some(Arc::clone(parent)),
            entries: RwLock::new(HashMap::new()),
        })
    }

    /// Registers a shared actor under `name` in this scope. A duplicate
    /// within the same scope is a configuration error; shadowing an
    /// outer scope is allowed.
    pub fn declare(&self, name: impl Into<String>, actor: &SharedActor) -> Result<(), ConfigError> {
        let name = name.into();
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if entries.contains_key(&name) {
            return Err(ConfigError::DuplicateCallable { name });
        }
        entries.insert(name, Arc::downgrade(actor));
        Ok(())
    }

    /// Looks `name` up from this scope outward.
    pub fn resolve(&self, name: &str) -> Option<CallableHandle> {
        {
            let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
            if let Some(weak) = entries.get(name) {
                return Some(CallableHandle {
                    name: name.to_string(),
                    actor: weak.clone(),
                });
            }
        }
        self.parent.as_ref().and_then(|p| p.resolve(name))
    }

    /// Like [`resolve`](Self::resolve) but failure is a configuration
    /// error, for use during `set_up`.
    pub fn require(&self, name: &str) -> Result<CallableHandle, ConfigError> {
        self.resolve(name)
            .ok_or_else(|| ConfigError::UnresolvedCallable {
                name: name.to_string(),
            })
    }
}

impl std::fmt::Debug for CallableScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        f.debug_struct("CallableScope")
            .field("names", &entries.keys().collect::<Vec<_>>())
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ActorBase, ActorKind, ActorState, ExecResult, FlowContext, Outcome};
    use async_trait::async_trait;

    struct Probe {
        base: ActorBase,
        tag: &'static str,
    }

    impl Probe {
        fn shared(name: &str, tag: &'static str) -> SharedActor {
            Arc::new(Mutex::new(Box::new(Probe {
                base: ActorBase::new(name),
                tag,
            }) as Box<dyn Actor>))
        }
    }

    #[async_trait]
    impl Actor for Probe {
        fn actor_type(&self) -> &str {
            self.tag
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

        async fn set_up(&mut self, ctx: &FlowContext) -> Result<(), ConfigError> {
            self.base.begin_set_up(ctx)
        }

        async fn execute(&mut self) -> ExecResult {
            Ok(Outcome::Completed)
        }

        async fn wrap_up(&mut self) {
            self.base.finish_wrap_up();
        }

        fn destroy(&mut self) {
            self.base.mark_destroyed();
        }
    }

    #[test]
    fn resolves_from_inner_scope_outward() {
        let root = CallableScope::root();
        let inner = CallableScope::child_of(&root);
        let outer_actor = Probe::shared("emit", "probe.outer");
        root.declare("emit", &outer_actor).expect("declare");

        let handle = inner.resolve("emit").expect("resolved via parent");
        assert_eq!(handle.name(), "emit");
        assert!(handle.upgrade().is_ok());
    }

    #[test]
    fn inner_declaration_shadows_outer() {
        let root = CallableScope::root();
        let inner = CallableScope::child_of(&root);
        let outer_actor = Probe::shared("emit", "probe.outer");
        let inner_actor = Probe::shared("emit", "probe.inner");
        root.declare("emit", &outer_actor).expect("declare outer");
        inner.declare("emit", &inner_actor).expect("declare inner");

        let handle = inner.resolve("emit").expect("resolved");
        let resolved = handle.upgrade().expect("alive");
        let tag = {
            let guard = resolved.try_lock().expect("uncontended");
            guard.actor_type().to_string()
        };
        assert_eq!(tag, "probe.inner");
    }

    #[test]
    fn duplicate_in_same_scope_is_config_error() {
        let root = CallableScope::root();
        let actor = Probe::shared("emit", "probe");
        root.declare("emit", &actor).expect("first");
        assert!(matches!(
            root.declare("emit", &actor),
            Err(ConfigError::DuplicateCallable { .. })
        ));
    }

    #[test]
    fn unresolved_name_is_config_error() {
        let root = CallableScope::root();
        assert!(matches!(
            root.require("nowhere"),
            Err(ConfigError::UnresolvedCallable { .. })
        ));
    }

    #[test]
    fn handle_does_not_keep_the_actor_alive() {
        let root = CallableScope::root();
        let actor = Probe::shared("emit", "probe");
        root.declare("emit", &actor).expect("declare");
        let handle = root.resolve("emit").expect("resolved");
        drop(actor);
        assert!(matches!(
            handle.upgrade(),
            Err(ExecError::DeadCallable { .. })
        ));
    }
}
