use crate::callable::CallableScope;
use crate::events::EventEmitter;
use crate::policy::ErrorPolicy;
use crate::{ExecError, Storage, Variables};
use std::fmt;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// Everything an actor needs from its surrounding flow: shared state,
/// callable resolution, cancellation, the error policy and the event
/// emitter. Passed explicitly at `set_up` instead of living in ambient
/// globals; cheap to clone.
#[derive(Clone)]
pub struct FlowContext {
    variables: Arc<Variables>,
    storage: Arc<Storage>,
    scope: Arc<CallableScope>,
    cancel: CancellationToken,
    error_policy: Arc<dyn ErrorPolicy>,
    events: EventEmitter,
    messages: Arc<Mutex<Vec<String>>>,
}

impl FlowContext {
    pub fn new(
        variables: Arc<Variables>,
        storage: Arc<Storage>,
        error_policy: Arc<dyn ErrorPolicy>,
        cancel: CancellationToken,
        events: EventEmitter,
    ) -> Self {
        Self {
            variables,
            storage,
            scope: CallableScope::root(),
            cancel,
            error_policy,
            events,
            messages: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn scope(&self) -> &Arc<CallableScope> {
        &self.scope
    }

    /// Same context with `scope` swapped in.
    pub fn with_scope(&self, scope: Arc<CallableScope>) -> Self {
        let mut ctx = self.clone();
        ctx.scope = scope;
        ctx
    }

    /// Same context with a fresh scope nested under the current one.
    /// Control actors derive this for their children at `set_up`.
    pub fn child_scope(&self) -> Self {
        self.with_scope(CallableScope::child_of(&self.scope))
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Cooperative stop flag; checked at actor and loop-iteration
    /// boundaries, never mid-computation.
    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn request_stop(&self) {
        self.cancel.cancel();
    }

    pub fn error_policy(&self) -> &dyn ErrorPolicy {
        self.error_policy.as_ref()
    }

    pub fn events(&self) -> &EventEmitter {
        &self.events
    }

    /// Records an execution error at its point of occurrence: ordered
    /// message list, log and event stream. Never swallows.
    pub fn report_error(&self, actor: &str, error: &ExecError) {
        tracing::error!(actor, %error, "actor failed");
        self.events.actor_failed(actor, error.to_string());
        self.push_message(format!("{actor}: {error}"));
    }

    pub fn push_message(&self, message: String) {
        let mut messages = self.messages.lock().unwrap_or_else(|e| e.into_inner());
        messages.push(message);
    }

    pub fn messages(&self) -> Vec<String> {
        let messages = self.messages.lock().unwrap_or_else(|e| e.into_inner());
        messages.clone()
    }

    pub fn take_messages(&self) -> Vec<String> {
        let mut messages = self.messages.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *messages)
    }
}

impl fmt::Debug for FlowContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowContext")
            .field("variables", &self.variables.len())
            .field("storage", &self.storage.len())
            .field("scope", &self.scope)
            .field("stopped", &self.is_stopped())
            .field("error_policy", &self.error_policy.name())
            .finish()
    }
}
