use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use treecore::{
    Actor, ActorBase, ActorKind, ActorState, BoxedActor, CallableHandle, ConfigError, ExecError,
    ExecResult, FlowContext, Outcome, Token, Value,
};
use treeruntime::{require_str, ActorConfig, ActorFactory, ActorTypeInfo};

/// Swallows every token.
pub struct Null {
    base: ActorBase,
}

impl Null {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            base: ActorBase::new(name),
        }
    }

    pub fn skipped(mut self) -> Self {
        self.base.set_skipped(true);
        self
    }
}

#[async_trait]
impl Actor for Null {
    fn actor_type(&self) -> &str {
        "sink.null"
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
        self.base.enter_execute()?;
        self.base.leave_execute();
        Ok(Outcome::Completed)
    }

    async fn wrap_up(&mut self) {
        self.base.finish_wrap_up();
    }

    fn destroy(&mut self) {
        self.base.mark_destroyed();
    }
}

pub struct NullFactory;

impl ActorFactory for NullFactory {
    fn create(&self, name: &str, _config: &ActorConfig) -> Result<BoxedActor, ConfigError> {
        Ok(Box::new(Null::new(name)))
    }

    fn actor_type(&self) -> &str {
        "sink.null"
    }

    fn metadata(&self) -> ActorTypeInfo {
        ActorTypeInfo {
            description: "Discard every token".to_string(),
            category: "sink".to_string(),
        }
    }
}

/// Read side of a [`Recorder`]; stays valid after the flow tears the
/// actor down.
#[derive(Clone)]
pub struct RecorderHandle {
    records: Arc<Mutex<Vec<Value>>>,
}

impl RecorderHandle {
    pub fn values(&self) -> Vec<Value> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records.clone()
    }

    pub fn len(&self) -> usize {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Appends each incoming payload to a shared list; the main assertion
/// surface of the integration tests.
pub struct Recorder {
    base: ActorBase,
    records: Arc<Mutex<Vec<Value>>>,
    pending: Option<Token>,
}

impl Recorder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            base: ActorBase::new(name),
            records: Arc::new(Mutex::new(Vec::new())),
            pending: None,
        }
    }

    pub fn handle(&self) -> RecorderHandle {
        RecorderHandle {
            records: Arc::clone(&self.records),
        }
    }

    pub fn skipped(mut self) -> Self {
        self.base.set_skipped(true);
        self
    }
}

#[async_trait]
impl Actor for Recorder {
    fn actor_type(&self) -> &str {
        "sink.recorder"
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

    fn input(&mut self, token: Token) -> Result<(), ExecError> {
        self.base.require_set_up()?;
        self.pending = Some(token);
        Ok(())
    }

    async fn execute(&mut self) -> ExecResult {
        self.base.enter_execute()?;
        if let Some(token) = self.pending.take() {
            let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
            records.push(token.payload().clone());
        }
        self.base.leave_execute();
        Ok(Outcome::Completed)
    }

    async fn wrap_up(&mut self) {
        self.pending = None;
        self.base.finish_wrap_up();
    }

    fn destroy(&mut self) {
        self.base.mark_destroyed();
    }
}

/// Hands every incoming token to a named callable actor. The callable
/// is resolved through the lexical scope chain at `set_up`; a missing
/// name is a configuration error. The same callable instance may be
/// invoked from any number of call sites.
pub struct CallableSink {
    base: ActorBase,
    callable: String,
    handle: Option<CallableHandle>,
    pending: Option<Token>,
}

impl CallableSink {
    pub fn new(name: impl Into<String>, callable: impl Into<String>) -> Self {
        Self {
            base: ActorBase::new(name),
            callable: callable.into(),
            handle: None,
            pending: None,
        }
    }

    pub fn skipped(mut self) -> Self {
        self.base.set_skipped(true);
        self
    }
}

#[async_trait]
impl Actor for CallableSink {
    fn actor_type(&self) -> &str {
        "sink.callable"
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
        self.base.begin_set_up(ctx)?;
        self.handle = Some(ctx.scope().require(&self.callable)?);
        Ok(())
    }

    fn input(&mut self, token: Token) -> Result<(), ExecError> {
        self.base.require_set_up()?;
        self.pending = Some(token);
        Ok(())
    }

    async fn execute(&mut self) -> ExecResult {
        self.base.enter_execute()?;
        let result = async {
            let handle = self.handle.as_ref().ok_or_else(|| ExecError::NotSetUp {
                actor: self.base.name().to_string(),
            })?;
            let target = handle.upgrade()?;
            let mut actor = target.lock().await;
            if let Some(token) = self.pending.take() {
                actor.input(token)?;
            }
            let outcome = actor.execute().await?;
            // a sink produces nothing, whatever the callable queued up
            while actor.output().is_some() {}
            Ok(outcome)
        }
        .await;
        self.base.leave_execute();
        result
    }

    async fn wrap_up(&mut self) {
        // the declaring container wraps the callable up
        self.pending = None;
        self.base.finish_wrap_up();
    }

    fn destroy(&mut self) {
        self.handle = None;
        self.base.mark_destroyed();
    }

    fn describe(&self) -> String {
        format!(
            "{} [{}: {}, -> '{}']",
            self.base.name(),
            self.actor_type(),
            self.kind(),
            self.callable
        )
    }
}

pub struct CallableSinkFactory;

impl ActorFactory for CallableSinkFactory {
    fn create(&self, name: &str, config: &ActorConfig) -> Result<BoxedActor, ConfigError> {
        let callable = require_str(name, config, "callable")?;
        Ok(Box::new(CallableSink::new(name, callable)))
    }

    fn actor_type(&self) -> &str {
        "sink.callable"
    }

    fn metadata(&self) -> ActorTypeInfo {
        ActorTypeInfo {
            description: "Forward tokens to a named callable actor".to_string(),
            category: "sink".to_string(),
        }
    }
}

pub struct RecorderFactory;

impl ActorFactory for RecorderFactory {
    fn create(&self, name: &str, _config: &ActorConfig) -> Result<BoxedActor, ConfigError> {
        Ok(Box::new(Recorder::new(name)))
    }

    fn actor_type(&self) -> &str {
        "sink.recorder"
    }

    fn metadata(&self) -> ActorTypeInfo {
        ActorTypeInfo {
            description: "Collect payloads into an in-memory list".to_string(),
            category: "sink".to_string(),
        }
    }
}
