//! In-memory archive actors: build a named-entry container token by
//! token, then persist it to storage. The archive payload is a plain
//! object value, so every append shares nothing with the previous one.

use async_trait::async_trait;
use std::collections::HashMap;
use treecore::{
    Actor, ActorBase, ActorKind, ActorState, BoxedActor, ConfigError, ExecError, ExecResult,
    Expandable, FlowContext, Outcome, StorageName, Token, Value,
};
use treeruntime::{require_str, ActorConfig, ActorFactory, ActorTypeInfo};

/// Emits a fresh, empty archive object.
pub struct NewArchive {
    base: ActorBase,
}

impl NewArchive {
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
impl Actor for NewArchive {
    fn actor_type(&self) -> &str {
        "source.new-archive"
    }

    fn name(&self) -> &str {
        self.base.name()
    }

    fn kind(&self) -> ActorKind {
        ActorKind::Source
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

    async fn execute(&mut self) -> ExecResult {
        self.base.enter_execute()?;
        self.base
            .queue_output(Token::new(Value::Object(HashMap::new())));
        self.base.leave_execute();
        Ok(Outcome::Completed)
    }

    fn output(&mut self) -> Option<Token> {
        self.base.next_output()
    }

    fn has_pending_output(&self) -> bool {
        self.base.has_output()
    }

    async fn wrap_up(&mut self) {
        self.base.finish_wrap_up();
    }

    fn destroy(&mut self) {
        self.base.mark_destroyed();
    }
}

pub struct NewArchiveFactory;

impl ActorFactory for NewArchiveFactory {
    fn create(&self, name: &str, _config: &ActorConfig) -> Result<BoxedActor, ConfigError> {
        Ok(Box::new(NewArchive::new(name)))
    }

    fn actor_type(&self) -> &str {
        "source.new-archive"
    }

    fn metadata(&self) -> ActorTypeInfo {
        ActorTypeInfo {
            description: "Emit an empty archive object".to_string(),
            category: "source".to_string(),
        }
    }
}

/// Adds one named entry to an incoming archive object and emits the
/// grown archive. The entry content may reference variables.
pub struct AppendArchive {
    base: ActorBase,
    entry: String,
    content: Expandable,
    pending: Option<Token>,
}

impl AppendArchive {
    pub fn new(
        name: impl Into<String>,
        entry: impl Into<String>,
        content: impl Into<Expandable>,
    ) -> Self {
        Self {
            base: ActorBase::new(name),
            entry: entry.into(),
            content: content.into(),
            pending: None,
        }
    }

    pub fn skipped(mut self) -> Self {
        self.base.set_skipped(true);
        self
    }
}

#[async_trait]
impl Actor for AppendArchive {
    fn actor_type(&self) -> &str {
        "transform.append-archive"
    }

    fn name(&self) -> &str {
        self.base.name()
    }

    fn kind(&self) -> ActorKind {
        ActorKind::Transformer
    }

    fn state(&self) -> ActorState {
        self.base.state()
    }

    fn is_skipped(&self) -> bool {
        self.base.is_skipped()
    }

    async fn set_up(&mut self, ctx: &FlowContext) -> Result<(), ConfigError> {
        if self.entry.is_empty() {
            return Err(ConfigError::MissingOption {
                actor: self.base.name().to_string(),
                option: "entry".to_string(),
            });
        }
        self.base.begin_set_up(ctx)
    }

    fn input(&mut self, token: Token) -> Result<(), ExecError> {
        self.base.require_set_up()?;
        self.pending = Some(token);
        Ok(())
    }

    async fn execute(&mut self) -> ExecResult {
        let ctx = self.base.enter_execute()?;
        let result = match self.pending.take() {
            Some(token) => match token.payload().as_object() {
                Some(archive) => {
                    let content = self.content.resolve(ctx.variables());
                    let mut grown = archive.clone();
                    grown.insert(self.entry.clone(), Value::Bytes(content.into_bytes()));
                    self.base.queue_output(Token::new(Value::Object(grown)));
                    Ok(())
                }
                None => Err(ExecError::failed(
                    self.base.name(),
                    format!("expected archive object, got {}", token.payload().type_name()),
                )),
            },
            None => Ok(()),
        };
        self.base.leave_execute();
        result?;
        Ok(Outcome::Completed)
    }

    fn output(&mut self) -> Option<Token> {
        self.base.next_output()
    }

    fn has_pending_output(&self) -> bool {
        self.base.has_output()
    }

    async fn wrap_up(&mut self) {
        self.pending = None;
        self.base.finish_wrap_up();
    }

    fn destroy(&mut self) {
        self.base.mark_destroyed();
    }

    fn describe(&self) -> String {
        format!(
            "{} [{}: {}, entry '{}']",
            self.base.name(),
            self.actor_type(),
            self.kind(),
            self.entry
        )
    }
}

pub struct AppendArchiveFactory;

impl ActorFactory for AppendArchiveFactory {
    fn create(&self, name: &str, config: &ActorConfig) -> Result<BoxedActor, ConfigError> {
        let entry = require_str(name, config, "entry")?;
        let content = require_str(name, config, "content")?;
        Ok(Box::new(AppendArchive::new(name, entry, content)))
    }

    fn actor_type(&self) -> &str {
        "transform.append-archive"
    }

    fn metadata(&self) -> ActorTypeInfo {
        ActorTypeInfo {
            description: "Add a named entry to an archive object".to_string(),
            category: "transform".to_string(),
        }
    }
}

/// Persists the finished archive under a storage slot.
pub struct CloseArchive {
    base: ActorBase,
    slot: StorageName,
    pending: Option<Token>,
}

impl CloseArchive {
    pub fn new(name: impl Into<String>, slot: StorageName) -> Self {
        Self {
            base: ActorBase::new(name),
            slot,
            pending: None,
        }
    }

    pub fn skipped(mut self) -> Self {
        self.base.set_skipped(true);
        self
    }
}

#[async_trait]
impl Actor for CloseArchive {
    fn actor_type(&self) -> &str {
        "sink.close-archive"
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
        let ctx = self.base.enter_execute()?;
        let result = match self.pending.take() {
            Some(token) => {
                if token.payload().as_object().is_some() {
                    ctx.storage().put(self.slot.clone(), token.payload().clone());
                    Ok(())
                } else {
                    Err(ExecError::failed(
                        self.base.name(),
                        format!("expected archive object, got {}", token.payload().type_name()),
                    ))
                }
            }
            None => Ok(()),
        };
        self.base.leave_execute();
        result?;
        Ok(Outcome::Completed)
    }

    async fn wrap_up(&mut self) {
        self.pending = None;
        self.base.finish_wrap_up();
    }

    fn destroy(&mut self) {
        self.base.mark_destroyed();
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

pub struct CloseArchiveFactory;

impl ActorFactory for CloseArchiveFactory {
    fn create(&self, name: &str, config: &ActorConfig) -> Result<BoxedActor, ConfigError> {
        let slot = StorageName::new(require_str(name, config, "storage")?)?;
        Ok(Box::new(CloseArchive::new(name, slot)))
    }

    fn actor_type(&self) -> &str {
        "sink.close-archive"
    }

    fn metadata(&self) -> ActorTypeInfo {
        ActorTypeInfo {
            description: "Persist the archive under a storage slot".to_string(),
            category: "sink".to_string(),
        }
    }
}
