use async_trait::async_trait;
use treecore::{
    Actor, ActorBase, ActorKind, ActorState, BoxedActor, ConfigError, ExecError, ExecResult,
    Expandable, FlowContext, Outcome, StorageName, Token, Value, VariableName,
};
use treeruntime::{require_str, ActorConfig, ActorFactory, ActorTypeInfo};

/// Emits a single null token; the canonical way to kick off a flow
/// that only reacts to the activation itself.
pub struct Start {
    base: ActorBase,
}

impl Start {
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
impl Actor for Start {
    fn actor_type(&self) -> &str {
        "source.start"
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
        let name = self.base.name().to_string();
        self.base
            .queue_output(Token::new(Value::Null).with_provenance(name));
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

pub struct StartFactory;

impl ActorFactory for StartFactory {
    fn create(&self, name: &str, _config: &ActorConfig) -> Result<BoxedActor, ConfigError> {
        Ok(Box::new(Start::new(name)))
    }

    fn actor_type(&self) -> &str {
        "source.start"
    }

    fn metadata(&self) -> ActorTypeInfo {
        ActorTypeInfo {
            description: "Emit a single null token".to_string(),
            category: "source".to_string(),
        }
    }
}

/// Emits one string token per configured value. Values may contain
/// variable references, resolved at execution time.
pub struct StringConstants {
    base: ActorBase,
    values: Vec<Expandable>,
}

impl StringConstants {
    pub fn new(name: impl Into<String>, values: Vec<Expandable>) -> Self {
        Self {
            base: ActorBase::new(name),
            values,
        }
    }

    pub fn skipped(mut self) -> Self {
        self.base.set_skipped(true);
        self
    }
}

#[async_trait]
impl Actor for StringConstants {
    fn actor_type(&self) -> &str {
        "source.string-constants"
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
        let ctx = self.base.enter_execute()?;
        for value in &mut self.values {
            let resolved = value.resolve(ctx.variables());
            self.base.queue_output(Token::new(resolved));
        }
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

pub struct StringConstantsFactory;

impl ActorFactory for StringConstantsFactory {
    fn create(&self, name: &str, config: &ActorConfig) -> Result<BoxedActor, ConfigError> {
        let values = match config.get("values") {
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str().map(Expandable::new).ok_or_else(|| {
                        ConfigError::InvalidOption {
                            actor: name.to_string(),
                            option: "values".to_string(),
                            reason: format!("expected string, got {}", item.type_name()),
                        }
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(other) => {
                return Err(ConfigError::InvalidOption {
                    actor: name.to_string(),
                    option: "values".to_string(),
                    reason: format!("expected array, got {}", other.type_name()),
                })
            }
            None => {
                return Err(ConfigError::MissingOption {
                    actor: name.to_string(),
                    option: "values".to_string(),
                })
            }
        };
        Ok(Box::new(StringConstants::new(name, values)))
    }

    fn actor_type(&self) -> &str {
        "source.string-constants"
    }

    fn metadata(&self) -> ActorTypeInfo {
        ActorTypeInfo {
            description: "Emit one token per configured string".to_string(),
            category: "source".to_string(),
        }
    }
}

/// Emits the current value of a flow variable as a string token.
/// Fails when the variable is unset.
pub struct VariableSource {
    base: ActorBase,
    variable: VariableName,
}

impl VariableSource {
    pub fn new(name: impl Into<String>, variable: VariableName) -> Self {
        Self {
            base: ActorBase::new(name),
            variable,
        }
    }

    pub fn skipped(mut self) -> Self {
        self.base.set_skipped(true);
        self
    }
}

#[async_trait]
impl Actor for VariableSource {
    fn actor_type(&self) -> &str {
        "source.variable"
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
        let ctx = self.base.enter_execute()?;
        let looked_up = ctx.variables().get(&self.variable).ok_or_else(|| {
            ExecError::failed(
                self.base.name(),
                format!("variable '{}' not set", self.variable),
            )
        });
        self.base.leave_execute();
        self.base.queue_output(Token::new(looked_up?));
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

    fn describe(&self) -> String {
        format!(
            "{} [{}: {}, @{{{}}}]",
            self.base.name(),
            self.actor_type(),
            self.kind(),
            self.variable
        )
    }
}

pub struct VariableSourceFactory;

impl ActorFactory for VariableSourceFactory {
    fn create(&self, name: &str, config: &ActorConfig) -> Result<BoxedActor, ConfigError> {
        let variable = VariableName::new(require_str(name, config, "variable")?)?;
        Ok(Box::new(VariableSource::new(name, variable)))
    }

    fn actor_type(&self) -> &str {
        "source.variable"
    }

    fn metadata(&self) -> ActorTypeInfo {
        ActorTypeInfo {
            description: "Emit the current value of a flow variable".to_string(),
            category: "source".to_string(),
        }
    }
}

/// Emits the value of a storage slot. Fails when the slot is absent.
pub struct StorageValueSource {
    base: ActorBase,
    slot: StorageName,
}

impl StorageValueSource {
    pub fn new(name: impl Into<String>, slot: StorageName) -> Self {
        Self {
            base: ActorBase::new(name),
            slot,
        }
    }

    pub fn skipped(mut self) -> Self {
        self.base.set_skipped(true);
        self
    }
}

#[async_trait]
impl Actor for StorageValueSource {
    fn actor_type(&self) -> &str {
        "source.storage-value"
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
        let ctx = self.base.enter_execute()?;
        let looked_up = ctx
            .storage()
            .get(&self.slot)
            .ok_or_else(|| ExecError::MissingStorage {
                name: self.slot.to_string(),
            });
        self.base.leave_execute();
        self.base.queue_output(Token::new(looked_up?));
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

pub struct StorageValueSourceFactory;

impl ActorFactory for StorageValueSourceFactory {
    fn create(&self, name: &str, config: &ActorConfig) -> Result<BoxedActor, ConfigError> {
        let slot = StorageName::new(require_str(name, config, "storage")?)?;
        Ok(Box::new(StorageValueSource::new(name, slot)))
    }

    fn actor_type(&self) -> &str {
        "source.storage-value"
    }

    fn metadata(&self) -> ActorTypeInfo {
        ActorTypeInfo {
            description: "Emit the value of a storage slot".to_string(),
            category: "source".to_string(),
        }
    }
}
