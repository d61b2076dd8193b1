use async_trait::async_trait;
use treecore::{
    Actor, ActorBase, ActorKind, ActorState, BoxedActor, ConfigError, ExecError, ExecResult,
    Expandable, FlowContext, Outcome, StorageName, Token, VariableName,
};
use treeruntime::{optional_str, require_str, ActorConfig, ActorFactory, ActorTypeInfo};

/// Forwards every token untouched. Useful as a placeholder and in
/// tests asserting payload identity across a chain.
pub struct PassThrough {
    base: ActorBase,
    pending: Option<Token>,
}

impl PassThrough {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            base: ActorBase::new(name),
            pending: None,
        }
    }

    pub fn skipped(mut self) -> Self {
        self.base.set_skipped(true);
        self
    }
}

#[async_trait]
impl Actor for PassThrough {
    fn actor_type(&self) -> &str {
        "transform.pass-through"
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
            self.base.queue_output(token);
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
        self.pending = None;
        self.base.finish_wrap_up();
    }

    fn destroy(&mut self) {
        self.base.mark_destroyed();
    }
}

pub struct PassThroughFactory;

impl ActorFactory for PassThroughFactory {
    fn create(&self, name: &str, _config: &ActorConfig) -> Result<BoxedActor, ConfigError> {
        Ok(Box::new(PassThrough::new(name)))
    }

    fn actor_type(&self) -> &str {
        "transform.pass-through"
    }

    fn metadata(&self) -> ActorTypeInfo {
        ActorTypeInfo {
            description: "Forward tokens unchanged".to_string(),
            category: "transform".to_string(),
        }
    }
}

/// Adds `delta` to an integer-valued flow variable and forwards the
/// incoming token unchanged. Downstream actors see the token as it was
/// before the increment; only the variable store advances.
pub struct IncVariable {
    base: ActorBase,
    variable: VariableName,
    delta: i64,
    pending: Option<Token>,
}

impl IncVariable {
    pub fn new(name: impl Into<String>, variable: VariableName) -> Self {
        Self {
            base: ActorBase::new(name),
            variable,
            delta: 1,
            pending: None,
        }
    }

    pub fn with_delta(mut self, delta: i64) -> Self {
        self.delta = delta;
        self
    }

    pub fn skipped(mut self) -> Self {
        self.base.set_skipped(true);
        self
    }
}

#[async_trait]
impl Actor for IncVariable {
    fn actor_type(&self) -> &str {
        "transform.inc-variable"
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
        self.base.begin_set_up(ctx)
    }

    fn input(&mut self, token: Token) -> Result<(), ExecError> {
        self.base.require_set_up()?;
        self.pending = Some(token);
        Ok(())
    }

    async fn execute(&mut self) -> ExecResult {
        let ctx = self.base.enter_execute()?;
        let parsed = ctx
            .variables()
            .get(&self.variable)
            .ok_or_else(|| {
                ExecError::failed(
                    self.base.name(),
                    format!("variable '{}' not set", self.variable),
                )
            })
            .and_then(|current| {
                current.parse::<i64>().map_err(|_| {
                    ExecError::failed(
                        self.base.name(),
                        format!("variable '{}' is not an integer: '{current}'", self.variable),
                    )
                })
            });
        self.base.leave_execute();
        ctx.variables()
            .set(self.variable.clone(), (parsed? + self.delta).to_string());
        if let Some(token) = self.pending.take() {
            self.base.queue_output(token);
        }
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
            "{} [{}: {}, @{{{}}} += {}]",
            self.base.name(),
            self.actor_type(),
            self.kind(),
            self.variable,
            self.delta
        )
    }
}

pub struct IncVariableFactory;

impl ActorFactory for IncVariableFactory {
    fn create(&self, name: &str, config: &ActorConfig) -> Result<BoxedActor, ConfigError> {
        let variable = VariableName::new(require_str(name, config, "variable")?)?;
        let delta = match config.get("delta") {
            Some(value) => value.as_f64().map(|d| d as i64).ok_or_else(|| {
                ConfigError::InvalidOption {
                    actor: name.to_string(),
                    option: "delta".to_string(),
                    reason: format!("expected number, got {}", value.type_name()),
                }
            })?,
            None => 1,
        };
        Ok(Box::new(IncVariable::new(name, variable).with_delta(delta)))
    }

    fn actor_type(&self) -> &str {
        "transform.inc-variable"
    }

    fn metadata(&self) -> ActorTypeInfo {
        ActorTypeInfo {
            description: "Advance an integer flow variable, forwarding the token".to_string(),
            category: "transform".to_string(),
        }
    }
}

/// Writes the incoming payload to a storage slot and forwards the
/// token unchanged.
pub struct SetStorageValue {
    base: ActorBase,
    slot: StorageName,
    pending: Option<Token>,
}

impl SetStorageValue {
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
impl Actor for SetStorageValue {
    fn actor_type(&self) -> &str {
        "transform.set-storage-value"
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
        self.base.begin_set_up(ctx)
    }

    fn input(&mut self, token: Token) -> Result<(), ExecError> {
        self.base.require_set_up()?;
        self.pending = Some(token);
        Ok(())
    }

    async fn execute(&mut self) -> ExecResult {
        let ctx = self.base.enter_execute()?;
        if let Some(token) = self.pending.take() {
            ctx.storage().put(self.slot.clone(), token.payload().clone());
            self.base.queue_output(token);
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

pub struct SetStorageValueFactory;

impl ActorFactory for SetStorageValueFactory {
    fn create(&self, name: &str, config: &ActorConfig) -> Result<BoxedActor, ConfigError> {
        let slot = StorageName::new(require_str(name, config, "storage")?)?;
        Ok(Box::new(SetStorageValue::new(name, slot)))
    }

    fn actor_type(&self) -> &str {
        "transform.set-storage-value"
    }

    fn metadata(&self) -> ActorTypeInfo {
        ActorTypeInfo {
            description: "Store the incoming payload under a slot".to_string(),
            category: "transform".to_string(),
        }
    }
}

/// Where [`StringInsert`] places its text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPosition {
    Front,
    Back,
}

/// Inserts a configured text at the front or back of a string payload.
/// The text may contain variable references.
pub struct StringInsert {
    base: ActorBase,
    position: InsertPosition,
    text: Expandable,
    pending: Option<Token>,
}

impl StringInsert {
    pub fn new(
        name: impl Into<String>,
        position: InsertPosition,
        text: impl Into<Expandable>,
    ) -> Self {
        Self {
            base: ActorBase::new(name),
            position,
            text: text.into(),
            pending: None,
        }
    }

    pub fn skipped(mut self) -> Self {
        self.base.set_skipped(true);
        self
    }
}

#[async_trait]
impl Actor for StringInsert {
    fn actor_type(&self) -> &str {
        "transform.string-insert"
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
            Some(token) => match token.payload().as_str() {
                Some(current) => {
                    let text = self.text.resolve(ctx.variables());
                    let combined = match self.position {
                        InsertPosition::Front => format!("{text}{current}"),
                        InsertPosition::Back => format!("{current}{text}"),
                    };
                    self.base.queue_output(Token::new(combined));
                    Ok(())
                }
                None => Err(ExecError::failed(
                    self.base.name(),
                    format!("expected string payload, got {}", token.payload().type_name()),
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
}

pub struct StringInsertFactory;

impl ActorFactory for StringInsertFactory {
    fn create(&self, name: &str, config: &ActorConfig) -> Result<BoxedActor, ConfigError> {
        let text = require_str(name, config, "text")?;
        let position = match optional_str(config, "position").as_deref() {
            None | Some("back") => InsertPosition::Back,
            Some("front") => InsertPosition::Front,
            Some(other) => {
                return Err(ConfigError::InvalidOption {
                    actor: name.to_string(),
                    option: "position".to_string(),
                    reason: format!("expected 'front' or 'back', got '{other}'"),
                })
            }
        };
        Ok(Box::new(StringInsert::new(name, position, text)))
    }

    fn actor_type(&self) -> &str {
        "transform.string-insert"
    }

    fn metadata(&self) -> ActorTypeInfo {
        ActorTypeInfo {
            description: "Insert text at the front or back of a string payload".to_string(),
            category: "transform".to_string(),
        }
    }
}

/// Always fails; exercises error policies in flows and tests.
pub struct Fail {
    base: ActorBase,
    message: Expandable,
    pending: Option<Token>,
}

impl Fail {
    pub fn new(name: impl Into<String>, message: impl Into<Expandable>) -> Self {
        Self {
            base: ActorBase::new(name),
            message: message.into(),
            pending: None,
        }
    }

    pub fn skipped(mut self) -> Self {
        self.base.set_skipped(true);
        self
    }
}

#[async_trait]
impl Actor for Fail {
    fn actor_type(&self) -> &str {
        "transform.fail"
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
        self.base.begin_set_up(ctx)
    }

    fn input(&mut self, token: Token) -> Result<(), ExecError> {
        self.base.require_set_up()?;
        self.pending = Some(token);
        Ok(())
    }

    async fn execute(&mut self) -> ExecResult {
        let ctx = self.base.enter_execute()?;
        self.pending = None;
        let message = self.message.resolve(ctx.variables());
        self.base.leave_execute();
        Err(ExecError::failed(self.base.name(), message))
    }

    async fn wrap_up(&mut self) {
        self.pending = None;
        self.base.finish_wrap_up();
    }

    fn destroy(&mut self) {
        self.base.mark_destroyed();
    }
}

pub struct FailFactory;

impl ActorFactory for FailFactory {
    fn create(&self, name: &str, config: &ActorConfig) -> Result<BoxedActor, ConfigError> {
        let message =
            optional_str(config, "message").unwrap_or_else(|| "deliberate failure".to_string());
        Ok(Box::new(Fail::new(name, message)))
    }

    fn actor_type(&self) -> &str {
        "transform.fail"
    }

    fn metadata(&self) -> ActorTypeInfo {
        ActorTypeInfo {
            description: "Fail unconditionally".to_string(),
            category: "transform".to_string(),
        }
    }
}
