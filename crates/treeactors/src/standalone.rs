use async_trait::async_trait;
use treecore::{
    Actor, ActorBase, ActorKind, ActorState, BoxedActor, ConfigError, ExecResult, Expandable,
    FlowContext, Outcome, VariableName,
};
use treeruntime::{require_str, ActorConfig, ActorFactory, ActorTypeInfo};

/// Assigns a flow variable during the standalone pre-phase, before any
/// token moves. The value may reference other variables and the
/// environment.
pub struct SetVariable {
    base: ActorBase,
    variable: VariableName,
    value: Expandable,
}

impl SetVariable {
    pub fn new(
        name: impl Into<String>,
        variable: VariableName,
        value: impl Into<Expandable>,
    ) -> Self {
        Self {
            base: ActorBase::new(name),
            variable,
            value: value.into(),
        }
    }

    pub fn skipped(mut self) -> Self {
        self.base.set_skipped(true);
        self
    }
}

#[async_trait]
impl Actor for SetVariable {
    fn actor_type(&self) -> &str {
        "standalone.set-variable"
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
        self.base.begin_set_up(ctx)
    }

    async fn execute(&mut self) -> ExecResult {
        let ctx = self.base.enter_execute()?;
        let value = self.value.resolve(ctx.variables());
        ctx.variables().set(self.variable.clone(), value);
        self.base.leave_execute();
        Ok(Outcome::Completed)
    }

    async fn wrap_up(&mut self) {
        self.base.finish_wrap_up();
    }

    fn destroy(&mut self) {
        self.base.mark_destroyed();
    }

    fn describe(&self) -> String {
        format!(
            "{} [{}: {}, @{{{}}} = '{}']",
            self.base.name(),
            self.actor_type(),
            self.kind(),
            self.variable,
            self.value.raw()
        )
    }
}

pub struct SetVariableFactory;

impl ActorFactory for SetVariableFactory {
    fn create(&self, name: &str, config: &ActorConfig) -> Result<BoxedActor, ConfigError> {
        let variable = VariableName::new(require_str(name, config, "variable")?)?;
        let value = require_str(name, config, "value")?;
        Ok(Box::new(SetVariable::new(name, variable, value)))
    }

    fn actor_type(&self) -> &str {
        "standalone.set-variable"
    }

    fn metadata(&self) -> ActorTypeInfo {
        ActorTypeInfo {
            description: "Assign a flow variable before token flow starts".to_string(),
            category: "standalone".to_string(),
        }
    }
}
