use std::collections::HashMap;
use std::sync::Arc;
use treecore::{BoxedActor, ConfigError, Value};

/// Option map handed to factories when instantiating an actor.
pub type ActorConfig = HashMap<String, Value>;

/// Factory trait for creating actor instances
pub trait ActorFactory: Send + Sync {
    /// Create a new instance of the actor with given configuration
    fn create(&self, name: &str, config: &ActorConfig) -> Result<BoxedActor, ConfigError>;

    /// Actor type identifier, e.g. "source.start"
    fn actor_type(&self) -> &str;

    /// Optional: description and category for listings
    fn metadata(&self) -> ActorTypeInfo {
        ActorTypeInfo::default()
    }
}

/// Metadata about an actor type
#[derive(Debug, Clone)]
pub struct ActorTypeInfo {
    pub description: String,
    pub category: String,
}

impl Default for ActorTypeInfo {
    fn default() -> Self {
        Self {
            description: String::new(),
            category: "general".to_string(),
        }
    }
}

/// Registry of available actor types
pub struct ActorRegistry {
    factories: HashMap<String, Arc<dyn ActorFactory>>,
}

impl ActorRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register an actor factory
    pub fn register(&mut self, factory: Arc<dyn ActorFactory>) {
        let actor_type = factory.actor_type().to_string();
        tracing::debug!("Registering actor type: {}", actor_type);
        self.factories.insert(actor_type, factory);
    }

    /// Create an actor instance from a type tag and config
    pub fn create(
        &self,
        actor_type: &str,
        name: &str,
        config: &ActorConfig,
    ) -> Result<BoxedActor, ConfigError> {
        let factory = self
            .factories
            .get(actor_type)
            .ok_or_else(|| ConfigError::UnknownActorType(actor_type.to_string()))?;
        factory.create(name, config)
    }

    /// All registered actor types, sorted for stable listings
    pub fn list_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.factories.keys().cloned().collect();
        types.sort();
        types
    }

    /// Metadata for an actor type
    pub fn info(&self, actor_type: &str) -> Option<ActorTypeInfo> {
        self.factories.get(actor_type).map(|f| f.metadata())
    }
}

impl Default for ActorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper for factories: required string option.
pub fn require_str(
    actor: &str,
    config: &ActorConfig,
    option: &str,
) -> Result<String, ConfigError> {
    config
        .get(option)
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| ConfigError::MissingOption {
            actor: actor.to_string(),
            option: option.to_string(),
        })
}

/// Helper for factories: optional string option.
pub fn optional_str(config: &ActorConfig, option: &str) -> Option<String> {
    config.get(option).and_then(|v| v.as_str()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingFactory;

    impl ActorFactory for FailingFactory {
        fn create(&self, name: &str, _config: &ActorConfig) -> Result<BoxedActor, ConfigError> {
            Err(ConfigError::invalid_structure(name, "not constructible"))
        }

        fn actor_type(&self) -> &str {
            "test.failing"
        }
    }

    #[test]
    fn unknown_type_is_an_error() {
        let registry = ActorRegistry::new();
        match registry.create("no.such.type", "x", &ActorConfig::new()) {
            Err(ConfigError::UnknownActorType(tag)) => assert_eq!(tag, "no.such.type"),
            Err(other) => panic!("wrong error: {other}"),
            Ok(_) => panic!("unknown type must not construct"),
        }
    }

    #[test]
    fn registered_factory_is_listed_and_consulted() {
        let mut registry = ActorRegistry::new();
        registry.register(Arc::new(FailingFactory));
        assert_eq!(registry.list_types(), vec!["test.failing".to_string()]);
        assert!(registry.create("test.failing", "x", &ActorConfig::new()).is_err());
    }

    #[test]
    fn option_helpers() {
        let mut config = ActorConfig::new();
        config.insert("variable".to_string(), Value::from("i"));
        assert_eq!(require_str("a", &config, "variable").unwrap(), "i");
        assert!(matches!(
            require_str("a", &config, "missing"),
            Err(ConfigError::MissingOption { .. })
        ));
        assert_eq!(optional_str(&config, "variable"), Some("i".to_string()));
        assert_eq!(optional_str(&config, "missing"), None);
    }
}
