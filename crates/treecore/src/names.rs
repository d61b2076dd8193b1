use crate::ConfigError;
use std::fmt;
use std::str::FromStr;

fn validate(kind: &'static str, name: &str) -> Result<(), ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidName {
        kind,
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("must not be empty"));
    }
    let mut chars = name.chars();
    let first = chars.next().unwrap_or(' ');
    if !(first.is_ascii_alphanumeric() || first == '_') {
        return Err(invalid("must start with an alphanumeric character or '_'"));
    }
    for c in name.chars() {
        if !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')) {
            return Err(invalid("only alphanumerics and '_', '-', '.', ':' are allowed"));
        }
    }
    Ok(())
}

/// Validated key into the variable store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariableName(String);

impl VariableName {
    pub fn new(name: impl Into<String>) -> Result<Self, ConfigError> {
        let name = name.into();
        validate("variable", &name)?;
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for VariableName {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for VariableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validated key into flow storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageName(String);

impl StorageName {
    pub fn new(name: impl Into<String>) -> Result<Self, ConfigError> {
        let name = name.into();
        validate("storage", &name)?;
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for StorageName {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for StorageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_reasonable_names() {
        assert!(VariableName::new("i").is_ok());
        assert!(VariableName::new("my_var-2.x:a").is_ok());
        assert!(StorageName::new("archive").is_ok());
    }

    #[test]
    fn rejects_empty_and_bad_characters() {
        assert!(VariableName::new("").is_err());
        assert!(VariableName::new("has space").is_err());
        assert!(VariableName::new("-leading").is_err());
        assert!(StorageName::new("a/b").is_err());
    }

    #[test]
    fn parses_via_fromstr() {
        let name: VariableName = "count".parse().expect("valid");
        assert_eq!(name.as_str(), "count");
        assert!("@bad".parse::<StorageName>().is_err());
    }
}
