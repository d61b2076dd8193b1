use crate::Value;
use std::sync::Arc;

/// A single unit of data flowing between actors.
///
/// Tokens are immutable once created. `Clone` shares the payload
/// allocation, so an actor that forwards a token unchanged hands the
/// same payload downstream rather than a re-derived copy.
#[derive(Debug, Clone)]
pub struct Token {
    payload: Arc<Value>,
    provenance: Option<String>,
}

impl Token {
    pub fn new(payload: impl Into<Value>) -> Self {
        Self {
            payload: Arc::new(payload.into()),
            provenance: None,
        }
    }

    pub fn from_shared(payload: Arc<Value>) -> Self {
        Self {
            payload,
            provenance: None,
        }
    }

    /// Tags the token with the name of the actor that produced it.
    pub fn with_provenance(mut self, origin: impl Into<String>) -> Self {
        self.provenance = Some(origin.into());
        self
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn share_payload(&self) -> Arc<Value> {
        Arc::clone(&self.payload)
    }

    pub fn provenance(&self) -> Option<&str> {
        self.provenance.as_deref()
    }

    /// True if both tokens carry the very same payload allocation.
    pub fn same_payload(&self, other: &Token) -> bool {
        Arc::ptr_eq(&self.payload, &other.payload)
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.payload == other.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clone_shares_payload() {
        let token = Token::new("hello");
        let copy = token.clone();
        assert!(token.same_payload(&copy));
        assert_eq!(token, copy);
    }

    #[test]
    fn rebuilt_token_is_equal_but_not_shared() {
        let token = Token::new("hello");
        let rebuilt = Token::new("hello");
        assert_eq!(token, rebuilt);
        assert!(!token.same_payload(&rebuilt));
    }

    #[test]
    fn provenance_is_optional_metadata() {
        let token = Token::new(1i64).with_provenance("source");
        assert_eq!(token.provenance(), Some("source"));
        assert_eq!(Token::new(1i64).provenance(), None);
    }
}
