use treecore::{ConfigError, ExecError, FlowContext, Token};

/// Boolean test evaluated by looping and gating actors. Evaluation may
/// consult the current token, variables and storage; it must never
/// mutate flow state.
pub trait BooleanCondition: Send + Sync {
    /// One-time validation hook, called from the owner's `set_up`.
    fn set_up(&mut self) -> Result<(), ConfigError> {
        Ok(())
    }

    fn evaluate(&mut self, ctx: &FlowContext, token: Option<&Token>) -> Result<bool, ExecError>;

    fn describe(&self) -> String;
}

pub type BoxedCondition = Box<dyn BooleanCondition>;

/// Fixed-result condition, mostly useful in tests and as a placeholder.
#[derive(Debug, Clone, Copy)]
pub struct ConstCondition(pub bool);

impl BooleanCondition for ConstCondition {
    fn evaluate(&mut self, _ctx: &FlowContext, _token: Option<&Token>) -> Result<bool, ExecError> {
        Ok(self.0)
    }

    fn describe(&self) -> String {
        self.0.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompareOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl CompareOp {
    fn apply_num(self, lhs: f64, rhs: f64) -> bool {
        match self {
            CompareOp::Lt => lhs < rhs,
            CompareOp::Le => lhs <= rhs,
            CompareOp::Gt => lhs > rhs,
            CompareOp::Ge => lhs >= rhs,
            CompareOp::Eq => lhs == rhs,
            CompareOp::Ne => lhs != rhs,
        }
    }

    fn apply_str(self, lhs: &str, rhs: &str) -> bool {
        match self {
            CompareOp::Lt => lhs < rhs,
            CompareOp::Le => lhs <= rhs,
            CompareOp::Gt => lhs > rhs,
            CompareOp::Ge => lhs >= rhs,
            CompareOp::Eq => lhs == rhs,
            CompareOp::Ne => lhs != rhs,
        }
    }
}

/// Condition over a small comparison expression, e.g. `@{i} < 10` or
/// `${MODE} = fast`. Variable references are expanded freshly on every
/// evaluation, so the result tracks the live variable store. Bare
/// `true` and `false` are accepted as constants.
pub struct Expression {
    raw: String,
}

impl Expression {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    fn error(&self, reason: impl Into<String>) -> ExecError {
        ExecError::Condition {
            expression: self.raw.clone(),
            reason: reason.into(),
        }
    }
}

impl BooleanCondition for Expression {
    fn set_up(&mut self) -> Result<(), ConfigError> {
        if self.raw.trim().is_empty() {
            return Err(ConfigError::InvalidOption {
                actor: "expression".to_string(),
                option: "expression".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    fn evaluate(&mut self, ctx: &FlowContext, _token: Option<&Token>) -> Result<bool, ExecError> {
        let expanded = ctx.variables().expand(&self.raw);
        let text = expanded.trim();

        match text {
            "true" => return Ok(true),
            "false" => return Ok(false),
            _ => {}
        }

        // Longest operators first, so "<=" never parses as "<".
        let ops: [(&str, CompareOp); 6] = [
            ("<=", CompareOp::Le),
            (">=", CompareOp::Ge),
            ("!=", CompareOp::Ne),
            ("<", CompareOp::Lt),
            (">", CompareOp::Gt),
            ("=", CompareOp::Eq),
        ];
        let (idx, op_text, op) = ops
            .iter()
            .filter_map(|(sym, op)| text.find(sym).map(|idx| (idx, *sym, *op)))
            .min_by_key(|(idx, sym, _)| (*idx, std::cmp::Reverse(sym.len())))
            .ok_or_else(|| self.error("no comparison operator found"))?;

        let lhs = text[..idx].trim();
        let rhs = text[idx + op_text.len()..].trim();
        if lhs.is_empty() || rhs.is_empty() {
            return Err(self.error("missing operand"));
        }

        match (lhs.parse::<f64>(), rhs.parse::<f64>()) {
            (Ok(l), Ok(r)) => Ok(op.apply_num(l, r)),
            _ => Ok(op.apply_str(lhs, rhs)),
        }
    }

    fn describe(&self) -> String {
        self.raw.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use treecore::{EventEmitter, Storage, StopOnError, VariableName, Variables};
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    fn var(name: &str) -> VariableName {
        VariableName::new(name).expect("valid name")
    }

    fn ctx() -> FlowContext {
        FlowContext::new(
            Arc::new(Variables::new()),
            Arc::new(Storage::new()),
            Arc::new(StopOnError),
            CancellationToken::new(),
            EventEmitter::disabled(),
        )
    }

    #[test]
    fn numeric_comparison() {
        let ctx = ctx();
        assert!(Expression::new("3 < 10").evaluate(&ctx, None).unwrap());
        assert!(!Expression::new("10 <= 3").evaluate(&ctx, None).unwrap());
        assert!(Expression::new("2.5 != 2.6").evaluate(&ctx, None).unwrap());
    }

    #[test]
    fn string_comparison_when_not_numeric() {
        let ctx = ctx();
        assert!(Expression::new("abc = abc").evaluate(&ctx, None).unwrap());
        assert!(Expression::new("abc < abd").evaluate(&ctx, None).unwrap());
    }

    #[test]
    fn variables_expand_fresh_each_evaluation() {
        let ctx = ctx();
        ctx.variables().set(var("i"), "0");
        let mut cond = Expression::new("@{i} < 2");
        assert!(cond.evaluate(&ctx, None).unwrap());
        ctx.variables().set(var("i"), "2");
        assert!(!cond.evaluate(&ctx, None).unwrap());
    }

    #[test]
    fn bare_boolean_literals() {
        let ctx = ctx();
        assert!(Expression::new("true").evaluate(&ctx, None).unwrap());
        assert!(!Expression::new("false").evaluate(&ctx, None).unwrap());
    }

    #[test]
    fn unparseable_expression_is_an_error() {
        let ctx = ctx();
        let err = Expression::new("no operators here")
            .evaluate(&ctx, None)
            .unwrap_err();
        assert!(matches!(err, ExecError::Condition { .. }));
    }

    #[test]
    fn unresolved_variable_compares_as_string() {
        let ctx = ctx();
        // "@{missing}" stays literal; not numeric, so string compare.
        assert!(!Expression::new("@{missing} = 0")
            .evaluate(&ctx, None)
            .unwrap());
    }
}
