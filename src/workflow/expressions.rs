//! Expression evaluation for `${{ }}` syntax and structured conditions
//!
//! Supports:
//! - `${{ context.path.to.field }}` interpolation inside step configuration
//! - `Condition` — the structured expression a condition step evaluates
//!   against the execution context

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::LazyLock;

use super::context::ExecutionContext;

static EXPRESSION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{\{\s*([^}]+?)\s*\}\}").unwrap());

/// Errors that can occur during expression evaluation
#[derive(Debug, thiserror::Error)]
pub enum ExpressionError {
    #[error("Unknown variable: {0}")]
    UnknownVariable(String),

    #[error("Invalid expression syntax: {0}")]
    InvalidSyntax(String),
}

/// Evaluate all expressions in a string
pub fn evaluate(input: &str, ctx: &ExecutionContext) -> Result<String, ExpressionError> {
    let mut result = input.to_string();

    for cap in EXPRESSION_REGEX.captures_iter(input) {
        let full_match = cap.get(0).unwrap().as_str();
        let expr = cap.get(1).unwrap().as_str().trim();

        let value = evaluate_single(expr, ctx)?;
        result = result.replace(full_match, &value);
    }

    Ok(result)
}

/// Evaluate a single expression (without the `${{ }}` wrapper)
fn evaluate_single(expr: &str, ctx: &ExecutionContext) -> Result<String, ExpressionError> {
    let Some(path) = expr.strip_prefix("context.") else {
        return Err(ExpressionError::InvalidSyntax(format!(
            "expressions must be context.PATH, got: {}",
            expr
        )));
    };

    ctx.get(path)
        .map(render)
        .ok_or_else(|| ExpressionError::UnknownVariable(format!("context.{}", path)))
}

/// Render a JSON value for string interpolation
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Recursively evaluate expressions in every string of a JSON value.
///
/// Applied to step configuration before it reaches the Action Adapter.
pub fn interpolate_value(
    value: &Value,
    ctx: &ExecutionContext,
) -> Result<Value, ExpressionError> {
    match value {
        Value::String(s) => Ok(Value::String(evaluate(s, ctx)?)),
        Value::Array(items) => {
            let evaluated: Result<Vec<_>, _> =
                items.iter().map(|v| interpolate_value(v, ctx)).collect();
            Ok(Value::Array(evaluated?))
        }
        Value::Object(map) => {
            let mut evaluated = serde_json::Map::new();
            for (key, inner) in map {
                evaluated.insert(key.clone(), interpolate_value(inner, ctx)?);
            }
            Ok(Value::Object(evaluated))
        }
        other => Ok(other.clone()),
    }
}

/// Comparison operator for condition steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Contains,
    Exists,
}

/// A structured condition evaluated against the execution context.
///
/// `field` is a dot path into the context; `value` is the right-hand side
/// (ignored for `exists`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub op: ConditionOp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl Condition {
    /// Evaluate the condition. A missing field satisfies nothing except
    /// `ne` (the field is trivially not equal to anything).
    pub fn evaluate(&self, ctx: &ExecutionContext) -> bool {
        let actual = ctx.get(&self.field);

        match self.op {
            ConditionOp::Exists => actual.is_some(),
            ConditionOp::Eq => actual.is_some() && actual == self.value.as_ref(),
            ConditionOp::Ne => actual.is_none() || actual != self.value.as_ref(),
            ConditionOp::Gt => self.compare(actual, |ord| ord > 0.0),
            ConditionOp::Gte => self.compare(actual, |ord| ord >= 0.0),
            ConditionOp::Lt => self.compare(actual, |ord| ord < 0.0),
            ConditionOp::Lte => self.compare(actual, |ord| ord <= 0.0),
            ConditionOp::Contains => match (actual, self.value.as_ref()) {
                (Some(Value::String(haystack)), Some(Value::String(needle))) => {
                    haystack.contains(needle.as_str())
                }
                (Some(Value::Array(items)), Some(needle)) => items.contains(needle),
                _ => false,
            },
        }
    }

    /// Numeric comparison; non-numeric operands never satisfy the condition
    fn compare(&self, actual: Option<&Value>, check: impl Fn(f64) -> bool) -> bool {
        let (Some(actual), Some(expected)) = (actual, self.value.as_ref()) else {
            return false;
        };
        match (actual.as_f64(), expected.as_f64()) {
            (Some(a), Some(e)) => check(a - e),
            _ => false,
        }
    }

    /// Human-readable form used in step failure messages
    pub fn describe(&self) -> String {
        match &self.value {
            Some(value) => format!("{} {:?} {}", self.field, self.op, value),
            None => format!("{} {:?}", self.field, self.op),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_context() -> ExecutionContext {
        ExecutionContext::from_value(json!({
            "employee": { "email": "dana@example.com", "level": 3 },
            "department": "engineering",
            "tags": ["remote", "fulltime"]
        }))
    }

    #[test]
    fn test_evaluate_context_path() {
        let ctx = test_context();
        let result = evaluate("mailto:${{ context.employee.email }}", &ctx).unwrap();
        assert_eq!(result, "mailto:dana@example.com");
    }

    #[test]
    fn test_evaluate_non_string_value() {
        let ctx = test_context();
        let result = evaluate("level=${{ context.employee.level }}", &ctx).unwrap();
        assert_eq!(result, "level=3");
    }

    #[test]
    fn test_evaluate_multiple() {
        let ctx = test_context();
        let result = evaluate(
            "${{ context.department }}:${{ context.employee.email }}",
            &ctx,
        )
        .unwrap();
        assert_eq!(result, "engineering:dana@example.com");
    }

    #[test]
    fn test_unknown_variable() {
        let ctx = test_context();
        let result = evaluate("${{ context.nope }}", &ctx);
        assert!(matches!(result, Err(ExpressionError::UnknownVariable(_))));
    }

    #[test]
    fn test_non_context_prefix_rejected() {
        let ctx = test_context();
        let result = evaluate("${{ secrets.KEY }}", &ctx);
        assert!(matches!(result, Err(ExpressionError::InvalidSyntax(_))));
    }

    #[test]
    fn test_interpolate_nested_config() {
        let ctx = test_context();
        let config = json!({
            "to": "${{ context.employee.email }}",
            "cc": ["${{ context.department }}@example.com"],
            "retries": 2
        });

        let evaluated = interpolate_value(&config, &ctx).unwrap();
        assert_eq!(
            evaluated,
            json!({
                "to": "dana@example.com",
                "cc": ["engineering@example.com"],
                "retries": 2
            })
        );
    }

    #[test]
    fn test_condition_eq() {
        let ctx = test_context();
        let cond = Condition {
            field: "department".to_string(),
            op: ConditionOp::Eq,
            value: Some(json!("engineering")),
        };
        assert!(cond.evaluate(&ctx));

        let cond = Condition {
            field: "department".to_string(),
            op: ConditionOp::Eq,
            value: Some(json!("sales")),
        };
        assert!(!cond.evaluate(&ctx));
    }

    #[test]
    fn test_condition_numeric() {
        let ctx = test_context();
        let cond = Condition {
            field: "employee.level".to_string(),
            op: ConditionOp::Gte,
            value: Some(json!(3)),
        };
        assert!(cond.evaluate(&ctx));

        let cond = Condition {
            field: "employee.level".to_string(),
            op: ConditionOp::Gt,
            value: Some(json!(3)),
        };
        assert!(!cond.evaluate(&ctx));
    }

    #[test]
    fn test_condition_contains_and_exists() {
        let ctx = test_context();
        let cond = Condition {
            field: "tags".to_string(),
            op: ConditionOp::Contains,
            value: Some(json!("remote")),
        };
        assert!(cond.evaluate(&ctx));

        let cond = Condition {
            field: "employee.email".to_string(),
            op: ConditionOp::Exists,
            value: None,
        };
        assert!(cond.evaluate(&ctx));

        let cond = Condition {
            field: "manager".to_string(),
            op: ConditionOp::Exists,
            value: None,
        };
        assert!(!cond.evaluate(&ctx));
    }

    #[test]
    fn test_condition_missing_field() {
        let ctx = test_context();
        let cond = Condition {
            field: "manager.email".to_string(),
            op: ConditionOp::Ne,
            value: Some(json!("x")),
        };
        assert!(cond.evaluate(&ctx));

        let cond = Condition {
            field: "manager.email".to_string(),
            op: ConditionOp::Eq,
            value: Some(json!("x")),
        };
        assert!(!cond.evaluate(&ctx));
    }
}
