//! Tools exposed via Model Context Protocol
//!
//! Each tool is a [`ToolHandler`] registered by name in a [`ToolRegistry`].
//! Handlers return plain text; the dispatcher wraps it in a `content` block.

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use rust_mcp_sdk::{macros, schema::Tool};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::ToolError;

pub const DEFAULT_GREETING_NAME: &str = "Friend";

#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn descriptor(&self) -> Tool;

    async fn invoke(&self, arguments: Map<String, Value>) -> Result<String, ToolError>;
}

#[derive(Clone)]
struct RegisteredTool {
    descriptor: Tool,
    handler: Arc<dyn ToolHandler>,
}

/// Name-indexed set of tools, listed in registration order.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler`, replacing any tool already using the same name.
    pub fn with_tool(mut self, handler: impl ToolHandler + 'static) -> Self {
        let descriptor = handler.descriptor();
        let handler: Arc<dyn ToolHandler> = Arc::new(handler);
        match self
            .tools
            .iter_mut()
            .find(|tool| tool.descriptor.name == descriptor.name)
        {
            Some(existing) => {
                existing.descriptor = descriptor;
                existing.handler = handler;
            }
            None => self.tools.push(RegisteredTool {
                descriptor,
                handler,
            }),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.tools
            .iter()
            .find(|tool| tool.descriptor.name == name)
            .map(|tool| Arc::clone(&tool.handler))
    }

    pub fn descriptors(&self) -> Vec<Tool> {
        self.tools
            .iter()
            .map(|tool| tool.descriptor.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

pub fn default_registry() -> ToolRegistry {
    ToolRegistry::new().with_tool(Greeter).with_tool(Calculator)
}

fn parse_arguments<T: DeserializeOwned>(arguments: Map<String, Value>) -> Result<T, ToolError> {
    serde_json::from_value(Value::Object(arguments))
        .map_err(|err| ToolError::InvalidArguments(err.to_string()))
}

#[macros::mcp_tool(name = "greet", description = "A friendly greeting tool")]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct GreetTool {
    /// Your name
    pub name: Option<String>,
}

#[macros::mcp_tool(
    name = "calculator",
    description = "Simple calculator with basic operations"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct CalculatorTool {
    /// Operation: add, subtract, multiply, divide
    pub operation: String,
    /// First number
    pub a: f64,
    /// Second number
    pub b: f64,
}

pub struct Greeter;

#[async_trait]
impl ToolHandler for Greeter {
    fn descriptor(&self) -> Tool {
        GreetTool::tool()
    }

    /// Any JSON value is accepted as the name; strings are used verbatim.
    async fn invoke(&self, arguments: Map<String, Value>) -> Result<String, ToolError> {
        let name = match arguments.get("name") {
            None | Some(Value::Null) => DEFAULT_GREETING_NAME.to_string(),
            Some(Value::String(name)) => name.clone(),
            Some(other) => other.to_string(),
        };
        Ok(format!("Hello, {name}! Welcome to MCP Server!"))
    }
}

/// A calculator operand. Integers stay integers, so `2 + 3` reads `5`, while
/// any float or division result keeps a fractional part, as in `5.0`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Operand {
    Int(i64),
    Float(f64),
}

impl Default for Operand {
    fn default() -> Self {
        Self::Int(0)
    }
}

impl Operand {
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Int(value) => value as f64,
            Self::Float(value) => value,
        }
    }

    /// Integer arithmetic that overflows is redone in floating point.
    fn combine(
        self,
        other: Self,
        int_op: fn(i64, i64) -> Option<i64>,
        float_op: fn(f64, f64) -> f64,
    ) -> Self {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => int_op(a, b)
                .map(Self::Int)
                .unwrap_or_else(|| Self::Float(float_op(a as f64, b as f64))),
            (a, b) => Self::Float(float_op(a.as_f64(), b.as_f64())),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value)
                if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 =>
            {
                write!(f, "{value:.1}")
            }
            Self::Float(value) => write!(f, "{value}"),
        }
    }
}

fn default_operation() -> String {
    "add".to_string()
}

#[derive(Debug, Deserialize)]
struct CalculatorArgs {
    #[serde(default = "default_operation")]
    operation: String,
    #[serde(default)]
    a: Operand,
    #[serde(default)]
    b: Operand,
}

pub struct Calculator;

impl Calculator {
    /// Division by zero and unrecognised operations are reported as text,
    /// not as failures.
    pub fn evaluate(operation: &str, a: Operand, b: Operand) -> String {
        match operation {
            "add" => format!("{a} + {b} = {}", a.combine(b, i64::checked_add, |x, y| x + y)),
            "subtract" => format!("{a} - {b} = {}", a.combine(b, i64::checked_sub, |x, y| x - y)),
            "multiply" => format!("{a} × {b} = {}", a.combine(b, i64::checked_mul, |x, y| x * y)),
            "divide" if b.as_f64() == 0.0 => "Error: Cannot divide by zero".to_string(),
            "divide" => format!("{a} ÷ {b} = {}", Operand::Float(a.as_f64() / b.as_f64())),
            other => format!("Unknown operation: {other}"),
        }
    }
}

#[async_trait]
impl ToolHandler for Calculator {
    fn descriptor(&self) -> Tool {
        CalculatorTool::tool()
    }

    async fn invoke(&self, arguments: Map<String, Value>) -> Result<String, ToolError> {
        let args: CalculatorArgs = parse_arguments(arguments)?;
        Ok(Self::evaluate(&args.operation, args.a, args.b))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Map, Value};

    use super::*;
    use crate::errors::ToolError;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().expect("object literal")
    }

    #[tokio::test]
    async fn calculator_adds() {
        let text = Calculator
            .invoke(args(json!({"operation": "add", "a": 2, "b": 3})))
            .await
            .expect("add succeeds");
        assert_eq!(text, "2 + 3 = 5");
    }

    #[tokio::test]
    async fn calculator_divide_by_zero_is_text() {
        let text = Calculator
            .invoke(args(json!({"operation": "divide", "a": 10, "b": 0})))
            .await
            .expect("divide by zero is not a failure");
        assert!(text.contains("Cannot divide by zero"));
    }

    #[tokio::test]
    async fn calculator_unknown_operation_is_text() {
        let text = Calculator
            .invoke(args(json!({"operation": "modulo", "a": 10, "b": 3})))
            .await
            .expect("unknown operation is not a failure");
        assert_eq!(text, "Unknown operation: modulo");
    }

    #[tokio::test]
    async fn calculator_defaults_missing_arguments() {
        let text = Calculator.invoke(Map::new()).await.expect("defaults apply");
        assert_eq!(text, "0 + 0 = 0");

        let text = Calculator
            .invoke(args(json!({"a": 2, "b": 3})))
            .await
            .expect("operation defaults to add");
        assert_eq!(text, "2 + 3 = 5");
    }

    #[test]
    fn calculator_formats_remaining_operations() {
        use Operand::{Float, Int};

        assert_eq!(Calculator::evaluate("subtract", Int(7), Int(10)), "7 - 10 = -3");
        assert_eq!(
            Calculator::evaluate("multiply", Float(1.5), Int(4)),
            "1.5 × 4 = 6.0"
        );
        assert_eq!(Calculator::evaluate("divide", Int(10), Int(4)), "10 ÷ 4 = 2.5");
        assert_eq!(Calculator::evaluate("divide", Int(10), Int(2)), "10 ÷ 2 = 5.0");
        assert_eq!(Calculator::evaluate("add", Float(2.0), Int(3)), "2.0 + 3 = 5.0");
        assert_eq!(
            Calculator::evaluate("divide", Int(1), Float(0.0)),
            "Error: Cannot divide by zero"
        );
    }

    #[tokio::test]
    async fn calculator_keeps_float_operands_as_sent() {
        let text = Calculator
            .invoke(args(json!({"operation": "multiply", "a": 2.0, "b": 3})))
            .await
            .expect("multiply succeeds");
        assert_eq!(text, "2.0 × 3 = 6.0");
    }

    #[test]
    fn integer_overflow_falls_back_to_float() {
        let sum = Operand::Int(i64::MAX).combine(Operand::Int(1), i64::checked_add, |x, y| x + y);
        assert!(matches!(sum, Operand::Float(_)));
    }

    #[tokio::test]
    async fn calculator_rejects_null_operand() {
        let err = Calculator
            .invoke(args(json!({"operation": "add", "a": null, "b": 1})))
            .await
            .expect_err("null operand must fail");
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn calculator_rejects_non_numeric_operand() {
        let err = Calculator
            .invoke(args(json!({"operation": "add", "a": "two", "b": 3})))
            .await
            .expect_err("string operand must fail");
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn greeter_uses_name() {
        let text = Greeter
            .invoke(args(json!({"name": "Ada"})))
            .await
            .expect("greet succeeds");
        assert_eq!(text, "Hello, Ada! Welcome to MCP Server!");
    }

    #[tokio::test]
    async fn greeter_prints_non_string_names_and_keeps_empty_ones() {
        let text = Greeter
            .invoke(args(json!({"name": 42})))
            .await
            .expect("numeric name is accepted");
        assert_eq!(text, "Hello, 42! Welcome to MCP Server!");

        let text = Greeter
            .invoke(args(json!({"name": ""})))
            .await
            .expect("empty name is accepted");
        assert_eq!(text, "Hello, ! Welcome to MCP Server!");
    }

    #[tokio::test]
    async fn greeter_defaults_to_friend() {
        let text = Greeter.invoke(Map::new()).await.expect("greet succeeds");
        assert_eq!(text, "Hello, Friend! Welcome to MCP Server!");
    }

    #[test]
    fn default_registry_lists_tools_in_order() {
        let registry = default_registry();
        let names = registry
            .descriptors()
            .into_iter()
            .map(|tool| tool.name)
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["greet", "calculator"]);
        assert!(registry.get("calculator").is_some());
        assert!(registry.get("weather").is_none());
    }

    #[test]
    fn registering_same_name_replaces() {
        let registry = ToolRegistry::new().with_tool(Greeter).with_tool(Greeter);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn descriptors_carry_object_schema() {
        let tool = serde_json::to_value(CalculatorTool::tool()).expect("tool serializes");
        assert_eq!(tool["name"], "calculator");
        assert_eq!(tool["inputSchema"]["type"], "object");
        assert!(tool["inputSchema"]["properties"]["operation"].is_object());
    }
}
