//! Tool trait and registry — the agent's callable capabilities.
//!
//! Each tool declares a typed parameter list; the registry renders it as a
//! JSON-Schema object for the model, validates and coerces the arguments the
//! model sends back, and dispatches to the handler. Validation failures and
//! handler failures are returned as `error:` result strings so the model can
//! self-correct on its next turn instead of aborting the run.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tracing::warn;

use crate::client::ToolDefinition;
use crate::error::ToolError;
use crate::message::ToolCall;

/// Reserved tool name a model may use to signal explicit termination.
pub const FINAL_ANSWER_TOOL: &str = "final_answer";

/// Marker appended when a serialized result exceeds the size cap.
pub const TRUNCATION_MARKER: &str = "…[truncated]";

const DEFAULT_HANDLER_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_RESULT_MAX_BYTES: usize = 8192;

/// The semantic type of a tool parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamKind {
    String,
    Number,
    Boolean,
    /// A closed set of string values, matched case-insensitively.
    Enum(Vec<String>),
}

/// A single declared parameter of a tool.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub description: String,
    pub required: bool,
    /// Alternative key names models commonly emit for this parameter
    /// (e.g. `location` where the schema says `city`).
    pub aliases: Vec<String>,
}

impl ParamSpec {
    pub fn new(name: impl Into<String>, kind: ParamKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            description: description.into(),
            required: false,
            aliases: Vec::new(),
        }
    }

    pub fn string(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParamKind::String, description)
    }

    pub fn number(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Number, description)
    }

    pub fn enumerated<S: Into<String>>(
        name: impl Into<String>,
        description: impl Into<String>,
        variants: impl IntoIterator<Item = S>,
    ) -> Self {
        Self::new(
            name,
            ParamKind::Enum(variants.into_iter().map(Into::into).collect()),
            description,
        )
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    fn json_type(&self) -> &'static str {
        match self.kind {
            ParamKind::String | ParamKind::Enum(_) => "string",
            ParamKind::Number => "number",
            ParamKind::Boolean => "boolean",
        }
    }
}

/// The core Tool trait.
///
/// Handlers receive a validated argument map and return a string or any
/// JSON-serializable value; maps and sequences are serialized with stable
/// key ordering. Handlers may fail — the registry converts failures into
/// `error:` result strings.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g. "get_current_weather").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the model).
    fn description(&self) -> &str;

    /// The declared parameters.
    fn parameters(&self) -> Vec<ParamSpec>;

    /// Per-handler timeout override. `None` uses the registry default.
    fn timeout(&self) -> Option<Duration> {
        None
    }

    /// Whether repeated calls with identical arguments may be answered
    /// from a prior result. Off unless a tool opts in.
    fn idempotent(&self) -> bool {
        false
    }

    /// Execute the tool with validated arguments.
    async fn call(
        &self,
        arguments: serde_json::Map<String, serde_json::Value>,
    ) -> std::result::Result<serde_json::Value, ToolError>;

    /// Render this tool as a definition for transmission to the model.
    fn to_definition(&self) -> ToolDefinition {
        let params = self.parameters();
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();
        for p in &params {
            let mut prop = serde_json::Map::new();
            prop.insert("type".into(), serde_json::json!(p.json_type()));
            prop.insert("description".into(), serde_json::json!(p.description));
            if let ParamKind::Enum(variants) = &p.kind {
                prop.insert("enum".into(), serde_json::json!(variants));
            }
            properties.insert(p.name.clone(), serde_json::Value::Object(prop));
            if p.required {
                required.push(p.name.clone());
            }
        }
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": properties,
                "required": required,
            }),
        }
    }
}

/// The outcome of a dispatched tool call.
///
/// `output` is always a serialized textual result — soft failures are
/// `error:`-prefixed strings inside it. `dropped_arguments` lists unknown
/// keys the validator discarded, for recording on the tool message.
#[derive(Debug, Clone)]
pub struct ToolOutcome {
    pub output: String,
    pub dropped_arguments: Vec<String>,
}

/// The advertisement for the reserved `final_answer` tool.
pub fn final_answer_definition() -> ToolDefinition {
    ToolDefinition {
        name: FINAL_ANSWER_TOOL.into(),
        description: "Finish the conversation with a final answer for the user. \
                      Call this once you have everything you need."
            .into(),
        parameters: serde_json::json!({
            "type": "object",
            "properties": {
                "answer": {
                    "type": "string",
                    "description": "The complete final answer"
                }
            },
            "required": ["answer"],
        }),
    }
}

/// A registry of available tools.
///
/// The agent runner uses this to advertise tool definitions to the model
/// and to validate and dispatch the calls the model emits. The registry is
/// read-mostly after construction; share it across concurrent runs only if
/// the handlers themselves tolerate concurrent invocation.
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
    default_handler_timeout: Duration,
    result_max_bytes: usize,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            default_handler_timeout: DEFAULT_HANDLER_TIMEOUT,
            result_max_bytes: DEFAULT_RESULT_MAX_BYTES,
        }
    }

    /// Set the default per-handler timeout.
    pub fn with_default_handler_timeout(mut self, timeout: Duration) -> Self {
        self.default_handler_timeout = timeout;
        self
    }

    /// Set the cap on serialized result size.
    pub fn with_result_max_bytes(mut self, max: usize) -> Self {
        self.result_max_bytes = max;
        self
    }

    /// Register a tool. Fails on a duplicate or reserved name.
    pub fn register(&mut self, tool: Box<dyn Tool>) -> std::result::Result<(), ToolError> {
        let name = tool.name().to_string();
        if name == FINAL_ANSWER_TOOL {
            return Err(ToolError::Reserved(name));
        }
        if self.tools.contains_key(&name) {
            return Err(ToolError::Duplicate(name));
        }
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// All advertised tool definitions, sorted by name for stable output.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self.tools.values().map(|t| t.to_definition()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// All registered tool names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Validate, coerce, dispatch, and serialize one tool call.
    ///
    /// The only hard error is [`ToolError::UnknownTool`]; everything else —
    /// missing required arguments, handler failure, handler timeout — comes
    /// back as an `error:` result string inside the outcome.
    pub async fn invoke(&self, call: &ToolCall) -> std::result::Result<ToolOutcome, ToolError> {
        let tool = self
            .tools
            .get(&call.name)
            .ok_or_else(|| ToolError::UnknownTool(call.name.clone()))?;

        let params = tool.parameters();
        let mut validated = serde_json::Map::new();
        let mut dropped = Vec::new();

        for p in &params {
            let value = call.arguments.get(&p.name).or_else(|| {
                // one round of alias resolution
                p.aliases.iter().find_map(|a| call.arguments.get(a))
            });
            match value {
                Some(v) => {
                    validated.insert(p.name.clone(), coerce(&p.kind, v));
                }
                None if p.required => {
                    return Ok(ToolOutcome {
                        output: format!(
                            "error: missing required argument '{}' for tool '{}'",
                            p.name, call.name
                        ),
                        dropped_arguments: dropped,
                    });
                }
                None => {}
            }
        }

        // unknown keys are dropped with a warning, never a hard error
        for key in call.arguments.keys() {
            let known = params
                .iter()
                .any(|p| p.name == *key || p.aliases.iter().any(|a| a == key));
            if !known {
                warn!(tool = %call.name, argument = %key, "Dropping unknown tool argument");
                dropped.push(key.clone());
            }
        }

        let timeout = tool.timeout().unwrap_or(self.default_handler_timeout);
        let output = match tokio::time::timeout(timeout, tool.call(validated)).await {
            Ok(Ok(serde_json::Value::String(s))) => s,
            Ok(Ok(value)) => value.to_string(),
            Ok(Err(e)) => format!("error: {e}"),
            Err(_) => format!(
                "error: tool '{}' timed out after {}s",
                call.name,
                timeout.as_secs()
            ),
        };

        Ok(ToolOutcome {
            output: self.truncate(output),
            dropped_arguments: dropped,
        })
    }

    fn truncate(&self, output: String) -> String {
        if output.len() <= self.result_max_bytes {
            return output;
        }
        let mut cut = self.result_max_bytes;
        while !output.is_char_boundary(cut) {
            cut -= 1;
        }
        let mut truncated = output[..cut].to_string();
        truncated.push_str(TRUNCATION_MARKER);
        truncated
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Best-effort coercion toward the declared kind.
///
/// Values that cannot be coerced pass through verbatim; the handler sees
/// what the model sent.
fn coerce(kind: &ParamKind, value: &serde_json::Value) -> serde_json::Value {
    use serde_json::Value;
    match (kind, value) {
        (ParamKind::Number, Value::String(s)) => {
            if let Ok(n) = s.trim().parse::<i64>() {
                Value::from(n)
            } else if let Ok(n) = s.trim().parse::<f64>() {
                serde_json::Number::from_f64(n).map(Value::Number).unwrap_or_else(|| value.clone())
            } else {
                value.clone()
            }
        }
        (ParamKind::Boolean, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => value.clone(),
        },
        (ParamKind::Enum(variants), Value::String(s)) => variants
            .iter()
            .find(|v| v.eq_ignore_ascii_case(s.trim()))
            .map(|v| Value::String(v.clone()))
            .unwrap_or_else(|| value.clone()),
        (ParamKind::String, Value::Number(n)) => Value::String(n.to_string()),
        (ParamKind::String, Value::Bool(b)) => Value::String(b.to_string()),
        _ => value.clone(),
    }
}
