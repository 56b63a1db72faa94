//! Function-calling boundary for chat assistants.
//!
//! An assistant loop hands free text to a language model together with a
//! catalog of callable functions, then routes whatever function call comes
//! back to the matching implementation. This module provides that seam:
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │                 Session                  │
//! │  ┌──────────────┐   ┌─────────────────┐  │
//! │  │ ToolRegistry │   │ history: Vec<   │  │
//! │  │ group / text │   │   ToolCall>     │  │
//! │  │ + custom     │   └─────────────────┘  │
//! │  └──────┬───────┘                        │
//! └─────────┼────────────────────────────────┘
//!           ▼
//!     Tool::execute(params, &ToolContext)
//! ```
//!
//! The built-in tools wrap [`group_related_files`](crate::grouping::group_related_files)
//! and [`extract_text`](crate::extract::extract_text). Device controls, media,
//! database and speech tools live outside this crate; embedders register
//! them as custom [`Tool`]s.
//!
//! # Usage
//!
//! ```rust
//! use file_grouper::config::Config;
//! use file_grouper::traits::{Session, ToolRegistry};
//!
//! let session = Session::new(ToolRegistry::with_builtins(), Config::minimal());
//! assert!(session.registry().find("group_related_files").is_some());
//! ```

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Config;
use crate::extract::extract_text;
use crate::grouping::Grouper;
use crate::models::GroupingResult;

// ═══════════════════════════════════════════════════════════════════════
// Tool Trait
// ═══════════════════════════════════════════════════════════════════════

/// A function the assistant can call.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use anyhow::Result;
/// use serde_json::{json, Value};
/// use file_grouper::traits::{Tool, ToolContext};
///
/// pub struct AdjustVolumeTool;
///
/// #[async_trait]
/// impl Tool for AdjustVolumeTool {
///     fn name(&self) -> &str { "adjust_volume" }
///     fn description(&self) -> &str { "Set the system volume (0-100)" }
///
///     fn parameters_schema(&self) -> Value {
///         json!({
///             "type": "object",
///             "properties": { "percentage": { "type": "integer" } },
///             "required": ["percentage"]
///         })
///     }
///
///     async fn execute(&self, params: Value, _ctx: &ToolContext) -> Result<Value> {
///         let pct = params["percentage"].as_i64().unwrap_or(0);
///         Ok(json!({ "status": "success", "message": format!("Volume set to {}%", pct) }))
///     }
/// }
/// ```
#[async_trait]
pub trait Tool: Send + Sync {
    /// Function name as the model sees it (e.g. `"group_related_files"`).
    fn name(&self) -> &str;

    /// One-line description used by the model to decide whether to call it.
    fn description(&self) -> &str;

    /// Whether this tool ships with the crate. Defaults to `false`.
    fn is_builtin(&self) -> bool {
        false
    }

    /// JSON Schema for the parameters: `type: "object"`, `properties`,
    /// and optionally `required`.
    fn parameters_schema(&self) -> Value;

    /// Run the tool. `params` is always a JSON object.
    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value>;
}

// ═══════════════════════════════════════════════════════════════════════
// ToolContext
// ═══════════════════════════════════════════════════════════════════════

/// Shared state handed to every tool invocation.
pub struct ToolContext {
    config: Arc<Config>,
}

impl ToolContext {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

fn required_str<'a>(params: &'a Value, key: &str) -> Result<&'a str> {
    params
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .with_context(|| format!("missing required string parameter '{}'", key))
}

fn optional_str<'a>(params: &'a Value, key: &str) -> Result<Option<&'a str>> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => bail!("parameter '{}' must be a string, got {}", key, other),
    }
}

fn optional_f64(params: &Value, key: &str) -> Result<Option<f64>> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        // models sometimes quote numbers
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .with_context(|| format!("parameter '{}' must be a number, got '{}'", key, s)),
        Some(other) => bail!("parameter '{}' must be a number, got {}", key, other),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Built-in Tool Implementations
// ═══════════════════════════════════════════════════════════════════════

/// Groups the files of a folder by text similarity.
///
/// Runs on a blocking worker thread; the result is always a
/// `{"status": ...}` object, never an `Err`, once parameters are valid.
pub struct GroupFilesTool;

#[async_trait]
impl Tool for GroupFilesTool {
    fn name(&self) -> &str {
        "group_related_files"
    }

    fn description(&self) -> &str {
        "Groups similar files in folder"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "folder_path": {
                    "type": "string",
                    "description": "Path to folder to analyze"
                },
                "output_folder": {
                    "type": "string",
                    "description": "Output folder name"
                },
                "similarity_threshold": {
                    "type": "number",
                    "description": "Similarity threshold (0-1)"
                }
            },
            "required": ["folder_path"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let defaults = &ctx.config().grouping;
        let folder = PathBuf::from(required_str(&params, "folder_path")?);
        let output = optional_str(&params, "output_folder")?
            .map(PathBuf::from)
            .unwrap_or_else(|| defaults.output_folder.clone());
        let threshold =
            optional_f64(&params, "similarity_threshold")?.unwrap_or(defaults.similarity_threshold);
        let grouper = Grouper::new(output, threshold).with_exclude(defaults.exclude_set()?);

        let outcome = tokio::task::spawn_blocking(move || grouper.run(&folder))
            .await
            .context("grouping worker panicked")?;
        Ok(serde_json::to_value(GroupingResult::from(outcome))?)
    }
}

/// Extracts the plain text of a single file.
pub struct ExtractTextTool;

#[async_trait]
impl Tool for ExtractTextTool {
    fn name(&self) -> &str {
        "extract_text"
    }

    fn description(&self) -> &str {
        "Extracts plain text from a PDF, Word, PowerPoint or text file"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "Path to the file"
                }
            },
            "required": ["file_path"]
        })
    }

    async fn execute(&self, params: Value, _ctx: &ToolContext) -> Result<Value> {
        let path = PathBuf::from(required_str(&params, "file_path")?);
        let text = tokio::task::spawn_blocking(move || extract_text(&path))
            .await
            .context("extraction worker panicked")?;
        Ok(json!({ "text": text }))
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Registry
// ═══════════════════════════════════════════════════════════════════════

/// Registry of callable tools (built-in and custom).
///
/// ```rust
/// use file_grouper::traits::ToolRegistry;
///
/// let mut tools = ToolRegistry::with_builtins();
/// // tools.register(Box::new(MyTool::new()));
/// assert_eq!(tools.len(), 2);
/// ```
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Create a registry pre-loaded with `group_related_files` and `extract_text`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(GroupFilesTool));
        registry.register(Box::new(ExtractTextTool));
        registry
    }

    /// Register a tool. A later tool with the same name shadows nothing;
    /// lookups return the first match.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.push(tool);
    }

    pub fn tools(&self) -> &[Box<dyn Tool>] {
        &self.tools
    }

    pub fn find(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Function declarations for a model request, in registration order.
    pub fn catalog(&self) -> Value {
        Value::Array(
            self.tools
                .iter()
                .map(|t| {
                    json!({
                        "name": t.name(),
                        "description": t.description(),
                        "parameters": t.parameters_schema(),
                        "builtin": t.is_builtin(),
                    })
                })
                .collect(),
        )
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Session
// ═══════════════════════════════════════════════════════════════════════

/// One dispatched function call and what it returned.
#[derive(Debug, Clone)]
pub struct ToolCall {
    pub name: String,
    pub arguments: Value,
    /// Tool output, or the error message when dispatch failed.
    pub result: std::result::Result<Value, String>,
}

/// State of one assistant conversation.
///
/// Created when the conversation starts, mutated only by
/// [`dispatch`](Session::dispatch), and dropped when it ends.
pub struct Session {
    registry: ToolRegistry,
    ctx: ToolContext,
    history: Vec<ToolCall>,
}

impl Session {
    pub fn new(registry: ToolRegistry, config: Config) -> Self {
        Self {
            registry,
            ctx: ToolContext::new(Arc::new(config)),
            history: Vec::new(),
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn history(&self) -> &[ToolCall] {
        &self.history
    }

    /// Route a function call from the model to the matching tool.
    ///
    /// Every call is recorded in the history, including failed ones.
    pub async fn dispatch(&mut self, name: &str, arguments: Value) -> Result<Value> {
        let outcome = self.call(name, arguments.clone()).await;
        self.history.push(ToolCall {
            name: name.to_string(),
            arguments,
            result: outcome
                .as_ref()
                .map(Value::clone)
                .map_err(|e| format!("{:#}", e)),
        });
        outcome
    }

    async fn call(&self, name: &str, arguments: Value) -> Result<Value> {
        let tool = match self.registry.find(name) {
            Some(tool) => tool,
            None => {
                let known: Vec<&str> = self.registry.tools().iter().map(|t| t.name()).collect();
                bail!("Unknown tool: '{}'. Available: {}", name, known.join(", "));
            }
        };
        let params = match arguments {
            Value::Object(_) => arguments,
            Value::Null => json!({}),
            other => bail!("arguments for '{}' must be a JSON object, got {}", name, other),
        };
        tool.execute(params, &self.ctx).await
    }
}
