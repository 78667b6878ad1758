//! Tools the hosted agent may call back into.
//!
//! Every tool declares itself through a static [`ToolDescriptor`]. The
//! [`ToolRegistry`] is the capability table the session queries: it renders
//! descriptors into function-tool definitions for the hosted protocol and
//! dispatches tool calls by name.

mod flights;
mod serpapi;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Map, Value};

pub use flights::{
    build_search_params, FlightSearchError, FlightSearchRequest, FlightSearchTool, TripType,
};
pub use serpapi::{SearchParams, SearchProvider, SerpApiProvider};

/// JSON type of a declared parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Integer,
    Number,
    Boolean,
}

impl ParamKind {
    fn json_type(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }
}

/// One declared tool parameter.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub description: &'static str,
    pub required: bool,
    pub default: Option<Value>,
    /// Allowed values, if the parameter is an enumeration
    pub allowed: Option<Vec<Value>>,
}

impl ParamSpec {
    pub fn required(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            description,
            required: true,
            default: None,
            allowed: None,
        }
    }

    pub fn optional(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind, description)
        }
    }

    pub fn with_allowed(mut self, values: Vec<Value>) -> Self {
        self.allowed = Some(values);
        self
    }
}

/// Static capability descriptor of a tool.
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    /// Parameters in declaration order
    pub params: Vec<ParamSpec>,
}

impl ToolDescriptor {
    /// JSON-schema object describing the parameters.
    pub fn parameters_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for param in &self.params {
            let mut property = Map::new();
            property.insert("type".to_string(), json!(param.kind.json_type()));
            property.insert("description".to_string(), json!(param.description));
            if let Some(default) = &param.default {
                property.insert("default".to_string(), default.clone());
            }
            if let Some(allowed) = &param.allowed {
                property.insert("enum".to_string(), Value::Array(allowed.clone()));
            }
            properties.insert(param.name.to_string(), Value::Object(property));

            if param.required {
                required.push(json!(param.name));
            }
        }

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// Summary of a registered tool, used for the agent instructions.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
}

/// Function-tool definition in the shape the hosted agent protocol expects.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ToolSchema {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionSchema,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FunctionSchema {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// A capability the hosted agent can invoke.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Static description of the tool and its parameters.
    fn descriptor(&self) -> &ToolDescriptor;

    /// Run the tool with the JSON arguments chosen by the model.
    async fn execute(&self, args: Value) -> anyhow::Result<String>;
}

/// Capability table queried by the agent session.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    // Registration order, so schemas and instructions are stable.
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any previous tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.descriptor().name.to_string();
        if self.tools.insert(name.clone(), tool).is_none() {
            self.order.push(name);
        }
    }

    pub fn list_tools(&self) -> Vec<ToolInfo> {
        self.ordered()
            .map(|tool| {
                let descriptor = tool.descriptor();
                ToolInfo {
                    name: descriptor.name.to_string(),
                    description: descriptor.description.to_string(),
                }
            })
            .collect()
    }

    pub fn get_tool_schemas(&self) -> Vec<ToolSchema> {
        self.ordered()
            .map(|tool| {
                let descriptor = tool.descriptor();
                ToolSchema {
                    tool_type: "function".to_string(),
                    function: FunctionSchema {
                        name: descriptor.name.to_string(),
                        description: descriptor.description.to_string(),
                        parameters: descriptor.parameters_schema(),
                    },
                }
            })
            .collect()
    }

    /// Execute a tool by name.
    pub async fn execute(&self, name: &str, args: Value) -> anyhow::Result<String> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| anyhow::anyhow!("Unknown tool: {}", name))?;
        tool.execute(args).await
    }

    fn ordered(&self) -> impl Iterator<Item = &Arc<dyn Tool>> {
        self.order.iter().filter_map(|name| self.tools.get(name))
    }
}
