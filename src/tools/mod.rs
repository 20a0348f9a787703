// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Scenebridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Scenebridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! The named tool catalog and its single dispatch entry point.

pub mod catalog;
pub mod schema;

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ToolError;

pub use catalog::register_scene_tools;
pub use schema::{FieldKind, FieldSpec, FieldViolation, Presence, SchemaViolations, ToolSchema};

const SUGGESTION_THRESHOLD: f64 = 0.6;
const MAX_SUGGESTIONS: usize = 3;

pub type ToolFuture = Pin<Box<dyn Future<Output = Result<ToolOutput, ToolError>> + Send>>;
type Handler = Arc<dyn Fn(Map<String, Value>) -> ToolFuture + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentPart {
    Text {
        text: String,
    },
    Image {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    Resource {
        uri: String,
        #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
}

/// What a handler hands back. Handlers pick the variant; dispatch never guesses.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    Value(Value),
    Content(Vec<ContentPart>),
}

impl ToolOutput {
    pub fn value<T: Serialize>(value: &T) -> Result<Self, ToolError> {
        serde_json::to_value(value)
            .map(Self::Value)
            .map_err(|err| ToolError::Internal(format!("unserializable result: {err}")))
    }

    /// A single text part holding `value` as JSON.
    pub fn json_text<T: Serialize>(value: &T) -> Result<Self, ToolError> {
        let text = serde_json::to_string(value)
            .map_err(|err| ToolError::Internal(format!("unserializable result: {err}")))?;
        Ok(Self::Content(vec![ContentPart::Text { text }]))
    }

    /// Collapses the output to one value. The first text part wins: its parsed JSON if
    /// it parses, its raw text otherwise. Content without text stays a list of parts.
    pub fn into_value(self) -> Value {
        match self {
            Self::Value(value) => value,
            Self::Content(parts) => {
                let text = parts.iter().find_map(|part| match part {
                    ContentPart::Text { text } => Some(text.as_str()),
                    _ => None,
                });
                match text {
                    Some(text) => serde_json::from_str(text)
                        .unwrap_or_else(|_| Value::String(text.to_owned())),
                    None => serde_json::to_value(&parts).unwrap_or(Value::Null),
                }
            }
        }
    }
}

#[derive(Clone)]
pub struct ToolDefinition {
    name: String,
    title: String,
    description: String,
    schema: ToolSchema,
    output_schema: Option<Map<String, Value>>,
    handler: Handler,
}

impl fmt::Debug for ToolDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDefinition")
            .field("name", &self.name)
            .field("title", &self.title)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

impl ToolDefinition {
    pub fn new<F, Fut>(
        name: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        schema: ToolSchema,
        handler: F,
    ) -> Self
    where
        F: Fn(Map<String, Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ToolOutput, ToolError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            title: title.into(),
            description: description.into(),
            schema,
            output_schema: None,
            handler: Arc::new(move |args| Box::pin(handler(args))),
        }
    }

    /// Advertises the JSON Schema of `T` as this tool's result shape.
    pub fn with_output_schema<T: JsonSchema>(mut self) -> Self {
        if let Ok(Value::Object(schema)) = serde_json::to_value(schemars::schema_for!(T)) {
            self.output_schema = Some(schema);
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn schema(&self) -> &ToolSchema {
        &self.schema
    }

    pub fn input_schema(&self) -> Map<String, Value> {
        self.schema.to_json_schema()
    }

    pub fn output_schema(&self) -> Option<&Map<String, Value>> {
        self.output_schema.as_ref()
    }
}

/// Name-keyed tool catalog. Filled at start-up, then shared read-only.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, ToolDefinition>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `definition`, replacing any earlier tool with the same name.
    pub fn register(&mut self, definition: ToolDefinition) {
        if self.tools.insert(definition.name.clone(), definition).is_some() {
            tracing::debug!("replaced an existing tool registration");
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.get(name)
    }

    pub fn list_names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn list_all(&self) -> impl Iterator<Item = &ToolDefinition> {
        self.tools.values()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn clear(&mut self) {
        self.tools.clear();
    }

    /// Up to three registered names that look like `name`, closest first.
    pub fn suggestions(&self, name: &str) -> Vec<String> {
        let mut scored = self
            .tools
            .keys()
            .map(|candidate| (rapidfuzz::fuzz::ratio(name.chars(), candidate.chars()), candidate))
            .filter(|(score, _)| *score >= SUGGESTION_THRESHOLD)
            .collect::<Vec<_>>();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(b.1)));
        scored.into_iter().take(MAX_SUGGESTIONS).map(|(_, name)| name.clone()).collect()
    }

    /// Resolves `name`, validates `args` against its schema, runs the handler and
    /// collapses its output to a single value.
    pub async fn execute(&self, name: &str, args: &Value) -> Result<Value, ToolError> {
        let definition = self
            .lookup(name)
            .ok_or_else(|| ToolError::tool_not_found(name, self.suggestions(name)))?;
        let normalized = definition.schema.validate(args)?;
        tracing::debug!(tool = name, "dispatching tool call");
        let output = (definition.handler)(normalized).await?;
        Ok(output.into_value())
    }
}
