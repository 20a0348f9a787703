// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Scenebridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Scenebridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Flat argument schemas for tools.
//!
//! A [`ToolSchema`] is an ordered list of top-level fields. Validation checks every
//! field and reports all violations together; it never stops at the first one.

use std::fmt;

use serde_json::{Map, Number, Value};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Integer,
    Number,
    Boolean,
    StringList,
    Object,
    Any,
}

impl FieldKind {
    fn label(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::StringList => "array of strings",
            Self::Object => "object",
            Self::Any => "any value",
        }
    }

    fn json_schema_type(self) -> Option<&'static str> {
        match self {
            Self::String => Some("string"),
            Self::Integer => Some("integer"),
            Self::Number => Some("number"),
            Self::Boolean => Some("boolean"),
            Self::StringList => Some("array"),
            Self::Object => Some("object"),
            Self::Any => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Presence {
    Required,
    Optional,
    Default(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    Min(f64),
    MinLength(usize),
    OneOf(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    name: String,
    kind: FieldKind,
    presence: Presence,
    description: Option<String>,
    constraints: Vec<Constraint>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            presence: Presence::Optional,
            description: None,
            constraints: Vec::new(),
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::String)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Integer)
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Number)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Boolean)
    }

    pub fn string_list(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::StringList)
    }

    pub fn object(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Object)
    }

    pub fn any(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Any)
    }

    pub fn required(mut self) -> Self {
        self.presence = Presence::Required;
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.presence = Presence::Default(value.into());
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn min(mut self, min: f64) -> Self {
        self.constraints.push(Constraint::Min(min));
        self
    }

    pub fn min_length(mut self, min_length: usize) -> Self {
        self.constraints.push(Constraint::MinLength(min_length));
        self
    }

    pub fn one_of(mut self, allowed: &[&str]) -> Self {
        self.constraints.push(Constraint::OneOf(allowed.iter().map(|v| (*v).to_owned()).collect()));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn presence(&self) -> &Presence {
        &self.presence
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Checks `value` against kind and constraints, returning the normalized value.
    fn check(&self, value: &Value, violations: &mut Vec<FieldViolation>) -> Option<Value> {
        let normalized = match (self.kind, value) {
            (FieldKind::String, Value::String(_))
            | (FieldKind::Boolean, Value::Bool(_))
            | (FieldKind::Number, Value::Number(_))
            | (FieldKind::Object, Value::Object(_))
            | (FieldKind::Any, _) => value.clone(),
            (FieldKind::Integer, Value::Number(number)) => match whole_integer(number) {
                Some(integer) => Value::Number(integer),
                None => {
                    violations.push(self.violation(format!("expected integer, got {number}")));
                    return None;
                }
            },
            (FieldKind::StringList, Value::Array(items)) => {
                let mut ok = true;
                for (index, item) in items.iter().enumerate() {
                    if !item.is_string() {
                        ok = false;
                        violations.push(FieldViolation::new(
                            format!("{}[{index}]", self.name),
                            format!("expected string, got {}", json_type_name(item)),
                        ));
                    }
                }
                if !ok {
                    return None;
                }
                value.clone()
            }
            (kind, other) => {
                violations.push(self.violation(format!(
                    "expected {}, got {}",
                    kind.label(),
                    json_type_name(other)
                )));
                return None;
            }
        };

        let before = violations.len();
        for constraint in &self.constraints {
            if let Some(message) = constraint_failure(constraint, &normalized) {
                violations.push(self.violation(message));
            }
        }
        (violations.len() == before).then_some(normalized)
    }

    fn violation(&self, message: String) -> FieldViolation {
        FieldViolation::new(self.name.clone(), message)
    }

    fn json_schema(&self) -> Value {
        let mut property = Map::new();
        if let Some(ty) = self.kind.json_schema_type() {
            property.insert("type".to_owned(), Value::String(ty.to_owned()));
        }
        if self.kind == FieldKind::StringList {
            property.insert("items".to_owned(), serde_json::json!({ "type": "string" }));
        }
        if let Some(description) = &self.description {
            property.insert("description".to_owned(), Value::String(description.clone()));
        }
        if let Presence::Default(value) = &self.presence {
            property.insert("default".to_owned(), value.clone());
        }
        for constraint in &self.constraints {
            match constraint {
                Constraint::Min(min) => {
                    property.insert("minimum".to_owned(), serde_json::json!(min));
                }
                Constraint::MinLength(len) => {
                    let key = if self.kind == FieldKind::StringList { "minItems" } else { "minLength" };
                    property.insert(key.to_owned(), serde_json::json!(len));
                }
                Constraint::OneOf(allowed) => {
                    property.insert("enum".to_owned(), serde_json::json!(allowed));
                }
            }
        }
        Value::Object(property)
    }
}

fn constraint_failure(constraint: &Constraint, value: &Value) -> Option<String> {
    match constraint {
        Constraint::Min(min) => {
            let number = value.as_f64()?;
            (number < *min).then(|| format!("must be at least {min}, got {number}"))
        }
        Constraint::MinLength(min_length) => {
            let len = match value {
                Value::String(text) => text.chars().count(),
                Value::Array(items) => items.len(),
                _ => return None,
            };
            (len < *min_length).then(|| format!("must have length at least {min_length}, got {len}"))
        }
        Constraint::OneOf(allowed) => {
            let text = value.as_str()?;
            (!allowed.iter().any(|candidate| candidate == text))
                .then(|| format!("must be one of {}, got `{text}`", allowed.join(", ")))
        }
    }
}

/// Whole numbers normalize to `i64`, saturating at its bounds.
fn whole_integer(number: &Number) -> Option<Number> {
    if number.is_i64() {
        return Some(number.clone());
    }
    if number.is_u64() {
        return Some(Number::from(i64::MAX));
    }
    let float = number.as_f64()?;
    // `as` saturates floats outside the i64 range.
    (float.is_finite() && float.fract() == 0.0).then(|| Number::from(float as i64))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field: field.into(), message: message.into() }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Every violation found in one argument object.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid arguments: {}", render_violations(.violations))]
pub struct SchemaViolations {
    pub violations: Vec<FieldViolation>,
}

impl SchemaViolations {
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.violations.iter().map(|violation| violation.field.as_str())
    }

    pub fn to_json(&self) -> Value {
        Value::Array(
            self.violations
                .iter()
                .map(|violation| {
                    serde_json::json!({ "field": violation.field, "message": violation.message })
                })
                .collect(),
        )
    }
}

fn render_violations(violations: &[FieldViolation]) -> String {
    violations.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolSchema {
    fields: Vec<FieldSpec>,
}

impl ToolSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `field`, replacing an earlier field of the same name.
    pub fn field(mut self, field: FieldSpec) -> Self {
        match self.fields.iter_mut().find(|existing| existing.name == field.name) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
        self
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Validates `args` and returns them normalized: defaults filled in, integers
    /// normalized, and fields not named by the schema dropped. `null` counts as an
    /// empty object; so does an absent field value of `null`.
    pub fn validate(&self, args: &Value) -> Result<Map<String, Value>, SchemaViolations> {
        let empty = Map::new();
        let object = match args {
            Value::Null => &empty,
            Value::Object(object) => object,
            other => {
                return Err(SchemaViolations {
                    violations: vec![FieldViolation::new(
                        "arguments",
                        format!("expected object, got {}", json_type_name(other)),
                    )],
                });
            }
        };

        let mut normalized = Map::new();
        let mut violations = Vec::new();
        for spec in &self.fields {
            match object.get(&spec.name).filter(|value| !value.is_null()) {
                Some(value) => {
                    if let Some(value) = spec.check(value, &mut violations) {
                        normalized.insert(spec.name.clone(), value);
                    }
                }
                None => match &spec.presence {
                    Presence::Required => {
                        violations.push(FieldViolation::new(spec.name.clone(), "is required"))
                    }
                    Presence::Default(value) => {
                        normalized.insert(spec.name.clone(), value.clone());
                    }
                    Presence::Optional => {}
                },
            }
        }

        if violations.is_empty() {
            Ok(normalized)
        } else {
            Err(SchemaViolations { violations })
        }
    }

    /// JSON Schema object for tool listings.
    pub fn to_json_schema(&self) -> Map<String, Value> {
        let properties = self
            .fields
            .iter()
            .map(|spec| (spec.name.clone(), spec.json_schema()))
            .collect::<Map<_, _>>();
        let required = self
            .fields
            .iter()
            .filter(|spec| spec.presence == Presence::Required)
            .map(|spec| Value::String(spec.name.clone()))
            .collect::<Vec<_>>();

        let mut schema = Map::new();
        schema.insert("type".to_owned(), Value::String("object".to_owned()));
        schema.insert("properties".to_owned(), Value::Object(properties));
        if !required.is_empty() {
            schema.insert("required".to_owned(), Value::Array(required));
        }
        schema
    }
}
