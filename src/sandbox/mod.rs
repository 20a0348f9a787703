// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Scenebridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Scenebridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Bounded execution of client-supplied scripts inside the editor.
//!
//! Source is scanned first (unless the caller opts out), wrapped in a strict-mode
//! prelude that exposes only the allow-listed globals, and then raced against its
//! deadline. Every outcome comes back as a [`ScriptReport`]; nothing here errors.

mod risk;

use std::time::{Duration, Instant};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::host::EditorHost;
use crate::model::{ScriptOutcome, ScriptRequest};

pub use risk::{scan, RiskCategory, RiskFinding, MAX_SOURCE_LEN};

pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const MAX_TIMEOUT_MS: u64 = 300_000;

/// The only names a wrapped script can reach besides language built-ins.
pub const ALLOWED_GLOBALS: &[&str] = &["cc", "Editor", "console", "scene"];

pub const API_DOCS: &str = "\
Scripts run as the body of a strict-mode function inside the editor.

Globals:
  cc       engine module (cc.find, cc.Vec3, cc.Color, component classes)
  Editor   editor module (Editor.Message.request, Editor.Selection)
  console  console.log / warn / error; captured lines are returned as `logs`
  scene    the open scene root node

Use `return <value>` to hand a JSON-serializable result back.

Rejected unless validation is skipped: filesystem access, child processes or
process control, eval and the Function constructor, timers, unconditional loops,
and sources over 50000 characters.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptOptions {
    pub return_result: bool,
    pub capture_console: bool,
    pub skip_validation: bool,
    pub show_api_docs: bool,
    pub timeout: Duration,
}

impl Default for ScriptOptions {
    fn default() -> Self {
        Self {
            return_result: true,
            capture_console: true,
            skip_validation: false,
            show_api_docs: false,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

/// Script arguments as a client sends them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptArgs {
    pub code: String,
    pub return_result: Option<bool>,
    pub timeout: Option<u64>,
    pub capture_console: Option<bool>,
    pub skip_validation: Option<bool>,
    pub show_api_docs: Option<bool>,
}

impl ScriptArgs {
    pub fn options(&self, default_timeout_ms: u64) -> ScriptOptions {
        let timeout_ms = self.timeout.unwrap_or(default_timeout_ms).clamp(1, MAX_TIMEOUT_MS);
        ScriptOptions {
            return_result: self.return_result.unwrap_or(true),
            capture_console: self.capture_console.unwrap_or(true),
            skip_validation: self.skip_validation.unwrap_or(false),
            show_api_docs: self.show_api_docs.unwrap_or(false),
            timeout: Duration::from_millis(timeout_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub passed: bool,
    pub skipped: bool,
    pub violations: Vec<RiskFinding>,
}

impl ValidationReport {
    pub fn check(source: &str) -> Self {
        let violations = scan(source);
        Self { passed: violations.is_empty(), skipped: false, violations }
    }

    pub fn skipped() -> Self {
        Self { passed: true, skipped: true, violations: Vec::new() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScriptReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub logs: Vec<String>,
    pub elapsed_ms: u64,
    pub timed_out: bool,
    pub validation: ValidationReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_docs: Option<String>,
}

impl ScriptReport {
    fn failure(message: String, elapsed_ms: u64, validation: ValidationReport) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(message),
            logs: Vec::new(),
            elapsed_ms,
            timed_out: false,
            validation,
            api_docs: None,
        }
    }
}

/// Wraps `source` so it runs in strict mode with only [`ALLOWED_GLOBALS`] in scope.
pub fn wrap_source(source: &str) -> String {
    let params = ALLOWED_GLOBALS.join(", ");
    format!("(function ({params}) {{\n\"use strict\";\n{source}\n}})({params});\n")
}

pub struct SandboxedCodeExecutor<'a, H> {
    host: &'a H,
}

impl<'a, H: EditorHost> SandboxedCodeExecutor<'a, H> {
    pub fn new(host: &'a H) -> Self {
        Self { host }
    }

    pub async fn execute(&self, source: &str, options: &ScriptOptions) -> ScriptReport {
        let validation = if options.skip_validation {
            ValidationReport::skipped()
        } else {
            ValidationReport::check(source)
        };
        let api_docs = options.show_api_docs.then(|| API_DOCS.to_owned());

        if !validation.passed {
            let categories = validation
                .violations
                .iter()
                .map(|finding| finding.category.label())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::info!(%categories, "script rejected by validation");
            let mut report =
                ScriptReport::failure(format!("validation failed: {categories}"), 0, validation);
            report.api_docs = api_docs;
            return report;
        }

        let request = ScriptRequest {
            source: wrap_source(source),
            globals: ALLOWED_GLOBALS.iter().map(|name| (*name).to_owned()).collect(),
            return_result: options.return_result,
            capture_console: options.capture_console,
        };

        let started = Instant::now();
        let outcome = tokio::time::timeout(options.timeout, self.host.run_script(request)).await;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let mut report = match outcome {
            Err(_) => {
                let timeout_ms = u64::try_from(options.timeout.as_millis()).unwrap_or(u64::MAX);
                tracing::warn!(timeout_ms, "script timed out");
                ScriptReport {
                    timed_out: true,
                    ..ScriptReport::failure(
                        format!("script timed out after {timeout_ms} ms"),
                        elapsed_ms,
                        validation,
                    )
                }
            }
            Ok(Err(err)) => {
                tracing::warn!(%err, "script host call failed");
                ScriptReport::failure(format!("editor host error: {err}"), elapsed_ms, validation)
            }
            Ok(Ok(run)) => match run.outcome {
                ScriptOutcome::Returned(value) => ScriptReport {
                    success: true,
                    result: options.return_result.then_some(value),
                    error: None,
                    logs: run.logs,
                    elapsed_ms,
                    timed_out: false,
                    validation,
                    api_docs: None,
                },
                ScriptOutcome::Threw(message) => ScriptReport {
                    logs: run.logs,
                    ..ScriptReport::failure(message, elapsed_ms, validation)
                },
            },
        };
        report.api_docs = api_docs;
        report
    }
}
