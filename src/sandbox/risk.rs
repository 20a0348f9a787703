// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Scenebridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Scenebridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Pattern scan for script source that should not reach the editor.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const MAX_SOURCE_LEN: usize = 50_000;

const EXCERPT_LEN: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum RiskCategory {
    Filesystem,
    Process,
    DynamicEval,
    Timers,
    InfiniteLoop,
    SourceTooLong,
}

impl RiskCategory {
    pub fn label(self) -> &'static str {
        match self {
            Self::Filesystem => "filesystem access",
            Self::Process => "process control",
            Self::DynamicEval => "dynamic evaluation",
            Self::Timers => "timer registration",
            Self::InfiniteLoop => "infinite loop",
            Self::SourceTooLong => "source too long",
        }
    }
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RiskFinding {
    pub category: RiskCategory,
    /// The first offending snippet of the source, or the measured length.
    pub excerpt: String,
}

const PATTERNS: &[(RiskCategory, &str)] = &[
    (RiskCategory::Filesystem, r#"\brequire\s*\(\s*['"`](?:node:)?(?:fs|fs/promises|fs-extra)['"`]"#),
    (RiskCategory::Filesystem, r#"\bimport\b[^;]*\bfrom\s*['"`](?:node:)?fs(?:/promises)?['"`]"#),
    (RiskCategory::Filesystem, r"\bfs\s*\.\s*[A-Za-z]+(?:Sync)?\s*\("),
    (RiskCategory::Process, r#"\brequire\s*\(\s*['"`](?:node:)?(?:child_process|cluster|worker_threads)['"`]"#),
    (RiskCategory::Process, r"\bprocess\s*\.\s*(?:exit|kill|abort|binding|dlopen|chdir)\b"),
    (RiskCategory::Process, r"\b(?:execSync|execFile|execFileSync|spawnSync|spawn|fork)\s*\("),
    (RiskCategory::DynamicEval, r"\beval\s*\("),
    (RiskCategory::DynamicEval, r"\bnew\s+Function\s*\("),
    (RiskCategory::DynamicEval, r"\bFunction\s*\(\s*['`]"),
    (RiskCategory::Timers, r"\b(?:setTimeout|setInterval|setImmediate|requestAnimationFrame)\s*\("),
    (RiskCategory::InfiniteLoop, r"\bwhile\s*\(\s*(?:true|1|!0)\s*\)"),
    (RiskCategory::InfiniteLoop, r"\bfor\s*\(\s*;\s*;\s*\)"),
];

fn compiled() -> &'static [(RiskCategory, Regex)] {
    static COMPILED: OnceLock<Vec<(RiskCategory, Regex)>> = OnceLock::new();
    COMPILED.get_or_init(|| {
        PATTERNS
            .iter()
            .filter_map(|(category, pattern)| match Regex::new(pattern) {
                Ok(regex) => Some((*category, regex)),
                Err(err) => {
                    tracing::error!(%err, pattern, "skipping unparsable risk pattern");
                    None
                }
            })
            .collect()
    })
}

/// Every risk category the source trips, once each, in declaration order.
pub fn scan(source: &str) -> Vec<RiskFinding> {
    let mut findings: Vec<RiskFinding> = Vec::new();
    let len = source.chars().count();
    if len > MAX_SOURCE_LEN {
        findings.push(RiskFinding {
            category: RiskCategory::SourceTooLong,
            excerpt: format!("{len} characters exceeds the {MAX_SOURCE_LEN} character limit"),
        });
    }
    for (category, regex) in compiled() {
        if findings.iter().any(|finding| finding.category == *category) {
            continue;
        }
        if let Some(found) = regex.find(source) {
            findings.push(RiskFinding { category: *category, excerpt: excerpt(found.as_str()) });
        }
    }
    findings
}

fn excerpt(text: &str) -> String {
    text.chars().take(EXCERPT_LEN).collect()
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn every_pattern_compiles() {
        assert_eq!(compiled().len(), PATTERNS.len());
    }

    #[rstest]
    #[case("const fs = require('fs');", RiskCategory::Filesystem)]
    #[case("import { readFileSync } from \"node:fs\";", RiskCategory::Filesystem)]
    #[case("fs.writeFileSync('/tmp/x', data)", RiskCategory::Filesystem)]
    #[case("require(\"child_process\").execSync('ls')", RiskCategory::Process)]
    #[case("process.exit(1)", RiskCategory::Process)]
    #[case("eval('1 + 1')", RiskCategory::DynamicEval)]
    #[case("const f = new Function('a', 'return a');", RiskCategory::DynamicEval)]
    #[case("setTimeout(() => tick(), 10)", RiskCategory::Timers)]
    #[case("setInterval(tick, 10)", RiskCategory::Timers)]
    #[case("while (true) { step(); }", RiskCategory::InfiniteLoop)]
    #[case("for (;;) {}", RiskCategory::InfiniteLoop)]
    fn risky_constructs_are_flagged(#[case] source: &str, #[case] expected: RiskCategory) {
        let categories = scan(source).into_iter().map(|f| f.category).collect::<Vec<_>>();
        assert!(categories.contains(&expected), "{source}: {categories:?}");
    }

    #[rstest]
    #[case("const node = cc.find('Canvas'); return node.name;")]
    #[case("for (let i = 0; i < 10; i++) { console.log(i); }")]
    #[case("const evaluation = score * 2;")]
    #[case("node.setPosition(0, 0, 0);")]
    fn ordinary_scripts_pass(#[case] source: &str) {
        assert_eq!(scan(source), Vec::new());
    }

    #[test]
    fn each_category_is_reported_once() {
        let findings = scan("eval('a'); eval('b'); setTimeout(f); while (1) {}");
        let categories = findings.iter().map(|f| f.category).collect::<Vec<_>>();
        assert_eq!(
            categories,
            vec![RiskCategory::DynamicEval, RiskCategory::Timers, RiskCategory::InfiniteLoop]
        );
        assert_eq!(findings[0].excerpt, "eval(");
    }

    #[test]
    fn oversized_source_is_flagged() {
        let source = "x".repeat(MAX_SOURCE_LEN + 1);
        assert_eq!(scan(&source)[0].category, RiskCategory::SourceTooLong);
        assert!(scan(&"x".repeat(MAX_SOURCE_LEN)).is_empty());
    }
}
