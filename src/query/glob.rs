// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Scenebridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Scenebridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use regex::{Regex, RegexBuilder};

/// Case-insensitive whole-string glob. `*` matches any run of characters and `?`
/// exactly one, line breaks included; everything else is literal.
#[derive(Debug, Clone)]
pub struct Glob {
    pattern: String,
    regex: Regex,
}

impl Glob {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let regex = RegexBuilder::new(&glob_to_regex(pattern))
            .case_insensitive(true)
            .dot_matches_new_line(true)
            .build()?;
        Ok(Self { pattern: pattern.to_owned(), regex })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

/// Translates a glob into an anchored regex source.
pub fn glob_to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push('^');
    let mut literal = String::new();
    for ch in pattern.chars() {
        match ch {
            '*' | '?' => {
                out.push_str(&regex::escape(&literal));
                literal.clear();
                out.push_str(if ch == '*' { ".*" } else { "." });
            }
            _ => literal.push(ch),
        }
    }
    out.push_str(&regex::escape(&literal));
    out.push('$');
    out
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("Enemy*", "EnemyBoss", true)]
    #[case("Enemy*", "enemy01", true)]
    #[case("Enemy*", "BossEnemy", false)]
    #[case("Enemy*", "Enemy", true)]
    #[case("Enemy?", "Enemy1", true)]
    #[case("Enemy?", "Enemy", false)]
    #[case("Enemy?", "Enemy12", false)]
    #[case("*Button", "PauseButton", true)]
    #[case("*Button", "Button Bar", false)]
    #[case("Main Light", "main light", true)]
    #[case("Canvas/*", "Canvas/HUD/ScoreLabel", true)]
    #[case("a.b", "axb", false)]
    #[case("(x)+[y]", "(X)+[Y]", true)]
    #[case("*", "", true)]
    #[case("", "", true)]
    #[case("", "x", false)]
    #[case("Enemy*", "Enemy\nBoss", true)]
    #[case("Line?Break", "Line\nBreak", true)]
    #[case("Enemy", "Enemy\n", false)]
    fn globs_match_case_insensitively_and_anchored(
        #[case] pattern: &str,
        #[case] text: &str,
        #[case] expected: bool,
    ) {
        assert_eq!(Glob::new(pattern).unwrap().is_match(text), expected, "{pattern} vs {text}");
    }

    #[test]
    fn regex_source_escapes_literals() {
        assert_eq!(glob_to_regex("a.b*"), r"^a\.b.*$");
        assert_eq!(glob_to_regex("?"), "^.$");
    }
}
