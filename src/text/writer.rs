use std::io;
use std::path::Path;

use crate::types::value::escape;
use crate::{Rule, RuleSet};

/// Formatting switches for [`TextWriter`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TextWriterOptions {
    pub indent: String,
    /// Emit rules with `enabled == false`, marked `enabled false`.
    pub include_disabled: bool,
    /// Emit a file header, rule descriptions and variant tags as `//` comments.
    pub include_comments: bool,
}

impl Default for TextWriterOptions {
    fn default() -> Self {
        Self {
            indent: "    ".to_owned(),
            include_disabled: false,
            include_comments: false,
        }
    }
}

impl TextWriterOptions {
    #[must_use]
    pub fn indent(mut self, indent: &str) -> Self {
        self.indent = indent.to_owned();
        self
    }

    #[must_use]
    pub fn include_disabled(mut self, include: bool) -> Self {
        self.include_disabled = include;
        self
    }

    #[must_use]
    pub fn include_comments(mut self, include: bool) -> Self {
        self.include_comments = include;
        self
    }
}

/// Renders a [`RuleSet`] as a text rule file. Rendering is total: every IR
/// value has a textual form.
#[derive(Debug, Clone, Default)]
pub struct TextWriter {
    options: TextWriterOptions,
}

impl TextWriter {
    #[must_use]
    pub fn new(options: TextWriterOptions) -> Self {
        Self { options }
    }

    #[must_use]
    pub fn options(&self) -> &TextWriterOptions {
        &self.options
    }

    #[must_use]
    pub fn render(&self, rule_set: &RuleSet) -> String {
        let mut lines: Vec<String> = Vec::new();

        if self.options.include_comments {
            lines.push(format!("// Generated from RuleSet: {}", rule_set.name));
            if let Some(table) = &rule_set.rule_table_name {
                lines.push(format!("// Decision Table: {table}"));
            }
            lines.push(String::new());
        }

        if !rule_set.package.is_empty() {
            lines.push(format!("package {};", rule_set.package));
            lines.push(String::new());
        }

        for import in &rule_set.imports {
            lines.push(format!("import {import};"));
        }
        if !rule_set.imports.is_empty() {
            lines.push(String::new());
        }

        for global in &rule_set.globals {
            lines.push(format!("global {} {};", global.type_name, global.name));
        }
        if !rule_set.globals.is_empty() {
            lines.push(String::new());
        }

        let mut written = 0;
        for rule in &rule_set.rules {
            if !rule.enabled && !self.options.include_disabled {
                log::trace!("skipping disabled rule '{}'", rule.name);
                continue;
            }
            if self.options.include_comments {
                if let Some(description) = &rule.description {
                    lines.push(format!("// {description}"));
                }
            }
            lines.push(self.render_rule(rule));
            lines.push(String::new());
            written += 1;
        }

        log::debug!(
            "rendered rule set '{}': {written} of {} rules",
            rule_set.name,
            rule_set.rules.len()
        );
        lines.join("\n")
    }

    /// One `rule ... end` block, without a trailing newline.
    #[must_use]
    pub fn render_rule(&self, rule: &Rule) -> String {
        let indent = &self.options.indent;
        let mut lines = vec![format!("rule \"{}\"", escape(&rule.name))];

        if let Some(salience) = rule.salience {
            lines.push(format!("{indent}salience {salience}"));
        }
        if !rule.enabled {
            lines.push(format!("{indent}enabled false"));
        }
        if self.options.include_comments {
            if let Some(id) = &rule.variant_id {
                lines.push(format!("{indent}// variant-id: {id}"));
            }
            if let Some(group) = &rule.variant_group {
                lines.push(format!("{indent}// variant-group: {group}"));
            }
        }

        lines.push(format!("{indent}when"));
        for pattern in &rule.fact_patterns {
            lines.push(format!("{indent}{indent}{}", pattern.render()));
        }
        lines.push(format!("{indent}then"));
        for action in &rule.actions {
            lines.push(format!("{indent}{indent}{}", action.render()));
        }
        lines.push("end".to_owned());
        lines.join("\n")
    }

    /// Render and write to `path`, creating parent directories. The
    /// destination is replaced atomically.
    ///
    /// # Errors
    ///
    /// Returns any I/O error from creating the directory or writing the file.
    pub fn write_file(&self, rule_set: &RuleSet, path: impl AsRef<Path>) -> io::Result<()> {
        crate::fs::write_atomic(path.as_ref(), self.render(rule_set).as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{field, Action, RuleBuilder, RuleSetBuilder};

    fn sample() -> RuleSet {
        RuleSetBuilder::new("Fraud")
            .package("com.example.fraud")
            .import("com.example.model.Transaction")
            .global("logger", "Logger")
            .table_name("FraudTable")
            .rule("HighScore", |r| {
                r.fact("Transaction", "tx")
                    .when(field("score").gte(0.9))
                    .fact("Result", "result")
                    .then_decline("result")
                    .salience(10)
                    .description("Decline risky scores")
                    .variant("g_0", "g")
            })
            .rule("Off", |r| r.fact("Transaction", "tx").disabled())
            .build()
            .unwrap()
    }

    #[test]
    fn default_layout() {
        let text = TextWriter::default().render(&sample());
        let expected = "\
package com.example.fraud;

import com.example.model.Transaction;

global Logger logger;

rule \"HighScore\"
    salience 10
    when
        $tx : Transaction(score >= 0.9)
        $result : Result()
    then
        $result.setDecision(\"DECLINE\");
end
";
        assert_eq!(text, expected);
    }

    #[test]
    fn disabled_rules_on_request() {
        let writer = TextWriter::new(TextWriterOptions::default().include_disabled(true));
        let text = writer.render(&sample());
        assert!(text.contains("rule \"Off\"\n    enabled false\n"));
    }

    #[test]
    fn comments_and_indent() {
        let options = TextWriterOptions::default()
            .include_comments(true)
            .indent("\t");
        let text = TextWriter::new(options).render(&sample());
        assert!(text.starts_with(
            "// Generated from RuleSet: Fraud\n// Decision Table: FraudTable\n\npackage"
        ));
        assert!(text.contains("// Decline risky scores\nrule \"HighScore\"\n\tsalience 10\n"));
        assert!(text.contains("\t// variant-id: g_0\n\t// variant-group: g\n\twhen\n"));
        assert!(text.contains("\t\t$tx : Transaction(score >= 0.9)\n"));
    }

    #[test]
    fn empty_package_is_omitted() {
        let mut rule_set = RuleSet::new("bare");
        rule_set.package.clear();
        assert_eq!(TextWriter::default().render(&rule_set), "");
    }

    #[test]
    fn rule_block_escapes_name() {
        let rule = RuleBuilder::new("say \"hi\"")
            .then(Action::log("hi"))
            .build()
            .unwrap();
        assert_eq!(
            rule.render(),
            "rule \"say \\\"hi\\\"\"\n    when\n    then\n        System.out.println(\"hi\");\nend"
        );
    }
}
