use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use super::action::Action;
use super::condition::Condition;
use super::error::BuildError;
use super::fact::FactPattern;
use super::rule::Rule;
use super::value::Value;
use crate::table::{Sheet, TableWriter};
use crate::text::{TextWriter, TextWriterOptions};

/// Package used when none is given.
pub const DEFAULT_PACKAGE: &str = "com.example.rules";

/// A `global <Type> <name>;` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Global {
    pub name: String,
    pub type_name: String,
}

/// A named collection of rules with shared package, imports and globals.
///
/// This is the exchange contract between formats: every parser produces one
/// and every writer consumes one.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RuleSet {
    pub name: String,
    /// Dotted namespace, e.g. `com.example.fraud`.
    pub package: String,
    pub imports: Vec<String>,
    pub rules: Vec<Rule>,
    /// In first-declaration order; names are unique.
    pub globals: Vec<Global>,
    /// Name of the decision table this set came from, if any.
    pub rule_table_name: Option<String>,
    /// Primary fact type of the decision table, if any.
    pub fact_type: Option<String>,
}

impl RuleSet {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            package: DEFAULT_PACKAGE.to_owned(),
            imports: Vec::new(),
            rules: Vec::new(),
            globals: Vec::new(),
            rule_table_name: None,
            fact_type: None,
        }
    }

    pub fn add_rule(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    #[must_use]
    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.name == name)
    }

    #[must_use]
    pub fn rules_by_variant_group(&self, group: &str) -> Vec<&Rule> {
        self.rules
            .iter()
            .filter(|r| r.variant_group.as_deref() == Some(group))
            .collect()
    }

    /// Declare a global, replacing the type of an existing one in place.
    pub fn set_global(&mut self, name: &str, type_name: &str) {
        match self.globals.iter_mut().find(|g| g.name == name) {
            Some(existing) => existing.type_name = type_name.to_owned(),
            None => self.globals.push(Global {
                name: name.to_owned(),
                type_name: type_name.to_owned(),
            }),
        }
    }

    #[must_use]
    pub fn global(&self, name: &str) -> Option<&str> {
        self.globals
            .iter()
            .find(|g| g.name == name)
            .map(|g| g.type_name.as_str())
    }

    /// Render as a text rule file with the default layout. Disabled rules are
    /// omitted; use [`TextWriter`] to include them.
    #[must_use]
    pub fn render(&self) -> String {
        TextWriter::default().render(self)
    }

    /// Parse a text rule file and keep only the rule set.
    ///
    /// # Errors
    ///
    /// Returns [`RulegridError::Text`](crate::RulegridError::Text) if the
    /// text is structurally broken.
    pub fn from_text(input: &str) -> Result<Self, crate::RulegridError> {
        Ok(crate::text::parse(input)?.rule_set)
    }

    /// Read and parse a text rule file. The rule set is named after the file stem.
    ///
    /// # Errors
    ///
    /// Returns [`RulegridError`](crate::RulegridError) on I/O or parse failure.
    pub fn from_text_file(path: impl AsRef<Path>) -> Result<Self, crate::RulegridError> {
        Ok(crate::text::parse_file(path)?.rule_set)
    }

    /// Write the default text rendering to `path`, atomically.
    ///
    /// # Errors
    ///
    /// Returns [`RulegridError::Io`](crate::RulegridError::Io) on write failure.
    pub fn write_text_file(&self, path: impl AsRef<Path>) -> Result<(), crate::RulegridError> {
        TextWriter::new(TextWriterOptions::default()).write_file(self, path)?;
        Ok(())
    }

    /// Interpret a decision table sheet.
    ///
    /// # Errors
    ///
    /// Returns [`RulegridError::Table`](crate::RulegridError::Table) if the
    /// sheet has no decision table header.
    pub fn from_sheet(sheet: &Sheet) -> Result<Self, crate::RulegridError> {
        Ok(crate::table::parse(sheet)?.rule_set)
    }

    /// Read a CSV decision table.
    ///
    /// # Errors
    ///
    /// Returns [`RulegridError::Table`](crate::RulegridError::Table) on read
    /// or structure failure.
    pub fn from_csv_file(path: impl AsRef<Path>) -> Result<Self, crate::RulegridError> {
        Ok(crate::table::parse_csv_file(path)?.rule_set)
    }

    /// Lay this rule set out as a decision table with inferred columns.
    #[must_use]
    pub fn to_sheet(&self) -> Sheet {
        TableWriter::default().write(self)
    }

    /// Write the decision table as CSV to `path`, atomically.
    ///
    /// # Errors
    ///
    /// Returns [`RulegridError`](crate::RulegridError) on encoding or I/O failure.
    pub fn write_csv_file(&self, path: impl AsRef<Path>) -> Result<(), crate::RulegridError> {
        TableWriter::default().write_csv_file(self, path)
    }

    /// Read and parse the first worksheet of an `.xlsx` decision table,
    /// discarding warnings.
    ///
    /// # Errors
    ///
    /// Returns [`RulegridError`](crate::RulegridError) on read or structure failure.
    pub fn from_xlsx_file(path: impl AsRef<Path>) -> Result<Self, crate::RulegridError> {
        Ok(crate::table::parse_xlsx_file(path)?.rule_set)
    }

    /// Write the decision table as an `.xlsx` workbook to `path`, atomically.
    ///
    /// # Errors
    ///
    /// Returns [`RulegridError`](crate::RulegridError) on encoding or I/O failure.
    pub fn write_xlsx_file(&self, path: impl AsRef<Path>) -> Result<(), crate::RulegridError> {
        TableWriter::default().write_xlsx_file(self, path)
    }
}

impl fmt::Display for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RuleSet({}, package {}, {} rules, {} imports)",
            self.name,
            self.package,
            self.rules.len(),
            self.imports.len(),
        )
    }
}

/// Fluent builder for a single [`Rule`].
///
/// Conditions attach to the most recent fact pattern added with
/// [`fact()`](Self::fact).
///
/// # Example
///
/// ```
/// use rulegrid::{field, RuleBuilder};
///
/// let rule = RuleBuilder::new("HighRiskTransaction")
///     .fact("Transaction", "tx")
///     .when(field("score").gt(0.8))
///     .when(field("amount").between(1000_i64, 10000_i64))
///     .then_decline("result")
///     .salience(100)
///     .build()
///     .unwrap();
/// assert_eq!(rule.fact_patterns[0].conditions.len(), 2);
/// ```
#[derive(Debug)]
pub struct RuleBuilder {
    rule: Rule,
    orphaned_condition: bool,
}

impl RuleBuilder {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            rule: Rule::new(name),
            orphaned_condition: false,
        }
    }

    /// Start a new fact pattern `$binding : fact_type(...)`.
    #[must_use]
    pub fn fact(mut self, fact_type: &str, binding: &str) -> Self {
        self.rule
            .fact_patterns
            .push(FactPattern::new(fact_type).bind(binding));
        self
    }

    /// Add a condition to the current fact pattern.
    ///
    /// Without a preceding [`fact()`](Self::fact), [`build()`](Self::build)
    /// fails with [`BuildError::MissingFactPattern`].
    #[must_use]
    pub fn when(mut self, condition: impl Into<Condition>) -> Self {
        match self.rule.fact_patterns.last_mut() {
            Some(pattern) => pattern.conditions.push(condition.into()),
            None => self.orphaned_condition = true,
        }
        self
    }

    #[must_use]
    pub fn then(mut self, action: Action) -> Self {
        self.rule.actions.push(action);
        self
    }

    #[must_use]
    pub fn then_set(self, target: &str, value: impl Into<Value>, binding: &str) -> Self {
        self.then(Action::set_field(target, value, binding))
    }

    #[must_use]
    pub fn then_decline(self, binding: &str) -> Self {
        self.then_set("decision", "DECLINE", binding)
    }

    #[must_use]
    pub fn then_approve(self, binding: &str) -> Self {
        self.then_set("decision", "APPROVE", binding)
    }

    #[must_use]
    pub fn then_review(self, binding: &str) -> Self {
        self.then_set("decision", "REVIEW", binding)
    }

    #[must_use]
    pub fn salience(mut self, salience: i32) -> Self {
        self.rule.salience = Some(salience);
        self
    }

    #[must_use]
    pub fn description(mut self, description: &str) -> Self {
        self.rule.description = Some(description.to_owned());
        self
    }

    #[must_use]
    pub fn variant(mut self, variant_id: &str, variant_group: &str) -> Self {
        self.rule.variant_id = Some(variant_id.to_owned());
        self.rule.variant_group = Some(variant_group.to_owned());
        self
    }

    #[must_use]
    pub fn metadata(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.rule.metadata.insert(key.to_owned(), value.into());
        self
    }

    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.rule.enabled = false;
        self
    }

    /// # Errors
    ///
    /// Returns [`BuildError::MissingFactPattern`] if a condition was added
    /// before any fact pattern.
    pub fn build(self) -> Result<Rule, BuildError> {
        if self.orphaned_condition {
            return Err(BuildError::MissingFactPattern {
                rule: self.rule.name,
            });
        }
        Ok(self.rule)
    }
}

impl From<Rule> for RuleBuilder {
    fn from(rule: Rule) -> Self {
        Self {
            rule,
            orphaned_condition: false,
        }
    }
}

/// Builder for constructing a [`RuleSet`].
///
/// # Example
///
/// ```
/// use rulegrid::{field, RuleSetBuilder};
///
/// let rule_set = RuleSetBuilder::new("FraudRules")
///     .package("com.example.fraud")
///     .import("com.example.model.Transaction")
///     .rule("high_score", |r| {
///         r.fact("Transaction", "tx")
///             .when(field("score").gte(0.9))
///             .then_decline("result")
///     })
///     .build()
///     .unwrap();
/// assert_eq!(rule_set.rules.len(), 1);
/// ```
#[derive(Debug)]
pub struct RuleSetBuilder {
    rule_set: RuleSet,
    rules: Vec<RuleBuilder>,
}

impl RuleSetBuilder {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            rule_set: RuleSet::new(name),
            rules: Vec::new(),
        }
    }

    #[must_use]
    pub fn package(mut self, package: &str) -> Self {
        self.rule_set.package = package.to_owned();
        self
    }

    #[must_use]
    pub fn import(mut self, import: &str) -> Self {
        self.rule_set.imports.push(import.to_owned());
        self
    }

    #[must_use]
    pub fn global(mut self, name: &str, type_name: &str) -> Self {
        self.rule_set.set_global(name, type_name);
        self
    }

    #[must_use]
    pub fn table_name(mut self, name: &str) -> Self {
        self.rule_set.rule_table_name = Some(name.to_owned());
        self
    }

    /// Define a rule through a closure over a [`RuleBuilder`].
    #[must_use]
    pub fn rule(mut self, name: &str, f: impl FnOnce(RuleBuilder) -> RuleBuilder) -> Self {
        self.rules.push(f(RuleBuilder::new(name)));
        self
    }

    #[must_use]
    pub fn add_rule(mut self, rule: Rule) -> Self {
        self.rules.push(RuleBuilder::from(rule));
        self
    }

    #[must_use]
    pub fn add_rules(mut self, rules: impl IntoIterator<Item = Rule>) -> Self {
        self.rules.extend(rules.into_iter().map(RuleBuilder::from));
        self
    }

    /// # Errors
    ///
    /// Returns [`BuildError`] on a duplicate rule name or a rule that fails
    /// its own validation.
    pub fn build(self) -> Result<RuleSet, BuildError> {
        let mut rule_set = self.rule_set;
        let mut seen = HashSet::new();
        for builder in self.rules {
            let rule = builder.build()?;
            if !seen.insert(rule.name.clone()) {
                return Err(BuildError::DuplicateRule { name: rule.name });
            }
            rule_set.rules.push(rule);
        }
        Ok(rule_set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field;

    #[test]
    fn builder_collects_rules() {
        let rule_set = RuleSetBuilder::new("FraudRules")
            .package("com.example.fraud")
            .import("com.example.model.Transaction")
            .global("logger", "Logger")
            .rule("high_score", |r| {
                r.fact("Transaction", "tx")
                    .when(field("score").gt(0.8))
                    .then_decline("result")
            })
            .rule("gambling", |r| {
                r.fact("Transaction", "tx")
                    .when(field("category").eq("GAMBLING"))
                    .then_review("result")
                    .salience(10)
            })
            .build()
            .unwrap();

        assert_eq!(rule_set.package, "com.example.fraud");
        assert_eq!(rule_set.imports, vec!["com.example.model.Transaction"]);
        assert_eq!(rule_set.global("logger"), Some("Logger"));
        assert_eq!(rule_set.rules.len(), 2);
        assert_eq!(rule_set.rules[1].salience, Some(10));
        assert_eq!(
            rule_set.rules[1].actions[0].value,
            Some(Value::from("REVIEW"))
        );
    }

    #[test]
    fn builder_rejects_duplicate_names() {
        let result = RuleSetBuilder::new("s")
            .rule("dup", |r| r)
            .rule("dup", |r| r)
            .build();
        assert!(matches!(
            result,
            Err(BuildError::DuplicateRule { name }) if name == "dup"
        ));
    }

    #[test]
    fn condition_before_fact_is_an_error() {
        let result = RuleBuilder::new("orphan").when(field("x").eq(1_i64)).build();
        assert!(matches!(
            result,
            Err(BuildError::MissingFactPattern { rule }) if rule == "orphan"
        ));
    }

    #[test]
    fn conditions_attach_to_latest_fact() {
        let rule = RuleBuilder::new("two_facts")
            .fact("Transaction", "tx")
            .when(field("amount").gt(10_i64))
            .fact("Customer", "c")
            .when(field("tier").eq("GOLD"))
            .build()
            .unwrap();
        assert_eq!(rule.fact_patterns[0].conditions.len(), 1);
        assert_eq!(rule.fact_patterns[1].conditions[0].field_name(), "tier");
    }

    #[test]
    fn set_global_keeps_first_position() {
        let mut rule_set = RuleSet::new("s");
        rule_set.set_global("a", "A");
        rule_set.set_global("b", "B");
        rule_set.set_global("a", "Other");
        let names: Vec<&str> = rule_set.globals.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(rule_set.global("a"), Some("Other"));
    }

    #[test]
    fn rules_by_variant_group() {
        let rule_set = RuleSetBuilder::new("s")
            .rule("a", |r| r.variant("g1_0", "g1"))
            .rule("b", |r| r.variant("g2_0", "g2"))
            .rule("c", |r| r.variant("g1_1", "g1"))
            .build()
            .unwrap();
        let names: Vec<&str> = rule_set
            .rules_by_variant_group("g1")
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[test]
    fn display_summary() {
        let rule_set = RuleSet::new("Empty");
        assert_eq!(
            rule_set.to_string(),
            "RuleSet(Empty, package com.example.rules, 0 rules, 0 imports)"
        );
    }
}
