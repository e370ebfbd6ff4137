use std::collections::BTreeMap;

use super::action::Action;
use super::fact::FactPattern;
use super::value::Value;

/// A single rule: one row of a decision table or one `rule` block of a text
/// rule file. The name identifies the rule within its [`RuleSet`](super::RuleSet).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rule {
    pub name: String,
    pub fact_patterns: Vec<FactPattern>,
    pub actions: Vec<Action>,
    /// Advisory priority; higher values are meant to fire first. Not enforced.
    pub salience: Option<i32>,
    pub enabled: bool,
    pub description: Option<String>,
    pub metadata: BTreeMap<String, Value>,
    pub variant_id: Option<String>,
    pub variant_group: Option<String>,
}

impl Rule {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            fact_patterns: Vec::new(),
            actions: Vec::new(),
            salience: None,
            enabled: true,
            description: None,
            metadata: BTreeMap::new(),
            variant_id: None,
            variant_group: None,
        }
    }

    /// All conditions across every fact pattern, in declaration order.
    pub fn conditions(&self) -> impl Iterator<Item = &super::Condition> {
        self.fact_patterns.iter().flat_map(|p| p.conditions.iter())
    }

    /// Render this rule as a text rule block using the default layout.
    #[must_use]
    pub fn render(&self) -> String {
        crate::text::TextWriter::default().render_rule(self)
    }
}
