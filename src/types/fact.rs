use std::fmt;

use super::condition::Condition;

/// Binds a fact of `fact_type` to `binding` and requires every condition to hold.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FactPattern {
    pub fact_type: String,
    pub binding: Option<String>,
    pub conditions: Vec<Condition>,
}

impl FactPattern {
    #[must_use]
    pub fn new(fact_type: &str) -> Self {
        Self {
            fact_type: fact_type.to_owned(),
            binding: None,
            conditions: Vec::new(),
        }
    }

    /// Set the variable name, given without the leading `$`.
    #[must_use]
    pub fn bind(mut self, binding: &str) -> Self {
        self.binding = Some(binding.to_owned());
        self
    }

    #[must_use]
    pub fn with(mut self, condition: impl Into<Condition>) -> Self {
        self.conditions.push(condition.into());
        self
    }

    /// `$binding : FactType(c1, c2, ...)`
    #[must_use]
    pub fn render(&self) -> String {
        let constraints: Vec<String> = self.conditions.iter().map(Condition::render).collect();
        match &self.binding {
            Some(binding) => format!("${binding} : {}({})", self.fact_type, constraints.join(", ")),
            None => format!("{}({})", self.fact_type, constraints.join(", ")),
        }
    }
}

impl fmt::Display for FactPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
