use std::fmt;

use super::value::{escape, Value};

/// What an [`Action`] does when its rule fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ActionType {
    SetField,
    InsertFact,
    RetractFact,
    UpdateFact,
    Log,
    Custom,
}

impl ActionType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ActionType::SetField => "set_field",
            ActionType::InsertFact => "insert",
            ActionType::RetractFact => "retract",
            ActionType::UpdateFact => "update",
            ActionType::Log => "log",
            ActionType::Custom => "custom",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A consequence executed when a rule fires.
///
/// `target` is a field name for [`ActionType::SetField`], a fact type for
/// [`ActionType::InsertFact`], a message for [`ActionType::Log`] and a column
/// label for [`ActionType::Custom`]. Retract and update only use `binding`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Action {
    pub action_type: ActionType,
    pub target: String,
    pub value: Option<Value>,
    pub binding: Option<String>,
}

impl Action {
    /// `$binding.setTarget(value);`
    #[must_use]
    pub fn set_field(target: &str, value: impl Into<Value>, binding: &str) -> Self {
        Self {
            action_type: ActionType::SetField,
            target: target.to_owned(),
            value: Some(value.into()),
            binding: Some(binding.to_owned()),
        }
    }

    /// `insert(new FactType(value));`
    #[must_use]
    pub fn insert(fact_type: &str, value: Option<Value>) -> Self {
        Self {
            action_type: ActionType::InsertFact,
            target: fact_type.to_owned(),
            value,
            binding: None,
        }
    }

    #[must_use]
    pub fn retract(binding: &str) -> Self {
        Self::on_binding(ActionType::RetractFact, binding)
    }

    #[must_use]
    pub fn update(binding: &str) -> Self {
        Self::on_binding(ActionType::UpdateFact, binding)
    }

    #[must_use]
    pub fn log(message: &str) -> Self {
        Self {
            action_type: ActionType::Log,
            target: message.to_owned(),
            value: None,
            binding: None,
        }
    }

    /// Free-form consequence; `value` is emitted verbatim.
    #[must_use]
    pub fn custom(label: &str, value: impl Into<Value>) -> Self {
        Self {
            action_type: ActionType::Custom,
            target: label.to_owned(),
            value: Some(value.into()),
            binding: None,
        }
    }

    fn on_binding(action_type: ActionType, binding: &str) -> Self {
        Self {
            action_type,
            target: String::new(),
            value: None,
            binding: Some(binding.to_owned()),
        }
    }

    #[must_use]
    pub fn render(&self) -> String {
        let value = || {
            self.value
                .as_ref()
                .map_or_else(|| "null".to_owned(), Value::to_literal)
        };
        match self.action_type {
            ActionType::SetField => match &self.binding {
                Some(binding) => {
                    format!("${binding}.set{}({});", capitalize(&self.target), value())
                }
                None => format!("{} = {};", self.target, value()),
            },
            ActionType::InsertFact => {
                let arg = self.value.as_ref().map(Value::to_literal).unwrap_or_default();
                format!("insert(new {}({arg}));", self.target)
            }
            ActionType::RetractFact => format!("retract(${});", self.subject()),
            ActionType::UpdateFact => format!("update(${});", self.subject()),
            ActionType::Log => format!("System.out.println(\"{}\");", escape(&self.target)),
            ActionType::Custom => self.value.as_ref().map(Value::to_plain).unwrap_or_default(),
        }
    }

    fn subject(&self) -> &str {
        self.binding.as_deref().unwrap_or(&self.target)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
