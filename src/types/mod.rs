pub(crate) mod action;
mod condition;
mod error;
mod fact;
mod rule;
mod ruleset;
pub(crate) mod value;
mod warning;

pub use action::{Action, ActionType};
pub use condition::{
    field, BucketCondition, Condition, FieldExpr, NullCheckCondition, Operator, RangeCondition,
    SimpleCondition,
};
pub use error::BuildError;
pub use fact::FactPattern;
pub use rule::Rule;
pub use ruleset::{Global, RuleBuilder, RuleSet, RuleSetBuilder, DEFAULT_PACKAGE};
pub use value::Value;
pub use warning::{Warning, WarningKind};
