//! Convert business rules between decision tables and a text rule language
//! through one shared representation, [`RuleSet`].
//!
//! ```
//! use rulegrid::{field, RuleSetBuilder};
//!
//! let rule_set = RuleSetBuilder::new("Fraud")
//!     .package("com.example.fraud")
//!     .rule("HighScore", |r| {
//!         r.fact("Transaction", "tx")
//!             .when(field("score").gte(0.9))
//!             .fact("Result", "result")
//!             .then_decline("result")
//!     })
//!     .build()
//!     .unwrap();
//!
//! let text = rule_set.render();
//! let parsed = rulegrid::text::parse(&text).unwrap();
//! assert_eq!(parsed.rule_set.rules[0].name, "HighScore");
//!
//! let sheet = rule_set.to_sheet();
//! let table = rulegrid::table::parse(&sheet).unwrap();
//! assert_eq!(table.rule_set.package, "com.example.fraud");
//! ```

mod error;
mod fs;
mod syntax;
pub mod table;
pub mod text;
mod types;
pub mod variant;

pub use error::RulegridError;
pub use types::{
    field, Action, ActionType, BucketCondition, BuildError, Condition, FactPattern, FieldExpr,
    Global, NullCheckCondition, Operator, RangeCondition, Rule, RuleBuilder, RuleSet,
    RuleSetBuilder, SimpleCondition, Value, Warning, WarningKind, DEFAULT_PACKAGE,
};
