use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("duplicate rule name '{name}'")]
    DuplicateRule { name: String },

    #[error("condition added to rule '{rule}' before any fact pattern")]
    MissingFactPattern { rule: String },
}
