use std::fmt;

/// Why a fragment of the input, or a rule on output, was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// A constraint inside a fact pattern did not match `<field> <op> <value>`.
    UnrecognizedConstraint,
    /// Text in a `when` block that is not a `$binding : Type(...)` pattern.
    UnrecognizedPattern,
    /// A `then` statement that matches none of the known action shapes.
    UnrecognizedAction,
    /// A condition column whose template could not be interpreted.
    UnrecognizedTemplate,
    /// A cell whose value does not fit its column's template.
    UnparseableCell,
    /// A rule block lacking its `when`, `then` or `end` keyword. The rule is
    /// kept with empty patterns and actions.
    MalformedRule,
    /// A `salience` or `enabled` attribute whose value is unusable.
    InvalidAttribute,
    /// A rule that would produce an all-blank data row, which a table
    /// cannot carry.
    NoTableForm,
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            WarningKind::UnrecognizedConstraint => "unrecognized constraint",
            WarningKind::UnrecognizedPattern => "unrecognized fact pattern",
            WarningKind::UnrecognizedAction => "unrecognized action",
            WarningKind::UnrecognizedTemplate => "unrecognized template",
            WarningKind::UnparseableCell => "unparseable cell",
            WarningKind::MalformedRule => "malformed rule",
            WarningKind::InvalidAttribute => "invalid rule attribute",
            WarningKind::NoTableForm => "rule has no table form",
        };
        f.write_str(text)
    }
}

/// A non-fatal diagnostic. Lenient parsing and table writing drop the
/// fragment; the warning records what was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub kind: WarningKind,
    /// Name of the rule being built, when known.
    pub rule: Option<String>,
    pub fragment: String,
    /// 1-indexed `(row, column)` for table cells.
    pub cell: Option<(usize, usize)>,
}

impl Warning {
    pub(crate) fn new(kind: WarningKind, rule: Option<&str>, fragment: &str) -> Self {
        Self {
            kind,
            rule: rule.map(str::to_owned),
            fragment: fragment.trim().to_owned(),
            cell: None,
        }
    }

    pub(crate) fn at(mut self, row: usize, column: usize) -> Self {
        self.cell = Some((row, column));
        self
    }

    /// Emit through the `log` facade and return self.
    pub(crate) fn logged(self) -> Self {
        log::warn!("{self}");
        self
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(rule) = &self.rule {
            write!(f, " in rule '{rule}'")?;
        }
        if let Some((row, column)) = self.cell {
            write!(f, " at row {row}, column {column}")?;
        }
        write!(f, ": {}", self.fragment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_with_rule() {
        let w = Warning::new(WarningKind::UnrecognizedConstraint, Some("r1"), " foo(bar) ");
        assert_eq!(w.to_string(), "unrecognized constraint in rule 'r1': foo(bar)");
    }

    #[test]
    fn display_with_cell() {
        let w = Warning::new(WarningKind::UnparseableCell, Some("T_1"), "abc").at(7, 2);
        assert_eq!(
            w.to_string(),
            "unparseable cell in rule 'T_1' at row 7, column 2: abc"
        );
    }
}
