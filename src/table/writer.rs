use std::collections::HashMap;
use std::path::Path;

use super::parser::HEADER_ROWS;
use super::sheet::{Cell, CsvOptions, Sheet};
use super::template::ColumnKind;
use crate::{
    Action, ActionType, Condition, FactPattern, Operator, Rule, RuleSet, RulegridError, Value,
    Warning, WarningKind,
};

/// Fact type written for SET_FIELD columns whose binding no rule declares.
const FALLBACK_RESULT_TYPE: &str = "Result";

/// Switches for [`TableWriter`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TableWriterOptions {
    /// Write rules with `enabled == false`. Tables carry no enabled column,
    /// so such rules come back enabled.
    pub include_disabled: bool,
    /// `RuleTable` name used when the rule set has neither a table name nor
    /// a name.
    pub default_table_name: String,
}

impl Default for TableWriterOptions {
    fn default() -> Self {
        Self {
            include_disabled: false,
            default_table_name: "Rules".to_owned(),
        }
    }
}

impl TableWriterOptions {
    #[must_use]
    pub fn include_disabled(mut self, include: bool) -> Self {
        self.include_disabled = include;
        self
    }

    #[must_use]
    pub fn default_table_name(mut self, name: &str) -> Self {
        self.default_table_name = name.to_owned();
        self
    }
}

/// One inferred column: the four header cells of rows 3 to 6.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub kind: ColumnKind,
    pub fact_pattern: String,
    pub template: String,
    pub label: String,
}

/// A written table plus the rules it could not carry.
#[derive(Debug, Clone, PartialEq)]
pub struct WrittenTable {
    pub sheet: Sheet,
    /// One [`WarningKind::NoTableForm`] per rule left out of the sheet.
    pub warnings: Vec<Warning>,
}

/// What makes two conditions or actions share a column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ColumnKey {
    Simple {
        pattern: PatternKey,
        field: String,
        operator: Operator,
    },
    Range {
        pattern: PatternKey,
        field: String,
        min_inclusive: bool,
        max_inclusive: bool,
    },
    Bucket {
        pattern: PatternKey,
        field: String,
        modulo: u32,
    },
    NullCheck {
        pattern: PatternKey,
        field: String,
        is_null: bool,
    },
    SetField {
        binding: Option<String>,
        target: String,
    },
    Insert {
        fact_type: String,
        with_value: bool,
    },
    Retract {
        binding: Option<String>,
    },
    Update {
        binding: Option<String>,
    },
    Log {
        binding: Option<String>,
    },
    Custom {
        binding: Option<String>,
        label: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PatternKey {
    binding: Option<String>,
    fact_type: String,
}

impl PatternKey {
    fn of(pattern: &FactPattern) -> Self {
        Self {
            binding: pattern.binding.clone(),
            fact_type: pattern.fact_type.clone(),
        }
    }

    fn header(&self) -> String {
        match &self.binding {
            Some(binding) => format!("${binding} : {}", self.fact_type),
            None => self.fact_type.clone(),
        }
    }
}

impl ColumnKey {
    fn for_condition(pattern: &FactPattern, condition: &Condition) -> Self {
        let pattern = PatternKey::of(pattern);
        match condition {
            Condition::Simple(c) => ColumnKey::Simple {
                pattern,
                field: c.field.clone(),
                operator: c.operator,
            },
            Condition::Range(c) => ColumnKey::Range {
                pattern,
                field: c.field.clone(),
                min_inclusive: c.min_inclusive,
                max_inclusive: c.max_inclusive,
            },
            Condition::Bucket(c) => ColumnKey::Bucket {
                pattern,
                field: c.field.clone(),
                modulo: c.modulo,
            },
            Condition::NullCheck(c) => ColumnKey::NullCheck {
                pattern,
                field: c.field.clone(),
                is_null: c.is_null,
            },
        }
    }

    fn for_action(action: &Action) -> Self {
        let binding = action.binding.clone();
        match action.action_type {
            ActionType::SetField => ColumnKey::SetField {
                binding,
                target: action.target.clone(),
            },
            ActionType::InsertFact => ColumnKey::Insert {
                fact_type: action.target.clone(),
                with_value: action.value.is_some(),
            },
            ActionType::RetractFact => ColumnKey::Retract { binding },
            ActionType::UpdateFact => ColumnKey::Update { binding },
            ActionType::Log => ColumnKey::Log { binding },
            ActionType::Custom => ColumnKey::Custom {
                binding,
                label: action.target.clone(),
            },
        }
    }

    fn is_condition(&self) -> bool {
        matches!(
            self,
            ColumnKey::Simple { .. }
                | ColumnKey::Range { .. }
                | ColumnKey::Bucket { .. }
                | ColumnKey::NullCheck { .. }
        )
    }
}

/// A column under construction. `quoted` stays true while every value seen
/// for a simple or SET_FIELD column can be carried by a `"$1"` placeholder.
struct Column {
    key: ColumnKey,
    quoted: bool,
}

/// The inferred column layout of one rule set.
struct Layout {
    columns: Vec<Column>,
    index: HashMap<ColumnKey, usize>,
}

impl Layout {
    fn infer<'r>(rules: impl Iterator<Item = &'r Rule>) -> Self {
        let mut conditions = Vec::new();
        let mut actions = Vec::new();
        for rule in rules {
            for pattern in &rule.fact_patterns {
                for condition in &pattern.conditions {
                    let value = match condition {
                        Condition::Simple(c) => Some(&c.value),
                        _ => None,
                    };
                    conditions.push((ColumnKey::for_condition(pattern, condition), value));
                }
            }
            for action in &rule.actions {
                let value = match action.action_type {
                    ActionType::SetField => action.value.as_ref(),
                    _ => None,
                };
                actions.push((ColumnKey::for_action(action), value));
            }
        }

        let mut layout = Layout {
            columns: Vec::new(),
            index: HashMap::new(),
        };
        for (key, value) in conditions.into_iter().chain(actions) {
            let quotable = value.is_some_and(is_quotable);
            let quotable_key = matches!(
                &key,
                ColumnKey::Simple { operator, .. } if !matches!(operator, Operator::In | Operator::NotIn)
            ) || matches!(key, ColumnKey::SetField { .. });

            match layout.index.get(&key) {
                Some(&idx) => layout.columns[idx].quoted &= quotable,
                None => {
                    layout.index.insert(key.clone(), layout.columns.len());
                    layout.columns.push(Column {
                        key,
                        quoted: quotable_key && quotable,
                    });
                }
            }
        }
        layout
    }
}

/// Renders a [`RuleSet`] as a decision-table [`Sheet`].
///
/// The column layout is shared by every row, so it is inferred from all
/// rules first: one CONDITION column per distinct condition shape, then one
/// ACTION column per distinct action shape, each in order of first
/// appearance. A rule with two conditions of the same shape on one pattern
/// only has the first written. A rule that fills no cell at all is left out
/// and reported, since a blank row reads back as no rule.
#[derive(Debug, Clone, Default)]
pub struct TableWriter {
    options: TableWriterOptions,
}

impl TableWriter {
    #[must_use]
    pub fn new(options: TableWriterOptions) -> Self {
        Self { options }
    }

    #[must_use]
    pub fn options(&self) -> &TableWriterOptions {
        &self.options
    }

    fn rules<'r>(&self, rule_set: &'r RuleSet) -> impl Iterator<Item = &'r Rule> + 'r {
        let include_disabled = self.options.include_disabled;
        rule_set
            .rules
            .iter()
            .filter(move |rule| rule.enabled || include_disabled)
    }

    /// The header cells of every column the rule set needs, in sheet order.
    #[must_use]
    pub fn columns(&self, rule_set: &RuleSet) -> Vec<ColumnSpec> {
        let layout = Layout::infer(self.rules(rule_set));
        let fact_types = binding_types(self.rules(rule_set));
        layout
            .columns
            .iter()
            .map(|column| column_spec(column, &fact_types))
            .collect()
    }

    /// Lay out `rule_set`, dropping the warnings of [`TableWriter::write_table`].
    #[must_use]
    pub fn write(&self, rule_set: &RuleSet) -> Sheet {
        self.write_table(rule_set).sheet
    }

    #[must_use]
    pub fn write_table(&self, rule_set: &RuleSet) -> WrittenTable {
        let layout = Layout::infer(self.rules(rule_set));
        let fact_types = binding_types(self.rules(rule_set));
        let mut sheet = Sheet::new(&rule_set.name);

        sheet.set(1, 1, "RuleSet");
        sheet.set(1, 2, rule_set.package.as_str());
        if !rule_set.imports.is_empty() {
            sheet.set(1, 3, "Import");
            for (idx, import) in rule_set.imports.iter().enumerate() {
                sheet.set(1, 4 + idx, import.as_str());
            }
        }
        if !rule_set.globals.is_empty() {
            log::debug!(
                "globals of '{}' have no decision table form and are not written",
                rule_set.name
            );
        }

        let table_name = rule_set
            .rule_table_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .or_else(|| Some(rule_set.name.as_str()).filter(|n| !n.is_empty()))
            .unwrap_or(self.options.default_table_name.as_str());
        sheet.set(2, 1, format!("RuleTable {table_name}"));

        for (idx, column) in layout.columns.iter().enumerate() {
            let spec = column_spec(column, &fact_types);
            let col = idx + 1;
            sheet.set(3, col, spec.kind.as_str());
            sheet.set(4, col, spec.fact_pattern);
            sheet.set(5, col, spec.template);
            sheet.set(6, col, spec.label);
        }
        if layout.columns.is_empty() {
            sheet.set(HEADER_ROWS, 1, Cell::Empty);
        }

        let mut written = 0;
        let mut warnings = Vec::new();
        for rule in self.rules(rule_set) {
            let row = HEADER_ROWS + 1 + written;
            if write_rule_row(&mut sheet, row, rule, &layout) {
                written += 1;
            } else {
                warnings.push(
                    Warning::new(WarningKind::NoTableForm, Some(&rule.name), &rule.render())
                        .logged(),
                );
            }
        }

        log::debug!(
            "wrote decision table '{table_name}': {} columns, {written} rules",
            layout.columns.len()
        );
        WrittenTable { sheet, warnings }
    }

    /// Write the table as CSV to `path`, atomically.
    ///
    /// # Errors
    ///
    /// Returns [`RulegridError`] on encoding or I/O failure.
    pub fn write_csv_file(
        &self,
        rule_set: &RuleSet,
        path: impl AsRef<Path>,
    ) -> Result<(), RulegridError> {
        self.write(rule_set)
            .write_csv_path(path, &CsvOptions::default())
    }

    /// Write the table as a one-worksheet `.xlsx` workbook to `path`, atomically.
    ///
    /// # Errors
    ///
    /// Returns [`RulegridError`] on encoding or I/O failure.
    pub fn write_xlsx_file(
        &self,
        rule_set: &RuleSet,
        path: impl AsRef<Path>,
    ) -> Result<(), RulegridError> {
        self.write(rule_set).write_xlsx_path(path)
    }
}

/// First fact type declared for each binding across the rules.
fn binding_types<'r>(rules: impl Iterator<Item = &'r Rule>) -> HashMap<&'r str, &'r str> {
    let mut types = HashMap::new();
    for rule in rules {
        for pattern in &rule.fact_patterns {
            if let Some(binding) = &pattern.binding {
                types
                    .entry(binding.as_str())
                    .or_insert(pattern.fact_type.as_str());
            }
        }
    }
    types
}

fn column_spec(column: &Column, fact_types: &HashMap<&str, &str>) -> ColumnSpec {
    let slot = if column.quoted { "\"$1\"" } else { "$1" };
    let (fact_pattern, template, label) = match &column.key {
        ColumnKey::Simple {
            pattern,
            field,
            operator,
        } => {
            let template = match operator {
                Operator::In | Operator::NotIn => format!("{field} {operator} ($1)"),
                _ => format!("{field} {operator} {slot}"),
            };
            (pattern.header(), template, humanize(field))
        }
        ColumnKey::Range {
            pattern,
            field,
            min_inclusive,
            max_inclusive,
        } => {
            let lower = if *min_inclusive { Operator::Ge } else { Operator::Gt };
            let upper = if *max_inclusive { Operator::Le } else { Operator::Lt };
            (
                pattern.header(),
                format!("{field} {lower} $1, {field} {upper} $2"),
                format!("{} Range", humanize(field)),
            )
        }
        ColumnKey::Bucket {
            pattern,
            field,
            modulo,
        } => (
            pattern.header(),
            format!("({field} % {modulo}) in ($1)"),
            format!("{} Bucket", humanize(field)),
        ),
        ColumnKey::NullCheck {
            pattern,
            field,
            is_null,
        } => {
            let (op, suffix) = if *is_null {
                ("==", "Is Null")
            } else {
                ("!=", "Not Null")
            };
            (
                pattern.header(),
                format!("{field} {op} null"),
                format!("{} {suffix}", humanize(field)),
            )
        }
        ColumnKey::SetField { binding, target } => {
            let header = binding.as_deref().map_or_else(String::new, |b| {
                let fact_type = fact_types.get(b).copied().unwrap_or(FALLBACK_RESULT_TYPE);
                format!("${b} : {fact_type}")
            });
            (header, format!("{target} = {slot}"), humanize(target))
        }
        ColumnKey::Insert {
            fact_type,
            with_value,
        } => {
            let arg = if *with_value { "$1" } else { "" };
            (
                String::new(),
                format!("insert(new {fact_type}({arg}))"),
                format!("Insert {fact_type}"),
            )
        }
        ColumnKey::Retract { .. } => (String::new(), "retract($1)".to_owned(), "Retract".to_owned()),
        ColumnKey::Update { .. } => (String::new(), "update($1)".to_owned(), "Update".to_owned()),
        ColumnKey::Log { .. } => (
            String::new(),
            "System.out.println(\"$1\")".to_owned(),
            "Log".to_owned(),
        ),
        ColumnKey::Custom { binding, label } => {
            let header = binding.as_deref().map_or_else(String::new, |b| {
                let fact_type = fact_types.get(b).copied().unwrap_or(FALLBACK_RESULT_TYPE);
                format!("${b} : {fact_type}")
            });
            (header, "$1".to_owned(), label.clone())
        }
    };
    let kind = if column.key.is_condition() {
        ColumnKind::Condition
    } else {
        ColumnKind::Action
    };
    ColumnSpec {
        kind,
        fact_pattern,
        template,
        label,
    }
}

/// Fill `row` with the cells of `rule`. False when nothing was written.
fn write_rule_row(sheet: &mut Sheet, row: usize, rule: &Rule, layout: &Layout) -> bool {
    let mut placed = false;
    let mut place = |key: ColumnKey, cell: Option<Cell>, sheet: &mut Sheet| {
        let Some(&idx) = layout.index.get(&key) else {
            return;
        };
        let Some(cell) = cell.filter(|c| !c.is_blank()) else {
            return;
        };
        let col = idx + 1;
        if sheet.get(row, col).is_blank() {
            sheet.set(row, col, cell);
            placed = true;
        } else {
            log::warn!(
                "rule '{}' has more than one value for column {col}; keeping the first",
                rule.name
            );
        }
    };

    for pattern in &rule.fact_patterns {
        for condition in &pattern.conditions {
            let key = ColumnKey::for_condition(pattern, condition);
            let quoted = layout.index.get(&key).is_some_and(|&i| layout.columns[i].quoted);
            place(key, condition_cell(condition, quoted), sheet);
        }
    }
    for action in &rule.actions {
        let key = ColumnKey::for_action(action);
        let quoted = layout.index.get(&key).is_some_and(|&i| layout.columns[i].quoted);
        place(key, action_cell(action, quoted), sheet);
    }
    placed
}

fn condition_cell(condition: &Condition, quoted: bool) -> Option<Cell> {
    match condition {
        Condition::Simple(c) => match c.operator {
            Operator::In | Operator::NotIn => Some(Cell::from(list_text(&c.value))),
            _ => Some(value_cell(&c.value, quoted)),
        },
        Condition::Range(c) => {
            let side = |v: &Option<Value>| v.as_ref().map(cell_literal).unwrap_or_default();
            Some(Cell::from(format!(
                "{}, {}",
                side(&c.min_value),
                side(&c.max_value)
            )))
        }
        Condition::Bucket(c) if c.bucket_values.is_empty() => {
            log::warn!("bucket on '{}' has no values; leaving its cell empty", c.field);
            None
        }
        Condition::Bucket(c) => {
            let values: Vec<String> = c.bucket_values.iter().map(u32::to_string).collect();
            Some(Cell::from(values.join(", ")))
        }
        Condition::NullCheck(_) => Some(Cell::from("X")),
    }
}

fn action_cell(action: &Action, quoted: bool) -> Option<Cell> {
    match action.action_type {
        ActionType::SetField => Some(match &action.value {
            Some(value) => value_cell(value, quoted),
            None => Cell::from("null"),
        }),
        ActionType::InsertFact => Some(match &action.value {
            Some(value) => value_cell(value, false),
            None => Cell::from("X"),
        }),
        ActionType::RetractFact | ActionType::UpdateFact => {
            let subject = action.binding.as_deref().unwrap_or(&action.target);
            (!subject.is_empty()).then(|| Cell::from(format!("${subject}")))
        }
        ActionType::Log => Some(Cell::from(action.target.as_str())),
        ActionType::Custom => action
            .value
            .as_ref()
            .map(|value| Cell::from(value.to_plain())),
    }
}

/// A value as a data cell. Numbers and booleans stay native; strings are
/// written raw under a quoted placeholder and as literals otherwise.
fn value_cell(value: &Value, quoted: bool) -> Cell {
    match value {
        Value::Bool(v) => Cell::Bool(*v),
        Value::Int(v) => Cell::Int(*v),
        Value::Float(v) => Cell::Float(*v),
        Value::String(s) if quoted => Cell::from(s.as_str()),
        other => Cell::from(cell_literal(other)),
    }
}

fn list_text(value: &Value) -> String {
    match value {
        Value::List(items) => items
            .iter()
            .map(cell_literal)
            .collect::<Vec<_>>()
            .join(", "),
        other => cell_literal(other),
    }
}

/// Text that types back to `value`: strings stay bare unless bare text
/// would read as something else.
fn cell_literal(value: &Value) -> String {
    match value {
        Value::String(s) if is_bare_string(s) => s.clone(),
        other => other.to_literal(),
    }
}

fn is_bare_string(s: &str) -> bool {
    !s.is_empty()
        && s.trim() == s
        && !s.contains(',')
        && Value::parse_cell(s) == Value::String(s.to_owned())
}

fn is_quotable(value: &Value) -> bool {
    matches!(value, Value::String(s) if !s.is_empty() && s.trim() == s)
}

/// `riskLevel` / `risk_level` → `Risk Level`.
pub(crate) fn humanize(name: &str) -> String {
    let mut spaced = String::with_capacity(name.len() + 4);
    let mut prev: Option<char> = None;
    for ch in name.chars() {
        if ch == '_' {
            spaced.push(' ');
        } else {
            if ch.is_uppercase() && prev.is_some_and(char::is_lowercase) {
                spaced.push(' ');
            }
            spaced.push(ch);
        }
        prev = Some(ch);
    }

    let mut out = String::with_capacity(spaced.len());
    let mut boundary = true;
    for ch in spaced.chars() {
        if ch.is_alphabetic() {
            if boundary {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            boundary = false;
        } else {
            out.push(ch);
            boundary = true;
        }
    }
    out
}
