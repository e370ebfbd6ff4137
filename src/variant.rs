//! Derive experiment variants from a base rule: parameter sweeps over one
//! field's threshold, and traffic splits by [`BucketCondition`].
//!
//! Every function works on owned clones; the base rule is never modified.

use thiserror::Error;

use crate::{BucketCondition, Condition, Rule, Value};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VariantError {
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },
}

/// A parameter sweep: one variant of `base_rule` per entry in `values`.
///
/// `name_template` may use `{base_name}`, `{index}` (0-based) and `{value}`.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantConfig {
    pub base_rule: Rule,
    pub variant_group: String,
    /// Field whose condition value is replaced.
    pub parameter_name: String,
    pub values: Vec<Value>,
    pub name_template: String,
}

impl VariantConfig {
    pub const DEFAULT_NAME_TEMPLATE: &'static str = "{base_name}_variant_{index}";

    #[must_use]
    pub fn new<V: Into<Value>>(
        base_rule: Rule,
        variant_group: &str,
        parameter_name: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self {
            base_rule,
            variant_group: variant_group.to_owned(),
            parameter_name: parameter_name.to_owned(),
            values: values.into_iter().map(Into::into).collect(),
            name_template: Self::DEFAULT_NAME_TEMPLATE.to_owned(),
        }
    }

    #[must_use]
    pub fn name_template(mut self, template: &str) -> Self {
        self.name_template = template.to_owned();
        self
    }

    fn variant_name(&self, index: usize, value: &Value) -> String {
        self.name_template
            .replace("{base_name}", &self.base_rule.name)
            .replace("{index}", &index.to_string())
            .replace("{value}", &value.to_plain())
    }
}

/// One rule per sweep value, tagged `variant_id = "<group>_<index>"` and
/// `variant_group = <group>`.
///
/// The first simple condition on `parameter_name` gets the new value; a
/// range condition on that field gets it as its lower bound. A rule with no
/// such condition is still emitted, unchanged apart from name and tags.
#[must_use]
pub fn generate_variants(config: &VariantConfig) -> Vec<Rule> {
    let variants: Vec<Rule> = config
        .values
        .iter()
        .enumerate()
        .map(|(idx, value)| {
            let mut variant = config.base_rule.clone();
            variant.name = config.variant_name(idx, value);
            variant.variant_id = Some(format!("{}_{idx}", config.variant_group));
            variant.variant_group = Some(config.variant_group.clone());
            if !replace_parameter(&mut variant, &config.parameter_name, value) {
                log::warn!(
                    "rule '{}' has no condition on '{}' to vary",
                    config.base_rule.name,
                    config.parameter_name
                );
            }
            variant
        })
        .collect();
    log::debug!(
        "generated {} variants of '{}' in group '{}'",
        variants.len(),
        config.base_rule.name,
        config.variant_group
    );
    variants
}

/// Sweep `field` over `thresholds`. Variants are named
/// `<base>_<field>_<value>`; the group defaults to `<field>_variants`.
#[must_use]
pub fn generate_threshold_variants<V: Into<Value>>(
    base_rule: &Rule,
    field: &str,
    thresholds: impl IntoIterator<Item = V>,
    variant_group: Option<&str>,
) -> Vec<Rule> {
    let group = variant_group.map_or_else(|| format!("{field}_variants"), str::to_owned);
    let config = VariantConfig::new(base_rule.clone(), &group, field, thresholds)
        .name_template(&format!("{{base_name}}_{field}_{{value}}"));
    generate_variants(&config)
}

fn replace_parameter(rule: &mut Rule, field: &str, value: &Value) -> bool {
    let target = rule
        .fact_patterns
        .iter_mut()
        .flat_map(|p| p.conditions.iter_mut())
        .find(|c| c.field_name() == field && matches!(c, Condition::Simple(_) | Condition::Range(_)));
    match target {
        Some(Condition::Simple(c)) => {
            c.value = value.clone();
            true
        }
        Some(Condition::Range(c)) => {
            c.min_value = Some(value.clone());
            true
        }
        _ => false,
    }
}

/// `(field % modulo) in (bucket_values)`.
///
/// # Errors
///
/// Returns [`VariantError::InvalidArgument`] if `bucket_values` is empty,
/// `modulo` is zero, or a value is not below `modulo`.
pub fn create_bucket_condition(
    field: &str,
    bucket_values: impl IntoIterator<Item = u32>,
    modulo: u32,
) -> Result<BucketCondition, VariantError> {
    if modulo == 0 {
        return Err(VariantError::InvalidArgument {
            reason: "modulo must be positive".to_owned(),
        });
    }
    let bucket = BucketCondition::new(field, bucket_values, modulo);
    if bucket.bucket_values.is_empty() {
        return Err(VariantError::InvalidArgument {
            reason: format!("bucket on '{field}' needs at least one value"),
        });
    }
    if let Some(&value) = bucket.bucket_values.iter().find(|&&v| v >= modulo) {
        return Err(VariantError::InvalidArgument {
            reason: format!("bucket value {value} is not below modulo {modulo}"),
        });
    }
    Ok(bucket)
}

/// A copy of `rule` with a bucket condition appended to the fact pattern at
/// `pattern_index`. An out-of-range index leaves the copy unchanged.
///
/// # Errors
///
/// Returns [`VariantError::InvalidArgument`] when
/// [`create_bucket_condition`] rejects the bucket.
pub fn add_bucket_to_rule(
    rule: &Rule,
    field: &str,
    bucket_values: impl IntoIterator<Item = u32>,
    modulo: u32,
    pattern_index: usize,
) -> Result<Rule, VariantError> {
    let bucket = create_bucket_condition(field, bucket_values, modulo)?;
    let mut bucketed = rule.clone();
    match bucketed.fact_patterns.get_mut(pattern_index) {
        Some(pattern) => pattern.conditions.push(Condition::from(bucket)),
        None => log::warn!(
            "rule '{}' has no fact pattern {pattern_index}; bucket on '{field}' not added",
            rule.name
        ),
    }
    Ok(bucketed)
}

/// Split the `modulo` space of `field` into `num_buckets` equal contiguous
/// ranges, one variant per range. Buckets go on the first fact pattern.
///
/// Variant `i` is named `<name>_bucket_<i>` with id `bucket_<i>`; the group
/// defaults to `<name>_buckets`.
///
/// # Errors
///
/// Returns [`VariantError::InvalidArgument`] if `num_buckets` or `modulo` is
/// zero, or `modulo` is not a multiple of `num_buckets`.
pub fn generate_bucketed_variants(
    rule: &Rule,
    field: &str,
    num_buckets: u32,
    modulo: u32,
    variant_group: Option<&str>,
) -> Result<Vec<Rule>, VariantError> {
    if num_buckets == 0 {
        return Err(VariantError::InvalidArgument {
            reason: "num_buckets must be positive".to_owned(),
        });
    }
    if modulo == 0 {
        return Err(VariantError::InvalidArgument {
            reason: "modulo must be positive".to_owned(),
        });
    }
    if modulo % num_buckets != 0 {
        return Err(VariantError::InvalidArgument {
            reason: format!("modulo ({modulo}) must be divisible by num_buckets ({num_buckets})"),
        });
    }

    let bucket_size = modulo / num_buckets;
    let group = variant_group.map_or_else(|| format!("{}_buckets", rule.name), str::to_owned);
    (0..num_buckets)
        .map(|idx| {
            let start = idx * bucket_size;
            let mut variant =
                add_bucket_to_rule(rule, field, start..start + bucket_size, modulo, 0)?;
            variant.name = format!("{}_bucket_{idx}", rule.name);
            variant.variant_id = Some(format!("bucket_{idx}"));
            variant.variant_group = Some(group.clone());
            Ok(variant)
        })
        .collect()
}
