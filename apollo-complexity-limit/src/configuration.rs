//! Configuration of the cost model and of the complexity limit.
use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;

/// Weights of the cost model.
///
/// A field costs `object_cost` if its innermost type is an object type and `scalar_cost`
/// otherwise. Each list wrapper around a field's type multiplies the cost of the field and of
/// everything selected below it by `list_factor`, or by `introspection_list_factor` when the
/// list holds one of the schema introspection types.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct CostOptions {
    /// Cost of selecting a scalar, enum, interface or union field.
    pub scalar_cost: f64,
    /// Cost of selecting an object field.
    pub object_cost: f64,
    /// Multiplier applied below each list type.
    pub list_factor: f64,
    /// Multiplier applied below lists of introspection types, so that tooling queries on
    /// the schema do not have huge costs.
    pub introspection_list_factor: f64,
}

impl Default for CostOptions {
    fn default() -> Self {
        Self {
            scalar_cost: 1.0,
            object_cost: 0.0,
            list_factor: 10.0,
            introspection_list_factor: 2.0,
        }
    }
}

/// Configuration of [`ComplexityLimit`](crate::ComplexityLimit).
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ComplexityLimitConfig {
    /// Documents whose cost is strictly greater than this are rejected.
    pub max_cost: f64,

    /// Weights of the cost model.
    #[serde(default)]
    pub cost: CostOptions,

    /// Do not charge top-level `__schema` and `__type` selections at all.
    #[serde(default = "default_skip_introspection")]
    pub skip_introspection: bool,

    /// Log documents exceeding the limit instead of rejecting them.
    #[serde(default)]
    pub warn_only: bool,
}

impl ComplexityLimitConfig {
    /// Default cost model and introspection handling with the given maximum.
    pub fn new(max_cost: f64) -> Self {
        Self {
            max_cost,
            cost: CostOptions::default(),
            skip_introspection: default_skip_introspection(),
            warn_only: false,
        }
    }
}

fn default_skip_introspection() -> bool {
    true
}
