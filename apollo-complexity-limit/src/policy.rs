//! The cost model: base cost and cost factor of a single field.
//!
//! Overrides are resolved in a fixed order. A [`FieldCostHooks`](crate::FieldCostHooks) hook
//! registered for the field wins, then a `@cost(value:)` or `@costFactor(value:)` directive on the
//! field definition, then the default derived from the shape of the field's type.
use ahash::HashSet;
use ahash::HashSetExt;
use apollo_compiler::Name;
use apollo_compiler::ast::Type;
use apollo_compiler::name;

use crate::configuration::CostOptions;
use crate::error::ComplexityError;
use crate::schema::FieldPosition;
use crate::schema::SchemaTypeInfo;

pub(crate) const COST_DIRECTIVE_NAME: &str = "cost";
pub(crate) const COST_FACTOR_DIRECTIVE_NAME: &str = "costFactor";
pub(crate) const VALUE_ARGUMENT_NAME: &str = "value";

/// Names of the types describing the schema itself.
///
/// Lists of these types are multiplied by
/// [`CostOptions::introspection_list_factor`] instead of [`CostOptions::list_factor`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntrospectionTypes {
    names: HashSet<Name>,
}

impl IntrospectionTypes {
    pub fn new(names: impl IntoIterator<Item = Name>) -> Self {
        Self {
            names: names.into_iter().collect(),
        }
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.names.contains(type_name)
    }
}

impl Default for IntrospectionTypes {
    /// The built-in introspection types of the GraphQL specification.
    fn default() -> Self {
        let mut names = HashSet::new();
        names.extend([
            name!("__Schema"),
            name!("__Type"),
            name!("__TypeKind"),
            name!("__Field"),
            name!("__InputValue"),
            name!("__EnumValue"),
            name!("__Directive"),
            name!("__DirectiveLocation"),
        ]);
        Self { names }
    }
}

/// Maps a field's static metadata to its base cost and cost factor.
#[derive(Clone, Copy, Debug)]
pub struct CostModelPolicy<'a> {
    options: &'a CostOptions,
    introspection_types: &'a IntrospectionTypes,
}

impl<'a> CostModelPolicy<'a> {
    pub fn new(options: &'a CostOptions, introspection_types: &'a IntrospectionTypes) -> Self {
        Self {
            options,
            introspection_types,
        }
    }

    /// The additive cost charged for one instance of the field.
    pub fn base_cost<S: SchemaTypeInfo + ?Sized>(
        &self,
        position: &FieldPosition<'_>,
        schema: &S,
    ) -> Result<f64, ComplexityError> {
        let hook_cost = schema
            .field_hooks(position.parent_type_name(), &position.field().name)
            .and_then(|hooks| hooks.get_cost(position.field()));
        if let Some(cost) = hook_cost {
            return Ok(cost);
        }

        if let Some(cost) = directive_value(position, COST_DIRECTIVE_NAME)? {
            return Ok(cost);
        }

        Ok(self.type_cost(position.field_type(), schema))
    }

    /// The multiplier applied to the field and to everything selected below it.
    pub fn cost_factor<S: SchemaTypeInfo + ?Sized>(
        &self,
        position: &FieldPosition<'_>,
        schema: &S,
    ) -> Result<f64, ComplexityError> {
        let hook_factor = schema
            .field_hooks(position.parent_type_name(), &position.field().name)
            .and_then(|hooks| hooks.get_cost_factor(position.field()));
        if let Some(factor) = hook_factor {
            return Ok(factor);
        }

        if let Some(factor) = directive_value(position, COST_FACTOR_DIRECTIVE_NAME)? {
            return Ok(factor);
        }

        Ok(self.type_cost_factor(position.field_type()))
    }

    /// `object_cost` if the innermost named type is an object type, `scalar_cost` otherwise.
    pub fn type_cost<S: SchemaTypeInfo + ?Sized>(&self, ty: &Type, schema: &S) -> f64 {
        if schema.is_object_type(ty.inner_named_type()) {
            self.options.object_cost
        } else {
            self.options.scalar_cost
        }
    }

    /// Product of the list factors of every list wrapper in `ty`.
    pub fn type_cost_factor(&self, ty: &Type) -> f64 {
        match ty {
            Type::Named(_) | Type::NonNullNamed(_) => 1.0,
            Type::List(item) | Type::NonNullList(item) => {
                let list_factor = if self.is_introspection_list(item) {
                    self.options.introspection_list_factor
                } else {
                    self.options.list_factor
                };
                list_factor * self.type_cost_factor(item)
            }
        }
    }

    fn is_introspection_list(&self, item: &Type) -> bool {
        match item {
            Type::Named(name) | Type::NonNullNamed(name) => self.introspection_types.contains(name),
            Type::List(_) | Type::NonNullList(_) => false,
        }
    }
}

/// Reads the numeric `value` argument of `directive_name` on the field definition.
fn directive_value(
    position: &FieldPosition<'_>,
    directive_name: &str,
) -> Result<Option<f64>, ComplexityError> {
    let definition = position.definition();
    let Some(directive) = definition.directives.get(directive_name) else {
        return Ok(None);
    };

    let Some(value) = directive.specified_argument_by_name(VALUE_ARGUMENT_NAME) else {
        return Err(ComplexityError::MissingDirectiveArgument {
            directive: directive_name.to_string(),
            field: definition.name.to_string(),
            parent_type: position.parent_type_name().to_string(),
        });
    };

    value
        .to_f64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
        .map(Some)
        .ok_or_else(|| ComplexityError::InvalidDirectiveArgument {
            directive: directive_name.to_string(),
            field: definition.name.to_string(),
            parent_type: position.parent_type_name().to_string(),
            value: value.to_string(),
        })
}
