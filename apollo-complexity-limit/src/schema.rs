//! Schema knowledge consulted by the cost model.
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use ahash::HashMap;
use ahash::HashMapExt;
use apollo_compiler::Name;
use apollo_compiler::Schema;
use apollo_compiler::ast::NamedType;
use apollo_compiler::ast::Type;
use apollo_compiler::executable::Field;
use apollo_compiler::schema::ExtendedType;
use apollo_compiler::schema::FieldDefinition;
use apollo_compiler::validation::Valid;

use crate::error::ComplexityError;

/// Computes a cost or cost factor for one selected field.
pub type CostHook = Arc<dyn Fn(&Field) -> f64 + Send + Sync>;

/// Schema questions asked while a document is scored.
pub trait SchemaTypeInfo {
    /// Returns `true` if `type_name` names an object type.
    fn is_object_type(&self, type_name: &str) -> bool;

    /// Cost hooks attached to `parent_type.field_name`, if any.
    fn field_hooks(&self, _parent_type: &str, _field_name: &str) -> Option<&FieldCostHooks> {
        None
    }
}

impl SchemaTypeInfo for Schema {
    fn is_object_type(&self, type_name: &str) -> bool {
        matches!(self.types.get(type_name), Some(ExtendedType::Object(_)))
    }
}

impl<T: SchemaTypeInfo> SchemaTypeInfo for Valid<T> {
    fn is_object_type(&self, type_name: &str) -> bool {
        (**self).is_object_type(type_name)
    }

    fn field_hooks(&self, parent_type: &str, field_name: &str) -> Option<&FieldCostHooks> {
        (**self).field_hooks(parent_type, field_name)
    }
}

/// The field currently being scored, as seen from the selection set it appears in.
#[derive(Clone, Copy, Debug)]
pub struct FieldPosition<'a> {
    parent_type: &'a NamedType,
    field: &'a Field,
}

impl<'a> FieldPosition<'a> {
    pub fn new(parent_type: &'a NamedType, field: &'a Field) -> Self {
        Self { parent_type, field }
    }

    /// The selected field, including its arguments.
    pub fn field(&self) -> &'a Field {
        self.field
    }

    /// The declared type of the field, with its list and non-null wrappers.
    pub fn field_type(&self) -> &'a Type {
        &self.field.definition.ty
    }

    /// Static metadata of the field: its schema definition and directives.
    pub fn definition(&self) -> &'a FieldDefinition {
        &self.field.definition
    }

    /// Name of the type the field is selected on.
    pub fn parent_type_name(&self) -> &'a NamedType {
        self.parent_type
    }
}

/// Programmatic cost overrides for one field.
///
/// These take precedence over `@cost` and `@costFactor` directives in the schema.
#[derive(Clone, Default)]
pub struct FieldCostHooks {
    cost: Option<CostHook>,
    cost_factor: Option<CostHook>,
}

impl FieldCostHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the base cost of the field.
    pub fn cost(mut self, hook: impl Fn(&Field) -> f64 + Send + Sync + 'static) -> Self {
        self.cost = Some(Arc::new(hook));
        self
    }

    /// Overrides the multiplier applied to the field and to its selections.
    pub fn cost_factor(mut self, hook: impl Fn(&Field) -> f64 + Send + Sync + 'static) -> Self {
        self.cost_factor = Some(Arc::new(hook));
        self
    }

    pub(crate) fn get_cost(&self, field: &Field) -> Option<f64> {
        self.cost.as_ref().map(|hook| hook(field))
    }

    pub(crate) fn get_cost_factor(&self, field: &Field) -> Option<f64> {
        self.cost_factor.as_ref().map(|hook| hook(field))
    }
}

impl fmt::Debug for FieldCostHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldCostHooks")
            .field("cost", &self.cost.is_some())
            .field("cost_factor", &self.cost_factor.is_some())
            .finish()
    }
}

/// Cost hooks registered per `Type.field`.
#[derive(Clone, Debug, Default)]
pub struct CostExtensions {
    type_field_hooks: HashMap<Name, HashMap<Name, FieldCostHooks>>,
}

impl CostExtensions {
    pub fn new() -> Self {
        Self {
            type_field_hooks: HashMap::new(),
        }
    }

    pub fn insert(&mut self, type_name: Name, field_name: Name, hooks: FieldCostHooks) {
        self.type_field_hooks
            .entry(type_name)
            .or_default()
            .insert(field_name, hooks);
    }

    pub fn get(&self, type_name: &str, field_name: &str) -> Option<&FieldCostHooks> {
        self.type_field_hooks
            .get(type_name)
            .and_then(|fields| fields.get(field_name))
    }
}

/// A validated schema together with the cost hooks attached to its fields.
#[derive(Clone, Debug)]
pub struct ComplexitySchema {
    inner: Arc<Valid<Schema>>,
    extensions: CostExtensions,
}

impl ComplexitySchema {
    pub fn new(schema: Arc<Valid<Schema>>) -> Self {
        Self {
            inner: schema,
            extensions: CostExtensions::new(),
        }
    }

    /// Attaches cost hooks to `type_name.field_name`.
    ///
    /// Fails if the schema does not define that field.
    pub fn with_field_hooks(
        mut self,
        type_name: &str,
        field_name: &str,
        hooks: FieldCostHooks,
    ) -> Result<Self, ComplexityError> {
        let lookup_error = || ComplexityError::FieldLookupError {
            type_name: type_name.to_string(),
            field_name: field_name.to_string(),
        };
        let field_definition = self
            .inner
            .type_field(type_name, field_name)
            .map_err(|_err| lookup_error())?;
        let field_name = field_definition.name.clone();
        let (type_name, _) = self
            .inner
            .types
            .get_key_value(type_name)
            .ok_or_else(lookup_error)?;

        self.extensions.insert(type_name.clone(), field_name, hooks);
        Ok(self)
    }
}

impl SchemaTypeInfo for ComplexitySchema {
    fn is_object_type(&self, type_name: &str) -> bool {
        self.inner.is_object_type(type_name)
    }

    fn field_hooks(&self, parent_type: &str, field_name: &str) -> Option<&FieldCostHooks> {
        self.extensions.get(parent_type, field_name)
    }
}

impl AsRef<Valid<Schema>> for ComplexitySchema {
    fn as_ref(&self) -> &Valid<Schema> {
        &self.inner
    }
}

impl Deref for ComplexitySchema {
    type Target = Schema;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Arc<Valid<Schema>> {
        let schema = Schema::parse_and_validate(include_str!("fixtures/schema.graphql"), "")
            .unwrap();
        Arc::new(schema)
    }

    #[test]
    fn object_types_are_recognized() {
        let schema = schema();
        assert!(schema.is_object_type("Item"));
        assert!(!schema.is_object_type("NamedItem"));
        assert!(!schema.is_object_type("ItemUnion"));
        assert!(!schema.is_object_type("String"));
        assert!(!schema.is_object_type("DoesNotExist"));
    }

    #[test]
    fn hooks_are_looked_up_by_type_and_field() {
        let schema = ComplexitySchema::new(schema())
            .with_field_hooks("Item", "expensiveItem", FieldCostHooks::new().cost(|_| 50.0))
            .unwrap();

        let hooks = schema.field_hooks("Item", "expensiveItem").unwrap();
        assert!(hooks.cost.is_some());
        assert!(hooks.cost_factor.is_none());
        assert!(schema.field_hooks("Item", "item").is_none());
        assert!(schema.field_hooks("Item2", "expensiveItem").is_none());
    }

    #[test]
    fn hooks_on_unknown_fields_are_rejected() {
        let error = ComplexitySchema::new(schema())
            .with_field_hooks("Item", "nope", FieldCostHooks::new().cost(|_| 1.0))
            .unwrap_err();
        assert_eq!(
            error,
            ComplexityError::FieldLookupError {
                type_name: "Item".to_string(),
                field_name: "nope".to_string(),
            }
        );
    }
}
