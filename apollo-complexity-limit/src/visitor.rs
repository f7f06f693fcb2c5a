use apollo_compiler::ExecutableDocument;
use apollo_compiler::ast::NamedType;
use apollo_compiler::executable::Field;
use apollo_compiler::executable::Selection;
use apollo_compiler::executable::SelectionSet;

use crate::accumulator::CostAccumulator;
use crate::configuration::CostOptions;
use crate::error::ComplexityError;
use crate::fragments::FragmentResolver;
use crate::normalize::SelectionNormalizer;
use crate::policy::CostModelPolicy;
use crate::policy::IntrospectionTypes;
use crate::schema::FieldPosition;
use crate::schema::SchemaTypeInfo;

const INTROSPECTION_ROOT_FIELDS: [&str; 2] = ["__schema", "__type"];

/// Walks normalized selection sets and sums up the cost of every selected field.
///
/// Each field is charged its base cost times the product of the cost factors of every field above
/// it, including its own. Inline fragments do not cost anything by themselves.
pub struct CostVisitor<'a, S: SchemaTypeInfo + ?Sized> {
    schema: &'a S,
    policy: CostModelPolicy<'a>,
    skip_introspection: bool,
    accumulator: CostAccumulator,
    /// Running products of the cost factors of the fields being visited.
    multipliers: Vec<f64>,
}

impl<'a, S: SchemaTypeInfo + ?Sized> CostVisitor<'a, S> {
    pub fn new(schema: &'a S, policy: CostModelPolicy<'a>) -> Self {
        Self {
            schema,
            policy,
            skip_introspection: false,
            accumulator: CostAccumulator::new(),
            multipliers: Vec::new(),
        }
    }

    /// Do not charge top-level `__schema` and `__type` fields, nor anything below them.
    pub fn skip_introspection(mut self, skip_introspection: bool) -> Self {
        self.skip_introspection = skip_introspection;
        self
    }

    /// Scores every operation of `document`.
    ///
    /// Fragment definitions are only charged where they are spread.
    pub fn visit_document<R: FragmentResolver + ?Sized>(
        &mut self,
        document: &ExecutableDocument,
        fragments: &R,
    ) -> Result<(), ComplexityError> {
        let mut normalizer = SelectionNormalizer::new(fragments);
        let operations = document.operations.anonymous.iter();
        for operation in operations.chain(document.operations.named.values()) {
            let selection_set = normalizer.normalize(&operation.selection_set)?;
            self.visit_selections(&selection_set, true)?;
        }
        Ok(())
    }

    /// Total cost of everything visited so far.
    pub fn cost(&self) -> f64 {
        self.accumulator.total()
    }

    /// Number of fields currently being visited. Zero between visits.
    pub fn multiplier_depth(&self) -> usize {
        self.multipliers.len()
    }

    fn multiplier(&self) -> f64 {
        self.multipliers.last().copied().unwrap_or(1.0)
    }

    fn visit_selections(
        &mut self,
        selection_set: &SelectionSet,
        at_root: bool,
    ) -> Result<(), ComplexityError> {
        for selection in &selection_set.selections {
            match selection {
                Selection::Field(field) => {
                    if at_root && self.skip_introspection && is_introspection_root_field(field) {
                        tracing::debug!("skipping introspection field {}", field.name);
                        continue;
                    }
                    self.visit_field(&selection_set.ty, field)?;
                }
                Selection::InlineFragment(inline_fragment) => {
                    self.visit_selections(&inline_fragment.selection_set, at_root)?;
                }
                // Normalized selection sets have no spreads left.
                Selection::FragmentSpread(_) => {}
            }
        }
        Ok(())
    }

    fn visit_field(&mut self, parent_type: &NamedType, field: &Field) -> Result<(), ComplexityError> {
        let position = FieldPosition::new(parent_type, field);
        let factor = self.policy.cost_factor(&position, self.schema)?;
        let cost = self.policy.base_cost(&position, self.schema)?;

        self.with_multiplier(factor, |visitor| {
            let multiplier = visitor.multiplier();
            // A free field adds nothing, even below an overflowed multiplier.
            if cost != 0.0 {
                visitor.accumulator.add(multiplier * cost);
            }
            tracing::debug!(
                "Field {}.{} cost breakdown: (multiplier) {} * (base cost) {} = {}",
                parent_type,
                field.name,
                multiplier,
                cost,
                multiplier * cost
            );
            visitor.visit_selections(&field.selection_set, false)
        })
    }

    /// Runs `visit` with the current multiplier scaled by `factor`, then restores it.
    fn with_multiplier<T>(&mut self, factor: f64, visit: impl FnOnce(&mut Self) -> T) -> T {
        let multiplier = self.multiplier() * factor;
        self.multipliers.push(multiplier);
        let result = visit(self);
        self.multipliers.pop();
        result
    }
}

fn is_introspection_root_field(field: &Field) -> bool {
    INTROSPECTION_ROOT_FIELDS.contains(&field.name.as_str())
}

/// Computes the cost of every operation in `document`.
///
/// Lists of the built-in introspection types use [`CostOptions::introspection_list_factor`] and
/// introspection fields are charged like any other field.
pub fn score_document<S, R>(
    document: &ExecutableDocument,
    schema: &S,
    fragments: &R,
    options: &CostOptions,
) -> Result<f64, ComplexityError>
where
    S: SchemaTypeInfo + ?Sized,
    R: FragmentResolver + ?Sized,
{
    let introspection_types = IntrospectionTypes::default();
    let policy = CostModelPolicy::new(options, &introspection_types);
    let mut visitor = CostVisitor::new(schema, policy);
    visitor.visit_document(document, fragments)?;
    Ok(visitor.cost())
}
