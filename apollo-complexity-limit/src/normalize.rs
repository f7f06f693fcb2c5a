//! Flattening of selection sets before they are scored.
//!
//! Scoring must agree with the field merging done at execution time, so that a selection repeated
//! in several places, directly or through fragments, is charged once per distinct multiplier and
//! not once per occurrence.
use ahash::HashMap;
use ahash::HashMapExt;
use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::ast::Argument;
use apollo_compiler::executable::InlineFragment;
use apollo_compiler::executable::Selection;
use apollo_compiler::executable::SelectionSet;

use crate::error::ComplexityError;
use crate::fragments::FragmentResolver;

enum Computation<T> {
    InProgress,
    Done(T),
}

/// Inlines fragment spreads and merges duplicate selections, recursively.
///
/// Input nodes are never modified: merged nodes are copied on write. Normalized fragment bodies
/// are cached by fragment name, so a normalizer should only be used with one document.
pub struct SelectionNormalizer<'a, R: FragmentResolver + ?Sized> {
    fragments: &'a R,
    fragment_cache: HashMap<Name, Computation<SelectionSet>>,
}

impl<'a, R: FragmentResolver + ?Sized> SelectionNormalizer<'a, R> {
    pub fn new(fragments: &'a R) -> Self {
        Self {
            fragments,
            fragment_cache: HashMap::new(),
        }
    }

    /// Returns a selection set without fragment spreads and without duplicate siblings at any
    /// level.
    pub fn normalize(
        &mut self,
        selection_set: &SelectionSet,
    ) -> Result<SelectionSet, ComplexityError> {
        let expanded = self.expand(selection_set)?;
        let mut selections = deduplicate(expanded);

        for selection in &mut selections {
            match selection {
                Selection::Field(field) if !field.selection_set.selections.is_empty() => {
                    let nested = self.normalize(&field.selection_set)?;
                    field.make_mut().selection_set = nested;
                }
                Selection::InlineFragment(inline_fragment) => {
                    let nested = self.normalize(&inline_fragment.selection_set)?;
                    inline_fragment.make_mut().selection_set = nested;
                }
                _ => {}
            }
        }

        Ok(SelectionSet {
            ty: selection_set.ty.clone(),
            selections,
        })
    }

    /// Replaces fragment spreads by the normalized selections of their fragment, and inline
    /// fragments that do not narrow the type by their selections.
    fn expand(&mut self, selection_set: &SelectionSet) -> Result<Vec<Selection>, ComplexityError> {
        let mut selections = Vec::with_capacity(selection_set.selections.len());
        for selection in &selection_set.selections {
            let spread = match selection {
                Selection::FragmentSpread(spread) => spread,
                Selection::InlineFragment(inline_fragment)
                    if is_transparent(inline_fragment, &selection_set.ty) =>
                {
                    selections.extend(self.expand(&inline_fragment.selection_set)?);
                    continue;
                }
                _ => {
                    selections.push(selection.clone());
                    continue;
                }
            };
            let Some(fragment_selection_set) = self.fragment_selection_set(&spread.fragment_name)?
            else {
                continue;
            };

            if fragment_selection_set.ty == selection_set.ty {
                selections.extend(fragment_selection_set.selections);
            } else {
                // Keep the type condition so nested fields are still looked up on the right type.
                selections.push(Selection::InlineFragment(Node::new(InlineFragment {
                    type_condition: Some(fragment_selection_set.ty.clone()),
                    directives: spread.directives.clone(),
                    selection_set: fragment_selection_set,
                })));
            }
        }
        Ok(selections)
    }

    fn fragment_selection_set(
        &mut self,
        name: &Name,
    ) -> Result<Option<SelectionSet>, ComplexityError> {
        match self.fragment_cache.get(name) {
            Some(Computation::Done(selection_set)) => return Ok(Some(selection_set.clone())),
            // https://spec.graphql.org/October2021/#sec-Fragment-spreads-must-not-form-cycles
            Some(Computation::InProgress) => {
                return Err(ComplexityError::FragmentCycle(name.to_string()));
            }
            None => {}
        }

        let fragments = self.fragments;
        let Some(fragment) = fragments.resolve(name) else {
            // Undefined fragment. The operation is invalid and will be rejected by validation.
            tracing::debug!("fragment {name} is not defined, its spread does not add any cost");
            return Ok(None);
        };

        self.fragment_cache
            .insert(name.clone(), Computation::InProgress);
        let normalized = self.normalize(&fragment.selection_set)?;
        self.fragment_cache
            .insert(name.clone(), Computation::Done(normalized.clone()));
        Ok(Some(normalized))
    }
}

/// An inline fragment without directives, on the type of its enclosing selection set or without
/// type condition, selects the same fields as its selections would.
fn is_transparent(inline_fragment: &InlineFragment, parent_type: &Name) -> bool {
    inline_fragment.directives.is_empty()
        && inline_fragment
            .type_condition
            .as_ref()
            .is_none_or(|type_condition| type_condition == parent_type)
}

#[derive(Hash, PartialEq, Eq)]
enum SelectionKey {
    Field(Name),
    InlineFragment(Option<Name>),
}

/// Merges sibling selections that execution would merge, keeping the first occurrence in place.
fn deduplicate(selections: Vec<Selection>) -> Vec<Selection> {
    let mut kept: Vec<Selection> = Vec::with_capacity(selections.len());
    let mut candidates: HashMap<SelectionKey, Vec<usize>> = HashMap::new();

    for selection in selections {
        let key = match &selection {
            Selection::Field(field) => SelectionKey::Field(field.response_key().clone()),
            Selection::InlineFragment(inline_fragment) => {
                SelectionKey::InlineFragment(inline_fragment.type_condition.clone())
            }
            Selection::FragmentSpread(_) => {
                kept.push(selection);
                continue;
            }
        };

        let indices = candidates.entry(key).or_default();
        let same = indices
            .iter()
            .copied()
            .find(|&index| is_same_selection(&kept[index], &selection));
        match same {
            Some(index) => merge_into(&mut kept[index], &selection),
            None => {
                indices.push(kept.len());
                kept.push(selection);
            }
        }
    }
    kept
}

/// Assumes both selections have the same [`SelectionKey`].
fn is_same_selection(left: &Selection, right: &Selection) -> bool {
    match (left, right) {
        (Selection::Field(left), Selection::Field(right)) => {
            left.name == right.name && same_arguments(&left.arguments, &right.arguments)
        }
        (Selection::InlineFragment(_), Selection::InlineFragment(_)) => true,
        _ => false,
    }
}

/// Arguments are equal regardless of order, comparing values by their printed form.
fn same_arguments(left: &[Node<Argument>], right: &[Node<Argument>]) -> bool {
    left.len() == right.len()
        && left.iter().all(|argument| {
            let printed = argument.value.to_string();
            right
                .iter()
                .any(|other| other.name == argument.name && other.value.to_string() == printed)
        })
}

/// Appends the nested selections of `other` to those of `kept`, when both have some.
fn merge_into(kept: &mut Selection, other: &Selection) {
    match (kept, other) {
        (Selection::Field(kept), Selection::Field(other)) => {
            if !kept.selection_set.selections.is_empty()
                && !other.selection_set.selections.is_empty()
            {
                kept.make_mut()
                    .selection_set
                    .selections
                    .extend(other.selection_set.selections.iter().cloned());
            }
        }
        (Selection::InlineFragment(kept), Selection::InlineFragment(other)) => {
            if !kept.selection_set.selections.is_empty()
                && !other.selection_set.selections.is_empty()
            {
                kept.make_mut()
                    .selection_set
                    .selections
                    .extend(other.selection_set.selections.iter().cloned());
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use apollo_compiler::ExecutableDocument;
    use apollo_compiler::Schema;
    use apollo_compiler::validation::Valid;
    use pretty_assertions::assert_eq;

    use super::*;

    fn schema() -> Valid<Schema> {
        Schema::parse_and_validate(include_str!("fixtures/schema.graphql"), "").unwrap()
    }

    /// Builds the document without validating it, as invalid documents must still be scored.
    fn parse(schema: &Valid<Schema>, query: &str) -> ExecutableDocument {
        ExecutableDocument::parse(schema, query, "query.graphql")
            .unwrap_or_else(|invalid| invalid.partial)
    }

    fn normalize(query: &str) -> Result<String, ComplexityError> {
        let schema = schema();
        let document = parse(&schema, query);
        let operation = document.operations.anonymous.as_ref().unwrap();
        let normalized = SelectionNormalizer::new(&document).normalize(&operation.selection_set)?;
        Ok(outline(&normalized))
    }

    /// Compact single-line rendering of a selection set.
    fn outline(selection_set: &SelectionSet) -> String {
        selection_set
            .selections
            .iter()
            .map(|selection| match selection {
                Selection::Field(field) => {
                    let mut out = String::new();
                    if let Some(alias) = &field.alias {
                        out.push_str(&format!("{alias}: "));
                    }
                    out.push_str(&field.name);
                    if !field.arguments.is_empty() {
                        let arguments: Vec<String> = field
                            .arguments
                            .iter()
                            .map(|argument| format!("{}: {}", argument.name, argument.value))
                            .collect();
                        out.push_str(&format!("({})", arguments.join(", ")));
                    }
                    if !field.selection_set.selections.is_empty() {
                        out.push_str(&format!(" {{ {} }}", outline(&field.selection_set)));
                    }
                    out
                }
                Selection::InlineFragment(inline_fragment) => {
                    let condition = inline_fragment
                        .type_condition
                        .as_ref()
                        .map(|ty| format!(" on {ty}"))
                        .unwrap_or_default();
                    format!(
                        "...{condition} {{ {} }}",
                        outline(&inline_fragment.selection_set)
                    )
                }
                Selection::FragmentSpread(spread) => format!("...{}", spread.fragment_name),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn merges_fields_with_the_same_name() {
        assert_eq!(
            normalize("{ item { name } item { name number } }").unwrap(),
            "item { name number }"
        );
    }

    #[test]
    fn merges_fields_by_response_key() {
        assert_eq!(
            normalize("{ item { name other: name other: name } }").unwrap(),
            "item { name other: name }"
        );
        assert_eq!(
            normalize("{ first: list { name } second: list { name } first: list { number } }")
                .unwrap(),
            "first: list { name number } second: list { name }"
        );
    }

    #[test]
    fn keeps_fields_with_different_arguments() {
        assert_eq!(
            normalize("{ item { name name(arg: 4) name(arg: 5) name(arg: 4) } }").unwrap(),
            "item { name name(arg: 4) name(arg: 5) }"
        );
    }

    #[test]
    fn argument_order_does_not_matter() {
        assert_eq!(
            normalize(
                r#"{ search(term: "a", first: 2) { name } search(first: 2, term: "a") { number } }"#
            )
            .unwrap(),
            r#"search(term: "a", first: 2) { name number }"#
        );
    }

    #[test]
    fn inlines_fragments_on_the_same_type() {
        assert_eq!(
            normalize("{ item { ...itemFields name } } fragment itemFields on Item { name number }")
                .unwrap(),
            "item { name number }"
        );
    }

    #[test]
    fn keeps_the_type_condition_of_fragments_on_other_types() {
        assert_eq!(
            normalize("{ item { ...named } } fragment named on NamedItem { name }").unwrap(),
            "item { ... on NamedItem { name } }"
        );
    }

    #[test]
    fn inlines_inline_fragments_on_the_same_type() {
        assert_eq!(
            normalize("{ item { ... on Item { name } ... on Item { number } } }").unwrap(),
            "item { name number }"
        );
        assert_eq!(
            normalize("{ item { ... { name } ... on Item { ...itemFields } } } fragment itemFields on Item { name }")
                .unwrap(),
            "item { name }"
        );
    }

    #[test]
    fn inline_fragments_and_spreads_on_the_same_type_merge() {
        assert_eq!(
            normalize("{ item { ... on Item { name } ...itemFields } } fragment itemFields on Item { name }")
                .unwrap(),
            "item { name }"
        );
    }

    #[test]
    fn keeps_inline_fragments_with_directives() {
        assert_eq!(
            normalize("{ item { ... on Item @include(if: false) { name } } }").unwrap(),
            "item { ... on Item { name } }"
        );
    }

    #[test]
    fn keeps_inline_fragments_on_different_types() {
        assert_eq!(
            normalize("{ item { ... on Item { name } ... on NamedItem { name } ... on NamedItem { number: name } } }")
                .unwrap(),
            "item { name ... on NamedItem { name number: name } }"
        );
    }

    #[test]
    fn expands_a_fragment_at_each_spread() {
        assert_eq!(
            normalize(
                "{ item { ...itemFields } list { ...itemFields } }
                 fragment itemFields on Item { name item { name } }"
            )
            .unwrap(),
            "item { name item { name } } list { name item { name } }"
        );
    }

    #[test]
    fn nested_fragments_are_expanded_and_merged() {
        assert_eq!(
            normalize(
                "{ item { ...outer item { number } } }
                 fragment outer on Item { name ...inner }
                 fragment inner on Item { name item { name } }"
            )
            .unwrap(),
            "item { name item { name number } }"
        );
    }

    #[test]
    fn drops_undefined_fragments() {
        assert_eq!(
            normalize("{ item { name ...missing } }").unwrap(),
            "item { name }"
        );
    }

    #[test]
    fn fragment_cycles_are_errors() {
        assert_eq!(
            normalize(
                "{ item { ...a } }
                 fragment a on Item { item { ...b } }
                 fragment b on Item { name ...a }"
            )
            .unwrap_err(),
            ComplexityError::FragmentCycle("a".to_string())
        );
    }

    #[test]
    fn fragments_spreading_themselves_are_errors() {
        assert_eq!(
            normalize("{ item { ...a } } fragment a on Item { name ...a }").unwrap_err(),
            ComplexityError::FragmentCycle("a".to_string())
        );
    }

    #[test]
    fn does_not_modify_the_document() {
        let schema = schema();
        let document = parse(
            &schema,
            "{ item { ...itemFields item { number } } item { name } }
             fragment itemFields on Item { name item { name } }",
        );
        let before = document.to_string();

        let operation = document.operations.anonymous.as_ref().unwrap();
        let normalized = SelectionNormalizer::new(&document)
            .normalize(&operation.selection_set)
            .unwrap();

        assert_eq!(outline(&normalized), "item { name item { name number } }");
        assert_eq!(document.to_string(), before);
    }
}
