use apollo_compiler::ExecutableDocument;
use apollo_compiler::Node;
use apollo_compiler::executable::Fragment;
use apollo_compiler::executable::FragmentMap;

/// Looks up named fragments by name.
///
/// Returning `None` is not an error: a spread of an undefined fragment makes the operation
/// invalid, which is reported by validation elsewhere, so scoring just drops it.
pub trait FragmentResolver {
    fn resolve(&self, name: &str) -> Option<&Node<Fragment>>;
}

impl FragmentResolver for FragmentMap {
    fn resolve(&self, name: &str) -> Option<&Node<Fragment>> {
        self.get(name)
    }
}

impl FragmentResolver for ExecutableDocument {
    fn resolve(&self, name: &str) -> Option<&Node<Fragment>> {
        self.fragments.resolve(name)
    }
}

#[cfg(test)]
mod tests {
    use apollo_compiler::Schema;

    use super::*;

    #[test]
    fn resolves_fragments_defined_in_the_document() {
        let schema =
            Schema::parse_and_validate(include_str!("fixtures/schema.graphql"), "").unwrap();
        let document = ExecutableDocument::parse_and_validate(
            &schema,
            "{ item { ...itemFields } } fragment itemFields on Item { name }",
            "query.graphql",
        )
        .unwrap();

        let fragment = document.resolve("itemFields").unwrap();
        assert_eq!(fragment.type_condition().as_str(), "Item");
        assert!(document.resolve("missing").is_none());
    }
}
