//! Complexity scoring errors.
use displaydoc::Display;
use thiserror::Error;

use crate::graphql;

/// Structural or configuration failures that abort scoring.
///
/// Exceeding the configured budget is not one of these: it is reported through
/// [`ComplexityLimit::check`](crate::ComplexityLimit::check) as a regular validation outcome.
#[derive(Error, Debug, Display, Clone, PartialEq)]
#[non_exhaustive]
pub enum ComplexityError {
    /// No `value` argument defined in `@{directive}` directive on `{field}` field on `{parent_type}`.
    MissingDirectiveArgument {
        /// Name of the directive, without the `@`.
        directive: String,
        /// Name of the field carrying the directive.
        field: String,
        /// Name of the type declaring the field.
        parent_type: String,
    },

    /// `value` argument of `@{directive}` directive on `{field}` field on `{parent_type}` is not a number: {value}
    InvalidDirectiveArgument {
        /// Name of the directive, without the `@`.
        directive: String,
        /// Name of the field carrying the directive.
        field: String,
        /// Name of the type declaring the field.
        parent_type: String,
        /// The literal that could not be read as a number.
        value: String,
    },

    /// fragment `{0}` spreads itself, directly or through other fragments
    FragmentCycle(String),

    /// could not find field {type_name}.{field_name} in the schema
    FieldLookupError {
        /// Name of the type that was searched.
        type_name: String,
        /// Name of the missing field.
        field_name: String,
    },
}

impl ComplexityError {
    /// Machine readable code used in the `extensions` of GraphQL errors.
    pub fn extension_code(&self) -> &'static str {
        match self {
            ComplexityError::MissingDirectiveArgument { .. } => "MISSING_DIRECTIVE_ARGUMENT",
            ComplexityError::InvalidDirectiveArgument { .. } => "INVALID_DIRECTIVE_ARGUMENT",
            ComplexityError::FragmentCycle(_) => "FRAGMENT_CYCLE",
            ComplexityError::FieldLookupError { .. } => "FIELD_LOOKUP_ERROR",
        }
    }

    /// Converts this failure into an error suitable for a GraphQL response.
    pub fn to_graphql_error(&self) -> graphql::Error {
        graphql::Error::new(self.to_string()).with_extension_code(self.extension_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_directive_argument_message() {
        let error = ComplexityError::MissingDirectiveArgument {
            directive: "cost".to_string(),
            field: "missingCostValue".to_string(),
            parent_type: "Query".to_string(),
        };
        insta::assert_snapshot!(
            error.to_string(),
            @"No `value` argument defined in `@cost` directive on `missingCostValue` field on `Query`."
        );
    }

    #[test]
    fn fragment_cycle_message() {
        let error = ComplexityError::FragmentCycle("itemFields".to_string());
        insta::assert_snapshot!(
            error.to_string(),
            @"fragment `itemFields` spreads itself, directly or through other fragments"
        );
    }

    #[test]
    fn converts_to_graphql_error_with_code() {
        let error = ComplexityError::FragmentCycle("a".to_string()).to_graphql_error();
        assert_eq!(error.extension_code(), Some("FRAGMENT_CYCLE"));
        assert!(error.message.contains("`a`"));
    }
}
