//! Enforcement of a maximum cost on incoming documents.
use std::fmt;
use std::sync::Arc;

use apollo_compiler::ExecutableDocument;

use crate::configuration::ComplexityLimitConfig;
use crate::error::ComplexityError;
use crate::graphql;
use crate::policy::CostModelPolicy;
use crate::policy::IntrospectionTypes;
use crate::schema::SchemaTypeInfo;
use crate::visitor::CostVisitor;

pub(crate) const DEFAULT_ERROR_MESSAGE: &str = "query exceeds complexity limit";
pub(crate) const COMPLEXITY_LIMIT_EXCEEDED_CODE: &str = "QUERY_COMPLEXITY_LIMIT_EXCEEDED";

type OnCost = Arc<dyn Fn(f64, &ExecutableDocument) + Send + Sync>;
type FormatErrorMessage = Arc<dyn Fn(f64) -> String + Send + Sync>;
type CreateError = Arc<dyn Fn(f64, &ExecutableDocument) -> graphql::Error + Send + Sync>;

/// Rejects documents whose cost is greater than the configured maximum.
///
/// The full document is always scored, even once the maximum is exceeded, so that `on_cost`
/// receives the real cost.
#[derive(Clone)]
pub struct ComplexityLimit {
    config: ComplexityLimitConfig,
    introspection_types: IntrospectionTypes,
    on_cost: Option<OnCost>,
    format_error_message: Option<FormatErrorMessage>,
    create_error: Option<CreateError>,
}

impl ComplexityLimit {
    pub fn new(config: ComplexityLimitConfig) -> Self {
        Self {
            config,
            introspection_types: IntrospectionTypes::default(),
            on_cost: None,
            format_error_message: None,
            create_error: None,
        }
    }

    /// Called with the cost of every checked document, whether it is rejected or not.
    pub fn on_cost(
        mut self,
        on_cost: impl Fn(f64, &ExecutableDocument) + Send + Sync + 'static,
    ) -> Self {
        self.on_cost = Some(Arc::new(on_cost));
        self
    }

    /// Builds the message of the error reported for rejected documents.
    pub fn format_error_message(
        mut self,
        format_error_message: impl Fn(f64) -> String + Send + Sync + 'static,
    ) -> Self {
        self.format_error_message = Some(Arc::new(format_error_message));
        self
    }

    /// Builds the whole error reported for rejected documents.
    ///
    /// When set, [`ComplexityLimit::format_error_message`] is not used.
    pub fn create_error(
        mut self,
        create_error: impl Fn(f64, &ExecutableDocument) -> graphql::Error + Send + Sync + 'static,
    ) -> Self {
        self.create_error = Some(Arc::new(create_error));
        self
    }

    /// Replaces the types whose lists use the introspection list factor.
    pub fn introspection_types(mut self, introspection_types: IntrospectionTypes) -> Self {
        self.introspection_types = introspection_types;
        self
    }

    /// Scores `document` and returns the error to report if it is too expensive.
    ///
    /// Returns `Ok(None)` if the document is within the limit, or if it is not but the limit is in
    /// warn-only mode.
    pub fn check<S: SchemaTypeInfo + ?Sized>(
        &self,
        document: &ExecutableDocument,
        schema: &S,
    ) -> Result<Option<graphql::Error>, ComplexityError> {
        let policy = CostModelPolicy::new(&self.config.cost, &self.introspection_types);
        let mut visitor =
            CostVisitor::new(schema, policy).skip_introspection(self.config.skip_introspection);
        visitor.visit_document(document, document)?;
        let cost = visitor.cost();

        if let Some(on_cost) = &self.on_cost {
            on_cost(cost, document);
        }

        if cost <= self.config.max_cost {
            return Ok(None);
        }

        tracing::warn!(
            "request exceeded complexity limits: cost {cost} is greater than the maximum of {}",
            self.config.max_cost
        );
        if self.config.warn_only {
            return Ok(None);
        }
        Ok(Some(self.error(cost, document)))
    }

    fn error(&self, cost: f64, document: &ExecutableDocument) -> graphql::Error {
        if let Some(create_error) = &self.create_error {
            return create_error(cost, document);
        }

        let message = match &self.format_error_message {
            Some(format_error_message) => format_error_message(cost),
            None => DEFAULT_ERROR_MESSAGE.to_string(),
        };
        let error =
            graphql::Error::new(message).with_extension_code(COMPLEXITY_LIMIT_EXCEEDED_CODE);
        operation_locations(document)
            .fold(error, |error, (line, column)| error.with_location(line, column))
    }
}

/// Start of each operation of the document, as 1-based line and column.
fn operation_locations(document: &ExecutableDocument) -> impl Iterator<Item = (u32, u32)> + '_ {
    let operations = document.operations.anonymous.iter();
    operations
        .chain(document.operations.named.values())
        .filter_map(|operation| {
            let start = operation.line_column_range(&document.sources)?.start;
            Some((u32::try_from(start.line).ok()?, u32::try_from(start.column).ok()?))
        })
}

impl fmt::Debug for ComplexityLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComplexityLimit")
            .field("config", &self.config)
            .field("introspection_types", &self.introspection_types)
            .field("on_cost", &self.on_cost.is_some())
            .field("format_error_message", &self.format_error_message.is_some())
            .field("create_error", &self.create_error.is_some())
            .finish()
    }
}
