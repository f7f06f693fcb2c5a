//! Static complexity scoring for GraphQL operations.
//!
//! A document is scored before execution against the schema it targets. Each selected field has
//! a base cost and a cost factor. The cost factor multiplies the field and everything selected
//! below it, so nested lists grow the cost quickly. [`ComplexityLimit`] rejects documents whose
//! cost is greater than a configured maximum.
//!
//! ## Cost model
//!
//! By default a scalar field costs `1`, an object field costs `0`, and a list multiplies its
//! selections by `10`. Lists of introspection types use a smaller factor so that schema tooling is
//! not rejected. These defaults are overridden per field by:
//!
//! - [`FieldCostHooks`] registered on a [`ComplexitySchema`],
//! - then `@cost(value:)` and `@costFactor(value:)` directives on the field definition.
//!
//! Fragment spreads are inlined and duplicate selections merged before scoring, the same way
//! fields are merged at execution time.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]
#![warn(
    rustdoc::broken_intra_doc_links,
    unreachable_pub,
    unused,
    unused_qualifications,
    dead_code
)]

mod accumulator;
mod configuration;
mod error;
mod fragments;
pub mod graphql;
mod normalize;
mod policy;
mod rule;
mod schema;
mod visitor;

pub use crate::accumulator::CostAccumulator;
pub use crate::configuration::ComplexityLimitConfig;
pub use crate::configuration::CostOptions;
pub use crate::error::ComplexityError;
pub use crate::fragments::FragmentResolver;
pub use crate::normalize::SelectionNormalizer;
pub use crate::policy::CostModelPolicy;
pub use crate::policy::IntrospectionTypes;
pub use crate::rule::ComplexityLimit;
pub use crate::schema::ComplexitySchema;
pub use crate::schema::CostExtensions;
pub use crate::schema::CostHook;
pub use crate::schema::FieldCostHooks;
pub use crate::schema::FieldPosition;
pub use crate::schema::SchemaTypeInfo;
pub use crate::visitor::CostVisitor;
pub use crate::visitor::score_document;
