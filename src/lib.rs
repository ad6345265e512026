//! tag-resolver: type checking of module extension tags
//!
//! A tag is a set of raw key/value pairs submitted by a module file against a
//! tag class (an attribute schema). This crate turns it into an immutable,
//! type-checked record:
//! - Attribute schemas with stable positional addressing
//! - Value conversion, allowed-value checks, defaults and mandatory checks
//! - Label-typed values resolved through an external memoizing graph
//! - Restart-based suspension: an unready graph value aborts the whole
//!   attempt, which the driver re-runs later from scratch
//! - YAML configuration for resolver settings and tag class definitions
//!
//! The evaluation graph itself is external; only the `GraphLookup` contract
//! and a small in-memory implementation live here.

pub mod checker;
pub mod config;
pub mod error;
pub mod graph;
pub mod label;
pub mod location;
pub mod resolver;
pub mod restart;
pub mod schema;
pub mod spelling;
pub mod tag;
pub mod value;

// Re-export commonly used types
pub use checker::TagTypeChecker;
pub use config::loader::ConfigLoader;
pub use config::types::ResolverConfig;
pub use error::{ErrorCode, ResolutionError};
pub use graph::{GraphError, GraphKey, GraphLookup, GraphValue, InMemoryGraph};
pub use label::{Label, LabelConverter, LabelSyntaxError};
pub use location::Location;
pub use resolver::{Outcome, ResolutionEnv, ValueResolver};
pub use restart::{run_with_restarts, Completed, GraphEvaluator, RecordingLookup, RestartError};
pub use schema::{
    AllowedValuePredicate, AllowedValues, AttrType, AttributeDescriptor, AttributeSchema,
    ConversionError, SchemaError,
};
pub use tag::{RawTag, TypeCheckedTag};
pub use value::{ProviderAccessError, ProviderView, RawValue, TypedValue};
