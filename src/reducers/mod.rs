//! State merge strategies applied at superstep barriers.
//!
//! Two reducer kinds make up the closed vocabulary a state contract can
//! reference by name (see [`crate::ir::ReducerKind`]):
//!
//! - `replace`: the incoming value overwrites the field outright.
//! - `add_messages`: the incoming value is appended, deduplicated by a
//!   stable message `id` when present (see [`strategies::add_messages`]).
//!
//! The `messages` channel always merges with `add_messages` semantics; every
//! other field named in a state contract's `schema` defaults to `replace`
//! unless the contract's `reducers` map says otherwise.

pub mod registry;
pub mod strategies;

pub use registry::ReducerRegistry;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ReducerError {
    #[error("reducer for field '{field}' expected {expected}, found {found}")]
    #[diagnostic(code(flowforge::reducers::shape_mismatch))]
    ShapeMismatch {
        field: String,
        expected: &'static str,
        found: &'static str,
    },
}
