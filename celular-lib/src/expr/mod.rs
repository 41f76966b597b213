//! Predicate compilation and evaluation using CEL
//!
//! This module implements the rule engine that decides whether a host is in use. Rules are
//! user-supplied CEL (Common Expression Language) predicates, which keeps evaluation
//! sandboxed: a predicate can only read the bindings it is given.
//!
//! # Implementation Model
//!
//! Configuration entries of the form `{uses, expr}` are turned into an [`ExpressionSet`].
//! Loading validates each entry's shape, resolves its `uses` list against the provider
//! [`Registry`](crate::providers::Registry) and compiles the expression once. Any failure
//! rejects the whole set.
//!
//! The [`Evaluator`] visits predicates in declared order. For each one it:
//! - Opens a child scope on top of the base context built by [`Environment`] (globals and `vars`)
//! - Asks the [`Materializer`] for every provider in `uses` and binds the records under the
//!   provider's output key
//! - Runs the program and coerces the result with CEL truthiness
//!
//! The materializer optionally memoizes provider output for the duration of one decision
//! and optionally bounds each enumeration with a timeout.

mod environment;
mod evaluator;
mod expression_set;
mod materializer;
mod predicate;

pub use environment::{Environment, VARS_BINDING, json_to_cel};
pub use evaluator::{Evaluator, is_truthy};
pub use expression_set::{ExpressionSet, PredicateSpec};
pub use materializer::{MaterializeOptions, Materializer};
pub use predicate::Predicate;
