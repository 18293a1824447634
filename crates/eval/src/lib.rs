#![allow(clippy::result_large_err)]
//! acs-eval: the ACS runtime.
//!
//! A [`Model`] pairs a validated [`acs_core::Policy`] with a
//! [`KnowledgeBase`] of announced facts and decides requests by evaluating
//! the request type's matcher. [`Engine`] wraps one model behind a lock for
//! embedding, taking request content and facts as serialized value lists;
//! [`abi`] maps its results to integer status codes.

pub mod abi;
pub mod decode;
pub mod enforce;
pub mod engine;
pub mod error;
pub mod knowledge;
pub mod model;
pub mod value;

pub use decode::{decode_pattern, decode_value_list, DecodeError};
pub use enforce::{enforce, Request};
pub use engine::{Engine, EngineConfig, EngineError};
pub use error::EvalError;
pub use knowledge::{Answer, Fact, KnowledgeBase, QueryResult, Slot, Term};
pub use model::Model;
pub use value::Value;
