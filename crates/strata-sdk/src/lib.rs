//! Strata SDK - host scripting-engine ABI
//!
//! This crate provides the minimal types and traits a native binding needs
//! to talk to the embedding script engine without depending on the engine
//! itself: the value model, tables, userdata, argument checking, call
//! results and the `HostContext` trait the engine implements.
//!
//! # Example
//!
//! ```ignore
//! use strata_sdk::{Args, CallResult, FunctionRegistry, Value};
//!
//! let mut registry = FunctionRegistry::new();
//! registry.register("answer", |_ctx, _args| CallResult::one(Value::Integer(42)));
//! let lib = registry.to_table();
//! ```

#![warn(missing_docs)]

pub mod args;
pub mod context;
pub mod error;
pub mod handler;
pub mod table;
pub mod value;

pub use args::Args;
pub use context::HostContext;
pub use error::{AbiResult, HostError};
pub use handler::{CallResult, FunctionRegistry};
pub use table::{Table, TableRef};
pub use value::{NativeFunction, UserData, Value};
