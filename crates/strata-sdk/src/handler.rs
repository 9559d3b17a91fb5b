//! Call results and the name-based native function registry

use std::collections::BTreeMap;
use std::fmt;

use crate::context::HostContext;
use crate::error::{AbiResult, HostError};
use crate::table::{Table, TableRef};
use crate::value::{NativeFunction, Value};

// ============================================================================
// CallResult
// ============================================================================

/// Result of a native call
#[derive(Debug)]
pub enum CallResult {
    /// Call returned zero or more values
    Values(Vec<Value>),
    /// Call raised an error
    Error(HostError),
}

impl CallResult {
    /// No results
    #[inline]
    pub fn none() -> Self {
        Self::Values(Vec::new())
    }

    /// A single result
    #[inline]
    pub fn one(value: impl Into<Value>) -> Self {
        Self::Values(vec![value.into()])
    }

    /// Recoverable failure: `nil, "<op>: <message>"`
    pub fn fail(op: &str, message: impl fmt::Display) -> Self {
        Self::Values(fail_values(op, message))
    }

    /// Convert back into a `Result`
    pub fn into_result(self) -> AbiResult<Vec<Value>> {
        match self {
            Self::Values(values) => Ok(values),
            Self::Error(e) => Err(e),
        }
    }

    /// First returned value (nil if none or on error)
    pub fn first(&self) -> Value {
        match self {
            Self::Values(values) => values.first().cloned().unwrap_or_default(),
            Self::Error(_) => Value::Nil,
        }
    }
}

impl From<AbiResult<Vec<Value>>> for CallResult {
    fn from(r: AbiResult<Vec<Value>>) -> Self {
        match r {
            Ok(values) => Self::Values(values),
            Err(e) => Self::Error(e),
        }
    }
}

impl From<HostError> for CallResult {
    fn from(e: HostError) -> Self {
        Self::Error(e)
    }
}

/// The `nil, "<op>: <message>"` pair as a value list
pub fn fail_values(op: &str, message: impl fmt::Display) -> Vec<Value> {
    vec![Value::Nil, Value::from(format!("{}: {}", op, message))]
}

// ============================================================================
// Native Function Registry (name-based dispatch)
// ============================================================================

/// Registry of native functions indexed by symbolic name.
///
/// Bindings register their functions here and then materialise the
/// registry as a library table or a metatable.
pub struct FunctionRegistry {
    handlers: BTreeMap<String, NativeFunction>,
}

impl FunctionRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            handlers: BTreeMap::new(),
        }
    }

    /// Register a native function by name
    pub fn register(
        &mut self,
        name: &str,
        handler: impl Fn(&dyn HostContext, &[Value]) -> CallResult + 'static,
    ) {
        self.handlers
            .insert(name.to_string(), NativeFunction::new(handler));
    }

    /// Get a handler by name
    pub fn get(&self, name: &str) -> Option<NativeFunction> {
        self.handlers.get(name).cloned()
    }

    /// Check if a handler is registered
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    /// Get the number of registered handlers
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Build a table with one field per registered function
    pub fn to_table(&self) -> TableRef {
        let mut table = Table::with_capacity(0, self.handlers.len());
        for (name, f) in &self.handlers {
            table.set_field(name, Value::Function(f.clone()));
        }
        table.into_ref()
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
