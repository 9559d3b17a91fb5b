//! Positional argument access and checking.
//!
//! Mirrors the usual check/opt helpers of an embedding API: positions are
//! 1-based, missing arguments read as nil, and every check failure is a
//! raised [`HostError::Argument`] naming the position.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{AbiResult, HostError};
use crate::table::TableRef;
use crate::value::{UserData, Value};

/// Borrowed view over a call's arguments
#[derive(Clone, Copy)]
pub struct Args<'a> {
    values: &'a [Value],
}

impl<'a> Args<'a> {
    /// Wrap an argument slice
    pub fn new(values: &'a [Value]) -> Self {
        Self { values }
    }

    /// Number of arguments passed
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when no arguments were passed
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Argument at a 1-based position (nil when absent)
    pub fn get(&self, position: usize) -> Value {
        self.slot(position).cloned().unwrap_or_default()
    }

    fn slot(&self, position: usize) -> Option<&'a Value> {
        position.checked_sub(1).and_then(|i| self.values.get(i))
    }

    fn type_name_at(&self, position: usize) -> &'static str {
        self.slot(position).map_or("no value", Value::type_name)
    }

    /// Arguments from a 1-based position to the end
    pub fn rest(&self, from: usize) -> &'a [Value] {
        let start = from.saturating_sub(1).min(self.values.len());
        &self.values[start..]
    }

    /// Required byte string
    pub fn check_bytes(&self, position: usize) -> AbiResult<&'a [u8]> {
        self.slot(position)
            .and_then(Value::as_bytes)
            .ok_or_else(|| HostError::type_mismatch(position, "string", self.type_name_at(position)))
    }

    /// Required UTF-8 string
    pub fn check_str(&self, position: usize) -> AbiResult<&'a str> {
        let bytes = self.check_bytes(position)?;
        std::str::from_utf8(bytes)
            .map_err(|_| HostError::argument(position, "string is not valid UTF-8"))
    }

    /// Optional UTF-8 string (nil or absent reads as `None`)
    pub fn opt_str(&self, position: usize) -> AbiResult<Option<&'a str>> {
        if self.slot(position).map_or(true, Value::is_nil) {
            Ok(None)
        } else {
            self.check_str(position).map(Some)
        }
    }

    /// Required integer
    pub fn check_integer(&self, position: usize) -> AbiResult<i64> {
        match self.slot(position) {
            Some(v @ (Value::Integer(_) | Value::Number(_))) => v.as_integer().ok_or_else(|| {
                HostError::argument(position, "number has no integer representation")
            }),
            _ => Err(HostError::type_mismatch(position, "number", self.type_name_at(position))),
        }
    }

    /// Truthiness of an argument (absent is false)
    pub fn to_boolean(&self, position: usize) -> bool {
        self.slot(position).map_or(false, Value::truthy)
    }

    /// Table argument, if one was passed
    pub fn opt_table(&self, position: usize) -> Option<TableRef> {
        self.slot(position).and_then(Value::as_table).cloned()
    }

    /// Userdata of the given type name, or `None`
    pub fn test_userdata<T: Any>(&self, position: usize, type_name: &str) -> Option<Rc<RefCell<T>>> {
        self.slot(position)
            .and_then(Value::as_userdata)
            .filter(|u| u.type_name() == type_name)
            .and_then(UserData::downcast::<T>)
    }

    /// Required userdata of the given type name
    pub fn check_userdata<T: Any>(
        &self,
        position: usize,
        type_name: &str,
    ) -> AbiResult<Rc<RefCell<T>>> {
        self.test_userdata(position, type_name).ok_or_else(|| {
            HostError::type_mismatch(position, type_name, self.type_name_at(position))
        })
    }
}
