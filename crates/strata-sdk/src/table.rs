//! Table: the host engine's associative container
//!
//! A table has a sequence part (1-based, contiguous, no trailing nils) and a
//! string-keyed record part. Integer keys written past the end of the
//! sequence are parked in a sparse map and migrate into the sequence once
//! the gap closes, so a border length (`raw_len`) is always well defined.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use crate::value::Value;

/// Shared table reference
pub type TableRef = Rc<RefCell<Table>>;

/// Host table
#[derive(Debug, Default)]
pub struct Table {
    array: Vec<Value>,
    sparse: BTreeMap<usize, Value>,
    fields: HashMap<String, Value>,
    metatable: Option<TableRef>,
}

impl Table {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table with preallocated sequence and record parts
    pub fn with_capacity(narr: usize, nrec: usize) -> Self {
        Table {
            array: Vec::with_capacity(narr),
            fields: HashMap::with_capacity(nrec),
            ..Self::default()
        }
    }

    /// Wrap into a shared reference
    pub fn into_ref(self) -> TableRef {
        Rc::new(RefCell::new(self))
    }

    /// Border length of the sequence part
    pub fn raw_len(&self) -> usize {
        self.array.len()
    }

    /// Sequence part as a slice (index 0 is key 1)
    pub fn sequence(&self) -> &[Value] {
        &self.array
    }

    /// Get the value at a 1-based integer key
    pub fn raw_get_index(&self, index: usize) -> Value {
        if index == 0 {
            return Value::Nil;
        }
        match self.array.get(index - 1) {
            Some(v) => v.clone(),
            None => self.sparse.get(&index).cloned().unwrap_or_default(),
        }
    }

    /// Set the value at a 1-based integer key
    pub fn raw_set_index(&mut self, index: usize, value: Value) {
        if index == 0 {
            return;
        }
        let len = self.array.len();
        if index <= len {
            if value.is_nil() {
                // Assigning nil inside the sequence moves the border down
                let tail = self.array.split_off(index - 1);
                for (offset, v) in tail.into_iter().enumerate().skip(1) {
                    self.sparse.insert(index + offset, v);
                }
            } else {
                self.array[index - 1] = value;
            }
        } else if index == len + 1 {
            if value.is_nil() {
                return;
            }
            self.array.push(value);
            self.migrate_sparse();
        } else if value.is_nil() {
            self.sparse.remove(&index);
        } else {
            self.sparse.insert(index, value);
        }
    }

    /// Append after the current border
    pub fn push(&mut self, value: Value) {
        let next = self.array.len() + 1;
        self.raw_set_index(next, value);
    }

    /// Get a string-keyed field
    pub fn get_field(&self, name: &str) -> Value {
        self.fields.get(name).cloned().unwrap_or_default()
    }

    /// Set a string-keyed field; nil removes it
    pub fn set_field(&mut self, name: &str, value: Value) {
        if value.is_nil() {
            self.fields.remove(name);
        } else {
            self.fields.insert(name.to_string(), value);
        }
    }

    /// Names of all string-keyed fields
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.keys().map(String::as_str).collect()
    }

    /// Metatable, if any
    pub fn metatable(&self) -> Option<&TableRef> {
        self.metatable.as_ref()
    }

    /// Replace the metatable
    pub fn set_metatable(&mut self, mt: Option<TableRef>) {
        self.metatable = mt;
    }

    fn migrate_sparse(&mut self) {
        while let Some(v) = self.sparse.remove(&(self.array.len() + 1)) {
            self.array.push(v);
        }
    }
}
