//! Value: the host engine's dynamically typed value
//!
//! Scalars are stored inline; strings are immutable byte strings shared by
//! reference count; tables, functions and userdata are shared references.
//! The engine is single-threaded, so sharing uses `Rc`.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::context::HostContext;
use crate::handler::CallResult;
use crate::table::{Table, TableRef};

/// A host engine value.
#[derive(Clone, Default)]
pub enum Value {
    /// Absence of a value
    #[default]
    Nil,
    /// Boolean
    Boolean(bool),
    /// Native integer (always 64-bit)
    Integer(i64),
    /// Floating point number
    Number(f64),
    /// Immutable byte string (not necessarily UTF-8)
    String(Rc<[u8]>),
    /// Table reference
    Table(TableRef),
    /// Native function
    Function(NativeFunction),
    /// Full userdata with an optional metatable
    UserData(UserData),
}

impl Value {
    /// Create a string value from bytes or text
    pub fn string(s: impl AsRef<[u8]>) -> Self {
        Value::String(Rc::from(s.as_ref()))
    }

    /// Create a value wrapping a fresh table
    pub fn table(table: Table) -> Self {
        Value::Table(table.into_ref())
    }

    /// Engine type name, as reported in argument errors
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) | Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Table(_) => "table",
            Value::Function(_) => "function",
            Value::UserData(_) => "userdata",
        }
    }

    /// Check if this is nil
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Truthiness: only `nil` and `false` are false
    pub fn truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Boolean(false))
    }

    /// Get as boolean if this is a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as integer. Floats with an exact integer representation convert.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Number(f) if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64 => {
                Some(*f as i64)
            }
            _ => None,
        }
    }

    /// Get the raw bytes of a string value
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get a string value as UTF-8 text
    pub fn to_str(&self) -> Option<&str> {
        self.as_bytes().and_then(|b| std::str::from_utf8(b).ok())
    }

    /// Get as table reference
    pub fn as_table(&self) -> Option<&TableRef> {
        match self {
            Value::Table(t) => Some(t),
            _ => None,
        }
    }

    /// Get as native function
    pub fn as_function(&self) -> Option<&NativeFunction> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Get as userdata
    pub fn as_userdata(&self) -> Option<&UserData> {
        match self {
            Value::UserData(u) => Some(u),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Integer(a), Value::Number(b)) | (Value::Number(b), Value::Integer(a)) => {
                *a as f64 == *b
            }
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Table(a), Value::Table(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            (Value::UserData(a), Value::UserData(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{:?}", String::from_utf8_lossy(s)),
            Value::Table(t) => write!(f, "table: {:p}", Rc::as_ptr(t)),
            Value::Function(func) => write!(f, "function: {:#x}", func.address()),
            Value::UserData(u) => write!(f, "{}: {:#x}", u.type_name(), u.address()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Number(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::string(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::String(Rc::from(bytes))
    }
}

impl From<TableRef> for Value {
    fn from(t: TableRef) -> Self {
        Value::Table(t)
    }
}

impl From<NativeFunction> for Value {
    fn from(f: NativeFunction) -> Self {
        Value::Function(f)
    }
}

impl From<UserData> for Value {
    fn from(u: UserData) -> Self {
        Value::UserData(u)
    }
}

// ============================================================================
// Native Function
// ============================================================================

type NativeFnInner = dyn Fn(&dyn HostContext, &[Value]) -> CallResult;

/// A native function callable from scripts.
///
/// Receives the host context and the positional arguments; returns either
/// a list of results or a raised error.
#[derive(Clone)]
pub struct NativeFunction(Rc<NativeFnInner>);

impl NativeFunction {
    /// Wrap a closure
    pub fn new(f: impl Fn(&dyn HostContext, &[Value]) -> CallResult + 'static) -> Self {
        NativeFunction(Rc::new(f))
    }

    /// Invoke the function
    pub fn call(&self, ctx: &dyn HostContext, args: &[Value]) -> CallResult {
        (self.0)(ctx, args)
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &NativeFunction) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn address(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeFunction({:#x})", self.address())
    }
}

// ============================================================================
// UserData
// ============================================================================

/// Full userdata: an opaque native object owned by the engine.
///
/// The payload lives in a `RefCell` so methods can mutate it through a
/// shared reference. The metatable carries the methods scripts can call.
#[derive(Clone)]
pub struct UserData {
    type_name: &'static str,
    metatable: Option<TableRef>,
    data: Rc<dyn Any>,
}

impl UserData {
    /// Wrap a native object
    pub fn new<T: Any>(type_name: &'static str, value: T, metatable: Option<TableRef>) -> Self {
        UserData {
            type_name,
            metatable,
            data: Rc::new(RefCell::new(value)),
        }
    }

    /// The registered type name (e.g. "strata.File")
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Metatable, if any
    pub fn metatable(&self) -> Option<&TableRef> {
        self.metatable.as_ref()
    }

    /// Downcast the payload. Returns `None` if it is not a `T`.
    pub fn downcast<T: Any>(&self) -> Option<Rc<RefCell<T>>> {
        self.data.clone().downcast::<RefCell<T>>().ok()
    }

    /// Look up a method in the metatable
    pub fn method(&self, name: &str) -> Option<NativeFunction> {
        let mt = self.metatable.as_ref()?;
        let value = mt.borrow().get_field(name);
        value.as_function().cloned()
    }

    /// Call a method with `self` prepended to the arguments
    pub fn call_method(&self, ctx: &dyn HostContext, name: &str, args: &[Value]) -> CallResult {
        match self.method(name) {
            Some(f) => {
                let mut full = Vec::with_capacity(args.len() + 1);
                full.push(Value::UserData(self.clone()));
                full.extend_from_slice(args);
                f.call(ctx, &full)
            }
            None => CallResult::Error(format!("attempt to call a nil value (method '{}')", name).into()),
        }
    }

    /// Stable address of the payload, used for display
    pub fn address(&self) -> usize {
        Rc::as_ptr(&self.data) as *const () as usize
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &UserData) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }
}

impl fmt::Debug for UserData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserData({}: {:#x})", self.type_name, self.address())
    }
}
