//! strata.File methods
//!
//! Failures return `nil, "<op>: <message>"`. Using a closed handle raises an
//! argument error.

use std::cell::RefCell;
use std::rc::Rc;

use strata_sdk::handler::fail_values;
use strata_sdk::{AbiResult, Args, CallResult, HostContext, HostError, TableRef, UserData, Value};
use strata_vfs::ErrorCode;

use crate::error::{FileError, FILE_TYPE};
use crate::file::{FileHandle, ReadRequest, ReadValue};
use crate::format::FormatTag;
use crate::vfs::VfsFile;

/// Wrap an open file as script userdata
pub fn new_file(file: VfsFile, chunk_size: usize, metatable: &TableRef) -> Value {
    let handle = FileHandle::new(file, chunk_size);
    Value::UserData(UserData::new(FILE_TYPE, handle, Some(metatable.clone())))
}

/// The handle at `position`, which must be open
pub fn check_file(args: &Args<'_>, position: usize) -> AbiResult<Rc<RefCell<FileHandle>>> {
    let handle = args.check_userdata::<FileHandle>(position, FILE_TYPE)?;
    if !handle.borrow().is_open() {
        return Err(HostError::argument(position, FileError::Closed.to_string()));
    }
    Ok(handle)
}

/// `nil, message` (plus extras) for a recoverable failure
fn failure(error: &FileError) -> Vec<Value> {
    let mut values = vec![Value::Nil, Value::from(error.to_string())];
    match error {
        FileError::Write(partial) => values.push(Value::Integer(partial.written as i64)),
        FileError::WriteInt { index, .. } => values.push(Value::Integer(*index as i64)),
        _ => {}
    }
    values
}

fn non_negative(args: &Args<'_>, position: usize) -> AbiResult<Option<u64>> {
    let n = args.check_integer(position)?;
    Ok(u64::try_from(n).ok())
}

impl From<ReadValue> for Value {
    fn from(value: ReadValue) -> Self {
        match value {
            ReadValue::Bytes(bytes) => Value::from(bytes),
            ReadValue::Integer(n) => Value::Integer(n),
        }
    }
}

/// Classify one `read` argument
fn classify(args: &Args<'_>, position: usize) -> AbiResult<ReadRequest> {
    match args.get(position) {
        Value::Integer(_) | Value::Number(_) => {
            let n = args.check_integer(position)?;
            usize::try_from(n)
                .map(ReadRequest::ByteCount)
                .map_err(|_| HostError::argument(position, "byte count must be non-negative"))
        }
        Value::String(_) => {
            let request = args.check_str(position)?;
            ReadRequest::parse(request).map_err(|e| HostError::argument(position, e.to_string()))
        }
        other => Err(HostError::type_mismatch(
            position,
            "number or string",
            other.type_name(),
        )),
    }
}

/// Run a method body, turning recoverable failures into return values
fn run(
    values: &[Value],
    body: impl FnOnce(&Args<'_>, &mut FileHandle) -> Result<Vec<Value>, FileError>,
) -> CallResult {
    let args = Args::new(values);
    let handle = match check_file(&args, 1) {
        Ok(handle) => handle,
        Err(e) => return e.into(),
    };
    let result = body(&args, &mut handle.borrow_mut());
    match result {
        Ok(values) => CallResult::Values(values),
        Err(e) => CallResult::Values(failure(&e)),
    }
}

// ============================================================================
// Methods
// ============================================================================

/// `file:close()`. Closing anything but an open handle is a no-op.
pub fn close(_ctx: &dyn HostContext, values: &[Value]) -> CallResult {
    let args = Args::new(values);
    if let Some(handle) = args.test_userdata::<FileHandle>(1, FILE_TYPE) {
        if let Err(e) = handle.borrow_mut().close() {
            return CallResult::Values(failure(&e));
        }
    }
    CallResult::one(args.get(1))
}

/// `file:eof()`
pub fn eof(_ctx: &dyn HostContext, values: &[Value]) -> CallResult {
    run(values, |_, file| Ok(vec![Value::Boolean(file.eof()?)]))
}

/// `file:tell()`
pub fn tell(_ctx: &dyn HostContext, values: &[Value]) -> CallResult {
    run(values, |_, file| Ok(vec![Value::Integer(file.tell()? as i64)]))
}

/// `file:length()`
pub fn length(_ctx: &dyn HostContext, values: &[Value]) -> CallResult {
    run(values, |_, file| Ok(vec![Value::Integer(file.length()? as i64)]))
}

/// `#file`: like `length` but raises on failure
pub fn len(ctx: &dyn HostContext, values: &[Value]) -> CallResult {
    match length(ctx, values) {
        CallResult::Values(v) if v.first().is_some_and(Value::is_nil) => {
            let message = v.get(1).and_then(Value::to_str).unwrap_or("length").to_string();
            CallResult::Error(HostError::Runtime(message))
        }
        other => other,
    }
}

/// `file:seek(offset)`
pub fn seek(_ctx: &dyn HostContext, values: &[Value]) -> CallResult {
    let args = Args::new(values);
    let pos = match non_negative(&args, 2) {
        Ok(pos) => pos,
        Err(e) => return e.into(),
    };
    run(values, |args, file| {
        match pos {
            Some(pos) => file.seek(pos)?,
            None => return Ok(fail_values("seek", ErrorCode::InvalidArgument)),
        }
        Ok(vec![args.get(1)])
    })
}

/// `file:bufSize(n)`
pub fn buf_size(_ctx: &dyn HostContext, values: &[Value]) -> CallResult {
    let args = Args::new(values);
    let size = match non_negative(&args, 2) {
        Ok(size) => size,
        Err(e) => return e.into(),
    };
    run(values, |args, file| {
        match size {
            Some(size) => file.set_buffer_size(size)?,
            None => return Ok(fail_values("bufSize", ErrorCode::InvalidArgument)),
        }
        Ok(vec![args.get(1)])
    })
}

/// `file:flush()`
pub fn flush(_ctx: &dyn HostContext, values: &[Value]) -> CallResult {
    run(values, |args, file| {
        file.flush()?;
        Ok(vec![args.get(1)])
    })
}

/// `file:read(...)`.
///
/// Each argument is a byte count, `"a"` for everything, or a scalar format.
/// No arguments reads everything. Strings are never coerced to counts:
/// `read("4")` reads a 4-byte integer and `read("5")` is a format error. On
/// failure the values read so far come back first, then `nil, message`.
pub fn read(_ctx: &dyn HostContext, values: &[Value]) -> CallResult {
    let args = Args::new(values);
    let requests: AbiResult<Vec<ReadRequest>> = if args.len() <= 1 {
        Ok(vec![ReadRequest::ReadAll])
    } else {
        (2..=args.len()).map(|i| classify(&args, i)).collect()
    };
    let requests = match requests {
        Ok(requests) => requests,
        Err(e) => return e.into(),
    };
    run(values, |_, file| match file.read(&requests) {
        Ok(read) => Ok(read.into_iter().map(Value::from).collect()),
        Err(partial) => {
            let mut out: Vec<Value> = partial.values.into_iter().map(Value::from).collect();
            out.extend(failure(&partial.error));
            Ok(out)
        }
    })
}

/// `file:write(...)`. Returns the file, or `nil, message, written`.
pub fn write(_ctx: &dyn HostContext, values: &[Value]) -> CallResult {
    let args = Args::new(values);
    let chunks: AbiResult<Vec<&[u8]>> = (2..=args.len()).map(|i| args.check_bytes(i)).collect();
    let chunks = match chunks {
        Ok(chunks) => chunks,
        Err(e) => return e.into(),
    };
    run(values, |args, file| {
        file.write(&chunks)?;
        Ok(vec![args.get(1)])
    })
}

/// `file:writeInt(fmt, ...)`. Returns the file, or `nil, message, index`.
pub fn write_int(_ctx: &dyn HostContext, values: &[Value]) -> CallResult {
    let args = Args::new(values);
    let parsed = args.check_str(2).and_then(|fmt| {
        FormatTag::parse(fmt).map_err(|e| HostError::argument(2, e.to_string()))
    });
    let tag = match parsed {
        Ok(tag) => tag,
        Err(e) => return e.into(),
    };
    let numbers: AbiResult<Vec<i64>> = (3..=args.len()).map(|i| args.check_integer(i)).collect();
    let numbers = match numbers {
        Ok(numbers) => numbers,
        Err(e) => return e.into(),
    };
    run(values, |args, file| {
        file.write_typed(tag, &numbers)?;
        Ok(vec![args.get(1)])
    })
}

/// `tostring(file)`
pub fn tostring(_ctx: &dyn HostContext, values: &[Value]) -> CallResult {
    let args = Args::new(values);
    let Some(handle) = args.test_userdata::<FileHandle>(1, FILE_TYPE) else {
        return CallResult::none();
    };
    if !handle.borrow().is_open() {
        return CallResult::one(format!("{}: (null)", FILE_TYPE));
    }
    let address = args.get(1).as_userdata().map_or(0, UserData::address);
    CallResult::one(format!("{}: {:#x}", FILE_TYPE, address))
}
