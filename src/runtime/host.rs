use std::collections::HashMap;
use std::rc::Rc;

use crate::lang::value::Value;
use crate::runtime::memory::Memory2D;
use crate::runtime::runtime_error::RuntimeError;
use crate::runtime::vm::Vm;

/// A named host operation invoked by the CUSTOM opcode. It gets the whole
/// machine: stack access, the raw fetch primitive for custom variable-length
/// operands, and the host capabilities hanging off the machine.
pub type HostOp = Rc<dyn Fn(&mut Vm) -> Result<Option<Value>, RuntimeError>>;

/// Where the VM gets its memory grid from.
pub enum MemoryBackend {
    /// The default 256x256 grid.
    Default,
    /// A host-supplied grid (custom bit split or pre-seeded contents).
    Grid(Memory2D),
    /// No grid; MEM_READ/MEM_WRITE fail with the missing-backend condition.
    Disabled,
}

/// Host capabilities handed to an execution: print and log sinks, the named
/// value namespace served by LOAD_HOST, the custom operation registry for
/// CUSTOM, the value-to-int serialization fallback used by CAST, and the
/// memory backend selection.
pub struct HostApi {
    pub debug: bool,
    pub memory: MemoryBackend,
    values: HashMap<String, Value>,
    ops: HashMap<String, HostOp>,
    print: Rc<dyn Fn(&str)>,
    log: Rc<dyn Fn(&str, &str)>,
    serialize: Rc<dyn Fn(&Value) -> i32>,
}

impl std::fmt::Debug for HostApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostApi")
            .field("debug", &self.debug)
            .field("values", &self.values.keys().collect::<Vec<_>>())
            .field("ops", &self.ops.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Default for HostApi {
    fn default() -> Self {
        let print: Rc<dyn Fn(&str)> = Rc::new(|line| println!("{}", line));
        let mut values = HashMap::new();

        // `print` is an ordinary first-class host value: loadable with
        // LOAD_HOST and callable with CALL_ANY
        let sink = print.clone();
        values.insert(
            "print".to_string(),
            Value::native(move |args| {
                let line = args
                    .iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join(" ");
                sink(&line);
                Value::Undefined
            }),
        );

        HostApi {
            debug: false,
            memory: MemoryBackend::Default,
            values,
            ops: HashMap::new(),
            print,
            log: Rc::new(|level, msg| eprintln!("[{}] {}", level.to_uppercase(), msg)),
            serialize: Rc::new(default_serialize),
        }
    }
}

impl HostApi {
    /// Named-value lookup backing LOAD_HOST. Unknown names are Undefined,
    /// not an error.
    pub fn req(&self, name: &str) -> Value {
        self.values.get(name).cloned().unwrap_or(Value::Undefined)
    }

    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn register_op(
        &mut self,
        name: impl Into<String>,
        op: impl Fn(&mut Vm) -> Result<Option<Value>, RuntimeError> + 'static,
    ) {
        self.ops.insert(name.into(), Rc::new(op));
    }

    /// Cloned out so the caller can invoke it while mutably holding the VM.
    pub fn op(&self, name: &str) -> Option<HostOp> {
        self.ops.get(name).cloned()
    }

    pub fn print(&self, line: &str) {
        (self.print)(line);
    }

    /// Diagnostics sink. Trace-level messages are dropped unless debug is
    /// on; warnings and errors always go through.
    pub fn log(&self, level: &str, msg: &str) {
        if level == "trace" && !self.debug {
            return;
        }
        (self.log)(level, msg);
    }

    pub fn serialize(&self, value: &Value) -> i32 {
        (self.serialize)(value)
    }

    pub fn set_print(&mut self, sink: impl Fn(&str) + 'static) {
        self.print = Rc::new(sink);
    }

    pub fn set_log(&mut self, sink: impl Fn(&str, &str) + 'static) {
        self.log = Rc::new(sink);
    }

    pub fn set_serialize(&mut self, f: impl Fn(&Value) -> i32 + 'static) {
        self.serialize = Rc::new(f);
    }

    /// Structured abort for host operations that need to stop the machine
    /// with their own classification.
    pub fn abort(code: u16, message: impl Into<String>) -> RuntimeError {
        RuntimeError::HostAbort {
            code,
            message: message.into(),
        }
    }
}

/// Structural value-to-int fallback: numbers pass through, numeric strings
/// parse, and everything else reduces to its size (length, element count,
/// key count; functions and generators are 0).
pub fn default_serialize(value: &Value) -> i32 {
    match value {
        Value::Undefined => 0,
        Value::Int(n) => *n,
        Value::Str(s) => match s.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => n.trunc() as i64 as i32,
            _ => s.chars().count() as i32,
        },
        Value::Arr(items) => items.borrow().len() as i32,
        Value::Obj(map) => map.borrow().len() as i32,
        Value::Func(_) | Value::Native(_) | Value::Gen(_) => 0,
    }
}
