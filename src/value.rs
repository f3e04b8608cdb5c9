use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::callable::{LoxFunction, NativeCallable};
use crate::class::{LoxClass, LoxInstance, NativeData};
use crate::token::LiteralValue;

thread_local! {
    /// Arrays whose `Display` is in progress on this thread.
    static PRINTING: RefCell<Vec<*const RefCell<LoxInstance>>> = const { RefCell::new(Vec::new()) };
}

/// A runtime value.
///
/// Scalars are stored inline; strings share one immutable buffer; classes and
/// instances are shared by reference (an instance is mutable through its
/// `RefCell`, a class only through its static‑field table).
#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    Function(LoxFunction),
    Native(NativeCallable),
    Class(Rc<LoxClass>),
    Instance(Rc<RefCell<LoxInstance>>),
}

impl Value {
    pub fn str(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }

    /// Everything except `nil` and `false` is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    /// Category name used in type‑mismatch messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Function(_) | Value::Native(_) => "function",
            Value::Class(_) => "class",
            Value::Instance(_) => "instance",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a == b,
            (Value::Native(a), Value::Native(b)) => a == b,
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<&LiteralValue> for Value {
    fn from(literal: &LiteralValue) -> Self {
        match literal {
            LiteralValue::Number(n) => Value::Number(*n),
            LiteralValue::Str(s) => Value::str(s),
            LiteralValue::True => Value::Bool(true),
            LiteralValue::False => Value::Bool(false),
            LiteralValue::Nil => Value::Nil,
        }
    }
}

/// Integral numbers print without a fractional part, `-0` keeps its sign.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == 0.0 && n.is_sign_negative() {
        "-0".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        let mut buf = itoa::Buffer::new();
        buf.format(n as i64).to_string()
    } else {
        n.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),

            Value::Bool(b) => write!(f, "{}", b),

            Value::Number(n) => write!(f, "{}", format_number(*n)),

            Value::Str(s) => write!(f, "{}", s),

            Value::Function(func) => match func.name() {
                Some(name) => write!(f, "<fn {}>", name),
                None => write!(f, "<fn>"),
            },

            Value::Native(native) => write!(f, "<native fn {}>", native.function.name),

            Value::Class(class) if class.is_native() => write!(f, "<native class {}>", class.name),

            Value::Class(class) => write!(f, "{}", class.name),

            Value::Instance(cell) => {
                let instance = cell.borrow();

                match &instance.data {
                    NativeData::Array(items) => write_array(f, Rc::as_ptr(cell), items),

                    NativeData::Str(s) => write!(f, "{}", s),

                    NativeData::None => write!(f, "{} instance", instance.class.name),
                }
            }
        }
    }
}

/// `[a, b]`, or `[...]` for an array already being printed further up.
fn write_array(
    f: &mut fmt::Formatter<'_>,
    array: *const RefCell<LoxInstance>,
    items: &[Value],
) -> fmt::Result {
    if PRINTING.with(|printing| printing.borrow().contains(&array)) {
        return write!(f, "[...]");
    }

    PRINTING.with(|printing| printing.borrow_mut().push(array));
    let result = write_items(f, items);
    PRINTING.with(|printing| printing.borrow_mut().pop());

    result
}

fn write_items(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
    write!(f, "[")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    write!(f, "]")
}
