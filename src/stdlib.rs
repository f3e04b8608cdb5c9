//! Built-in globals: `clock`, and the native classes `Array`, `String` and
//! `Math`.

use std::cell::RefCell;
use std::rc::Rc;

use log::{debug, info};

use crate::callable::{NativeCallable, NativeFunction};
use crate::class::{Construction, LoxClass, LoxInstance, NativeData};
use crate::environment::Environment;
use crate::error::RuntimeError;
use crate::interpreter::Interpreter;
use crate::token::Token;
use crate::value::{format_number, Value};

type NResult = Result<Value, RuntimeError>;

/// Define every built-in in the global scope. Returns the `String` class,
/// which also serves method lookups on primitive strings.
pub fn install(globals: &mut Environment) -> Rc<LoxClass> {
    debug!("Defining native function 'clock'");
    globals.define(
        "clock",
        Value::Native(NativeCallable::unbound(NativeFunction::new("clock", 0, clock))),
    );

    let array = array_class();
    let string = string_class();
    let math = math_class();

    for class in [&array, &string, &math] {
        debug!("Defining native class '{}'", class.name);
        globals.define(&class.name, Value::Class(Rc::clone(class)));
    }

    info!("Standard library installed");
    string
}

fn clock(_: Option<&Value>, _: &[Value], _: &Token, _: &mut Interpreter) -> NResult {
    let now = chrono::Utc::now();
    Ok(Value::Number(now.timestamp_millis() as f64 / 1000.0))
}

// ─────────────────────────────────────────────────────────────────────────────
// Index helpers, shared with the evaluator's `[]` operator
// ─────────────────────────────────────────────────────────────────────────────

/// Validate `index` against a sequence of `len` elements.
pub fn checked_index(index: &Value, len: usize, token: &Token) -> Result<usize, RuntimeError> {
    match index {
        Value::Number(n) if n.fract() == 0.0 => {
            if *n < 0.0 || *n >= len as f64 {
                Err(RuntimeError::new(
                    token,
                    format!("Index out of bounds: {}.", format_number(*n)),
                ))
            } else {
                Ok(*n as usize)
            }
        }

        other => Err(RuntimeError::new(
            token,
            format!("Index must be an integer, got {}.", other.type_name()),
        )),
    }
}

/// The one-character string at `index` (counted in characters, not bytes).
pub fn char_at(s: &str, index: &Value, token: &Token) -> NResult {
    let i = checked_index(index, s.chars().count(), token)?;
    let c = s.chars().nth(i).map(String::from).unwrap_or_default();
    Ok(Value::str(&c))
}

fn number_arg(args: &[Value], i: usize, function: &str, token: &Token) -> Result<f64, RuntimeError> {
    match args.get(i) {
        Some(Value::Number(n)) => Ok(*n),
        other => Err(RuntimeError::new(
            token,
            format!(
                "Argument to '{}' must be a number, got {}.",
                function,
                other.map_or("nil", Value::type_name)
            ),
        )),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Array
// ─────────────────────────────────────────────────────────────────────────────

fn array_class() -> Rc<LoxClass> {
    Rc::new(LoxClass::native(
        "Array",
        vec![
            NativeFunction::new("length", 0, array_length),
            NativeFunction::new("push", 1, array_push),
            NativeFunction::new("pop", 0, array_pop),
            NativeFunction::new("shift", 0, array_shift),
            NativeFunction::new("getAt", 1, array_get_at),
            NativeFunction::new("setAt", 2, array_set_at),
        ],
        Vec::new(),
        Vec::new(),
        Construction::Native {
            arity: 0,
            body: new_array,
        },
    ))
}

fn new_array(class: &Rc<LoxClass>, _: &[Value], _: &Token) -> NResult {
    let instance = LoxInstance::with_data(Rc::clone(class), NativeData::Array(Vec::new()));
    Ok(Value::Instance(Rc::new(RefCell::new(instance))))
}

/// Run `f` on the receiver's elements, rejecting anything that is not an
/// `Array` instance.
fn with_array<T>(
    receiver: Option<&Value>,
    token: &Token,
    f: impl FnOnce(&mut Vec<Value>) -> Result<T, RuntimeError>,
) -> Result<T, RuntimeError> {
    if let Some(Value::Instance(instance)) = receiver {
        if let NativeData::Array(items) = &mut instance.borrow_mut().data {
            return f(items);
        }
    }

    Err(RuntimeError::new(token, "Method called on non-Array instance."))
}

fn array_length(receiver: Option<&Value>, _: &[Value], token: &Token, _: &mut Interpreter) -> NResult {
    with_array(receiver, token, |items| Ok(Value::Number(items.len() as f64)))
}

fn array_push(receiver: Option<&Value>, args: &[Value], token: &Token, _: &mut Interpreter) -> NResult {
    with_array(receiver, token, |items| {
        items.push(args[0].clone());
        Ok(Value::Number(items.len() as f64))
    })
}

fn array_pop(receiver: Option<&Value>, _: &[Value], token: &Token, _: &mut Interpreter) -> NResult {
    with_array(receiver, token, |items| {
        items
            .pop()
            .ok_or_else(|| RuntimeError::new(token, "Cannot pop from empty array."))
    })
}

fn array_shift(receiver: Option<&Value>, _: &[Value], token: &Token, _: &mut Interpreter) -> NResult {
    with_array(receiver, token, |items| {
        if items.is_empty() {
            return Err(RuntimeError::new(token, "Cannot shift from empty array."));
        }
        Ok(items.remove(0))
    })
}

fn array_get_at(receiver: Option<&Value>, args: &[Value], token: &Token, _: &mut Interpreter) -> NResult {
    with_array(receiver, token, |items| {
        let i = checked_index(&args[0], items.len(), token)?;
        Ok(items[i].clone())
    })
}

fn array_set_at(receiver: Option<&Value>, args: &[Value], token: &Token, _: &mut Interpreter) -> NResult {
    with_array(receiver, token, |items| {
        let i = checked_index(&args[0], items.len(), token)?;
        items[i] = args[1].clone();
        Ok(args[1].clone())
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// String
// ─────────────────────────────────────────────────────────────────────────────

fn string_class() -> Rc<LoxClass> {
    Rc::new(LoxClass::native(
        "String",
        vec![
            NativeFunction::new("length", 0, string_length),
            NativeFunction::new("charAt", 1, string_char_at),
            NativeFunction::new("toUpperCase", 0, string_to_upper),
            NativeFunction::new("toLowerCase", 0, string_to_lower),
        ],
        Vec::new(),
        Vec::new(),
        Construction::Native {
            arity: 1,
            body: new_string,
        },
    ))
}

fn new_string(class: &Rc<LoxClass>, args: &[Value], _: &Token) -> NResult {
    let text: Rc<str> = match &args[0] {
        Value::Str(s) => Rc::clone(s),
        other => Rc::from(other.to_string()),
    };

    let instance = LoxInstance::with_data(Rc::clone(class), NativeData::Str(text));
    Ok(Value::Instance(Rc::new(RefCell::new(instance))))
}

/// Text of a primitive string or a `String` instance.
fn receiver_text(receiver: Option<&Value>, token: &Token) -> Result<Rc<str>, RuntimeError> {
    match receiver {
        Some(Value::Str(s)) => Ok(Rc::clone(s)),
        Some(Value::Instance(instance)) => match &instance.borrow().data {
            NativeData::Str(s) => Ok(Rc::clone(s)),
            _ => Err(RuntimeError::new(token, "Method called on non-String instance.")),
        },
        _ => Err(RuntimeError::new(token, "Method called on non-String instance.")),
    }
}

fn string_length(receiver: Option<&Value>, _: &[Value], token: &Token, _: &mut Interpreter) -> NResult {
    let text = receiver_text(receiver, token)?;
    Ok(Value::Number(text.chars().count() as f64))
}

fn string_char_at(receiver: Option<&Value>, args: &[Value], token: &Token, _: &mut Interpreter) -> NResult {
    let text = receiver_text(receiver, token)?;
    char_at(&text, &args[0], token)
}

fn string_to_upper(receiver: Option<&Value>, _: &[Value], token: &Token, _: &mut Interpreter) -> NResult {
    let text = receiver_text(receiver, token)?;
    Ok(Value::str(&text.to_uppercase()))
}

fn string_to_lower(receiver: Option<&Value>, _: &[Value], token: &Token, _: &mut Interpreter) -> NResult {
    let text = receiver_text(receiver, token)?;
    Ok(Value::str(&text.to_lowercase()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Math
// ─────────────────────────────────────────────────────────────────────────────

fn math_class() -> Rc<LoxClass> {
    Rc::new(LoxClass::native(
        "Math",
        Vec::new(),
        vec![
            NativeFunction::new("abs", 1, math_abs),
            NativeFunction::new("floor", 1, math_floor),
            NativeFunction::new("ceil", 1, math_ceil),
            NativeFunction::new("sqrt", 1, math_sqrt),
            NativeFunction::new("min", 2, math_min),
            NativeFunction::new("max", 2, math_max),
        ],
        vec![
            ("PI", Value::Number(std::f64::consts::PI)),
            ("E", Value::Number(std::f64::consts::E)),
        ],
        Construction::Forbidden,
    ))
}

fn math_abs(_: Option<&Value>, args: &[Value], token: &Token, _: &mut Interpreter) -> NResult {
    Ok(Value::Number(number_arg(args, 0, "abs", token)?.abs()))
}

fn math_floor(_: Option<&Value>, args: &[Value], token: &Token, _: &mut Interpreter) -> NResult {
    Ok(Value::Number(number_arg(args, 0, "floor", token)?.floor()))
}

fn math_ceil(_: Option<&Value>, args: &[Value], token: &Token, _: &mut Interpreter) -> NResult {
    Ok(Value::Number(number_arg(args, 0, "ceil", token)?.ceil()))
}

fn math_sqrt(_: Option<&Value>, args: &[Value], token: &Token, _: &mut Interpreter) -> NResult {
    Ok(Value::Number(number_arg(args, 0, "sqrt", token)?.sqrt()))
}

fn math_min(_: Option<&Value>, args: &[Value], token: &Token, _: &mut Interpreter) -> NResult {
    let a = number_arg(args, 0, "min", token)?;
    let b = number_arg(args, 1, "min", token)?;
    Ok(Value::Number(a.min(b)))
}

fn math_max(_: Option<&Value>, args: &[Value], token: &Token, _: &mut Interpreter) -> NResult {
    let a = number_arg(args, 0, "max", token)?;
    let b = number_arg(args, 1, "max", token)?;
    Ok(Value::Number(a.max(b)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenType;

    fn token() -> Token {
        Token::new(TokenType::LEFT_BRACKET, "[".to_string(), 1)
    }

    #[test]
    fn checked_index_accepts_integers_in_range() {
        assert_eq!(checked_index(&Value::Number(2.0), 3, &token()).unwrap(), 2);
    }

    #[test]
    fn checked_index_rejects_fractions_and_out_of_range() {
        let err = checked_index(&Value::Number(1.5), 3, &token()).unwrap_err();
        assert_eq!(err.message, "Index must be an integer, got number.");

        let err = checked_index(&Value::Number(-1.0), 3, &token()).unwrap_err();
        assert_eq!(err.message, "Index out of bounds: -1.");

        let err = checked_index(&Value::str("0"), 3, &token()).unwrap_err();
        assert_eq!(err.message, "Index must be an integer, got string.");
    }

    #[test]
    fn char_at_counts_characters() {
        let c = char_at("héllo", &Value::Number(1.0), &token()).unwrap();
        assert_eq!(c, Value::str("é"));
    }
}
