//! Callable values other than classes: user functions/closures and host
//! (native) functions.
//!
//! Binding a callable to a receiver always builds a new value around the
//! shared, immutable definition. Nothing shared is ever rewritten, so one
//! method or native definition can be bound to any number of receivers at
//! once.

use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::ast::FunctionDecl;
use crate::environment::{EnvRef, Environment};
use crate::error::RuntimeError;
use crate::interpreter::{Flow, Interpreter};
use crate::token::Token;
use crate::value::Value;

/// Host body of a native function: `(receiver, arguments, call site, evaluator)`.
pub type NativeFn =
    fn(Option<&Value>, &[Value], &Token, &mut Interpreter) -> Result<Value, RuntimeError>;

/// A function or method declared in the script, with the scope it closes over.
#[derive(Clone)]
pub struct LoxFunction {
    pub declaration: Rc<FunctionDecl>,
    pub closure: EnvRef,
    pub is_initializer: bool,

    /// Receiver visible as `this` inside the body; set by [`LoxFunction::bind`].
    pub this: Option<Box<Value>>,
}

impl LoxFunction {
    pub fn new(declaration: Rc<FunctionDecl>, closure: EnvRef, is_initializer: bool) -> Self {
        Self {
            declaration,
            closure,
            is_initializer,
            this: None,
        }
    }

    pub fn arity(&self) -> usize {
        self.declaration.arity()
    }

    pub fn name(&self) -> Option<&str> {
        self.declaration.name()
    }

    /// A copy of this function whose calls see `receiver` as `this`.
    pub fn bind(&self, receiver: Value) -> LoxFunction {
        LoxFunction {
            declaration: Rc::clone(&self.declaration),
            closure: Rc::clone(&self.closure),
            is_initializer: self.is_initializer,
            this: Some(Box::new(receiver)),
        }
    }

    /// Run the body in a fresh scope chained to the closure (with a `this`
    /// layer in between for bound methods). Arity is checked by the caller.
    pub fn call(&self, interpreter: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeError> {
        debug!(
            "Calling user-defined function '{}'",
            self.name().unwrap_or("<anonymous>")
        );

        let mut parent = Rc::clone(&self.closure);

        if let Some(this) = &self.this {
            let layer = Environment::with_enclosing(&parent);
            layer.borrow_mut().define("this", (**this).clone());
            parent = layer;
        }

        let env = Environment::with_enclosing(&parent);
        for (param, arg) in self.declaration.params.iter().zip(args) {
            env.borrow_mut().define(&param.lexeme, arg);
        }

        let flow = interpreter.execute_block(&self.declaration.body, env)?;

        if self.is_initializer {
            return Ok(self.this.as_deref().cloned().unwrap_or(Value::Nil));
        }

        Ok(match flow {
            Flow::Return(value) => value,
            _ => Value::Nil,
        })
    }
}

// The closure is left out: a scope can hold the function that captures it.
impl fmt::Debug for LoxFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoxFunction")
            .field("name", &self.name())
            .field("is_initializer", &self.is_initializer)
            .field("this", &self.this)
            .finish_non_exhaustive()
    }
}

impl PartialEq for LoxFunction {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.declaration, &other.declaration)
            && Rc::ptr_eq(&self.closure, &other.closure)
            && self.this == other.this
    }
}

/// A function implemented by the host.
pub struct NativeFunction {
    pub name: &'static str,
    pub arity: usize,
    pub body: NativeFn,
}

impl NativeFunction {
    pub fn new(name: &'static str, arity: usize, body: NativeFn) -> Rc<Self> {
        Rc::new(Self { name, arity, body })
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

/// A native function value, optionally bound to a receiver.
#[derive(Debug, Clone)]
pub struct NativeCallable {
    pub function: Rc<NativeFunction>,
    pub receiver: Option<Box<Value>>,
}

impl NativeCallable {
    pub fn unbound(function: Rc<NativeFunction>) -> Self {
        Self {
            function,
            receiver: None,
        }
    }

    /// An independent bound copy; `self` is left untouched.
    pub fn bind(function: &Rc<NativeFunction>, receiver: Value) -> Self {
        Self {
            function: Rc::clone(function),
            receiver: Some(Box::new(receiver)),
        }
    }

    pub fn arity(&self) -> usize {
        self.function.arity
    }

    pub fn call(
        &self,
        interpreter: &mut Interpreter,
        args: &[Value],
        paren: &Token,
    ) -> Result<Value, RuntimeError> {
        debug!("Calling native function '{}'", self.function.name);
        (self.function.body)(self.receiver.as_deref(), args, paren, interpreter)
    }
}

impl PartialEq for NativeCallable {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.function, &other.function) && self.receiver == other.receiver
    }
}
