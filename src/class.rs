//! Classes and instances.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::callable::{LoxFunction, NativeCallable, NativeFunction};
use crate::error::RuntimeError;
use crate::interpreter::Interpreter;
use crate::token::Token;
use crate::value::Value;

/// Builds the instance for a native class from the constructor arguments.
pub type NativeConstructor =
    fn(&Rc<LoxClass>, &[Value], &Token) -> Result<Value, RuntimeError>;

/// A method table entry.
#[derive(Debug, Clone)]
pub enum Method {
    Lox(LoxFunction),
    Native(Rc<NativeFunction>),
}

impl Method {
    pub fn bind(&self, receiver: Value) -> Value {
        match self {
            Method::Lox(function) => Value::Function(function.bind(receiver)),
            Method::Native(function) => Value::Native(NativeCallable::bind(function, receiver)),
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            Method::Lox(function) => function.arity(),
            Method::Native(function) => function.arity,
        }
    }
}

/// How calling the class value produces an instance.
#[derive(Clone, Copy)]
pub enum Construction {
    /// Plain instance, then the `init` method if the class chain has one.
    Initializer,
    Native { arity: usize, body: NativeConstructor },
    Forbidden,
}

pub struct LoxClass {
    pub name: String,
    pub superclass: Option<Rc<LoxClass>>,
    methods: HashMap<String, Method>,
    static_methods: HashMap<String, Method>,
    static_fields: RefCell<HashMap<String, Value>>,
    construction: Construction,
    native: bool,
}

impl LoxClass {
    pub fn new(
        name: String,
        superclass: Option<Rc<LoxClass>>,
        methods: HashMap<String, Method>,
        static_methods: HashMap<String, Method>,
    ) -> Self {
        Self {
            name,
            superclass,
            methods,
            static_methods,
            static_fields: RefCell::new(HashMap::new()),
            construction: Construction::Initializer,
            native: false,
        }
    }

    /// A host-defined class. Its methods must all be natives.
    pub fn native(
        name: &str,
        methods: Vec<Rc<NativeFunction>>,
        static_methods: Vec<Rc<NativeFunction>>,
        static_fields: Vec<(&str, Value)>,
        construction: Construction,
    ) -> Self {
        let table = |fns: Vec<Rc<NativeFunction>>| {
            fns.into_iter()
                .map(|f| (f.name.to_string(), Method::Native(f)))
                .collect::<HashMap<_, _>>()
        };

        Self {
            name: name.to_string(),
            superclass: None,
            methods: table(methods),
            static_methods: table(static_methods),
            static_fields: RefCell::new(
                static_fields
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v))
                    .collect(),
            ),
            construction,
            native: true,
        }
    }

    pub fn is_native(&self) -> bool {
        self.native
    }

    /// Own table first, then up the superclass chain.
    pub fn find_method(&self, name: &str) -> Option<Method> {
        self.methods.get(name).cloned().or_else(|| {
            self.superclass
                .as_ref()
                .and_then(|superclass| superclass.find_method(name))
        })
    }

    pub fn find_static_method(&self, name: &str) -> Option<Method> {
        self.static_methods.get(name).cloned().or_else(|| {
            self.superclass
                .as_ref()
                .and_then(|superclass| superclass.find_static_method(name))
        })
    }

    /// Property read on the class value: static fields, then static methods
    /// bound to the class itself.
    pub fn get_static(class: &Rc<LoxClass>, name: &Token) -> Result<Value, RuntimeError> {
        if let Some(value) = class.static_fields.borrow().get(&name.lexeme) {
            return Ok(value.clone());
        }

        class
            .find_static_method(&name.lexeme)
            .map(|method| method.bind(Value::Class(Rc::clone(class))))
            .ok_or_else(|| {
                RuntimeError::new(name, format!("Undefined property '{}'.", name.lexeme))
            })
    }

    pub fn set_static(&self, name: &Token, value: Value) {
        self.static_fields
            .borrow_mut()
            .insert(name.lexeme.clone(), value);
    }

    /// Number of arguments a call to the class value takes.
    pub fn arity(&self) -> usize {
        match self.construction {
            Construction::Native { arity, .. } => arity,
            Construction::Initializer => self.find_method("init").map_or(0, |m| m.arity()),
            Construction::Forbidden => 0,
        }
    }

    /// Create an instance. A user class inheriting from a native class gets
    /// a plain instance; native methods reject it as a receiver.
    pub fn instantiate(
        class: &Rc<LoxClass>,
        interpreter: &mut Interpreter,
        args: Vec<Value>,
        paren: &Token,
    ) -> Result<Value, RuntimeError> {
        match class.construction {
            Construction::Native { body, .. } => body(class, &args, paren),

            Construction::Forbidden => Err(RuntimeError::new(
                paren,
                format!("Cannot instantiate {} class.", class.name),
            )),

            Construction::Initializer => {
                let instance = Value::Instance(Rc::new(RefCell::new(LoxInstance::new(
                    Rc::clone(class),
                ))));

                match class.find_method("init") {
                    Some(Method::Lox(init)) => init.bind(instance).call(interpreter, args),
                    // native classes construct through `Construction::Native`
                    Some(Method::Native(_)) | None => Ok(instance),
                }
            }
        }
    }
}

impl fmt::Debug for LoxClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoxClass")
            .field("name", &self.name)
            .field("native", &self.native)
            .finish_non_exhaustive()
    }
}

/// Host state carried by instances of native classes.
#[derive(Debug, Clone, Default)]
pub enum NativeData {
    #[default]
    None,
    Array(Vec<Value>),
    Str(Rc<str>),
}

pub struct LoxInstance {
    pub class: Rc<LoxClass>,
    fields: HashMap<String, Value>,
    pub data: NativeData,
}

impl LoxInstance {
    pub fn new(class: Rc<LoxClass>) -> Self {
        Self::with_data(class, NativeData::None)
    }

    pub fn with_data(class: Rc<LoxClass>, data: NativeData) -> Self {
        Self {
            class,
            fields: HashMap::new(),
            data,
        }
    }

    /// Fields shadow methods; methods come back bound to `instance`.
    pub fn get(instance: &Rc<RefCell<LoxInstance>>, name: &Token) -> Result<Value, RuntimeError> {
        let this = instance.borrow();

        if let Some(value) = this.fields.get(&name.lexeme) {
            return Ok(value.clone());
        }

        this.class
            .find_method(&name.lexeme)
            .map(|method| method.bind(Value::Instance(Rc::clone(instance))))
            .ok_or_else(|| {
                RuntimeError::new(name, format!("Undefined property '{}'.", name.lexeme))
            })
    }

    pub fn set(&mut self, name: &Token, value: Value) {
        self.fields.insert(name.lexeme.clone(), value);
    }
}

impl fmt::Debug for LoxInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoxInstance")
            .field("class", &self.class.name)
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
