//! Tree-walking evaluator.
//!
//! Statements run against a current scope; a resolved reference reads the
//! scope a fixed number of hops up, and anything unresolved is a global.
//! Loop and function exits travel back up as [`Flow`] values, errors as
//! [`RuntimeError`].

use std::collections::HashMap;
use std::io::{self, Write};
use std::mem;
use std::rc::Rc;

use log::{debug, info};

use crate::ast::{Expr, ExprId, FunctionDecl, Stmt};
use crate::callable::LoxFunction;
use crate::class::{LoxClass, LoxInstance, Method, NativeData};
use crate::environment::{self, EnvRef, Environment};
use crate::error::RuntimeError;
use crate::resolver::Locals;
use crate::stdlib;
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Nested calls deeper than this raise a runtime error instead of
/// exhausting the host stack.
pub const MAX_CALL_DEPTH: usize = 512;

/// Stack to give the thread running the interpreter. Each script call costs
/// several Rust frames, and unoptimized builds need room for
/// [`MAX_CALL_DEPTH`] of them.
pub const STACK_SIZE: usize = 128 * 1024 * 1024;

/// Convenient alias for evaluator results.
pub type IResult<T> = Result<T, RuntimeError>;

/// How a statement finished. Non-`Normal` outcomes propagate outward until
/// the enclosing loop or call consumes them.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal,
    Return(Value),
    Break,
    Continue,
}

pub struct Interpreter {
    globals: EnvRef,
    environment: EnvRef,
    locals: Locals,
    out: Box<dyn Write>,
    string_class: Rc<LoxClass>,
    call_depth: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Creates an interpreter printing to stdout, with the built-ins defined.
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    /// Creates an interpreter whose `print` output goes to `out`.
    pub fn with_output(out: Box<dyn Write>) -> Self {
        info!("Initializing Interpreter");

        let globals = Environment::new();
        let string_class = stdlib::install(&mut globals.borrow_mut());

        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            out,
            string_class,
            call_depth: 0,
        }
    }

    /// Merge a resolution table. Tables from earlier REPL lines stay valid
    /// because expression ids are never reused.
    pub fn resolve(&mut self, locals: Locals) {
        debug!("Merging {} resolved local(s)", locals.len());
        self.locals.extend(locals);
    }

    /// Bind `name` in the global scope.
    pub fn define_global(&mut self, name: &str, value: Value) {
        self.globals.borrow_mut().define(name, value);
    }

    pub fn global(&self, name: &str) -> Option<Value> {
        self.globals.borrow().get(name)
    }

    /// Interprets a list of statements (a "program"). Stops at the first
    /// runtime error.
    pub fn interpret(&mut self, statements: &[Stmt]) -> IResult<()> {
        debug!("Interpreting {} statements", statements.len());

        for stmt in statements {
            self.execute(stmt)?;
        }

        info!("Interpretation completed successfully");
        Ok(())
    }

    /// Executes a single statement.
    pub fn execute(&mut self, stmt: &Stmt) -> IResult<Flow> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(Flow::Normal)
            }

            Stmt::Print {
                keyword,
                expression,
            } => {
                let value = self.evaluate(expression)?;
                writeln!(self.out, "{}", value).map_err(|e| {
                    RuntimeError::new(keyword, format!("Failed to write output: {}", e))
                })?;
                Ok(Flow::Normal)
            }

            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                debug!("Defining variable '{}'", name.lexeme);
                self.environment.borrow_mut().define(&name.lexeme, value);
                Ok(Flow::Normal)
            }

            Stmt::Block(statements) => {
                let env = Environment::with_enclosing(&self.environment);
                self.execute_block(statements, env)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Stmt::While {
                condition,
                body,
                increment,
            } => {
                while self.evaluate(condition)?.is_truthy() {
                    match self.execute(body)? {
                        Flow::Break => break,
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Normal | Flow::Continue => {}
                    }

                    if let Some(increment) = increment {
                        self.evaluate(increment)?;
                    }
                }
                Ok(Flow::Normal)
            }

            Stmt::Break(_) => Ok(Flow::Break),

            Stmt::Continue(_) => Ok(Flow::Continue),

            Stmt::Function(decl) => {
                let function = self.make_function(decl);
                if let Some(name) = &decl.name {
                    debug!("Defining function '{}'", name.lexeme);
                    self.environment.borrow_mut().define(&name.lexeme, function);
                }
                Ok(Flow::Normal)
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                Ok(Flow::Return(value))
            }

            Stmt::Class {
                name,
                superclass,
                methods,
                static_methods,
            } => {
                self.declare_class(name, superclass.as_ref(), methods, static_methods)?;
                Ok(Flow::Normal)
            }
        }
    }

    /// Run `statements` with `env` as the current scope, restoring the
    /// previous scope on every exit path.
    pub fn execute_block(&mut self, statements: &[Stmt], env: EnvRef) -> IResult<Flow> {
        let previous = mem::replace(&mut self.environment, env);

        let mut outcome = Ok(Flow::Normal);
        for stmt in statements {
            match self.execute(stmt) {
                Ok(Flow::Normal) => {}
                other => {
                    outcome = other;
                    break;
                }
            }
        }

        self.environment = previous;
        outcome
    }

    /// A closure over the current scope.
    fn make_function(&self, decl: &Rc<FunctionDecl>) -> Value {
        Value::Function(LoxFunction::new(
            Rc::clone(decl),
            Rc::clone(&self.environment),
            false,
        ))
    }

    fn declare_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
        static_methods: &[Rc<FunctionDecl>],
    ) -> IResult<()> {
        debug!("Declaring class '{}'", name.lexeme);

        let superclass = match superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Class(class) => Some(class),
                _ => {
                    let token = match expr {
                        Expr::Variable { name, .. } => name,
                        _ => name,
                    };
                    return Err(RuntimeError::new(token, "Superclass must be a class."));
                }
            },
            None => None,
        };

        self.environment
            .borrow_mut()
            .define(&name.lexeme, Value::Nil);

        let class_env = match &superclass {
            Some(superclass) => {
                let env = Environment::with_enclosing(&self.environment);
                env.borrow_mut()
                    .define("super", Value::Class(Rc::clone(superclass)));
                env
            }
            None => Rc::clone(&self.environment),
        };

        let table = |decls: &[Rc<FunctionDecl>], allow_init: bool| {
            decls
                .iter()
                .map(|decl| {
                    let method_name = decl.name().unwrap_or_default().to_string();
                    let is_initializer = allow_init && method_name == "init";
                    let function =
                        LoxFunction::new(Rc::clone(decl), Rc::clone(&class_env), is_initializer);
                    (method_name, Method::Lox(function))
                })
                .collect::<HashMap<_, _>>()
        };

        let class = LoxClass::new(
            name.lexeme.clone(),
            superclass,
            table(methods, true),
            table(static_methods, false),
        );

        self.environment
            .borrow_mut()
            .assign(&name.lexeme, Value::Class(Rc::new(class)));
        Ok(())
    }

    /// Evaluates an expression.
    pub fn evaluate(&mut self, expr: &Expr) -> IResult<Value> {
        match expr {
            Expr::Literal(literal) => Ok(Value::from(literal)),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => {
                let right = self.evaluate(right)?;
                match operator.token_type {
                    TokenType::MINUS => match right {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        _ => Err(RuntimeError::new(operator, "Operand must be a number.")),
                    },
                    TokenType::BANG => Ok(Value::Bool(!right.is_truthy())),
                    _ => Err(RuntimeError::new(operator, "Unknown unary operator.")),
                }
            }

            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                binary_op(operator, left, right)
            }

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let short_circuit = match operator.token_type {
                    TokenType::OR => left.is_truthy(),
                    _ => !left.is_truthy(),
                };

                if short_circuit {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }

            Expr::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.evaluate(then_branch)
                } else {
                    self.evaluate(else_branch)
                }
            }

            Expr::Variable { id, name } => self.look_up_variable(name, *id),

            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;

                let assigned = match self.locals.get(id) {
                    Some(&distance) => environment::assign_at(
                        &self.environment,
                        distance,
                        &name.lexeme,
                        value.clone(),
                    ),
                    None => self
                        .globals
                        .borrow_mut()
                        .assign(&name.lexeme, value.clone()),
                };

                if assigned {
                    Ok(value)
                } else {
                    Err(undefined_variable(name))
                }
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee = self.evaluate(callee)?;

                let mut args = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    args.push(self.evaluate(argument)?);
                }

                self.call_value(&callee, args, paren)
            }

            Expr::Get { object, name } => {
                let object = self.evaluate(object)?;
                self.get_property(&object, name)
            }

            Expr::Set {
                object,
                name,
                value,
            } => match self.evaluate(object)? {
                Value::Instance(instance) => {
                    let value = self.evaluate(value)?;
                    instance.borrow_mut().set(name, value.clone());
                    Ok(value)
                }
                Value::Class(class) => {
                    let value = self.evaluate(value)?;
                    class.set_static(name, value.clone());
                    Ok(value)
                }
                _ => Err(RuntimeError::new(name, "Only instances have fields.")),
            },

            Expr::IndexGet {
                object,
                bracket,
                index,
            } => {
                let object = self.evaluate(object)?;
                let index = self.evaluate(index)?;
                index_get(&object, &index, bracket)
            }

            Expr::IndexSet {
                object,
                bracket,
                index,
                value,
            } => {
                let object = self.evaluate(object)?;
                let index = self.evaluate(index)?;
                let value = self.evaluate(value)?;
                index_set(&object, &index, value, bracket)
            }

            Expr::This { id, keyword } => self.look_up_variable(keyword, *id),

            Expr::Super {
                id,
                keyword,
                method,
            } => {
                let distance = *self
                    .locals
                    .get(id)
                    .ok_or_else(|| undefined_variable(keyword))?;

                let superclass = environment::get_at(&self.environment, distance, "super");
                let this = environment::get_at(&self.environment, distance - 1, "this");

                match (superclass, this) {
                    (Some(Value::Class(superclass)), Some(this)) => superclass
                        .find_method(&method.lexeme)
                        .map(|m| m.bind(this))
                        .ok_or_else(|| {
                            RuntimeError::new(
                                method,
                                format!("Undefined property '{}'.", method.lexeme),
                            )
                        }),
                    _ => Err(undefined_variable(keyword)),
                }
            }

            Expr::Function(decl) => Ok(self.make_function(decl)),
        }
    }

    fn look_up_variable(&self, name: &Token, id: ExprId) -> IResult<Value> {
        let value = match self.locals.get(&id) {
            Some(&distance) => environment::get_at(&self.environment, distance, &name.lexeme),
            None => self.globals.borrow().get(&name.lexeme),
        };

        value.ok_or_else(|| undefined_variable(name))
    }

    /// Property read on any value.
    fn get_property(&mut self, object: &Value, name: &Token) -> IResult<Value> {
        match object {
            Value::Instance(instance) => LoxInstance::get(instance, name),

            Value::Class(class) => LoxClass::get_static(class, name),

            Value::Str(_) => self
                .string_class
                .find_method(&name.lexeme)
                .map(|m| m.bind(object.clone()))
                .ok_or_else(|| {
                    RuntimeError::new(name, format!("Undefined property '{}'.", name.lexeme))
                }),

            _ => Err(RuntimeError::new(name, "Only instances have properties.")),
        }
    }

    /// Invoke any callable value. `paren` locates arity and call errors.
    pub fn call_value(&mut self, callee: &Value, args: Vec<Value>, paren: &Token) -> IResult<Value> {
        let arity = match callee {
            Value::Function(function) => function.arity(),
            Value::Native(native) => native.arity(),
            Value::Class(class) => class.arity(),
            _ => {
                return Err(RuntimeError::new(
                    paren,
                    "Can only call functions and classes.",
                ))
            }
        };

        if args.len() != arity {
            return Err(RuntimeError::new(
                paren,
                format!("Expected {} arguments but got {}.", arity, args.len()),
            ));
        }

        if self.call_depth >= MAX_CALL_DEPTH {
            return Err(RuntimeError::new(paren, "Stack overflow."));
        }

        self.call_depth += 1;
        let result = match callee {
            Value::Function(function) => function.call(self, args),
            Value::Native(native) => native.call(self, &args, paren),
            Value::Class(class) => LoxClass::instantiate(class, self, args, paren),
            _ => Ok(Value::Nil),
        };
        self.call_depth -= 1;

        result
    }
}

fn undefined_variable(name: &Token) -> RuntimeError {
    RuntimeError::new(name, format!("Undefined variable '{}'.", name.lexeme))
}

fn binary_op(operator: &Token, left: Value, right: Value) -> IResult<Value> {
    use Value::{Bool, Number, Str};

    let numbers = || RuntimeError::new(operator, "Operands must be numbers.");

    match operator.token_type {
        TokenType::COMMA => Ok(right),

        TokenType::PLUS => match (&left, &right) {
            (Number(a), Number(b)) => Ok(Number(a + b)),
            (Str(_), _) | (_, Str(_)) => Ok(Value::str(&format!("{}{}", left, right))),
            _ => Err(RuntimeError::new(
                operator,
                "Operands must be two numbers or at least one string.",
            )),
        },

        TokenType::MINUS => match (left, right) {
            (Number(a), Number(b)) => Ok(Number(a - b)),
            _ => Err(numbers()),
        },

        TokenType::STAR => match (left, right) {
            (Number(a), Number(b)) => Ok(Number(a * b)),
            _ => Err(numbers()),
        },

        TokenType::SLASH => match (left, right) {
            (Number(_), Number(b)) if b == 0.0 => {
                Err(RuntimeError::new(operator, "Division by zero."))
            }
            (Number(a), Number(b)) => Ok(Number(a / b)),
            _ => Err(numbers()),
        },

        TokenType::GREATER => match (left, right) {
            (Number(a), Number(b)) => Ok(Bool(a > b)),
            _ => Err(numbers()),
        },

        TokenType::GREATER_EQUAL => match (left, right) {
            (Number(a), Number(b)) => Ok(Bool(a >= b)),
            _ => Err(numbers()),
        },

        TokenType::LESS => match (left, right) {
            (Number(a), Number(b)) => Ok(Bool(a < b)),
            _ => Err(numbers()),
        },

        TokenType::LESS_EQUAL => match (left, right) {
            (Number(a), Number(b)) => Ok(Bool(a <= b)),
            _ => Err(numbers()),
        },

        TokenType::EQUAL_EQUAL => Ok(Bool(left == right)),

        TokenType::BANG_EQUAL => Ok(Bool(left != right)),

        _ => Err(RuntimeError::new(operator, "Unknown binary operator.")),
    }
}

fn index_get(object: &Value, index: &Value, bracket: &Token) -> IResult<Value> {
    match object {
        Value::Str(s) => stdlib::char_at(s, index, bracket),

        Value::Instance(instance) => match &instance.borrow().data {
            NativeData::Array(items) => {
                let i = stdlib::checked_index(index, items.len(), bracket)?;
                Ok(items[i].clone())
            }
            NativeData::Str(s) => stdlib::char_at(s, index, bracket),
            NativeData::None => Err(not_indexable(bracket)),
        },

        _ => Err(not_indexable(bracket)),
    }
}

fn index_set(object: &Value, index: &Value, value: Value, bracket: &Token) -> IResult<Value> {
    if let Value::Instance(instance) = object {
        if let NativeData::Array(items) = &mut instance.borrow_mut().data {
            let i = stdlib::checked_index(index, items.len(), bracket)?;
            items[i] = value.clone();
            return Ok(value);
        }
    }

    Err(RuntimeError::new(bracket, "Only arrays support index assignment."))
}

fn not_indexable(bracket: &Token) -> RuntimeError {
    RuntimeError::new(bracket, "Only arrays and strings can be indexed.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::resolver::Resolver;
    use crate::scanner::Scanner;

    fn eval(source: &str) -> Value {
        let (tokens, errors) = Scanner::new(source).scan_tokens();
        assert!(errors.is_empty());
        let expr = Parser::new(tokens).expression().unwrap();
        Interpreter::new().evaluate(&expr).unwrap()
    }

    #[test]
    fn arithmetic_and_grouping() {
        assert_eq!(eval("(1 + 2) * 3 - 4 / 2"), Value::Number(7.0));
    }

    #[test]
    fn comma_yields_right_operand() {
        assert_eq!(eval("1, 2, 3"), Value::Number(3.0));
    }

    #[test]
    fn plus_concatenates_when_either_side_is_a_string() {
        assert_eq!(eval("\"n\" + 1"), Value::str("n1"));
        assert_eq!(eval("true + \"!\""), Value::str("true!"));
    }

    #[test]
    fn equality_never_coerces() {
        assert_eq!(eval("nil == false"), Value::Bool(false));
        assert_eq!(eval("1 == \"1\""), Value::Bool(false));
        assert_eq!(eval("nil == nil"), Value::Bool(true));
    }

    fn interpreter_with(setup: &str) -> Interpreter {
        let mut interpreter = Interpreter::with_output(Box::new(io::sink()));
        run_in(&mut interpreter, setup);
        interpreter
    }

    fn run_in(interpreter: &mut Interpreter, source: &str) {
        let (tokens, _) = Scanner::new(source).scan_tokens();
        let program = Parser::new(tokens).parse().statements;
        let resolution = Resolver::new().resolve(&program);
        assert!(resolution.errors.is_empty());

        interpreter.resolve(resolution.locals);
        interpreter.interpret(&program).unwrap();
    }

    #[test]
    fn blocks_and_calls_release_their_scopes() {
        let mut interpreter = interpreter_with("fun f(n) { { var x = n; } return n; }");
        let before = Rc::strong_count(&interpreter.globals);

        run_in(&mut interpreter, "for (var i = 0; i < 10; i = i + 1) f(i);");

        assert_eq!(Rc::strong_count(&interpreter.globals), before);
    }

    #[test]
    fn dropped_closures_release_the_scopes_they_captured() {
        let mut interpreter = interpreter_with("fun make(n) { return fun () { return n; }; }");
        let before = Rc::strong_count(&interpreter.globals);

        run_in(
            &mut interpreter,
            "for (var i = 0; i < 1000; i = i + 1) { make(i); }",
        );
        assert_eq!(Rc::strong_count(&interpreter.globals), before);

        run_in(&mut interpreter, "var kept = make(1);");
        assert_eq!(Rc::strong_count(&interpreter.globals), before + 1);
    }
}
