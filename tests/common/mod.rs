#![allow(dead_code)]

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;
use std::thread;

use rox::interpreter::STACK_SIZE;
use rox::lox::Lox;

/// A `Write` sink the test keeps a handle to after giving it away.
#[derive(Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Everything one program run produced.
pub struct Outcome {
    pub stdout: String,
    pub stderr: String,
    pub had_error: bool,
    pub had_runtime_error: bool,
}

impl Outcome {
    pub fn lines(&self) -> Vec<&str> {
        self.stdout.lines().collect()
    }
}

pub fn capture() -> (Lox, SharedBuffer, SharedBuffer) {
    let out = SharedBuffer::default();
    let err = SharedBuffer::default();
    let lox = Lox::with_io(Box::new(out.clone()), Box::new(err.clone()));
    (lox, out, err)
}

/// Run one program on a thread with the interpreter's stack size, as the
/// binary does.
pub fn run(source: &str) -> Outcome {
    let source = source.to_string();

    thread::Builder::new()
        .stack_size(STACK_SIZE)
        .spawn(move || {
            let (mut lox, out, err) = capture();
            lox.run(&source);

            Outcome {
                stdout: out.contents(),
                stderr: err.contents(),
                had_error: lox.had_error(),
                had_runtime_error: lox.had_runtime_error(),
            }
        })
        .expect("failed to spawn interpreter thread")
        .join()
        .expect("interpreter thread panicked")
}

/// Run a program expected to succeed and return its printed lines.
pub fn output_of(source: &str) -> Vec<String> {
    let outcome = run(source);
    assert!(
        !outcome.had_error && !outcome.had_runtime_error,
        "unexpected failure:\n{}",
        outcome.stderr
    );
    outcome.stdout.lines().map(String::from).collect()
}

/// Run a program expected to fail at runtime and return the message line.
pub fn runtime_error_of(source: &str) -> String {
    let outcome = run(source);
    assert!(!outcome.had_error, "unexpected static error:\n{}", outcome.stderr);
    assert!(outcome.had_runtime_error, "expected a runtime error");
    outcome.stderr.lines().next().unwrap_or_default().to_string()
}
