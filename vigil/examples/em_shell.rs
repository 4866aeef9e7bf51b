//! A tiny interactive shell with the `em` command.
//!
//! Run with `cargo run --example em_shell`, then try:
//!
//! ```text
//! em: after 0.5 hello world
//! em 1: never
//! em: fail no route to host
//! em: panic boom
//! ```
//!
//! Press Ctrl-C while waiting to interrupt. Set `RUST_LOG=vigil=debug` to
//! see what the bridge is doing.

use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing_subscriber::EnvFilter;

use vigil::{BridgeError, Deferred, EmCommand, ErrorValue, Evaluator, Interrupt, Value};

#[derive(Debug)]
struct ToyError(String);

impl fmt::Display for ToyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ToyError {}

/// Understands literals plus a few words that produce deferreds.
struct Toy;

impl Toy {
    fn literal(word: &str) -> Value {
        match word {
            "nil" => Value::Nil,
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => word
                .parse::<i64>()
                .map(Value::Int)
                .or_else(|_| word.parse::<f64>().map(Value::Float))
                .unwrap_or_else(|_| Value::from(word)),
        }
    }

    fn deferred_on_reactor<F>(delay: Duration, resolve: F) -> Result<Value, ToyError>
    where
        F: FnOnce(&Deferred) + Send + 'static,
    {
        let deferred = Arc::new(Deferred::new());
        let resolver = deferred.clone();

        let reactor = vigil::reactor::current()
            .ok_or_else(|| ToyError("the reactor is not running".into()))?;
        reactor
            .add_timer(delay, move || resolve(&resolver))
            .map_err(|err| ToyError(err.to_string()))?;

        Ok(Value::Deferred(deferred))
    }
}

impl Evaluator for Toy {
    type Error = ToyError;

    fn evaluate(&mut self, source: &str) -> Result<Value, ToyError> {
        let mut words = source.split_whitespace();

        match words.next() {
            None => Ok(Value::Nil),
            Some("after") => {
                let secs = words
                    .next()
                    .and_then(|w| w.parse::<f64>().ok())
                    .and_then(|s| Duration::try_from_secs_f64(s).ok())
                    .ok_or_else(|| ToyError("usage: after <seconds> [values..]".into()))?;
                let values: Vec<Value> = words.map(Toy::literal).collect();

                Toy::deferred_on_reactor(secs, move |d| {
                    d.succeed(values);
                })
            }
            Some("fail") => {
                let message = words.collect::<Vec<_>>().join(" ");

                Toy::deferred_on_reactor(Duration::from_millis(100), move |d| {
                    d.fail(vec![Value::Error(ErrorValue::runtime(message))]);
                })
            }
            Some("panic") => {
                let message = words.collect::<Vec<_>>().join(" ");

                Toy::deferred_on_reactor(Duration::from_millis(100), move |_| {
                    panic!("{message}");
                })
            }
            Some("never") => Ok(Value::Deferred(Arc::new(Deferred::new()))),
            Some(word) => {
                let mut values: Vec<Value> =
                    std::iter::once(word).chain(words).map(Toy::literal).collect();

                Ok(match values.len() {
                    1 => values.remove(0),
                    _ => Value::List(values),
                })
            }
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let interrupt = Interrupt::new();
    interrupt.install_sigint()?;

    let command = EmCommand::with_interrupt(interrupt);
    let mut editor = DefaultEditor::new()?;
    let mut toy = Toy;

    println!("{}  {}", vigil::command::LISTING, vigil::command::DESCRIPTION);

    loop {
        let line = match editor.readline("vigil> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        };

        if line.trim().is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(line.as_str());

        let result = match command.run_line(&line, &mut toy, &mut io::stdout()) {
            Some(result) => result,
            None => toy
                .evaluate(&line)
                .map_err(|err| BridgeError::Eval(Box::new(err))),
        };

        match result {
            Ok(Value::Nil) => println!(),
            Ok(value) => println!("=> {value}"),
            Err(err) => println!("error: {err}"),
        }
    }

    Ok(())
}
