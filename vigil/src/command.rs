//! The `em [timeout]: <source>` shell command.
//!
//! A host shell hands each input line to [`EmRequest::parse`]; lines that
//! are `em` commands are run through [`EmCommand`], everything else is
//! evaluated by the host as usual.

use crate::error::BridgeError;
use crate::interrupt::Interrupt;
use crate::reactor;
use crate::translate::translate;
use crate::value::Value;
use crate::wait;

use regex::Regex;
use std::error::Error as StdError;
use std::io::Write;
use std::sync::OnceLock;
use std::time::Duration;

/// Name of the command.
pub const NAME: &str = "em";

/// How the command appears in a help listing.
pub const LISTING: &str = "em[timeout]:";

/// One-line help text.
pub const DESCRIPTION: &str =
    "Wait for a deferrable to succeed or fail, a timeout can be specified before the colon.";

static EM_PATTERN: OnceLock<Regex> = OnceLock::new();

fn em_pattern() -> &'static Regex {
    EM_PATTERN.get_or_init(|| {
        Regex::new(r"(?s)^\s*em\s*([0-9.]*)\s*:(.*)$").expect("em command pattern is valid")
    })
}

/// Turns source text into a value in the host's ambient context.
///
/// The bridge does not care how evaluation works, only that it yields a
/// [`Value`], typically a [`Value::Deferred`].
pub trait Evaluator {
    type Error: StdError + Send + Sync + 'static;

    fn evaluate(&mut self, source: &str) -> Result<Value, Self::Error>;
}

/// A parsed `em` command line.
#[derive(Debug, Clone, PartialEq)]
pub struct EmRequest {
    /// How long to wait; `None` waits forever.
    pub timeout: Option<Duration>,

    /// Source text handed verbatim to the evaluator.
    pub source: String,
}

impl EmRequest {
    /// Builds a request directly, bypassing the command syntax.
    pub fn new(source: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self {
            timeout,
            source: source.into(),
        }
    }

    /// Parses an input line.
    ///
    /// Returns `Ok(None)` if the line is not an `em` command at all.
    ///
    /// # Errors
    ///
    /// [`BridgeError::InvalidTimeout`] if the text before the colon is made
    /// of digits and dots but is not a number, such as `1.2.3`.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let request = EmRequest::parse("em 0.5: fetch()")?.unwrap();
    /// assert_eq!(request.timeout, Some(Duration::from_millis(500)));
    /// assert_eq!(request.source, " fetch()");
    /// ```
    pub fn parse(line: &str) -> Result<Option<Self>, BridgeError> {
        let Some(captures) = em_pattern().captures(line) else {
            return Ok(None);
        };

        let timeout = match captures.get(1).map_or("", |m| m.as_str()) {
            "" => None,
            text => Some(parse_timeout(text)?),
        };

        let source = captures.get(2).map_or("", |m| m.as_str()).to_string();

        Ok(Some(Self { timeout, source }))
    }
}

fn parse_timeout(text: &str) -> Result<Duration, BridgeError> {
    let invalid = || BridgeError::InvalidTimeout(text.to_string());

    let secs: f64 = text.parse().map_err(|_| invalid())?;

    // Too large for a `Duration`: the timer would never fire anyway.
    Ok(Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX))
}

/// Runs `em` requests against the process-wide reactor.
///
/// # Examples
///
/// ```rust,ignore
/// let command = EmCommand::new();
///
/// if let Some(request) = EmRequest::parse(&line)? {
///     let value = command.run(&request, &mut evaluator, &mut io::stdout())?;
///     println!("=> {value}");
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct EmCommand {
    interrupt: Interrupt,
}

impl EmCommand {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `interrupt` to cancel waits started by this command.
    pub fn with_interrupt(interrupt: Interrupt) -> Self {
        Self { interrupt }
    }

    /// The token that interrupts this command's waits.
    pub fn interrupt(&self) -> &Interrupt {
        &self.interrupt
    }

    /// Evaluates the request's source and waits for the resulting deferred.
    ///
    /// The reactor is started before evaluation because the source is
    /// likely to schedule work on it. A source evaluating to nil is a no-op
    /// returning nil. State annotations for non-success outcomes are
    /// written to `out`.
    pub fn run<E, W>(
        &self,
        request: &EmRequest,
        evaluator: &mut E,
        out: &mut W,
    ) -> Result<Value, BridgeError>
    where
        E: Evaluator + ?Sized,
        W: Write + ?Sized,
    {
        let reactor = reactor::ensure_running()?;

        if reactor.is_reactor_thread() {
            return Err(BridgeError::Deadlock);
        }

        let value = evaluator
            .evaluate(&request.source)
            .map_err(|err| BridgeError::Eval(Box::new(err)))?;

        if value.is_nil() {
            return Ok(Value::Nil);
        }

        if value.as_deferrable().is_none() {
            warn_not_deferrable(out, &value);
        }

        tracing::debug!(timeout = ?request.timeout, "waiting for deferred");

        let outcome = wait::wait_for(reactor, value, request.timeout, &self.interrupt)?;
        translate(outcome, out)
    }

    /// Parses `line` and runs it if it is an `em` command.
    ///
    /// Returns `None` for lines the host should evaluate itself.
    pub fn run_line<E, W>(
        &self,
        line: &str,
        evaluator: &mut E,
        out: &mut W,
    ) -> Option<Result<Value, BridgeError>>
    where
        E: Evaluator + ?Sized,
        W: Write + ?Sized,
    {
        match EmRequest::parse(line) {
            Ok(Some(request)) => Some(self.run(&request, evaluator, out)),
            Ok(None) => None,
            Err(err) => Some(Err(err)),
        }
    }
}

/// Tells the shell user their source did not produce a deferred.
fn warn_not_deferrable<W>(out: &mut W, value: &Value)
where
    W: Write + ?Sized,
{
    if let Err(err) = writeln!(out, "WARNING: is not deferrable? {value}") {
        tracing::warn!(error = %err, "could not write warning");
    }
}

#[cfg(test)]
mod tests {
    use super::EmRequest;
    use crate::error::BridgeError;

    use std::time::Duration;

    #[test]
    fn parses_without_timeout() {
        let request = EmRequest::parse("em: fetch()").unwrap().unwrap();

        assert_eq!(request.timeout, None);
        assert_eq!(request.source, " fetch()");
    }

    #[test]
    fn parses_timeout_before_colon() {
        let request = EmRequest::parse("  em 0.25 :get").unwrap().unwrap();
        assert_eq!(request.timeout, Some(Duration::from_millis(250)));
        assert_eq!(request.source, "get");

        let request = EmRequest::parse("em3:x").unwrap().unwrap();
        assert_eq!(request.timeout, Some(Duration::from_secs(3)));
    }

    #[test]
    fn keeps_multiline_source() {
        let request = EmRequest::parse("em 1: a\nb").unwrap().unwrap();
        assert_eq!(request.source, " a\nb");
    }

    #[test]
    fn other_lines_are_not_commands() {
        assert_eq!(EmRequest::parse("emit(1)").unwrap(), None);
        assert_eq!(EmRequest::parse("x = em").unwrap(), None);
        assert_eq!(EmRequest::parse("em -1: x").unwrap(), None);
    }

    #[test]
    fn huge_timeout_saturates() {
        let request = EmRequest::parse("em 99999999999999999999999: x").unwrap().unwrap();
        assert_eq!(request.timeout, Some(Duration::MAX));
    }

    #[test]
    fn rejects_malformed_timeout() {
        assert!(matches!(
            EmRequest::parse("em 1.2.3: x"),
            Err(BridgeError::InvalidTimeout(t)) if t == "1.2.3"
        ));
        assert!(matches!(
            EmRequest::parse("em .: x"),
            Err(BridgeError::InvalidTimeout(_))
        ));
    }
}
