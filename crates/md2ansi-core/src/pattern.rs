//! Bounded pattern evaluation.
//!
//! Every pattern the renderer runs against document text goes through an
//! [`Evaluator`]. It enforces two guards per call:
//!
//! - subjects longer than [`Budget::max_len`] are never evaluated;
//! - a call that runs past [`Budget::timeout`] is discarded.
//!
//! A bypassed match reports "no match" and a bypassed substitution returns the
//! subject unchanged. Neither is an error. The `regex` engine runs in linear
//! time, so the deadline is checked cooperatively between replacements rather
//! than by interrupting a worker.

use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::time::{Duration, Instant};

use regex::{Captures, Regex};

/// Largest subject a pattern is run against.
pub const MAX_SUBJECT_LEN: usize = 100 * 1024;

/// Wall-clock budget for a single evaluation.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Limits applied to each evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budget {
    pub max_len: usize,
    pub timeout: Duration,
}

impl Budget {
    pub const fn new(max_len: usize, timeout: Duration) -> Self {
        Self { max_len, timeout }
    }
}

impl Default for Budget {
    fn default() -> Self {
        Self::new(MAX_SUBJECT_LEN, DEFAULT_TIMEOUT)
    }
}

/// What to do with a pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode<'r> {
    /// Report whether the pattern matches.
    Match,
    /// Replace every match with the template (`$1`, `${name}` expand).
    Substitute(&'r str),
}

/// Result of [`Evaluator::evaluate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation<'s> {
    Matched(bool),
    Substituted(Cow<'s, str>),
}

/// Why an evaluation was skipped or discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bypass {
    TooLarge { len: usize },
    TimedOut { elapsed: Duration },
}

/// Runs patterns under a [`Budget`] and remembers every bypass.
#[derive(Debug, Default)]
pub struct Evaluator {
    budget: Budget,
    debug: bool,
    bypasses: RefCell<Vec<Bypass>>,
}

impl Evaluator {
    pub fn new(budget: Budget) -> Self {
        Self {
            budget,
            debug: false,
            bypasses: RefCell::new(Vec::new()),
        }
    }

    /// Emit a debug event for every bypass.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn budget(&self) -> Budget {
        self.budget
    }

    /// Drain the bypasses recorded since the last call.
    pub fn take_bypasses(&self) -> Vec<Bypass> {
        std::mem::take(&mut *self.bypasses.borrow_mut())
    }

    fn record(&self, pattern: &Regex, bypass: Bypass) {
        if self.debug {
            tracing::debug!(pattern = pattern.as_str(), ?bypass, "pattern evaluation bypassed");
        }
        self.bypasses.borrow_mut().push(bypass);
    }

    fn admits(&self, pattern: &Regex, subject: &str) -> bool {
        if subject.len() > self.budget.max_len {
            self.record(
                pattern,
                Bypass::TooLarge {
                    len: subject.len(),
                },
            );
            return false;
        }
        true
    }

    fn expired(&self, pattern: &Regex, start: Instant) -> bool {
        let elapsed = start.elapsed();
        if elapsed >= self.budget.timeout {
            self.record(pattern, Bypass::TimedOut { elapsed });
            return true;
        }
        false
    }

    /// Run `pattern` against `subject` in the given mode.
    pub fn evaluate<'s>(&self, pattern: &Regex, subject: &'s str, mode: Mode<'_>) -> Evaluation<'s> {
        match mode {
            Mode::Match => Evaluation::Matched(self.is_match(pattern, subject)),
            Mode::Substitute(template) => {
                Evaluation::Substituted(self.replace_all(pattern, subject, template))
            }
        }
    }

    /// Whether `pattern` matches; `false` when bypassed.
    pub fn is_match(&self, pattern: &Regex, subject: &str) -> bool {
        if !self.admits(pattern, subject) {
            return false;
        }
        let start = Instant::now();
        let found = pattern.is_match(subject);
        found && !self.expired(pattern, start)
    }

    /// Capture groups of the first match; `None` when bypassed.
    pub fn captures<'s>(&self, pattern: &Regex, subject: &'s str) -> Option<Captures<'s>> {
        if !self.admits(pattern, subject) {
            return None;
        }
        let start = Instant::now();
        let caps = pattern.captures(subject)?;
        if self.expired(pattern, start) {
            return None;
        }
        Some(caps)
    }

    /// Replace every match; the untouched subject when bypassed.
    pub fn replace_all<'s>(&self, pattern: &Regex, subject: &'s str, template: &str) -> Cow<'s, str> {
        if !self.admits(pattern, subject) {
            return Cow::Borrowed(subject);
        }
        let start = Instant::now();
        let deadline = start + self.budget.timeout;
        let late = Cell::new(false);

        let replaced = pattern.replace_all(subject, |caps: &Captures<'_>| {
            if late.get() || Instant::now() >= deadline {
                late.set(true);
                return caps[0].to_string();
            }
            let mut dst = String::new();
            caps.expand(template, &mut dst);
            dst
        });

        if late.get() || self.expired(pattern, start) {
            if late.get() {
                self.record(
                    pattern,
                    Bypass::TimedOut {
                        elapsed: start.elapsed(),
                    },
                );
            }
            return Cow::Borrowed(subject);
        }
        replaced
    }
}
