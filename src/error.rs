//! Error taxonomy and diagnostic formatting.
//!
//! Generalized from the teacher's single `io::Error`-wrapping `error!` macro
//! into the small taxonomy spec.md §7 names, while keeping the teacher's
//! diagnostic shape: `PATH LINE:COL MESSAGE` followed by the source line and
//! a caret, colored the way `colored` renders the teacher's own messages.

use std::fmt;
use std::io;

use colored::*;

use crate::engine::Engine;
use crate::token::TokenId;

/// What kind of thing went wrong, per spec.md §7.
#[derive(Debug)]
pub enum ErrorKind {
    Io,
    Lex,
    Directive,
    Expansion,
    Expression,
    User,
}

#[derive(Debug)]
pub struct PrepError {
    pub kind: ErrorKind,
    pub message: String,
    /// The offending token, when one exists, used to anchor the diagnostic.
    pub at: Option<TokenId>,
}

impl PrepError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, at: Option<TokenId>) -> Self {
        PrepError { kind, message: message.into(), at }
    }

    pub fn lex(message: impl Into<String>, at: Option<TokenId>) -> Self {
        Self::new(ErrorKind::Lex, message, at)
    }

    pub fn directive(message: impl Into<String>, at: Option<TokenId>) -> Self {
        Self::new(ErrorKind::Directive, message, at)
    }

    pub fn expansion(message: impl Into<String>, at: Option<TokenId>) -> Self {
        Self::new(ErrorKind::Expansion, message, at)
    }

    pub fn expression(message: impl Into<String>, at: Option<TokenId>) -> Self {
        Self::new(ErrorKind::Expression, message, at)
    }

    pub fn user(message: impl Into<String>, at: Option<TokenId>) -> Self {
        Self::new(ErrorKind::User, message, at)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io, message, None)
    }
}

impl fmt::Display for PrepError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for PrepError {}

impl From<io::Error> for PrepError {
    fn from(e: io::Error) -> Self {
        PrepError::io(e.to_string())
    }
}

/// Formats `PATH LINE:COL MESSAGE\n<source line>\n<caret>` for the token
/// `at`, or just `MESSAGE` if there is no anchoring token.
pub fn format_diagnostic(engine: &Engine, at: Option<TokenId>, message: &str) -> String {
    match at {
        None => message.to_string(),
        Some(id) => {
            let (path, line, col, source_line) = engine.position_of(id);
            let caret = " ".repeat(col.saturating_sub(1)) + &"^".red().bold().to_string();
            format!("{} {}:{} {}\n{}\n{}", path, line, col, message, source_line, caret)
        }
    }
}

/// Prints a `#warning` diagnostic to stderr and continues.
pub fn print_warning(engine: &Engine, at: Option<TokenId>, message: &str) {
    eprintln!("{}: {}", "warning".yellow().bold(), format_diagnostic(engine, at, message));
}
