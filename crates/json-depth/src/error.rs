// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Parse failure reporting
//!
//! [`ParseError`] keeps the parser's position and diagnostic so callers can
//! log them, plus a short hint describing the most likely cause.

use std::fmt;

use serde_json::error::Category;
use thiserror::Error;

mod hints {
    pub(super) const MISSING_COMMA: &str =
        "check for missing or extra commas between object properties or array elements";
    pub(super) const MISSING_BRACE: &str = "check for missing closing brace '}' for JSON object";
    pub(super) const MISSING_BRACKET: &str = "check for missing closing bracket ']' for JSON array";
    pub(super) const MISSING_QUOTES: &str =
        "check for missing or improperly escaped quotes around string values";
    pub(super) const CONTROL_CHARS: &str =
        "JSON contains invalid control characters that must be escaped";
    pub(super) const EXPECTED_VALUE: &str =
        "expected a valid JSON value (string, number, boolean, null, object, or array)";
    pub(super) const TRAILING: &str = "unexpected content after the end of the JSON document";
    pub(super) const DEFAULT_SYNTAX: &str = "check JSON formatting and structure";
    pub(super) const TRUNCATED: &str = "unexpected end of JSON input, document appears truncated";
    pub(super) const TOO_DEEP: &str = "document nests containers deeper than the parser allows";
}

/// Broad class of a parse failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Input is not syntactically valid JSON
    Syntax,
    /// Input ended before the document was complete
    UnexpectedEof,
    /// [`MAX_NESTING`](crate::MAX_NESTING) or more containers are nested
    TooDeep,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax => write!(f, "invalid JSON syntax"),
            Self::UnexpectedEof => write!(f, "unexpected end of input"),
            Self::TooDeep => write!(f, "nesting limit exceeded"),
        }
    }
}

/// Raw text could not be parsed as a JSON document
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct ParseError {
    kind: ParseErrorKind,
    line: usize,
    column: usize,
    message: String,
}

impl ParseError {
    /// Class of the failure
    pub fn kind(&self) -> ParseErrorKind {
        self.kind
    }

    /// One-based line where parsing stopped
    pub fn line(&self) -> usize {
        self.line
    }

    /// One-based column where parsing stopped
    pub fn column(&self) -> usize {
        self.column
    }

    /// Diagnostic reported by the parser
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Short description of the most likely cause, meant for logs
    pub fn hint(&self) -> &'static str {
        match self.kind {
            ParseErrorKind::TooDeep => hints::TOO_DEEP,
            ParseErrorKind::UnexpectedEof => hints::TRUNCATED,
            ParseErrorKind::Syntax => syntax_hint(&self.message),
        }
    }
}

fn syntax_hint(message: &str) -> &'static str {
    if message.contains("expected `,`") || message.contains("trailing comma") {
        hints::MISSING_COMMA
    } else if message.contains("expected `}`") {
        hints::MISSING_BRACE
    } else if message.contains("expected `]`") {
        hints::MISSING_BRACKET
    } else if message.contains("expected `\"`") || message.contains("key must be a string") {
        hints::MISSING_QUOTES
    } else if message.contains("control character") {
        hints::CONTROL_CHARS
    } else if message.contains("trailing characters") {
        hints::TRAILING
    } else if message.contains("expected value") || message.contains("expected ident") {
        hints::EXPECTED_VALUE
    } else {
        hints::DEFAULT_SYNTAX
    }
}

impl From<serde_json::Error> for ParseError {
    fn from(err: serde_json::Error) -> Self {
        let message = err.to_string();
        let kind = match err.classify() {
            Category::Eof => ParseErrorKind::UnexpectedEof,
            _ if message.contains("recursion limit exceeded") => ParseErrorKind::TooDeep,
            Category::Syntax | Category::Data | Category::Io => ParseErrorKind::Syntax,
        };

        Self {
            kind,
            line: err.line(),
            column: err.column(),
            message,
        }
    }
}
