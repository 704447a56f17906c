// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Structural depth of JSON documents
//!
//! This crate parses raw JSON text and reports how deeply its containers are
//! nested. It has no transport or logging concerns: callers hand it a string
//! and get back either a depth or a [`ParseError`] describing why the text is
//! not JSON.
//!
//! Depth is defined recursively over [`serde_json::Value`]:
//!
//! - a scalar (string, number, boolean, null) has depth 0
//! - an empty object or array has depth 0
//! - a non-empty object or array has depth `1 + max(depth(child))`
//!
//! ```
//! use json_depth::compute_depth;
//!
//! assert_eq!(compute_depth(r#"{"a": 1}"#).ok(), Some(1));
//! assert_eq!(compute_depth("[[[]]]").ok(), Some(2));
//! assert!(compute_depth("{").is_err());
//! ```

pub mod depth;
pub mod error;

pub use depth::{MAX_NESTING, compute_depth, depth_of};
pub use error::{ParseError, ParseErrorKind};
pub use serde_json::Value;
