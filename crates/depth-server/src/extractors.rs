// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Request body extraction
//!
//! [`TextBody`] reads the whole body, bounded by the configured size limit
//! and request timeout, and decodes it with the charset the client declared.
//! A byte-order mark takes precedence over the declared charset; anything
//! unrecognised is read as UTF-8. Decoding never fails: invalid sequences
//! become U+FFFD and surface later as a JSON parse failure.

use std::fmt;

use axum::{
    extract::{FromRequest, Request},
    http::header,
};
use tokio::time::timeout;
use tracing::debug;

use crate::{error::RequestError, state::ServerState};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const UTF16LE_BOM: &[u8] = &[0xFF, 0xFE];
const UTF16BE_BOM: &[u8] = &[0xFE, 0xFF];

/// Character encodings accepted for request bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    /// UTF-8, the default
    Utf8,
    /// 7-bit ASCII
    Ascii,
    /// ISO-8859-1
    Latin1,
    /// UTF-16, little endian
    Utf16Le,
    /// UTF-16, big endian
    Utf16Be,
}

impl Charset {
    /// Look up a charset by its IANA label, case-insensitively
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim().trim_matches('"').to_ascii_lowercase();
        match label.as_str() {
            "utf-8" | "utf8" => Some(Self::Utf8),
            "us-ascii" | "ascii" => Some(Self::Ascii),
            "iso-8859-1" | "iso_8859-1" | "latin1" | "l1" => Some(Self::Latin1),
            "utf-16" | "utf-16le" | "utf16" => Some(Self::Utf16Le),
            "utf-16be" => Some(Self::Utf16Be),
            _ => None,
        }
    }

    /// Charset named by the `charset` parameter of a `Content-Type` value
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        content_type.split(';').skip(1).find_map(|param| {
            let (name, value) = param.split_once('=')?;
            if name.trim().eq_ignore_ascii_case("charset") {
                Self::from_label(value)
            } else {
                None
            }
        })
    }

    /// Charset announced by a leading byte-order mark, and the mark's length
    fn sniff(bytes: &[u8]) -> Option<(Self, usize)> {
        if bytes.starts_with(UTF8_BOM) {
            Some((Self::Utf8, UTF8_BOM.len()))
        } else if bytes.starts_with(UTF16LE_BOM) {
            Some((Self::Utf16Le, UTF16LE_BOM.len()))
        } else if bytes.starts_with(UTF16BE_BOM) {
            Some((Self::Utf16Be, UTF16BE_BOM.len()))
        } else {
            None
        }
    }

    /// Decode `bytes`, replacing invalid sequences with U+FFFD
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            Self::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Self::Ascii => bytes
                .iter()
                .map(|&byte| {
                    if byte.is_ascii() {
                        char::from(byte)
                    } else {
                        char::REPLACEMENT_CHARACTER
                    }
                })
                .collect(),
            Self::Latin1 => bytes.iter().map(|&byte| char::from(byte)).collect(),
            Self::Utf16Le => decode_utf16(bytes, u16::from_le_bytes),
            Self::Utf16Be => decode_utf16(bytes, u16::from_be_bytes),
        }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Utf8 => write!(f, "utf-8"),
            Self::Ascii => write!(f, "us-ascii"),
            Self::Latin1 => write!(f, "iso-8859-1"),
            Self::Utf16Le => write!(f, "utf-16le"),
            Self::Utf16Be => write!(f, "utf-16be"),
        }
    }
}

fn decode_utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> String {
    let pairs = bytes.chunks_exact(2);
    let dangling = !pairs.remainder().is_empty();

    let mut text: String = char::decode_utf16(pairs.map(|pair| unit([pair[0], pair[1]])))
        .map(|decoded| decoded.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect();
    if dangling {
        text.push(char::REPLACEMENT_CHARACTER);
    }
    text
}

/// Decode a body given its `Content-Type`, returning the text and the charset used
pub fn decode_body(content_type: Option<&str>, bytes: &[u8]) -> (String, Charset) {
    if let Some((charset, bom_len)) = Charset::sniff(bytes) {
        return (charset.decode(&bytes[bom_len..]), charset);
    }

    let charset = content_type
        .and_then(Charset::from_content_type)
        .unwrap_or(Charset::Utf8);
    (charset.decode(bytes), charset)
}

/// The request body decoded to text
#[derive(Debug)]
pub struct TextBody(pub String);

impl FromRequest<ServerState> for TextBody {
    type Rejection = RequestError;

    async fn from_request(req: Request, state: &ServerState) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(ToOwned::to_owned);

        let limit = state.config().max_body_bytes.value();
        let read_timeout = state.config().timeout_seconds.value();
        let bytes = timeout(read_timeout, axum::body::to_bytes(req.into_body(), limit))
            .await
            .map_err(|_| RequestError::Transport {
                message: format!(
                    "request body not received within {}s",
                    read_timeout.as_secs()
                ),
            })?
            .map_err(|e| RequestError::Transport {
                message: e.to_string(),
            })?;

        let (text, charset) = decode_body(content_type.as_deref(), &bytes);
        debug!(%charset, bytes = bytes.len(), "decoded request body");

        Ok(Self(text))
    }
}
