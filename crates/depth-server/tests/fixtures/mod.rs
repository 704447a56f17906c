// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Test fixtures for the depth endpoint
//!
//! This module provides a recording request observer and helpers for
//! starting a server on OS-assigned ports.

pub mod observer;

pub use observer::*;
