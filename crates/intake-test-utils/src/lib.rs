// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Intake integration tests.
//!
//! Provides a mock transport and a harness that wires a real SQLite order
//! store and conversation engine together, for fast, deterministic tests
//! without a chat platform.
//!
//! # Components
//!
//! - [`MockTransport`] - Mock chat transport with event injection and capture
//! - [`TestHarness`] - Engine + temp SQLite store + mock transport
//! - [`UnavailableStore`] - Order store whose every call fails

pub mod harness;
pub mod mock_transport;
pub mod unavailable_store;

pub use harness::{TestHarness, TestHarnessBuilder, OPERATOR};
pub use mock_transport::MockTransport;
pub use unavailable_store::UnavailableStore;
