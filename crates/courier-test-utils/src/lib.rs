// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Courier integration tests.

pub mod mock_transport;

pub use mock_transport::{MockTransport, SentItem};
