// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait definitions for Courier's external collaborators.
//!
//! Both traits use `#[async_trait]` for dynamic dispatch compatibility.

pub mod analyzer;
pub mod transport;

pub use analyzer::ImageAnalyzer;
pub use transport::Transport;
