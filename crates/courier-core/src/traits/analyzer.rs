// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Content-analysis collaborator trait.

use async_trait::async_trait;

use crate::error::CourierError;

/// An opaque image-analysis collaborator.
///
/// The delivery layer forwards validated, size-checked media bytes and
/// receives back plain text, or `None` when the analyzer has nothing to say.
/// What the analyzer does with the image is none of this crate's business.
#[async_trait]
pub trait ImageAnalyzer: Send + Sync + 'static {
    async fn analyze(&self, image: &[u8]) -> Result<Option<String>, CourierError>;
}
