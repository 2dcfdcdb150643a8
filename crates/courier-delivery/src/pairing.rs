// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Terminal rendering of pairing challenges.

use qrcode::render::unicode;
use qrcode::QrCode;

/// Render a pairing challenge as a scannable unicode QR block.
///
/// Falls back to the raw challenge data if it cannot be QR-encoded, so the
/// operator always has something to act on.
pub fn render_challenge(data: &str) -> String {
    match QrCode::new(data.as_bytes()) {
        Ok(code) => code
            .render::<unicode::Dense1x2>()
            .quiet_zone(true)
            .build(),
        Err(_) => format!("pairing challenge (not QR-encodable): {data}"),
    }
}
