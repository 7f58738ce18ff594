// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Terminal rendering of pairing challenges.

use qrcode::QrCode;

use wagate_core::WagateError;

/// Renders a pairing code as a scannable text-mode QR block.
pub(crate) fn render_qr(code: &str) -> Result<String, WagateError> {
    let qr = QrCode::new(code.as_bytes())
        .map_err(|e| WagateError::ChallengeEncoding(e.to_string()))?;
    Ok(qr
        .render::<char>()
        .quiet_zone(false)
        .module_dimensions(2, 1)
        .build())
}
