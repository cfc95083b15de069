//! Terminal rendering of pairing QR codes.

use blacksky_core::error::BlackskyError;

/// Render a QR payload for terminal display using Unicode half-block characters.
///
/// Two rows of modules are packed into one line of text, so the code is
/// roughly square in a typical terminal font.
pub fn generate_qr_terminal(qr_data: &str) -> Result<String, BlackskyError> {
    use qrcode::{Color, EcLevel, QrCode};

    let code = QrCode::with_error_correction_level(qr_data.as_bytes(), EcLevel::L)
        .map_err(|e| BlackskyError::Transport(format!("QR generation failed: {e}")))?;

    let width = code.width();
    let colors: Vec<Color> = code.into_colors();
    let is_dark = |row: usize, col: usize| -> bool {
        row < width && col < width && colors[row * width + col] == Color::Dark
    };

    let mut out = String::new();
    for row in (0..width).step_by(2) {
        for col in 0..width {
            out.push(match (is_dark(row, col), is_dark(row + 1, col)) {
                (true, true) => '█',
                (true, false) => '▀',
                (false, true) => '▄',
                (false, false) => ' ',
            });
        }
        out.push('\n');
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_qr_terminal() {
        let qr = generate_qr_terminal("2@pairing-ref,device-key,identity-key,adv").unwrap();
        let lines: Vec<&str> = qr.lines().collect();
        assert!(!lines.is_empty());
        // Half-block packing: one text line per two module rows.
        let width = lines[0].chars().count();
        assert_eq!(lines.len(), width.div_ceil(2));
        assert!(lines.iter().all(|l| l.chars().count() == width));
    }
}
