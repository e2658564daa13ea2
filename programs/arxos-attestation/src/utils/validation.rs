//! Input validation for free-text reasons attached to flags and disputes

use anchor_lang::prelude::*;

use crate::errors::AttestationError;

/// Maximum reason length in bytes
pub const MAX_REASON_LEN: usize = 256;

/// Printable ASCII and spaces only. Empty is allowed.
pub fn is_printable(s: &str) -> bool {
    s.chars().all(|c| c.is_ascii_graphic() || c == ' ')
}

/// Reject reasons that are too long or contain control / non-ASCII bytes.
pub fn validate_reason(reason: &str) -> Result<()> {
    require!(
        reason.len() <= MAX_REASON_LEN && is_printable(reason),
        AttestationError::InvalidReason
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_plain_reasons() {
        assert!(validate_reason("photo evidence shows a different floor").is_ok());
        assert!(validate_reason("ipfs://QmHash123 contradicts reported hours").is_ok());
        assert!(validate_reason("").is_ok());
    }

    #[test]
    fn test_rejects_control_and_unicode() {
        assert!(!is_printable("hello\x00world"));
        assert!(!is_printable("line\nbreak"));
        assert!(!is_printable("tab\there"));
        assert!(!is_printable("caf\u{e9}"));
        assert!(validate_reason("bad\r\nreason").is_err());
    }

    #[test]
    fn test_length_boundary() {
        assert!(validate_reason(&"a".repeat(MAX_REASON_LEN)).is_ok());
        assert!(validate_reason(&"a".repeat(MAX_REASON_LEN + 1)).is_err());
    }
}
