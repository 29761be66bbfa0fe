//! Display error taxonomy
//!
//! Every fallible display operation fails with exactly one of these kinds.
//! The set is closed so callers can match exhaustively and the contract
//! does not leak platform error numbers.

/// Errors that can occur with display operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisplayError {
    /// Requested region exceeds the panel resolution
    OutOfBounds,
    /// Supplied buffer is smaller than pitch, height and format require
    BufferTooSmall,
    /// Pixel format is not in the driver's supported set
    UnsupportedFormat,
    /// Operation has no hardware backing on this driver
    Unsupported,
    /// Operation requires the `On` state and the driver does not auto-power
    NotPoweredOn,
    /// Bus or controller reported a failure
    HardwareFault,
    /// A bounded wait exceeded its budget
    Timeout,
}

impl DisplayError {
    /// Check if this error only reports a missing capability
    ///
    /// These are discovery signals: the caller should adapt (pick another
    /// format, skip the feature) rather than treat the panel as broken.
    pub fn is_capability_signal(&self) -> bool {
        matches!(self, Self::Unsupported | Self::UnsupportedFormat)
    }

    /// Check if this error may clear on a caller-level retry
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::HardwareFault | Self::Timeout)
    }
}

impl core::fmt::Display for DisplayError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::OutOfBounds => write!(f, "Region exceeds panel resolution"),
            Self::BufferTooSmall => write!(f, "Buffer too small for region"),
            Self::UnsupportedFormat => write!(f, "Pixel format not supported"),
            Self::Unsupported => write!(f, "Operation not supported by driver"),
            Self::NotPoweredOn => write!(f, "Display is powered off"),
            Self::HardwareFault => write!(f, "Display hardware fault"),
            Self::Timeout => write!(f, "Display operation timeout"),
        }
    }
}

impl core::error::Error for DisplayError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_signals() {
        assert!(DisplayError::Unsupported.is_capability_signal());
        assert!(DisplayError::UnsupportedFormat.is_capability_signal());
        assert!(!DisplayError::HardwareFault.is_capability_signal());
        assert!(!DisplayError::OutOfBounds.is_capability_signal());
    }

    #[test]
    fn test_transient_errors() {
        assert!(DisplayError::HardwareFault.is_transient());
        assert!(DisplayError::Timeout.is_transient());
        assert!(!DisplayError::NotPoweredOn.is_transient());
        assert!(!DisplayError::BufferTooSmall.is_transient());
    }
}
