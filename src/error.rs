//! DMA error status

use crate::Control;
use core::fmt::{self, Debug, Display};

/// Why a DMA operation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The interrupt handler ran, but no transfer was in flight
    ///
    /// The handler does not touch the control register in this case.
    SpuriousInterrupt,
}

/// A DMA error
///
/// The wrapper contains a copy of the controller's control
/// register at the point of the error. The wrapper implements
/// both `Debug` and `Display`. The type may be printed to
/// understand the controller state at the time of the error.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
    /// The raw control register
    ctr: u8,
}

impl Error {
    pub(crate) const fn new(kind: ErrorKind, ctr: u8) -> Self {
        Error { kind, ctr }
    }
    /// Returns the kind of error
    pub const fn kind(self) -> ErrorKind {
        self.kind
    }
    /// Returns the raw control register value
    pub const fn raw(self) -> u8 {
        self.ctr
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}(DMA_CTR({:#04X}))", self.kind, self.ctr)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self.kind {
            ErrorKind::SpuriousInterrupt => "spurious DMA interrupt",
        };
        write!(
            f,
            "{what}, DMA_CTR: {ctr}",
            ctr = Control::from_bits_retain(self.ctr)
        )
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use std::format;

    use super::{Error, ErrorKind};

    #[test]
    fn display_decodes_control_bits() {
        let err = Error::new(ErrorKind::SpuriousInterrupt, 0b1100_0000);
        assert_eq!(
            format!("{err}"),
            "spurious DMA interrupt, DMA_CTR: EN 1 IE 1 STA 0 IRQ 0"
        );
    }

    #[test]
    fn debug_shows_raw_register() {
        let err = Error::new(ErrorKind::SpuriousInterrupt, 0xF0);
        assert_eq!(format!("{err:?}"), "SpuriousInterrupt(DMA_CTR(0xF0))");
        assert_eq!(err.raw(), 0xF0);
        assert_eq!(err.kind(), ErrorKind::SpuriousInterrupt);
    }
}
