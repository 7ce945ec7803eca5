//! A RAL-like module to support DMA register access
//!
//! The controller only has four registers, so there's no generated RAL to
//! lean on. This module describes the register block by hand, and re-exports
//! the RAL macros so that the rest of the driver reads like any other RAL
//! user.

#![allow(
    non_snake_case, // Compatibility with RAL
)]

pub use ral_registers::{read_reg, write_reg};
use ral_registers::RWRegister;

/// DMA controller registers
#[repr(C)]
pub struct RegisterBlock {
    /// Source address
    pub SRC: RWRegister<u32>,
    /// Destination address
    pub DST: RWRegister<u32>,
    /// Transfer length, in bytes
    pub LEN: RWRegister<u32>,
    /// Control register
    ///
    /// See [`Control`](crate::Control) for the bitfield.
    pub CTR: RWRegister<u8>,
    _reserved0: [u8; 3],
}

const _: () = assert!(core::mem::offset_of!(RegisterBlock, SRC) == 0x00);
const _: () = assert!(core::mem::offset_of!(RegisterBlock, DST) == 0x04);
const _: () = assert!(core::mem::offset_of!(RegisterBlock, LEN) == 0x08);
const _: () = assert!(core::mem::offset_of!(RegisterBlock, CTR) == 0x0c);
const _: () = assert!(core::mem::size_of::<RegisterBlock>() == 0x10);

//
// Helper types for static memory
//
// Similar to the RAL's `Instance` type, but more copy.
//

pub(crate) struct Static<T>(pub(crate) *const T);
impl<T> core::ops::Deref for Static<T> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        // Safety: pointer points to static memory (peripheral memory)
        unsafe { &*self.0 }
    }
}
impl<T> Clone for Static<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for Static<T> {}

/// Plain memory standing in for the peripheral in host tests
#[cfg(test)]
pub(crate) struct MockRegisters(core::cell::UnsafeCell<[u32; 4]>);

#[cfg(test)]
impl MockRegisters {
    pub(crate) const fn new() -> Self {
        MockRegisters(core::cell::UnsafeCell::new([0; 4]))
    }
    pub(crate) fn as_ptr(&self) -> *const () {
        self.0.get().cast()
    }
    pub(crate) fn block(&self) -> &RegisterBlock {
        // Safety: same size and alignment as the register block, and
        // every access goes through the register cells.
        unsafe { &*self.0.get().cast() }
    }
}
