//! DMA elements

mod private {
    pub trait Sealed {}

    impl Sealed for u8 {}
    impl Sealed for i8 {}
    impl Sealed for u16 {}
    impl Sealed for i16 {}
    impl Sealed for u32 {}
    impl Sealed for i32 {}
}

/// An element that can be moved by a buffer-based DMA transfer
///
/// The controller counts transfers in bytes, so an element only needs to
/// report its width. `Element` is sealed and implemented for the primitive
/// integers up to 32 bits.
pub trait Element: Copy + private::Sealed {}

impl Element for u8 {}
impl Element for i8 {}
impl Element for u16 {}
impl Element for i16 {}
impl Element for u32 {}
impl Element for i32 {}

/// Returns the size, in bytes, of `count` elements
///
/// Saturates at `u32::MAX`, the largest length the LEN register can express.
pub(crate) fn byte_len<E: Element>(count: usize) -> u32 {
    let bytes = core::mem::size_of::<E>().saturating_mul(count);
    u32::try_from(bytes).unwrap_or(u32::MAX)
}
