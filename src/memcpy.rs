//! DMA-powered memcpy

use crate::{
    element::byte_len, interrupt::Transfer, Configurable, Configured, Controller, Element,
};

use core::{
    future::Future,
    marker::PhantomData,
    pin::Pin,
    task::{Context, Poll},
};

/// A memcpy operation
///
/// The future yields the controller when the copy is complete. It borrows
/// both buffers until then.
pub struct Memcpy<'a, 'b, E: Element> {
    transfer: Transfer<'a>,
    _buffers: PhantomData<(&'b [E], &'b mut [E])>,
}

/// Perform a DMA-powered `memcpy` between the `source` and `destination` buffers
///
/// Copies the minimum number of elements between the two buffers. The transfer
/// starts before `memcpy` returns. You're responsible for enabling the DMA
/// interrupt, and calling [`on_interrupt`](crate::Dma::on_interrupt) when it fires.
///
/// Dropping the future before it resolves blocks until the interrupt handler
/// acknowledges the transfer, then returns the controller to the driver; use
/// [`Dma::take`](crate::Dma::take) to get it back. Don't drop it from a
/// context that masks the DMA interrupt, and don't leak it.
///
/// The controller addresses memory with 32-bit addresses. Both buffers must
/// be reachable by the controller.
///
/// # Panics
///
/// Panics if either buffer's address doesn't fit in 32 bits.
///
/// ```no_run
/// use hbird_dma::{memcpy::memcpy, Dma};
/// # const DMA_BASE: *const () = core::ptr::null();
///
/// static DMA: Dma = unsafe { Dma::new(DMA_BASE) };
///
/// let source = [1u32; 32];
/// let mut destination = [0u32; 32];
///
/// let controller = DMA.take().unwrap().init();
/// let copy = memcpy(controller, &source, &mut destination);
/// let controller = hbird_dma::block(core::pin::pin!(copy));
/// assert_eq!(source, destination);
///
/// // Start the same copy again.
/// let running = unsafe { controller.start() };
/// # let _ = running;
/// ```
pub fn memcpy<'a, 'b, S, E>(
    controller: Controller<'a, S>,
    source: &'b [E],
    destination: &'b mut [E],
) -> Memcpy<'a, 'b, E>
where
    S: Configurable,
    E: Element,
{
    let length = byte_len::<E>(source.len().min(destination.len()));
    let Ok(controller) = controller.configure(
        bus_address(source.as_ptr()),
        bus_address(destination.as_mut_ptr()),
        length,
    );

    Memcpy {
        // Safety: both buffers are borrowed for the lifetime of the
        // transfer, and the length doesn't exceed the shorter buffer.
        transfer: unsafe { controller.start() }.wait(),
        _buffers: PhantomData,
    }
}

/// Returns the 32-bit address the controller uses for `ptr`
fn bus_address<E>(ptr: *const E) -> u32 {
    let addr = ptr as usize;
    match u32::try_from(addr) {
        Ok(addr) => addr,
        Err(_) => panic!("DMA buffer address {:#X} exceeds 32 bits", addr),
    }
}

impl<'a, E: Element> Future for Memcpy<'a, '_, E> {
    type Output = Controller<'a, Configured>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.transfer).poll(cx)
    }
}

impl<E: Element> Drop for Memcpy<'_, '_, E> {
    fn drop(&mut self) {
        // The hardware can't be stopped. Keep the buffers borrowed
        // until the interrupt handler acknowledges completion.
        while self.transfer.is_in_flight() {}
        // Dropping `transfer` then returns the controller to the driver.
    }
}
