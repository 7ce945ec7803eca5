//! Direct Memory Access (DMA) driver for the HBird DMA controller
//!
//! `hbird-dma` provides
//!
//! - an unsafe API, [`Registers`], that performs the controller's four
//!   register operations without checking their order
//! - a typestate [`Controller`] that only permits valid call orders, and
//!   hands the control register between the main context and the
//!   interrupt handler
//! - a safe DMA future for memcpy transfers
//!
//! The controller has a single channel. It transfers a block of bytes from a
//! source address to a destination address, then raises its completion
//! interrupt.
//!
//! # Getting started
//!
//! Assign a [`Dma`] to a static, using the controller's base address for
//! your platform. Route the controller's interrupt to a handler that calls
//! [`on_interrupt()`](Dma::on_interrupt).
//!
//! ```no_run
//! use hbird_dma::Dma;
//! # const DMA_BASE: *const () = core::ptr::null();
//!
//! // Safety: DMA_BASE is the controller's register block.
//! static DMA: Dma = unsafe { Dma::new(DMA_BASE) };
//!
//! // Called by the platform's external interrupt dispatcher.
//! fn dma_interrupt() {
//!     let _ = DMA.on_interrupt();
//! }
//!
//! let controller = DMA.take().unwrap().init();
//! let controller = controller.configure(0x2000_0000, 0x3000_0000, 0x80).unwrap();
//! // Safety: the descriptor describes valid memory for this system.
//! let running = unsafe { controller.start() };
//!
//! let controller = hbird_dma::block(core::pin::pin!(running.wait()));
//! ```
//!
//! For buffers in memory, use [`memcpy`](crate::memcpy::memcpy), which
//! borrows both buffers until the transfer completes.
//!
//! ### License
//!
//! Licensed under either of
//!
//! - [Apache License, Version 2.0](http://www.apache.org/licenses/LICENSE-2.0) ([LICENSE-APACHE](./LICENSE-APACHE))
//! - [MIT License](http://opensource.org/licenses/MIT) ([LICENSE-MIT](./LICENSE-MIT))
//!
//! at your option.
//!
//! Unless you explicitly state otherwise, any contribution intentionally submitted
//! for inclusion in the work by you, as defined in the Apache-2.0 license, shall be
//! dual licensed as above, without any additional terms or conditions.

#![no_std]

mod control;
mod controller;
mod element;
mod error;
mod interrupt;
pub mod memcpy;
mod ral;
mod registers;

pub use control::Control;
pub use controller::{Configurable, Configured, Controller, Idle, Running, Uninit};
pub use element::Element;
pub use error::{Error, ErrorKind};
pub use interrupt::Transfer;
pub use registers::{Registers, TransferDescriptor};

use core::{
    cell::Cell,
    sync::atomic::{AtomicU8, Ordering},
};
use critical_section::Mutex;
use interrupt::{SharedWaker, ACKNOWLEDGING, COMPLETE, IDLE, NO_WAKER, RUNNING};

/// A DMA result
pub type Result<T> = core::result::Result<T, Error>;

/// A DMA driver.
///
/// `Dma` represents one physical DMA controller. It's configured with a
/// pointer to the controller's register block, and it hands out the single
/// [`Controller`] for that block.
///
/// `Dma` also holds the state shared with the interrupt handler. Call
/// [`on_interrupt()`](Dma::on_interrupt) from the controller's interrupt
/// handler.
pub struct Dma {
    registers: Registers,
    taken: Mutex<Cell<bool>>,
    handoff: AtomicU8,
    waker: SharedWaker,
}

// Safety: OK to allocate a DMA driver in a static context.
unsafe impl Sync for Dma {}

impl Dma {
    /// Create the DMA driver.
    ///
    /// Note that this can evaluate at compile time. Consider using this to
    /// expose a `Dma` through your higher-level API.
    ///
    /// # Safety
    ///
    /// Caller must make sure that `registers` is a pointer to the start of the
    /// DMA controller register block, and that it's valid for your MCU.
    ///
    /// Create at most one `Dma` per controller. Two drivers for the same
    /// controller would race on the same registers.
    pub const unsafe fn new(registers: *const ()) -> Self {
        Self {
            registers: Registers::new(registers),
            taken: Mutex::new(Cell::new(false)),
            handoff: AtomicU8::new(IDLE),
            waker: NO_WAKER,
        }
    }

    /// Take the controller.
    ///
    /// Returns `Some` the first time it's called, and `None` while the
    /// controller is out.
    ///
    /// Dropping an unfinished [`Transfer`] returns the controller to the
    /// driver. Once the interrupt handler acknowledges that transfer, `take`
    /// hands out a new, uninitialized controller. Until then, it returns
    /// `None`.
    pub fn take(&self) -> Option<Controller<'_, Uninit>> {
        critical_section::with(|cs| {
            let taken = self.taken.borrow(cs);
            if taken.get() {
                return None;
            }
            match self.handoff.load(Ordering::Acquire) {
                RUNNING | ACKNOWLEDGING => return None,
                COMPLETE => self.handoff.store(IDLE, Ordering::Release),
                _ => {}
            }
            taken.set(true);
            Some(Controller::new(self))
        })
    }

    /// Give the controller back, after its transfer was abandoned
    pub(crate) fn release(&self) {
        critical_section::with(|cs| {
            self.taken.borrow(cs).set(false);
            *self.waker.borrow(cs).borrow_mut() = None;
        });
    }

    pub(crate) fn registers(&self) -> &Registers {
        &self.registers
    }
}

use core::{future::Future, pin::Pin, task::Poll};

/// Poll a future with a dummy waker.
///
/// Use `poll_no_wake` when you want to drive a future to completion, but you
/// don't care about the future waking an executor. It may be used to initiate
/// a DMA transfer that will later be awaited with [`block`].
///
/// Do not use `poll_no_wake` if you want an executor to be woken when the DMA
/// transfer completes.
pub fn poll_no_wake<F>(future: Pin<&mut F>) -> Poll<F::Output>
where
    F: Future,
{
    use core::task::{Context, RawWaker, RawWakerVTable, Waker};
    const VTABLE: RawWakerVTable = RawWakerVTable::new(|_| RAW_WAKER, |_| {}, |_| {}, |_| {});

    const RAW_WAKER: RawWaker = RawWaker::new(core::ptr::null(), &VTABLE);
    // Safety: raw waker meets documented requirements.
    let waker = unsafe { Waker::from_raw(RAW_WAKER) };
    let mut context = Context::from_waker(&waker);
    future.poll(&mut context)
}

/// Block until the future returns a result.
///
/// `block` invokes [`poll_no_wake`] in a loop until the future
/// returns a result. Consider using `block` after starting a transfer,
/// and after doing other work.
pub fn block<F>(mut future: Pin<&mut F>) -> F::Output
where
    F: Future,
{
    loop {
        match poll_no_wake(future.as_mut()) {
            Poll::Ready(result) => return result,
            Poll::Pending => {}
        }
    }
}
