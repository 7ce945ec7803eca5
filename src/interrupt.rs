//! DMA interrupt support
//!
//! The control register is handed between the main context and the
//! interrupt handler through `Dma::handoff`:
//!
//! - `IDLE`: the main context owns the control register.
//! - `RUNNING`: a transfer is in flight. Only the handler may write the
//!   control register.
//! - `ACKNOWLEDGING`: the handler claimed the interrupt and is writing the
//!   acknowledge word.
//! - `COMPLETE`: the handler is done with the control register. The main
//!   context takes it back, and stores `IDLE`.
//!
//! Only loads and stores touch the hand-off word, so this works on cores
//! without compare-and-swap.

use crate::{Configured, Controller, Dma, Error, ErrorKind, Running};
use core::{
    cell::RefCell,
    future::Future,
    pin::Pin,
    sync::atomic::Ordering,
    task::{Context, Poll, Waker},
};

use critical_section::Mutex;

pub(crate) const IDLE: u8 = 0;
pub(crate) const RUNNING: u8 = 1;
pub(crate) const ACKNOWLEDGING: u8 = 2;
pub(crate) const COMPLETE: u8 = 3;

pub(crate) type SharedWaker = Mutex<RefCell<Option<Waker>>>;
pub(crate) const NO_WAKER: SharedWaker = Mutex::new(RefCell::new(None));

impl Dma {
    /// Handle the DMA completion interrupt
    ///
    /// If a transfer is in flight, `on_interrupt` acknowledges the interrupt
    /// at the controller, hands the control register back to the main
    /// context, and wakes the transfer's waker.
    ///
    /// Call `on_interrupt` from the handler that your platform's interrupt
    /// dispatcher runs for the DMA interrupt line:
    ///
    /// ```no_run
    /// use hbird_dma::Dma;
    /// # const DMA_BASE: *const () = core::ptr::null();
    ///
    /// static DMA: Dma = unsafe { Dma::new(DMA_BASE) };
    ///
    /// fn handle_dma_interrupt() {
    ///     if let Err(err) = DMA.on_interrupt() {
    ///         // Nothing was running; the controller was left alone.
    ///         # let _ = err;
    ///     }
    /// }
    /// ```
    ///
    /// Returns an error, and leaves the control register alone, if no
    /// transfer is in flight.
    pub fn on_interrupt(&self) -> crate::Result<()> {
        let claimed = critical_section::with(|_| {
            if self.handoff.load(Ordering::Acquire) == RUNNING {
                self.handoff.store(ACKNOWLEDGING, Ordering::Relaxed);
                Ok(())
            } else {
                let ctr = self.registers().control().bits();
                Err(Error::new(ErrorKind::SpuriousInterrupt, ctr))
            }
        });
        if let Err(err) = claimed {
            log::warn!("{}", err);
            return Err(err);
        }

        self.registers().acknowledge_interrupt();
        self.handoff.store(COMPLETE, Ordering::Release);

        let waker = critical_section::with(|cs| self.waker.borrow(cs).borrow_mut().take());
        if let Some(waker) = waker {
            waker.wake();
        }
        Ok(())
    }
}

/// The root DMA transfer future
///
/// `Transfer` is woken by a call to [`on_interrupt()`](Dma::on_interrupt) once the
/// transfer is complete. It resolves with the controller, ready to start again.
///
/// Dropping a `Transfer` before it resolves returns the controller to the
/// [`Dma`] driver. The hardware can't cancel a transfer, so it still runs to
/// completion, and the interrupt handler still acknowledges it. After that,
/// [`Dma::take`] hands out the controller again.
///
/// # Panics
///
/// Polling a `Transfer` after it returned `Poll::Ready` panics.
pub struct Transfer<'a> {
    dma: &'a Dma,
    controller: Option<Controller<'a, Running>>,
}

impl<'a> Transfer<'a> {
    pub(crate) fn new(controller: Controller<'a, Running>) -> Self {
        Transfer {
            dma: controller.dma(),
            controller: Some(controller),
        }
    }

    /// Returns `true` until the interrupt handler acknowledges the transfer
    pub(crate) fn is_in_flight(&self) -> bool {
        self.controller
            .as_ref()
            .is_some_and(|controller| !controller.is_complete())
    }
}

impl<'a> Future for Transfer<'a> {
    type Output = Controller<'a, Configured>;
    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        critical_section::with(|cs| {
            let mut waker = this.dma.waker.borrow(cs).borrow_mut();
            *waker = Some(cx.waker().clone());
        });

        let Some(controller) = this.controller.take() else {
            panic!("DMA transfer polled after completion");
        };
        match controller.try_complete() {
            Ok(controller) => Poll::Ready(controller),
            Err(controller) => {
                this.controller = Some(controller);
                Poll::Pending
            }
        }
    }
}

impl Drop for Transfer<'_> {
    fn drop(&mut self) {
        // A resolved transfer may no longer own the waker slot.
        if self.controller.take().is_some() {
            self.dma.release();
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use crate::{ral::MockRegisters, Dma, ErrorKind, TransferDescriptor};
    use core::{
        future::Future,
        pin::pin,
        sync::atomic::{AtomicUsize, Ordering},
        task::{Context, Poll, Waker},
    };
    use std::{sync::Arc, task::Wake};

    #[derive(Default)]
    struct CountingWaker(AtomicUsize);

    impl Wake for CountingWaker {
        fn wake(self: Arc<Self>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn interrupt_wakes_transfer() {
        let mock = MockRegisters::new();
        let dma = unsafe { Dma::new(mock.as_ptr()) };
        let configured = dma
            .take()
            .unwrap()
            .init()
            .configure(0x2000_0000, 0x3000_0000, 0x80)
            .unwrap();
        let running = unsafe { configured.start() };

        let counter = Arc::new(CountingWaker::default());
        let waker = Waker::from(counter.clone());
        let mut cx = Context::from_waker(&waker);

        let mut transfer = pin!(running.wait());
        assert!(transfer.as_mut().poll(&mut cx).is_pending());
        assert_eq!(counter.0.load(Ordering::SeqCst), 0);

        dma.on_interrupt().unwrap();
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
        assert_eq!(mock.block().CTR.read(), 0b1111_0000);

        match transfer.as_mut().poll(&mut cx) {
            Poll::Ready(controller) => assert_eq!(
                controller.descriptor(),
                TransferDescriptor::new(0x2000_0000, 0x3000_0000, 0x80)
            ),
            Poll::Pending => panic!("transfer should be complete"),
        }
    }

    #[test]
    fn second_interrupt_is_spurious() {
        let mock = MockRegisters::new();
        let dma = unsafe { Dma::new(mock.as_ptr()) };
        let configured = dma.take().unwrap().init().configure(1, 2, 3).unwrap();
        let _running = unsafe { configured.start() };

        dma.on_interrupt().unwrap();
        assert_eq!(mock.block().CTR.read(), 0b1111_0000);

        let err = dma.on_interrupt().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SpuriousInterrupt);
        assert_eq!(err.raw(), 0b1111_0000);
        assert_eq!(mock.block().CTR.read(), 0b1111_0000);
    }

    #[test]
    fn interrupt_without_controller_is_spurious() {
        let mock = MockRegisters::new();
        let dma = unsafe { Dma::new(mock.as_ptr()) };
        let err = dma.on_interrupt().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SpuriousInterrupt);
        assert_eq!(mock.block().CTR.read(), 0);
    }

    #[test]
    fn completed_before_first_poll() {
        let mock = MockRegisters::new();
        let dma = unsafe { Dma::new(mock.as_ptr()) };
        let configured = dma.take().unwrap().init().configure(1, 2, 3).unwrap();
        let running = unsafe { configured.start() };
        dma.on_interrupt().unwrap();

        let controller = crate::block(pin!(running.wait()));
        assert_eq!(controller.descriptor(), TransferDescriptor::new(1, 2, 3));
    }

    #[test]
    fn dropped_transfer_clears_waker() {
        let mock = MockRegisters::new();
        let dma = unsafe { Dma::new(mock.as_ptr()) };
        let configured = dma.take().unwrap().init().configure(1, 2, 3).unwrap();
        let running = unsafe { configured.start() };

        let counter = Arc::new(CountingWaker::default());
        let waker = Waker::from(counter.clone());
        let mut cx = Context::from_waker(&waker);
        {
            let mut transfer = pin!(running.wait());
            assert!(transfer.as_mut().poll(&mut cx).is_pending());
        }

        dma.on_interrupt().unwrap();
        assert_eq!(counter.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn abandoned_transfer_returns_controller() {
        let mock = MockRegisters::new();
        let dma = unsafe { Dma::new(mock.as_ptr()) };
        let configured = dma.take().unwrap().init().configure(1, 2, 3).unwrap();
        let running = unsafe { configured.start() };
        {
            let mut transfer = pin!(running.wait());
            assert!(crate::poll_no_wake(transfer.as_mut()).is_pending());
        }

        // Still in flight; the handler owns the control register.
        assert!(dma.take().is_none());
        assert_eq!(mock.block().CTR.read(), 0b1110_0000);

        dma.on_interrupt().unwrap();
        let configured = dma.take().unwrap().init().configure(4, 5, 6).unwrap();
        assert_eq!(mock.block().CTR.read(), 0b1100_0000);
        assert!(dma.take().is_none());

        let running = unsafe { configured.start() };
        dma.on_interrupt().unwrap();
        let controller = crate::block(pin!(running.wait()));
        assert_eq!(controller.descriptor(), TransferDescriptor::new(4, 5, 6));
    }

    #[test]
    fn abandoned_after_completion_is_reusable() {
        let mock = MockRegisters::new();
        let dma = unsafe { Dma::new(mock.as_ptr()) };
        let configured = dma.take().unwrap().init().configure(1, 2, 3).unwrap();
        let transfer = unsafe { configured.start() }.wait();
        dma.on_interrupt().unwrap();
        drop(transfer);

        assert!(dma.take().is_some());
        assert!(dma.on_interrupt().is_err());
    }
}
