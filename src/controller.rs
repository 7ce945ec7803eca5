//! Typestate DMA controller

use crate::{
    interrupt::{Transfer, COMPLETE, IDLE, RUNNING},
    Dma, TransferDescriptor,
};
use core::{
    convert::Infallible,
    fmt::{self, Debug},
    sync::atomic::{self, Ordering},
};

/// The controller has not been initialized (type state)
#[derive(Debug)]
pub struct Uninit;

/// The controller is enabled, but has never been programmed (type state)
#[derive(Debug)]
pub struct Idle;

/// The controller holds a transfer descriptor, and it's ready to start (type state)
#[derive(Debug)]
pub struct Configured(TransferDescriptor);

/// A transfer is in flight (type state)
///
/// While a controller is `Running`, only the interrupt handler may write
/// the control register.
#[derive(Debug)]
pub struct Running(TransferDescriptor);

mod private {
    pub trait Sealed {}
    impl Sealed for super::Idle {}
    impl Sealed for super::Configured {}
}

/// States from which a controller may be (re)programmed
pub trait Configurable: private::Sealed {}
impl Configurable for Idle {}
impl Configurable for Configured {}

/// The DMA controller
///
/// Each operation consumes the controller and returns it in its next state:
///
/// ```text
/// Uninit --init()--> Idle --configure()--> Configured --start()--> Running
///
/// Running --(interrupt acknowledged)--> Configured
/// ```
///
/// A completed transfer leaves its descriptor in the registers, so the
/// controller returns to `Configured`. Starting it again replays the same
/// transfer. Call [`configure`](Controller::configure) to program a new one.
///
/// Use [`Dma::take`] to acquire the controller.
///
/// ```no_run
/// # use hbird_dma::Dma;
/// # static DMA: Dma = unsafe { Dma::new(core::ptr::null()) };
/// let idle = DMA.take().unwrap().init();
/// let configured = idle.configure(0x2000_0000, 0x3000_0000, 0x80).unwrap();
/// let running = unsafe { configured.start() };
/// # let _ = running;
/// ```
///
/// # Call order
///
/// Out-of-order calls don't compile. A controller can't start before it's
/// configured,
///
/// ```compile_fail
/// # use hbird_dma::Dma;
/// # static DMA: Dma = unsafe { Dma::new(core::ptr::null()) };
/// let idle = DMA.take().unwrap().init();
/// let running = unsafe { idle.start() };
/// ```
///
/// or before it's initialized.
///
/// ```compile_fail
/// # use hbird_dma::Dma;
/// # static DMA: Dma = unsafe { Dma::new(core::ptr::null()) };
/// let uninit = DMA.take().unwrap();
/// let running = unsafe { uninit.start() };
/// ```
///
/// A running transfer can't be reprogrammed,
///
/// ```compile_fail
/// # use hbird_dma::Dma;
/// # static DMA: Dma = unsafe { Dma::new(core::ptr::null()) };
/// let configured = DMA.take().unwrap().init().configure(1, 2, 3).unwrap();
/// let running = unsafe { configured.start() };
/// let configured = running.configure(4, 5, 6);
/// ```
///
/// and a controller is initialized once.
///
/// ```compile_fail
/// # use hbird_dma::Dma;
/// # static DMA: Dma = unsafe { Dma::new(core::ptr::null()) };
/// let idle = DMA.take().unwrap().init().init();
/// ```
pub struct Controller<'a, S> {
    dma: &'a Dma,
    state: S,
}

impl<S: Debug> Debug for Controller<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("state", &self.state)
            .finish()
    }
}

impl<'a> Controller<'a, Uninit> {
    pub(crate) fn new(dma: &'a Dma) -> Self {
        Controller { dma, state: Uninit }
    }

    /// Enable the controller and its completion interrupt
    ///
    /// Unmask the controller's interrupt in your interrupt controller
    /// before starting a transfer. That's outside the scope of this driver.
    pub fn init(self) -> Controller<'a, Idle> {
        self.dma.registers().init();
        Controller {
            dma: self.dma,
            state: Idle,
        }
    }
}

impl<'a, S: Configurable> Controller<'a, S> {
    /// Program a transfer of `length` bytes from `source` to `destination`
    ///
    /// The driver accepts the addresses and length as given. This never fails;
    /// the `Result` is kept for callers that expect a status.
    pub fn configure(
        self,
        source: u32,
        destination: u32,
        length: u32,
    ) -> Result<Controller<'a, Configured>, Infallible> {
        self.configure_descriptor(TransferDescriptor::new(source, destination, length))
    }

    /// Program the transfer described by `descriptor`
    ///
    /// See [`configure`](Controller::configure).
    pub fn configure_descriptor(
        self,
        descriptor: TransferDescriptor,
    ) -> Result<Controller<'a, Configured>, Infallible> {
        log::debug!(
            "DMA configure: {:#010X} -> {:#010X}, {} bytes",
            descriptor.source(),
            descriptor.destination(),
            descriptor.length()
        );
        self.dma.registers().configure(&descriptor)?;
        Ok(Controller {
            dma: self.dma,
            state: Configured(descriptor),
        })
    }
}

impl<'a> Controller<'a, Configured> {
    /// Returns the programmed transfer
    pub fn descriptor(&self) -> TransferDescriptor {
        self.state.0
    }

    /// Start the programmed transfer
    ///
    /// Returns immediately. The control register now belongs to the
    /// interrupt handler until it acknowledges the completion interrupt.
    ///
    /// # Safety
    ///
    /// This could initiate a DMA transaction that uses an invalid source or destination.
    /// Caller must ensure that the source and destination described by the descriptor are
    /// valid for the lifetime of the transfer.
    pub unsafe fn start(self) -> Controller<'a, Running> {
        log::debug!("DMA start");
        self.dma.handoff.store(RUNNING, Ordering::Release);
        // The handler must see RUNNING before the transfer can complete.
        atomic::fence(Ordering::SeqCst);
        self.dma.registers().start();
        Controller {
            dma: self.dma,
            state: Running(self.state.0),
        }
    }
}

impl<'a> Controller<'a, Running> {
    /// Returns the transfer in flight
    pub fn descriptor(&self) -> TransferDescriptor {
        self.state.0
    }

    /// Returns `true` once the interrupt handler acknowledged completion
    pub fn is_complete(&self) -> bool {
        self.dma.handoff.load(Ordering::Acquire) == COMPLETE
    }

    /// Take back the controller if the transfer completed
    ///
    /// Returns the controller, unchanged, in `Err` if the transfer is still
    /// in flight.
    pub fn try_complete(self) -> Result<Controller<'a, Configured>, Self> {
        if self.is_complete() {
            self.dma.handoff.store(IDLE, Ordering::Release);
            log::debug!("DMA transfer complete");
            Ok(Controller {
                dma: self.dma,
                state: Configured(self.state.0),
            })
        } else {
            Err(self)
        }
    }

    /// Wait for the transfer to complete
    ///
    /// The future resolves once [`on_interrupt()`](Dma::on_interrupt) acknowledges
    /// the completion interrupt.
    pub fn wait(self) -> Transfer<'a> {
        Transfer::new(self)
    }

    pub(crate) fn dma(&self) -> &'a Dma {
        self.dma
    }
}
