//! DMA controller registers

use crate::{
    ral::{self, RegisterBlock, Static},
    Control,
};
use core::convert::Infallible;

/// Describes one transfer
///
/// A descriptor is written wholesale to SRC, DST and LEN before a transfer
/// starts. The driver does not validate it; addresses and length are passed
/// to the hardware as given.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TransferDescriptor {
    source: u32,
    destination: u32,
    length: u32,
}

impl TransferDescriptor {
    /// Describe a transfer of `length` bytes from `source` to `destination`
    pub const fn new(source: u32, destination: u32, length: u32) -> Self {
        TransferDescriptor {
            source,
            destination,
            length,
        }
    }
    /// Returns the source address
    pub const fn source(&self) -> u32 {
        self.source
    }
    /// Returns the destination address
    pub const fn destination(&self) -> u32 {
        self.destination
    }
    /// Returns the transfer length, in bytes
    pub const fn length(&self) -> u32 {
        self.length
    }
}

/// The DMA controller's register block
///
/// `Registers` is the unsafe, unchecked interface to the controller. It
/// performs the four register operations exactly as the hardware expects
/// them, and it does nothing to enforce their order. Prefer the
/// [`Controller`](crate::Controller) returned by [`Dma::take`](crate::Dma::take),
/// which only permits valid call orders.
///
/// Every control register write is a full overwrite. Never call
/// [`start`](Registers::start) without first calling [`init`](Registers::init),
/// and always [`configure`](Registers::configure) before starting a transfer.
pub struct Registers {
    registers: Static<RegisterBlock>,
}

impl Registers {
    /// Creates a handle to the register block at `registers`
    ///
    /// # Safety
    ///
    /// This will create a handle that may alias global, mutable state.
    ///
    /// `registers` must point to the start of the DMA controller's register
    /// block for your system.
    pub const unsafe fn new(registers: *const ()) -> Self {
        Registers {
            registers: Static(registers.cast()),
        }
    }

    fn write_control(&self, control: Control) {
        log::trace!("DMA_CTR <- {:#04X} ({})", control.bits(), control);
        let ctr = control.bits();
        ral::write_reg!(crate::ral, self.registers, CTR, ctr);
    }

    /// Enable the controller and its completion interrupt
    ///
    /// Writes [`Control::INIT`] to the control register.
    pub fn init(&self) {
        self.write_control(Control::INIT);
    }

    /// Program the next transfer
    ///
    /// Writes SRC, DST, then LEN. The control register is untouched.
    ///
    /// This cannot fail. The result keeps the shape of an interface that
    /// reserved a status value.
    pub fn configure(&self, descriptor: &TransferDescriptor) -> Result<(), Infallible> {
        let (src, dst, len) = (
            descriptor.source(),
            descriptor.destination(),
            descriptor.length(),
        );
        ral::write_reg!(crate::ral, self.registers, SRC, src);
        ral::write_reg!(crate::ral, self.registers, DST, dst);
        ral::write_reg!(crate::ral, self.registers, LEN, len);
        Ok(())
    }

    /// Start the programmed transfer
    ///
    /// Writes [`Control::START_TRANSFER`] to the control register, and
    /// returns immediately. The controller signals completion with its
    /// interrupt.
    ///
    /// # Safety
    ///
    /// This could initiate a DMA transaction that uses an invalid source or destination.
    /// Caller must ensure that the source and destination programmed in the registers are
    /// valid for the lifetime of the transfer.
    pub unsafe fn start(&self) {
        self.write_control(Control::START_TRANSFER);
    }

    /// Acknowledge the completion interrupt
    ///
    /// Writes [`Control::ACKNOWLEDGE`] to the control register. This is an
    /// overwrite, not a toggle; acknowledging twice leaves the same value
    /// in the register.
    pub fn acknowledge_interrupt(&self) {
        self.write_control(Control::ACKNOWLEDGE);
    }

    /// Returns the control register
    pub fn control(&self) -> Control {
        let ctr = ral::read_reg!(crate::ral, self.registers, CTR);
        Control::from_bits_retain(ctr)
    }

    /// Returns the source address register
    pub fn source_address(&self) -> u32 {
        ral::read_reg!(crate::ral, self.registers, SRC)
    }

    /// Returns the destination address register
    pub fn destination_address(&self) -> u32 {
        ral::read_reg!(crate::ral, self.registers, DST)
    }

    /// Returns the length register
    pub fn length(&self) -> u32 {
        ral::read_reg!(crate::ral, self.registers, LEN)
    }

    /// Returns the descriptor currently held in SRC, DST and LEN
    pub fn descriptor(&self) -> TransferDescriptor {
        TransferDescriptor::new(
            self.source_address(),
            self.destination_address(),
            self.length(),
        )
    }
}

// It's OK to send the registers across an execution context.
// They can't be cloned or copied, so there's no chance of
// them being (mutably) shared.
unsafe impl Send for Registers {}

#[cfg(test)]
mod tests {
    use super::{Registers, TransferDescriptor};
    use crate::{ral::MockRegisters, Control};

    const DESCRIPTOR: TransferDescriptor = TransferDescriptor::new(0x2000_0000, 0x3000_0000, 0x80);

    fn registers(mock: &MockRegisters) -> Registers {
        // Safety: the mock outlives the handle in every test.
        unsafe { Registers::new(mock.as_ptr()) }
    }

    #[test]
    fn init_enables_module_and_interrupt() {
        let mock = MockRegisters::new();
        let regs = registers(&mock);
        regs.init();
        assert_eq!(mock.block().CTR.read(), 0b1100_0000);
        assert_eq!(regs.control(), Control::INIT);
    }

    #[test]
    fn configure_writes_descriptor_and_keeps_control() {
        let mock = MockRegisters::new();
        let regs = registers(&mock);
        regs.init();
        let before = mock.block().CTR.read();

        regs.configure(&DESCRIPTOR).unwrap();

        let block = mock.block();
        assert_eq!(block.SRC.read(), 0x2000_0000);
        assert_eq!(block.DST.read(), 0x3000_0000);
        assert_eq!(block.LEN.read(), 0x80);
        assert_eq!(block.CTR.read(), before);
        assert_eq!(regs.descriptor(), DESCRIPTOR);
    }

    #[test]
    fn start_after_init() {
        let mock = MockRegisters::new();
        let regs = registers(&mock);
        regs.init();
        unsafe { regs.start() };
        assert_eq!(mock.block().CTR.read(), 0b1110_0000);
    }

    #[test]
    fn acknowledge_overwrites_control() {
        let mock = MockRegisters::new();
        let regs = registers(&mock);
        regs.acknowledge_interrupt();
        assert_eq!(mock.block().CTR.read(), 0b1111_0000);
    }

    #[test]
    fn acknowledge_is_idempotent() {
        let mock = MockRegisters::new();
        let regs = registers(&mock);
        regs.init();
        regs.acknowledge_interrupt();
        assert_eq!(mock.block().CTR.read(), 0b1111_0000);
        regs.acknowledge_interrupt();
        assert_eq!(mock.block().CTR.read(), 0b1111_0000);
    }

    #[test]
    fn full_sequence() {
        let mock = MockRegisters::new();
        let regs = registers(&mock);
        let block = mock.block();

        regs.init();
        assert_eq!(block.CTR.read(), 0b1100_0000);

        regs.configure(&DESCRIPTOR).unwrap();
        assert_eq!(
            (block.SRC.read(), block.DST.read(), block.LEN.read()),
            (0x2000_0000, 0x3000_0000, 0x80)
        );
        assert_eq!(block.CTR.read(), 0b1100_0000);

        unsafe { regs.start() };
        assert_eq!(block.CTR.read(), 0b1110_0000);

        regs.acknowledge_interrupt();
        assert_eq!(block.CTR.read(), 0b1111_0000);
        assert_eq!(regs.descriptor(), DESCRIPTOR);
    }

    #[test]
    fn configure_does_not_validate() {
        let mock = MockRegisters::new();
        let regs = registers(&mock);
        let odd = TransferDescriptor::new(0xFFFF_FFFF, 0, 0);
        regs.configure(&odd).unwrap();
        assert_eq!(regs.descriptor(), odd);
    }
}
