//! Control register bitfield

use core::fmt::{self, Display};

bitflags::bitflags! {
    /// The CTR bitfield
    ///
    /// Software never reads-modifies-writes this register. Every operation
    /// writes one of the whole control words: [`INIT`](Control::INIT),
    /// [`START`](Control::START_TRANSFER), or
    /// [`ACKNOWLEDGE`](Control::ACKNOWLEDGE).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Control: u8 {
        /// Module enable
        const ENABLE = 1 << 7;
        /// Completion interrupt enable
        const INTERRUPT_ENABLE = 1 << 6;
        /// Start the programmed transfer
        const START = 1 << 5;
        /// Interrupt acknowledge strobe
        const IRQ = 1 << 4;
    }
}

impl Control {
    /// Module and interrupt enabled, idle
    pub const INIT: Control = Control::ENABLE.union(Control::INTERRUPT_ENABLE);
    /// Enabled, and START asserted
    pub const START_TRANSFER: Control = Control::INIT.union(Control::START);
    /// Enabled, START held, and the IRQ acknowledge strobe
    pub const ACKNOWLEDGE: Control = Control::START_TRANSFER.union(Control::IRQ);
}

impl Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EN {en} IE {ie} STA {sta} IRQ {irq}",
            en = self.contains(Control::ENABLE) as u8,
            ie = self.contains(Control::INTERRUPT_ENABLE) as u8,
            sta = self.contains(Control::START) as u8,
            irq = self.contains(Control::IRQ) as u8,
        )
    }
}
