//! Status register definitions

use bitflags::bitflags;

bitflags! {
    /// Status register bits.
    ///
    /// The register is read fresh on every query and never cached; BUSY and
    /// WEL change underneath the host as the device executes commands.
    /// Unknown bits are retained so the raw register value survives a round
    /// trip through [`Status::bits`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Status: u8 {
        /// Erase or write in progress. The device ignores new commands
        /// while this is set.
        const BUSY = 1 << 0;
        /// Write enable latch. Set by the Write Enable command, cleared
        /// automatically when a modifying command completes or aborts.
        const WEL = 1 << 1;
        /// The 3 block-protection region bits.
        const PROT = 0b0001_1100;
        /// Status register write disable bit.
        const SRWD = 1 << 7;
    }
}
