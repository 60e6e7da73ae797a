//! Converter core bringup

use tracing::debug;

use crate::mmio::RegisterPort;
use crate::regs::adi;

/// Handle on the converter's control-plane register window
pub struct AdcCore<P> {
    port: P,
}

impl<P: RegisterPort> AdcCore<P> {
    pub fn new(port: P) -> Self {
        Self { port }
    }

    /// Reset the converter and enable all four channels with the fixed
    /// formatting options: sign extension, format stage on, I/Q correction
    /// bypassed.
    ///
    /// The reset line has to be dropped before it is raised; asserting the
    /// enable bit alone can leave the core held in reset. After this returns
    /// the converter streams formatted samples at the DMA engine.
    pub fn initialize(&mut self) {
        self.port.write(adi::REG_RSTN, 0);
        self.port.write(adi::REG_RSTN, adi::RSTN);

        let chan = adi::IQCOR_ENB | adi::FORMAT_SIGNEXT | adi::FORMAT_ENABLE | adi::ENABLE;
        for ch in 0..adi::NUM_CHANNELS {
            self.port.write(adi::reg_chan_cntrl(ch), chan);
        }
        debug!(
            channels = adi::NUM_CHANNELS,
            "converter out of reset, channels enabled"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mmio::testing::FakePort;

    #[test]
    fn reset_is_deassert_then_assert() {
        let mut port = FakePort::default();
        AdcCore::new(&mut port).initialize();

        assert_eq!(port.written(adi::REG_RSTN), vec![0, adi::RSTN]);
        // The reset writes happen before any channel is touched
        assert_eq!(port.writes[0], (adi::REG_RSTN, 0));
        assert_eq!(port.writes[1], (adi::REG_RSTN, adi::RSTN));
    }

    #[test]
    fn enables_all_channels_with_fixed_formatting() {
        let mut port = FakePort::default();
        AdcCore::new(&mut port).initialize();

        let expected = adi::IQCOR_ENB | adi::FORMAT_SIGNEXT | adi::FORMAT_ENABLE | adi::ENABLE;
        for ch in 0..adi::NUM_CHANNELS {
            assert_eq!(port.written(adi::reg_chan_cntrl(ch)), vec![expected]);
        }
    }

    #[test]
    fn initialize_twice_settles_identically() {
        let mut once = FakePort::default();
        AdcCore::new(&mut once).initialize();

        let mut twice = FakePort::default();
        let mut core = AdcCore::new(&mut twice);
        core.initialize();
        core.initialize();

        for (offset, _) in &once.writes {
            assert_eq!(
                once.written(*offset).last(),
                twice.written(*offset).last(),
                "register {offset:#x} settles differently"
            );
        }
    }
}
