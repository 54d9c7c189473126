use super::pwm_calc;
use crate::support::{MicrosDuration, PinId, PinMask};

/// Configuration of one software pwm output
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChannelState {
    pin: PinId,
    mask: PinMask,
    duty: u8,
    high_time: MicrosDuration,
}

impl ChannelState {
    /// `mask` must be the single bit of `pin`
    pub(crate) fn new(pin: PinId, mask: PinMask) -> Self {
        Self {
            pin,
            mask,
            duty: 0,
            high_time: MicrosDuration::from_ticks(0),
        }
    }

    pub fn pin(&self) -> PinId {
        self.pin
    }

    pub fn mask(&self) -> PinMask {
        self.mask
    }

    pub fn duty(&self) -> u8 {
        self.duty
    }

    pub fn high_time(&self) -> MicrosDuration {
        self.high_time
    }

    pub(crate) fn set_duty(&mut self, duty: u8, period: MicrosDuration) {
        self.duty = duty;
        self.update_period(period);
    }

    pub(crate) fn update_period(&mut self, period: MicrosDuration) {
        self.high_time = pwm_calc::high_time(period, self.duty);
    }

    pub fn edge(&self, period: MicrosDuration) -> Edge {
        if self.high_time.ticks() == 0 {
            Edge::Low
        } else if self.high_time < period {
            Edge::Pulse(self.high_time)
        } else {
            Edge::High
        }
    }
}

/// What a channel does on the rising edge of a period
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Edge {
    /// Duty 0, held low for the whole period
    Low,
    /// High now, one-shot brings it low after the given time
    Pulse(MicrosDuration),
    /// Full duty, no falling edge inside the period
    High,
}
