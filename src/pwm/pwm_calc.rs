use fugit_timer::HertzU32;

use crate::config::{MAX_DUTY, MAX_PWM_FREQ, MIN_PWM_FREQ, PWM_1S};
use crate::support::MicrosDuration;

/// Saturate the requested switching frequency to the supported range
pub fn clamp_frequency(freq: HertzU32) -> HertzU32 {
    HertzU32::from_raw(freq.raw().clamp(MIN_PWM_FREQ, MAX_PWM_FREQ))
}

/// Length of one pwm cycle, `freq` must already be clamped
pub fn period_for(freq: HertzU32) -> MicrosDuration {
    MicrosDuration::from_ticks(PWM_1S / freq.raw().max(MIN_PWM_FREQ))
}

/// Part of `period` the output stays high.
///
/// Truncates: `1000us * 128 / 255` gives 501, not 502.
pub fn high_time(period: MicrosDuration, duty: u8) -> MicrosDuration {
    MicrosDuration::from_ticks(period.ticks() * duty as u32 / MAX_DUTY as u32)
}
