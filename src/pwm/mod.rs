mod channel_timer;
mod period_scheduler;
mod pwm_calc;

pub use pwm_calc::{clamp_frequency, high_time, period_for};

mod pwm_channel;
pub use pwm_channel::{ChannelState, Edge};

mod controller;
pub use controller::{SchedulerConfig, SoftPwm, SoftPwm3};
