pub const PWM_1S: u32 = 1_000_000;

//-----------------------------------------------------------------------------

pub const MAX_CHANNELS: usize = 3;
pub const MAX_DUTY: u8 = u8::MAX;

//-----------------------------------------------------------------------------

pub const MIN_PWM_FREQ: u32 = 1;
pub const MAX_PWM_FREQ: u32 = 500; // one-shot rearm + gpio write budget per period
