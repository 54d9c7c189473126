//! Software pwm for chips with fewer hardware pwm channels than outputs.
//!
//! A single recurring timer raises every channel at the start of each
//! period, a one-shot timer per channel lowers it again after its high time.
//! Hardware is reached through [`PwmTimer`] and [`OutputPort`], see
//! [`SoftPwm`] for how to wire the interrupts.
#![cfg_attr(not(test), no_std)]

mod error;
mod support;

pub mod config;
pub mod pwm;

pub use error::{Error, Result};
pub use pwm::{SchedulerConfig, SoftPwm, SoftPwm3};
pub use support::{pin_mask, MicrosDuration, OutputPort, PinArray, PinId, PinMask, PwmTimer, Timer};

pub use fugit_timer::HertzU32;
