use crate::support::PinId;

/// Errors reported synchronously by the controller API.
///
/// Nothing here is ever produced from interrupt context: the period tick and
/// the channel expiry handlers have no failure path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Channel index is not bound or exceeds the controller capacity
    #[display("invalid channel index {index}")]
    InvalidChannel { index: usize },

    /// `begin` was asked for zero channels or more than the capacity
    #[display("invalid channel count {count}")]
    InvalidChannelCount { count: usize },

    /// Pin does not fit the output mask or the port has no such pin
    #[display("invalid output pin {pin}")]
    InvalidPin { pin: PinId },

    /// Channel is about to be activated but no pin was bound to it
    #[display("channel {index} has no pin bound")]
    Unbound { index: usize },

    /// Pin binding cannot change while the scheduler is running
    #[display("pwm is running")]
    AlreadyRunning,
}

pub type Result<T> = core::result::Result<T, Error>;
