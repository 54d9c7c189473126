use super::pwm_channel::ChannelState;
use crate::support::{OutputPort, PwmTimer};

/// Falling edge of one channel: its one-shot fired, drive the output low.
///
/// An interrupt latched before the tick cancelled or re-armed the one-shot
/// belongs to the previous period and leaves the output alone.
pub(crate) fn expire<CT, O>(channel: &ChannelState, timer: &mut CT, port: &mut O)
where
    CT: PwmTimer,
    O: OutputPort,
{
    if timer.on_expired() {
        port.set_low(channel.mask());
    }
}
