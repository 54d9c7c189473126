use super::pwm_channel::{ChannelState, Edge};
use crate::support::{MicrosDuration, OutputPort, PinMask, PwmTimer};

/// One rising edge of the shared period.
///
/// All outputs with a nonzero duty go high with a single port write and all
/// zero duty outputs are forced low with another one, so every high time is
/// counted from the same instant. Afterwards each channel's one-shot is
/// cancelled and, for a partial duty, armed again for this period's falling
/// edge. A full duty channel gets no one-shot at all, a stale arm from an
/// earlier period cannot cut its pulse short.
///
/// Must run with interrupts masked: nothing else may touch `channels` or the
/// timers until it returns.
pub(crate) fn tick<'a, I, CT, O>(channels: I, timers: &mut [CT], port: &mut O, period: MicrosDuration)
where
    I: Iterator<Item = &'a ChannelState> + Clone,
    CT: PwmTimer,
    O: OutputPort,
{
    let (high, low) = channels.clone().fold(
        (PinMask::default(), PinMask::default()),
        |(high, low), ch| match ch.edge(period) {
            Edge::Low => (high, low | ch.mask()),
            Edge::Pulse(_) | Edge::High => (high | ch.mask(), low),
        },
    );

    if high != 0 {
        port.set_high(high);
    }
    if low != 0 {
        port.set_low(low);
    }

    channels
        .zip(timers.iter_mut())
        .for_each(|(ch, timer)| {
            timer.cancel();
            if let Edge::Pulse(high_time) = ch.edge(period) {
                timer.start_once(high_time);
            }
        });
}
