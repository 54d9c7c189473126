use core::cell::RefCell;

use critical_section::Mutex;
use fugit_timer::HertzU32;
use heapless::Vec;

use super::pwm_channel::ChannelState;
use super::{channel_timer, period_scheduler, pwm_calc};
use crate::config::MAX_CHANNELS;
use crate::error::{Error, Result};
use crate::support::log;
use crate::support::{pin_mask, MicrosDuration, OutputPort, PinId, PinMask, PwmTimer};

/// Parameters fixed by [`SoftPwm::begin`]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SchedulerConfig {
    pub channel_count: usize,
    pub frequency: HertzU32,
    pub period: MicrosDuration,
}

struct Inner<PT, CT, O, const N: usize> {
    period_timer: PT,
    channel_timers: [CT; N],
    port: O,
    channels: Vec<Option<ChannelState>, N>,
    config: Option<SchedulerConfig>,
}

/// Software pwm on arbitrary output pins.
///
/// One recurring timer (`PT`) produces the rising edge of every channel, one
/// one-shot timer per channel (`CT`) produces its falling edge. `N` is the
/// number of channel timers, hence the maximum channel count.
///
/// The instance is meant to be shared between application code and the
/// timer interrupts: every method takes `&self` and runs inside a critical
/// section. Wire the interrupts like this:
///
/// - period timer interrupt: [`SoftPwm::on_period_tick`]
/// - channel `i` timer interrupt: [`SoftPwm::on_channel_expired`] with `i`
///
/// Only one instance may drive a given set of timers and pins.
pub struct SoftPwm<PT, CT, O, const N: usize = MAX_CHANNELS> {
    inner: Mutex<RefCell<Inner<PT, CT, O, N>>>,
}

/// Controller with the default three channels
pub type SoftPwm3<PT, CT, O> = SoftPwm<PT, CT, O, MAX_CHANNELS>;

impl<PT, CT, O, const N: usize> SoftPwm<PT, CT, O, N>
where
    PT: PwmTimer,
    CT: PwmTimer,
    O: OutputPort,
{
    pub fn new(period_timer: PT, channel_timers: [CT; N], port: O) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Inner {
                period_timer,
                channel_timers,
                port,
                channels: Vec::new(),
                config: None,
            })),
        }
    }

    /// Stop and give the hardware back
    pub fn free(self) -> (PT, [CT; N], O) {
        self.stop();
        let inner = self.inner.into_inner().into_inner();
        (inner.period_timer, inner.channel_timers, inner.port)
    }

    fn with<R>(&self, f: impl FnOnce(&mut Inner<PT, CT, O, N>) -> R) -> R {
        critical_section::with(|cs| f(&mut self.inner.borrow_ref_mut(cs)))
    }

    /// Attach output `pin` to channel `index` and configure it as gpio output.
    ///
    /// Only allowed while stopped. Rebinding a channel keeps its duty.
    pub fn bind(&self, index: usize, pin: PinId) -> Result<()> {
        self.with(|inner| {
            if inner.config.is_some() {
                log::warn!("bind({}) while running", index);
                return Err(Error::AlreadyRunning);
            }
            if index >= N {
                log::warn!("bind: channel {} out of range", index);
                return Err(Error::InvalidChannel { index });
            }

            let mask = pin_mask(pin).ok_or(Error::InvalidPin { pin })?;
            if !inner.port.configure_output(pin) {
                log::warn!("bind: port has no pin {}", pin);
                return Err(Error::InvalidPin { pin });
            }

            if inner.channels.len() <= index {
                inner
                    .channels
                    .resize(index + 1, None)
                    .map_err(|_| Error::InvalidChannel { index })?;
            }

            let slot = inner
                .channels
                .get_mut(index)
                .ok_or(Error::InvalidChannel { index })?;
            let duty = slot.map_or(0, |ch| ch.duty());
            let mut ch = ChannelState::new(pin, mask);
            ch.set_duty(duty, MicrosDuration::from_ticks(0));
            *slot = Some(ch);

            log::debug!("channel {} -> pin {}", index, pin);
            Ok(())
        })
    }

    /// Activate channels `0..count` at `freq` and start the period timer.
    ///
    /// `freq` is saturated to the supported range instead of being rejected.
    /// Calling this while running restarts the scheduler with the new
    /// parameters, every high time is recomputed from the stored duty.
    pub fn begin(&self, count: usize, freq: HertzU32) -> Result<()> {
        self.with(|inner| {
            if count == 0 || count > N {
                log::warn!("begin: unsupported channel count {}", count);
                return Err(Error::InvalidChannelCount { count });
            }
            let unbound = (0..count).find(|&i| !matches!(inner.channels.get(i), Some(Some(_))));
            if let Some(index) = unbound {
                log::warn!("begin: channel {} is not bound", index);
                return Err(Error::Unbound { index });
            }

            inner.halt();

            let frequency = pwm_calc::clamp_frequency(freq);
            let period = pwm_calc::period_for(frequency);
            inner
                .channels
                .iter_mut()
                .flatten()
                .for_each(|ch| ch.update_period(period));

            inner.period_timer.start_periodic(period);
            inner.config = Some(SchedulerConfig {
                channel_count: count,
                frequency,
                period,
            });

            log::info!(
                "soft pwm: {} channels, {} Hz, period {} us",
                count,
                frequency.raw(),
                period.ticks()
            );
            Ok(())
        })
    }

    /// Disarm all timers and drive the active outputs low. Does nothing if stopped.
    pub fn stop(&self) {
        self.with(|inner| {
            if inner.config.is_some() {
                inner.halt();
                log::info!("soft pwm stopped");
            }
        })
    }

    /// Set the duty of channel `index`, 0 is always low and 255 always high.
    ///
    /// Takes effect at the next period. Allowed before [`SoftPwm::begin`].
    pub fn set(&self, index: usize, duty: u8) -> Result<()> {
        self.with(|inner| {
            let period = inner
                .config
                .map_or(MicrosDuration::from_ticks(0), |cfg| cfg.period);
            match inner.channels.get_mut(index) {
                Some(Some(ch)) => {
                    ch.set_duty(duty, period);
                    Ok(())
                }
                _ => {
                    log::warn!("set: channel {} is not bound", index);
                    Err(Error::InvalidChannel { index })
                }
            }
        })
    }

    /// Last duty passed to [`SoftPwm::set`], not a measurement
    pub fn get(&self, index: usize) -> Result<u8> {
        self.channel(index).map(|ch| ch.duty())
    }

    pub fn high_time(&self, index: usize) -> Result<MicrosDuration> {
        self.channel(index).map(|ch| ch.high_time())
    }

    pub fn pin(&self, index: usize) -> Result<PinId> {
        self.channel(index).map(|ch| ch.pin())
    }

    fn channel(&self, index: usize) -> Result<ChannelState> {
        self.with(|inner| match inner.channels.get(index) {
            Some(Some(ch)) => Ok(*ch),
            _ => Err(Error::InvalidChannel { index }),
        })
    }

    pub fn config(&self) -> Option<SchedulerConfig> {
        self.with(|inner| inner.config)
    }

    /// Active channels, 0 while stopped
    pub fn channel_count(&self) -> usize {
        self.config().map_or(0, |cfg| cfg.channel_count)
    }

    pub fn is_running(&self) -> bool {
        self.config().is_some()
    }

    pub fn frequency(&self) -> Option<HertzU32> {
        self.config().map(|cfg| cfg.frequency)
    }

    pub fn period(&self) -> Option<MicrosDuration> {
        self.config().map(|cfg| cfg.period)
    }

    /// Period timer interrupt handler
    pub fn on_period_tick(&self) {
        self.with(|inner| {
            if !inner.period_timer.on_expired() {
                return;
            }

            if let Some(cfg) = inner.config {
                let Inner {
                    channel_timers,
                    port,
                    channels,
                    ..
                } = inner;
                period_scheduler::tick(
                    channels.iter().take(cfg.channel_count).flatten(),
                    channel_timers,
                    port,
                    cfg.period,
                );
            }
        })
    }

    /// Channel timer interrupt handler, `index` is the channel whose one-shot fired
    pub fn on_channel_expired(&self, index: usize) {
        self.with(|inner| {
            let Inner {
                channel_timers,
                port,
                channels,
                config,
                ..
            } = inner;
            let Some(timer) = channel_timers.get_mut(index) else {
                log::warn!("expiry of unknown channel {}", index);
                return;
            };

            match (config, channels.get(index)) {
                (Some(cfg), Some(Some(ch))) if index < cfg.channel_count => {
                    channel_timer::expire(ch, timer, port);
                }
                _ => {
                    timer.on_expired();
                    log::warn!("expiry of inactive channel {}", index);
                }
            }
        })
    }
}

impl<PT, CT, O, const N: usize> Inner<PT, CT, O, N>
where
    PT: PwmTimer,
    CT: PwmTimer,
    O: OutputPort,
{
    fn active_mask(&self) -> PinMask {
        let count = self.config.map_or(0, |cfg| cfg.channel_count);
        self.channels
            .iter()
            .take(count)
            .flatten()
            .fold(0, |mask, ch| mask | ch.mask())
    }

    fn halt(&mut self) {
        self.period_timer.cancel();
        self.channel_timers.iter_mut().for_each(|t| t.cancel());

        let mask = self.active_mask();
        if mask != 0 {
            self.port.set_low(mask);
        }
        self.config = None;
    }
}
