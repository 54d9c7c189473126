pub type MicrosDuration = fugit_timer::Duration<u32, 1, 1_000_000>;

/// Countdown timer as seen by the pwm scheduler.
///
/// The hardware is expected to honor every arm, so nothing here reports
/// errors: a missed fire shows up as a wrong waveform, not as a failure.
pub trait PwmTimer {
    /// Arm to fire once after `timeout`
    fn start_once(&mut self, timeout: MicrosDuration);

    /// Arm to fire every `period` until cancelled
    fn start_periodic(&mut self, period: MicrosDuration);

    /// Disarm. Cancelling an idle timer does nothing.
    ///
    /// An expiry already latched by the hardware is dropped too, its interrupt
    /// may still arrive but [`PwmTimer::on_expired`] then reports `false`.
    fn cancel(&mut self);

    /// Called from the timer interrupt before the scheduler reacts to it.
    ///
    /// Returns `false` if the interrupt carries no expiry of the current arm.
    fn on_expired(&mut self) -> bool {
        true
    }
}

impl<T: PwmTimer + ?Sized> PwmTimer for &mut T {
    fn start_once(&mut self, timeout: MicrosDuration) {
        (**self).start_once(timeout)
    }

    fn start_periodic(&mut self, period: MicrosDuration) {
        (**self).start_periodic(period)
    }

    fn cancel(&mut self) {
        (**self).cancel()
    }

    fn on_expired(&mut self) -> bool {
        (**self).on_expired()
    }
}

#[derive(Clone, Copy, PartialEq, Debug)]
enum Mode {
    Idle,
    Once,
    Periodic,
}

/// [`PwmTimer`] on top of an auto-reloading microsecond counter
pub struct Timer<TIM> {
    timer: TIM,
    mode: Mode,
}

impl<TIM> Timer<TIM> {
    pub fn new(timer: TIM) -> Self {
        Self {
            timer,
            mode: Mode::Idle,
        }
    }

    pub fn free(self) -> TIM {
        self.timer
    }
}

impl<TIM> Timer<TIM>
where
    TIM: fugit_timer::Timer<1_000_000>,
{
    fn arm(&mut self, timeout: MicrosDuration, mode: Mode) {
        self.mode = mode;
        // drop an update latched by the previous arm
        let _ = self.timer.wait();
        let _ = self.timer.start(timeout);
    }
}

impl<TIM> PwmTimer for Timer<TIM>
where
    TIM: fugit_timer::Timer<1_000_000>,
{
    fn start_once(&mut self, timeout: MicrosDuration) {
        self.arm(timeout, Mode::Once);
    }

    fn start_periodic(&mut self, period: MicrosDuration) {
        self.arm(period, Mode::Periodic);
    }

    fn cancel(&mut self) {
        if self.mode != Mode::Idle {
            self.mode = Mode::Idle;
            let _ = self.timer.cancel();
            // stopping the counter leaves the update flag set
            let _ = self.timer.wait();
        }
    }

    fn on_expired(&mut self) -> bool {
        // clears the pending update flag
        let fired = self.timer.wait().is_ok();

        // the counter reloads by itself, a one-shot must be stopped here
        if fired && self.mode == Mode::Once {
            self.cancel();
        }
        fired
    }
}
