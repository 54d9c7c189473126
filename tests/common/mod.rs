//! Deterministic stand-in for the timer and gpio hardware.
//!
//! Timers count on a virtual microsecond clock, the port records every level
//! change of every pin. `Bench::run_until` plays the interrupts in time order.
#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use stm32f1_soft_pwm::{MicrosDuration, OutputPort, PinId, PinMask, PwmTimer, SoftPwm};

pub const PERIOD_TIMER: usize = usize::MAX;

#[derive(Clone, Copy, Debug, PartialEq)]
struct Armed {
    deadline: u64,
    reload: Option<u64>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transition {
    pub at: u64,
    pub pin: PinId,
    pub high: bool,
}

#[derive(Default)]
pub struct World {
    pub now: u64,
    period_timer: Option<Armed>,
    channel_timers: Vec<Option<Armed>>,
    pub levels: PinMask,
    pub configured: PinMask,
    pub transitions: Vec<Transition>,
    pub one_shot_arms: Vec<(usize, u64)>,
    pub expiries: Vec<(u64, usize)>,
    // update flags set by a fire and not yet taken by `on_expired`
    latched: Vec<usize>,
    // timers whose interrupt is held back, with the fires waiting for delivery
    masked: Vec<usize>,
    deferred: Vec<usize>,
}

impl World {
    fn slot(&mut self, id: usize) -> &mut Option<Armed> {
        if id == PERIOD_TIMER {
            return &mut self.period_timer;
        }
        if self.channel_timers.len() <= id {
            self.channel_timers.resize(id + 1, None);
        }
        &mut self.channel_timers[id]
    }

    fn unlatch(&mut self, id: usize) -> bool {
        let before = self.latched.len();
        self.latched.retain(|&l| l != id);
        self.latched.len() != before
    }

    fn next_event(&self) -> Option<(u64, usize)> {
        // period timer first on a tie so a rising edge is never lost behind a fall
        let period = self.period_timer.map(|a| (a.deadline, PERIOD_TIMER));
        let channels = self
            .channel_timers
            .iter()
            .enumerate()
            .filter_map(|(i, a)| a.map(|a| (a.deadline, i)));
        period
            .into_iter()
            .chain(channels)
            .min_by_key(|&(deadline, id)| (deadline, id != PERIOD_TIMER, id))
    }

    fn write(&mut self, mask: PinMask, high: bool) {
        for pin in 0..32u8 {
            let bit = 1u32 << pin;
            if mask & bit == 0 {
                continue;
            }
            let was_high = self.levels & bit != 0;
            if was_high != high {
                self.transitions.push(Transition {
                    at: self.now,
                    pin,
                    high,
                });
            }
            if high {
                self.levels |= bit;
            } else {
                self.levels &= !bit;
            }
        }
    }

    pub fn is_high(&self, pin: PinId) -> bool {
        self.levels & (1 << pin) != 0
    }

    pub fn is_armed(&self, id: usize) -> bool {
        if id == PERIOD_TIMER {
            self.period_timer.is_some()
        } else {
            matches!(self.channel_timers.get(id), Some(Some(_)))
        }
    }

    /// Level of `pin` at time `t`, as recorded
    pub fn level_at(&self, pin: PinId, t: u64) -> bool {
        self.transitions
            .iter()
            .filter(|tr| tr.pin == pin && tr.at <= t)
            .last()
            .map_or(false, |tr| tr.high)
    }

    /// Time `pin` spent high within `[from, to)`
    pub fn high_time_between(&self, pin: PinId, from: u64, to: u64) -> u64 {
        let mut high = self.level_at(pin, from);
        let mut since = from;
        let mut total = 0;
        for tr in self
            .transitions
            .iter()
            .filter(|tr| tr.pin == pin && tr.at > from && tr.at < to)
        {
            if high {
                total += tr.at - since;
            }
            high = tr.high;
            since = tr.at;
        }
        if high {
            total += to - since;
        }
        total
    }

    pub fn transitions_of(&self, pin: PinId) -> Vec<Transition> {
        self.transitions
            .iter()
            .copied()
            .filter(|tr| tr.pin == pin)
            .collect()
    }
}

pub type Shared = Rc<RefCell<World>>;

pub struct SimTimer {
    id: usize,
    world: Shared,
}

impl PwmTimer for SimTimer {
    fn start_once(&mut self, timeout: MicrosDuration) {
        let mut w = self.world.borrow_mut();
        let deadline = w.now + timeout.ticks() as u64;
        if self.id != PERIOD_TIMER {
            let id = self.id;
            w.one_shot_arms.push((id, timeout.ticks() as u64));
        }
        w.unlatch(self.id);
        *w.slot(self.id) = Some(Armed {
            deadline,
            reload: None,
        });
    }

    fn start_periodic(&mut self, period: MicrosDuration) {
        let mut w = self.world.borrow_mut();
        let deadline = w.now + period.ticks() as u64;
        w.unlatch(self.id);
        *w.slot(self.id) = Some(Armed {
            deadline,
            reload: Some(period.ticks() as u64),
        });
    }

    fn cancel(&mut self) {
        let mut w = self.world.borrow_mut();
        w.unlatch(self.id);
        *w.slot(self.id) = None;
    }

    fn on_expired(&mut self) -> bool {
        self.world.borrow_mut().unlatch(self.id)
    }
}

pub struct SimPort {
    pins: u8,
    world: Shared,
}

impl OutputPort for SimPort {
    fn configure_output(&mut self, pin: PinId) -> bool {
        if pin >= self.pins {
            return false;
        }
        self.world.borrow_mut().configured |= 1 << pin;
        true
    }

    fn set_high(&mut self, mask: PinMask) {
        self.world.borrow_mut().write(mask, true);
    }

    fn set_low(&mut self, mask: PinMask) {
        self.world.borrow_mut().write(mask, false);
    }
}

pub type SimPwm<const N: usize> = SoftPwm<SimTimer, SimTimer, SimPort, N>;

pub struct Bench<const N: usize> {
    pub pwm: SimPwm<N>,
    pub world: Shared,
}

impl<const N: usize> Bench<N> {
    /// Controller with `N` channel timers on a port of `pins` outputs
    pub fn new(pins: u8) -> Self {
        let world: Shared = Rc::new(RefCell::new(World::default()));
        let period_timer = SimTimer {
            id: PERIOD_TIMER,
            world: world.clone(),
        };
        let channel_timers = std::array::from_fn(|id| SimTimer {
            id,
            world: world.clone(),
        });
        let port = SimPort {
            pins,
            world: world.clone(),
        };
        Self {
            pwm: SoftPwm::new(period_timer, channel_timers, port),
            world,
        }
    }

    pub fn now(&self) -> u64 {
        self.world.borrow().now
    }

    /// Fire every timer event up to and including `end`, then move the clock to `end`
    pub fn run_until(&self, end: u64) {
        loop {
            let event = {
                let mut w = self.world.borrow_mut();
                match w.next_event() {
                    Some((deadline, id)) if deadline <= end => {
                        w.now = deadline;
                        let slot = w.slot(id);
                        *slot = slot.and_then(|a| {
                            a.reload.map(|r| Armed {
                                deadline: a.deadline + r,
                                reload: Some(r),
                            })
                        });
                        if id != PERIOD_TIMER {
                            w.expiries.push((deadline, id));
                        }
                        if !w.latched.contains(&id) {
                            w.latched.push(id);
                        }
                        if w.masked.contains(&id) {
                            w.deferred.push(id);
                            continue;
                        }
                        Some(id)
                    }
                    _ => None,
                }
            };

            match event {
                Some(PERIOD_TIMER) => self.pwm.on_period_tick(),
                Some(id) => self.pwm.on_channel_expired(id),
                None => break,
            }
        }
        self.world.borrow_mut().now = end;
    }

    /// Hold back the interrupt of channel timer `id`, its fires stay latched
    pub fn mask(&self, id: usize) {
        self.world.borrow_mut().masked.push(id);
    }

    /// Deliver every interrupt held back for `id` now
    pub fn unmask(&self, id: usize) {
        let pending = {
            let mut w = self.world.borrow_mut();
            w.masked.retain(|&m| m != id);
            let pending = w.deferred.iter().filter(|&&d| d == id).count();
            w.deferred.retain(|&d| d != id);
            pending
        };
        for _ in 0..pending {
            self.pwm.on_channel_expired(id);
        }
    }

    pub fn run_for(&self, us: u64) {
        let end = self.now() + us;
        self.run_until(end);
    }
}
