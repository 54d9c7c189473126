#![no_main]
#![no_std]

use panic_abort as _;
use rtic::app;

use stm32f1xx_hal::gpio::{ErasedPin, Output, PushPull};
use stm32f1xx_hal::pac::{TIM1, TIM2, TIM3, TIM4};
use stm32f1xx_hal::timer::CounterUs;

use systick_monotonic::Systick;

use stm32f1_soft_pwm::{HertzU32, MicrosDuration, PinArray, PinId, PwmTimer, SoftPwm3, Timer};

//-----------------------------------------------------------------------------

pub const MCU_XTAL_HZ: u32 = 8_000_000;
pub const SYSTICK_RATE_HZ: u32 = 1_000;

pub const PWM_FREQ_HZ: u32 = 200;
pub const CHANNELS: usize = 3;
pub const FADE_STEP_MS: u32 = 10;

//-----------------------------------------------------------------------------

/// The three one-shot counters are different types, the controller wants one
pub enum ChannelTimer {
    Tim3(Timer<CounterUs<TIM3>>),
    Tim4(Timer<CounterUs<TIM4>>),
    Tim1(Timer<CounterUs<TIM1>>),
}

impl ChannelTimer {
    fn timer(&mut self) -> &mut dyn PwmTimer {
        match self {
            Self::Tim3(t) => t,
            Self::Tim4(t) => t,
            Self::Tim1(t) => t,
        }
    }
}

impl PwmTimer for ChannelTimer {
    fn start_once(&mut self, timeout: MicrosDuration) {
        self.timer().start_once(timeout)
    }

    fn start_periodic(&mut self, period: MicrosDuration) {
        self.timer().start_periodic(period)
    }

    fn cancel(&mut self) {
        self.timer().cancel()
    }

    fn on_expired(&mut self) -> bool {
        self.timer().on_expired()
    }
}

pub type Leds = PinArray<ErasedPin<Output<PushPull>>, CHANNELS>;
pub type Pwm = SoftPwm3<Timer<CounterUs<TIM2>>, ChannelTimer, Leds>;

fn triangle(phase: u8) -> u8 {
    if phase < 128 {
        phase * 2
    } else {
        (u8::MAX - phase) * 2
    }
}

//-----------------------------------------------------------------------------

#[app(device = stm32f1xx_hal::pac, peripherals = true, dispatchers = [RTCALARM])]
mod app {
    use super::*;

    #[shared]
    struct Shared {
        pwm: Pwm,
    }

    #[local]
    struct Local {}

    #[monotonic(binds = SysTick, default = true)]
    type MonoTimer = Systick<{ SYSTICK_RATE_HZ }>;

    #[init]
    fn init(ctx: init::Context) -> (Shared, Local, init::Monotonics) {
        use stm32f1xx_hal::prelude::*;
        use stm32f1xx_hal::timer::Event;

        let mut flash = ctx.device.FLASH.constrain();
        let mut gpioa = ctx.device.GPIOA.split();

        let rcc = ctx.device.RCC.constrain();
        let clocks = rcc
            .cfgr
            .use_hse(MCU_XTAL_HZ.Hz())
            .sysclk(32u32.MHz())
            .freeze(&mut flash.acr);

        let mono = Systick::new(ctx.core.SYST, clocks.sysclk().to_Hz());

        //---------------------------------------------------------------------

        let leds = PinArray::new([
            gpioa.pa0.into_push_pull_output(&mut gpioa.crl).erase(),
            gpioa.pa1.into_push_pull_output(&mut gpioa.crl).erase(),
            gpioa.pa2.into_push_pull_output(&mut gpioa.crl).erase(),
        ]);

        let mut period_timer = ctx.device.TIM2.counter_us(&clocks);
        let mut tim3 = ctx.device.TIM3.counter_us(&clocks);
        let mut tim4 = ctx.device.TIM4.counter_us(&clocks);
        let mut tim1 = ctx.device.TIM1.counter_us(&clocks);
        period_timer.listen(Event::Update);
        tim3.listen(Event::Update);
        tim4.listen(Event::Update);
        tim1.listen(Event::Update);

        let pwm = Pwm::new(
            Timer::new(period_timer),
            [
                ChannelTimer::Tim3(Timer::new(tim3)),
                ChannelTimer::Tim4(Timer::new(tim4)),
                ChannelTimer::Tim1(Timer::new(tim1)),
            ],
            leds,
        );

        let configured = (0..CHANNELS)
            .try_for_each(|ch| pwm.bind(ch, ch as PinId))
            .and_then(|_| pwm.begin(CHANNELS, HertzU32::from_raw(PWM_FREQ_HZ)));
        configured.unwrap();

        fade::spawn().ok();

        //---------------------------------------------------------------------

        (Shared { pwm }, Local {}, init::Monotonics(mono))
    }

    //-------------------------------------------------------------------------

    #[idle()]
    fn idle(_ctx: idle::Context) -> ! {
        loop {
            cortex_m::asm::wfi();
        }
    }

    //-------------------------------------------------------------------------

    #[task(binds = TIM2, shared = [pwm], priority = 3)]
    fn tim2(mut ctx: tim2::Context) {
        ctx.shared.pwm.lock(|pwm| pwm.on_period_tick());
    }

    #[task(binds = TIM3, shared = [pwm], priority = 3)]
    fn tim3(mut ctx: tim3::Context) {
        ctx.shared.pwm.lock(|pwm| pwm.on_channel_expired(0));
    }

    #[task(binds = TIM4, shared = [pwm], priority = 3)]
    fn tim4(mut ctx: tim4::Context) {
        ctx.shared.pwm.lock(|pwm| pwm.on_channel_expired(1));
    }

    #[task(binds = TIM1_UP, shared = [pwm], priority = 3)]
    fn tim1_up(mut ctx: tim1_up::Context) {
        ctx.shared.pwm.lock(|pwm| pwm.on_channel_expired(2));
    }

    #[task(shared = [pwm], local = [step: u8 = 0])]
    fn fade(mut ctx: fade::Context) {
        use systick_monotonic::*;

        let step = *ctx.local.step;
        *ctx.local.step = step.wrapping_add(1);

        ctx.shared.pwm.lock(|pwm| {
            for ch in 0..CHANNELS {
                let phase = step.wrapping_add(ch as u8 * 85);
                let _ = pwm.set(ch, triangle(phase));
            }
        });

        fade::spawn_after((FADE_STEP_MS as u64).millis()).ok();
    }
}
