use embedded_hal::digital::v2::OutputPin;

pub type PinId = u8;
pub type PinMask = u32;

/// Mask with the single bit of `pin` set, `None` if the pin does not fit.
pub fn pin_mask(pin: PinId) -> Option<PinMask> {
    1u32.checked_shl(pin as u32)
}

/// A bank of digital outputs addressed by bitmask.
pub trait OutputPort {
    /// Route `pin` to plain gpio output. Returns `false` if the port has no such pin.
    fn configure_output(&mut self, pin: PinId) -> bool;

    fn set_high(&mut self, mask: PinMask);

    fn set_low(&mut self, mask: PinMask);
}

/// Fixed set of already configured output pins, pin id is the array index.
pub struct PinArray<P, const N: usize> {
    pins: [P; N],
}

impl<P, const N: usize> PinArray<P, N> {
    pub fn new(pins: [P; N]) -> Self {
        Self { pins }
    }

    pub fn free(self) -> [P; N] {
        self.pins
    }
}

impl<P, const N: usize> PinArray<P, N>
where
    P: OutputPin,
{
    fn for_each_in(&mut self, mask: PinMask, mut f: impl FnMut(&mut P)) {
        self.pins
            .iter_mut()
            .enumerate()
            .filter(|(i, _)| pin_mask(*i as PinId).map_or(false, |m| mask & m != 0))
            .for_each(|(_, p)| f(p));
    }
}

impl<P, const N: usize> OutputPort for PinArray<P, N>
where
    P: OutputPin,
{
    fn configure_output(&mut self, pin: PinId) -> bool {
        (pin as usize) < N
    }

    fn set_high(&mut self, mask: PinMask) {
        self.for_each_in(mask, |p| {
            let _ = p.set_high();
        });
    }

    fn set_low(&mut self, mask: PinMask) {
        self.for_each_in(mask, |p| {
            let _ = p.set_low();
        });
    }
}
