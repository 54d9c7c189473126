pub(crate) mod log;

mod output_port;
pub use output_port::{pin_mask, OutputPort, PinArray, PinId, PinMask};

mod timer_interface;
pub use timer_interface::{MicrosDuration, PwmTimer, Timer};
