//! Active-low button inputs.

use controller_proto::Pins;
use embassy_rp::gpio::Input;

/// Number of physical buttons, in [`Pins`] bit order.
pub const BUTTON_COUNT: usize = 11;

/// One optional input per [`Pins`] bit. A missing input reads as released,
/// which is how the LED strip's data pin is taken out of the button set.
pub struct ButtonPins {
    inputs: [Option<Input<'static>>; BUTTON_COUNT],
}

impl ButtonPins {
    pub fn new(inputs: [Option<Input<'static>>; BUTTON_COUNT]) -> Self {
        Self { inputs }
    }

    /// Sample every button.
    pub fn read(&self) -> Pins {
        let bits = self
            .inputs
            .iter()
            .enumerate()
            .filter(|(_, input)| input.as_ref().is_some_and(Input::is_low))
            .fold(0u16, |bits, (i, _)| bits | (1 << i));
        Pins(bits)
    }
}
