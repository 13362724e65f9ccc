//! LED strip shift-out on a PIO state machine.
//!
//! The main loop renders into a [`ShiftOut`] through [`SharedStrip`]; the
//! strip task is the only consumer and feeds one LED per FIFO push.

use controller_core::rgb::{LedStrip, ShiftOut, StripError, RGB8};
use controller_proto::MAX_LEDS;
use core::cell::RefCell;
use embassy_rp::pio::{
    Common, Config, Direction, FifoJoin, Instance, PioPin, ShiftDirection, StateMachine,
};
use embassy_rp::Peri;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::signal::Signal;
use embassy_time::Timer;
use fixed::traits::ToFixed;
use pio::pio_asm;

/// Line held low after a frame so the LEDs latch.
const LATCH_US: u64 = 80;

pub type StripBuffer = Mutex<CriticalSectionRawMutex, RefCell<ShiftOut<{ MAX_LEDS as usize }>>>;
pub type FrameReady = Signal<CriticalSectionRawMutex, ()>;

/// Producer handle used by the main loop.
pub struct SharedStrip {
    buffer: &'static StripBuffer,
    ready: &'static FrameReady,
}

impl SharedStrip {
    pub fn new(buffer: &'static StripBuffer, ready: &'static FrameReady) -> Self {
        Self { buffer, ready }
    }
}

impl LedStrip for SharedStrip {
    fn is_busy(&self) -> bool {
        self.buffer.lock(|strip| strip.borrow().is_busy())
    }

    fn write(&mut self, frame: &[RGB8]) -> Result<(), StripError> {
        self.buffer.lock(|strip| strip.borrow_mut().write(frame))?;
        self.ready.signal(());
        Ok(())
    }
}

/// WS2812 driver on one PIO state machine.
pub struct Ws2812<'d, P: Instance, const SM: usize> {
    _common: Common<'d, P>,
    sm: StateMachine<'d, P, SM>,
}

impl<'d, P: Instance, const SM: usize> Ws2812<'d, P, SM> {
    pub fn new(
        mut common: Common<'d, P>,
        mut sm: StateMachine<'d, P, SM>,
        pin: Peri<'d, impl PioPin>,
    ) -> Self {
        // 24 bits per LED from the top of each word, 10 cycles per bit at 8 MHz.
        let program = pio_asm!(
            ".side_set 1",
            ".wrap_target",
            "get_data:",
            "pull block      side 0",
            "set y, 23       side 0",
            "bitloop:",
            "out x, 1        side 0 [2]",
            "jmp !x do_zero  side 1 [1]",
            "do_one:",
            "jmp y-- bitloop side 1 [4]",
            "jmp get_data    side 0",
            "do_zero:",
            "jmp y-- bitloop side 0 [4]",
            ".wrap"
        );

        let out_pin = common.make_pio_pin(pin);
        let loaded = common.load_program(&program.program);

        let mut cfg = Config::default();
        cfg.use_program(&loaded, &[&out_pin]);
        cfg.set_out_pins(&[&out_pin]);
        cfg.clock_divider = (125_000_000 / 8_000_000).to_fixed();
        cfg.shift_out.direction = ShiftDirection::Left;
        cfg.shift_out.auto_fill = false;
        cfg.fifo_join = FifoJoin::TxOnly;

        sm.set_config(&cfg);
        sm.set_pin_dirs(Direction::Out, &[&out_pin]);
        sm.set_enable(true);

        Self {
            _common: common,
            sm,
        }
    }

    /// Shift out the frame in flight, then hold the latch time.
    pub async fn transmit(&mut self, buffer: &StripBuffer) {
        while let Some(word) = buffer.lock(|strip| strip.borrow_mut().next_word()) {
            self.sm.tx().wait_push(word).await;
        }
        Timer::after_micros(LATCH_US).await;
    }
}
