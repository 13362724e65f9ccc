#![no_std]
#![no_main]

use controller_core::rgb::ShiftOut;
use core::cell::RefCell;
use defmt::{error, info};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_futures::select::select;
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Input, Pull};
use embassy_rp::peripherals::{PIO0, USB};
use embassy_rp::pio::{InterruptHandler as PioInterruptHandler, Pio};
use embassy_rp::usb::{Driver, InterruptHandler as UsbInterruptHandler};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::{Channel, Receiver};
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Ticker};
use embassy_usb::class::hid::State;
use embassy_usb::{Builder, Config as UsbConfig};
use static_cell::StaticCell;
use turntable_controller::encoder::{decode, phase};
use turntable_controller::{
    configure_usb_hid, load_config, ButtonPins, Config, ConfigFlash, Controller, FrameReady,
    HostCommand, HostRequestHandler, Instant, QuadratureCounter, ReloadHandle, SharedStrip,
    StripBuffer, UsbHidOutput, Ws2812, HOST_COMMAND_DEPTH,
};

#[cfg(feature = "dev-panic")]
use panic_probe as _;
#[cfg(feature = "prod-panic")]
use panic_reset as _;

bind_interrupts!(struct Irqs {
    USBCTRL_IRQ => UsbInterruptHandler<USB>;
    PIO0_IRQ_0 => PioInterruptHandler<PIO0>;
});

type CommandChannel = Channel<CriticalSectionRawMutex, HostCommand, HOST_COMMAND_DEPTH>;
type CommandReceiver = Receiver<'static, CriticalSectionRawMutex, HostCommand, HOST_COMMAND_DEPTH>;

/// Host output reports, decoded in the USB request handler.
static HOST_COMMANDS: StaticCell<CommandChannel> = StaticCell::new();

/// Turntable position, written by the encoder task.
static COUNTER: QuadratureCounter = QuadratureCounter::new();

/// LED frame shared between the main loop and the strip task.
static STRIP_BUFFER: StaticCell<StripBuffer> = StaticCell::new();
static FRAME_READY: StaticCell<FrameReady> = StaticCell::new();

/// USB device configuration buffer.
static CONFIG_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static BOS_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static MSOS_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static CONTROL_BUF: StaticCell<[u8; 64]> = StaticCell::new();

/// HID state.
static GAMEPAD_STATE: StaticCell<State> = StaticCell::new();
static KEYBOARD_STATE: StaticCell<State> = StaticCell::new();
static REQUEST_HANDLER: StaticCell<HostRequestHandler> = StaticCell::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Turntable controller starting...");

    let p = embassy_rp::init(embassy_rp::config::Config::default());

    let mut flash = ConfigFlash::new_blocking(p.FLASH);
    let config = load_config(&mut flash);
    let flags = config.flags;
    let poll_ms: u8 = if flags.poll_at_250hz { 4 } else { 1 };

    let commands: &'static CommandChannel = HOST_COMMANDS.init(Channel::new());
    let strip_buffer: &'static StripBuffer =
        STRIP_BUFFER.init(Mutex::new(RefCell::new(ShiftOut::new())));
    let frame_ready: &'static FrameReady = FRAME_READY.init(Signal::new());

    // --- USB Setup ---
    let usb_driver = Driver::new(p.USB, Irqs);

    let mut usb_config = UsbConfig::new(0x1209, 0x0002); // pid.codes test VID/PID
    usb_config.manufacturer = Some("Rust Controllers");
    usb_config.product = Some("Turntable Controller");
    usb_config.serial_number = Some("001");
    usb_config.max_power = 500;
    usb_config.max_packet_size_0 = 64;

    let config_descriptor = CONFIG_DESCRIPTOR.init([0; 256]);
    let bos_descriptor = BOS_DESCRIPTOR.init([0; 256]);
    let msos_descriptor = MSOS_DESCRIPTOR.init([0; 256]);
    let control_buf = CONTROL_BUF.init([0; 64]);

    let mut builder = Builder::new(
        usb_driver,
        usb_config,
        config_descriptor,
        bos_descriptor,
        msos_descriptor,
        control_buf,
    );

    let handler = REQUEST_HANDLER.init(HostRequestHandler::new(commands.sender()));
    let (gamepad_writer, keyboard_writer) = configure_usb_hid(
        &mut builder,
        GAMEPAD_STATE.init(State::new()),
        KEYBOARD_STATE.init(State::new()),
        handler,
        poll_ms,
    );
    let usb_device = builder.build();
    let usb_output = UsbHidOutput::new(gamepad_writer, keyboard_writer);

    // --- Buttons: GPIO 0..=10, active low. GPIO 8 doubles as strip data. ---
    let b9 = if flags.ws2812b {
        let Pio { common, sm0, .. } = Pio::new(p.PIO0, Irqs);
        let leds = Ws2812::new(common, sm0, p.PIN_8);
        spawner.spawn(strip_task(leds, strip_buffer, frame_ready).unwrap());
        None
    } else {
        Some(Input::new(p.PIN_8, Pull::Up))
    };
    let buttons = ButtonPins::new([
        Some(Input::new(p.PIN_0, Pull::Up)),
        Some(Input::new(p.PIN_1, Pull::Up)),
        Some(Input::new(p.PIN_2, Pull::Up)),
        Some(Input::new(p.PIN_3, Pull::Up)),
        Some(Input::new(p.PIN_4, Pull::Up)),
        Some(Input::new(p.PIN_5, Pull::Up)),
        Some(Input::new(p.PIN_6, Pull::Up)),
        Some(Input::new(p.PIN_7, Pull::Up)),
        b9,
        Some(Input::new(p.PIN_9, Pull::Up)),
        Some(Input::new(p.PIN_10, Pull::Up)),
    ]);

    // --- Encoder: GPIO 14/15 ---
    let phase_a = Input::new(p.PIN_14, Pull::Up);
    let phase_b = Input::new(p.PIN_15, Pull::Up);

    spawner.spawn(usb_task(usb_device).unwrap());
    spawner.spawn(encoder_task(phase_a, phase_b, flags.invert_qe1).unwrap());
    spawner.spawn(
        controller_task(
            config,
            buttons,
            SharedStrip::new(strip_buffer, frame_ready),
            usb_output,
            commands.receiver(),
            u64::from(poll_ms),
        )
        .unwrap(),
    );

    info!("Turntable controller initialized, waiting for host...");
}

/// USB device task - runs the USB stack.
#[embassy_executor::task]
async fn usb_task(mut device: embassy_usb::UsbDevice<'static, Driver<'static, USB>>) {
    device.run().await;
}

/// Encoder task - decodes phase edges into counter steps.
#[embassy_executor::task]
async fn encoder_task(mut a: Input<'static>, mut b: Input<'static>, invert: bool) {
    let mut state = phase(a.is_high(), b.is_high());
    loop {
        select(a.wait_for_any_edge(), b.wait_for_any_edge()).await;
        let next = phase(a.is_high(), b.is_high());
        let step = decode(state, next);
        state = next;
        COUNTER.step(if invert { -step } else { step });
    }
}

/// Strip task - shifts out each frame the main loop hands over.
#[embassy_executor::task]
async fn strip_task(
    mut leds: Ws2812<'static, PIO0, 0>,
    buffer: &'static StripBuffer,
    ready: &'static FrameReady,
) {
    loop {
        ready.wait().await;
        leds.transmit(buffer).await;
    }
}

/// Controller task - polls inputs at the report rate and sends reports.
#[embassy_executor::task]
async fn controller_task(
    config: Config,
    buttons: ButtonPins,
    mut strip: SharedStrip,
    mut output: UsbHidOutput<'static>,
    commands: CommandReceiver,
    poll_ms: u64,
) {
    output.wait_ready().await;
    info!("USB HID ready, polling every {=u64} ms", poll_ms);

    let mut controller = Controller::new(config, ReloadHandle(&COUNTER), now());
    let mut ticker = Ticker::every(Duration::from_millis(poll_ms));

    loop {
        let now = now();
        while let Ok(command) = commands.try_receive() {
            controller.host_command(now, command, &mut strip);
        }

        let pins = buttons.read();
        if let Err(e) = controller
            .tick_and_send(now, pins, COUNTER.get(), &mut strip, &mut output)
            .await
        {
            error!("Output error: {:?}", e);
        }

        ticker.next().await;
    }
}

fn now() -> Instant {
    Instant::from_millis(embassy_time::Instant::now().as_millis() as u32)
}
