//! USB HID transport: gamepad and keyboard input reports, host output reports.

use controller_core::{Frame, OutputError, OutputSink};
use controller_proto::{parse_output_report, HostCommand, KeyboardReport};
use defmt::warn;
use embassy_rp::peripherals::USB;
use embassy_rp::usb::Driver;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Sender;
use embassy_usb::class::hid::{
    Config, HidBootProtocol, HidSubclass, HidWriter, ReportId, RequestHandler, State,
};
use embassy_usb::control::OutResponse;
use embassy_usb::Builder;

/// Queue depth for host output reports waiting for the main loop.
pub const HOST_COMMAND_DEPTH: usize = 8;

/// Largest host output report, report id included.
const HOST_REPORT_MAX: usize = 8;

type UsbDriver<'d> = Driver<'d, USB>;

/// Sending half of the host command queue.
pub type HostCommandSender = Sender<'static, CriticalSectionRawMutex, HostCommand, HOST_COMMAND_DEPTH>;

/// Gamepad with host output reports.
///
/// - Input report 1: 16 buttons, X and Y (unsigned 8-bit, 127 = centre)
/// - Output report 2: button lights (16 bits)
/// - Output report 3: strip colour (R, G, B, padding)
/// - Output report 4: turntable resistance level
pub const GAMEPAD_DESCRIPTOR: &[u8] = &[
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x05, // Usage (Gamepad)
    0xA1, 0x01, // Collection (Application)
    0x85, 0x01, //   Report ID (1)
    //
    // --- Buttons (16 buttons) ---
    0x05, 0x09, //   Usage Page (Button)
    0x19, 0x01, //   Usage Minimum (Button 1)
    0x29, 0x10, //   Usage Maximum (Button 16)
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x01, //   Logical Maximum (1)
    0x95, 0x10, //   Report Count (16)
    0x75, 0x01, //   Report Size (1)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    //
    // --- Turntable axis, unused Y ---
    0x05, 0x01, //   Usage Page (Generic Desktop)
    0x09, 0x30, //   Usage (X)
    0x09, 0x31, //   Usage (Y)
    0x15, 0x00, //   Logical Minimum (0)
    0x26, 0xFF, 0x00, //   Logical Maximum (255)
    0x95, 0x02, //   Report Count (2)
    0x75, 0x08, //   Report Size (8)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    //
    // --- Button lights ---
    0x85, 0x02, //   Report ID (2)
    0x06, 0x00, 0xFF, //   Usage Page (Vendor Defined)
    0x09, 0x01, //   Usage (1)
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x01, //   Logical Maximum (1)
    0x95, 0x10, //   Report Count (16)
    0x75, 0x01, //   Report Size (1)
    0x91, 0x02, //   Output (Data, Variable, Absolute)
    //
    // --- Strip colour ---
    0x85, 0x03, //   Report ID (3)
    0x09, 0x02, //   Usage (2)
    0x26, 0xFF, 0x00, //   Logical Maximum (255)
    0x95, 0x04, //   Report Count (4)
    0x75, 0x08, //   Report Size (8)
    0x91, 0x02, //   Output (Data, Variable, Absolute)
    //
    // --- Turntable resistance ---
    0x85, 0x04, //   Report ID (4)
    0x09, 0x03, //   Usage (3)
    0x95, 0x01, //   Report Count (1)
    0x91, 0x02, //   Output (Data, Variable, Absolute)
    //
    0xC0, // End Collection
];

/// Keyboard with an array of usage codes, one slot per mappable input.
pub const KEYBOARD_DESCRIPTOR: &[u8] = &[
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x06, // Usage (Keyboard)
    0xA1, 0x01, // Collection (Application)
    0x05, 0x07, //   Usage Page (Keyboard/Keypad)
    0x19, 0x00, //   Usage Minimum (0)
    0x29, 0xE7, //   Usage Maximum (0xE7)
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0xE7, //   Logical Maximum (0xE7)
    0x95, 0x0D, //   Report Count (13)
    0x75, 0x08, //   Report Size (8)
    0x81, 0x00, //   Input (Data, Array, Absolute)
    0xC0, // End Collection
];

/// USB HID output for the controller's reports.
pub struct UsbHidOutput<'d> {
    gamepad: HidWriter<'d, UsbDriver<'d>, 8>,
    keyboard: HidWriter<'d, UsbDriver<'d>, 16>,
    ready: bool,
    last_keyboard: KeyboardReport,
}

impl<'d> UsbHidOutput<'d> {
    pub fn new(
        gamepad: HidWriter<'d, UsbDriver<'d>, 8>,
        keyboard: HidWriter<'d, UsbDriver<'d>, 16>,
    ) -> Self {
        Self {
            gamepad,
            keyboard,
            ready: false,
            last_keyboard: KeyboardReport::default(),
        }
    }

    /// Wait until the device is ready (USB enumerated).
    pub async fn wait_ready(&mut self) {
        self.gamepad.ready().await;
        self.ready = true;
    }

    async fn send_keyboard(&mut self, report: KeyboardReport) -> Result<(), OutputError> {
        // Only changes go out; the host keeps keys held between reports.
        if report == self.last_keyboard {
            return Ok(());
        }
        self.keyboard
            .write(&report.as_bytes())
            .await
            .map_err(|_| OutputError::Io)?;
        self.last_keyboard = report;
        Ok(())
    }
}

impl<'d> OutputSink for UsbHidOutput<'d> {
    async fn send(&mut self, frame: &Frame) -> Result<(), OutputError> {
        self.gamepad
            .write(&frame.gamepad.as_bytes())
            .await
            .map_err(|_| OutputError::Io)?;
        // Release any held keys when keyboard input is switched off.
        self.send_keyboard(frame.keyboard.unwrap_or_default())
            .await
    }

    fn is_ready(&self) -> bool {
        self.ready
    }
}

/// HID request handler decoding host output reports onto a queue.
pub struct HostRequestHandler {
    commands: HostCommandSender,
}

impl HostRequestHandler {
    pub fn new(commands: HostCommandSender) -> Self {
        Self { commands }
    }
}

impl RequestHandler for HostRequestHandler {
    fn get_report(&mut self, _id: ReportId, _buf: &mut [u8]) -> Option<usize> {
        None
    }

    fn set_report(&mut self, id: ReportId, data: &[u8]) -> OutResponse {
        let ReportId::Out(id) = id else {
            return OutResponse::Rejected;
        };

        // Control transfers may or may not carry the report id.
        let mut report: heapless::Vec<u8, HOST_REPORT_MAX> = heapless::Vec::new();
        if data.first() != Some(&id) && report.push(id).is_err() {
            return OutResponse::Rejected;
        }
        if report.extend_from_slice(data).is_err() {
            warn!("Host report {=u8} too long: {=usize} bytes", id, data.len());
            return OutResponse::Rejected;
        }

        match parse_output_report(&report) {
            Ok(command) => {
                if self.commands.try_send(command).is_err() {
                    warn!("Host command queue full, dropping {:?}", command);
                }
                OutResponse::Accepted
            }
            Err(e) => {
                warn!("Bad host report: {:?}", e);
                OutResponse::Rejected
            }
        }
    }

    fn set_idle_ms(&mut self, _id: Option<ReportId>, _duration_ms: u32) {}

    fn get_idle_ms(&mut self, _id: Option<ReportId>) -> Option<u32> {
        None
    }
}

/// Configure the gamepad and keyboard HID interfaces in the USB builder.
///
/// Returns the gamepad and keyboard writers for use by the application.
pub fn configure_usb_hid<'d>(
    builder: &mut Builder<'d, UsbDriver<'d>>,
    gamepad_state: &'d mut State<'d>,
    keyboard_state: &'d mut State<'d>,
    handler: &'d mut HostRequestHandler,
    poll_ms: u8,
) -> (HidWriter<'d, UsbDriver<'d>, 8>, HidWriter<'d, UsbDriver<'d>, 16>) {
    let gamepad_config = Config {
        report_descriptor: GAMEPAD_DESCRIPTOR,
        request_handler: Some(handler),
        poll_ms,
        max_packet_size: 8,
        hid_subclass: HidSubclass::No,
        hid_boot_protocol: HidBootProtocol::None,
    };
    let gamepad = HidWriter::new(builder, gamepad_state, gamepad_config);

    let keyboard_config = Config {
        report_descriptor: KEYBOARD_DESCRIPTOR,
        request_handler: None,
        poll_ms,
        max_packet_size: 16,
        hid_subclass: HidSubclass::No,
        hid_boot_protocol: HidBootProtocol::None,
    };
    let keyboard = HidWriter::new(builder, keyboard_state, keyboard_config);

    (gamepad, keyboard)
}
