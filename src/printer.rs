use log::{error, info};
use std::time::Instant;

use crate::{
    config::PrintConfig,
    convert::ToneConverter,
    display::StatusDisplay,
    error::Error,
    escpos::PrinterOutput,
    session::GbLink,
    supervisor::LinkTransport,
    zoom::ZoomTable,
};

/// Custom LCD glyphs that draw a small handheld console over 2×2 cells.
pub const LOGO_GLYPHS: [[u8; 8]; 4] = [
    [0x1F, 0x10, 0x17, 0x17, 0x17, 0x17, 0x17, 0x00],
    [0x1F, 0x01, 0x1D, 0x1D, 0x1D, 0x1D, 0x1D, 0x00],
    [0x12, 0x17, 0x12, 0x10, 0x11, 0x10, 0x1F, 0x00],
    [0x01, 0x05, 0x09, 0x01, 0x11, 0x03, 0x1E, 0x00],
];

/// The whole printer: link emulation on one side, a receipt printer on the
/// other.
pub struct SuperPrinter<P, D, T> {
    link: GbLink,
    converter: ToneConverter,
    zoom_table: ZoomTable,
    output: P,
    display: D,
    transport: T,
    config: PrintConfig,
}

impl<P, D, T> SuperPrinter<P, D, T>
where
    P: PrinterOutput,
    D: StatusDisplay,
    T: LinkTransport,
{
    pub fn new(
        link: GbLink,
        output: P,
        display: D,
        transport: T,
        config: PrintConfig,
    ) -> Result<Self, Error> {
        config.validate()?;
        Ok(SuperPrinter {
            link,
            converter: ToneConverter::new(),
            zoom_table: ZoomTable::new(),
            output,
            display,
            transport,
            config,
        })
    }

    /// Show the logo, bring the link up and put the printer in a known
    /// state.
    pub fn startup(&mut self) -> Result<(), Error> {
        show_logo(&mut self.display);
        self.transport.shutdown();
        self.transport.startup();
        info!("GB link ready");
        self.output.initialize()?;
        self.output
            .set_justification(self.config.get_justification())?;
        Ok(())
    }

    /// Byte transport callback.
    pub fn on_byte(&mut self, rx: u8) -> u8 {
        self.link.on_byte(rx)
    }

    /// One main loop iteration.
    ///
    /// Returns true when a print job ran.
    pub fn poll(&mut self, now: Instant) -> Result<bool, Error> {
        self.link.check_handle_packet(now, &mut self.display);
        let printed = if self.link.check_print_ready(now) {
            self.print_job()?;
            true
        } else {
            false
        };
        self.link
            .check_timeout(now, &mut self.transport, &mut self.display);
        Ok(printed)
    }

    /// Print everything in the store, page by page, then cut.
    ///
    /// The link is shut down for the duration so the handheld sees the
    /// printer as busy. The store is cleared and the link restarted even
    /// when the job fails.
    pub fn print_job(&mut self) -> Result<(), Error> {
        self.transport.shutdown();
        let result = self.print_pages();
        if let Err(err) = &result {
            error!("Print job failed: {}", err);
            self.display.clear();
            self.display.print("Print failed");
        }
        self.link.store_mut().clear();
        self.transport.startup();
        result
    }

    fn print_pages(&mut self) -> Result<(), Error> {
        let pages = self.link.store().page_count();
        let zoom = self.config.zoom();
        let keycode = self.config.get_keycode();
        info!(
            "Printing {} packets in {} pages at {}x",
            self.link.store().len(),
            pages,
            zoom
        );

        for page in 0..pages {
            info!("Sending page {} of {}", page + 1, pages);
            self.show_progress("Converting", page, pages);
            self.converter.convert_page(self.link.store(), page)?;

            self.show_progress("Sending", page, pages);
            self.output.send_download_graphics(
                keycode,
                self.converter.planes(),
                self.converter.valid_rows(),
                zoom,
                &self.zoom_table,
            )?;

            self.display.set_cursor(0, 0);
            self.display.print("Printing page...");
            self.output.print_download_graphics(keycode, zoom)?;
        }

        self.display.clear();
        self.display.print("Print complete!");
        if self.config.auto_cut_enabled() {
            self.output.cut(self.config.cut_feed())?;
        }
        Ok(())
    }

    fn show_progress(&mut self, step: &str, page: usize, pages: usize) {
        self.display.clear();
        self.display.print(step);
        if pages > 1 {
            self.display.set_cursor(0, 1);
            self.display.print(&format!("Page {}/{}", page + 1, pages));
        }
    }

    pub fn link(&self) -> &GbLink {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut GbLink {
        &mut self.link
    }

    pub fn converter(&self) -> &ToneConverter {
        &self.converter
    }

    pub fn config(&self) -> &PrintConfig {
        &self.config
    }

    pub fn output(&self) -> &P {
        &self.output
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_output(self) -> P {
        self.output
    }
}

/// Load the logo glyphs and show the title screen.
pub fn show_logo<D: StatusDisplay>(display: &mut D) {
    for (location, glyph) in LOGO_GLYPHS.iter().enumerate() {
        display.create_char(location as u8, *glyph);
    }
    display.clear();
    display.print("\u{0}\u{1} SUPER");
    display.set_cursor(0, 1);
    display.print("\u{2}\u{3} GB Printer");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Justification,
        convert::TonePlane,
        display::NullDisplay,
        packet::{Command, Packet, PACKET_SIZE},
        store::PacketStore,
        supervisor::{LinkTimings, NullTransport},
    };
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Initialize,
        Justify(u8),
        Send { rows: usize, zoom: u8, first: u8 },
        Print(u8),
        Cut(u8),
    }

    #[derive(Default)]
    struct RecordingOutput {
        calls: Vec<Call>,
        keycodes: Vec<[u8; 2]>,
        fail_on_print: bool,
    }

    impl PrinterOutput for RecordingOutput {
        fn initialize(&mut self) -> Result<(), Error> {
            self.calls.push(Call::Initialize);
            Ok(())
        }

        fn set_justification(&mut self, justification: Justification) -> Result<(), Error> {
            self.calls.push(Call::Justify(justification.code()));
            Ok(())
        }

        fn send_download_graphics(
            &mut self,
            keycode: [u8; 2],
            planes: &[TonePlane; 4],
            rows: usize,
            zoom: u8,
            _table: &ZoomTable,
        ) -> Result<(), Error> {
            self.keycodes.push(keycode);
            self.calls.push(Call::Send {
                rows,
                zoom,
                first: planes[0].get(0, 0),
            });
            Ok(())
        }

        fn print_download_graphics(&mut self, keycode: [u8; 2], zoom: u8) -> Result<(), Error> {
            self.keycodes.push(keycode);
            if self.fail_on_print {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "printer gone",
                )));
            }
            self.calls.push(Call::Print(zoom));
            Ok(())
        }

        fn print_buffer(&mut self) -> Result<(), Error> {
            Ok(())
        }

        fn cut(&mut self, feed: u8) -> Result<(), Error> {
            self.calls.push(Call::Cut(feed));
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingDisplay {
        lines: Vec<String>,
        glyphs: Vec<u8>,
    }

    impl StatusDisplay for RecordingDisplay {
        fn clear(&mut self) {}

        fn print(&mut self, text: &str) {
            self.lines.push(text.to_string());
        }

        fn set_cursor(&mut self, _col: u8, _row: u8) {}

        fn create_char(&mut self, location: u8, _pattern: [u8; 8]) {
            self.glyphs.push(location);
        }
    }

    #[derive(Default)]
    struct CountingTransport {
        startups: usize,
        shutdowns: usize,
    }

    impl LinkTransport for CountingTransport {
        fn shutdown(&mut self) {
            self.shutdowns += 1;
        }

        fn startup(&mut self) {
            self.startups += 1;
        }
    }

    fn printer<D: StatusDisplay>(
        start: Instant,
        output: RecordingOutput,
        display: D,
        config: PrintConfig,
    ) -> SuperPrinter<RecordingOutput, D, CountingTransport> {
        SuperPrinter::new(
            GbLink::new(start),
            output,
            display,
            CountingTransport::default(),
            config,
        )
        .unwrap()
    }

    fn feed<P, D, T>(printer: &mut SuperPrinter<P, D, T>, packet: &Packet, now: Instant)
    where
        P: PrinterOutput,
        D: StatusDisplay,
        T: LinkTransport,
    {
        for b in packet.to_bytes() {
            printer.on_byte(b);
        }
        printer.on_byte(0x00);
        printer.on_byte(0x00);
        printer.poll(now).unwrap();
    }

    fn black_packet() -> Packet {
        Packet::with_payload(Command::Data, false, &[0xFF; PACKET_SIZE]).unwrap()
    }

    fn end_print() -> Packet {
        Packet::with_payload(Command::Print, false, &[0x01, 0x13, 0xE4, 0x40]).unwrap()
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn startup_shows_logo() {
        let start = Instant::now();
        let mut p = printer(
            start,
            RecordingOutput::default(),
            RecordingDisplay::default(),
            PrintConfig::new(),
        );
        p.startup().unwrap();
        assert_eq!(p.display().glyphs, vec![0, 1, 2, 3]);
        assert_eq!(p.display().lines, vec!["\u{0}\u{1} SUPER", "\u{2}\u{3} GB Printer"]);
        assert_eq!(p.output().calls, vec![Call::Initialize, Call::Justify(1)]);
        assert_eq!(p.transport().startups, 1);
    }

    #[test]
    fn print_after_quiet_window() {
        let start = Instant::now();
        let mut p = printer(
            start,
            RecordingOutput::default(),
            NullDisplay,
            PrintConfig::new().add_bottom_margin(true),
        );
        feed(&mut p, &Packet::with_payload(Command::Init, false, &[]).unwrap(), start);
        feed(&mut p, &black_packet(), start);
        feed(&mut p, &end_print(), start);

        assert!(!p.poll(start + ms(999)).unwrap());
        assert!(p.poll(start + ms(1000)).unwrap());
        assert_eq!(
            p.output().calls,
            vec![
                Call::Send {
                    rows: 16,
                    zoom: 3,
                    first: 0xFF
                },
                Call::Print(3),
                Call::Cut(184),
            ]
        );
        assert!(p.link().store().is_empty());
        assert_eq!(p.transport().shutdowns, 1);
        assert_eq!(p.transport().startups, 1);
    }

    #[test]
    fn pages_and_progress_messages() {
        let start = Instant::now();
        let mut p = printer(
            start,
            RecordingOutput::default(),
            RecordingDisplay::default(),
            PrintConfig::new().scale_2x(true).auto_cut(false),
        );
        for _ in 0..19 {
            feed(&mut p, &black_packet(), start);
        }
        p.print_job().unwrap();

        assert_eq!(
            p.output().calls,
            vec![
                Call::Send {
                    rows: 288,
                    zoom: 2,
                    first: 0xFF
                },
                Call::Print(2),
                Call::Send {
                    rows: 16,
                    zoom: 2,
                    first: 0xFF
                },
                Call::Print(2),
            ]
        );
        let lines = &p.display().lines;
        assert!(lines.contains(&"Page 1/2".to_string()));
        assert!(lines.contains(&"Page 2/2".to_string()));
        assert_eq!(lines.last().map(String::as_str), Some("Print complete!"));
    }

    #[test]
    fn failed_job_still_restarts_link() {
        let start = Instant::now();
        let output = RecordingOutput {
            fail_on_print: true,
            ..RecordingOutput::default()
        };
        let mut p = printer(start, output, RecordingDisplay::default(), PrintConfig::new());
        feed(&mut p, &black_packet(), start);

        assert!(matches!(p.print_job(), Err(Error::Io(_))));
        assert!(p.link().store().is_empty());
        assert_eq!(p.transport().startups, 1);
        assert_eq!(p.display().lines.last().map(String::as_str), Some("Print failed"));
    }

    #[test]
    fn keycode_comes_from_config() {
        let start = Instant::now();
        let mut p = printer(
            start,
            RecordingOutput::default(),
            NullDisplay,
            PrintConfig::new().keycode(*b"XY"),
        );
        feed(&mut p, &black_packet(), start);
        p.print_job().unwrap();
        assert_eq!(p.output().keycodes, vec![*b"XY", *b"XY"]);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let result = SuperPrinter::new(
            GbLink::with_parts(Instant::now(), PacketStore::with_screens(2), LinkTimings::default()),
            RecordingOutput::default(),
            NullDisplay,
            NullTransport,
            PrintConfig::new().keycode([0x00, b'B']),
        );
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }
}
