use clap::Parser;
use log::{error, info};
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::PathBuf,
    time::{Duration, Instant},
};

use super_gb_printer::{
    EscPos, Error, GbLink, LinkState, LinkTimings, LinkTransport, LogDisplay, NullTransport,
    PacketStore, PrintConfig, PrinterOutput, StatusDisplay, SuperPrinter, DEFAULT_SCREENS,
};

#[derive(Parser, Debug)]
#[command(
    name = "super-gb-printer",
    about = "Replay a Game Boy Printer link capture onto an ESC/POS printer"
)]
struct Args {
    /// Captured link bytes, sent by the handheld
    #[arg(value_name = "CAPTURE")]
    capture: PathBuf,

    /// Capture is raw bytes instead of hex text
    #[arg(long)]
    binary: bool,

    /// Simulated time between link bytes, in microseconds
    #[arg(long, value_name = "US", default_value_t = 1000)]
    byte_interval_us: u64,

    /// Write the printer byte stream to this file instead of stdout
    #[arg(long, short, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Serial port the printer is attached to, takes precedence over --output
    #[arg(long, value_name = "PORT", env = "SGBP_PORT")]
    port: Option<String>,

    #[arg(long, value_name = "BAUD", env = "SGBP_BAUD", default_value_t = 115_200u32)]
    baud: u32,

    /// Pause after each write to the printer, in milliseconds
    #[arg(long, value_name = "MS", env = "SGBP_WRITE_DELAY_MS", default_value_t = 0)]
    write_delay_ms: u64,

    /// Print at native size
    #[arg(long, env = "SGBP_NO_SCALE")]
    no_scale: bool,

    /// Print at 2x using the printer's own scaling
    #[arg(long, env = "SGBP_SCALE_2X")]
    scale_2x: bool,

    /// Feed a bottom margin before cutting
    #[arg(long, env = "SGBP_BOTTOM_MARGIN")]
    bottom_margin: bool,

    /// Do not cut after printing
    #[arg(long, env = "SGBP_NO_CUT")]
    no_cut: bool,

    /// Packet store size in handheld screens
    #[arg(long, value_name = "N", env = "SGBP_SCREENS", default_value_t = DEFAULT_SCREENS)]
    screens: usize,
}

fn parse_hex(text: &str) -> Result<Vec<u8>, Error> {
    let mut bytes = Vec::new();
    for line in text.lines() {
        let line = line.split('#').next().unwrap_or("");
        for token in line.split(|c: char| c.is_whitespace() || c == ',') {
            if token.is_empty() {
                continue;
            }
            let digits = token
                .strip_prefix("0x")
                .or_else(|| token.strip_prefix("0X"))
                .unwrap_or(token);
            let byte = u8::from_str_radix(digits, 16)
                .map_err(|_| Error::InvalidConfig(format!("bad hex byte in capture: {}", token)))?;
            bytes.push(byte);
        }
    }
    Ok(bytes)
}

fn open_output(args: &Args) -> Result<Box<dyn Write>, Error> {
    if let Some(port) = &args.port {
        info!("Opening printer on {} at {} baud", port, args.baud);
        let port = serialport::new(port, args.baud)
            .timeout(Duration::from_secs(10))
            .open()
            .map_err(std::io::Error::from)?;
        return Ok(Box::new(port));
    }
    match &args.output {
        Some(path) => Ok(Box::new(BufWriter::new(File::create(path)?))),
        None => Ok(Box::new(std::io::stdout())),
    }
}

/// Clock `capture` through the printer one byte per `interval` and return
/// the number of print jobs.
///
/// A capture carries no pauses, so once an image is complete and its packet
/// fully answered the clock jumps past the quiet window. Each image then
/// prints before the next one's Init can clear it.
fn replay<P, D, T>(
    printer: &mut SuperPrinter<P, D, T>,
    capture: &[u8],
    mut now: Instant,
    interval: Duration,
    timings: LinkTimings,
) -> Result<usize, Error>
where
    P: PrinterOutput,
    D: StatusDisplay,
    T: LinkTransport,
{
    let gap = timings.quiet_window + Duration::from_millis(1);
    let mut jobs = 0;
    for &b in capture {
        now += interval;
        printer.on_byte(b);
        if printer.poll(now)? {
            jobs += 1;
        }
        let link = printer.link();
        if link.machine().end_of_print_data() && link.state() == LinkState::Idle {
            now += gap;
            if printer.poll(now)? {
                jobs += 1;
            }
        }
    }

    // a capture that stops mid-image may still leave a print pending
    now += gap;
    if printer.poll(now)? {
        jobs += 1;
    }
    Ok(jobs)
}

fn run(args: Args) -> Result<(), Error> {
    let capture = if args.binary {
        std::fs::read(&args.capture)?
    } else {
        parse_hex(&std::fs::read_to_string(&args.capture)?)?
    };
    info!("Replaying {} link bytes", capture.len());

    let config = PrintConfig::new()
        .no_scale(args.no_scale)
        .scale_2x(args.scale_2x)
        .add_bottom_margin(args.bottom_margin)
        .auto_cut(!args.no_cut);

    let mut output = EscPos::new(open_output(&args)?);
    if args.write_delay_ms > 0 {
        output = output.write_delay(Duration::from_millis(args.write_delay_ms));
    }

    let timings = LinkTimings::default();
    let now = Instant::now();
    let link = GbLink::with_parts(now, PacketStore::with_screens(args.screens), timings);
    let mut printer = SuperPrinter::new(link, output, LogDisplay, NullTransport, config)?;
    printer.startup()?;

    let interval = Duration::from_micros(args.byte_interval_us);
    let jobs = replay(&mut printer, &capture, now, interval, timings)?;

    info!(
        "Done: {} print jobs, {} framing errors",
        jobs,
        printer.link().protocol_errors()
    );
    printer.into_output().into_inner().flush()?;
    Ok(())
}

fn main() {
    env_logger::Builder::from_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}:{}] {} - {}",
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.level(),
                record.args()
            )
        })
        .init();

    let args = Args::parse();
    if let Err(err) = run(args) {
        error!("{}", err);
        std::process::exit(1);
    }
}
