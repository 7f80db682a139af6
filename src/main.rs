use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use liveroll::midi::device::{list_input_ports, list_output_ports};
use liveroll::{Config, LiveParser, MidiConfig, NoteMessage, NotePairing, SystemTimebase};
use liveroll::midi::{MidiInput, MidiOutputSink};
use std::io;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(version, about = "Record live MIDI input into a quantized piano roll")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List MIDI input and output ports
    Ports,

    /// Print incoming MIDI messages until Enter is pressed
    Monitor {
        #[arg(short, long, help = "Input port name (first port when omitted)")]
        input: Option<String>,

        #[arg(long, help = "Print raw bytes instead of decoded notes")]
        bytes: bool,
    },

    /// Record one pass from a MIDI input
    Record(RecordArgs),

    /// Write the default configuration as RON
    InitConfig {
        /// Defaults to the user config directory
        path: Option<PathBuf>,
    },
}

#[derive(clap::Args, Debug)]
struct RecordArgs {
    #[arg(short, long, help = "Configuration file (RON)")]
    config: Option<PathBuf>,

    #[arg(long)]
    bpm: Option<f64>,

    #[arg(long, help = "Pulses per quarter note")]
    ppq: Option<u32>,

    #[arg(long, help = "Number of 4/4 bars to record")]
    bars: Option<u32>,

    #[arg(short, long, help = "Input port name (first port when omitted)")]
    input: Option<String>,

    #[arg(short, long, help = "Output port name used with --play")]
    output: Option<String>,

    #[arg(long, help = "Pair note-offs with the last open note-on of the pitch")]
    stack_pairing: bool,

    #[arg(long, help = "Play the recorded roll back once captured")]
    play: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    match args.command {
        Command::Ports => print_ports(),
        Command::Monitor { input, bytes } => monitor(input, bytes),
        Command::Record(record_args) => record(record_args),
        Command::InitConfig { path } => init_config(path),
    }
}

fn print_ports() -> Result<()> {
    println!("Input ports:");
    for port in list_input_ports().context("list input ports")? {
        println!("  [{}] {}", port.index, port.name);
    }
    println!("Output ports:");
    for port in list_output_ports().context("list output ports")? {
        println!("  [{}] {}", port.index, port.name);
    }
    Ok(())
}

fn monitor(input: Option<String>, bytes: bool) -> Result<()> {
    let input = MidiInput::open_with(input.as_deref(), move |message| {
        if bytes {
            println!("{:?}", message);
        } else if let Some(note) = NoteMessage::from_bytes(message) {
            println!("{:?} (channel {})", note, message[0] & 0x0F);
        } else {
            println!("{:02X?}", message);
        }
    })
    .context("open MIDI input")?;

    println!("Monitoring '{}', press Enter to stop", input.port_name());
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(())
}

fn init_config(path: Option<PathBuf>) -> Result<()> {
    let path = path
        .or_else(Config::default_path)
        .context("no config directory on this platform, pass a path")?;
    Config::default()
        .save(&path)
        .with_context(|| format!("write {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn apply_overrides(config: &mut Config, args: &RecordArgs) -> Result<()> {
    if let Some(bpm) = args.bpm {
        config.timing.update_bpm(bpm)?;
    }
    if let Some(ppq) = args.ppq {
        config.timing.ppq = ppq;
    }
    if let Some(bars) = args.bars {
        config.timing.update_bars(bars);
    }
    let midi: &mut MidiConfig = &mut config.midi;
    if args.input.is_some() {
        midi.input_port = args.input.clone();
    }
    if args.output.is_some() {
        midi.output_port = args.output.clone();
    }
    if args.stack_pairing {
        config.capture.pairing = NotePairing::PerPitchStack;
    }
    config.validate()?;
    Ok(())
}

fn record(args: RecordArgs) -> Result<()> {
    let mut config = Config::load_or_default(args.config.as_deref()).context("load config")?;
    apply_overrides(&mut config, &args).context("invalid settings")?;

    let mut parser = LiveParser::new(config.clone())?;
    let handle = parser.inbound_handle();
    let input = MidiInput::open(config.midi.input_port.as_deref(), handle)
        .context("open MIDI input")?;
    println!("Listening on '{}'", input.port_name());

    let mut timebase =
        SystemTimebase::new(Duration::from_micros(config.capture.poll_interval_us));
    let roll = parser.record_pass(&mut timebase);
    drop(input);

    let spans = roll.spans();
    println!("Recorded {} notes over {} ticks", spans.len(), roll.ticks());
    for span in &spans {
        println!(
            "  pitch {:3}  ticks {:4}..={:<4}  velocity {}",
            span.pitch, span.start, span.end, span.velocity
        );
    }

    if args.play {
        let mut sink = MidiOutputSink::open(&config.midi).context("open MIDI output")?;
        println!("Playing back on '{}'", sink.port_name());
        parser
            .play(&roll, &mut timebase, &mut sink)
            .context("playback")?;
    }
    Ok(())
}
