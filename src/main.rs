use std::fs::File;
use std::path::PathBuf;
use std::process::exit;
use std::sync::Mutex;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::prelude::*;

use chip8::config::{Config, LoadPolicy, Quirks, DEFAULT_CPU_HZ, DEFAULT_KEY_HOLD_FRAMES, DEFAULT_TIMER_HZ};
use chip8::display::MonoTermDisplay;
use chip8::environment::{Environment, Exit};
use chip8::error::EnvironmentError;
use chip8::input::StdinInput;
use chip8::interpreter::Chip8Interpreter;
use chip8::memory::MemoryMap;
use chip8::sound::{Mute, SimpleBeep, Sound};

/// Run a CHIP-8 program in the terminal.
#[derive(Parser)]
#[command(version, about)]
struct Opt {
    /// program image to load at 0x200
    rom: PathBuf,

    /// instructions per second
    #[arg(long, default_value_t = DEFAULT_CPU_HZ)]
    cpu_hz: u32,

    /// timer decrement and display refresh rate
    #[arg(long, default_value_t = DEFAULT_TIMER_HZ)]
    timer_hz: u32,

    /// drop the tail of a program too big for memory instead of refusing it
    #[arg(long)]
    truncate: bool,

    /// seed for the random number instruction
    #[arg(long)]
    seed: Option<u64>,

    /// no buzzer
    #[arg(long)]
    mute: bool,

    /// stop after this many instructions
    #[arg(long)]
    max_cycles: Option<u64>,

    /// ticks a key stays down after it is pressed
    #[arg(long, default_value_t = DEFAULT_KEY_HOLD_FRAMES)]
    key_hold_frames: u32,

    /// 8XY6/8XYE shift VX in place rather than copying VY
    #[arg(long)]
    quirk_shift_in_place: bool,

    /// FX55/FX65 leave I unchanged
    #[arg(long)]
    quirk_keep_index: bool,

    /// BNNN jumps to NNN + VX
    #[arg(long)]
    quirk_jump_vx: bool,

    /// 8XY1/8XY2/8XY3 reset VF
    #[arg(long)]
    quirk_logic_vf: bool,

    /// clip sprites at the screen edge instead of wrapping
    #[arg(long)]
    quirk_clip: bool,

    /// Increase the level of verbosity. Can be used multiple times.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// write logs here rather than to stderr, which the display shares
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Opt {
    const fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "chip8=info,warn",
            2 => "chip8=debug,info",
            3..=u8::MAX => "chip8=trace,debug",
        }
    }

    fn filter_layer(&self) -> EnvFilter {
        // Parse log level from env, or infer from args
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.log_filter()))
    }

    fn config(&self) -> Config {
        Config {
            cpu_hz: self.cpu_hz,
            timer_hz: self.timer_hz,
            load_policy: if self.truncate {
                LoadPolicy::Truncate
            } else {
                LoadPolicy::Reject
            },
            quirks: Quirks {
                shift_uses_vy: !self.quirk_shift_in_place,
                load_store_increments_index: !self.quirk_keep_index,
                jump_offset_uses_vx: self.quirk_jump_vx,
                logic_resets_flag: self.quirk_logic_vf,
                clip_sprites: self.quirk_clip,
            },
            seed: self.seed,
            key_hold_frames: self.key_hold_frames,
            max_cycles: self.max_cycles,
            mute: self.mute,
        }
    }
}

fn init_logging(opt: &Opt) -> Result<(), std::io::Error> {
    let registry = tracing_subscriber::registry().with(opt.filter_layer());
    match &opt.log_file {
        Some(path) => {
            let file = File::create(path)?;
            let fmt_layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file));
            registry.with(fmt_layer).init();
        }
        None => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .without_time()
                .with_target(false)
                .with_writer(std::io::stderr);
            registry.with(fmt_layer).init();
        }
    }
    Ok(())
}

fn run(opt: &Opt) -> Result<Exit, Box<dyn std::error::Error>> {
    let config = opt.config();

    // load a program
    let mut interpreter = Chip8Interpreter::new(&config);
    let mut f = File::open(&opt.rom)?;
    let len = interpreter.load_program(&mut f, config.load_policy)?;
    info!(rom = %opt.rom.display(), bytes = len, "loaded");

    let title = opt
        .rom
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut display = MonoTermDisplay::new(&title)?;
    let mut input = StdinInput::new()?;
    let mut beep = SimpleBeep::new();
    let mut mute = Mute::new();
    let sound: &mut dyn Sound = if config.mute { &mut mute } else { &mut beep };

    let mut env = Environment::new(interpreter, &config, &mut display, &mut input, sound);
    let exit = env.run();
    if let Err(EnvironmentError::Fault(fault)) = &exit {
        let addr = fault.addr();
        match env.interpreter().state().memory.get_word(addr) {
            Ok(word) => error!("fault at {:#06x} (word {:04X}): {}", addr, word, fault),
            Err(_) => error!("fault at {:#06x}: {}", addr, fault),
        }
    }
    Ok(exit?)
}

fn main() {
    let opt = Opt::parse();

    if let Err(e) = init_logging(&opt) {
        eprintln!("could not set up logging: {}", e);
        exit(1);
    }

    // the display and input restore the terminal when dropped, inside run
    match run(&opt) {
        Ok(exit) => info!(?exit, "done"),
        Err(e) => {
            error!("{}", e);
            eprintln!("chip8: {}", e);
            exit(1);
        }
    }
}
