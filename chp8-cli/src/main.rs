//! Entrypoint for CLI
use std::{
    env,
    error::Error,
    fs, io, thread,
    time::Instant,
};

use chp8::{prelude::*, IMPL_VERSION};
use log::{error, info};

use self::{config::CliConf, error::AppError, terminal::TerminalDevices};

mod config;
mod error;
mod terminal;

static USAGE: &str = r#"
usage: chp8 CMD FILE [CONFIG]

commands:
    run     Run the target ROM file, with an optional YAML config
    dis     Disassemble the target ROM into readable assembly

examples:
    chp8 run maze.rom
    chp8 run maze.rom config.yaml
    chp8 dis maze.rom
"#;

fn run_bytecode(filepath: &str, config: Option<&str>) -> Result<(), AppError> {
    let conf = match config {
        Some(config) => CliConf::from_file(config)?,
        None => CliConf::default(),
    };

    let bytecode = fs::read(filepath)?;

    let mut vm = Chp8Vm::new(conf.vm.clone())?;
    vm.load_bytecode(bytecode.as_slice())?;
    info!("loaded {} bytes from {filepath}", bytecode.len());

    let mut devices = TerminalDevices::new(io::stdout(), conf.run_for());
    for key in &conf.held_keys {
        devices.hold_key(*key);
    }

    let frame_time = conf.frame_time();
    let start = Instant::now();
    let mut last = start;

    while vm.is_active() {
        let now = Instant::now();
        let delta = now.duration_since(last);
        last = now;

        if let Err(err) = vm.tick(delta, &mut devices) {
            error!("machine halted\n{}", vm.dump_state()?);
            return Err(err.into());
        }

        // Sleep off the rest of the frame.
        thread::sleep(frame_time.saturating_sub(now.elapsed()));
    }

    let elapsed = start.elapsed();
    info!(
        "ran for {}ms, {} frames drawn",
        elapsed.as_nanos() as f64 / 1000000.0,
        devices.frames()
    ); // to millis

    Ok(())
}

fn run_disassembler(filepath: &str) -> Result<(), AppError> {
    let bytecode = fs::read(filepath)?;
    let text = Disassembler::new(bytecode.as_slice()).disassemble_all()?;
    println!("{text}");
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    simple_logger::SimpleLogger::new().env().init()?;

    match parse_args() {
        Some(Cmd::Run { filepath, config }) => run_bytecode(&filepath, config.as_deref())?,
        Some(Cmd::Dis { filepath }) => run_disassembler(&filepath)?,
        None => {
            print_usage();
            // FreeBSD EX_USAGE (64)
            std::process::exit(64)
        }
    }

    Ok(())
}

fn parse_args() -> Option<Cmd> {
    let mut args = env::args().skip(1);
    match args.next()?.as_str() {
        "run" => Some(Cmd::Run {
            filepath: args.next()?,
            config: args.next(),
        }),
        "dis" => Some(Cmd::Dis {
            filepath: args.next()?,
        }),
        _ => None,
    }
}

fn print_usage() {
    println!("Chp8 v{IMPL_VERSION}");
    println!("{USAGE}");
}

enum Cmd {
    /// Run file
    Run {
        filepath: String,
        config: Option<String>,
    },
    /// Disassemble
    Dis { filepath: String },
}
