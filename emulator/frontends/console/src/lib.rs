use clap::{Arg, ArgAction, ArgMatches, Command};
use femtos::{Duration, Instant};
use std::io::{self, Write};

use zwatch_debugger::{parse_hex, DebugControl, Debugger, DebuggerError, InterruptSource, MemoryLog};
use zwatch_z80::{MemorySnapshot, Z80State};

/// Runs the breakpoint engine against a memory image from the terminal
pub struct ConsoleFrontend;

impl Default for ConsoleFrontend {
    fn default() -> Self {
        Self
    }
}

impl ConsoleFrontend {
    pub fn args(application_name: &'static str) -> Command {
        Command::new(application_name)
            .arg(
                Arg::new("log-level")
                    .short('l')
                    .long("log-level")
                    .help("Set the type of log messages to print"),
            )
            .arg(
                Arg::new("image")
                    .short('i')
                    .long("image")
                    .help("Binary file to load into memory"),
            )
            .arg(
                Arg::new("origin")
                    .long("origin")
                    .default_value("0000")
                    .help("Address in hex to load the image at"),
            )
            .arg(Arg::new("pc").long("pc").help("Initial program counter in hex, defaults to the origin"))
            .arg(Arg::new("sp").long("sp").default_value("0000").help("Initial stack pointer in hex"))
            .arg(
                Arg::new("clock")
                    .long("clock")
                    .default_value("0")
                    .help("Emulated time in nanoseconds to stamp log entries with"),
            )
            .arg(
                Arg::new("log-capacity")
                    .long("log-capacity")
                    .default_value("1000")
                    .help("Number of breakpoint log entries to keep"),
            )
            .arg(
                Arg::new("interrupt")
                    .long("interrupt")
                    .action(ArgAction::Append)
                    .help("Name of an interrupt source, may be given more than once"),
            )
    }

    pub fn start(self, matches: ArgMatches) -> Result<(), DebuggerError> {
        let log_level = match matches.get_one("log-level").map(|s: &String| s.as_str()) {
            Some("trace") => log::Level::Trace,
            Some("debug") => log::Level::Debug,
            Some("info") => log::Level::Info,
            Some("warn") => log::Level::Warn,
            Some("error") => log::Level::Error,
            _ => log::Level::Info,
        };

        // Start the logger
        simple_logger::SimpleLogger::new()
            .with_level(log_level.to_level_filter())
            .without_timestamps()
            .init()
            .map_err(|err| DebuggerError::new(format!("unable to start logger: {}", err)))?;

        let mut machine = load_machine(&matches)?;

        let capacity = get_number(&matches, "log-capacity")?;
        let mut debugger = Debugger::new(MemoryLog::with_capacity(capacity as usize));
        debugger.clock = Instant::START + Duration::from_nanos(get_number(&matches, "clock")?);
        let sources: Vec<InterruptSource> = matches
            .get_many::<String>("interrupt")
            .map(|names| {
                names
                    .enumerate()
                    .map(|(i, name)| InterruptSource::new(i as u32 + 1, name.as_str()))
                    .collect()
            })
            .unwrap_or_default();
        debugger.set_interrupt_sources(sources);

        loop {
            if debugger.check_auto_command(&mut machine)? == DebugControl::Continue {
                continue;
            }

            println!("@ {} ns {}", debugger.clock.as_duration().as_nanos(), machine.state.format_registers());
            let mut buffer = String::new();
            io::stdout()
                .write_all(b"> ")
                .and_then(|_| io::stdout().flush())
                .map_err(|err| DebuggerError::new(err.to_string()))?;
            let read = io::stdin()
                .read_line(&mut buffer)
                .map_err(|err| DebuggerError::new(err.to_string()))?;
            if read == 0 {
                return Ok(());
            }

            match debugger.run_command(&mut machine, &buffer) {
                Ok(DebugControl::Exit) => return Ok(()),
                Ok(_) => {},
                Err(err) => {
                    println!("Error: {}", err);
                },
            }
        }
    }
}

fn get_hex(matches: &ArgMatches, name: &str) -> Result<Option<u16>, DebuggerError> {
    match matches.get_one::<String>(name) {
        Some(text) => {
            let value = parse_hex(text)?;
            let value = u16::try_from(value).map_err(|_| DebuggerError::new(format!("{} is out of range: {}", name, text)))?;
            Ok(Some(value))
        },
        None => Ok(None),
    }
}

fn get_number(matches: &ArgMatches, name: &str) -> Result<u64, DebuggerError> {
    let text = matches.get_one::<String>(name).map(String::as_str).unwrap_or("0");
    text.parse::<u64>()
        .map_err(|_| DebuggerError::new(format!("unable to parse {}: {}", name, text)))
}

fn load_machine(matches: &ArgMatches) -> Result<MemorySnapshot, DebuggerError> {
    let origin = get_hex(matches, "origin")?.unwrap_or(0);
    let state = Z80State {
        pc: get_hex(matches, "pc")?.unwrap_or(origin),
        sp: get_hex(matches, "sp")?.unwrap_or(0),
        ..Default::default()
    };

    let mut machine = MemorySnapshot::new(state);
    if let Some(filename) = matches.get_one::<String>("image") {
        let contents = std::fs::read(filename).map_err(|err| DebuggerError::new(format!("unable to read {}: {}", filename, err)))?;
        if contents.len() > 0x1_0000 {
            return Err(DebuggerError::new(format!("{} doesn't fit in 64 KiB", filename)));
        }
        machine.load(origin, &contents);
        log::info!("loaded {} bytes from {} at {:04x}", contents.len(), filename, origin);
    }
    Ok(machine)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_default_to_the_origin() {
        let matches = ConsoleFrontend::args("test")
            .try_get_matches_from(["test", "--origin", "100", "--sp", "8000H", "--interrupt", "CTC", "--interrupt", "PIO"])
            .unwrap();
        let machine = load_machine(&matches).unwrap();
        assert_eq!(machine.state.pc, 0x0100);
        assert_eq!(machine.state.sp, 0x8000);
        assert_eq!(matches.get_many::<String>("interrupt").unwrap().count(), 2);
    }

    #[test]
    fn addresses_must_fit_in_a_word() {
        let matches = ConsoleFrontend::args("test")
            .try_get_matches_from(["test", "--pc", "10000"])
            .unwrap();
        assert!(load_machine(&matches).is_err());
    }
}
