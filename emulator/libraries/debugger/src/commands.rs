use femtos::{Duration, Instant};

use zwatch_z80::{CpuView, EffectPredictor, MemorySnapshot};

use crate::breakpoint::{
    AccessDirection, AddressRange, Breakpoint, BreakpointKind, Category, IoBreakpoint, MemoryBreakpoint, PcBreakpoint, RegisterCondition,
};
use crate::checker::Z80Debugger;
use crate::condition::{ConditionRule, Operator, Width};
use crate::error::{BreakpointError, DebuggerError};
use crate::import::{import_labels, ImportOptions, Label};
use crate::interrupt::{find_unique_source, InterruptBreakpoint, InterruptSource};
use crate::parse::{narrow_u16, parse_hex, parse_hex_u16, parse_hex_u8};
use crate::persist::save_records;
use crate::register::RegisterName;
use crate::set::Breakpoints;
use crate::sink::MemoryLog;
use crate::variables::{VarType, Variable, VariableTable};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DebugControl {
    /// Wait for the next user command
    Wait,
    /// Continue looping without accepting input
    Continue,
    /// Exit the debugger
    Exit,
}

pub struct Debugger {
    pub breakpoints: Breakpoints,
    pub variables: VariableTable,
    pub interrupts: Vec<InterruptSource>,
    pub import_options: ImportOptions,
    pub checker: Z80Debugger,
    pub log: MemoryLog,
    pub clock: Instant,
    repeat_command: Option<(u32, String)>,
}

impl Debugger {
    pub fn new(log: MemoryLog) -> Self {
        let breakpoints = Breakpoints::default();
        let checker = Z80Debugger::new(breakpoints.active_list(), Box::new(log.clone()));
        Self {
            breakpoints,
            variables: VariableTable::default(),
            interrupts: vec![],
            import_options: ImportOptions::default(),
            checker,
            log,
            clock: Instant::START,
            repeat_command: None,
        }
    }

    /// Replace the machine's interrupt sources, and rebind the interrupt breakpoints to them
    pub fn set_interrupt_sources(&mut self, sources: Vec<InterruptSource>) {
        self.interrupts = sources;
        for stale in self.breakpoints.rebind_interrupts(&self.interrupts) {
            println!("Removed interrupt breakpoint {}", stale);
        }
    }

    pub fn check_auto_command(&mut self, machine: &mut MemorySnapshot) -> Result<DebugControl, DebuggerError> {
        if let Some((count, command)) = self.repeat_command.take() {
            self.run_command(machine, &command)?;
            let next_count = count - 1;
            if next_count == 0 {
                self.repeat_command = None;
            } else {
                self.repeat_command = Some((next_count, command));
            }
            return Ok(DebugControl::Continue);
        }

        Ok(DebugControl::Wait)
    }

    pub fn run_command(&mut self, machine: &mut MemorySnapshot, command: &str) -> Result<DebugControl, DebuggerError> {
        let args: Vec<&str> = command.split_whitespace().collect();

        // If no command given, then run the `check` command
        let args = if args.is_empty() { vec!["check"] } else { args };

        match args[0] {
            "b" | "break" | "breakpoint" => {
                if args.len() < 2 {
                    println!("Usage: break <addr> [<label>] [<reg>[&<mask>]<op><value>] [flags=<mask>:<value>]");
                } else {
                    let breakpoint = parse_pc_breakpoint(&args[1..])?;
                    self.put_breakpoint(breakpoint);
                }
            },
            "w" | "watch" => {
                if args.len() < 2 {
                    println!("Usage: watch <addr>[-<end>] [r|w|rw] [[&<mask>]<op><value>] [<label>]");
                } else {
                    let breakpoint = parse_memory_breakpoint(&args[1..])?;
                    self.put_breakpoint(breakpoint);
                }
            },
            "io" => {
                if args.len() < 2 {
                    println!("Usage: io <port>[-<end>] [in|out|inout] [[&<mask>]<op><value>]");
                } else {
                    let breakpoint = parse_io_breakpoint(&args[1..])?;
                    self.put_breakpoint(breakpoint);
                }
            },
            "int" | "interrupt" => {
                if args.len() < 2 {
                    println!("Usage: int <source name>");
                } else {
                    let name = args[1..].join(" ");
                    let source = find_unique_source(&self.interrupts, &name)
                        .ok_or(BreakpointError::UnknownInterruptSource(name))?
                        .clone();
                    self.put_breakpoint(Breakpoint::new(InterruptBreakpoint::new(source).into()));
                }
            },
            "r" | "remove" => {
                if args.len() != 3 {
                    println!("Usage: remove <pc|mem|io|int> <index>");
                } else {
                    let (category, index) = parse_entry(&args[1..])?;
                    let breakpoint = self.breakpoints.remove(category, index)?;
                    println!("Removed breakpoint {}", breakpoint);
                }
            },
            "l" | "list" => {
                let categories = match args.get(1) {
                    Some(text) => vec![text.parse::<Category>()?],
                    None => Category::ALL.to_vec(),
                };
                for category in categories {
                    for (index, breakpoint) in self.breakpoints.set(category).iter().enumerate() {
                        println!(
                            "{:>3} {:>2}: {}{}{}",
                            category.as_str(),
                            index,
                            breakpoint,
                            if breakpoint.stop_enabled { " [stop]" } else { "" },
                            if breakpoint.log_enabled { " [log]" } else { "" },
                        );
                    }
                }
            },
            "enable" | "disable" | "log" | "nolog" => {
                if args.len() != 3 {
                    println!("Usage: {} <pc|mem|io|int> <index>", args[0]);
                } else {
                    let (category, index) = parse_entry(&args[1..])?;
                    self.breakpoints.edit(category, index, |breakpoint| match args[0] {
                        "enable" => breakpoint.stop_enabled = true,
                        "disable" => breakpoint.stop_enabled = false,
                        "log" => breakpoint.log_enabled = true,
                        _ => breakpoint.log_enabled = false,
                    })?;
                }
            },
            "history" => {
                for entry in self.log.entries() {
                    println!("{}", entry);
                }
            },
            "set" => {
                if args.len() != 3 {
                    println!("Usage: set <register> <value>");
                } else {
                    let register = args[1].parse::<RegisterName>()?;
                    let value = match register.width() {
                        Width::Byte => parse_hex_u8(args[2])? as u16,
                        Width::Word => parse_hex_u16(args[2])?,
                    };
                    register.write(&mut machine.state, value);
                }
            },
            "setb" => {
                if args.len() < 3 {
                    println!("Usage: setb <addr> <data> [<data> ...]");
                } else {
                    let addr = parse_hex_u16(args[1])?;
                    let data = args[2..].iter().map(|arg| parse_hex_u8(arg)).collect::<Result<Vec<u8>, _>>()?;
                    machine.load(addr, &data);
                }
            },
            "d" | "dump" => {
                let addr = match args.get(1) {
                    Some(arg) => parse_hex_u16(arg)?,
                    None => machine.state.pc,
                };
                let len = match args.get(2) {
                    Some(arg) => parse_hex_u16(arg)?,
                    None => 0x20,
                };
                dump_memory(&*machine, addr, len);
            },
            "regs" | "registers" => {
                let mut text = String::new();
                machine
                    .state
                    .dump_state(&mut text)
                    .map_err(|_| DebuggerError::new("Unable to format registers"))?;
                print!("{}", text);
            },
            "p" | "predict" => {
                let ops = machine.prefetch();
                match EffectPredictor::analyze(&ops, &*machine) {
                    Some(prediction) => {
                        println!("{:04x}: {:?} ({} bytes)", machine.state.pc, prediction.instruction, prediction.length);
                        for effect in prediction.effects {
                            println!("  {:?} {:?} {:04x} {:?}", effect.kind, effect.access, effect.address, effect.value);
                        }
                    },
                    None => println!("{:04x}: unable to decode {:02x?}", machine.state.pc, ops),
                }
            },
            "check" => {
                self.check_repeat_arg(&args)?;
                self.check(machine, None);
            },
            "accept" => {
                if args.len() < 2 {
                    println!("Usage: accept <source name>");
                } else {
                    let name = args[1..].join(" ");
                    let source = find_unique_source(&self.interrupts, &name)
                        .ok_or(BreakpointError::UnknownInterruptSource(name))?
                        .clone();
                    self.check(machine, Some(&source));
                }
            },
            "clock" => {
                if let Some(arg) = args.get(1) {
                    let nanos = arg.parse::<u64>().map_err(|_| DebuggerError::new("Unable to parse clock"))?;
                    self.clock = Instant::START + Duration::from_nanos(nanos);
                }
                println!("@ {} ns", self.clock.as_duration().as_nanos());
            },
            "vars" | "variables" => {
                for variable in self.variables.iter() {
                    println!(
                        "{:<16} {:<9} {:<10} {:<24} {}",
                        variable.name,
                        variable.address_text(),
                        variable.var_type.as_str(),
                        variable.byte_text(&*machine),
                        variable.value_text(&*machine),
                    );
                }
            },
            "var" | "variable" => {
                if args.len() < 3 {
                    println!("Usage: var <name> <addr> [<type>] [<size>]");
                } else {
                    let addr = parse_hex_u16(args[2])?;
                    let size = match args.get(4) {
                        Some(arg) => narrow_u16(parse_hex(arg)?)?,
                        None => 1,
                    };
                    let variable = match args.get(3) {
                        Some(arg) => Variable::new(args[1], addr, arg.parse::<VarType>()?, size),
                        None => Variable::with_default_type(args[1], addr, size),
                    };
                    self.variables.put(variable);
                }
            },
            "unvar" => {
                if args.len() != 2 {
                    println!("Usage: unvar <name>");
                } else {
                    let variable = self.variables.remove(args[1])?;
                    println!("Removed variable {}", variable.name);
                }
            },
            "label" => {
                if args.len() < 3 {
                    println!("Usage: label <name> <addr> [<size>]");
                } else {
                    let addr = parse_hex_u16(args[2])?;
                    let label = match args.get(3) {
                        Some(arg) => Label::data(args[1], addr, narrow_u16(parse_hex(arg)?)?),
                        None => Label::code(args[1], addr),
                    };
                    let options = ImportOptions {
                        remove_obsolete: false,
                        ..self.import_options.clone()
                    };
                    let report = import_labels(&mut self.breakpoints, &mut self.variables, &[label], &options);
                    for event in report.events {
                        println!("{:?}", event);
                    }
                }
            },
            "records" => {
                for record in save_records(&self.breakpoints, &self.variables) {
                    let attrs: Vec<String> = record.iter().map(|(name, value)| format!("{}=\"{}\"", name, value)).collect();
                    println!("{}", attrs.join(" "));
                }
            },
            "c" | "continue" | "q" | "quit" | "exit" => {
                return Ok(DebugControl::Exit);
            },
            _ => {
                println!("Error: unknown command {}", args[0]);
            },
        }
        Ok(DebugControl::Wait)
    }

    fn put_breakpoint(&mut self, breakpoint: Breakpoint) {
        let (category, index) = self.breakpoints.put(breakpoint);
        if let Some(breakpoint) = self.breakpoints.set(category).get(index) {
            println!("Breakpoint {} {}: {}", category.as_str(), index, breakpoint);
        }
    }

    fn check(&mut self, machine: &MemorySnapshot, interrupt: Option<&InterruptSource>) {
        match self.checker.check_breakpoints(machine, self.clock, interrupt) {
            Ok(()) => println!("No breakpoint stops at {:04x}", machine.state.pc),
            Err(err) => println!("{}", err),
        }
    }

    fn check_repeat_arg(&mut self, args: &[&str]) -> Result<(), DebuggerError> {
        if args.len() > 1 {
            let count = args[1]
                .parse::<u32>()
                .map_err(|_| DebuggerError::new("Unable to parse repeat number"))?;
            if count > 1 {
                self.repeat_command = Some((count - 1, args[0].to_string()));
            }
        }
        Ok(())
    }
}

fn dump_memory(view: &dyn CpuView, addr: u16, len: u16) {
    let mut line_addr = addr;
    let mut remaining = len as u32;
    while remaining > 0 {
        let count = remaining.min(16) as u16;
        let bytes: Vec<String> = (0..count).map(|i| format!("{:02x}", view.peek_u8(line_addr.wrapping_add(i)))).collect();
        println!("{:04x}: {}", line_addr, bytes.join(" "));
        line_addr = line_addr.wrapping_add(count);
        remaining -= count as u32;
    }
}

fn parse_entry(args: &[&str]) -> Result<(Category, usize), DebuggerError> {
    let category = args[0].parse::<Category>()?;
    let index = args[1]
        .parse::<usize>()
        .map_err(|_| DebuggerError::new("Unable to parse index"))?;
    Ok((category, index))
}

fn parse_range(arg: &str) -> Result<AddressRange, BreakpointError> {
    match arg.split_once('-') {
        Some((begin, end)) => AddressRange::new(parse_hex_u16(begin)?, Some(parse_hex_u16(end)?)),
        None => Ok(AddressRange::single(parse_hex_u16(arg)?)),
    }
}

fn is_condition(arg: &str) -> bool {
    arg.starts_with('&') || arg.contains(['<', '>', '=', '!'])
}

/// Parse `[&<mask>]<op><value>`, where a missing mask covers the whole width
pub fn parse_rule(arg: &str, width: Width) -> Result<ConditionRule, BreakpointError> {
    let (mask, rest) = match arg.strip_prefix('&') {
        Some(rest) => {
            let split = rest.find(['<', '>', '=', '!']).unwrap_or(rest.len());
            (parse_hex(&rest[..split])?, &rest[split..])
        },
        None => (width.max_value() as u32, arg),
    };
    let split = rest
        .find(|c: char| !matches!(c, '<' | '>' | '=' | '!'))
        .unwrap_or(rest.len());
    let operator = rest[..split].parse::<Operator>()?;
    let value = parse_hex(&rest[split..])?;

    let max = width.max_value() as u32;
    let bits = if width == Width::Byte { 8 } else { 16 };
    if mask > max {
        return Err(BreakpointError::OutOfRange { value: mask, bits });
    }
    if value > max {
        return Err(BreakpointError::OutOfRange { value, bits });
    }
    Ok(ConditionRule::new(width, mask as u16, operator, value as u16))
}

fn parse_register_condition(arg: &str) -> Result<RegisterCondition, BreakpointError> {
    let split = arg.find(['&', '<', '>', '=', '!']).unwrap_or(arg.len());
    let register = arg[..split].parse::<RegisterName>()?;
    let rule = parse_rule(&arg[split..], register.width())?;
    Ok(RegisterCondition { register, rule })
}

pub fn parse_pc_breakpoint(args: &[&str]) -> Result<Breakpoint, BreakpointError> {
    let mut bp = PcBreakpoint::new(parse_hex_u16(args[0])?);
    for arg in &args[1..] {
        if let Some(flags) = arg.strip_prefix("flags=") {
            let (mask, value) = flags.split_once(':').unwrap_or((flags, flags));
            bp.flag_mask = parse_hex_u8(mask)?;
            bp.flag_value = parse_hex_u8(value)? & bp.flag_mask;
        } else if is_condition(arg) {
            bp.register_condition = Some(parse_register_condition(arg)?);
        } else {
            bp.label = Some(arg.to_string());
        }
    }
    Ok(Breakpoint::new(bp.into()))
}

pub fn parse_memory_breakpoint(args: &[&str]) -> Result<Breakpoint, BreakpointError> {
    if is_condition(args[0]) {
        return Err(BreakpointError::ConditionWithoutAddress);
    }
    let mut bp = MemoryBreakpoint::new(parse_range(args[0])?, AccessDirection::ReadOrWrite);
    for arg in &args[1..] {
        if is_condition(arg) {
            bp.value_condition = Some(parse_rule(arg, Width::Byte)?);
        } else if let Ok(access) = arg.parse::<AccessDirection>() {
            bp.access = access;
        } else {
            bp.label = Some(arg.to_string());
        }
    }
    Ok(Breakpoint::new(bp.into()))
}

/// Ports written with at most two digits are 8-bit ports, which only compare the low byte of the address
pub fn parse_io_breakpoint(args: &[&str]) -> Result<Breakpoint, BreakpointError> {
    if is_condition(args[0]) {
        return Err(BreakpointError::ConditionWithoutAddress);
    }
    let begin = args[0].split('-').next().unwrap_or_default();
    let digits = begin.trim_end_matches(['H', 'h']).trim_start_matches("0x");
    let is_8bit = digits.len() <= 2;

    let mut direction = AccessDirection::ReadOrWrite;
    let mut condition = None;
    for arg in &args[1..] {
        if is_condition(arg) {
            condition = Some(parse_rule(arg, Width::Byte)?);
        } else {
            direction = arg.parse::<AccessDirection>()?;
        }
    }

    let mut bp = IoBreakpoint::new(parse_range(args[0])?, is_8bit, direction)?;
    bp.value_condition = condition;
    Ok(Breakpoint::new(BreakpointKind::Io(bp)))
}
