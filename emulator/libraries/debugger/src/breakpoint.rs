use core::cmp::Ordering;
use core::fmt::{self, Write};
use core::str::FromStr;

use zwatch_z80::{Access, Effect, EffectKind, Z80State};

use crate::condition::ConditionRule;
use crate::context::StepContext;
use crate::error::BreakpointError;
use crate::interrupt::InterruptBreakpoint;
use crate::register::RegisterName;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AccessDirection {
    Read,
    Write,
    ReadOrWrite,
}

impl AccessDirection {
    pub fn from_flags(read: bool, write: bool) -> Option<Self> {
        match (read, write) {
            (true, false) => Some(AccessDirection::Read),
            (false, true) => Some(AccessDirection::Write),
            (true, true) => Some(AccessDirection::ReadOrWrite),
            (false, false) => None,
        }
    }

    pub fn includes(self, access: Access) -> bool {
        match self {
            AccessDirection::Read => access == Access::Read,
            AccessDirection::Write => access == Access::Write,
            AccessDirection::ReadOrWrite => true,
        }
    }

    pub fn on_read(self) -> bool {
        self.includes(Access::Read)
    }

    pub fn on_write(self) -> bool {
        self.includes(Access::Write)
    }
}

impl FromStr for AccessDirection {
    type Err = BreakpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "r" | "read" | "in" | "input" => Ok(AccessDirection::Read),
            "w" | "write" | "out" | "output" => Ok(AccessDirection::Write),
            "rw" | "r/w" | "readwrite" | "inout" | "in/out" | "io" => Ok(AccessDirection::ReadOrWrite),
            _ => Err(BreakpointError::UnknownAccess(s.trim().to_string())),
        }
    }
}

/// An inclusive address or port range, where a missing end means a single address
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AddressRange {
    pub begin: u16,
    pub end: Option<u16>,
}

impl AddressRange {
    pub fn new(begin: u16, end: Option<u16>) -> Result<Self, BreakpointError> {
        match end {
            Some(end) if end < begin => Err(BreakpointError::InvalidRange { begin, end }),
            Some(end) if end == begin => Ok(Self::single(begin)),
            _ => Ok(Self { begin, end }),
        }
    }

    pub fn single(addr: u16) -> Self {
        Self { begin: addr, end: None }
    }

    /// The range covering `size` bytes from `begin`, cut off at the top of the address space
    pub fn sized(begin: u16, size: u16) -> Self {
        let last = (begin as u32 + size.max(1) as u32 - 1).min(0xFFFF) as u16;
        if last == begin {
            Self::single(begin)
        } else {
            Self { begin, end: Some(last) }
        }
    }

    pub fn last(&self) -> u16 {
        self.end.unwrap_or(self.begin)
    }

    pub fn contains(&self, addr: u16) -> bool {
        addr >= self.begin && addr <= self.last()
    }

    fn write_text(&self, text: &mut String, digits: usize) -> fmt::Result {
        write!(text, "{:0digits$X}", self.begin, digits = digits)?;
        if let Some(end) = self.end {
            write!(text, "-{:0digits$X}", end, digits = digits)?;
        }
        Ok(())
    }
}

/// The value an effect carries must satisfy the condition, unless it isn't known ahead of time
fn value_matches(condition: Option<&ConditionRule>, value: Option<u8>) -> bool {
    match (condition, value) {
        (Some(rule), Some(value)) => rule.evaluate(value as u16),
        _ => true,
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RegisterCondition {
    pub register: RegisterName,
    pub rule: ConditionRule,
}

impl RegisterCondition {
    pub fn new(register: RegisterName, mask: u16, operator: crate::condition::Operator, value: u16) -> Self {
        Self {
            register,
            rule: ConditionRule::new(register.width(), mask, operator, value),
        }
    }

    pub fn matches(&self, state: &Z80State) -> bool {
        self.rule.evaluate(self.register.read(state))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PcBreakpoint {
    pub address: u16,
    pub label: Option<String>,
    pub imported: bool,
    pub register_condition: Option<RegisterCondition>,
    pub flag_mask: u8,
    pub flag_value: u8,
}

impl PcBreakpoint {
    pub fn new(address: u16) -> Self {
        Self {
            address,
            label: None,
            imported: false,
            register_condition: None,
            flag_mask: 0,
            flag_value: 0,
        }
    }

    pub fn matches(&self, state: &Z80State) -> bool {
        state.pc == self.address
            && self.register_condition.map(|cond| cond.matches(state)).unwrap_or(true)
            && (state.flags() & self.flag_mask) == self.flag_value
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemoryBreakpoint {
    pub range: AddressRange,
    pub label: Option<String>,
    pub imported: bool,
    pub access: AccessDirection,
    pub value_condition: Option<ConditionRule>,
}

impl MemoryBreakpoint {
    pub fn new(range: AddressRange, access: AccessDirection) -> Self {
        Self {
            range,
            label: None,
            imported: false,
            access,
            value_condition: None,
        }
    }

    pub fn matches(&self, ctx: &StepContext<'_>) -> bool {
        if let Some(prediction) = ctx.prediction() {
            if self.access.on_read() && prediction.fetches.iter().any(|effect| self.matches_effect(effect)) {
                return true;
            }
            if prediction.effects.iter().any(|effect| self.matches_effect(effect)) {
                return true;
            }
        }
        ctx.interrupt_pushes().iter().any(|effect| self.matches_effect(effect))
    }

    fn matches_effect(&self, effect: &Effect) -> bool {
        effect.kind == EffectKind::Memory
            && self.access.includes(effect.access)
            && self.range.contains(effect.address)
            && value_matches(self.value_condition.as_ref(), effect.value)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IoBreakpoint {
    pub range: AddressRange,
    pub is_8bit: bool,
    pub direction: AccessDirection,
    pub value_condition: Option<ConditionRule>,
}

impl IoBreakpoint {
    pub fn new(range: AddressRange, is_8bit: bool, direction: AccessDirection) -> Result<Self, BreakpointError> {
        if is_8bit && range.last() > 0xFF {
            return Err(BreakpointError::OutOfRange {
                value: range.last() as u32,
                bits: 8,
            });
        }
        Ok(Self {
            range,
            is_8bit,
            direction,
            value_condition: None,
        })
    }

    pub fn matches(&self, ctx: &StepContext<'_>) -> bool {
        ctx.prediction()
            .map(|prediction| prediction.effects.iter().any(|effect| self.matches_effect(effect)))
            .unwrap_or(false)
    }

    fn matches_effect(&self, effect: &Effect) -> bool {
        let port = if self.is_8bit { effect.address & 0x00FF } else { effect.address };
        effect.kind == EffectKind::Port
            && self.direction.includes(effect.access)
            && self.range.contains(port)
            && value_matches(self.value_condition.as_ref(), effect.value)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Category {
    ProgramCounter,
    Memory,
    Io,
    Interrupt,
}

impl Category {
    pub const ALL: [Category; 4] = [Category::ProgramCounter, Category::Memory, Category::Io, Category::Interrupt];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::ProgramCounter => "pc",
            Category::Memory => "mem",
            Category::Io => "io",
            Category::Interrupt => "int",
        }
    }
}

impl FromStr for Category {
    type Err = BreakpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pc" | "b" | "break" => Ok(Category::ProgramCounter),
            "mem" | "memory" | "w" | "watch" => Ok(Category::Memory),
            "io" | "port" => Ok(Category::Io),
            "int" | "interrupt" => Ok(Category::Interrupt),
            other => Err(BreakpointError::UnknownAccess(other.to_string())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BreakpointKind {
    ProgramCounter(PcBreakpoint),
    Memory(MemoryBreakpoint),
    Io(IoBreakpoint),
    Interrupt(InterruptBreakpoint),
}

impl BreakpointKind {
    pub fn category(&self) -> Category {
        match self {
            BreakpointKind::ProgramCounter(_) => Category::ProgramCounter,
            BreakpointKind::Memory(_) => Category::Memory,
            BreakpointKind::Io(_) => Category::Io,
            BreakpointKind::Interrupt(_) => Category::Interrupt,
        }
    }

    fn display_text(&self) -> String {
        let mut text = String::new();
        // writing into a String can't fail
        let _ = self.write_text(&mut text);
        text
    }

    fn write_text(&self, text: &mut String) -> fmt::Result {
        match self {
            BreakpointKind::ProgramCounter(bp) => {
                write!(text, "{:04X}", bp.address)?;
                if let Some(label) = &bp.label {
                    write!(text, " {}", label)?;
                }
                if let Some(cond) = &bp.register_condition {
                    write!(text, " {}{}", cond.register, cond.rule)?;
                }
                if bp.flag_mask != 0 {
                    write!(text, " F&{:02X}={:02X}", bp.flag_mask, bp.flag_value)?;
                }
            },
            BreakpointKind::Memory(bp) => {
                bp.range.write_text(text, 4)?;
                let access = match bp.access {
                    AccessDirection::Read => "R",
                    AccessDirection::Write => "W",
                    AccessDirection::ReadOrWrite => "RW",
                };
                write!(text, " {}", access)?;
                if let Some(rule) = &bp.value_condition {
                    write!(text, " {}", rule)?;
                }
                if let Some(label) = &bp.label {
                    write!(text, " {}", label)?;
                }
            },
            BreakpointKind::Io(bp) => {
                bp.range.write_text(text, if bp.is_8bit { 2 } else { 4 })?;
                let direction = match bp.direction {
                    AccessDirection::Read => "IN",
                    AccessDirection::Write => "OUT",
                    AccessDirection::ReadOrWrite => "IN/OUT",
                };
                write!(text, " {}", direction)?;
                if let Some(rule) = &bp.value_condition {
                    write!(text, " {}", rule)?;
                }
            },
            BreakpointKind::Interrupt(bp) => {
                write!(text, "{}", bp.source.name)?;
            },
        }
        Ok(())
    }
}

/// A breakpoint with its enable flags and its derived display text
///
/// The display text identifies the breakpoint: two breakpoints are equal, and sort,
/// by their text alone.  It is recomputed whenever the matching fields change, which is
/// why the kind is only reachable through [`Breakpoint::update`].
#[derive(Clone, Debug)]
pub struct Breakpoint {
    kind: BreakpointKind,
    text: String,
    pub stop_enabled: bool,
    pub log_enabled: bool,
}

impl Breakpoint {
    /// A breakpoint that stops execution, as created by the user
    pub fn new(kind: BreakpointKind) -> Self {
        let text = kind.display_text();
        Self {
            kind,
            text,
            stop_enabled: true,
            log_enabled: false,
        }
    }

    /// A breakpoint that neither stops nor logs, as created by a label import
    pub fn inert(kind: BreakpointKind) -> Self {
        Self {
            stop_enabled: false,
            ..Self::new(kind)
        }
    }

    pub fn kind(&self) -> &BreakpointKind {
        &self.kind
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn category(&self) -> Category {
        self.kind.category()
    }

    pub fn is_active(&self) -> bool {
        self.stop_enabled || self.log_enabled
    }

    pub fn update<F>(&mut self, f: F)
    where
        F: FnOnce(&mut BreakpointKind),
    {
        f(&mut self.kind);
        self.text = self.kind.display_text();
    }

    /// The label of a breakpoint that can be created by a label import
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            BreakpointKind::ProgramCounter(bp) => bp.label.as_deref(),
            BreakpointKind::Memory(bp) => bp.label.as_deref(),
            _ => None,
        }
    }

    pub fn is_imported(&self) -> bool {
        match &self.kind {
            BreakpointKind::ProgramCounter(bp) => bp.imported,
            BreakpointKind::Memory(bp) => bp.imported,
            _ => false,
        }
    }

    pub fn set_imported(&mut self, imported: bool) {
        match &mut self.kind {
            BreakpointKind::ProgramCounter(bp) => bp.imported = imported,
            BreakpointKind::Memory(bp) => bp.imported = imported,
            _ => {},
        }
    }

    pub fn matches(&self, ctx: &StepContext<'_>) -> bool {
        match &self.kind {
            BreakpointKind::ProgramCounter(bp) => bp.matches(ctx.state()),
            BreakpointKind::Memory(bp) => bp.matches(ctx),
            BreakpointKind::Io(bp) => bp.matches(ctx),
            BreakpointKind::Interrupt(bp) => bp.matches(ctx.interrupt()),
        }
    }
}

impl PartialEq for Breakpoint {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl Eq for Breakpoint {}

impl PartialOrd for Breakpoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Breakpoint {
    fn cmp(&self, other: &Self) -> Ordering {
        self.text.cmp(&other.text)
    }
}

impl fmt::Display for Breakpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl From<PcBreakpoint> for BreakpointKind {
    fn from(bp: PcBreakpoint) -> Self {
        BreakpointKind::ProgramCounter(bp)
    }
}

impl From<MemoryBreakpoint> for BreakpointKind {
    fn from(bp: MemoryBreakpoint) -> Self {
        BreakpointKind::Memory(bp)
    }
}

impl From<IoBreakpoint> for BreakpointKind {
    fn from(bp: IoBreakpoint) -> Self {
        BreakpointKind::Io(bp)
    }
}

impl From<InterruptBreakpoint> for BreakpointKind {
    fn from(bp: InterruptBreakpoint) -> Self {
        BreakpointKind::Interrupt(bp)
    }
}
