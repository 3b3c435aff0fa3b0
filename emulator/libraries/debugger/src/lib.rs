mod breakpoint;
mod checker;
mod commands;
mod condition;
mod context;
mod error;
mod import;
mod interrupt;
mod parse;
mod persist;
mod register;
mod set;
mod sink;
mod variables;

pub use crate::breakpoint::{
    AccessDirection, AddressRange, Breakpoint, BreakpointKind, Category, IoBreakpoint, MemoryBreakpoint, PcBreakpoint, RegisterCondition,
};
pub use crate::checker::Z80Debugger;
pub use crate::commands::{parse_io_breakpoint, parse_memory_breakpoint, parse_pc_breakpoint, parse_rule, DebugControl, Debugger};
pub use crate::condition::{ConditionRule, Operator, Width};
pub use crate::context::StepContext;
pub use crate::error::{BreakpointError, DebuggerError, PersistError};
pub use crate::import::{import_labels, ImportOptions, ImportReport, Label, MergeEvent};
pub use crate::interrupt::{find_unique_source, InterruptBreakpoint, InterruptSource};
pub use crate::parse::{parse_hex, read_integer};
pub use crate::persist::{breakpoint_to_record, from_record, load_records, save_records, variable_to_record, Entry, LoadReport, Record};
pub use crate::register::RegisterName;
pub use crate::set::{ActiveList, BreakpointSet, Breakpoints};
pub use crate::sink::{LogFacadeSink, LogSink, MemoryLog};
pub use crate::variables::{VarType, Variable, VariableTable};
