use thiserror::Error;

/// Rejected breakpoint or variable definitions, reported back to whoever asked for them
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum BreakpointError {
    #[error("unable to parse {0:?} as a number")]
    InvalidNumber(String),
    #[error("range end {end:04X} is before its beginning {begin:04X}")]
    InvalidRange { begin: u16, end: u16 },
    #[error("{value:X} doesn't fit in {bits} bits")]
    OutOfRange { value: u32, bits: u8 },
    #[error("unknown register {0:?}")]
    UnknownRegister(String),
    #[error("unknown comparison operator {0:?}")]
    UnknownOperator(String),
    #[error("unknown access mode {0:?}")]
    UnknownAccess(String),
    #[error("unknown variable type {0:?}")]
    UnknownVarType(String),
    #[error("a value condition needs an address to watch")]
    ConditionWithoutAddress,
    #[error("no interrupt source named {0:?}")]
    UnknownInterruptSource(String),
    #[error("no entry at index {0}")]
    NoSuchEntry(usize),
    #[error("no entry named {0:?}")]
    NoSuchName(String),
}

/// A single persisted record that couldn't be turned back into a breakpoint or variable
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PersistError {
    #[error("record has no type attribute")]
    MissingType,
    #[error("unknown record type {0:?}")]
    UnknownType(String),
    #[error("missing required attribute {0:?}")]
    MissingAttribute(&'static str),
    #[error("invalid attribute {name:?}: {source}")]
    InvalidAttribute {
        name: &'static str,
        #[source]
        source: BreakpointError,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DebuggerError {
    #[error("breakpoint reached: {0}")]
    Breakpoint(String),
    #[error(transparent)]
    Input(#[from] BreakpointError),
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error("{0}")]
    Other(String),
}

impl DebuggerError {
    pub fn new<S>(msg: S) -> Self
    where
        S: Into<String>,
    {
        DebuggerError::Other(msg.into())
    }
}
