use core::fmt::Write;
use core::str::FromStr;

use zwatch_z80::CpuView;

use crate::error::BreakpointError;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VarType {
    Int1,
    Int2Le,
    Int2Be,
    Int3Le,
    Int3Be,
    Int4Le,
    Int4Be,
    Int8Le,
    Int8Be,
    Float4Le,
    Float4Be,
    Float8Le,
    Float8Be,
    ByteArray,
    Pointer,
}

impl VarType {
    /// The type a variable of `size` bytes gets when none is given
    pub fn default_for_size(size: u16) -> Self {
        match size {
            1 => VarType::Int1,
            2 => VarType::Int2Le,
            3 => VarType::Int3Le,
            4 => VarType::Int4Le,
            8 => VarType::Int8Le,
            _ => VarType::ByteArray,
        }
    }

    /// The number of bytes the type occupies, or None if it takes the variable's size
    pub fn fixed_size(self) -> Option<u16> {
        match self {
            VarType::Int1 => Some(1),
            VarType::Int2Le | VarType::Int2Be | VarType::Pointer => Some(2),
            VarType::Int3Le | VarType::Int3Be => Some(3),
            VarType::Int4Le | VarType::Int4Be | VarType::Float4Le | VarType::Float4Be => Some(4),
            VarType::Int8Le | VarType::Int8Be | VarType::Float8Le | VarType::Float8Be => Some(8),
            VarType::ByteArray => None,
        }
    }

    fn is_little_endian(self) -> bool {
        !matches!(
            self,
            VarType::Int2Be | VarType::Int3Be | VarType::Int4Be | VarType::Int8Be | VarType::Float4Be | VarType::Float8Be
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VarType::Int1 => "INT1",
            VarType::Int2Le => "INT2LE",
            VarType::Int2Be => "INT2BE",
            VarType::Int3Le => "INT3LE",
            VarType::Int3Be => "INT3BE",
            VarType::Int4Le => "INT4LE",
            VarType::Int4Be => "INT4BE",
            VarType::Int8Le => "INT8LE",
            VarType::Int8Be => "INT8BE",
            VarType::Float4Le => "FLOAT4LE",
            VarType::Float4Be => "FLOAT4BE",
            VarType::Float8Le => "FLOAT8LE",
            VarType::Float8Be => "FLOAT8BE",
            VarType::ByteArray => "BYTE_ARRAY",
            VarType::Pointer => "POINTER",
        }
    }
}

impl FromStr for VarType {
    type Err = BreakpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let var_type = match s.trim().to_ascii_uppercase().as_str() {
            "INT1" => VarType::Int1,
            "INT2LE" => VarType::Int2Le,
            "INT2BE" => VarType::Int2Be,
            "INT3LE" => VarType::Int3Le,
            "INT3BE" => VarType::Int3Be,
            "INT4LE" => VarType::Int4Le,
            "INT4BE" => VarType::Int4Be,
            "INT8LE" => VarType::Int8Le,
            "INT8BE" => VarType::Int8Be,
            "FLOAT4LE" => VarType::Float4Le,
            "FLOAT4BE" => VarType::Float4Be,
            "FLOAT8LE" => VarType::Float8Le,
            "FLOAT8BE" => VarType::Float8Be,
            "BYTE_ARRAY" | "BYTES" => VarType::ByteArray,
            "POINTER" | "PTR" => VarType::Pointer,
            _ => return Err(BreakpointError::UnknownVarType(s.trim().to_string())),
        };
        Ok(var_type)
    }
}

/// A named location in the emulated memory, shown with its current contents
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub address: u16,
    pub var_type: VarType,
    pub size: u16,
    pub imported: bool,
}

impl Variable {
    pub fn new<S>(name: S, address: u16, var_type: VarType, size: u16) -> Self
    where
        S: Into<String>,
    {
        let size = var_type.fixed_size().unwrap_or(size).max(1);
        Self {
            name: name.into(),
            address,
            var_type,
            size,
            imported: false,
        }
    }

    pub fn with_default_type<S>(name: S, address: u16, size: u16) -> Self
    where
        S: Into<String>,
    {
        Self::new(name, address, VarType::default_for_size(size), size)
    }

    pub fn address_text(&self) -> String {
        if self.size > 1 {
            format!("{:04X}-{:04X}", self.address, self.address.wrapping_add(self.size - 1))
        } else {
            format!("{:04X}", self.address)
        }
    }

    fn peek_bytes(&self, view: &dyn CpuView, addr: u16, count: u16) -> Vec<u8> {
        (0..count).map(|i| view.peek_u8(addr.wrapping_add(i))).collect()
    }

    fn peek_unsigned(&self, view: &dyn CpuView, count: u16) -> u64 {
        let mut bytes = self.peek_bytes(view, self.address, count);
        if !self.var_type.is_little_endian() {
            bytes.reverse();
        }
        bytes.iter().rev().fold(0, |acc, byte| (acc << 8) | *byte as u64)
    }

    /// The current value, in the form best suited to its type
    pub fn value_text(&self, view: &dyn CpuView) -> String {
        match self.var_type {
            VarType::Int1 => {
                let value = view.peek_u8(self.address);
                let mut text = integer_text(value as u64, 8);
                if (0x21..=0x7E).contains(&value) {
                    let _ = write!(text, " '{}'", value as char);
                }
                text
            },
            VarType::Int2Le | VarType::Int2Be => integer_text(self.peek_unsigned(view, 2), 16),
            VarType::Int3Le | VarType::Int3Be => integer_text(self.peek_unsigned(view, 3), 24),
            VarType::Int4Le | VarType::Int4Be => integer_text(self.peek_unsigned(view, 4), 32),
            VarType::Int8Le | VarType::Int8Be => integer_text(self.peek_unsigned(view, 8), 64),
            VarType::Float4Le | VarType::Float4Be => f32::from_bits(self.peek_unsigned(view, 4) as u32).to_string(),
            VarType::Float8Le | VarType::Float8Be => f64::from_bits(self.peek_unsigned(view, 8)).to_string(),
            VarType::ByteArray => printable_text(&self.peek_bytes(view, self.address, self.size)),
            VarType::Pointer => {
                let target = view.peek_leu16(self.address);
                format!("{:04X}: {}", target, printable_text(&self.peek_bytes(view, target, 16)))
            },
        }
    }

    /// The raw bytes as hex, in memory order
    pub fn byte_text(&self, view: &dyn CpuView) -> String {
        self.peek_bytes(view, self.address, self.size)
            .iter()
            .map(|byte| format!("{:02X}", byte))
            .collect::<Vec<String>>()
            .join(" ")
    }
}

/// Print the unsigned value, and the signed one too when the top bit is set
fn integer_text(value: u64, bits: u32) -> String {
    if value & (1 << (bits - 1)) != 0 {
        let signed = ((value << (64 - bits)) as i64) >> (64 - bits);
        format!("{} / {}", signed, value)
    } else {
        format!("{}", value)
    }
}

fn printable_text(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|byte| if (0x20..=0x7E).contains(byte) { *byte as char } else { '.' })
        .collect()
}

#[derive(Clone, Debug, Default)]
pub struct VariableTable {
    entries: Vec<Variable>,
}

impl VariableTable {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.entries.iter()
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Variable> {
        self.entries.get_mut(index)
    }

    /// Add a variable, replacing any with the same name, and return its index
    pub fn put(&mut self, variable: Variable) -> usize {
        match self.entries.iter().position(|existing| existing.name == variable.name) {
            Some(index) => {
                self.entries[index] = variable;
                index
            },
            None => {
                self.entries.push(variable);
                self.entries.len() - 1
            },
        }
    }

    pub fn remove(&mut self, name: &str) -> Result<Variable, BreakpointError> {
        let index = self
            .find_by_name(name, true)
            .ok_or_else(|| BreakpointError::NoSuchName(name.to_string()))?;
        Ok(self.entries.remove(index))
    }

    pub fn remove_all<F>(&mut self, mut pred: F) -> Vec<Variable>
    where
        F: FnMut(&Variable) -> bool,
    {
        let (removed, kept) = self.entries.drain(..).partition(|variable| pred(variable));
        self.entries = kept;
        removed
    }

    pub fn find_by_name(&self, name: &str, case_sensitive: bool) -> Option<usize> {
        self.entries.iter().position(|variable| {
            if case_sensitive {
                variable.name == name
            } else {
                variable.name.eq_ignore_ascii_case(name)
            }
        })
    }
}
