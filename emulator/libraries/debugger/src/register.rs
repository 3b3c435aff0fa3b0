use core::fmt;
use core::str::FromStr;

use zwatch_z80::{IndexRegisterHalf, Register, RegisterPair, Z80State};

use crate::condition::Width;
use crate::error::BreakpointError;

/// A register that a program counter breakpoint can test
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RegisterName {
    Byte(Register),
    Half(IndexRegisterHalf),
    Pair(RegisterPair),
    PC,
}

impl RegisterName {
    pub fn width(self) -> Width {
        match self {
            RegisterName::Byte(_) | RegisterName::Half(_) => Width::Byte,
            RegisterName::Pair(_) | RegisterName::PC => Width::Word,
        }
    }

    pub fn read(self, state: &Z80State) -> u16 {
        match self {
            RegisterName::Byte(reg) => state.get_register(reg) as u16,
            RegisterName::Half(reg) => state.get_index_register_half(reg) as u16,
            RegisterName::Pair(regpair) => state.get_register_pair(regpair),
            RegisterName::PC => state.pc,
        }
    }

    pub fn write(self, state: &mut Z80State, value: u16) {
        match self {
            RegisterName::Byte(reg) => state.set_register(reg, value as u8),
            RegisterName::Half(reg) => {
                let (pair, high) = match reg {
                    IndexRegisterHalf::IXH => (&mut state.ix, true),
                    IndexRegisterHalf::IXL => (&mut state.ix, false),
                    IndexRegisterHalf::IYH => (&mut state.iy, true),
                    IndexRegisterHalf::IYL => (&mut state.iy, false),
                };
                *pair = if high {
                    (*pair & 0x00FF) | ((value & 0x00FF) << 8)
                } else {
                    (*pair & 0xFF00) | (value & 0x00FF)
                };
            },
            RegisterName::Pair(regpair) => state.set_register_pair(regpair, value),
            RegisterName::PC => state.pc = value,
        }
    }
}

impl FromStr for RegisterName {
    type Err = BreakpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = match s.trim().to_ascii_uppercase().as_str() {
            "A" => RegisterName::Byte(Register::A),
            "B" => RegisterName::Byte(Register::B),
            "C" => RegisterName::Byte(Register::C),
            "D" => RegisterName::Byte(Register::D),
            "E" => RegisterName::Byte(Register::E),
            "H" => RegisterName::Byte(Register::H),
            "L" => RegisterName::Byte(Register::L),
            "F" => RegisterName::Byte(Register::F),
            "IXH" => RegisterName::Half(IndexRegisterHalf::IXH),
            "IXL" => RegisterName::Half(IndexRegisterHalf::IXL),
            "IYH" => RegisterName::Half(IndexRegisterHalf::IYH),
            "IYL" => RegisterName::Half(IndexRegisterHalf::IYL),
            "AF" => RegisterName::Pair(RegisterPair::AF),
            "BC" => RegisterName::Pair(RegisterPair::BC),
            "DE" => RegisterName::Pair(RegisterPair::DE),
            "HL" => RegisterName::Pair(RegisterPair::HL),
            "IX" => RegisterName::Pair(RegisterPair::IX),
            "IY" => RegisterName::Pair(RegisterPair::IY),
            "SP" => RegisterName::Pair(RegisterPair::SP),
            "PC" => RegisterName::PC,
            _ => return Err(BreakpointError::UnknownRegister(s.trim().to_string())),
        };
        Ok(name)
    }
}

impl fmt::Display for RegisterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterName::Byte(reg) => write!(f, "{}", reg),
            RegisterName::Half(reg) => write!(f, "{}", reg),
            RegisterName::Pair(regpair) => write!(f, "{}", regpair),
            RegisterName::PC => f.write_str("PC"),
        }
    }
}
