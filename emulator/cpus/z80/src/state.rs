use core::fmt::{self, Write};

use crate::instructions::{Register, RegisterPair, IndexRegister, IndexRegisterHalf, InterruptMode, Condition};

#[repr(u8)]
#[allow(dead_code)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[rustfmt::skip]
pub enum Flags {
    Carry       = 0x01,
    AddSubtract = 0x02,
    Parity      = 0x04,
    F3          = 0x08,
    HalfCarry   = 0x10,
    F5          = 0x20,
    Zero        = 0x40,
    Sign        = 0x80,
}

/// Snapshot of the Z80 register file taken before the instruction at `pc` executes
///
/// The main and shadow registers are stored in `B C D E H L A F` order, so each
/// register pair is a big-endian pair of bytes within `reg`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Z80State {
    pub pc: u16,
    pub sp: u16,
    pub ix: u16,
    pub iy: u16,

    pub reg: [u8; 8],
    pub shadow_reg: [u8; 8],

    pub i: u8,
    pub r: u8,

    pub iff1: bool,
    pub iff2: bool,
    pub im: InterruptMode,
}

impl Default for Z80State {
    fn default() -> Self {
        Self {
            pc: 0,
            sp: 0,
            ix: 0,
            iy: 0,

            reg: [0; 8],
            shadow_reg: [0; 8],

            i: 0,
            r: 0,

            iff1: false,
            iff2: false,
            im: InterruptMode::Mode0,
        }
    }
}

impl Z80State {
    pub fn get_register(&self, reg: Register) -> u8 {
        self.reg[reg as usize]
    }

    pub fn set_register(&mut self, reg: Register, value: u8) {
        self.reg[reg as usize] = value;
    }

    pub fn get_shadow_register(&self, reg: Register) -> u8 {
        self.shadow_reg[reg as usize]
    }

    pub fn get_register_pair(&self, regpair: RegisterPair) -> u16 {
        match regpair {
            RegisterPair::BC => read_beu16(&self.reg[0..2]),
            RegisterPair::DE => read_beu16(&self.reg[2..4]),
            RegisterPair::HL => read_beu16(&self.reg[4..6]),
            RegisterPair::AF => read_beu16(&self.reg[6..8]),
            RegisterPair::SP => self.sp,
            RegisterPair::IX => self.ix,
            RegisterPair::IY => self.iy,
        }
    }

    pub fn set_register_pair(&mut self, regpair: RegisterPair, value: u16) {
        match regpair {
            RegisterPair::BC => write_beu16(&mut self.reg[0..2], value),
            RegisterPair::DE => write_beu16(&mut self.reg[2..4], value),
            RegisterPair::HL => write_beu16(&mut self.reg[4..6], value),
            RegisterPair::AF => write_beu16(&mut self.reg[6..8], value),
            RegisterPair::SP => self.sp = value,
            RegisterPair::IX => self.ix = value,
            RegisterPair::IY => self.iy = value,
        }
    }

    pub fn get_index_register(&self, reg: IndexRegister) -> u16 {
        match reg {
            IndexRegister::IX => self.ix,
            IndexRegister::IY => self.iy,
        }
    }

    pub fn get_index_register_half(&self, reg: IndexRegisterHalf) -> u8 {
        match reg {
            IndexRegisterHalf::IXH => (self.ix >> 8) as u8,
            IndexRegisterHalf::IXL => (self.ix & 0x00FF) as u8,
            IndexRegisterHalf::IYH => (self.iy >> 8) as u8,
            IndexRegisterHalf::IYL => (self.iy & 0x00FF) as u8,
        }
    }

    pub fn flags(&self) -> u8 {
        self.reg[Register::F as usize]
    }

    pub fn get_flag(&self, flag: Flags) -> bool {
        (self.flags() & flag as u8) != 0
    }

    pub fn is_condition_met(&self, cond: Condition) -> bool {
        cond.is_met(self.flags())
    }

    /// Effective address of an indexed operand, `(IX+d)` or `(IY+d)`
    pub fn index_address(&self, reg: IndexRegister, offset: i8) -> u16 {
        self.get_index_register(reg).wrapping_add(offset as i16 as u16)
    }

    /// Single line register dump used for log entries
    pub fn format_registers(&self) -> String {
        let mut output = String::new();
        // writing into a String can't fail
        let _ = self.write_registers(&mut output);
        output
    }

    pub fn write_registers<W: Write>(&self, writer: &mut W) -> Result<(), fmt::Error> {
        write!(
            writer,
            "AF={:04X} BC={:04X} DE={:04X} HL={:04X} IX={:04X} IY={:04X} SP={:04X} PC={:04X}",
            self.get_register_pair(RegisterPair::AF),
            self.get_register_pair(RegisterPair::BC),
            self.get_register_pair(RegisterPair::DE),
            self.get_register_pair(RegisterPair::HL),
            self.ix,
            self.iy,
            self.sp,
            self.pc,
        )
    }

    pub fn dump_state<W: Write>(&self, writer: &mut W) -> Result<(), fmt::Error> {
        writeln!(writer, "PC: {:#06x}", self.pc)?;
        writeln!(writer, "SP: {:#06x}", self.sp)?;
        writeln!(writer, "IX: {:#06x}", self.ix)?;
        writeln!(writer, "IY: {:#06x}", self.iy)?;

        for (reg1, reg2) in [(Register::A, Register::F), (Register::B, Register::C), (Register::D, Register::E), (Register::H, Register::L)] {
            writeln!(
                writer,
                "{}: {:#04x}    {}:  {:#04x}           {}': {:#04x}    {}':  {:#04x}",
                reg1,
                self.get_register(reg1),
                reg2,
                self.get_register(reg2),
                reg1,
                self.get_shadow_register(reg1),
                reg2,
                self.get_shadow_register(reg2),
            )?;
        }

        writeln!(writer, "I: {:#04x}    R:  {:#04x}", self.i, self.r)?;
        writeln!(writer, "IM: {:?}  IFF1: {:?}  IFF2: {:?}", self.im, self.iff1, self.iff2)?;
        Ok(())
    }
}

#[inline]
fn read_beu16(data: &[u8]) -> u16 {
    ((data[0] as u16) << 8) | (data[1] as u16)
}

#[inline]
fn write_beu16(data: &mut [u8], value: u16) {
    data[0] = (value >> 8) as u8;
    data[1] = value as u8;
}
