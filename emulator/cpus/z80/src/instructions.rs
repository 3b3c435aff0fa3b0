use core::fmt;

use crate::state::Flags;

/// Direction of an `LD I,A`-style special register transfer
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    ToAcc,
    FromAcc,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Condition {
    NotZero,
    Zero,
    NotCarry,
    Carry,
    ParityOdd,
    ParityEven,
    Positive,
    Negative,
}

impl Condition {
    /// Evaluate the condition against a flags byte, as the branch would before executing
    pub fn is_met(self, flags: u8) -> bool {
        let set = |flag: Flags| (flags & flag as u8) != 0;
        match self {
            Condition::NotZero => !set(Flags::Zero),
            Condition::Zero => set(Flags::Zero),
            Condition::NotCarry => !set(Flags::Carry),
            Condition::Carry => set(Flags::Carry),
            Condition::ParityOdd => !set(Flags::Parity),
            Condition::ParityEven => set(Flags::Parity),
            Condition::Positive => !set(Flags::Sign),
            Condition::Negative => set(Flags::Sign),
        }
    }
}

#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Register {
    B = 0,
    C = 1,
    D = 2,
    E = 3,
    H = 4,
    L = 5,
    A = 6,
    F = 7,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RegisterPair {
    BC,
    DE,
    HL,
    AF,
    SP,
    IX,
    IY,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IndexRegister {
    IX,
    IY,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IndexRegisterHalf {
    IXH,
    IXL,
    IYH,
    IYL,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SpecialRegister {
    I,
    R,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InterruptMode {
    Mode0,
    Mode1,
    Mode2,
}

/// An 8-bit operand of an ALU, rotate or bit instruction
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Target {
    DirectReg(Register),
    DirectRegHalf(IndexRegisterHalf),
    IndirectReg(RegisterPair),
    IndirectOffset(IndexRegister, i8),
    Immediate(u8),
}

/// An operand of a load instruction, either byte or word sized
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LoadTarget {
    DirectRegByte(Register),
    DirectRegHalfByte(IndexRegisterHalf),
    DirectRegWord(RegisterPair),
    IndirectRegByte(RegisterPair),
    IndirectRegWord(RegisterPair),
    IndirectOffsetByte(IndexRegister, i8),
    DirectAltRegByte(Register),
    IndirectByte(u16),
    IndirectWord(u16),
    ImmediateByte(u8),
    ImmediateWord(u16),
}

/// The register an undocumented `DD CB`/`FD CB` instruction also copies its result into
pub type UndocumentedCopy = Option<Target>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Instruction {
    ADCa(Target),
    ADC16(RegisterPair, RegisterPair),
    ADDa(Target),
    ADD16(RegisterPair, RegisterPair),
    AND(Target),
    BIT(u8, Target),
    CALL(u16),
    CALLcc(Condition, u16),
    CCF,
    CP(Target),
    CPD,
    CPDR,
    CPI,
    CPIR,
    CPL,
    DAA,
    DEC16(RegisterPair),
    DEC8(Target),
    DI,
    DJNZ(i8),
    EI,
    EXX,
    EXafaf,
    EXhlde,
    EXsp(RegisterPair),
    HALT,
    IM(InterruptMode),
    INC16(RegisterPair),
    INC8(Target),
    IND,
    INDR,
    INI,
    INIR,
    INic(Register),
    INicz,
    INx(u8),
    JP(u16),
    JPIndirect(RegisterPair),
    JPcc(Condition, u16),
    JR(i8),
    JRcc(Condition, i8),
    LD(LoadTarget, LoadTarget),
    LDsr(SpecialRegister, Direction),
    LDD,
    LDDR,
    LDI,
    LDIR,
    NEG,
    NOP,
    OR(Target),
    OTDR,
    OTIR,
    OUTD,
    OUTI,
    OUTic(Register),
    OUTicz,
    OUTx(u8),
    POP(RegisterPair),
    PUSH(RegisterPair),
    RES(u8, Target, UndocumentedCopy),
    RET,
    RETI,
    RETN,
    RETcc(Condition),
    RL(Target, UndocumentedCopy),
    RLA,
    RLC(Target, UndocumentedCopy),
    RLCA,
    RLD,
    RR(Target, UndocumentedCopy),
    RRA,
    RRC(Target, UndocumentedCopy),
    RRCA,
    RRD,
    RST(u8),
    SBCa(Target),
    SBC16(RegisterPair, RegisterPair),
    SCF,
    SET(u8, Target, UndocumentedCopy),
    SLA(Target, UndocumentedCopy),
    SLL(Target, UndocumentedCopy),
    SRA(Target, UndocumentedCopy),
    SRL(Target, UndocumentedCopy),
    SUB(Target),
    XOR(Target),
}

impl Default for Instruction {
    fn default() -> Self {
        Instruction::NOP
    }
}

impl From<IndexRegister> for RegisterPair {
    fn from(value: IndexRegister) -> Self {
        match value {
            IndexRegister::IX => RegisterPair::IX,
            IndexRegister::IY => RegisterPair::IY,
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Register::B => "B",
            Register::C => "C",
            Register::D => "D",
            Register::E => "E",
            Register::H => "H",
            Register::L => "L",
            Register::A => "A",
            Register::F => "F",
        };
        f.write_str(name)
    }
}

impl fmt::Display for RegisterPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RegisterPair::BC => "BC",
            RegisterPair::DE => "DE",
            RegisterPair::HL => "HL",
            RegisterPair::AF => "AF",
            RegisterPair::SP => "SP",
            RegisterPair::IX => "IX",
            RegisterPair::IY => "IY",
        };
        f.write_str(name)
    }
}

impl fmt::Display for IndexRegisterHalf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IndexRegisterHalf::IXH => "IXH",
            IndexRegisterHalf::IXL => "IXL",
            IndexRegisterHalf::IYH => "IYH",
            IndexRegisterHalf::IYL => "IYL",
        };
        f.write_str(name)
    }
}
