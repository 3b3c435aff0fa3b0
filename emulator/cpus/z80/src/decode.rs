use crate::instructions::{
    Direction, Condition, Register, RegisterPair, IndexRegister, IndexRegisterHalf, SpecialRegister, InterruptMode, Target,
    LoadTarget, UndocumentedCopy, Instruction,
};

/// The longest Z80 instruction, `DD CB d op` and friends, is four bytes
pub const MAX_INSTRUCTION_BYTES: usize = 4;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("instruction at {start:#06x} needs more than the {available} prefetched bytes")]
    Truncated { start: u16, available: usize },
}

/// Operand tables, indexed by the fields of the opcode
const REGISTERS: [Target; 8] = [
    Target::DirectReg(Register::B),
    Target::DirectReg(Register::C),
    Target::DirectReg(Register::D),
    Target::DirectReg(Register::E),
    Target::DirectReg(Register::H),
    Target::DirectReg(Register::L),
    Target::IndirectReg(RegisterPair::HL),
    Target::DirectReg(Register::A),
];

const PAIRS_SP: [RegisterPair; 4] = [RegisterPair::BC, RegisterPair::DE, RegisterPair::HL, RegisterPair::SP];
const PAIRS_AF: [RegisterPair; 4] = [RegisterPair::BC, RegisterPair::DE, RegisterPair::HL, RegisterPair::AF];

const CONDITIONS: [Condition; 8] = [
    Condition::NotZero,
    Condition::Zero,
    Condition::NotCarry,
    Condition::Carry,
    Condition::ParityOdd,
    Condition::ParityEven,
    Condition::Positive,
    Condition::Negative,
];

const ALU_OPS: [fn(Target) -> Instruction; 8] = [
    Instruction::ADDa,
    Instruction::ADCa,
    Instruction::SUB,
    Instruction::SBCa,
    Instruction::AND,
    Instruction::XOR,
    Instruction::OR,
    Instruction::CP,
];

const ROTATE_OPS: [fn(Target, UndocumentedCopy) -> Instruction; 8] = [
    Instruction::RLC,
    Instruction::RRC,
    Instruction::RL,
    Instruction::RR,
    Instruction::SLA,
    Instruction::SRA,
    Instruction::SLL,
    Instruction::SRL,
];

const ACCUMULATOR_OPS: [Instruction; 8] = [
    Instruction::RLCA,
    Instruction::RRCA,
    Instruction::RLA,
    Instruction::RRA,
    Instruction::DAA,
    Instruction::CPL,
    Instruction::SCF,
    Instruction::CCF,
];

// ED A0-BB, by y - 4 then z
const BLOCK_OPS: [[Instruction; 4]; 4] = [
    [Instruction::LDI, Instruction::CPI, Instruction::INI, Instruction::OUTI],
    [Instruction::LDD, Instruction::CPD, Instruction::IND, Instruction::OUTD],
    [Instruction::LDIR, Instruction::CPIR, Instruction::INIR, Instruction::OTIR],
    [Instruction::LDDR, Instruction::CPDR, Instruction::INDR, Instruction::OTDR],
];

const INTERRUPT_MODES: [InterruptMode; 4] = [InterruptMode::Mode0, InterruptMode::Mode0, InterruptMode::Mode1, InterruptMode::Mode2];

/// The fields of an opcode byte, as laid out in <http://www.z80.info/decoding.htm>
///
/// ```text
/// bits  7 6 | 5 4 3 | 2 1 0
///        x  |   y   |   z
///           |  p  q |
/// ```
#[derive(Copy, Clone, Debug)]
struct Opcode(u8);

impl Opcode {
    fn x(self) -> u8 {
        self.0 >> 6
    }

    fn y(self) -> usize {
        usize::from((self.0 >> 3) & 0x07)
    }

    fn z(self) -> usize {
        usize::from(self.0 & 0x07)
    }

    fn p(self) -> usize {
        usize::from((self.0 >> 4) & 0x03)
    }

    fn q(self) -> bool {
        (self.0 & 0x08) != 0
    }
}

/// Decodes a single instruction out of the bytes prefetched at `start`
///
/// The decoder never touches a bus; `memory` is the prefetch window where
/// `memory[0]` is the byte at `start`.
#[derive(Clone, Debug, Default)]
pub struct Z80Decoder {
    pub start: u16,
    pub end: u16,
    pub instruction: Instruction,
}

impl Z80Decoder {
    pub fn decode_at(&mut self, memory: &[u8], start: u16) -> Result<(), DecodeError> {
        self.start = start;
        self.end = start;
        let op = self.next_opcode(memory)?;
        self.instruction = self.decode_unprefixed(memory, op)?;
        Ok(())
    }

    /// Number of bytes consumed by the last decoded instruction
    pub fn length(&self) -> u16 {
        self.end.wrapping_sub(self.start)
    }

    fn decode_unprefixed(&mut self, memory: &[u8], op: Opcode) -> Result<Instruction, DecodeError> {
        let instruction = match op.x() {
            0 => match op.z() {
                0 => match op.y() {
                    0 => Instruction::NOP,
                    1 => Instruction::EXafaf,
                    2 => Instruction::DJNZ(self.next_offset(memory)?),
                    3 => Instruction::JR(self.next_offset(memory)?),
                    y => Instruction::JRcc(CONDITIONS[y - 4], self.next_offset(memory)?),
                },
                1 if op.q() => Instruction::ADD16(RegisterPair::HL, PAIRS_SP[op.p()]),
                1 => {
                    let data = self.next_word(memory)?;
                    Instruction::LD(LoadTarget::DirectRegWord(PAIRS_SP[op.p()]), LoadTarget::ImmediateWord(data))
                },
                2 => self.decode_accumulator_load(memory, op)?,
                3 if op.q() => Instruction::DEC16(PAIRS_SP[op.p()]),
                3 => Instruction::INC16(PAIRS_SP[op.p()]),
                4 => Instruction::INC8(REGISTERS[op.y()]),
                5 => Instruction::DEC8(REGISTERS[op.y()]),
                6 => {
                    let data = self.next_byte(memory)?;
                    Instruction::LD(to_load_target(REGISTERS[op.y()]), LoadTarget::ImmediateByte(data))
                },
                _ => ACCUMULATOR_OPS[op.y()].clone(),
            },
            1 if op.0 == 0x76 => Instruction::HALT,
            1 => Instruction::LD(to_load_target(REGISTERS[op.y()]), to_load_target(REGISTERS[op.z()])),
            2 => ALU_OPS[op.y()](REGISTERS[op.z()]),
            _ => match op.z() {
                0 => Instruction::RETcc(CONDITIONS[op.y()]),
                1 if !op.q() => Instruction::POP(PAIRS_AF[op.p()]),
                1 => match op.p() {
                    0 => Instruction::RET,
                    1 => Instruction::EXX,
                    2 => Instruction::JPIndirect(RegisterPair::HL),
                    _ => Instruction::LD(LoadTarget::DirectRegWord(RegisterPair::SP), LoadTarget::DirectRegWord(RegisterPair::HL)),
                },
                2 => Instruction::JPcc(CONDITIONS[op.y()], self.next_word(memory)?),
                3 => match op.y() {
                    0 => Instruction::JP(self.next_word(memory)?),
                    1 => {
                        let op = self.next_opcode(memory)?;
                        bit_instruction(op, REGISTERS[op.z()], None)
                    },
                    2 => Instruction::OUTx(self.next_byte(memory)?),
                    3 => Instruction::INx(self.next_byte(memory)?),
                    4 => Instruction::EXsp(RegisterPair::HL),
                    5 => Instruction::EXhlde,
                    6 => Instruction::DI,
                    _ => Instruction::EI,
                },
                4 => Instruction::CALLcc(CONDITIONS[op.y()], self.next_word(memory)?),
                5 if !op.q() => Instruction::PUSH(PAIRS_AF[op.p()]),
                5 => match op.p() {
                    0 => Instruction::CALL(self.next_word(memory)?),
                    1 => self.decode_indexed(memory, IndexRegister::IX)?,
                    2 => self.decode_extended(memory)?,
                    _ => self.decode_indexed(memory, IndexRegister::IY)?,
                },
                6 => ALU_OPS[op.y()](Target::Immediate(self.next_byte(memory)?)),
                _ => Instruction::RST(op.0 & 0x38),
            },
        };
        Ok(instruction)
    }

    /// `LD (BC),A` through `LD A,(nn)`, the loads between A or HL and memory
    fn decode_accumulator_load(&mut self, memory: &[u8], op: Opcode) -> Result<Instruction, DecodeError> {
        let accumulator = LoadTarget::DirectRegByte(Register::A);
        let instruction = match op.p() {
            p @ (0 | 1) => {
                let target = LoadTarget::IndirectRegByte(PAIRS_SP[p]);
                if op.q() {
                    Instruction::LD(accumulator, target)
                } else {
                    Instruction::LD(target, accumulator)
                }
            },
            p => {
                let addr = self.next_word(memory)?;
                match (p, op.q()) {
                    (2, false) => Instruction::LD(LoadTarget::IndirectWord(addr), LoadTarget::DirectRegWord(RegisterPair::HL)),
                    (2, true) => Instruction::LD(LoadTarget::DirectRegWord(RegisterPair::HL), LoadTarget::IndirectWord(addr)),
                    (_, false) => Instruction::LD(LoadTarget::IndirectByte(addr), accumulator),
                    (_, true) => Instruction::LD(accumulator, LoadTarget::IndirectByte(addr)),
                }
            },
        };
        Ok(instruction)
    }

    fn decode_extended(&mut self, memory: &[u8]) -> Result<Instruction, DecodeError> {
        let op = self.next_opcode(memory)?;
        let instruction = match op.x() {
            1 => match op.z() {
                0 => match REGISTERS[op.y()] {
                    Target::DirectReg(reg) => Instruction::INic(reg),
                    _ => Instruction::INicz,
                },
                1 => match REGISTERS[op.y()] {
                    Target::DirectReg(reg) => Instruction::OUTic(reg),
                    _ => Instruction::OUTicz,
                },
                2 if op.q() => Instruction::ADC16(RegisterPair::HL, PAIRS_SP[op.p()]),
                2 => Instruction::SBC16(RegisterPair::HL, PAIRS_SP[op.p()]),
                3 => {
                    let addr = LoadTarget::IndirectWord(self.next_word(memory)?);
                    let pair = LoadTarget::DirectRegWord(PAIRS_SP[op.p()]);
                    if op.q() {
                        Instruction::LD(pair, addr)
                    } else {
                        Instruction::LD(addr, pair)
                    }
                },
                4 => Instruction::NEG,
                5 if op.y() == 1 => Instruction::RETI,
                5 => Instruction::RETN,
                6 => Instruction::IM(INTERRUPT_MODES[op.y() & 0x03]),
                _ => match op.y() {
                    0 => Instruction::LDsr(SpecialRegister::I, Direction::FromAcc),
                    1 => Instruction::LDsr(SpecialRegister::R, Direction::FromAcc),
                    2 => Instruction::LDsr(SpecialRegister::I, Direction::ToAcc),
                    3 => Instruction::LDsr(SpecialRegister::R, Direction::ToAcc),
                    4 => Instruction::RRD,
                    5 => Instruction::RLD,
                    _ => Instruction::NOP,
                },
            },
            2 if op.y() >= 4 && op.z() < 4 => BLOCK_OPS[op.y() - 4][op.z()].clone(),
            // the rest of the ED page does nothing
            _ => Instruction::NOP,
        };
        Ok(instruction)
    }

    /// The DD and FD pages, which swap HL for an index register where they differ from the unprefixed page
    fn decode_indexed(&mut self, memory: &[u8], index: IndexRegister) -> Result<Instruction, DecodeError> {
        let op = self.next_opcode(memory)?;
        let pair = RegisterPair::from(index);

        let instruction = match (op.x(), op.p(), op.z()) {
            (3, _, _) if op.0 == 0xCB => {
                let offset = self.next_offset(memory)?;
                let op = self.next_opcode(memory)?;
                let copy = match op.z() {
                    6 => None,
                    z => Some(REGISTERS[z]),
                };
                bit_instruction(op, Target::IndirectOffset(index, offset), copy)
            },

            (0, p, 1) if op.q() => {
                let source = if p == 2 { pair } else { PAIRS_SP[p] };
                Instruction::ADD16(pair, source)
            },
            (0, 2, 1) => Instruction::LD(LoadTarget::DirectRegWord(pair), LoadTarget::ImmediateWord(self.next_word(memory)?)),
            (0, 2, 2) => {
                let addr = LoadTarget::IndirectWord(self.next_word(memory)?);
                if op.q() {
                    Instruction::LD(LoadTarget::DirectRegWord(pair), addr)
                } else {
                    Instruction::LD(addr, LoadTarget::DirectRegWord(pair))
                }
            },
            (0, 2, 3) if op.q() => Instruction::DEC16(pair),
            (0, 2, 3) => Instruction::INC16(pair),
            (0, 2, 4) => Instruction::INC8(Target::DirectRegHalf(index_half(index, op.q()))),
            (0, 2, 5) => Instruction::DEC8(Target::DirectRegHalf(index_half(index, op.q()))),
            (0, 2, 6) => {
                let half = LoadTarget::DirectRegHalfByte(index_half(index, op.q()));
                Instruction::LD(half, LoadTarget::ImmediateByte(self.next_byte(memory)?))
            },
            (0, 3, 4) if !op.q() => Instruction::INC8(Target::IndirectOffset(index, self.next_offset(memory)?)),
            (0, 3, 5) if !op.q() => Instruction::DEC8(Target::IndirectOffset(index, self.next_offset(memory)?)),
            (0, 3, 6) if !op.q() => {
                let offset = self.next_offset(memory)?;
                let data = self.next_byte(memory)?;
                Instruction::LD(LoadTarget::IndirectOffsetByte(index, offset), LoadTarget::ImmediateByte(data))
            },

            // LD r,IXH through LD r,(IX+d), for B C D E
            (1, 0 | 1, z) => match self.index_operand(memory, index, z)? {
                Some(source) => Instruction::LD(to_load_target(REGISTERS[op.y()]), to_load_target(source)),
                None => self.decode_unprefixed(memory, op)?,
            },
            (1, 2, 6) => {
                let dest = if op.q() { Register::L } else { Register::H };
                let offset = self.next_offset(memory)?;
                Instruction::LD(LoadTarget::DirectRegByte(dest), LoadTarget::IndirectOffsetByte(index, offset))
            },
            (1, 2, z) => {
                let source = match z {
                    4 | 5 => Target::DirectRegHalf(index_half(index, z == 5)),
                    _ => REGISTERS[z],
                };
                Instruction::LD(LoadTarget::DirectRegHalfByte(index_half(index, op.q())), to_load_target(source))
            },
            (1, 3, z) if !op.q() && z != 6 => {
                let offset = self.next_offset(memory)?;
                Instruction::LD(LoadTarget::IndirectOffsetByte(index, offset), to_load_target(REGISTERS[z]))
            },
            (1, 3, z) if op.q() => match self.index_operand(memory, index, z)? {
                Some(source) => Instruction::LD(LoadTarget::DirectRegByte(Register::A), to_load_target(source)),
                None => self.decode_unprefixed(memory, op)?,
            },

            (2, _, z) => match self.index_operand(memory, index, z)? {
                Some(target) => ALU_OPS[op.y()](target),
                None => self.decode_unprefixed(memory, op)?,
            },

            (3, _, _) => match op.0 {
                0xE1 => Instruction::POP(pair),
                0xE3 => Instruction::EXsp(pair),
                0xE5 => Instruction::PUSH(pair),
                0xE9 => Instruction::JPIndirect(pair),
                0xF9 => Instruction::LD(LoadTarget::DirectRegWord(RegisterPair::SP), LoadTarget::DirectRegWord(pair)),
                _ => self.decode_unprefixed(memory, op)?,
            },

            // the prefix has no effect, and the opcode runs as if unprefixed
            _ => self.decode_unprefixed(memory, op)?,
        };
        Ok(instruction)
    }

    /// The operand an index prefix substitutes for H, L or (HL), if `z` names one of them
    fn index_operand(&mut self, memory: &[u8], index: IndexRegister, z: usize) -> Result<Option<Target>, DecodeError> {
        let operand = match z {
            4 | 5 => Some(Target::DirectRegHalf(index_half(index, z == 5))),
            6 => Some(Target::IndirectOffset(index, self.next_offset(memory)?)),
            _ => None,
        };
        Ok(operand)
    }

    fn next_byte(&mut self, memory: &[u8]) -> Result<u8, DecodeError> {
        let offset = usize::from(self.end.wrapping_sub(self.start));
        let byte = *memory.get(offset).ok_or(DecodeError::Truncated {
            start: self.start,
            available: memory.len(),
        })?;
        self.end = self.end.wrapping_add(1);
        Ok(byte)
    }

    fn next_opcode(&mut self, memory: &[u8]) -> Result<Opcode, DecodeError> {
        self.next_byte(memory).map(Opcode)
    }

    fn next_offset(&mut self, memory: &[u8]) -> Result<i8, DecodeError> {
        self.next_byte(memory).map(|byte| byte as i8)
    }

    fn next_word(&mut self, memory: &[u8]) -> Result<u16, DecodeError> {
        let low = self.next_byte(memory)?;
        let high = self.next_byte(memory)?;
        Ok(u16::from_le_bytes([low, high]))
    }
}

/// Decode the instruction in `memory`, located at `start`, returning it with its length in bytes
pub fn decode_instruction(memory: &[u8], start: u16) -> Result<(Instruction, u16), DecodeError> {
    let mut decoder = Z80Decoder::default();
    decoder.decode_at(memory, start)?;
    let length = decoder.length();
    Ok((decoder.instruction, length))
}

/// The CB page: rotates and shifts, then BIT, RES and SET
fn bit_instruction(op: Opcode, target: Target, copy: UndocumentedCopy) -> Instruction {
    let bit = op.y() as u8;
    match op.x() {
        0 => ROTATE_OPS[op.y()](target, copy),
        1 => Instruction::BIT(bit, target),
        2 => Instruction::RES(bit, target, copy),
        _ => Instruction::SET(bit, target, copy),
    }
}

fn index_half(index: IndexRegister, low: bool) -> IndexRegisterHalf {
    match (index, low) {
        (IndexRegister::IX, false) => IndexRegisterHalf::IXH,
        (IndexRegister::IX, true) => IndexRegisterHalf::IXL,
        (IndexRegister::IY, false) => IndexRegisterHalf::IYH,
        (IndexRegister::IY, true) => IndexRegisterHalf::IYL,
    }
}

fn to_load_target(target: Target) -> LoadTarget {
    match target {
        Target::DirectReg(reg) => LoadTarget::DirectRegByte(reg),
        Target::DirectRegHalf(reg) => LoadTarget::DirectRegHalfByte(reg),
        Target::IndirectReg(reg) => LoadTarget::IndirectRegByte(reg),
        Target::IndirectOffset(reg, offset) => LoadTarget::IndirectOffsetByte(reg, offset),
        Target::Immediate(data) => LoadTarget::ImmediateByte(data),
    }
}
