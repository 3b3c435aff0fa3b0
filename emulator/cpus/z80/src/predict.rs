use log::debug;

use crate::decode::Z80Decoder;
use crate::instructions::{Instruction, LoadTarget, Register, RegisterPair, Target};
use crate::state::{Flags, Z80State};
use crate::view::CpuView;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EffectKind {
    Memory,
    Port,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

/// A single bus access the pending instruction will perform
///
/// `value` is the byte that will be written, or for memory reads the byte currently
/// stored there.  It is `None` when the value can't be known without executing,
/// such as the byte returned by a port read.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Effect {
    pub kind: EffectKind,
    pub address: u16,
    pub access: Access,
    pub value: Option<u8>,
}

impl Effect {
    pub const fn memory(address: u16, access: Access, value: Option<u8>) -> Self {
        Self {
            kind: EffectKind::Memory,
            address,
            access,
            value,
        }
    }

    pub const fn port(address: u16, access: Access, value: Option<u8>) -> Self {
        Self {
            kind: EffectKind::Port,
            address,
            access,
            value,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Prediction {
    pub instruction: Instruction,
    pub length: u16,
    /// Data accesses, in the order the instruction performs them
    pub effects: Vec<Effect>,
    /// Opcode and operand fetches of the instruction itself
    pub fetches: Vec<Effect>,
}

enum LoadValue {
    Byte(u8),
    Word(u16),
}

/// Predicts the memory and I/O accesses of the instruction about to be fetched
///
/// Nothing here executes the instruction.  Register values come from the view's
/// snapshot and memory contents from its side-effect free peek.
pub struct EffectPredictor;

impl EffectPredictor {
    /// The data effects of the instruction encoded in `ops`, which must be the bytes at PC
    ///
    /// Bytes that don't decode, or that decode to an instruction with no memory or I/O
    /// access, give an empty list.
    pub fn predict<V: CpuView + ?Sized>(ops: &[u8], view: &V) -> Vec<Effect> {
        Self::analyze(ops, view).map(|prediction| prediction.effects).unwrap_or_default()
    }

    pub fn analyze<V: CpuView + ?Sized>(ops: &[u8], view: &V) -> Option<Prediction> {
        let state = view.state();
        let mut decoder = Z80Decoder::default();
        if let Err(err) = decoder.decode_at(ops, state.pc) {
            debug!("no prediction at {:04x}: {}", state.pc, err);
            return None;
        }

        let length = decoder.length();
        let fetches = ops
            .iter()
            .take(length as usize)
            .enumerate()
            .map(|(i, byte)| Effect::memory(state.pc.wrapping_add(i as u16), Access::Read, Some(*byte)))
            .collect();

        let mut predictor = Predictor {
            view,
            state,
            effects: vec![],
        };
        predictor.instruction(&decoder.instruction, state.pc.wrapping_add(length));

        Some(Prediction {
            instruction: decoder.instruction,
            length,
            effects: predictor.effects,
            fetches,
        })
    }
}

struct Predictor<'a, V: CpuView + ?Sized> {
    view: &'a V,
    state: &'a Z80State,
    effects: Vec<Effect>,
}

impl<'a, V: CpuView + ?Sized> Predictor<'a, V> {
    fn instruction(&mut self, instruction: &Instruction, next_pc: u16) {
        match *instruction {
            Instruction::ADCa(target)
            | Instruction::ADDa(target)
            | Instruction::AND(target)
            | Instruction::CP(target)
            | Instruction::OR(target)
            | Instruction::SBCa(target)
            | Instruction::SUB(target)
            | Instruction::XOR(target)
            | Instruction::BIT(_, target) => {
                self.read_target(target);
            },
            Instruction::INC8(target) => {
                self.modify_target(target, |value| value.wrapping_add(1));
            },
            Instruction::DEC8(target) => {
                self.modify_target(target, |value| value.wrapping_sub(1));
            },
            Instruction::LD(dest, src) => {
                let value = self.read_load_target(src);
                self.write_load_target(dest, value);
            },

            Instruction::PUSH(regpair) => {
                self.push_word(self.state.get_register_pair(regpair));
            },
            Instruction::POP(_) | Instruction::RET | Instruction::RETI | Instruction::RETN => {
                self.pop_word();
            },
            Instruction::RETcc(cond) => {
                if self.state.is_condition_met(cond) {
                    self.pop_word();
                }
            },
            Instruction::CALL(_) | Instruction::RST(_) => {
                self.push_word(next_pc);
            },
            Instruction::CALLcc(cond, _) => {
                if self.state.is_condition_met(cond) {
                    self.push_word(next_pc);
                }
            },
            Instruction::EXsp(regpair) => {
                let sp = self.state.sp;
                let value = self.state.get_register_pair(regpair);
                self.read_memory(sp);
                self.read_memory(sp.wrapping_add(1));
                self.write_memory(sp, value as u8);
                self.write_memory(sp.wrapping_add(1), (value >> 8) as u8);
            },

            Instruction::RLC(target, _)
            | Instruction::RRC(target, _)
            | Instruction::RL(target, _)
            | Instruction::RR(target, _)
            | Instruction::SLA(target, _)
            | Instruction::SRA(target, _)
            | Instruction::SLL(target, _)
            | Instruction::SRL(target, _) => {
                let carry = self.state.get_flag(Flags::Carry);
                self.modify_target(target, |value| shift_value(instruction, value, carry));
            },
            Instruction::RES(bit, target, _) => {
                self.modify_target(target, |value| value & !(1 << bit));
            },
            Instruction::SET(bit, target, _) => {
                self.modify_target(target, |value| value | (1 << bit));
            },
            Instruction::RLD => {
                let acc = self.state.get_register(Register::A);
                self.modify_target(Target::IndirectReg(RegisterPair::HL), |value| (value << 4) | (acc & 0x0F));
            },
            Instruction::RRD => {
                let acc = self.state.get_register(Register::A);
                self.modify_target(Target::IndirectReg(RegisterPair::HL), |value| (acc << 4) | (value >> 4));
            },

            Instruction::LDI | Instruction::LDD | Instruction::LDIR | Instruction::LDDR => {
                let value = self.read_memory(self.state.get_register_pair(RegisterPair::HL));
                self.write_memory(self.state.get_register_pair(RegisterPair::DE), value);
            },
            Instruction::CPI | Instruction::CPD | Instruction::CPIR | Instruction::CPDR => {
                self.read_memory(self.state.get_register_pair(RegisterPair::HL));
            },
            Instruction::INI | Instruction::IND | Instruction::INIR | Instruction::INDR => {
                self.effects
                    .push(Effect::port(self.state.get_register_pair(RegisterPair::BC), Access::Read, None));
                self.effects
                    .push(Effect::memory(self.state.get_register_pair(RegisterPair::HL), Access::Write, None));
            },
            Instruction::OUTI | Instruction::OUTD | Instruction::OTIR | Instruction::OTDR => {
                let value = self.read_memory(self.state.get_register_pair(RegisterPair::HL));
                // B is decremented before it is put on the address bus
                let b = self.state.get_register(Register::B).wrapping_sub(1);
                let port = ((b as u16) << 8) | self.state.get_register(Register::C) as u16;
                self.effects.push(Effect::port(port, Access::Write, Some(value)));
            },

            Instruction::INx(n) => {
                let port = ((self.state.get_register(Register::A) as u16) << 8) | n as u16;
                self.effects.push(Effect::port(port, Access::Read, None));
            },
            Instruction::OUTx(n) => {
                let acc = self.state.get_register(Register::A);
                let port = ((acc as u16) << 8) | n as u16;
                self.effects.push(Effect::port(port, Access::Write, Some(acc)));
            },
            Instruction::INic(_) | Instruction::INicz => {
                self.effects
                    .push(Effect::port(self.state.get_register_pair(RegisterPair::BC), Access::Read, None));
            },
            Instruction::OUTic(reg) => {
                let value = self.state.get_register(reg);
                self.effects
                    .push(Effect::port(self.state.get_register_pair(RegisterPair::BC), Access::Write, Some(value)));
            },
            Instruction::OUTicz => {
                self.effects
                    .push(Effect::port(self.state.get_register_pair(RegisterPair::BC), Access::Write, Some(0)));
            },

            _ => {},
        }
    }

    fn target_address(&self, target: Target) -> Option<u16> {
        match target {
            Target::IndirectReg(regpair) => Some(self.state.get_register_pair(regpair)),
            Target::IndirectOffset(reg, offset) => Some(self.state.index_address(reg, offset)),
            _ => None,
        }
    }

    fn read_target(&mut self, target: Target) {
        if let Some(addr) = self.target_address(target) {
            self.read_memory(addr);
        }
    }

    fn modify_target<F>(&mut self, target: Target, f: F)
    where
        F: FnOnce(u8) -> u8,
    {
        if let Some(addr) = self.target_address(target) {
            let value = self.read_memory(addr);
            self.write_memory(addr, f(value));
        }
    }

    fn read_load_target(&mut self, src: LoadTarget) -> LoadValue {
        match src {
            LoadTarget::DirectRegByte(reg) => LoadValue::Byte(self.state.get_register(reg)),
            LoadTarget::DirectRegHalfByte(reg) => LoadValue::Byte(self.state.get_index_register_half(reg)),
            LoadTarget::DirectRegWord(regpair) => LoadValue::Word(self.state.get_register_pair(regpair)),
            LoadTarget::DirectAltRegByte(reg) => LoadValue::Byte(self.state.get_shadow_register(reg)),
            LoadTarget::IndirectRegByte(regpair) => {
                LoadValue::Byte(self.read_memory(self.state.get_register_pair(regpair)))
            },
            LoadTarget::IndirectOffsetByte(reg, offset) => {
                LoadValue::Byte(self.read_memory(self.state.index_address(reg, offset)))
            },
            LoadTarget::IndirectByte(addr) => LoadValue::Byte(self.read_memory(addr)),
            LoadTarget::IndirectRegWord(regpair) => {
                LoadValue::Word(self.read_memory_word(self.state.get_register_pair(regpair)))
            },
            LoadTarget::IndirectWord(addr) => LoadValue::Word(self.read_memory_word(addr)),
            LoadTarget::ImmediateByte(data) => LoadValue::Byte(data),
            LoadTarget::ImmediateWord(data) => LoadValue::Word(data),
        }
    }

    fn write_load_target(&mut self, dest: LoadTarget, value: LoadValue) {
        let addr = match dest {
            LoadTarget::IndirectRegByte(regpair) | LoadTarget::IndirectRegWord(regpair) => {
                self.state.get_register_pair(regpair)
            },
            LoadTarget::IndirectOffsetByte(reg, offset) => self.state.index_address(reg, offset),
            LoadTarget::IndirectByte(addr) | LoadTarget::IndirectWord(addr) => addr,
            _ => return,
        };

        match value {
            LoadValue::Byte(value) => self.write_memory(addr, value),
            LoadValue::Word(value) => {
                self.write_memory(addr, value as u8);
                self.write_memory(addr.wrapping_add(1), (value >> 8) as u8);
            },
        }
    }

    fn push_word(&mut self, value: u16) {
        let sp = self.state.sp;
        self.write_memory(sp.wrapping_sub(1), (value >> 8) as u8);
        self.write_memory(sp.wrapping_sub(2), value as u8);
    }

    fn pop_word(&mut self) {
        self.read_memory_word(self.state.sp);
    }

    fn read_memory(&mut self, addr: u16) -> u8 {
        let value = self.view.peek_u8(addr);
        self.effects.push(Effect::memory(addr, Access::Read, Some(value)));
        value
    }

    fn read_memory_word(&mut self, addr: u16) -> u16 {
        let low = self.read_memory(addr) as u16;
        let high = self.read_memory(addr.wrapping_add(1)) as u16;
        (high << 8) | low
    }

    fn write_memory(&mut self, addr: u16, value: u8) {
        self.effects.push(Effect::memory(addr, Access::Write, Some(value)));
    }
}

fn shift_value(instruction: &Instruction, value: u8, carry: bool) -> u8 {
    match instruction {
        Instruction::RLC(_, _) => value.rotate_left(1),
        Instruction::RRC(_, _) => value.rotate_right(1),
        Instruction::RL(_, _) => (value << 1) | carry as u8,
        Instruction::RR(_, _) => (value >> 1) | if carry { 0x80 } else { 0 },
        Instruction::SLA(_, _) => value << 1,
        Instruction::SRA(_, _) => (value >> 1) | (value & 0x80),
        Instruction::SLL(_, _) => (value << 1) | 0x01,
        Instruction::SRL(_, _) => value >> 1,
        _ => value,
    }
}
