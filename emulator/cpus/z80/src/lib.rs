mod decode;
mod instructions;
mod predict;
mod state;
mod view;

pub use crate::state::{Z80State, Flags};
pub use crate::decode::{Z80Decoder, DecodeError, MAX_INSTRUCTION_BYTES, decode_instruction};
pub use crate::predict::{EffectPredictor, Effect, EffectKind, Access, Prediction};
pub use crate::view::{CpuView, MemorySnapshot};
pub use crate::instructions::{
    Direction, Condition, Register, RegisterPair, IndexRegister, IndexRegisterHalf, SpecialRegister, InterruptMode, Target,
    LoadTarget, UndocumentedCopy, Instruction,
};
