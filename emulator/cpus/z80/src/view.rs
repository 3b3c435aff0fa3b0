use crate::decode::MAX_INSTRUCTION_BYTES;
use crate::state::Z80State;

/// Read-only window onto a paused CPU, handed to breakpoints once per instruction fetch
///
/// `peek_u8` must be free of side effects: no memory-mapped device may observe it,
/// and it must never re-enter breakpoint evaluation.
pub trait CpuView {
    fn state(&self) -> &Z80State;

    fn peek_u8(&self, addr: u16) -> u8;

    fn peek_leu16(&self, addr: u16) -> u16 {
        (self.peek_u8(addr) as u16) | ((self.peek_u8(addr.wrapping_add(1)) as u16) << 8)
    }

    /// The bytes at PC..PC+3, wrapping at the top of the address space
    fn prefetch(&self) -> [u8; MAX_INSTRUCTION_BYTES] {
        let pc = self.state().pc;
        let mut ops = [0; MAX_INSTRUCTION_BYTES];
        for (i, op) in ops.iter_mut().enumerate() {
            *op = self.peek_u8(pc.wrapping_add(i as u16));
        }
        ops
    }
}

/// A full 64 KiB memory image with a register snapshot
///
/// Used by the console frontend to stage a machine state and by tests.
#[derive(Clone)]
pub struct MemorySnapshot {
    pub state: Z80State,
    memory: Box<[u8]>,
}

impl Default for MemorySnapshot {
    fn default() -> Self {
        Self {
            state: Z80State::default(),
            memory: vec![0; 0x1_0000].into_boxed_slice(),
        }
    }
}

impl MemorySnapshot {
    pub fn new(state: Z80State) -> Self {
        Self {
            state,
            ..Default::default()
        }
    }

    pub fn write_u8(&mut self, addr: u16, value: u8) {
        self.memory[addr as usize] = value;
    }

    /// Copy `data` into memory starting at `addr`, wrapping at the top of the address space
    pub fn load(&mut self, addr: u16, data: &[u8]) {
        for (i, byte) in data.iter().enumerate() {
            self.write_u8(addr.wrapping_add(i as u16), *byte);
        }
    }

    pub fn memory(&self) -> &[u8] {
        &self.memory
    }
}

impl CpuView for MemorySnapshot {
    fn state(&self) -> &Z80State {
        &self.state
    }

    fn peek_u8(&self, addr: u16) -> u8 {
        self.memory[addr as usize]
    }
}
