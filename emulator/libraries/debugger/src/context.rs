use std::cell::OnceCell;

use zwatch_z80::{Access, CpuView, Effect, EffectPredictor, Prediction, Z80State, MAX_INSTRUCTION_BYTES};

use crate::interrupt::InterruptSource;

/// Everything a breakpoint may look at for one instruction fetch
///
/// The instruction at PC is decoded at most once, the first time a breakpoint asks for it.
pub struct StepContext<'a> {
    view: &'a dyn CpuView,
    interrupt: Option<&'a InterruptSource>,
    ops: [u8; MAX_INSTRUCTION_BYTES],
    prediction: OnceCell<Option<Prediction>>,
}

impl<'a> StepContext<'a> {
    pub fn new(view: &'a dyn CpuView, interrupt: Option<&'a InterruptSource>) -> Self {
        Self {
            view,
            interrupt,
            ops: view.prefetch(),
            prediction: OnceCell::new(),
        }
    }

    pub fn state(&self) -> &Z80State {
        self.view.state()
    }

    pub fn view(&self) -> &dyn CpuView {
        self.view
    }

    pub fn ops(&self) -> &[u8] {
        &self.ops
    }

    pub fn interrupt(&self) -> Option<&InterruptSource> {
        self.interrupt
    }

    pub fn prediction(&self) -> Option<&Prediction> {
        self.prediction
            .get_or_init(|| EffectPredictor::analyze(&self.ops, self.view))
            .as_ref()
    }

    /// The return address the CPU pushed while accepting an interrupt, if one was accepted
    ///
    /// These come from the CPU, not from the instruction, so they're never part of a prediction.
    pub fn interrupt_pushes(&self) -> Vec<Effect> {
        if self.interrupt.is_none() {
            return vec![];
        }

        let sp = self.state().sp;
        [sp, sp.wrapping_add(1)]
            .into_iter()
            .map(|addr| Effect::memory(addr, Access::Write, Some(self.view.peek_u8(addr))))
            .collect()
    }
}
