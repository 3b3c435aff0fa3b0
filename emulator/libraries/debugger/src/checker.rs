use femtos::Instant;

use zwatch_z80::CpuView;

use crate::breakpoint::BreakpointKind;
use crate::context::StepContext;
use crate::error::DebuggerError;
use crate::interrupt::InterruptSource;
use crate::set::ActiveList;
use crate::sink::LogSink;

/// The per-instruction breakpoint check, run by the CPU before it executes each instruction
pub struct Z80Debugger {
    pub(crate) skip_breakpoint: usize,
    active: ActiveList,
    sink: Box<dyn LogSink + Send>,
}

impl Z80Debugger {
    pub fn new(active: ActiveList, sink: Box<dyn LogSink + Send>) -> Self {
        Self {
            skip_breakpoint: 0,
            active,
            sink,
        }
    }

    /// Check the instruction at PC against every active breakpoint
    ///
    /// `accepted_interrupt` is the source of an interrupt the CPU accepted just before
    /// this fetch, if any.  Every matching breakpoint with logging enabled adds an entry
    /// to the log, in active list order.  If any of them has stopping enabled, the first
    /// one is returned as a breakpoint error, and the check that follows is skipped so
    /// the instruction can run when resumed.
    pub fn check_breakpoints(
        &mut self,
        view: &dyn CpuView,
        clock: Instant,
        accepted_interrupt: Option<&InterruptSource>,
    ) -> Result<(), DebuggerError> {
        if self.skip_breakpoint > 0 {
            self.skip_breakpoint -= 1;
            return Ok(());
        }

        let breakpoints = self.active.snapshot();
        if breakpoints.is_empty() {
            return Ok(());
        }

        let ctx = StepContext::new(view, accepted_interrupt);
        let mut stopped_at = None;
        for breakpoint in breakpoints.iter() {
            if !breakpoint.matches(&ctx) {
                continue;
            }

            if breakpoint.log_enabled {
                let nanos = clock.as_duration().as_nanos();
                let entry = match breakpoint.kind() {
                    BreakpointKind::Interrupt(bp) => {
                        format!("@ {} ns interrupt accepted: {} {}", nanos, bp.source.name, ctx.state().format_registers())
                    },
                    _ => format!("@ {} ns breakpoint {} {}", nanos, breakpoint, ctx.state().format_registers()),
                };
                self.sink.append_entry(entry);
            }

            if breakpoint.stop_enabled && stopped_at.is_none() {
                stopped_at = Some(breakpoint.text().to_string());
            }
        }

        match stopped_at {
            Some(text) => {
                self.skip_breakpoint = 1;
                Err(DebuggerError::Breakpoint(text))
            },
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breakpoint::{Breakpoint, PcBreakpoint};
    use crate::sink::MemoryLog;
    use zwatch_z80::MemorySnapshot;

    #[test]
    fn resuming_runs_the_instruction_that_stopped() {
        let active = ActiveList::default();
        active.publish(vec![Breakpoint::new(PcBreakpoint::new(0x0100).into())]);
        let mut debugger = Z80Debugger::new(active, Box::new(MemoryLog::default()));

        let mut snapshot = MemorySnapshot::default();
        snapshot.state.pc = 0x0100;
        let result = debugger.check_breakpoints(&snapshot, Instant::START, None);
        assert_eq!(result, Err(DebuggerError::Breakpoint("0100".to_string())));
        assert_eq!(debugger.check_breakpoints(&snapshot, Instant::START, None), Ok(()));
        assert!(debugger.check_breakpoints(&snapshot, Instant::START, None).is_err());
    }
}
