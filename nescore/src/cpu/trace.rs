use std::fmt;

use tracing::trace;

/// CPU state at the start of an executed instruction, plus what it cost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuSnapshot {
    pub pc: u16,
    pub opcodes: String,
    pub instruction: String,
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub p: u8,
    pub sp: u8,
    /// cumulative cycle count before the instruction ran
    pub cycles: u64,
    pub cost: u32,
}

// nestest log layout
impl fmt::Display for CpuSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04X}  {:<8}  {:<31} A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X} CYC:{}",
            self.pc, self.opcodes, self.instruction, self.a, self.x, self.y, self.p, self.sp, self.cycles
        )
    }
}

/// Called after each instruction. Observers only watch; they cannot alter timing.
pub trait CpuObserver {
    fn on_instruction(&mut self, snapshot: &CpuSnapshot);
}

/// Emits every instruction as a trace-level event
#[derive(Debug, Default)]
pub struct TracingObserver;

impl CpuObserver for TracingObserver {
    fn on_instruction(&mut self, snapshot: &CpuSnapshot) {
        trace!(target: "nescore::cpu", "{}", snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_line_matches_nestest_columns() {
        let snapshot = CpuSnapshot {
            pc: 0xC000,
            opcodes: "4C F5 C5".to_string(),
            instruction: "JMP $C5F5".to_string(),
            a: 0x00,
            x: 0x00,
            y: 0x00,
            p: 0x24,
            sp: 0xFD,
            cycles: 7,
            cost: 3,
        };

        assert_eq!(
            snapshot.to_string(),
            "C000  4C F5 C5  JMP $C5F5                       A:00 X:00 Y:00 P:24 SP:FD CYC:7"
        );
    }
}
