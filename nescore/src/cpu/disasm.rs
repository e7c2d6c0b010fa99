use std::collections::BTreeMap;

use crate::bus::SystemBus;
use super::opcode::{AddrMode, OPCODES};

/// One decoded instruction, split into the columns a debugger view shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstructionStrings {
    pub address: String,
    pub opcodes: String,
    pub instruction: String,
    pub mode: String,
}

/// Decodes the instruction at `addr` using side-effect free reads.
/// Returns the strings and the instruction's length in bytes.
pub fn decode(bus: &mut SystemBus, addr: u16) -> (InstructionStrings, u16) {
    let op = &OPCODES[peek(bus, addr) as usize];
    let len = op.addr_mode.instruction_len();

    let bytes: Vec<u8> = (0..len).map(|i| peek(bus, addr.wrapping_add(i))).collect();
    let lo = bytes.get(1).copied().unwrap_or_default();
    let hi = bytes.get(2).copied().unwrap_or_default();
    let word = u16::from_le_bytes([lo, hi]);

    let operand = match op.addr_mode {
        AddrMode::IMP | AddrMode::ACC => String::new(),
        AddrMode::IMM => format!(" #${:02X}", lo),
        AddrMode::ZPG => format!(" ${:02X}", lo),
        AddrMode::ZPX => format!(" ${:02X},X", lo),
        AddrMode::ZPY => format!(" ${:02X},Y", lo),
        AddrMode::REL => {
            let target = addr.wrapping_add(len).wrapping_add(lo as i8 as u16);
            format!(" ${:04X}", target)
        }
        AddrMode::ABS => format!(" ${:04X}", word),
        AddrMode::ABX => format!(" ${:04X},X", word),
        AddrMode::ABY => format!(" ${:04X},Y", word),
        AddrMode::IND => format!(" (${:04X})", word),
        AddrMode::INX => format!(" (${:02X},X)", lo),
        AddrMode::INY => format!(" (${:02X}),Y", lo),
    };

    let strings = InstructionStrings {
        address: format!("{:04X}", addr),
        opcodes: bytes.iter().map(|b| format!("{:02X}", b)).collect::<Vec<_>>().join(" "),
        instruction: format!("{}{}", op.instr, operand),
        mode: format!("{:?}", op.addr_mode),
    };

    (strings, len)
}

/// Decodes every instruction starting in `start..=end`, keyed by address.
pub fn disassemble(bus: &mut SystemBus, start: u16, end: u16) -> BTreeMap<u16, InstructionStrings> {
    let mut lines = BTreeMap::new();
    let mut addr = start as u32;

    while addr <= end as u32 {
        let (strings, len) = decode(bus, addr as u16);
        lines.insert(addr as u16, strings);
        addr += len as u32;
    }

    lines
}

#[inline]
fn peek(bus: &mut SystemBus, addr: u16) -> u8 {
    bus.cpu_read(addr as usize, true)
}
