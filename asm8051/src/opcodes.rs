//! 8051 opcode table
//!
//! Keyed by mnemonic, then by operand pattern. Covers the documented
//! instruction set plus the unused opcode 0xA5 under the mnemonic `???`.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::addressing::OperandClass::{self, *};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    pub opcode: u8,
    /// Total instruction length in bytes, opcode included.
    pub length: u8,
}

pub struct OpcodeTable {
    /// mnemonic -> operand pattern -> entry
    patterns: HashMap<&'static str, HashMap<Vec<OperandClass>, Entry>>,
}

/// Built on first use, shared read-only by every assembler.
pub static OPCODES: LazyLock<OpcodeTable> = LazyLock::new(OpcodeTable::build);

impl OpcodeTable {
    pub fn lookup(&self, mnemonic: &str, pattern: &[OperandClass]) -> Option<Entry> {
        self.patterns.get(mnemonic).and_then(|m| m.get(pattern)).copied()
    }

    pub fn has_mnemonic(&self, mnemonic: &str) -> bool {
        self.patterns.contains_key(mnemonic)
    }

    fn add(&mut self, mnemonic: &'static str, pattern: &[OperandClass], opcode: u8, length: u8) {
        self.patterns
            .entry(mnemonic)
            .or_default()
            .insert(pattern.to_vec(), Entry { opcode, length });
    }

    /// One entry per register R0..R7, opcodes `base..base+7`.
    fn add_rn(
        &mut self,
        mnemonic: &'static str,
        pattern: impl Fn(OperandClass) -> Vec<OperandClass>,
        base: u8,
        length: u8,
    ) {
        for n in 0..8u8 {
            self.add(mnemonic, &pattern(Reg(n)), base + n, length);
        }
    }

    /// One entry per indirect register @R0, @R1, opcodes `base`, `base+1`.
    fn add_ri(
        &mut self,
        mnemonic: &'static str,
        pattern: impl Fn(OperandClass) -> Vec<OperandClass>,
        base: u8,
        length: u8,
    ) {
        for i in 0..2u8 {
            self.add(mnemonic, &pattern(AtReg(i)), base + i, length);
        }
    }

    /// ADD/ADDC/SUBB/ANL/ORL/XRL share the accumulator column layout:
    /// `#data` at base+4, `direct` at base+5, `@Ri` at base+6, `Rn` at base+8.
    fn add_arith(&mut self, mnemonic: &'static str, base: u8) {
        self.add(mnemonic, &[A, Data], base + 4, 2);
        self.add(mnemonic, &[A, Direct], base + 5, 2);
        self.add_ri(mnemonic, |r| vec![A, r], base + 6, 1);
        self.add_rn(mnemonic, |r| vec![A, r], base + 8, 1);
    }

    fn build() -> Self {
        let mut t = Self { patterns: HashMap::new() };

        t.add("ACALL", &[Addr11], 0x11, 2);
        t.add("AJMP", &[Addr11], 0x01, 2);
        t.add("LCALL", &[Addr16], 0x12, 3);
        t.add("LJMP", &[Addr16], 0x02, 3);

        t.add_arith("ADD", 0x20);
        t.add_arith("ADDC", 0x30);
        t.add_arith("SUBB", 0x90);

        for (mnemonic, base) in [("ORL", 0x40u8), ("ANL", 0x50), ("XRL", 0x60)] {
            t.add(mnemonic, &[Direct, A], base + 2, 2);
            t.add(mnemonic, &[Direct, Data], base + 3, 3);
            t.add_arith(mnemonic, base);
        }
        t.add("ORL", &[C, Bit], 0x72, 2);
        t.add("ORL", &[C, NotBit], 0xA0, 2);
        t.add("ANL", &[C, Bit], 0x82, 2);
        t.add("ANL", &[C, NotBit], 0xB0, 2);

        t.add("CJNE", &[A, Data, Rel], 0xB4, 3);
        t.add("CJNE", &[A, Direct, Rel], 0xB5, 3);
        t.add_ri("CJNE", |r| vec![r, Data, Rel], 0xB6, 3);
        t.add_rn("CJNE", |r| vec![r, Data, Rel], 0xB8, 3);

        t.add("CLR", &[Bit], 0xC2, 2);
        t.add("CLR", &[C], 0xC3, 1);
        t.add("CLR", &[A], 0xE4, 1);
        t.add("CPL", &[A], 0xF4, 1);
        t.add("CPL", &[C], 0xB3, 1);
        t.add("CPL", &[Bit], 0xB2, 2);
        t.add("SETB", &[C], 0xD3, 1);
        t.add("SETB", &[Bit], 0xD2, 2);

        t.add("DA", &[A], 0xD4, 1);
        t.add("DIV", &[AB], 0x84, 1);
        t.add("MUL", &[AB], 0xA4, 1);

        t.add("INC", &[A], 0x04, 1);
        t.add("INC", &[Direct], 0x05, 2);
        t.add_ri("INC", |r| vec![r], 0x06, 1);
        t.add_rn("INC", |r| vec![r], 0x08, 1);
        t.add("INC", &[Dptr], 0xA3, 1);
        t.add("DEC", &[A], 0x14, 1);
        t.add("DEC", &[Direct], 0x15, 2);
        t.add_ri("DEC", |r| vec![r], 0x16, 1);
        t.add_rn("DEC", |r| vec![r], 0x18, 1);

        t.add("DJNZ", &[Direct, Rel], 0xD5, 3);
        t.add_rn("DJNZ", |r| vec![r, Rel], 0xD8, 2);

        t.add("JBC", &[Bit, Rel], 0x10, 3);
        t.add("JB", &[Bit, Rel], 0x20, 3);
        t.add("JNB", &[Bit, Rel], 0x30, 3);
        t.add("JC", &[Rel], 0x40, 2);
        t.add("JNC", &[Rel], 0x50, 2);
        t.add("JZ", &[Rel], 0x60, 2);
        t.add("JNZ", &[Rel], 0x70, 2);
        t.add("JMP", &[AtAPlusDptr], 0x73, 1);
        t.add("SJMP", &[Rel], 0x80, 2);

        // MOV
        t.add_ri("MOV", |r| vec![r, Data], 0x76, 2);
        t.add_ri("MOV", |r| vec![r, A], 0xF6, 1);
        t.add_ri("MOV", |r| vec![r, Direct], 0xA6, 2);
        t.add("MOV", &[A, Data], 0x74, 2);
        t.add_ri("MOV", |r| vec![A, r], 0xE6, 1);
        t.add_rn("MOV", |r| vec![A, r], 0xE8, 1);
        t.add("MOV", &[A, Direct], 0xE5, 2);
        t.add("MOV", &[C, Bit], 0xA2, 2);
        t.add("MOV", &[Dptr, Data16], 0x90, 3);
        t.add_rn("MOV", |r| vec![r, Data], 0x78, 2);
        t.add_rn("MOV", |r| vec![r, A], 0xF8, 1);
        t.add_rn("MOV", |r| vec![r, Direct], 0xA8, 2);
        t.add("MOV", &[Bit, C], 0x92, 2);
        t.add("MOV", &[Direct, Data], 0x75, 3);
        t.add_ri("MOV", |r| vec![Direct, r], 0x86, 2);
        t.add_rn("MOV", |r| vec![Direct, r], 0x88, 2);
        t.add("MOV", &[Direct, A], 0xF5, 2);
        // Operand bytes are stored source-second first, see encoder
        t.add("MOV", &[Direct, Direct], 0x85, 3);

        t.add("MOVC", &[A, AtAPlusDptr], 0x93, 1);
        t.add("MOVC", &[A, AtAPlusPc], 0x83, 1);

        t.add("MOVX", &[AtDptr, A], 0xF0, 1);
        t.add_ri("MOVX", |r| vec![r, A], 0xF2, 1);
        t.add("MOVX", &[A, AtDptr], 0xE0, 1);
        t.add_ri("MOVX", |r| vec![A, r], 0xE2, 1);

        t.add("NOP", &[], 0x00, 1);
        t.add("POP", &[Direct], 0xD0, 2);
        t.add("PUSH", &[Direct], 0xC0, 2);
        t.add("RET", &[], 0x22, 1);
        t.add("RETI", &[], 0x32, 1);
        t.add("RL", &[A], 0x23, 1);
        t.add("RLC", &[A], 0x33, 1);
        t.add("RR", &[A], 0x03, 1);
        t.add("RRC", &[A], 0x13, 1);
        t.add("SWAP", &[A], 0xC4, 1);

        // The one opcode no documented instruction uses
        t.add("???", &[], 0xA5, 1);

        t.add_ri("XCH", |r| vec![A, r], 0xC6, 1);
        t.add_rn("XCH", |r| vec![A, r], 0xC8, 1);
        t.add("XCH", &[A, Direct], 0xC5, 2);
        t.add_ri("XCHD", |r| vec![A, r], 0xD6, 1);

        t
    }
}

#[cfg(test)]
impl OpcodeTable {
    /// Number of distinct encodings.
    fn len(&self) -> usize {
        self.patterns.values().map(HashMap::len).sum()
    }

    /// Every (mnemonic, pattern, entry) triple.
    fn iter(&self) -> impl Iterator<Item = (&'static str, &[OperandClass], Entry)> + '_ {
        self.patterns
            .iter()
            .flat_map(|(m, pats)| pats.iter().map(move |(p, e)| (*m, p.as_slice(), *e)))
    }
}
