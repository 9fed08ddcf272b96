//! Instruction matching: mnemonic + operand classes -> opcode table entry

use tracing::trace;

use crate::addressing::{classify, pattern_key, OperandClass};
use crate::error::ErrorKind;
use crate::opcodes::{Entry, OPCODES};
use crate::parser::split_operands;

/// The result of matching one instruction line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionMatch {
    pub mnemonic: String,
    pub pattern: Vec<OperandClass>,
    pub entry: Entry,
    /// Raw operand text, trimmed, in source order.
    pub operands: Vec<String>,
}

impl InstructionMatch {
    pub fn key(&self) -> String {
        pattern_key(&self.mnemonic, &self.pattern)
    }

    pub fn length(&self) -> u8 {
        self.entry.length
    }

    pub fn is_paged(&self) -> bool {
        self.pattern == [OperandClass::Addr11]
    }
}

/// Match an instruction statement (no label, no comment).
pub fn match_instruction(text: &str) -> Result<InstructionMatch, ErrorKind> {
    let text = text.trim();
    let (mnemonic, rest) = match text.split_once(char::is_whitespace) {
        Some((m, rest)) => (m, rest.trim()),
        None => (text, ""),
    };
    let mnemonic = mnemonic.to_ascii_uppercase();
    if mnemonic.is_empty() {
        return Err(ErrorKind::Syntax("missing mnemonic".to_string()));
    }

    if rest.is_empty() {
        return OPCODES
            .lookup(&mnemonic, &[])
            .map(|entry| InstructionMatch {
                mnemonic: mnemonic.clone(),
                pattern: Vec::new(),
                entry,
                operands: Vec::new(),
            })
            .ok_or(ErrorKind::UnresolvedInstruction { key: mnemonic });
    }

    let operands = split_operands(rest);
    if let Some(pos) = operands.iter().position(|op| op.is_empty()) {
        return Err(ErrorKind::Syntax(format!("empty operand #{} in '{}'", pos + 1, text)));
    }

    let pattern: Vec<OperandClass> = (0..operands.len())
        .map(|i| classify(&mnemonic, &operands, i))
        .collect();
    let key = pattern_key(&mnemonic, &pattern);
    trace!("key built: '{}'", key);

    if let Some(entry) = OPCODES.lookup(&mnemonic, &pattern) {
        return Ok(InstructionMatch { mnemonic, pattern, entry, operands });
    }

    // `SETB TI`, `JB FLAG, x`: a plain name may be a bit address. The source
    // text alone can't tell, so retry with every direct read as a bit.
    if pattern.contains(&OperandClass::Direct) {
        let fallback: Vec<OperandClass> = pattern
            .iter()
            .map(|&c| if c == OperandClass::Direct { OperandClass::Bit } else { c })
            .collect();
        trace!("key '{}' failed, trying '{}'", key, pattern_key(&mnemonic, &fallback));
        if let Some(entry) = OPCODES.lookup(&mnemonic, &fallback) {
            return Ok(InstructionMatch { mnemonic, pattern: fallback, entry, operands });
        }
    }

    Err(ErrorKind::UnresolvedInstruction { key })
}
