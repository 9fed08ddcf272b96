//! Addressing mode classes and operand classification

use std::fmt;

/// The addressing-mode class an operand normalizes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandClass {
    A,
    C,
    AB,
    Dptr,
    AtDptr,
    AtAPlusDptr,
    AtAPlusPc,
    /// `R0`..`R7`
    Reg(u8),
    /// `@R0`, `@R1`
    AtReg(u8),
    Data,
    Data16,
    NotBit,
    Bit,
    Rel,
    Addr16,
    Addr11,
    Direct,
}

impl OperandClass {
    /// Classes fully encoded by the opcode itself.
    pub fn is_implicit(self) -> bool {
        matches!(
            self,
            OperandClass::A
                | OperandClass::C
                | OperandClass::AB
                | OperandClass::Dptr
                | OperandClass::AtDptr
                | OperandClass::AtAPlusDptr
                | OperandClass::AtAPlusPc
                | OperandClass::Reg(_)
                | OperandClass::AtReg(_)
        )
    }
}

impl fmt::Display for OperandClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperandClass::A => f.write_str("A"),
            OperandClass::C => f.write_str("C"),
            OperandClass::AB => f.write_str("AB"),
            OperandClass::Dptr => f.write_str("DPTR"),
            OperandClass::AtDptr => f.write_str("@DPTR"),
            OperandClass::AtAPlusDptr => f.write_str("@A+DPTR"),
            OperandClass::AtAPlusPc => f.write_str("@A+PC"),
            OperandClass::Reg(n) => write!(f, "R{}", n),
            OperandClass::AtReg(n) => write!(f, "@R{}", n),
            OperandClass::Data => f.write_str("#data"),
            OperandClass::Data16 => f.write_str("#data16"),
            OperandClass::NotBit => f.write_str("/bit"),
            OperandClass::Bit => f.write_str("bit"),
            OperandClass::Rel => f.write_str("rel"),
            OperandClass::Addr16 => f.write_str("addr16"),
            OperandClass::Addr11 => f.write_str("addr11"),
            OperandClass::Direct => f.write_str("direct"),
        }
    }
}

/// Canonical `MNEMONIC class, class` key text, used in messages and logs.
pub fn pattern_key(mnemonic: &str, pattern: &[OperandClass]) -> String {
    if pattern.is_empty() {
        return mnemonic.to_string();
    }
    let classes: Vec<String> = pattern.iter().map(|c| c.to_string()).collect();
    format!("{} {}", mnemonic, classes.join(", "))
}

fn register_literal(upper: &str) -> Option<OperandClass> {
    let class = match upper {
        "A" => OperandClass::A,
        "C" => OperandClass::C,
        "AB" => OperandClass::AB,
        "DPTR" => OperandClass::Dptr,
        "@DPTR" => OperandClass::AtDptr,
        "@A+DPTR" => OperandClass::AtAPlusDptr,
        "@A+PC" => OperandClass::AtAPlusPc,
        "@R0" => OperandClass::AtReg(0),
        "@R1" => OperandClass::AtReg(1),
        _ => {
            let n = upper.strip_prefix('R')?;
            match n.as_bytes() {
                [d @ b'0'..=b'7'] => OperandClass::Reg(d - b'0'),
                _ => return None,
            }
        }
    };
    Some(class)
}

/// Mnemonics whose last operand is a relative branch target.
pub fn is_relative_branch(mnemonic: &str) -> bool {
    mnemonic.starts_with('J') || matches!(mnemonic, "DJNZ" | "CJNE" | "SJMP")
}

/// Classify one operand. `operands` is the full operand list of the line,
/// `index` the position of the operand being classified.
pub fn classify(mnemonic: &str, operands: &[String], index: usize) -> OperandClass {
    let op = operands[index].as_str();
    let upper = op.to_ascii_uppercase();

    if let Some(class) = register_literal(&upper) {
        return class;
    }

    if op.starts_with('#') {
        let destination_is_dptr = index > 0
            && operands[0].to_ascii_uppercase().contains("DPTR");
        return if mnemonic == "MOV" && destination_is_dptr {
            OperandClass::Data16
        } else {
            OperandClass::Data
        };
    }

    if op.starts_with('/') {
        return OperandClass::NotBit;
    }
    if op.contains('.') {
        return OperandClass::Bit;
    }

    let is_last = index + 1 == operands.len();
    if is_relative_branch(mnemonic) && is_last {
        return OperandClass::Rel;
    }

    match mnemonic {
        "LCALL" | "LJMP" => OperandClass::Addr16,
        "ACALL" | "AJMP" => OperandClass::Addr11,
        _ => OperandClass::Direct,
    }
}
