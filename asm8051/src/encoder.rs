//! Operand encoding: matched instruction -> machine bytes

use tracing::warn;

use crate::addressing::OperandClass;
use crate::error::ErrorKind;
use crate::matcher::InstructionMatch;
use crate::parser::lexer::is_identifier;
use crate::parser::NumberParser;
use crate::symbol::SymbolTable;

/// Encodes one matched instruction placed at `location`.
pub struct Encoder<'a> {
    symbols: &'a SymbolTable,
    location: u32,
}

impl<'a> Encoder<'a> {
    pub fn new(symbols: &'a SymbolTable, location: u32) -> Self {
        Self { symbols, location }
    }

    /// Full instruction bytes, opcode first.
    pub fn encode(&self, m: &InstructionMatch) -> Result<Vec<u8>, ErrorKind> {
        if m.is_paged() {
            return self.encode_paged(m);
        }

        let mut bytes = vec![m.entry.opcode];
        let mut rel = None;

        if m.pattern == [OperandClass::Direct, OperandClass::Direct] {
            // MOV dest, src is stored as opcode, src, dest
            bytes.push(self.address_byte(&m.operands[1])?);
            bytes.push(self.address_byte(&m.operands[0])?);
        } else {
            for (class, token) in m.pattern.iter().zip(&m.operands) {
                match class {
                    c if c.is_implicit() => {}
                    OperandClass::Data => {
                        let value = self.immediate(token)?;
                        if !(-128..=255).contains(&value) {
                            warn!("immediate {} in '{}' truncated to 8 bits", value, m.key());
                        }
                        bytes.push(value as u8);
                    }
                    OperandClass::Data16 => {
                        let value = self.immediate(token)?;
                        if !(-32768..=65535).contains(&value) {
                            warn!("immediate {} in '{}' truncated to 16 bits", value, m.key());
                        }
                        bytes.push((value >> 8) as u8);
                        bytes.push(value as u8);
                    }
                    OperandClass::Direct | OperandClass::Bit => {
                        bytes.push(self.address_byte(token)?);
                    }
                    OperandClass::NotBit => {
                        bytes.push(self.address_byte(token.trim_start_matches('/'))?);
                    }
                    OperandClass::Addr16 => {
                        let target = self.code_address(token)?;
                        bytes.push((target >> 8) as u8);
                        bytes.push(target as u8);
                    }
                    OperandClass::Rel => rel = Some(token),
                    _ => return Err(ErrorKind::UnhandledPattern(m.key())),
                }
            }
        }

        if let Some(token) = rel {
            bytes.push(self.relative(token, m.length())?);
        }

        if bytes.len() != m.length() as usize {
            return Err(ErrorKind::UnhandledPattern(m.key()));
        }
        Ok(bytes)
    }

    /// ACALL/AJMP: bits 10..8 of the target go into the opcode.
    fn encode_paged(&self, m: &InstructionMatch) -> Result<Vec<u8>, ErrorKind> {
        let token = &m.operands[0];
        let target = self.code_address(token)?;
        let next = self.location + 2;
        if (target ^ next) & 0xF800 != 0 {
            return Err(ErrorKind::PageOutOfRange {
                mnemonic: m.mnemonic.clone(),
                target: token.clone(),
                address: target,
                location: self.location,
            });
        }
        let opcode = ((((target >> 8) & 0x07) << 5) as u8) | m.entry.opcode;
        Ok(vec![opcode, target as u8])
    }

    /// Signed offset from the end of the instruction to the target.
    fn relative(&self, token: &str, length: u8) -> Result<u8, ErrorKind> {
        let target = self.code_address(token)?;
        let offset = target as i64 - (self.location as i64 + length as i64);
        if !(-128..=127).contains(&offset) {
            return Err(ErrorKind::RelativeOutOfRange {
                target: token.to_string(),
                address: target,
                location: self.location,
                offset,
            });
        }
        Ok(offset as i8 as u8)
    }

    /// A code address: `$` for the current location, else a symbol or number.
    fn code_address(&self, token: &str) -> Result<u32, ErrorKind> {
        if token == "$" {
            return Ok(self.location);
        }
        let value = self.symbols.resolve(token)?;
        u16::try_from(value)
            .map(u32::from)
            .map_err(|_| ErrorKind::AddressOutOfRange(value.into()))
    }

    /// Direct or bit address byte.
    fn address_byte(&self, token: &str) -> Result<u8, ErrorKind> {
        let value = self.symbols.resolve(token)?;
        if !(0..=0xFF).contains(&value) {
            warn!("address {} ('{}') truncated to 8 bits", value, token);
        }
        Ok(value as u8)
    }

    /// `#value`: a symbol when one is defined under that name, else a literal.
    fn immediate(&self, token: &str) -> Result<i32, ErrorKind> {
        let value = token.trim_start_matches('#').trim();
        if is_identifier(value) {
            self.symbols.resolve(value)
        } else {
            NumberParser::parse(value)
        }
    }
}
