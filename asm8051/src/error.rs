//! Error types for the assembler

use thiserror::Error;

/// What went wrong, independent of where it happened.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("duplicate label '{0}'")]
    DuplicateLabel(String),

    #[error("undefined symbol or invalid number '{0}'")]
    UndefinedSymbol(String),

    #[error("unknown instruction: key '{key}' (and fallbacks) not found in opcode table")]
    UnresolvedInstruction { key: String },

    #[error(
        "relative jump target '{target}' at 0x{address:04X} is out of range from 0x{location:04X}, offset is {offset}"
    )]
    RelativeOutOfRange {
        target: String,
        address: u32,
        location: u32,
        offset: i64,
    },

    #[error("{mnemonic} target '{target}' at 0x{address:04X} is out of 2K range from 0x{location:04X}")]
    PageOutOfRange {
        mnemonic: String,
        target: String,
        address: u32,
        location: u32,
    },

    #[error("address {0} is outside the 64K code space (0..=65535)")]
    AddressOutOfRange(i64),

    #[error("unhandled operand pattern '{0}'")]
    UnhandledPattern(String),

    #[error("phase error: pass 1 ended at 0x{pass1:04X}, pass 2 ended at 0x{pass2:04X}")]
    Phase { pass1: u32, pass2: u32 },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ErrorKind {
    /// True for the errors that report a value outside an encodable range.
    pub fn is_range(&self) -> bool {
        matches!(
            self,
            ErrorKind::RelativeOutOfRange { .. }
                | ErrorKind::PageOutOfRange { .. }
                | ErrorKind::AddressOutOfRange(_)
        )
    }
}

#[derive(Debug, Error)]
pub enum AsmError {
    /// An error tied to one source line. `line` is 1-based.
    #[error("line {line}: '{text}': {kind}")]
    Line {
        line: usize,
        text: String,
        #[source]
        kind: ErrorKind,
    },

    /// An error not tied to a line (configuration, pass bookkeeping).
    #[error("Assembly error: {0}")]
    Asm(#[from] ErrorKind),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AsmError {
    pub fn at_line(line: usize, text: impl Into<String>, kind: ErrorKind) -> Self {
        AsmError::Line { line, text: text.into(), kind }
    }

    /// The underlying error kind, if this is not an I/O failure.
    pub fn kind(&self) -> Option<&ErrorKind> {
        match self {
            AsmError::Line { kind, .. } | AsmError::Asm(kind) => Some(kind),
            AsmError::Io(_) => None,
        }
    }

    pub fn line(&self) -> Option<usize> {
        match self {
            AsmError::Line { line, .. } => Some(*line),
            _ => None,
        }
    }
}
