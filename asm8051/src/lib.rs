//! Two-pass assembler for the Intel 8051 with Intel HEX output
//! and an optional human-readable listing (feature: "listing").
//!
//! ## Features
//! - **Full instruction set**, every opcode from `0x00` to `0xFF`.
//! - **Labels** (`NAME:`, or a name in column 0 followed by a tab),
//!   forward references included.
//! - **Directives**:
//!   - `ORG addr` / `.ORG addr`: move the location counter.
//!   - `NAME EQU value`: define (or redefine) a constant.
//! - **Numbers**: `25`, `19H`, `0x19`, `11001B`, `'A'`, with optional leading `-`.
//! - **Predefined symbols**: SFRs, SFR bits (`P1.0`, `ACC.7`, `TI`, ...),
//!   `AR0`..`AR7`, and the DSM-51 monitor entry points (`WRITE_TEXT`, ...).
//! - **Intel HEX** output with a configurable record length, plus a reader.
//!
//! ## Optional Features
//! - `listing`: keeps a per-line listing in [`Assembly`] that can be printed or saved.
//!
//! ## Basic Usage
//! ```rust
//! use asm8051::Assembler8051;
//!
//! fn main() -> Result<(), asm8051::AsmError> {
//!     let mut assembler = Assembler8051::new();
//!     let src = r#"
//!         ORG 0
//!     START:  MOV A, #0x25
//!             SJMP START
//!     "#;
//!
//!     let bytes = assembler.assemble_bytes(src)?;
//!     assert_eq!(bytes, vec![0x74, 0x25, 0x80, 0xFC]);
//!     Ok(())
//! }
//! ```

mod addressing;
mod assembler;
mod config;
mod encoder;
mod error;
pub mod hex;
#[cfg(feature = "listing")]
mod listing;
mod matcher;
mod opcodes;
mod parser;
mod symbol;

// Public exports
pub use addressing::OperandClass;
pub use assembler::{Assembler8051, Assembly};
pub use config::AssemblerConfig;
pub use error::{AsmError, ErrorKind};
pub use hex::HexError;
#[cfg(feature = "listing")]
pub use listing::ListingLine;
pub use matcher::{match_instruction, InstructionMatch};
pub use opcodes::Entry;
pub use parser::NumberParser;
