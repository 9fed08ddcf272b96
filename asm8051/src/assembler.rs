//! Main assembler implementation

use std::collections::{BTreeMap, HashMap};
use std::io::{self, Write};

#[cfg(feature = "listing")]
use std::fs::File;

use tracing::{debug, trace, warn};

use crate::config::AssemblerConfig;
use crate::encoder::Encoder;
use crate::error::{AsmError, ErrorKind};
use crate::hex;
use crate::matcher::match_instruction;
use crate::parser::{parse_line, Line, Statement};
use crate::symbol::{Redefine, SymbolTable};

#[cfg(feature = "listing")]
use crate::listing::ListingLine;

/// Size of the 8051 code space.
const CODE_SPACE: u32 = 0x1_0000;

pub struct Assembler8051 {
    config: AssemblerConfig,
    symbols: SymbolTable,
}

/// The result of one successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembly {
    /// Bytes in emission order, as a flat stream.
    pub bytes: Vec<u8>,
    /// Address -> byte. Gaps left by ORG are absent.
    pub output: BTreeMap<u16, u8>,
    /// Every symbol known at the end of pass 2, names upper-case.
    pub symbols: HashMap<String, u16>,
    #[cfg(feature = "listing")]
    pub listing: Vec<ListingLine>,
    record_len: usize,
}

impl Default for Assembler8051 {
    fn default() -> Self {
        Self::new()
    }
}

impl Assembler8051 {
    pub fn new() -> Self {
        let config = AssemblerConfig::default();
        Self {
            symbols: SymbolTable::with_architecture(config.monitor_symbols),
            config,
        }
    }

    pub fn with_config(config: AssemblerConfig) -> Result<Self, AsmError> {
        config.validate()?;
        Ok(Self {
            symbols: SymbolTable::with_architecture(config.monitor_symbols),
            config,
        })
    }

    // ===== Public API =====

    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    /// Assemble `src`. Each call starts from a freshly seeded symbol table.
    pub fn assemble(&mut self, src: &str) -> Result<Assembly, AsmError> {
        self.reset();

        debug!("pass 1: binding labels");
        let pass1_end = self.pass_one(src)?;
        debug!("pass 1 done, LC = 0x{:04X}, {} symbols", pass1_end, self.symbols.len());

        debug!("pass 2: emitting code");
        let (pass2_end, assembly) = self.pass_two(src)?;
        if pass1_end != pass2_end {
            return Err(ErrorKind::Phase { pass1: pass1_end, pass2: pass2_end }.into());
        }

        debug!(
            "assembled {} bytes at {} addresses",
            assembly.bytes.len(),
            assembly.output.len()
        );
        Ok(assembly)
    }

    pub fn assemble_bytes(&mut self, src: &str) -> Result<Vec<u8>, AsmError> {
        Ok(self.assemble(src)?.bytes)
    }

    pub fn assemble_hex(&mut self, src: &str) -> Result<String, AsmError> {
        Ok(self.assemble(src)?.intel_hex())
    }

    /// Symbols from the last run (the architecture seed before any run).
    pub fn symbols(&self) -> &HashMap<String, u16> {
        self.symbols.symbols()
    }

    pub fn lookup(&self, name: &str) -> Option<u16> {
        self.symbols.get(name)
    }

    pub fn reset(&mut self) {
        self.symbols.clear();
        self.symbols.prepopulate(self.config.monitor_symbols);
    }

    // ===== Passes =====

    /// Bind labels and EQU constants, size every instruction.
    /// Returns the final location counter.
    fn pass_one(&mut self, src: &str) -> Result<u32, AsmError> {
        let mut lc: u32 = 0;

        for (idx, raw) in src.lines().enumerate() {
            let number = idx + 1;
            let at = |kind: ErrorKind| AsmError::at_line(number, raw.trim(), kind);

            let Some(Line { label, statement }) = parse_line(raw).map_err(at)? else {
                continue;
            };

            if let Some(label) = label {
                let address = label_address(lc).map_err(at)?;
                self.symbols.define(&label, address, Redefine::Reject).map_err(at)?;
                trace!("line {}: label {} = 0x{:04X}", number, label, address);
            }

            match statement {
                None => {}
                Some(Statement::Org(value)) => lc = self.origin(&value).map_err(at)?,
                Some(Statement::Equ { name, value }) => self.equate(&name, &value).map_err(at)?,
                Some(Statement::Instruction(text)) => {
                    let m = match_instruction(&text).map_err(at)?;
                    let next = advance(lc, m.length()).map_err(at)?;
                    trace!("line {}: {} LC 0x{:04X} -> 0x{:04X}", number, m.key(), lc, next);
                    lc = next;
                }
            }
        }

        Ok(lc)
    }

    /// Re-match every line and write its bytes into the output map.
    fn pass_two(&mut self, src: &str) -> Result<(u32, Assembly), AsmError> {
        let mut lc: u32 = 0;
        let mut bytes = Vec::new();
        let mut output = BTreeMap::new();
        #[cfg(feature = "listing")]
        let mut listing = Vec::new();

        for (idx, raw) in src.lines().enumerate() {
            let number = idx + 1;
            let at = |kind: ErrorKind| AsmError::at_line(number, raw.trim(), kind);

            let Some(Line { statement, .. }) = parse_line(raw).map_err(at)? else {
                continue;
            };
            #[cfg(feature = "listing")]
            let start = lc;

            let emitted = match statement {
                None => Vec::new(),
                Some(Statement::Org(value)) => {
                    lc = self.origin(&value).map_err(at)?;
                    Vec::new()
                }
                Some(Statement::Equ { name, value }) => {
                    self.equate(&name, &value).map_err(at)?;
                    Vec::new()
                }
                Some(Statement::Instruction(text)) => {
                    let m = match_instruction(&text).map_err(at)?;
                    let next = advance(lc, m.length()).map_err(at)?;
                    let encoded = Encoder::new(&self.symbols, lc).encode(&m).map_err(at)?;
                    trace!("line {}: 0x{:04X} {} -> {:02X?}", number, lc, m.key(), encoded);

                    for (i, &b) in encoded.iter().enumerate() {
                        let address = (lc + i as u32) as u16;
                        if let Some(old) = output.insert(address, b) {
                            warn!(
                                "line {}: 0x{:04X} overwritten ({:02X} -> {:02X})",
                                number, address, old, b
                            );
                        }
                    }
                    lc = next;
                    encoded
                }
            };
            bytes.extend_from_slice(&emitted);

            #[cfg(feature = "listing")]
            listing.push(ListingLine {
                line: number,
                address: start as u16,
                bytes: emitted,
                source: raw.trim_end().to_string(),
            });
        }

        let assembly = Assembly {
            bytes,
            output,
            symbols: self.symbols.symbols().clone(),
            #[cfg(feature = "listing")]
            listing,
            record_len: self.config.hex_record_len,
        };
        Ok((lc, assembly))
    }

    fn origin(&self, value: &str) -> Result<u32, ErrorKind> {
        let address = self.symbols.resolve(value)?;
        u16::try_from(address)
            .map(u32::from)
            .map_err(|_| ErrorKind::AddressOutOfRange(address.into()))
    }

    fn equate(&mut self, name: &str, value: &str) -> Result<(), ErrorKind> {
        let resolved = self.symbols.resolve(value)?;
        let value = u16::try_from(resolved).map_err(|_| {
            ErrorKind::Syntax(format!("EQU value {} for '{}' is outside 0..=0FFFFH", resolved, name))
        })?;
        self.symbols.define(name, value, Redefine::Overwrite)
    }
}

fn label_address(lc: u32) -> Result<u16, ErrorKind> {
    u16::try_from(lc).map_err(|_| ErrorKind::AddressOutOfRange(lc.into()))
}

/// Location counter after an instruction of `length` bytes at `lc`.
fn advance(lc: u32, length: u8) -> Result<u32, ErrorKind> {
    let next = lc + u32::from(length);
    if next > CODE_SPACE {
        return Err(ErrorKind::AddressOutOfRange(i64::from(next - 1)));
    }
    Ok(next)
}

impl Assembly {
    pub fn byte_count(&self) -> usize {
        self.bytes.len()
    }

    /// The byte stream as one upper-case hex string, `"7425..."`.
    pub fn hex_bytes(&self) -> String {
        self.bytes.iter().map(|b| format!("{:02X}", b)).collect()
    }

    pub fn intel_hex_records(&self) -> Vec<String> {
        hex::records(&self.output, self.record_len)
    }

    pub fn intel_hex(&self) -> String {
        hex::to_intel_hex(&self.output, self.record_len)
    }

    pub fn symbol(&self, name: &str) -> Option<u16> {
        self.symbols.get(&name.to_ascii_uppercase()).copied()
    }

    pub fn write_bin<W: Write>(&self, mut w: W) -> io::Result<()> {
        w.write_all(&self.bytes)
    }

    pub fn write_hex<W: Write>(&self, w: W) -> io::Result<()> {
        hex::write_intel_hex(&self.output, self.record_len, w)
    }

    // ===== Listing (feature-gated) =====

    #[cfg(feature = "listing")]
    pub fn print_listing(&self) {
        print!("{}", crate::listing::render(&self.listing));
    }

    #[cfg(feature = "listing")]
    pub fn save_listing(&self, filename: &str) -> io::Result<()> {
        let mut f = File::create(filename)?;
        f.write_all(crate::listing::render(&self.listing).as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assemble(src: &str) -> Result<Assembly, AsmError> {
        Assembler8051::new().assemble(src)
    }

    #[test]
    fn labels_bind_to_location_counter() {
        let a = assemble("START: MOV A,#1\nLOOP: ADD A,R0\n DJNZ R1, LOOP\n SJMP START").unwrap();
        assert_eq!(a.symbol("START"), Some(0x0000));
        assert_eq!(a.symbol("loop"), Some(0x0002));
        assert_eq!(a.bytes, vec![0x74, 0x01, 0x28, 0xD9, 0xFD, 0x80, 0xF9]);
    }

    #[test]
    fn forward_references_resolve() {
        let a = assemble("  LJMP MAIN\n  ORG 30H\nMAIN: SJMP MAIN").unwrap();
        assert_eq!(a.bytes, vec![0x02, 0x00, 0x30, 0x80, 0xFE]);
        assert_eq!(a.output.get(&0x0030), Some(&0x80));
        assert!(!a.output.contains_key(&0x0003));
    }

    #[test]
    fn equ_defines_constants() {
        let a = assemble("COUNT EQU 10\nLED EQU P1.0\n MOV R2, #COUNT\n CPL LED").unwrap();
        assert_eq!(a.bytes, vec![0x7A, 0x0A, 0xB2, 0x90]);
        assert_eq!(a.symbol("COUNT"), Some(10));
    }

    #[test]
    fn equ_redefinition_is_sequential() {
        let a = assemble("X EQU 1\n MOV A,#X\nX EQU 2\n MOV A,#X").unwrap();
        assert_eq!(a.bytes, vec![0x74, 0x01, 0x74, 0x02]);
    }

    #[test]
    fn equ_out_of_range() {
        let err = assemble("BIG EQU 10000H").unwrap_err();
        assert!(matches!(err.kind(), Some(ErrorKind::Syntax(_))));
        assert_eq!(err.line(), Some(1));
    }

    #[test]
    fn duplicate_label_reports_second_line() {
        let err = assemble("FOO: NOP\nFOO: NOP").unwrap_err();
        assert_eq!(err.line(), Some(2));
        assert_eq!(err.kind(), Some(&ErrorKind::DuplicateLabel("FOO".to_string())));
    }

    #[test]
    fn label_may_not_shadow_an_sfr() {
        let err = assemble("ACC: NOP").unwrap_err();
        assert_eq!(err.kind(), Some(&ErrorKind::DuplicateLabel("ACC".to_string())));
    }

    #[test]
    fn org_out_of_range() {
        let err = assemble(" ORG 10000H").unwrap_err();
        assert_eq!(err.kind(), Some(&ErrorKind::AddressOutOfRange(0x10000)));
    }

    #[test]
    fn instruction_past_top_of_memory() {
        assert!(assemble(" ORG 0FFFFH\n NOP").is_ok());
        let err = assemble(" ORG 0FFFFH\n LJMP 0").unwrap_err();
        assert_eq!(err.line(), Some(2));
        assert!(err.kind().is_some_and(ErrorKind::is_range));
    }

    #[test]
    fn negative_org_is_reported_as_written() {
        let err = assemble(" ORG -1").unwrap_err();
        assert_eq!(err.kind(), Some(&ErrorKind::AddressOutOfRange(-1)));
        assert!(err.to_string().contains("address -1 "));
    }

    #[test]
    fn both_passes_reject_bad_lines_alike() {
        let sources = [
            "NOP\n MOV A, A",
            "NOP\nMOV A,",
            " ORG",
            "1ABC: NOP",
            "COUNT EQU 70000",
            " ORG 10000H",
            " ORG 0FFFFH\n LJMP 0",
        ];
        for src in sources {
            let mut asm = Assembler8051::new();
            let first = asm.pass_one(src).unwrap_err();
            asm.reset();
            let second = asm.pass_two(src).map(|_| ()).unwrap_err();
            assert_eq!(first.kind(), second.kind(), "{:?}", src);
            assert_eq!(first.line(), second.line(), "{:?}", src);
        }
    }

    #[test]
    fn both_passes_end_at_the_same_location() {
        let src = " ORG 100H\nSTART: MOV DPTR, #TABLE\n ACALL START\n ORG 200H\nTABLE: SJMP $\n JB P1.0, TABLE";
        let mut asm = Assembler8051::new();
        let pass1_end = asm.pass_one(src).unwrap();
        let (pass2_end, assembly) = asm.pass_two(src).unwrap();
        assert_eq!(pass1_end, 0x0205);
        assert_eq!(pass2_end, pass1_end);
        assert_eq!(assembly.output.keys().next_back(), Some(&0x0204));
    }

    #[test]
    fn phase_error_is_not_tied_to_a_line() {
        let err: AsmError = ErrorKind::Phase { pass1: 0x0010, pass2: 0x0012 }.into();
        assert_eq!(err.line(), None);
        assert!(!err.kind().is_some_and(ErrorKind::is_range));
        let msg = err.to_string();
        assert!(msg.contains("0x0010"));
        assert!(msg.contains("0x0012"));
    }

    #[test]
    fn overlapping_org_keeps_later_bytes() {
        let a = assemble(" MOV A,#1\n ORG 0\n NOP").unwrap();
        assert_eq!(a.output.get(&0x0000), Some(&0x00));
        assert_eq!(a.output.get(&0x0001), Some(&0x01));
        assert_eq!(a.bytes, vec![0x74, 0x01, 0x00]);
    }

    #[test]
    fn errors_carry_line_and_text() {
        let err = assemble("NOP\n\n  MOV A, A ; bad").unwrap_err();
        assert_eq!(err.line(), Some(3));
        let msg = err.to_string();
        assert!(msg.contains("line 3"));
        assert!(msg.contains("MOV A, A ; bad"));
        assert!(msg.contains("MOV A, A"));
    }

    #[test]
    fn monitor_symbols_follow_config() {
        let src = " LCALL WRITE_TEXT";
        assert_eq!(assemble(src).unwrap().bytes, vec![0x12, 0x81, 0x00]);

        let config = AssemblerConfig::new().monitor_symbols(false);
        let err = Assembler8051::with_config(config).unwrap().assemble(src).unwrap_err();
        assert_eq!(err.kind(), Some(&ErrorKind::UndefinedSymbol("WRITE_TEXT".to_string())));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = AssemblerConfig::new().hex_record_len(0);
        assert!(matches!(
            Assembler8051::with_config(config),
            Err(AsmError::Asm(ErrorKind::Config(_)))
        ));
    }

    #[test]
    fn runs_do_not_leak_symbols() {
        let mut asm = Assembler8051::new();
        asm.assemble("FOO: NOP").unwrap();
        assert_eq!(asm.lookup("FOO"), Some(0));
        // Same label again in a fresh run is fine
        asm.assemble("FOO: NOP").unwrap();
        asm.assemble("NOP").unwrap();
        assert_eq!(asm.lookup("FOO"), None);
        assert_eq!(asm.lookup("ACC"), Some(0xE0));
    }

    #[test]
    fn result_helpers() {
        let a = assemble("MOV A, #0x25").unwrap();
        assert_eq!(a.byte_count(), 2);
        assert_eq!(a.hex_bytes(), "7425");
        assert_eq!(a.intel_hex(), ":02000000742565\n:00000001FF");
        let mut bin = Vec::new();
        a.write_bin(&mut bin).unwrap();
        assert_eq!(bin, vec![0x74, 0x25]);
    }
}
