//! Symbol table for SFRs, labels and EQU constants

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::error::ErrorKind;
use crate::parser::NumberParser;

/// Special function registers and bit flags of the 8051 core.
const SFRS: &[(&str, u16)] = &[
    ("P0", 0x80), ("SP", 0x81), ("DPL", 0x82), ("DPH", 0x83),
    ("PCON", 0x87), ("TCON", 0x88), ("TMOD", 0x89),
    ("TL0", 0x8A), ("TL1", 0x8B), ("TH0", 0x8C), ("TH1", 0x8D),
    ("P1", 0x90), ("SCON", 0x98), ("SBUF", 0x99), ("P2", 0xA0),
    ("IE", 0xA8), ("P3", 0xB0), ("IP", 0xB8), ("PSW", 0xD0),
    ("ACC", 0xE0), ("B", 0xF0),
    // TCON
    ("TF1", 0x8F), ("TR1", 0x8E), ("TF0", 0x8D), ("TR0", 0x8C),
    ("IE1", 0x8B), ("IT1", 0x8A), ("IE0", 0x89), ("IT0", 0x88),
    // SCON
    ("SM0", 0x9F), ("SM1", 0x9E), ("SM2", 0x9D), ("REN", 0x9C),
    ("TB8", 0x9B), ("RB8", 0x9A), ("TI", 0x99), ("RI", 0x98),
    // IE
    ("EA", 0xAF), ("ET2", 0xAD), ("ES", 0xAC), ("ET1", 0xAB),
    ("EX1", 0xAA), ("ET0", 0xA9), ("EX0", 0xA8),
    // IP
    ("PT2", 0xBD), ("PS", 0xBC), ("PT1", 0xBB), ("PX1", 0xBA),
    ("PT0", 0xB9), ("PX0", 0xB8),
    // P3 alternate functions
    ("RD", 0xB7), ("WR", 0xB6), ("T1", 0xB5), ("T0", 0xB4),
    ("INT1", 0xB3), ("INT0", 0xB2), ("TXD", 0xB1), ("RXD", 0xB0),
    // PSW
    ("CY", 0xD7), ("AC", 0xD6), ("F0", 0xD5), ("RS1", 0xD4),
    ("RS0", 0xD3), ("OV", 0xD2), ("P", 0xD0),
];

/// Bit-addressable SFRs; `NAME.n` resolves to `base + n`.
const BIT_SFRS: &[(&str, u16)] = &[
    ("P0", 0x80), ("TCON", 0x88), ("P1", 0x90), ("SCON", 0x98),
    ("P2", 0xA0), ("IE", 0xA8), ("P3", 0xB0), ("IP", 0xB8),
    ("PSW", 0xD0), ("ACC", 0xE0), ("B", 0xF0),
];

/// Entry points of the DSM-51 board monitor ROM.
const MONITOR_ROUTINES: &[(&str, u16)] = &[
    ("WRITE_TEXT", 0x8100), ("WRITE_DATA", 0x8102), ("WRITE_HEX", 0x8104),
    ("WRITE_INSTR", 0x8106), ("LCD_INIT", 0x8108), ("LCD_OFF", 0x810A),
    ("LCD_CLR", 0x810C), ("DELAY_US", 0x810E), ("DELAY_MS", 0x8110),
    ("DELAY_100MS", 0x8112), ("WAIT_ENTER", 0x8114), ("WAIT_ENTER_NW", 0x8116),
    ("TEST_ENTER", 0x8118), ("WAIT_ENT_ESC", 0x811A), ("WAIT_KEY", 0x811C),
    ("GET_NUM", 0x811E), ("BCD_HEX", 0x8120), ("HEX_BCD", 0x8122),
    ("MUL_2_2", 0x8124), ("MUL_3_1", 0x8126), ("DIV_2_1", 0x8128),
    ("DIV_4_2", 0x812A),
];

/// Architecture symbols, built once and shared by every assembly run.
static ARCH_SYMBOLS: LazyLock<Vec<(String, u16)>> = LazyLock::new(|| {
    let mut seed: Vec<(String, u16)> = SFRS
        .iter()
        .map(|&(name, addr)| (name.to_string(), addr))
        .collect();
    for &(name, base) in BIT_SFRS {
        for bit in 0..8u16 {
            seed.push((format!("{}.{}", name, bit), base + bit));
        }
    }
    // Register bank 0 aliases
    for n in 0..8u16 {
        seed.push((format!("AR{}", n), n));
    }
    seed
});

/// Whether a definition may replace an existing binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redefine {
    /// Labels: a second binding is an error.
    Reject,
    /// EQU: the new value silently wins.
    Overwrite,
}

#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    symbols: HashMap<String, u16>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self { symbols: HashMap::new() }
    }

    /// A table seeded with the architecture names, optionally with the
    /// monitor ROM entry points too.
    pub fn with_architecture(monitor_symbols: bool) -> Self {
        let mut table = Self::new();
        table.prepopulate(monitor_symbols);
        table
    }

    /// Seed SFRs, SFR bits and bank aliases. Existing entries are kept.
    pub fn prepopulate(&mut self, monitor_symbols: bool) {
        for (name, addr) in ARCH_SYMBOLS.iter() {
            self.symbols.entry(name.clone()).or_insert(*addr);
        }
        if monitor_symbols {
            for &(name, addr) in MONITOR_ROUTINES {
                self.symbols.entry(name.to_string()).or_insert(addr);
            }
        }
    }

    pub fn clear(&mut self) {
        self.symbols.clear();
    }

    pub fn define(&mut self, name: &str, value: u16, redefine: Redefine) -> Result<(), ErrorKind> {
        let key = name.to_ascii_uppercase();
        if redefine == Redefine::Reject && self.symbols.contains_key(&key) {
            return Err(ErrorKind::DuplicateLabel(key));
        }
        self.symbols.insert(key, value);
        Ok(())
    }

    /// Case-insensitive lookup.
    pub fn get(&self, name: &str) -> Option<u16> {
        self.symbols.get(&name.to_ascii_uppercase()).copied()
    }

    /// A symbol's value, or failing that the token read as a number.
    pub fn resolve(&self, token: &str) -> Result<i32, ErrorKind> {
        let token = token.trim();
        if let Some(value) = self.get(token) {
            return Ok(value as i32);
        }
        NumberParser::parse(token).map_err(|_| ErrorKind::UndefinedSymbol(token.to_string()))
    }

    pub fn symbols(&self) -> &HashMap<String, u16> {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }
}
