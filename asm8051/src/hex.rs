//! Intel HEX output (and input, for loaders and round-trip checks)
//!
//! Records are built from the sparse output map: consecutive addresses are
//! grouped into data records of at most `max_len` bytes, gaps start a new
//! record, and the file ends with the `:00000001FF` EOF record.

use std::collections::BTreeMap;
use std::io::{self, Write};

use thiserror::Error;

pub const DEFAULT_RECORD_LEN: usize = 16;
pub const EOF_RECORD: &str = ":00000001FF";

const DATA: u8 = 0x00;
const END_OF_FILE: u8 = 0x01;
const EXTENDED_SEGMENT: u8 = 0x02;
const START_SEGMENT: u8 = 0x03;
const EXTENDED_LINEAR: u8 = 0x04;
const START_LINEAR: u8 = 0x05;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HexError {
    #[error("line {line}: record does not start with ':'")]
    MissingStartCode { line: usize },

    #[error("line {line}: invalid hex digits")]
    InvalidDigit { line: usize },

    #[error("line {line}: record length does not match byte count")]
    LengthMismatch { line: usize },

    #[error("line {line}: checksum mismatch, expected {expected:02X}, found {found:02X}")]
    Checksum { line: usize, expected: u8, found: u8 },

    #[error("line {line}: unsupported record type {kind:02X}")]
    UnsupportedType { line: usize, kind: u8 },

    #[error("line {line}: data at 0x{address:X} is outside the 64K code space")]
    AddressOverflow { line: usize, address: u32 },

    #[error("missing end-of-file record")]
    MissingEof,
}

fn checksum(bytes: impl IntoIterator<Item = u8>) -> u8 {
    let sum = bytes.into_iter().fold(0u8, |acc, b| acc.wrapping_add(b));
    (!sum).wrapping_add(1)
}

fn data_record(address: u16, data: &[u8]) -> String {
    let header = [data.len() as u8, (address >> 8) as u8, address as u8, DATA];
    let cs = checksum(header.iter().chain(data).copied());
    let mut record = format!(":{:02X}{:04X}{:02X}", data.len(), address, DATA);
    for b in data {
        record.push_str(&format!("{:02X}", b));
    }
    record.push_str(&format!("{:02X}", cs));
    record
}

/// All records for `output`, the EOF record last.
pub fn records(output: &BTreeMap<u16, u8>, max_len: usize) -> Vec<String> {
    let max_len = max_len.clamp(1, 255);
    let mut records = Vec::new();
    let mut start: u16 = 0;
    let mut run: Vec<u8> = Vec::with_capacity(max_len);

    for (&address, &byte) in output {
        let contiguous = !run.is_empty() && u32::from(start) + run.len() as u32 == u32::from(address);
        if !run.is_empty() && (!contiguous || run.len() == max_len) {
            records.push(data_record(start, &run));
            run.clear();
        }
        if run.is_empty() {
            start = address;
        }
        run.push(byte);
    }
    if !run.is_empty() {
        records.push(data_record(start, &run));
    }

    records.push(EOF_RECORD.to_string());
    records
}

/// Records joined by `\n`, no trailing newline.
pub fn to_intel_hex(output: &BTreeMap<u16, u8>, max_len: usize) -> String {
    records(output, max_len).join("\n")
}

/// Stream records, one per line.
pub fn write_intel_hex<W: Write>(output: &BTreeMap<u16, u8>, max_len: usize, mut out: W) -> io::Result<()> {
    for record in records(output, max_len) {
        writeln!(out, "{}", record)?;
    }
    Ok(())
}

fn decode_record(line: usize, text: &str) -> Result<Vec<u8>, HexError> {
    let body = text.strip_prefix(':').ok_or(HexError::MissingStartCode { line })?;
    if body.len() % 2 != 0 || !body.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(HexError::InvalidDigit { line });
    }
    let bytes: Vec<u8> = (0..body.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&body[i..i + 2], 16))
        .collect::<Result<_, _>>()
        .map_err(|_| HexError::InvalidDigit { line })?;

    // count, address (2), type, checksum
    if bytes.len() < 5 || bytes.len() != bytes[0] as usize + 5 {
        return Err(HexError::LengthMismatch { line });
    }
    let (content, found) = bytes.split_at(bytes.len() - 1);
    let expected = checksum(content.iter().copied());
    if expected != found[0] {
        return Err(HexError::Checksum { line, expected, found: found[0] });
    }
    Ok(bytes)
}

/// Parse Intel HEX text into an address -> byte map. Stops at the EOF record.
pub fn parse_intel_hex(text: &str) -> Result<BTreeMap<u16, u8>, HexError> {
    let mut image = BTreeMap::new();
    let mut base: u32 = 0;

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        let bytes = decode_record(line, raw)?;
        let count = bytes[0] as usize;
        let offset = u32::from(u16::from_be_bytes([bytes[1], bytes[2]]));
        let data = &bytes[4..4 + count];

        match bytes[3] {
            DATA => {
                for (i, &b) in data.iter().enumerate() {
                    let address = base + offset + i as u32;
                    let address = u16::try_from(address)
                        .map_err(|_| HexError::AddressOverflow { line, address })?;
                    image.insert(address, b);
                }
            }
            END_OF_FILE => return Ok(image),
            EXTENDED_SEGMENT | EXTENDED_LINEAR if count == 2 => {
                let value = u32::from(u16::from_be_bytes([data[0], data[1]]));
                base = if bytes[3] == EXTENDED_SEGMENT { value << 4 } else { value << 16 };
            }
            EXTENDED_SEGMENT | EXTENDED_LINEAR => return Err(HexError::LengthMismatch { line }),
            // Entry points carry no image data
            START_SEGMENT | START_LINEAR => {}
            kind => return Err(HexError::UnsupportedType { line, kind }),
        }
    }

    Err(HexError::MissingEof)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(pairs: &[(u16, u8)]) -> BTreeMap<u16, u8> {
        pairs.iter().copied().collect()
    }

    fn verify_checksum(line: &str) {
        assert!(line.starts_with(':'), "record must start with ':'");
        let bytes: Vec<u8> = (1..line.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&line[i..i + 2], 16).unwrap())
            .collect();
        let sum = bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
        assert_eq!(sum, 0, "checksum mismatch for {line}");
    }

    #[test]
    fn empty_output_is_just_eof() {
        assert_eq!(to_intel_hex(&BTreeMap::new(), 16), EOF_RECORD);
    }

    #[test]
    fn single_record() {
        let out = image(&[(0x0000, 0x74), (0x0001, 0x25)]);
        assert_eq!(records(&out, 16), vec![":02000000742565", EOF_RECORD]);
    }

    #[test]
    fn gap_starts_new_record() {
        let mut out = BTreeMap::new();
        for a in 0x0000..=0x0003u16 {
            out.insert(a, a as u8);
        }
        for a in 0x0010..=0x0013u16 {
            out.insert(a, 0xA0 | a as u8);
        }
        let recs = records(&out, 16);
        assert_eq!(recs.len(), 3);
        assert!(recs[0].starts_with(":04000000"));
        assert!(recs[1].starts_with(":04001000"));
        assert_eq!(recs[2], EOF_RECORD);
        for r in &recs {
            verify_checksum(r);
        }
    }

    #[test]
    fn long_runs_split_at_record_length() {
        let out: BTreeMap<u16, u8> = (0..40u16).map(|a| (0x0100 + a, a as u8)).collect();
        let recs = records(&out, 16);
        assert_eq!(recs.len(), 4);
        assert!(recs[0].starts_with(":10010000"));
        assert!(recs[1].starts_with(":10011000"));
        assert!(recs[2].starts_with(":08012000"));

        let recs = records(&out, 32);
        assert_eq!(recs.len(), 3);
        assert!(recs[0].starts_with(":20010000"));
    }

    #[test]
    fn top_of_memory() {
        let out = image(&[(0xFFFE, 0x01), (0xFFFF, 0x02)]);
        let recs = records(&out, 16);
        assert_eq!(recs[0], ":02FFFE000102FE");
        verify_checksum(&recs[0]);
    }

    #[test]
    fn writer_matches_string_form() {
        let out = image(&[(0x10, 0xAA), (0x11, 0xBB), (0x20, 0xCC)]);
        let mut buf = Vec::new();
        write_intel_hex(&out, 16, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.trim_end(), to_intel_hex(&out, 16));
        assert!(text.ends_with(":00000001FF\n"));
    }

    #[test]
    fn reads_back_what_it_writes() {
        let out: BTreeMap<u16, u8> = [(0x0000, 0x02), (0x0001, 0x01), (0x0002, 0x00), (0x8000, 0x55)]
            .into_iter()
            .collect();
        assert_eq!(parse_intel_hex(&to_intel_hex(&out, 16)).unwrap(), out);
    }

    #[test]
    fn reader_rejects_bad_records() {
        assert_eq!(
            parse_intel_hex("02000000742565"),
            Err(HexError::MissingStartCode { line: 1 })
        );
        assert_eq!(
            parse_intel_hex(":02000000742566\n:00000001FF"),
            Err(HexError::Checksum { line: 1, expected: 0x65, found: 0x66 })
        );
        assert_eq!(parse_intel_hex(":0200000074E5"), Err(HexError::LengthMismatch { line: 1 }));
        assert_eq!(parse_intel_hex(":02000000G425E5"), Err(HexError::InvalidDigit { line: 1 }));
        assert_eq!(parse_intel_hex(":02000000742565"), Err(HexError::MissingEof));
    }

    #[test]
    fn reader_honours_extended_addresses() {
        // segment 0x0100 -> base 0x1000
        let text = ":020000020100FB\n:0100000042BD\n:00000001FF";
        verify_checksum(":020000020100FB");
        let img = parse_intel_hex(text).unwrap();
        assert_eq!(img.get(&0x1000), Some(&0x42));

        // linear 0x0001 -> base 0x10000, past the 8051 code space
        let text = ":020000040001F9\n:0100000042BD\n:00000001FF";
        assert_eq!(
            parse_intel_hex(text),
            Err(HexError::AddressOverflow { line: 2, address: 0x10000 })
        );
    }

    #[test]
    fn reader_stops_at_eof() {
        let text = ":0100000042BD\n:00000001FF\ngarbage";
        assert_eq!(parse_intel_hex(text).unwrap(), image(&[(0, 0x42)]));
    }
}
