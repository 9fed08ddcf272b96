//! Numeric literal parsing
//!
//! Accepted forms:
//! - `'c'`   character code
//! - `0FFH`  hexadecimal (suffix `H`/`h`), also `0xFF`
//! - `1010B` binary (suffix `B`/`b`)
//! - `255`   decimal
//!
//! A leading `-` negates any of the above.

use crate::error::ErrorKind;

pub struct NumberParser;

impl NumberParser {
    pub fn parse(s: &str) -> Result<i32, ErrorKind> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ErrorKind::Syntax("missing number or value".to_string()));
        }

        if let Some(rest) = trimmed.strip_prefix('-') {
            if rest.starts_with('-') {
                return Err(Self::invalid(trimmed));
            }
            return Self::parse_unsigned(rest.trim()).map(|v| -v);
        }
        Self::parse_unsigned(trimmed)
    }

    fn parse_unsigned(s: &str) -> Result<i32, ErrorKind> {
        if s.is_empty() {
            return Err(ErrorKind::Syntax("missing number or value".to_string()));
        }

        // Character literal: 'A'
        if s.starts_with('\'') {
            let mut chars = s.chars();
            return match (chars.next(), chars.next(), chars.next(), chars.next()) {
                (Some('\''), Some(c), Some('\''), None) => Ok(c as i32),
                _ => Err(Self::invalid(s)),
            };
        }

        if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            return Self::parse_radix(hex, 16, s);
        }
        if let Some(hex) = s.strip_suffix('H').or_else(|| s.strip_suffix('h')) {
            return Self::parse_radix(hex, 16, s);
        }
        if let Some(bin) = s.strip_suffix('B').or_else(|| s.strip_suffix('b')) {
            return Self::parse_radix(bin, 2, s);
        }
        Self::parse_radix(s, 10, s)
    }

    fn parse_radix(digits: &str, radix: u32, literal: &str) -> Result<i32, ErrorKind> {
        // from_str_radix tolerates a sign, the grammar does not
        if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
            return Err(Self::invalid(literal));
        }
        i32::from_str_radix(digits, radix)
            .map_err(|_| ErrorKind::Syntax(format!("number too large: {}", literal)))
    }

    fn invalid(s: &str) -> ErrorKind {
        ErrorKind::Syntax(format!("invalid number: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_formats() {
        assert_eq!(NumberParser::parse("0FFH").unwrap(), 255);
        assert_eq!(NumberParser::parse("0ffh").unwrap(), 255);
        assert_eq!(NumberParser::parse("FFH").unwrap(), 255);
        assert_eq!(NumberParser::parse("0x25").unwrap(), 0x25);
        assert_eq!(NumberParser::parse("0X1B").unwrap(), 0x1B);
        assert_eq!(NumberParser::parse("8100H").unwrap(), 0x8100);
    }

    #[test]
    fn test_binary_formats() {
        assert_eq!(NumberParser::parse("11111111B").unwrap(), 255);
        assert_eq!(NumberParser::parse("1010b").unwrap(), 10);
        assert!(NumberParser::parse("102B").is_err());
    }

    #[test]
    fn test_decimal() {
        assert_eq!(NumberParser::parse("255").unwrap(), 255);
        assert_eq!(NumberParser::parse("0").unwrap(), 0);
        assert_eq!(NumberParser::parse("65535").unwrap(), 65535);
        assert_eq!(NumberParser::parse(" 42 ").unwrap(), 42);
    }

    #[test]
    fn test_negative() {
        assert_eq!(NumberParser::parse("-1").unwrap(), -1);
        assert_eq!(NumberParser::parse("-80H").unwrap(), -128);
        assert!(NumberParser::parse("--1").is_err());
        assert!(NumberParser::parse("-").is_err());
    }

    #[test]
    fn test_character_literal() {
        assert_eq!(NumberParser::parse("'A'").unwrap(), 65);
        assert_eq!(NumberParser::parse("','").unwrap(), 44);
        assert!(NumberParser::parse("'AB'").is_err());
        assert!(NumberParser::parse("''").is_err());
    }

    #[test]
    fn test_malformed() {
        assert!(matches!(NumberParser::parse(""), Err(ErrorKind::Syntax(_))));
        assert!(matches!(NumberParser::parse("   "), Err(ErrorKind::Syntax(_))));
        assert!(NumberParser::parse("LOOP").is_err());
        assert!(NumberParser::parse("H").is_err());
        assert!(NumberParser::parse("0x").is_err());
        assert!(NumberParser::parse("+5").is_err());
        assert!(NumberParser::parse("12G").is_err());
    }
}
