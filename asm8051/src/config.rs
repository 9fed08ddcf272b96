//! Assembler settings

use crate::error::ErrorKind;
use crate::hex::DEFAULT_RECORD_LEN;

/// Settings applied by [`crate::Assembler8051::with_config`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblerConfig {
    /// Maximum data bytes per Intel HEX record, 1..=255.
    pub hex_record_len: usize,
    /// Seed the DSM-51 monitor entry points (`WRITE_TEXT`, `DELAY_MS`, ...).
    pub monitor_symbols: bool,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            hex_record_len: DEFAULT_RECORD_LEN,
            monitor_symbols: true,
        }
    }
}

impl AssemblerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hex_record_len(mut self, len: usize) -> Self {
        self.hex_record_len = len;
        self
    }

    pub fn monitor_symbols(mut self, enabled: bool) -> Self {
        self.monitor_symbols = enabled;
        self
    }

    pub fn validate(&self) -> Result<(), ErrorKind> {
        if !(1..=255).contains(&self.hex_record_len) {
            return Err(ErrorKind::Config(format!(
                "hex record length {} is outside 1..=255",
                self.hex_record_len
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = AssemblerConfig::default();
        assert_eq!(config.hex_record_len, 16);
        assert!(config.monitor_symbols);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_setters() {
        let config = AssemblerConfig::new().hex_record_len(32).monitor_symbols(false);
        assert_eq!(config.hex_record_len, 32);
        assert!(!config.monitor_symbols);
    }

    #[test]
    fn record_length_bounds() {
        assert!(AssemblerConfig::new().hex_record_len(1).validate().is_ok());
        assert!(AssemblerConfig::new().hex_record_len(255).validate().is_ok());
        assert!(matches!(
            AssemblerConfig::new().hex_record_len(0).validate(),
            Err(ErrorKind::Config(_))
        ));
        assert!(matches!(
            AssemblerConfig::new().hex_record_len(256).validate(),
            Err(ErrorKind::Config(_))
        ));
    }
}
