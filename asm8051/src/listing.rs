//! Human-readable assembly listing (feature: "listing")

/// One source line as placed by pass 2.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingLine {
    /// 1-based source line number.
    pub line: usize,
    /// Location counter when the line was reached.
    pub address: u16,
    pub bytes: Vec<u8>,
    pub source: String,
}

/// Render `address  bytes  source` rows under a header.
pub fn render(lines: &[ListingLine]) -> String {
    let mut out = String::from("Assembly Listing:\nLine  Address  Machine Code  Source\n");
    out.push_str(&"-".repeat(60));
    out.push('\n');
    for l in lines {
        let code = l
            .bytes
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join(" ");
        let address = if l.bytes.is_empty() {
            " ".repeat(5)
        } else {
            format!("{:04X}H", l.address)
        };
        out.push_str(&format!("{:>4}  {}    {:<12}  {}\n", l.line, address, code, l.source));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_show_address_only_for_code() {
        let lines = vec![
            ListingLine { line: 1, address: 0, bytes: vec![], source: "START:".into() },
            ListingLine { line: 2, address: 0, bytes: vec![0x74, 0x01], source: "  MOV A,#1".into() },
        ];
        let text = render(&lines);
        let rows: Vec<&str> = text.lines().collect();
        assert_eq!(rows.len(), 5);
        assert!(rows[3].ends_with("START:"));
        assert!(!rows[3].contains("0000H"));
        assert!(rows[4].contains("0000H"));
        assert!(rows[4].contains("74 01"));
        assert!(rows[4].ends_with("  MOV A,#1"));
    }
}
