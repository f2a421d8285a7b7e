//! Address list ingestion.
//!
//! Lists are plain text, one address per line. Line breaks may be `\n`,
//! `\r\n` or a bare `\r` (spreadsheet exports). Blank lines and lines
//! starting with `#` are ignored.

use std::path::Path;

use allowlist_merkle::{parse_address, Address};

use crate::stage::StageError;

/// Parse an address list, reporting the 1-based line of the first bad entry.
pub fn parse_address_list(text: &str) -> Result<Vec<Address>, StageError> {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut addresses = Vec::new();

    for (i, line) in normalized.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let address = parse_address(line)
            .map_err(|source| StageError::AddressList { line: i + 1, source })?;
        addresses.push(address);
    }

    Ok(addresses)
}

pub fn read_address_list(path: &Path) -> Result<Vec<Address>, StageError> {
    let text = std::fs::read_to_string(path)?;
    parse_address_list(&text)
}
