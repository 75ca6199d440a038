//! Parser for `pmap -x` style region tables
//!
//! ```text
//! Address           Kbytes     RSS   Dirty Mode  Mapping
//! 000055d5c1a4d000       8       8       0 r---- cat
//! 00007f3a54000000     132       4       4 rw---   [ anon ]
//! ---------------- ------- ------- -------
//! total kB            8552    1564     140
//! ```
//!
//! The header is dropped, each row becomes a [`MappedRegion`] in input order,
//! and rows without the five leading fields (separators, the `total` footer)
//! are skipped.

use log::debug;

use super::region::{MappedRegion, Permissions};
use crate::domain::SnapshotError;

/// Parse a complete snapshot, header line included
///
/// # Errors
/// Returns [`SnapshotError::Empty`] if no region rows follow the header
pub fn parse_snapshot(text: &str) -> Result<Vec<MappedRegion>, SnapshotError> {
    let mut lines = text.lines();
    if lines.next().is_none() {
        return Err(SnapshotError::Empty);
    }

    let mut regions = Vec::new();
    for line in lines {
        match parse_line(line) {
            Some(region) => regions.push(region),
            None => debug!("Skipping malformed snapshot line: {line:?}"),
        }
    }

    if regions.is_empty() {
        return Err(SnapshotError::Empty);
    }
    Ok(regions)
}

/// Parse one region row, or `None` if it lacks the five leading fields
#[must_use]
pub fn parse_line(line: &str) -> Option<MappedRegion> {
    let (address, rest) = next_field(line)?;
    let (kbytes, rest) = next_field(rest)?;
    let (rss, rest) = next_field(rest)?;
    let (dirty, rest) = next_field(rest)?;
    let (mode, rest) = next_field(rest)?;

    let start = parse_hex(address)?;
    let size_kb = kbytes.parse().ok()?;

    let mut region = MappedRegion::new(start, size_kb);
    region.resident_kb = rss.parse().ok()?;
    region.dirty_kb = dirty.parse().ok()?;
    region.perms = Permissions::from_mode(mode);

    let path = rest.trim();
    if !path.is_empty() {
        region.path = Some(path.to_string());
    }

    Some(region)
}

/// Split off the next whitespace-delimited field
fn next_field(input: &str) -> Option<(&str, &str)> {
    let input = input.trim_start();
    if input.is_empty() {
        return None;
    }
    let end = input.find(char::is_whitespace).unwrap_or(input.len());
    Some(input.split_at(end))
}

fn parse_hex(field: &str) -> Option<u64> {
    let digits = field.strip_prefix("0x").unwrap_or(field);
    u64::from_str_radix(digits, 16).ok()
}
