//! One row of an address-space snapshot

use std::fmt;

use crate::domain::{Address, Interval};

/// Access permissions of a mapped region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct Permissions {
    pub read: bool,
    pub write: bool,
    pub exec: bool,
}

impl Permissions {
    /// Decode a `rwx`-style triple
    ///
    /// A flag is set only if its position holds exactly the expected letter.
    /// Anything else, including a missing character, clears the flag.
    #[must_use]
    pub fn from_mode(mode: &str) -> Self {
        let mut chars = mode.chars();
        Self {
            read: chars.next() == Some('r'),
            write: chars.next() == Some('w'),
            exec: chars.next() == Some('x'),
        }
    }

    /// One column per flag: the letter when set, `-` otherwise
    #[must_use]
    pub fn letters(self) -> [char; 3] {
        let flag = |set: bool, letter: char| if set { letter } else { '-' };
        [flag(self.read, 'r'), flag(self.write, 'w'), flag(self.exec, 'x')]
    }
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, w, x] = self.letters();
        write!(f, "{r}{w}{x}")
    }
}

/// A contiguous range of virtual memory as reported by the snapshot tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedRegion {
    /// `end` is derived from `size_kb`, never read from input
    pub interval: Interval,
    pub size_kb: u64,
    pub resident_kb: u64,
    pub dirty_kb: u64,
    pub perms: Permissions,
    pub path: Option<String>,
}

impl MappedRegion {
    /// Build a region starting at `start` spanning `size_kb` kilobytes
    #[must_use]
    pub fn new(start: u64, size_kb: u64) -> Self {
        Self {
            interval: Interval::from_start_len(Address(start), size_kb.saturating_mul(1024)),
            size_kb,
            resident_kb: 0,
            dirty_kb: 0,
            perms: Permissions::default(),
            path: None,
        }
    }

    #[must_use]
    pub fn start(&self) -> Address {
        self.interval.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permissions_from_mode() {
        assert_eq!(
            Permissions::from_mode("r-x--"),
            Permissions { read: true, write: false, exec: true }
        );
        assert_eq!(
            Permissions::from_mode("rw---"),
            Permissions { read: true, write: true, exec: false }
        );
        assert_eq!(Permissions::from_mode("-----"), Permissions::default());
    }

    #[test]
    fn test_permissions_require_exact_position() {
        // Right letters in the wrong positions do not count
        assert_eq!(Permissions::from_mode("xwr"), Permissions { read: false, write: true, exec: false });
        assert_eq!(Permissions::from_mode("R"), Permissions::default());
        assert_eq!(Permissions::from_mode("r"), Permissions { read: true, write: false, exec: false });
    }

    #[test]
    fn test_permissions_display() {
        assert_eq!(Permissions::from_mode("r-x").to_string(), "r-x");
        assert_eq!(Permissions::default().to_string(), "---");
    }

    #[test]
    fn test_letters_match_display() {
        let perms = Permissions::from_mode("r-x");
        assert_eq!(perms.letters(), ['r', '-', 'x']);
        assert_eq!(perms.to_string(), perms.letters().iter().collect::<String>());
    }

    #[test]
    fn test_region_end_is_derived_from_size() {
        let region = MappedRegion::new(0x7f00_0000_0000, 8);
        assert_eq!(region.interval.end, Address(0x7f00_0000_2000));
    }
}
