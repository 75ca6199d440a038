//! # Address-space snapshots
//!
//! Turns the textual region table printed by `pmap -x` into an ordered list
//! of [`MappedRegion`]s.
//!
//! Order matters: the region classifier looks at each region's neighbours,
//! so regions are kept exactly as the tool printed them (ascending by
//! address in practice) and are never sorted here.
//!
//! - **`region`**: the [`MappedRegion`] and [`Permissions`] types
//! - **`parser`**: header skipping, row parsing, malformed-row tolerance
//! - **`source`**: live `pmap` invocation and saved-capture replay

pub mod parser;
pub mod region;
pub mod source;

pub use parser::{parse_line, parse_snapshot};
pub use region::{MappedRegion, Permissions};
pub use source::{take_snapshot, PmapCommand, SnapshotFile, SnapshotSource, DEFAULT_PMAP_PROGRAM};
