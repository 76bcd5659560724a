use std::path::{Path, PathBuf};

pub mod builder;
pub mod index;
pub mod offset;

pub use builder::{LookupBuilder, LookupEntry};
pub use index::{IndexRecord, LookupIndex};
pub use offset::{LineEndings, corrected_offset, percentage};

/// A dump holds one JSON record per line. [`LookupBuilder`] streams it once
/// and writes a sibling lookup file of `"<name> <offset> <length>"` lines;
/// [`LookupIndex`] loads it back so a record costs one seek and one read.
pub const LOOKUP_SUFFIX: &str = ".lookup.txt";

/// `registry.json` → `registry.lookup.txt`, next to the dump.
pub fn lookup_path(dump: &Path) -> PathBuf {
    let stem = dump
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();

    dump.with_file_name(format!("{}{}", stem, LOOKUP_SUFFIX))
}
