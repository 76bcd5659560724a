use crate::{DeptreeError, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct IndexRecord {
    pub offset: u64,
    pub length: u32,
    /// Only present in lookup files that carry a fourth column.
    pub line: Option<u32>,
}

/// A lookup file loaded into memory.
#[derive(Debug)]
pub struct LookupIndex {
    path: PathBuf,
    records: HashMap<String, IndexRecord>,
}

impl LookupIndex {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(DeptreeError::IndexMissing {
                path: path.to_path_buf(),
            });
        }

        let data = fs::read_to_string(path).map_err(|source| DeptreeError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(path, &data)
    }

    pub fn parse(path: &Path, data: &str) -> Result<Self> {
        let mut records = HashMap::new();

        for (idx, line) in data.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }

            let corrupt = |reason: &str| DeptreeError::IndexCorrupt {
                path: path.to_path_buf(),
                line: idx + 1,
                reason: reason.to_string(),
            };

            let fields: Vec<&str> = line.split_whitespace().collect();
            let (name, offset, length, line_no) = match fields.as_slice() {
                [name, offset, length] => (*name, *offset, *length, None),
                [name, offset, length, line_no] => (*name, *offset, *length, Some(*line_no)),
                _ => return Err(corrupt("expected `<name> <offset> <length>`")),
            };

            let offset = offset
                .parse::<u64>()
                .map_err(|_| corrupt("offset is not a number"))?;
            let length = length
                .parse::<u32>()
                .map_err(|_| corrupt("length is not a number"))?;
            let line = line_no
                .map(|value| value.parse::<u32>())
                .transpose()
                .map_err(|_| corrupt("line is not a number"))?;

            records.insert(
                name.to_string(),
                IndexRecord {
                    offset,
                    length,
                    line,
                },
            );
        }

        Ok(LookupIndex {
            path: path.to_path_buf(),
            records,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, name: &str) -> Option<&IndexRecord> {
        self.records.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parses_three_and_four_column_lines() {
        let index = LookupIndex::parse(
            Path::new("registry.lookup.txt"),
            "foo 37 120\n@scope/bar 158 99 2\n\n",
        )
        .unwrap();

        assert_eq!(index.len(), 2);
        assert_eq!(
            index.get("foo"),
            Some(&IndexRecord {
                offset: 37,
                length: 120,
                line: None
            })
        );
        assert_eq!(index.get("@scope/bar").and_then(|r| r.line), Some(2));
        assert!(!index.contains("baz"));
    }

    #[test]
    fn malformed_lines_name_their_position() {
        let err = LookupIndex::parse(Path::new("x.lookup.txt"), "foo 1 2\nbar nope 3\n").unwrap_err();
        assert!(matches!(err, DeptreeError::IndexCorrupt { line: 2, .. }));

        let err = LookupIndex::parse(Path::new("x.lookup.txt"), "foo\n").unwrap_err();
        assert!(matches!(err, DeptreeError::IndexCorrupt { line: 1, .. }));
    }

    #[test]
    fn missing_file_is_index_missing() {
        let dir = tempdir().unwrap();
        let err = LookupIndex::load(&dir.path().join("registry.lookup.txt")).unwrap_err();
        assert!(matches!(err, DeptreeError::IndexMissing { .. }));
    }
}
