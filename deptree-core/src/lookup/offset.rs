use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};

/// How the offsets in a lookup file were measured.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum LineEndings {
    /// Offsets count the raw bytes on disk, line terminators included as
    /// stored. Every index written by this crate uses this.
    #[default]
    Raw,
    /// Offsets were counted as if every line ended in a single `\n` while the
    /// file on disk uses `\r\n`. Each preceding line hides one byte.
    Normalized,
}

/// Byte position to seek to for a record found on `line` (zero-based).
pub fn corrected_offset(offset: u64, line: u32, mode: LineEndings) -> u64 {
    match mode {
        LineEndings::Raw => offset,
        LineEndings::Normalized => offset + u64::from(line),
    }
}

/// `part / total` as a percentage in `0.0..=100.0`.
pub fn percentage(part: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }

    (part as f64 / total as f64 * 100.0).min(100.0)
}

/// Drops the line terminator (`\n` or `\r\n`) and one trailing comma.
pub fn strip_record_line(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    line.strip_suffix(b",").unwrap_or(line)
}

/// Reads exactly `length` bytes starting at `offset`.
pub fn read_range(file: &mut File, offset: u64, length: u32) -> io::Result<Vec<u8>> {
    file.seek(SeekFrom::Start(offset))?;
    let mut buf = vec![0u8; length as usize];
    file.read_exact(&mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_offsets_are_untouched() {
        assert_eq!(corrected_offset(1234, 17, LineEndings::Raw), 1234);
    }

    #[test]
    fn normalized_offsets_gain_one_byte_per_line() {
        assert_eq!(corrected_offset(1234, 17, LineEndings::Normalized), 1251);
        assert_eq!(corrected_offset(0, 0, LineEndings::Normalized), 0);
    }

    #[test]
    fn percentage_handles_edges() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(50, 200), 25.0);
        assert_eq!(percentage(300, 200), 100.0);
    }

    #[test]
    fn strips_terminators_and_one_comma() {
        assert_eq!(strip_record_line(b"{\"a\":1},\r\n"), b"{\"a\":1}");
        assert_eq!(strip_record_line(b"{\"a\":1},\n"), b"{\"a\":1}");
        assert_eq!(strip_record_line(b"{\"a\":1}"), b"{\"a\":1}");
        assert_eq!(strip_record_line(b"{\"a\":1},,\n"), b"{\"a\":1},");
    }

    #[test]
    fn reads_exact_ranges() {
        use std::io::Write;

        let mut tmp = tempfile::tempfile().unwrap();
        tmp.write_all(b"0123456789").unwrap();

        assert_eq!(read_range(&mut tmp, 3, 4).unwrap(), b"3456");
        let err = read_range(&mut tmp, 8, 4).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
