use super::offset::{percentage, read_range, strip_record_line};
use crate::logger::Logger;
use crate::{DeptreeError, Result};
use rand::seq::SliceRandom;
use serde::Deserialize;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Lines starting with this are records; everything else (array brackets,
/// the `total_rows` header) is skipped.
const RECORD_PREFIX: &[u8] = b"{\"id\":\"";

const DEFAULT_VERIFY_SAMPLES: usize = 10;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LookupEntry {
    pub name: String,
    /// Raw byte position of the record's first byte in the dump.
    pub offset: u64,
    /// Byte length of the record without line terminator or trailing comma.
    pub length: u32,
    /// Zero-based line of the record in the dump.
    pub line: u32,
}

#[derive(Deserialize)]
struct RecordName {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    key: Option<String>,
    #[serde(default)]
    doc: Option<DocName>,
}

#[derive(Deserialize)]
struct DocName {
    #[serde(default)]
    name: Option<String>,
}

impl RecordName {
    fn into_name(self) -> Option<String> {
        self.doc
            .and_then(|doc| doc.name)
            .or(self.key)
            .or(self.id)
    }
}

fn record_name(bytes: &[u8]) -> std::result::Result<String, String> {
    let record: RecordName = serde_json::from_slice(bytes).map_err(|err| err.to_string())?;
    record
        .into_name()
        .ok_or_else(|| "record has no name".to_string())
}

pub struct LookupBuilder {
    dump: PathBuf,
    lookup: PathBuf,
    verify_samples: usize,
}

impl LookupBuilder {
    pub fn new(dump: impl Into<PathBuf>) -> Self {
        let dump = dump.into();
        let lookup = super::lookup_path(&dump);

        LookupBuilder {
            dump,
            lookup,
            verify_samples: DEFAULT_VERIFY_SAMPLES,
        }
    }

    pub fn with_verify_samples(mut self, samples: usize) -> Self {
        self.verify_samples = samples;
        self
    }

    pub fn dump_path(&self) -> &Path {
        &self.dump
    }

    pub fn lookup_path(&self) -> &Path {
        &self.lookup
    }

    /// Builds, verifies and writes the lookup file.
    pub fn run(&self, logger: &dyn Logger) -> Result<Vec<LookupEntry>> {
        let entries = self.build(logger)?;
        self.write(&entries)?;
        Ok(entries)
    }

    /// Streams the dump once and returns one entry per record, in dump order.
    /// Refuses to start if a lookup file already exists.
    pub fn build(&self, logger: &dyn Logger) -> Result<Vec<LookupEntry>> {
        if self.lookup.exists() {
            return Err(DeptreeError::IndexExists {
                path: self.lookup.clone(),
            });
        }

        logger.start();
        let scanned = self.scan(logger);
        logger.stop();

        let entries = scanned?;
        self.verify(&entries, self.verify_samples)?;

        Ok(entries)
    }

    fn scan(&self, logger: &dyn Logger) -> Result<Vec<LookupEntry>> {
        let file = File::open(&self.dump).map_err(|source| self.read_error(source))?;
        let file_size = file
            .metadata()
            .map_err(|source| self.read_error(source))?
            .len();
        let mut reader = BufReader::new(file);

        let mut entries = Vec::new();
        let mut buf = Vec::new();
        let mut parsed_bytes: u64 = 0;
        let mut line: u32 = 0;
        let mut reported = 0u64;

        loop {
            buf.clear();
            let read = reader
                .read_until(b'\n', &mut buf)
                .map_err(|source| self.read_error(source))?;

            if read == 0 {
                break;
            }

            let line_start = parsed_bytes;
            parsed_bytes += read as u64;

            if buf.starts_with(RECORD_PREFIX) {
                let payload = strip_record_line(&buf);
                let length = u32::try_from(payload.len())
                    .map_err(|_| self.corrupt(line, "record longer than 4 GiB".into()))?;
                let name = record_name(payload).map_err(|reason| self.corrupt(line, reason))?;

                entries.push(LookupEntry {
                    name,
                    offset: line_start,
                    length,
                    line,
                });
            }

            line = line
                .checked_add(1)
                .ok_or_else(|| self.corrupt(line, "too many lines".into()))?;

            let percent = percentage(parsed_bytes, file_size);
            if percent as u64 > reported {
                reported = percent as u64;
                logger.log(&format!(
                    "Parsed {:.0}% of {} ({} packages)",
                    percent,
                    self.dump.display(),
                    entries.len()
                ));
            }
        }

        Ok(entries)
    }

    /// Reads `samples` random entries back from the dump and checks that each
    /// decodes to a record of the expected name.
    pub fn verify(&self, entries: &[LookupEntry], samples: usize) -> Result<()> {
        if entries.is_empty() || samples == 0 {
            return Ok(());
        }

        let mut file = File::open(&self.dump).map_err(|source| self.read_error(source))?;
        let mut rng = rand::thread_rng();

        for entry in entries.choose_multiple(&mut rng, samples) {
            let bytes = read_range(&mut file, entry.offset, entry.length).map_err(|err| {
                self.verification(entry, format!("could not read record: {}", err))
            })?;

            let found = record_name(&bytes).map_err(|reason| self.verification(entry, reason))?;

            if found != entry.name {
                return Err(self.verification(entry, format!("found {} instead", found)));
            }
        }

        Ok(())
    }

    /// Writes `"<name> <offset> <length>"` lines. Never overwrites.
    pub fn write(&self, entries: &[LookupEntry]) -> Result<()> {
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.lookup)
            .map_err(|source| {
                if source.kind() == io::ErrorKind::AlreadyExists {
                    DeptreeError::IndexExists {
                        path: self.lookup.clone(),
                    }
                } else {
                    self.write_error(source)
                }
            })?;

        let mut writer = BufWriter::new(file);

        for entry in entries {
            writeln!(writer, "{} {} {}", entry.name, entry.offset, entry.length)
                .map_err(|source| self.write_error(source))?;
        }

        writer.flush().map_err(|source| self.write_error(source))?;

        Ok(())
    }

    fn read_error(&self, source: io::Error) -> DeptreeError {
        DeptreeError::ReadFile {
            path: self.dump.clone(),
            source,
        }
    }

    fn write_error(&self, source: io::Error) -> DeptreeError {
        DeptreeError::WriteFile {
            path: self.lookup.clone(),
            source,
        }
    }

    fn corrupt(&self, line: u32, reason: String) -> DeptreeError {
        DeptreeError::IndexCorrupt {
            path: self.dump.clone(),
            line: line as usize + 1,
            reason,
        }
    }

    fn verification(&self, entry: &LookupEntry, reason: String) -> DeptreeError {
        DeptreeError::IndexVerification {
            path: self.dump.clone(),
            expected: entry.name.clone(),
            reason,
        }
    }
}
