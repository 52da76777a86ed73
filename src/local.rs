use std::borrow::Cow;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::models::{FIELDS, NewApplication, Record};
use crate::store::{ListQuery, RecordStore};

const BOM: char = '\u{feff}';

/// What [`LocalStore::ensure_schema`] had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaCheck {
    Valid,
    Created,
    /// Header was missing or malformed; the file now holds only the header.
    Reset { discarded_lines: usize },
}

/// Flat CSV file backend. The file is opened and closed on every call.
#[derive(Debug, Clone)]
pub struct LocalStore {
    path: PathBuf,
}

impl LocalStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the file with the canonical header if absent.
    ///
    /// A file whose first line does not mention `empresa` is considered
    /// corrupt and is rewritten with just the header: every existing row is
    /// lost.
    pub fn ensure_schema(&self) -> Result<SchemaCheck, StoreError> {
        if !self.path.exists() {
            if let Some(parent) = self.path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            self.write_header()?;
            debug!(path = %self.path.display(), "created local store");
            return Ok(SchemaCheck::Created);
        }

        // Stray non-UTF-8 bytes in data rows must not make the file unusable.
        let bytes = fs::read(&self.path)?;
        let content = String::from_utf8_lossy(&bytes);
        let header_ok = content
            .lines()
            .next()
            .is_some_and(|line| line.to_lowercase().contains(FIELDS[0]));
        if header_ok {
            return Ok(SchemaCheck::Valid);
        }

        let discarded_lines = content.lines().count();
        self.write_header()?;
        warn!(
            path = %self.path.display(),
            discarded_lines,
            "local store header missing or malformed, file reset to header only"
        );
        Ok(SchemaCheck::Reset { discarded_lines })
    }

    fn write_header(&self) -> Result<(), StoreError> {
        let mut writer = csv::Writer::from_path(&self.path)?;
        writer.write_record(FIELDS)?;
        writer.flush()?;
        Ok(())
    }

    pub fn append(&self, application: &NewApplication) -> Result<(), StoreError> {
        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .open(&self.path)?;
        if !ends_with_newline(&mut file)? {
            file.write_all(b"\n")?;
        }

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.write_record(application.to_row())?;
        writer.flush()?;
        Ok(())
    }

    /// All non-blank rows in file order. Columns are looked up by header name,
    /// so reordered or missing columns are tolerated. Invalid UTF-8 is decoded
    /// lossily instead of failing the read.
    pub fn read_all(&self) -> Result<Vec<Record>, StoreError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.path)?;

        let columns: HashMap<String, usize> = reader
            .byte_headers()?
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let name = String::from_utf8_lossy(name);
                (name.trim_start_matches(BOM).trim().to_lowercase(), i)
            })
            .collect();

        let mut records = Vec::new();
        for row in reader.byte_records() {
            let row = row?;
            let fields: Vec<Cow<'_, str>> = row.iter().map(String::from_utf8_lossy).collect();
            if fields.iter().any(|f| matches!(f, Cow::Owned(_))) {
                warn!(
                    path = %self.path.display(),
                    line = row.position().map(|p| p.line()),
                    "invalid UTF-8 in local store row, replaced undecodable bytes"
                );
            }
            let record = Record::from_fields(|name| {
                columns
                    .get(name)
                    .and_then(|&i| fields.get(i))
                    .map(|f| f.as_ref())
            });
            if !record.is_blank() {
                records.push(record);
            }
        }
        Ok(records)
    }
}

impl RecordStore for LocalStore {
    fn insert(&self, application: &NewApplication) -> Result<Option<String>, StoreError> {
        self.ensure_schema()?;
        self.append(application)?;
        Ok(None)
    }

    fn list(&self, query: &ListQuery) -> Result<Vec<Record>, StoreError> {
        self.ensure_schema()?;
        let mut records = self.read_all()?;
        sort_by_date(&mut records, query.descending);
        if let Some(limit) = query.effective_limit() {
            records.truncate(limit);
        }
        Ok(records)
    }
}

/// Orders records by their display date. Records whose date cannot be parsed
/// count as the oldest possible date. Equal dates keep their relative order.
pub fn sort_by_date(records: &mut [Record], descending: bool) {
    let key = |r: &Record| r.parsed_date().unwrap_or(NaiveDate::MIN);
    if descending {
        records.sort_by_cached_key(|r| Reverse(key(r)));
    } else {
        records.sort_by_cached_key(key);
    }
}

/// Writes `records` to a standalone CSV file with the canonical header. The
/// file starts with a UTF-8 BOM so spreadsheet tools pick the right encoding.
pub fn export_csv(records: &[Record], path: &Path) -> Result<(), StoreError> {
    let mut file = File::create(path)?;
    file.write_all(BOM.to_string().as_bytes())?;

    let mut writer = csv::Writer::from_writer(file);
    writer.write_record(FIELDS)?;
    for record in records {
        writer.write_record(record.to_row())?;
    }
    writer.flush()?;
    Ok(())
}

fn ends_with_newline(file: &mut File) -> std::io::Result<bool> {
    let len = file.seek(SeekFrom::End(0))?;
    if len == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Status, WorkMode};
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    const HEADER: &str = "empresa,cargo,data,tipo,status,observacoes,link\n";

    fn app(company: &str, date: &str) -> NewApplication {
        NewApplication::new(company, "Engineer", date).unwrap()
    }

    fn companies(records: &[Record]) -> Vec<&str> {
        records.iter().map(|r| r.company.as_str()).collect()
    }

    #[test]
    fn test_ensure_schema_creates_file_and_parents() {
        let dir = tempdir().unwrap();
        let store = LocalStore::new(dir.path().join("assets/candidaturas.csv"));

        assert_eq!(store.ensure_schema().unwrap(), SchemaCheck::Created);
        assert_eq!(fs::read_to_string(store.path()).unwrap(), HEADER);
        assert_eq!(store.ensure_schema().unwrap(), SchemaCheck::Valid);
    }

    #[test]
    fn test_ensure_schema_resets_garbage_header_and_drops_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("candidaturas.csv");
        fs::write(&path, "garbage;header\nAcme,Engineer,02-11-2025,,,,\n").unwrap();
        let store = LocalStore::new(&path);

        assert_eq!(
            store.ensure_schema().unwrap(),
            SchemaCheck::Reset { discarded_lines: 2 }
        );
        assert_eq!(fs::read_to_string(&path).unwrap(), HEADER);
        assert!(store.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_ensure_schema_resets_empty_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("candidaturas.csv");
        fs::write(&path, "").unwrap();
        let store = LocalStore::new(&path);

        assert_eq!(
            store.ensure_schema().unwrap(),
            SchemaCheck::Reset { discarded_lines: 0 }
        );
        assert_eq!(fs::read_to_string(&path).unwrap(), HEADER);
    }

    #[test]
    fn test_header_check_is_case_insensitive() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("candidaturas.csv");
        fs::write(&path, "EMPRESA,CARGO,DATA\nAcme,Engineer,02-11-2025\n").unwrap();
        let store = LocalStore::new(&path);

        assert_eq!(store.ensure_schema().unwrap(), SchemaCheck::Valid);
        let records = store.read_all().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].date, "02-11-2025");
        assert_eq!(records[0].status, "");
    }

    #[test]
    fn test_insert_then_list_round_trips() {
        let dir = tempdir().unwrap();
        let store = LocalStore::new(dir.path().join("candidaturas.csv"));
        let application = NewApplication::new("Acme, Inc.", "Backend \"Rust\" Dev", "2025-11-02")
            .unwrap()
            .with_mode(Some(WorkMode::Remote))
            .with_status(Status::Interview)
            .with_notes("line one\nline two")
            .with_link("https://acme.example/jobs/42");

        store.insert(&application).unwrap();
        let records = store.list(&ListQuery::default()).unwrap();

        assert_eq!(
            records,
            vec![Record {
                company: "Acme, Inc.".to_string(),
                role: "Backend \"Rust\" Dev".to_string(),
                date: "02-11-2025".to_string(),
                mode: "Remoto".to_string(),
                status: "Entrevista".to_string(),
                notes: "line one\nline two".to_string(),
                link: "https://acme.example/jobs/42".to_string(),
            }]
        );
        assert_eq!(records[0].parsed_date(), Some(application.date()));
    }

    #[test]
    fn test_append_after_missing_trailing_newline() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("candidaturas.csv");
        fs::write(&path, "empresa,cargo,data,tipo,status,observacoes,link\nOld,Dev,01-01-2024,,,,").unwrap();
        let store = LocalStore::new(&path);

        store.insert(&app("New", "2025-01-01")).unwrap();
        assert_eq!(companies(&store.read_all().unwrap()), vec!["Old", "New"]);
    }

    #[test]
    fn test_read_skips_blank_rows_and_fills_short_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("candidaturas.csv");
        fs::write(
            &path,
            "\u{feff}empresa,cargo,data,tipo,status,observacoes,link\n,,,,,,\nAcme,Engineer\n",
        )
        .unwrap();
        let store = LocalStore::new(&path);

        let records = store.read_all().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].company, "Acme");
        assert_eq!(records[0].role, "Engineer");
        assert_eq!(records[0].date, "");
        assert_eq!(records[0].link, "");
    }

    #[test]
    fn test_invalid_utf8_row_is_read_lossily() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("candidaturas.csv");
        let mut content = HEADER.as_bytes().to_vec();
        content.extend_from_slice(b"Acme,Dev,02-11-2025,,,,\n");
        content.extend_from_slice(b"Beta,Dev,01-11-2025,H\xedbrido,,,\n");
        fs::write(&path, content).unwrap();
        let store = LocalStore::new(&path);

        assert_eq!(store.ensure_schema().unwrap(), SchemaCheck::Valid);
        let records = store.list(&ListQuery::default()).unwrap();
        assert_eq!(companies(&records), vec!["Acme", "Beta"]);
        assert_eq!(records[1].mode, "H\u{fffd}brido");

        store.insert(&app("Gamma", "2025-11-03")).unwrap();
        assert_eq!(store.read_all().unwrap().len(), 3);
    }

    #[test]
    fn test_list_orders_and_limits() {
        let dir = tempdir().unwrap();
        let store = LocalStore::new(dir.path().join("candidaturas.csv"));
        for (company, date) in [
            ("B", "2025-03-10"),
            ("A", "2024-12-31"),
            ("C", "2025-11-02"),
        ] {
            store.insert(&app(company, date)).unwrap();
        }

        let desc = store.list(&ListQuery::default()).unwrap();
        assert_eq!(companies(&desc), vec!["C", "B", "A"]);

        let asc = store
            .list(&ListQuery {
                limit: Some(2),
                descending: false,
            })
            .unwrap();
        assert_eq!(companies(&asc), vec!["A", "B"]);
    }

    #[test]
    fn test_export_writes_bom_and_reads_back() {
        let dir = tempdir().unwrap();
        let store = LocalStore::new(dir.path().join("candidaturas.csv"));
        store.insert(&app("Acme", "2025-11-02")).unwrap();
        store.insert(&app("Beta", "2025-11-01")).unwrap();
        let records = store.list(&ListQuery::default()).unwrap();

        let out = dir.path().join("export.csv");
        export_csv(&records, &out).unwrap();

        let bytes = fs::read(&out).unwrap();
        assert!(bytes.starts_with("\u{feff}empresa,cargo".as_bytes()));
        assert_eq!(LocalStore::new(&out).read_all().unwrap(), records);
    }

    #[test]
    fn test_sort_puts_unparseable_dates_at_the_old_end() {
        let record = |company: &str, date: &str| Record {
            company: company.to_string(),
            date: date.to_string(),
            ..Record::default()
        };
        let mut records = vec![
            record("bad", "not a date"),
            record("new", "02-11-2025"),
            record("old", "15-01-2024"),
            record("iso", "2025-11-02"),
        ];

        sort_by_date(&mut records, true);
        assert_eq!(companies(&records), vec!["new", "old", "bad", "iso"]);

        sort_by_date(&mut records, false);
        assert_eq!(companies(&records), vec!["bad", "iso", "old", "new"]);
    }
}
