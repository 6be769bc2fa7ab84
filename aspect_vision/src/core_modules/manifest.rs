// THEORY:
// The manifest is the only description of the dataset the engine trusts. It is a
// comma-delimited text file: the first line is a header and is ignored, every
// other line starts with `path,label` and may carry any number of trailing
// fields. The reader turns it into an ordered `Vec<ManifestEntry>`.
//
// Key architectural principles:
// 1.  **Partial Results Over Strictness**: A bad row (too few fields, empty path,
//     empty label) is skipped with a `ManifestMalformed` warning. The rest of the
//     dataset is still worth plotting.
// 2.  **Resolved Paths**: Entry paths are joined onto the dataset root here, so
//     downstream stages never need to know where the dataset lives.
// 3.  **Label Domain**: `distinct_labels` derives the label set once, in first-seen
//     order. That order is the palette order and therefore the legend order.

use crate::error::{AspectError, AspectResult};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const TRAIN_MANIFEST: &str = "full_rects.csv";
pub const TEST_MANIFEST: &str = "full_rects_test.csv";
pub const VALIDATION_MANIFEST: &str = "full_rects_val.csv";

const FIELD_DELIMITER: u8 = b',';

/// The dataset split whose manifest gets loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Split {
    Train,
    Test,
    #[default]
    Validation,
}

impl Split {
    pub fn manifest_file(self) -> &'static str {
        match self {
            Split::Train => TRAIN_MANIFEST,
            Split::Test => TEST_MANIFEST,
            Split::Validation => VALIDATION_MANIFEST,
        }
    }
}

/// An opaque class identifier taken verbatim from the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassLabel(String);

impl ClassLabel {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClassLabel {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

/// One dataset image and its class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Image path, already resolved against the dataset root.
    pub path: PathBuf,
    pub label: ClassLabel,
}

/// The parsed manifest plus the rows that had to be skipped.
#[derive(Debug, Default)]
pub struct Manifest {
    pub entries: Vec<ManifestEntry>,
    pub warnings: Vec<AspectError>,
}

impl Manifest {
    /// Reads and parses the manifest at `manifest_path`. Entry paths are joined onto `root`.
    pub fn load(manifest_path: &Path, root: &Path) -> AspectResult<Self> {
        let text = std::fs::read_to_string(manifest_path).map_err(|source| {
            AspectError::ManifestUnreadable {
                path: manifest_path.to_path_buf(),
                source,
            }
        })?;
        Ok(Self::parse(&text, root))
    }

    /// Parses manifest text. Quoting follows RFC 4180, so a quoted field may hold
    /// commas and `""` escapes. Rows are never fatal; bad ones land in `warnings`.
    pub fn parse(text: &str, root: &Path) -> Self {
        let mut manifest = Manifest::default();
        let mut reader = ReaderBuilder::new()
            .delimiter(FIELD_DELIMITER)
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(text.as_bytes());

        for (index, result) in reader.records().enumerate() {
            // Header is line 1, so the first record is at least line 2.
            let fallback_line = index + 2;
            let (line, row) = match result {
                Ok(record) => {
                    if is_blank(&record) {
                        continue;
                    }
                    let line = record
                        .position()
                        .map_or(fallback_line, |pos| pos.line() as usize);
                    (line, parse_record(&record, root))
                }
                Err(err) => {
                    let line = err
                        .position()
                        .map_or(fallback_line, |pos| pos.line() as usize);
                    (line, Err(err.to_string()))
                }
            };

            match row {
                Ok(entry) => manifest.entries.push(entry),
                Err(reason) => {
                    warn!(line, %reason, "skipping manifest row");
                    manifest
                        .warnings
                        .push(AspectError::ManifestMalformed { line, reason });
                }
            }
        }

        manifest
    }

    /// Distinct labels in first-seen order.
    pub fn distinct_labels(&self) -> Vec<ClassLabel> {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .filter(|entry| seen.insert(&entry.label))
            .map(|entry| entry.label.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A whitespace-only line comes back as a single empty field.
fn is_blank(record: &StringRecord) -> bool {
    record.len() == 1 && record[0].is_empty()
}

fn parse_record(record: &StringRecord, root: &Path) -> Result<ManifestEntry, String> {
    let (Some(path), Some(label)) = (record.get(0), record.get(1)) else {
        return Err(format!("expected at least 2 fields, found {}", record.len()));
    };
    let (path, label) = (unquote(path), unquote(label));
    if path.is_empty() {
        return Err("empty image path".to_string());
    }
    if label.is_empty() {
        return Err("empty class label".to_string());
    }
    Ok(ManifestEntry {
        path: root.join(path),
        label: ClassLabel::new(label),
    })
}

/// Quotes only count as quoting at the very start of a field, so ` "cat" `
/// survives the reader with its quotes. Strip them after trimming.
fn unquote(field: &str) -> &str {
    field
        .strip_prefix('"')
        .and_then(|f| f.strip_suffix('"'))
        .map_or(field, str::trim)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_ignored_and_extra_fields_dropped() {
        let text = "filename,class,x0,y0\nimgA.jpg,cat,1,2\nimgB.jpg,dog\n";
        let manifest = Manifest::parse(text, Path::new("dataset"));

        assert!(manifest.warnings.is_empty());
        assert_eq!(
            manifest.entries,
            vec![
                ManifestEntry {
                    path: PathBuf::from("dataset/imgA.jpg"),
                    label: ClassLabel::from("cat"),
                },
                ManifestEntry {
                    path: PathBuf::from("dataset/imgB.jpg"),
                    label: ClassLabel::from("dog"),
                },
            ]
        );
    }

    #[test]
    fn malformed_rows_are_skipped_with_line_numbers() {
        let text = "path,label\nonly_one_field\n,cat\nimg.png,\nok.png,bird\n";
        let manifest = Manifest::parse(text, Path::new(""));

        assert_eq!(manifest.len(), 1);
        let lines: Vec<usize> = manifest
            .warnings
            .iter()
            .map(|w| match w {
                AspectError::ManifestMalformed { line, .. } => *line,
                other => panic!("unexpected warning {other:?}"),
            })
            .collect();
        assert_eq!(lines, vec![2, 3, 4]);
    }

    #[test]
    fn header_only_manifest_is_empty() {
        let manifest = Manifest::parse("path,label\n", Path::new("dataset"));
        assert!(manifest.is_empty());
        assert!(manifest.distinct_labels().is_empty());
    }

    #[test]
    fn quotes_whitespace_and_blank_lines() {
        let text = "path,label\r\n \"a b.png\" , \"cat\" \r\n\r\n";
        let manifest = Manifest::parse(text, Path::new("root"));
        assert!(manifest.warnings.is_empty());
        assert_eq!(manifest.entries[0].path, PathBuf::from("root/a b.png"));
        assert_eq!(manifest.entries[0].label.as_str(), "cat");
    }

    #[test]
    fn quoted_commas_stay_inside_their_field() {
        let text = "path,label\n\"img, 1.png\",cat\n\"say \"\"hi\"\".png\",\"dog, small\",7\n";
        let manifest = Manifest::parse(text, Path::new("root"));

        assert!(manifest.warnings.is_empty());
        assert_eq!(
            manifest.entries,
            vec![
                ManifestEntry {
                    path: PathBuf::from("root/img, 1.png"),
                    label: ClassLabel::from("cat"),
                },
                ManifestEntry {
                    path: PathBuf::from("root/say \"hi\".png"),
                    label: ClassLabel::from("dog, small"),
                },
            ]
        );
    }

    #[test]
    fn whitespace_only_line_is_not_a_row() {
        let text = "path,label\n   \nok.png,bird\n";
        let manifest = Manifest::parse(text, Path::new(""));
        assert!(manifest.warnings.is_empty());
        assert_eq!(manifest.len(), 1);
    }

    #[test]
    fn distinct_labels_keep_first_seen_order() {
        let text = "p,l\na,dog\nb,cat\nc,dog\nd,bird\ne,cat\n";
        let labels = Manifest::parse(text, Path::new("")).distinct_labels();
        let names: Vec<&str> = labels.iter().map(ClassLabel::as_str).collect();
        assert_eq!(names, vec!["dog", "cat", "bird"]);
    }

    #[test]
    fn missing_manifest_file_is_unreadable() {
        let err = Manifest::load(Path::new("/definitely/not/here.csv"), Path::new("/"))
            .expect_err("missing file");
        assert!(matches!(err, AspectError::ManifestUnreadable { .. }));
    }

    #[test]
    fn splits_map_to_manifest_files() {
        assert_eq!(Split::default().manifest_file(), VALIDATION_MANIFEST);
        assert_eq!(Split::Train.manifest_file(), "full_rects.csv");
        assert_eq!(Split::Test.manifest_file(), "full_rects_test.csv");
    }
}
