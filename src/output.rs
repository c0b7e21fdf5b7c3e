/// CSV output for both pipelines.
///
/// Files are written to a `.part` sibling first and renamed into place once
/// every record has been flushed, so a failed run never leaves a truncated
/// report behind. A previously written file is only replaced on success.

use std::fs;
use std::path::{Path, PathBuf};

use crate::model::OutputError;

/// Writes `records` as CSV to `path`, creating parent directories as needed.
pub fn write_csv_atomically<I, R>(path: &Path, records: I) -> Result<(), OutputError>
where
    I: IntoIterator<Item = R>,
    R: IntoIterator,
    R::Item: AsRef<[u8]>,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| OutputError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let part = part_path(path);
    let result = write_records(&part, records).and_then(|()| {
        fs::rename(&part, path).map_err(|source| OutputError::Io {
            path: path.to_path_buf(),
            source,
        })
    });

    if result.is_err() {
        // Best effort; the original error is what matters.
        let _ = fs::remove_file(&part);
    }
    result
}

fn write_records<I, R>(part: &Path, records: I) -> Result<(), OutputError>
where
    I: IntoIterator<Item = R>,
    R: IntoIterator,
    R::Item: AsRef<[u8]>,
{
    let csv_error = |source| OutputError::Csv {
        path: part.to_path_buf(),
        source,
    };

    let mut writer = csv::Writer::from_path(part).map_err(csv_error)?;
    for record in records {
        writer.write_record(record).map_err(csv_error)?;
    }
    writer.flush().map_err(|source| OutputError::Io {
        path: part.to_path_buf(),
        source,
    })
}

/// `report.csv` → `report.csv.part`
fn part_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_records_and_removes_part_file() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("nested").join("out.csv");

        write_csv_atomically(
            &path,
            vec![vec!["year", "value"], vec!["2020", "0.50"]],
        )
        .expect("write should succeed");

        let content = fs::read_to_string(&path).expect("file should exist");
        assert_eq!(content, "year,value\n2020,0.50\n");
        assert!(!part_path(&path).exists(), ".part file must be renamed away");
    }

    #[test]
    fn test_fields_with_commas_are_quoted() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("quoted.csv");

        write_csv_atomically(&path, vec![vec!["a,b".to_string(), "c".to_string()]])
            .expect("write should succeed");

        assert_eq!(fs::read_to_string(&path).unwrap(), "\"a,b\",c\n");
    }

    #[test]
    fn test_unwritable_target_reports_io_error_and_leaves_nothing() {
        let dir = tempfile::tempdir().expect("create temp dir");
        // A directory where the file should go makes the final rename fail.
        let path = dir.path().join("taken");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep"), "x").unwrap();

        let result = write_csv_atomically(&path, vec![vec!["year"]]);
        assert!(result.is_err(), "renaming over a non-empty directory must fail");
        assert!(!part_path(&path).exists(), ".part file must be cleaned up");
    }

    #[test]
    fn test_part_path_appends_suffix() {
        assert_eq!(
            part_path(Path::new("reports/week_vs_weekend.csv")),
            PathBuf::from("reports/week_vs_weekend.csv.part")
        );
    }
}
