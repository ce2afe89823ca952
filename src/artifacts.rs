//! CSV persistence of derived tables.

use crate::frames::convert::ToFrame;
use crate::frames::error::FrameError;
use log::debug;
use polars::prelude::{CsvWriter, PolarsError, SerWriter};
use std::fs::File;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error("Failed to create output directory '{0}'")]
    CreateDir(PathBuf, #[source] std::io::Error),

    #[error("Failed to create file '{0}'")]
    CreateFile(PathBuf, #[source] std::io::Error),

    #[error("Failed to write CSV to '{0}'")]
    WriteCsv(PathBuf, #[source] PolarsError),
}

/// Writes a table to `path` as comma separated values with a header row.
///
/// An existing file is overwritten. Missing values are written as empty fields.
pub fn write_csv<T>(rows: &T, path: &Path) -> Result<(), ArtifactError>
where
    T: ToFrame + ?Sized,
{
    let mut frame = rows.to_frame()?;
    let mut file =
        File::create(path).map_err(|e| ArtifactError::CreateFile(path.to_path_buf(), e))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut frame)
        .map_err(|e| ArtifactError::WriteCsv(path.to_path_buf(), e))?;
    debug!("Wrote {} rows to {}", frame.height(), path.display());
    Ok(())
}

/// Writes a table as `dir/name` and returns the path written.
pub fn write_table<T>(dir: &Path, name: &str, rows: &T) -> Result<PathBuf, ArtifactError>
where
    T: ToFrame + ?Sized,
{
    let path = dir.join(name);
    write_csv(rows, &path)?;
    Ok(path)
}

/// Creates `dir` and its parents if they do not exist yet.
pub fn ensure_dir(dir: &Path) -> Result<(), ArtifactError> {
    std::fs::create_dir_all(dir).map_err(|e| ArtifactError::CreateDir(dir.to_path_buf(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::accommodation::AccommodationType;
    use crate::types::attendance::AttendanceRecord;
    use crate::types::period::Month;
    use tempfile::tempdir;

    #[test]
    fn writes_header_and_empty_fields_for_missing_values() -> Result<(), Box<dyn std::error::Error>>
    {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join("attendance.csv");
        ensure_dir(path.parent().ok_or("no parent")?)?;

        let rows = vec![
            AttendanceRecord {
                cluster_id: 1,
                accommodation_type: AccommodationType::Hotel,
                time_period: Month(2024, 7),
                capacity_total: 120,
                nights_total: Some(450.0),
                undefined_communes: 0,
            },
            AttendanceRecord {
                cluster_id: 2,
                accommodation_type: AccommodationType::Camping,
                time_period: Month(2024, 7),
                capacity_total: 0,
                nights_total: None,
                undefined_communes: 3,
            },
        ];
        write_csv(rows.as_slice(), &path)?;

        let written = std::fs::read_to_string(&path)?;
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "cluster_id,accommodation_type,time_period,capacity_zone,nights_zone,undefined_communes"
        );
        assert!(lines[1].starts_with("1,Hotel,2024-07,120,450"));
        assert!(lines[1].ends_with(",0"));
        assert_eq!(lines[2], "2,Camping,2024-07,0,,3");
        Ok(())
    }

    #[test]
    fn missing_directory_is_reported() {
        let path = Path::new("/nonexistent-voyage-etl-dir/out.csv");
        let rows: Vec<AttendanceRecord> = Vec::new();
        assert!(matches!(
            write_csv(rows.as_slice(), path),
            Err(ArtifactError::CreateFile(..))
        ));
    }
}
