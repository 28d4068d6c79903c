//! Job working directory, intermediate CSV and output naming.

use chrono::Local;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::WorkspaceError;
use crate::models::Table;

/// Intermediate CSV of a PxWeb job.
pub const PXWEB_CSV: &str = "fromPxWebapi.csv";
/// Intermediate CSV of an SDMX job.
pub const SDMX_CSV: &str = "fromSDMXapi.csv";
/// Persistent log of a batch job.
pub const BATCH_LOG: &str = "statjoin_job.log";

pub const PXWEB_DEFAULT_OUTPUT: &str = "pxweb_output";
pub const SDMX_DEFAULT_OUTPUT: &str = "sdmx_output";

static NON_TABLE_CHAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_]").expect("valid regex"));

/// Make a name legal as an output table name.
pub fn table_name(raw: &str) -> String {
    let name = NON_TABLE_CHAR.replace_all(raw.trim(), "_").into_owned();
    match name.chars().next() {
        None => String::new(),
        Some(c) if c.is_ascii_digit() => format!("T{}", name),
        Some(_) => name,
    }
}

/// First usable candidate, made table-legal; `default` when none is usable.
pub fn output_name<'a>(candidates: impl IntoIterator<Item = Option<&'a str>>, default: &str) -> String {
    candidates
        .into_iter()
        .flatten()
        .map(table_name)
        .find(|n| !n.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Append the job timestamp when an output of that name already exists.
pub fn unique_output_name(name: &str, timestamp: &str, exists: impl Fn(&str) -> bool) -> String {
    if exists(name) {
        format!("{}_{}", name, timestamp)
    } else {
        name.to_string()
    }
}

/// Per-job temporary directory.
#[derive(Debug)]
pub struct JobWorkspace {
    id: Uuid,
    dir: PathBuf,
    timestamp: String,
    keep: bool,
}

impl JobWorkspace {
    /// Create `job_tmp_files_{ts}` (or `batch_job_tmp_files_{ts}`) under `root`.
    pub fn create(root: impl AsRef<Path>, batch: bool, keep: bool) -> Result<Self, WorkspaceError> {
        let timestamp = Local::now().format("%Y%m%d%H%M%S").to_string();
        let prefix = if batch { "batch_job_tmp_files" } else { "job_tmp_files" };
        let id = Uuid::new_v4();

        let mut dir = root.as_ref().join(format!("{}_{}", prefix, timestamp));
        if dir.exists() {
            // two jobs in the same second
            dir = root
                .as_ref()
                .join(format!("{}_{}_{}", prefix, timestamp, id.simple()));
        }
        std::fs::create_dir_all(&dir)?;

        Ok(Self {
            id,
            dir,
            timestamp,
            keep,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Job start time as `YYYYmmddHHMMSS`.
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn path(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    /// Write a table as CSV; header order is the field descriptor order.
    pub fn write_table_csv(&self, table: &Table, file_name: &str) -> Result<PathBuf, WorkspaceError> {
        let path = self.path(file_name);
        write_table_csv(table, &path)?;
        Ok(path)
    }

    /// Remove the directory unless the job was asked to keep it.
    pub fn cleanup(self) -> Result<(), WorkspaceError> {
        if !self.keep && self.dir.exists() {
            std::fs::remove_dir_all(&self.dir)?;
        }
        Ok(())
    }
}

/// Write a table as CSV with a header row matching field order.
pub fn write_table_csv(table: &Table, path: &Path) -> Result<(), WorkspaceError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(table.field_names())?;
    for row in &table.rows {
        writer.write_record(row.values.iter().map(|v| v.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FieldDescriptor, FieldValue, FlatRow};
    use tempfile::tempdir;

    #[test]
    fn test_table_name() {
        assert_eq!(table_name("Population by region 2023"), "Population_by_region_2023");
        assert_eq!(table_name("2023 data"), "T2023_data");
        assert_eq!(table_name("  "), "");
    }

    #[test]
    fn test_output_name_precedence() {
        assert_eq!(output_name([None, Some("Folkmängd"), None], PXWEB_DEFAULT_OUTPUT), "Folkm_ngd");
        assert_eq!(output_name([Some(""), None], SDMX_DEFAULT_OUTPUT), "sdmx_output");
        assert_eq!(output_name([Some("mine"), Some("label")], PXWEB_DEFAULT_OUTPUT), "mine");
    }

    #[test]
    fn test_unique_output_name() {
        let ts = "20261019120000";
        assert_eq!(unique_output_name("pop", ts, |_| false), "pop");
        assert_eq!(unique_output_name("pop", ts, |n| n == "pop"), "pop_20261019120000");
    }

    #[test]
    fn test_workspace_lifecycle() {
        let root = tempdir().unwrap();
        let ws = JobWorkspace::create(root.path(), false, false).unwrap();
        let dir = ws.dir().to_path_buf();
        assert!(dir.is_dir());
        assert!(dir
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("job_tmp_files_"));
        assert_eq!(ws.timestamp().len(), 14);

        ws.cleanup().unwrap();
        assert!(!dir.exists());
    }

    #[test]
    fn test_keep_temp() {
        let root = tempdir().unwrap();
        let ws = JobWorkspace::create(root.path(), true, true).unwrap();
        let dir = ws.dir().to_path_buf();
        assert!(dir
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("batch_job_tmp_files_"));
        ws.cleanup().unwrap();
        assert!(dir.exists());
    }

    #[test]
    fn test_intermediate_csv_header_order() {
        let root = tempdir().unwrap();
        let ws = JobWorkspace::create(root.path(), false, false).unwrap();
        let mut table = Table::new(vec![
            FieldDescriptor::text("REF_AREA_CODE", "REF_AREA_CODE"),
            FieldDescriptor::text("REFERENCE_AREA", "Reference area"),
            FieldDescriptor::double("OBS_VALUE", "OBS_VALUE"),
        ]);
        table.rows.push(FlatRow::new(vec![
            FieldValue::from("AT"),
            FieldValue::from("Austria"),
            FieldValue::Null,
        ]));

        let path = ws.write_table_csv(&table, SDMX_CSV).unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        assert_eq!(content, "REF_AREA_CODE,REFERENCE_AREA,OBS_VALUE\nAT,Austria,\n");
    }
}
