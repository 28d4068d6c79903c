//! Job orchestration: decode → transform join key → resolve geometry →
//! assemble → sink.
//!
//! [`JoinJob`] is the job-scoped context. It owns the geometry cache, the
//! transform rules and the log, so nothing about a job lives in globals.
//! The `run_*` functions wrap it with the job workspace, the intermediate
//! CSV and output naming for each source kind.
//!
//! # Example
//!
//! ```rust,ignore
//! use statjoin::{GeoJsonProvider, JobOptions, JoinContext, RuleSet, run_sdmx};
//!
//! let provider = GeoJsonProvider::open("nuts2.geojson")?;
//! let ctx = JoinContext::new(&provider, "NUTS_ID", RuleSet::default(), JobOptions::from_env());
//! let report = run_sdmx(&payload, &SdmxJob::new("REF_AREA_CODE"), &Output::new("out"), &ctx)?;
//! println!("Wrote {}", report.output.display());
//! ```

use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::cache::{CacheStats, GeometryCache};
use crate::config::JobOptions;
use crate::decode::{decode_jsonstat, decode_sdmx, parse_cube, parse_sdmx, strip_aliases};
use crate::error::{JobError, JobResult};
use crate::geography::{GeographyProvider, ShapeType, SpatialReference};
use crate::logs::{JobLog, LogProgress, ProgressSink};
use crate::models::{FieldDescriptor, Table};
use crate::parser::parse_csv_file_auto;
use crate::sink::{assemble, FeatureSink, GeoJsonSink};
use crate::transform::rules::{RuleSet, TransformOp};
use crate::workspace::{
    output_name, unique_output_name, JobWorkspace, BATCH_LOG, PXWEB_CSV, PXWEB_DEFAULT_OUTPUT,
    SDMX_CSV, SDMX_DEFAULT_OUTPUT,
};

/// Output name of a CSV job whose file stem is unusable.
const CSV_DEFAULT_OUTPUT: &str = "csv_output";

// =============================================================================
// Context
// =============================================================================

/// Everything a job needs besides its input.
pub struct JoinContext<'p> {
    pub provider: &'p dyn GeographyProvider,
    /// Field of the geography layer matched against join values.
    pub geo_field: String,
    pub rules: RuleSet,
    pub options: JobOptions,
    pub log: JobLog,
}

impl<'p> JoinContext<'p> {
    pub fn new(
        provider: &'p dyn GeographyProvider,
        geo_field: impl Into<String>,
        rules: RuleSet,
        options: JobOptions,
    ) -> Self {
        Self {
            provider,
            geo_field: geo_field.into(),
            rules,
            options,
            log: JobLog::new(),
        }
    }

    pub fn with_log(mut self, log: JobLog) -> Self {
        self.log = log;
        self
    }
}

/// Counters for one joined table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JoinSummary {
    pub rows: usize,
    pub with_geometry: usize,
    pub without_geometry: usize,
}

/// Job-scoped join engine. The cache lives as long as the job.
pub struct JoinJob<'p> {
    cache: GeometryCache<'p>,
    rules: RuleSet,
    shape_type: ShapeType,
    spatial_reference: SpatialReference,
    log: JobLog,
}

impl<'p> JoinJob<'p> {
    pub fn new(ctx: &JoinContext<'p>, log: JobLog) -> Self {
        for rule in &ctx.rules.rules {
            if let TransformOp::Remove(find) = rule.op() {
                log.warning(format!(
                    "Rule {}=delete removes every '{}'. A literal 'delete' replacement cannot be expressed",
                    rule.find, find
                ));
            }
        }

        let spatial_reference = if ctx.options.web_mercator {
            SpatialReference::web_mercator()
        } else {
            ctx.provider.spatial_reference()
        };

        Self {
            cache: GeometryCache::new(ctx.provider, ctx.geo_field.clone(), log.clone()),
            rules: ctx.rules.clone(),
            shape_type: ctx.provider.shape_type(),
            spatial_reference,
            log,
        }
    }

    /// Join every row of `table` on `join_field` and write it to `sink`.
    ///
    /// Rows without geometry are inserted with a null geometry. Sink errors
    /// abort the job.
    pub fn join_table(
        &mut self,
        table: &Table,
        join_field: &str,
        sink: &mut dyn FeatureSink,
        progress: &mut dyn ProgressSink,
    ) -> JobResult<JoinSummary> {
        let join_idx = find_join_field(table, join_field)?;

        sink.create(self.shape_type, &self.spatial_reference)?;
        sink.add_fields(&table.fields)?;

        let total = table.len();
        let mut summary = JoinSummary::default();
        for (i, row) in table.rows.iter().enumerate() {
            let raw = row.get(join_idx).map(ToString::to_string).unwrap_or_default();
            let key = self.rules.apply(&raw);
            let resolution = self.cache.resolve(&key);

            if resolution.is_found() {
                summary.with_geometry += 1;
            } else {
                summary.without_geometry += 1;
            }
            sink.insert(assemble(row, resolution))?;
            summary.rows += 1;
            progress.update(i + 1, total, "Inserting");
        }

        sink.finish()?;
        self.log.success(format!(
            "Joined {} rows ({} without geometry)",
            summary.rows, summary.without_geometry
        ));
        Ok(summary)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

/// Locate the join field by name, then by alias, then case-insensitively.
pub fn find_join_field(table: &Table, join_field: &str) -> JobResult<usize> {
    let wanted = join_field.trim();
    table
        .field_index(wanted)
        .or_else(|| table.fields.iter().position(|f| f.alias == wanted))
        .or_else(|| {
            table
                .fields
                .iter()
                .position(|f| f.name.eq_ignore_ascii_case(wanted))
        })
        .ok_or_else(|| JobError::JoinFieldNotFound(wanted.to_string()))
}

// =============================================================================
// Preparing tables
// =============================================================================

/// A decoded table ready to join.
#[derive(Debug, Clone)]
pub struct PreparedTable {
    pub table: Table,
    pub join_field: String,
    /// Output name suggested by the data itself.
    pub suggested_name: Option<String>,
}

/// PxWeb job parameters.
#[derive(Debug, Clone, Default)]
pub struct PxWebJob {
    /// Label of the dimension holding the join values.
    pub join_dimension: String,
    /// Join on the category code instead of the category label.
    pub join_on_code: bool,
}

/// SDMX job parameters.
#[derive(Debug, Clone, Default)]
pub struct SdmxJob {
    pub join_field: String,
    /// Field whose first-row value names the output.
    pub name_field: Option<String>,
}

impl SdmxJob {
    pub fn new(join_field: impl Into<String>) -> Self {
        Self {
            join_field: join_field.into(),
            name_field: None,
        }
    }
}

/// Decode a PxWeb JSON-stat payload.
pub fn prepare_pxweb(payload: &Value, job: &PxWebJob, options: &JobOptions) -> JobResult<PreparedTable> {
    let decoded = decode_jsonstat(payload, &job.join_dimension)?;
    let mut table = decoded.table;
    if !options.update_aliases {
        strip_aliases(&mut table.fields);
    }
    let join_field = if job.join_on_code {
        decoded.join_code_field
    } else {
        decoded.join_label_field
    };
    Ok(PreparedTable {
        table,
        join_field,
        suggested_name: decoded.label,
    })
}

/// Decode an SDMX-JSON payload.
pub fn prepare_sdmx(payload: &Value, job: &SdmxJob, options: &JobOptions) -> JobResult<PreparedTable> {
    let response = parse_sdmx(payload)?;
    let mut table = decode_sdmx(&response, &options.language)?;
    if !options.update_aliases {
        strip_aliases(&mut table.fields);
    }
    let join_idx = find_join_field(&table, &job.join_field)?;
    let suggested_name = match &job.name_field {
        Some(field) => {
            let idx = find_join_field(&table, field)?;
            table
                .rows
                .first()
                .and_then(|r| r.get(idx))
                .map(ToString::to_string)
        }
        None => None,
    };
    Ok(PreparedTable {
        join_field: table.fields[join_idx].name.clone(),
        table,
        suggested_name,
    })
}

// =============================================================================
// Running jobs
// =============================================================================

/// Where outputs are written.
#[derive(Debug, Clone)]
pub struct Output {
    pub dir: PathBuf,
    /// Explicit output name; wins over any suggested name.
    pub name: Option<String>,
}

impl Output {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            name: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    fn resolve_name(&self, suggested: Option<&str>, default: &str, timestamp: &str) -> String {
        let name = output_name([self.name.as_deref(), suggested], default);
        unique_output_name(&name, timestamp, |n| GeoJsonSink::path_for(&self.dir, n).exists())
    }
}

/// Result of one joined output.
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub name: String,
    pub output: PathBuf,
    pub summary: JoinSummary,
}

/// Outcome of one file in a batch.
#[derive(Debug, Clone, Serialize)]
pub enum FileOutcome {
    Completed(JobReport),
    Skipped { reason: String },
}

/// Result of a batch run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub files: Vec<(PathBuf, FileOutcome)>,
    /// Persistent log of the batch.
    pub log_file: PathBuf,
}

impl BatchReport {
    pub fn completed(&self) -> usize {
        self.files
            .iter()
            .filter(|(_, o)| matches!(o, FileOutcome::Completed(_)))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.files.len() - self.completed()
    }
}

/// Join a decoded table into `{output.dir}/{name}.geojson`.
fn write_output(
    job: &mut JoinJob<'_>,
    prepared: &PreparedTable,
    output: &Output,
    default_name: &str,
    timestamp: &str,
    log: &JobLog,
) -> JobResult<JobReport> {
    let name = output.resolve_name(prepared.suggested_name.as_deref(), default_name, timestamp);
    log.info(format!("Creating output {} ...", name));

    let mut sink = GeoJsonSink::new(&output.dir, &name);
    let mut progress = LogProgress::new(log);
    let summary = job.join_table(&prepared.table, &prepared.join_field, &mut sink, &mut progress)?;

    Ok(JobReport {
        name,
        output: sink.path().to_path_buf(),
        summary,
    })
}

fn single_job(
    prepared: PreparedTable,
    intermediate: &str,
    default_name: &str,
    output: &Output,
    ctx: &JoinContext<'_>,
) -> JobResult<JobReport> {
    let log = ctx.log.clone();
    let workspace = JobWorkspace::create(&ctx.options.work_dir, false, ctx.options.keep_temp)?;
    log.info(format!("Job {} started in {}", workspace.id(), workspace.dir().display()));

    let csv_path = workspace.write_table_csv(&prepared.table, intermediate)?;
    log.info_indent(
        format!("{} rows written to {}", prepared.table.len(), csv_path.display()),
        1,
    );

    let mut job = JoinJob::new(ctx, log.clone());
    let report = write_output(&mut job, &prepared, output, default_name, workspace.timestamp(), &log)?;

    let stats = job.cache_stats();
    log.info(format!(
        "{} geography queries, {} cache hits",
        stats.queries, stats.hits
    ));
    workspace.cleanup()?;
    log.success(format!("Output written to {}", report.output.display()));
    Ok(report)
}

/// Decode and join a PxWeb JSON-stat payload.
pub fn run_pxweb(payload: &Value, job: &PxWebJob, output: &Output, ctx: &JoinContext<'_>) -> JobResult<JobReport> {
    ctx.log.info("📖 Decoding PxWeb response...");
    let prepared = prepare_pxweb(payload, job, &ctx.options)?;
    single_job(prepared, PXWEB_CSV, PXWEB_DEFAULT_OUTPUT, output, ctx)
}

/// Decode and join an SDMX-JSON payload.
pub fn run_sdmx(payload: &Value, job: &SdmxJob, output: &Output, ctx: &JoinContext<'_>) -> JobResult<JobReport> {
    ctx.log.info("📖 Decoding SDMX response...");
    let prepared = prepare_sdmx(payload, job, &ctx.options)?;
    single_job(prepared, SDMX_CSV, SDMX_DEFAULT_OUTPUT, output, ctx)
}

fn prepare_csv(path: &Path, join_field: &str) -> JobResult<PreparedTable> {
    let parsed = parse_csv_file_auto(path)?;
    let idx = find_join_field(&parsed.table, join_field)?;
    Ok(PreparedTable {
        join_field: parsed.table.fields[idx].name.clone(),
        table: parsed.table,
        suggested_name: path.file_stem().map(|s| s.to_string_lossy().into_owned()),
    })
}

/// Join a single CSV file. Any read error is fatal.
pub fn run_csv(path: &Path, join_field: &str, output: &Output, ctx: &JoinContext<'_>) -> JobResult<JobReport> {
    ctx.log.info(format!("📖 Reading CSV file {}...", path.display()));
    let prepared = prepare_csv(path, join_field)?;
    let mut job = JoinJob::new(ctx, ctx.log.clone());
    let timestamp = chrono::Local::now().format("%Y%m%d%H%M%S").to_string();
    write_output(&mut job, &prepared, output, CSV_DEFAULT_OUTPUT, &timestamp, &ctx.log)
}

/// List `*.csv` files of a folder sorted by name.
pub fn batch_files(folder: &Path) -> JobResult<Vec<PathBuf>> {
    let entries = std::fs::read_dir(folder).map_err(|source| JobError::Folder {
        path: folder.to_path_buf(),
        source,
    })?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| {
            p.extension()
                .map(|ext| ext.eq_ignore_ascii_case("csv"))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Join every CSV file of a folder, one file at a time.
///
/// The geometry cache is shared by all files. A file that cannot be read
/// or lacks the join field is logged and skipped; sink errors abort the
/// batch. The persistent log is written to the output folder.
pub fn run_batch(folder: &Path, join_field: &str, output: &Output, ctx: &JoinContext<'_>) -> JobResult<BatchReport> {
    let workspace = JobWorkspace::create(&ctx.options.work_dir, true, ctx.options.keep_temp)?;
    let log_file = output
        .dir
        .join(format!("{}_{}", workspace.timestamp(), BATCH_LOG));
    let log = ctx
        .log
        .clone()
        .with_file(&log_file)
        .map_err(crate::error::WorkspaceError::from)?;
    log.info("Job Started");

    let files = batch_files(folder)?;
    log.info(format!("{} CSV files in {}", files.len(), folder.display()));

    let mut job = JoinJob::new(ctx, log.clone());
    let mut outcomes = Vec::with_capacity(files.len());
    for path in files {
        log.info(format!("Processing {}", path.display()));
        let prepared = match prepare_csv(&path, join_field) {
            Ok(prepared) => prepared,
            Err(e) => {
                log.error(format!("Skipping {}: {}", path.display(), e));
                outcomes.push((path, FileOutcome::Skipped { reason: e.to_string() }));
                continue;
            }
        };

        // Batch outputs never take the explicit single-output name.
        let file_output = Output::new(&output.dir);
        let report = write_output(
            &mut job,
            &prepared,
            &file_output,
            CSV_DEFAULT_OUTPUT,
            workspace.timestamp(),
            &log,
        )?;
        outcomes.push((path, FileOutcome::Completed(report)));
    }

    let stats = job.cache_stats();
    log.info(format!(
        "Job Finished: {} geography queries, {} cache hits",
        stats.queries, stats.hits
    ));
    workspace.cleanup()?;

    Ok(BatchReport {
        files: outcomes,
        log_file,
    })
}

// =============================================================================
// Inspection
// =============================================================================

/// `(id, label)` of every dimension of a PxWeb payload.
pub fn inspect_pxweb(payload: &Value) -> JobResult<Vec<(String, String)>> {
    let cube = parse_cube(payload)?;
    Ok(cube
        .dimensions
        .iter()
        .map(|d| (d.id.clone(), d.label.clone()))
        .collect())
}

/// Output fields an SDMX payload decodes to.
pub fn inspect_sdmx(payload: &Value, lang: &str) -> JobResult<Vec<FieldDescriptor>> {
    let response = parse_sdmx(payload)?;
    Ok(decode_sdmx(&response, lang)?.fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geography::GeoJsonProvider;
    use crate::logs::NoProgress;
    use crate::models::FieldValue;
    use crate::sink::MemorySink;
    use crate::transform::rules::TransformRule;
    use serde_json::json;
    use tempfile::tempdir;

    fn municipalities() -> GeoJsonProvider {
        GeoJsonProvider::from_collection(&json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": { "KOD": "K0114" },
                    "geometry": { "type": "Point", "coordinates": [17.9, 59.5] }
                },
                {
                    "type": "Feature",
                    "properties": { "KOD": "K0180" },
                    "geometry": { "type": "Point", "coordinates": [18.0, 59.3] }
                }
            ]
        }))
        .unwrap()
    }

    fn pxweb_payload() -> Value {
        json!({
            "class": "dataset",
            "label": "Population by region",
            "id": ["Region", "Tid"],
            "size": [3, 2],
            "dimension": {
                "Region": {
                    "label": "region",
                    "category": {
                        "index": { "0114": 0, "0180": 1, "9999": 2 },
                        "label": { "0114": "Upplands Väsby", "0180": "Stockholm", "9999": "Unknown" }
                    }
                },
                "Tid": { "label": "year", "category": { "index": ["2021", "2022"] } }
            },
            "value": [10, 11, 20, 21, 30, 31]
        })
    }

    fn options(work_dir: &Path) -> JobOptions {
        JobOptions {
            work_dir: work_dir.to_path_buf(),
            ..JobOptions::default()
        }
    }

    fn context<'p>(provider: &'p GeoJsonProvider, work_dir: &Path) -> JoinContext<'p> {
        let rules = RuleSet::new(vec![TransformRule::new("K", "")]);
        JoinContext::new(provider, "KOD", rules, options(work_dir)).with_log(JobLog::silent())
    }

    #[test]
    fn test_join_table_keeps_unmatched_rows() {
        let provider = municipalities();
        let work = tempdir().unwrap();
        let ctx = context(&provider, work.path());
        let prepared = prepare_pxweb(
            &pxweb_payload(),
            &PxWebJob {
                join_dimension: "region".into(),
                join_on_code: true,
            },
            &ctx.options,
        )
        .unwrap();

        let mut job = JoinJob::new(&ctx, JobLog::silent());
        let mut sink = MemorySink::new();
        let summary = job
            .join_table(&prepared.table, &prepared.join_field, &mut sink, &mut NoProgress)
            .unwrap();

        assert_eq!(summary.rows, 6);
        assert_eq!(summary.with_geometry, 4);
        assert_eq!(summary.without_geometry, 2);
        assert_eq!(sink.records.len(), 6);
        assert!(sink.records[4].geometry.is_none());
        assert!(sink.finished);
        // one query per distinct transformed key
        assert_eq!(job.cache_stats().queries, 3);
        assert_eq!(sink.shape_type, Some(ShapeType::Point));
    }

    #[test]
    fn test_web_mercator_selection() {
        let provider = municipalities();
        let work = tempdir().unwrap();
        let mut ctx = context(&provider, work.path());
        ctx.options.web_mercator = true;
        let prepared = prepare_pxweb(
            &pxweb_payload(),
            &PxWebJob {
                join_dimension: "region".into(),
                join_on_code: true,
            },
            &ctx.options,
        )
        .unwrap();

        let mut sink = MemorySink::new();
        JoinJob::new(&ctx, JobLog::silent())
            .join_table(&prepared.table, &prepared.join_field, &mut sink, &mut NoProgress)
            .unwrap();
        assert_eq!(sink.spatial_reference.unwrap().wkid, 102100);
    }

    #[test]
    fn test_missing_join_field() {
        let provider = municipalities();
        let work = tempdir().unwrap();
        let ctx = context(&provider, work.path());
        let table = Table::new(vec![FieldDescriptor::text("A", "A")]);
        let err = JoinJob::new(&ctx, JobLog::silent())
            .join_table(&table, "B", &mut MemorySink::new(), &mut NoProgress)
            .unwrap_err();
        assert!(matches!(err, JobError::JoinFieldNotFound(_)));
    }

    #[test]
    fn test_run_pxweb_writes_output_and_cleans_workspace() {
        let provider = municipalities();
        let work = tempdir().unwrap();
        let out = tempdir().unwrap();
        let ctx = context(&provider, work.path());
        let job = PxWebJob {
            join_dimension: "region".into(),
            join_on_code: true,
        };

        let report = run_pxweb(&pxweb_payload(), &job, &Output::new(out.path()), &ctx).unwrap();
        assert_eq!(report.name, "Population_by_region");
        assert!(report.output.exists());
        assert_eq!(std::fs::read_dir(work.path()).unwrap().count(), 0);

        // same name again gets the job timestamp
        let again = run_pxweb(&pxweb_payload(), &job, &Output::new(out.path()), &ctx).unwrap();
        assert!(again.name.starts_with("Population_by_region_"));
        assert_eq!(again.name.len(), "Population_by_region_".len() + 14);
    }

    #[test]
    fn test_prepare_sdmx_name_field() {
        let payload = json!({
            "data": {
                "structure": {
                    "dimensions": { "observation": [
                        { "id": "REF_AREA", "name": { "en": "Reference area" }, "keyPosition": 0,
                          "values": [ { "id": "AT", "name": { "en": "Austria" } } ] },
                        { "id": "INDICATOR", "name": { "en": "Indicator" }, "keyPosition": 1,
                          "values": [ { "id": "GDP", "name": { "en": "Gross domestic product" } } ] }
                    ] },
                    "attributes": { "observation": [] }
                },
                "dataSets": [ { "observations": { "0:0": [1.5] } } ]
            }
        });
        let job = SdmxJob {
            join_field: "ref_area_code".into(),
            name_field: Some("INDICATOR".into()),
        };
        let prepared = prepare_sdmx(&payload, &job, &JobOptions::default()).unwrap();
        assert_eq!(prepared.join_field, "REF_AREA_CODE");
        assert_eq!(prepared.suggested_name.as_deref(), Some("Gross domestic product"));
        assert_eq!(prepared.table.value(0, "OBS_VALUE"), Some(&FieldValue::Double(1.5)));
    }

    #[test]
    fn test_aliases_stripped_on_request() {
        let mut opts = JobOptions::default();
        opts.update_aliases = false;
        let prepared = prepare_pxweb(
            &pxweb_payload(),
            &PxWebJob {
                join_dimension: "region".into(),
                join_on_code: false,
            },
            &opts,
        )
        .unwrap();
        assert!(prepared.table.fields.iter().all(|f| f.alias == f.name));
        assert_eq!(prepared.join_field, "REGION");
    }

    #[test]
    fn test_batch_skips_unreadable_and_shares_cache() {
        let provider = municipalities();
        let work = tempdir().unwrap();
        let input = tempdir().unwrap();
        let out = tempdir().unwrap();
        std::fs::write(input.path().join("b_2022.csv"), "kod;value\n0114;1\n0180;2\n").unwrap();
        std::fs::write(input.path().join("a_2021.csv"), "kod;value\n0114;3\n0180;4\n").unwrap();
        std::fs::write(input.path().join("c_empty.csv"), "").unwrap();
        std::fs::write(input.path().join("notes.txt"), "ignored").unwrap();

        let ctx = context(&provider, work.path());
        let report = run_batch(input.path(), "kod", &Output::new(out.path()), &ctx).unwrap();

        let names: Vec<String> = report
            .files
            .iter()
            .map(|(p, _)| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a_2021.csv", "b_2022.csv", "c_empty.csv"]);
        assert_eq!(report.completed(), 2);
        assert_eq!(report.skipped(), 1);
        assert!(out.path().join("a_2021.geojson").exists());

        let log = std::fs::read_to_string(&report.log_file).unwrap();
        assert!(log.starts_with("DATETIME,MESSAGE"));
        assert!(log.contains("Skipping"));
        assert!(log.contains("Job Finished: 2 geography queries, 2 cache hits"));
    }

    #[test]
    fn test_inspect() {
        let dims = inspect_pxweb(&pxweb_payload()).unwrap();
        assert_eq!(dims[0], ("Region".to_string(), "region".to_string()));
        assert_eq!(dims.len(), 2);
    }
}
