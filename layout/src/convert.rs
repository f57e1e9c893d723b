//! File workflows: single-file conversion, parallel batch conversion and
//! validation of stored schemas.

use std::collections::{BTreeMap, BTreeSet};
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};

use copybook_schema_core::{
    FieldNode, LayoutPackage, NamedLayout, RecordSchema, SCHEMA_CONTRACT_VERSION, validate_package,
    validate_record,
};

use crate::config::ConvertConfig;
use crate::error::{ConvertError, Result};
use crate::output::{OutputFormat, format_fields, format_record};
use crate::report::{FailureCode, LayoutReport, LayoutReportBundle};
use crate::{LayoutRun, parse_copybook_with_report};

/// File name of the batch report written next to converted schemas.
pub const REPORT_FILE_NAME: &str = "conversion-report.json";

/// One converted copybook.
#[derive(Debug, Clone)]
pub struct ConvertedFile {
    pub input: PathBuf,
    pub output: PathBuf,
    pub run: LayoutRun,
}

/// Aggregated output from a batch conversion.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// Package containing every successfully converted record.
    pub package: LayoutPackage,
    /// Schema files written, in input order.
    pub written: Vec<PathBuf>,
    /// Copybook names that failed conversion.
    pub failures: Vec<String>,
    /// Non-fatal warnings, prefixed with the copybook name.
    pub warnings: Vec<String>,
    /// Per-copybook reports.
    pub reports: Vec<LayoutReport>,
}

/// Name of a copybook: its file name up to the first `.`.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use copybook_schema_layout::convert::copybook_name;
///
/// assert_eq!(copybook_name(Path::new("in/CUSTREC.v2.cpy")), "CUSTREC");
/// ```
pub fn copybook_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy())
        .and_then(|name| name.split('.').next().map(str::to_string))
        .unwrap_or_default()
}

/// Output path for a copybook: `<output_dir>/<name>.<format extension>`.
pub fn output_path_for(input: &Path, output_dir: &Path, format: OutputFormat) -> PathBuf {
    output_dir.join(format!("{}.{}", copybook_name(input), format.extension()))
}

/// Picks the copybook to convert from `dir`: the first regular file by name.
///
/// # Errors
///
/// Returns [`ConvertError::InvalidInput`] when the directory holds no files.
pub fn locate_input_file(dir: &Path) -> Result<PathBuf> {
    if !dir.is_dir() {
        return Err(ConvertError::InvalidInput(format!(
            "Input directory '{}' does not exist",
            dir.display()
        )));
    }

    let mut files = BTreeSet::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() {
            files.insert(path);
        }
    }

    let mut files = files.into_iter();
    let Some(first) = files.next() else {
        return Err(ConvertError::InvalidInput(format!(
            "No copybook found in '{}'",
            dir.display()
        )));
    };

    let skipped = files.count();
    if skipped > 0 {
        warn!(
            dir = %dir.display(),
            selected = %first.display(),
            skipped,
            "Input directory holds several files; converting the first"
        );
    }

    Ok(first)
}

/// Reads copybook text, replacing invalid UTF-8 sequences.
pub fn read_copybook(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Renders a schema for writing: the `data` array, or the whole record when
/// `envelope` is set.
pub fn render_schema(record: &RecordSchema, format: OutputFormat, envelope: bool) -> Result<String> {
    let rendered = if envelope {
        format_record(record, format)
    } else {
        format_fields(&record.data, format)
    };
    rendered.map_err(ConvertError::InvalidInput)
}

fn write_schema(record: &RecordSchema, output: &Path, config: &ConvertConfig) -> Result<()> {
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }
    let rendered = render_schema(record, config.format, config.envelope)?;
    fs::write(output, rendered)?;
    Ok(())
}

/// Converts one copybook file and writes its schema into the configured
/// output directory.
///
/// An empty layout is still written (as an empty array); its report carries
/// [`FailureCode::EmptyLayout`].
pub fn convert_file(input: &Path, config: &ConvertConfig) -> Result<ConvertedFile> {
    let text = read_copybook(input)?;
    let run = parse_copybook_with_report(&copybook_name(input), &text, &config.layout_options());
    let output = output_path_for(input, &config.output_dir, config.format);
    write_schema(&run.record, &output, config)?;

    info!(
        input = %input.display(),
        output = %output.display(),
        fields = run.report.field_count,
        record_length = run.report.record_length,
        "Converted copybook"
    );

    Ok(ConvertedFile {
        input: input.to_path_buf(),
        output,
        run,
    })
}

/// Converts the copybook found in the configured input directory.
pub fn convert_input_dir(config: &ConvertConfig) -> Result<ConvertedFile> {
    let input = locate_input_file(&config.input_dir)?;
    convert_file(&input, config)
}

/// Collects copybook paths from files and/or directories.
///
/// Directory entries are filtered by the configured extensions; files named
/// explicitly are taken as they are. The result is sorted and deduplicated.
pub fn collect_copybook_paths(inputs: &[PathBuf], config: &ConvertConfig) -> Result<Vec<PathBuf>> {
    if inputs.is_empty() {
        return Err(ConvertError::InvalidInput(
            "No copybook paths were provided".to_string(),
        ));
    }

    let mut paths = BTreeSet::new();

    for input in inputs {
        if input.is_dir() {
            for entry in fs::read_dir(input)? {
                let path = entry?.path();
                if path.is_file() && config.accepts(&path) {
                    paths.insert(path);
                }
            }
            continue;
        }

        if input.is_file() {
            paths.insert(input.clone());
            continue;
        }

        return Err(ConvertError::InvalidInput(format!(
            "Copybook path '{}' does not exist",
            input.display()
        )));
    }

    if paths.is_empty() {
        return Err(ConvertError::InvalidInput(format!(
            "No copybooks with extensions [{}] found in provided paths",
            config.extensions.join(", ")
        )));
    }

    Ok(paths.into_iter().collect())
}

/// Converts many copybooks in parallel.
///
/// Results are ordered by input path whatever the job count. Every schema
/// file is written regardless of its report; only successful records enter
/// the package.
///
/// # Errors
///
/// Returns [`ConvertError::InvalidInput`] when two inputs map to the same
/// copybook name, and [`ConvertError::ThreadPool`] when the worker pool
/// cannot be started. Per-file failures are reported, not returned.
pub fn convert_batch(paths: &[PathBuf], config: &ConvertConfig, version: &str) -> Result<BatchOutcome> {
    let mut names: BTreeMap<String, &Path> = BTreeMap::new();
    for path in paths {
        let name = copybook_name(path);
        if let Some(previous) = names.insert(name.clone(), path) {
            return Err(ConvertError::InvalidInput(format!(
                "Copybooks '{}' and '{}' share the name '{name}'",
                previous.display(),
                path.display()
            )));
        }
    }

    let results: Vec<(PathBuf, BatchItem)> = {
        use rayon::prelude::*;
        let jobs = config
            .jobs
            .filter(|jobs| *jobs > 0)
            .unwrap_or_else(|| default_parallel_jobs(paths.len()));
        let pool = rayon::ThreadPoolBuilder::new().num_threads(jobs).build()?;

        pool.install(|| {
            paths
                .par_iter()
                .map(|path| (path.clone(), convert_one(path, config)))
                .collect()
        })
    };

    // Sort by input path for deterministic output.
    let mut sorted_results = results;
    sorted_results.sort_by(|(a, _), (b, _)| a.cmp(b));

    let mut package = LayoutPackage::new(version, Utc::now().to_rfc3339());
    let mut written = Vec::new();
    let mut failures = Vec::new();
    let mut warnings = Vec::new();
    let mut reports = Vec::new();

    for (_, item) in sorted_results {
        let report = item.report;
        let name = report.copybook.clone();

        if let Some(output) = item.output {
            written.push(output);
        }
        match item.record {
            Some(record) if report.success => {
                package.layouts.push(NamedLayout::new(name.clone(), record));
            }
            _ => failures.push(name.clone()),
        }

        warnings.extend(
            report
                .warnings
                .iter()
                .map(|warning| format!("{name}: {warning}")),
        );
        reports.push(report);
    }

    info!(
        converted = package.layout_count(),
        failed = failures.len(),
        "Batch conversion finished"
    );

    Ok(BatchOutcome {
        package,
        written,
        failures,
        warnings,
        reports,
    })
}

struct BatchItem {
    report: LayoutReport,
    record: Option<RecordSchema>,
    output: Option<PathBuf>,
}

fn convert_one(path: &Path, config: &ConvertConfig) -> BatchItem {
    let name = copybook_name(path);
    let text = match read_copybook(path) {
        Ok(text) => text,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "Could not read copybook");
            return BatchItem {
                report: LayoutReport::failed(name, FailureCode::ReadFailed, err.to_string()),
                record: None,
                output: None,
            };
        }
    };

    let LayoutRun { record, mut report } =
        parse_copybook_with_report(&name, &text, &config.layout_options());
    let output = output_path_for(path, &config.output_dir, config.format);

    match write_schema(&record, &output, config) {
        Ok(()) => BatchItem {
            report,
            record: Some(record),
            output: Some(output),
        },
        Err(err) => {
            warn!(path = %output.display(), error = %err, "Could not write schema");
            report.fail(FailureCode::WriteFailed, err.to_string());
            BatchItem {
                report,
                record: None,
                output: None,
            }
        }
    }
}

fn default_parallel_jobs(copybook_count: usize) -> usize {
    let cpu_count = std::thread::available_parallelism()
        .map(|parallelism| parallelism.get())
        .unwrap_or(4);
    cpu_count.min(8).max(1).min(copybook_count.max(1))
}

/// Summarizes failure code distribution from conversion reports.
pub fn failure_code_summary(reports: &[LayoutReport]) -> Vec<(FailureCode, usize)> {
    let mut counts: BTreeMap<String, (FailureCode, usize)> = BTreeMap::new();
    for report in reports {
        if let Some(code) = report.failure_code {
            counts
                .entry(code.to_string())
                .and_modify(|(_, count)| *count += 1)
                .or_insert((code, 1));
        }
    }
    counts.into_values().collect()
}

/// Builds a serializable bundle report for a batch run.
pub fn build_report_bundle(
    version: &str,
    reports: Vec<LayoutReport>,
    failures: Vec<String>,
) -> LayoutReportBundle {
    LayoutReportBundle {
        schema_version: Some(SCHEMA_CONTRACT_VERSION.to_string()),
        generated_at: Utc::now().to_rfc3339(),
        version: version.to_string(),
        reports,
        failures,
    }
}

/// Validates a package and names it, ready to be written as a bundle.
pub fn finalize_package(
    mut package: LayoutPackage,
    name: Option<String>,
    description: Option<String>,
) -> Result<LayoutPackage> {
    package.name = name;
    package.description = description;

    let errors = validate_package(&package);
    if let Some(first) = errors.first() {
        return Err(ConvertError::Validation(format!(
            "Layout package validation failed: {first}"
        )));
    }

    Ok(package)
}

/// Collects schema JSON paths from files and/or directories, skipping batch
/// reports.
pub fn collect_schema_paths(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    if inputs.is_empty() {
        return Err(ConvertError::InvalidInput(
            "No schema paths were provided".to_string(),
        ));
    }

    let mut paths = BTreeSet::new();

    for input in inputs {
        if input.is_dir() {
            for entry in fs::read_dir(input)? {
                let path = entry?.path();
                let is_json = path.extension() == Some(OsStr::new("json"));
                let is_report = path.file_name() == Some(OsStr::new(REPORT_FILE_NAME));
                if is_json && !is_report {
                    paths.insert(path);
                }
            }
            continue;
        }

        if input.is_file() {
            if input.extension() != Some(OsStr::new("json")) {
                return Err(ConvertError::InvalidInput(format!(
                    "Schema file '{}' must end in .json",
                    input.display()
                )));
            }
            paths.insert(input.clone());
            continue;
        }

        return Err(ConvertError::InvalidInput(format!(
            "Schema path '{}' does not exist",
            input.display(),
        )));
    }

    if paths.is_empty() {
        return Err(ConvertError::InvalidInput(
            "No schema JSON files found in provided paths".to_string(),
        ));
    }

    Ok(paths.into_iter().collect())
}

/// Stored schema: the full record envelope or its bare `data` array.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredSchema {
    Record(RecordSchema),
    Fields(Vec<FieldNode>),
}

/// Loads one stored schema.
///
/// A bare `data` array gets a record range derived from its fields.
pub fn load_schema_file(path: &Path) -> Result<RecordSchema> {
    let raw = fs::read_to_string(path)?;
    let record = match serde_json::from_str(&raw)? {
        StoredSchema::Record(record) => record,
        StoredSchema::Fields(data) => {
            let start = data.first().map_or(0, |field| field.start);
            let end = data
                .iter()
                .filter(|field| !field.is_redefinition())
                .map(FieldNode::end)
                .max()
                .unwrap_or(start);
            RecordSchema {
                data,
                start,
                length: end.saturating_sub(start),
            }
        }
    };
    Ok(record)
}

/// Loads and validates stored schemas, failing on the first invalid one.
pub fn load_and_validate_schemas(paths: &[PathBuf]) -> Result<Vec<RecordSchema>> {
    let mut records = Vec::with_capacity(paths.len());

    for path in paths {
        let record = load_schema_file(path)?;

        let errors = validate_record(&record);
        if let Some(first) = errors.first() {
            return Err(ConvertError::Validation(format!(
                "Schema validation failed for '{}': {first}",
                path.display()
            )));
        }

        records.push(record);
    }

    Ok(records)
}
