use crate::config::Config;
use crate::error::{FaqKitError, Result};
use crate::faq::model::Lang;
use crate::faq::patch::{ChangeKind, ChangeRecord, PatchOutcome};
use crate::store;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Examples kept per change kind in reports and summaries.
pub const EXAMPLES_PER_KIND: usize = 5;

/// What a finished job did, written next to its output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobReport {
    pub job: String,
    pub input: String,
    pub output: Option<String>,
    pub finished_at: DateTime<Utc>,
    pub duration: Duration,
    pub items: usize,
    pub counts: BTreeMap<String, usize>,
    pub examples: BTreeMap<String, Vec<String>>,
    pub notes: Vec<String>,
    pub errors: Vec<String>,
    pub config_used: ConfigSnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    pub model: String,
    pub pivot: Option<Lang>,
    pub teaser_limit: usize,
    pub whitelist: Vec<String>,
    pub deny_list: Vec<String>,
    pub series_catalog: Option<PathBuf>,
    pub cache_path: PathBuf,
}

impl From<&Config> for ConfigSnapshot {
    fn from(config: &Config) -> Self {
        Self {
            model: config.translate.model.clone(),
            pivot: config.translate.pivot,
            teaser_limit: config.teaser.limit,
            whitelist: config.formats.whitelist.clone(),
            deny_list: config.formats.deny_list.clone(),
            series_catalog: config.patch.series_catalog.clone(),
            cache_path: config.translate.cache_path.clone(),
        }
    }
}

impl JobReport {
    pub fn new<S: Into<String>>(job: S, input: &Path, config: &Config) -> Self {
        Self {
            job: job.into(),
            input: input.display().to_string(),
            output: None,
            finished_at: Utc::now(),
            duration: Duration::ZERO,
            items: 0,
            counts: BTreeMap::new(),
            examples: BTreeMap::new(),
            notes: Vec::new(),
            errors: Vec::new(),
            config_used: ConfigSnapshot::from(config),
        }
    }

    pub fn with_output(mut self, output: &Path) -> Self {
        self.output = Some(output.display().to_string());
        self
    }

    pub fn set_count<S: Into<String>>(&mut self, key: S, value: usize) {
        self.counts.insert(key.into(), value);
    }

    pub fn count(&self, key: &str) -> usize {
        self.counts.get(key).copied().unwrap_or(0)
    }

    pub fn add_example<S: Into<String>>(&mut self, key: &str, example: S) {
        let list = self.examples.entry(key.to_string()).or_default();
        if list.len() < EXAMPLES_PER_KIND {
            list.push(example.into());
        }
    }

    pub fn note<S: Into<String>>(&mut self, note: S) {
        self.notes.push(note.into());
    }

    /// Counts per change kind plus a few examples of each.
    pub fn record_changes(&mut self, outcome: &PatchOutcome) {
        for kind in ChangeKind::ALL {
            let count = outcome.count(kind);
            if count == 0 {
                continue;
            }
            self.set_count(kind.as_str(), count);
            for change in outcome.examples(kind, EXAMPLES_PER_KIND) {
                self.add_example(kind.as_str(), describe_change(change));
            }
        }
    }

    pub fn finish(&mut self, duration: Duration) {
        self.duration = duration;
        self.finished_at = Utc::now();
    }

    pub fn has_warnings(&self) -> bool {
        !self.errors.is_empty()
    }
}

pub fn describe_change(change: &ChangeRecord) -> String {
    format!(
        "#{} {}: {} -> {}",
        change.index,
        change.field,
        preview(&change.original, 60),
        preview(&change.patched, 60)
    )
}

fn preview(text: &str, limit: usize) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() <= limit {
        flat
    } else {
        let cut: String = flat.chars().take(limit).collect();
        format!("{}…", cut)
    }
}

/// Writes the report, text summary and change log beside a job's output file.
pub struct ReportWriter {
    output: PathBuf,
    force_overwrite: bool,
}

impl ReportWriter {
    pub fn new<P: Into<PathBuf>>(output: P) -> Self {
        Self {
            output: output.into(),
            force_overwrite: false,
        }
    }

    pub fn with_force_overwrite(mut self, force: bool) -> Self {
        self.force_overwrite = force;
        self
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Refuse to clobber an existing output unless forced.
    pub fn check_output(&self) -> Result<()> {
        if self.output.exists() && !self.force_overwrite {
            return Err(FaqKitError::OutputExists {
                path: self.output.display().to_string(),
            });
        }
        Ok(())
    }

    pub fn report_json_path(&self) -> PathBuf {
        self.sibling("report.json")
    }

    pub fn report_text_path(&self) -> PathBuf {
        self.sibling("report.txt")
    }

    pub fn change_log_path(&self) -> PathBuf {
        self.sibling("changes.csv")
    }

    /// `<dir>/<stem>.<suffix>` next to the output file.
    pub fn sibling(&self, suffix: &str) -> PathBuf {
        let stem = self
            .output
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "faqkit".to_string());
        self.output.with_file_name(format!("{}.{}", stem, suffix))
    }

    pub fn save_report(&self, report: &JobReport) -> Result<()> {
        store::write_json(&self.report_json_path(), report)?;
        store::write_atomic(&self.report_text_path(), render_text(report).as_bytes())
    }

    pub fn save_change_log(&self, changes: &[ChangeRecord]) -> Result<PathBuf> {
        let path = self.change_log_path();
        store::write_csv_records(&path, changes)?;
        Ok(path)
    }
}

pub fn render_text(report: &JobReport) -> String {
    let mut out = String::new();
    let title = format!("faqkit {} report", report.job);

    // Writing into a String cannot fail.
    let _ = writeln!(out, "{}", title);
    let _ = writeln!(out, "{}", "=".repeat(title.chars().count()));
    let _ = writeln!(out);
    let _ = writeln!(out, "Input: {}", report.input);
    if let Some(ref output) = report.output {
        let _ = writeln!(out, "Output: {}", output);
    }
    let _ = writeln!(
        out,
        "Finished: {}",
        report.finished_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(out, "Duration: {:.1}s", report.duration.as_secs_f64());
    let _ = writeln!(out, "Items: {}", report.items);
    let _ = writeln!(out);

    if !report.counts.is_empty() {
        let _ = writeln!(out, "Counts:");
        for (key, count) in &report.counts {
            let _ = writeln!(out, "  {}: {}", key, count);
            if let Some(examples) = report.examples.get(key) {
                for example in examples {
                    let _ = writeln!(out, "    - {}", example);
                }
            }
        }
        let _ = writeln!(out);
    }

    if !report.notes.is_empty() {
        let _ = writeln!(out, "Notes:");
        for note in &report.notes {
            let _ = writeln!(out, "  - {}", note);
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "Configuration used:");
    let _ = writeln!(out, "  Model: {}", report.config_used.model);
    if let Some(pivot) = report.config_used.pivot {
        let _ = writeln!(out, "  Pivot: {}", pivot);
    }
    let _ = writeln!(out, "  Teaser limit: {}", report.config_used.teaser_limit);
    let _ = writeln!(out, "  Whitelist: {}", report.config_used.whitelist.join(", "));
    let _ = writeln!(out, "  Deny-list: {}", report.config_used.deny_list.join(", "));
    if let Some(ref catalog) = report.config_used.series_catalog {
        let _ = writeln!(out, "  Series catalog: {}", catalog.display());
    }

    if !report.errors.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Errors encountered:");
        for error in &report.errors {
            let _ = writeln!(out, "  - {}", error);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::faq::model::{FaqEntry, FaqRecord};
    use std::fs;
    use tempfile::TempDir;

    fn change(kind: ChangeKind, index: usize) -> ChangeRecord {
        ChangeRecord {
            index,
            lang: Lang::En,
            field: "answer_en".to_string(),
            kind,
            original: "60 x 60 cm".to_string(),
            patched: "60x60 cm".to_string(),
        }
    }

    #[test]
    fn test_sibling_paths() {
        let writer = ReportWriter::new("/tmp/out/faq_patched.json");
        assert_eq!(
            writer.report_json_path(),
            PathBuf::from("/tmp/out/faq_patched.report.json")
        );
        assert_eq!(
            writer.change_log_path(),
            PathBuf::from("/tmp/out/faq_patched.changes.csv")
        );
    }

    #[test]
    fn test_record_changes_caps_examples() {
        let outcome = PatchOutcome {
            records: vec![FaqRecord::swedish(FaqEntry::new("Fråga", "Svar"))],
            changes: (0..8).map(|i| change(ChangeKind::FormatNormalized, i)).collect(),
            removed: 0,
        };

        let mut report = JobReport::new("patch", Path::new("faq.json"), &Config::default());
        report.record_changes(&outcome);

        assert_eq!(report.count("FORMAT_NORMALIZED"), 8);
        assert_eq!(report.examples["FORMAT_NORMALIZED"].len(), EXAMPLES_PER_KIND);
        assert!(!report.counts.contains_key("MISSING"));
    }

    #[test]
    fn test_existing_output_needs_force() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("out.json");
        fs::write(&output, "[]").unwrap();

        let writer = ReportWriter::new(&output);
        assert!(matches!(
            writer.check_output(),
            Err(FaqKitError::OutputExists { .. })
        ));
        assert!(ReportWriter::new(&output)
            .with_force_overwrite(true)
            .check_output()
            .is_ok());
    }

    #[test]
    fn test_save_report_and_change_log() {
        let dir = TempDir::new().unwrap();
        let writer = ReportWriter::new(dir.path().join("faq.json"));

        let mut report = JobReport::new("formats", Path::new("in.json"), &Config::default());
        report.items = 3;
        report.set_count("INVALID_ROW", 1);
        report.errors.push("row 2 dropped".to_string());
        report.finish(Duration::from_millis(1500));
        writer.save_report(&report).unwrap();

        let text = fs::read_to_string(writer.report_text_path()).unwrap();
        assert!(text.starts_with("faqkit formats report"));
        assert!(text.contains("INVALID_ROW: 1"));
        assert!(text.contains("Errors encountered:"));

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(writer.report_json_path()).unwrap()).unwrap();
        assert_eq!(json["items"], 3);

        let path = writer
            .save_change_log(&[change(ChangeKind::InvalidFormat, 4)])
            .unwrap();
        let csv = fs::read_to_string(path).unwrap();
        assert!(csv.starts_with("Index,Lang,Field,ChangeType,Original,Patched"));
        assert!(csv.contains("4,en,answer_en,INVALID_FORMAT,60 x 60 cm,60x60 cm"));
    }
}
