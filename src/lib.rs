pub mod cli;
pub mod config;
pub mod error;
pub mod faq;
pub mod normalize;
pub mod report;
pub mod store;
pub mod translate;
pub mod ui;

// Public API re-exports
pub use cli::{Cli, Command, OutputFormat};
pub use config::{CliOverrides, Config};
pub use error::{FaqKitError, Result, UserFriendlyError};

pub use faq::{
    ChangeKind, FaqPatcher, FaqRecord, KeywordMatcher, KeywordRecord, Lang, PatchOutcome,
    SanityReport, SeriesCatalog,
};
pub use normalize::{FormatNormalizer, KeywordList, KeywordNormalizer};
pub use report::{JobReport, ReportWriter};
pub use translate::{
    ChatCompletionsBackend, Source, TranslationBackend, TranslationCache, Translator,
};
pub use ui::{GracefulShutdown, OutputFormatter, OutputMode, ProgressManager};

use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Runs the batch jobs with shared config, console output and Ctrl+C handling.
pub struct FaqKit {
    config: Config,
    output_formatter: OutputFormatter,
    progress_manager: ProgressManager,
    shutdown: GracefulShutdown,
    force: bool,
}

impl FaqKit {
    pub fn new(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Result<Self> {
        let output_formatter = OutputFormatter::new(output_mode, verbose, quiet);
        let progress_manager = ProgressManager::new(!quiet && output_mode == OutputMode::Human);
        let shutdown = GracefulShutdown::new()?;

        Ok(Self {
            config,
            output_formatter,
            progress_manager,
            shutdown,
            force: false,
        })
    }

    /// No signal handler and no progress bars.
    pub fn new_for_test(config: Config) -> Self {
        Self {
            config,
            output_formatter: OutputFormatter::new(OutputMode::Plain, 0, true),
            progress_manager: ProgressManager::new(false),
            shutdown: GracefulShutdown::new_for_test(),
            force: false,
        }
    }

    pub fn from_cli(cli_args: &Cli) -> Result<Self> {
        let config = cli_args.load_config()?;
        let output_mode = match cli_args.output_format {
            OutputFormat::Human => OutputMode::Human,
            OutputFormat::Json => OutputMode::Json,
            OutputFormat::Plain => OutputMode::Plain,
        };

        Ok(Self::new(config, output_mode, cli_args.verbose, cli_args.quiet)?
            .with_force_overwrite(cli_args.force))
    }

    pub fn with_force_overwrite(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Dispatch one CLI subcommand to its job.
    pub fn run(&self, command: &Command) -> Result<JobReport> {
        match command {
            Command::Keywords {
                input,
                output,
                merge,
                ..
            } => self.normalize_keywords(input, output, merge.as_deref()),
            Command::KeywordsTranslate {
                input,
                output,
                targets,
                synonyms,
                ..
            } => self.translate_keywords(input, output, &targets_or_default(targets), *synonyms),
            Command::KeywordsMatch {
                lookup,
                faq,
                output,
            } => self.match_keywords(lookup, faq, output),
            Command::Patch { input, output, .. } => self.patch(input, output),
            Command::Formats { input, output, .. } => self.formats(input, output),
            Command::Translate {
                input,
                output,
                targets,
                overwrite,
                ..
            } => self.translate(input, output, &targets_or_default(targets), *overwrite),
            Command::Shorten {
                input,
                output,
                langs,
                ..
            } => self.shorten(input, output, &langs_or_all(langs)),
            Command::SeriesBuild { input, output } => self.series_build(input, output),
            Command::SeriesFacit { input, output, .. } => self.series_facit(input, output),
            Command::Sanity { input, autofix } => self.sanity(input, autofix.as_deref()),
            Command::MergeCache { old, new, output } => self.merge_cache(old, new, output),
        }
    }

    /// Normalize and dedupe a keyword column, optionally merged into an
    /// existing list. Writes the list, its size variants and pedestal log.
    pub fn normalize_keywords(&self, input: &Path, output: &Path, merge_with: Option<&Path>) -> Result<JobReport> {
        let start = Instant::now();
        self.shutdown.check_shutdown()?;
        let writer = self.writer(output)?;

        self.output_formatter.start_operation("Normalizing keywords");
        let words = read_keywords(input, &self.config.keywords.column)?;
        info!(input = %input.display(), words = words.len(), "read keywords");

        let normalizer = KeywordNormalizer::new(&self.config.keywords, &self.config.formats.unit);
        let list = match merge_with {
            Some(existing) => {
                let old = read_keywords(existing, &self.config.keywords.column)?;
                self.output_formatter
                    .info(&format!("Merging into {} existing keywords", old.len()));
                normalizer.merge(&old, &words)
            }
            None => normalizer.dedupe(&words),
        };
        self.shutdown.check_shutdown()?;

        write_keywords(output, &self.config.keywords.column, &list.words)?;
        if !list.size_variants.is_empty() {
            store::write_json(&writer.sibling("size_variants.json"), &list.size_variants)?;
        }
        if !list.pedestal_conversions.is_empty() {
            store::write_csv_records(&writer.sibling("pedestals.csv"), &list.pedestal_conversions)?;
        }

        let mut report = JobReport::new("keywords", input, &self.config).with_output(output);
        report.items = words.len();
        report.set_count("kept", list.len());
        report.set_count("dropped", list.dropped);
        report.set_count("duplicates", list.duplicates);
        report.set_count("pedestal_conversions", list.pedestal_conversions.len());
        report.set_count("size_variants", list.size_variants.len());
        for conversion in &list.pedestal_conversions {
            report.add_example(
                "pedestal_conversions",
                format!("{} -> {}", conversion.original, conversion.normalized),
            );
        }

        self.finish(&writer, report, start)
    }

    pub fn translate_keywords(&self, input: &Path, output: &Path, targets: &[Lang], synonyms: bool) -> Result<JobReport> {
        let backend = ChatCompletionsBackend::from_env(&self.config.translate)?;
        self.translate_keywords_with(backend, input, output, targets, synonyms)
    }

    /// Translate a keyword list and derive CHECK, category and domain flags.
    /// With `synonyms`, every translation also gets up to three synonyms.
    pub fn translate_keywords_with<B: TranslationBackend>(
        &self,
        backend: B,
        input: &Path,
        output: &Path,
        targets: &[Lang],
        synonyms: bool,
    ) -> Result<JobReport> {
        let start = Instant::now();
        self.shutdown.check_shutdown()?;
        let writer = self.writer(output)?;

        let words = read_keywords(input, &self.config.keywords.column)?;
        let mut translator = self.translator(backend)?;

        self.output_formatter
            .start_operation(&format!("Translating {} keywords", words.len()));
        let pb = self
            .progress_manager
            .create_item_progress(words.len() as u64, "keywords");
        let records = translator.translate_keywords(&words, targets, synonyms, |_| {
            pb.inc(1);
            self.shutdown.check_shutdown()
        })?;
        ui::progress::finish_progress_with_summary(
            &pb,
            &format!("Translated {} keywords", records.len()),
            start.elapsed(),
        );

        store::write_json(output, &records)?;

        let mut report = JobReport::new("keywords-translate", input, &self.config).with_output(output);
        report.items = records.len();
        let need_check: Vec<&KeywordRecord> = records
            .iter()
            .filter(|r| r.check == faq::CheckFlag::NeedCheck)
            .collect();
        report.set_count("need_check", need_check.len());
        report.set_count("domain", records.iter().filter(|r| r.domain).count());
        for record in need_check {
            report.add_example("need_check", record.se.clone());
        }
        for category in [
            faq::Category::Delivery,
            faq::Category::Maintenance,
            faq::Category::Product,
            faq::Category::Other,
        ] {
            let count = records.iter().filter(|r| r.category == category).count();
            report.set_count(format!("category:{}", category), count);
        }
        record_translation_stats(&mut report, translator.stats());

        self.finish(&writer, report, start)
    }

    /// Report which lookup keywords occur in each FAQ question.
    pub fn match_keywords(&self, lookup: &Path, faq_path: &Path, output: &Path) -> Result<JobReport> {
        let start = Instant::now();
        self.shutdown.check_shutdown()?;
        let writer = self.writer(output)?;

        self.output_formatter.start_operation("Matching keywords against FAQ questions");
        let keywords: Vec<KeywordRecord> = store::read_json(lookup)?;
        let records: Vec<FaqRecord> = store::read_json(faq_path)?;

        let matcher = KeywordMatcher::new(&keywords)?;
        let matches = matcher.match_faq(&records);
        store::write_json(output, &matches)?;

        let mut report = JobReport::new("keywords-match", faq_path, &self.config).with_output(output);
        report.items = matches.len();
        for lang in Lang::ALL {
            let hits = matches.iter().filter(|m| m.lang == lang && m.count > 0).count();
            let total = matches.iter().filter(|m| m.lang == lang).count();
            if total > 0 {
                report.set_count(format!("matched:{}", lang), hits);
                report.note(format!(
                    "{}: {} of {} questions contain a lookup keyword ({} keywords)",
                    lang.code().to_uppercase(),
                    hits,
                    total,
                    matcher.keyword_count(lang)
                ));
            }
        }

        self.finish(&writer, report, start)
    }

    /// Full patch pass: missing, product names, teaser, formats, series.
    pub fn patch(&self, input: &Path, output: &Path) -> Result<JobReport> {
        let start = Instant::now();
        self.shutdown.check_shutdown()?;
        let writer = self.writer(output)?;

        self.output_formatter.start_operation("Patching FAQ");
        let records: Vec<FaqRecord> = store::read_json(input)?;
        let patcher = FaqPatcher::new(&self.config, self.load_catalog()?);

        let total = records.len();
        let outcome = patcher.patch_all(records);
        self.shutdown.check_shutdown()?;

        store::write_json(output, &outcome.records)?;
        let log = writer.save_change_log(&outcome.changes)?;

        let mut report = JobReport::new("patch", input, &self.config).with_output(output);
        report.items = total;
        report.record_changes(&outcome);
        report.note(format!("Change log: {}", log.display()));

        self.finish(&writer, report, start)
    }

    /// Format-only pass. Records left with nothing but invalid formats are removed.
    pub fn formats(&self, input: &Path, output: &Path) -> Result<JobReport> {
        let start = Instant::now();
        self.shutdown.check_shutdown()?;
        let writer = self.writer(output)?;

        self.output_formatter.start_operation("Normalizing formats");
        let records: Vec<FaqRecord> = store::read_json(input)?;
        let patcher = FaqPatcher::new(&self.config, self.load_catalog()?);

        let total = records.len();
        let outcome = patcher.formats_only(records);

        store::write_json(output, &outcome.records)?;
        let log = writer.save_change_log(&outcome.changes)?;

        let mut report = JobReport::new("formats", input, &self.config).with_output(output);
        report.items = total;
        report.record_changes(&outcome);
        report.set_count("removed", outcome.removed);
        report.note(format!("Change log: {}", log.display()));

        self.finish(&writer, report, start)
    }

    pub fn translate(&self, input: &Path, output: &Path, targets: &[Lang], overwrite: bool) -> Result<JobReport> {
        let backend = ChatCompletionsBackend::from_env(&self.config.translate)?;
        self.translate_with(backend, input, output, targets, overwrite)
    }

    /// Fill EN/DA/DE entries from Swedish, going through the pivot if one is set.
    pub fn translate_with<B: TranslationBackend>(
        &self,
        backend: B,
        input: &Path,
        output: &Path,
        targets: &[Lang],
        overwrite: bool,
    ) -> Result<JobReport> {
        let start = Instant::now();
        self.shutdown.check_shutdown()?;
        let writer = self.writer(output)?;

        let mut records: Vec<FaqRecord> = store::read_json(input)?;
        let mut translator = self.translator(backend)?;
        let pivot = self.config.translate.pivot;

        self.output_formatter.start_operation(&format!(
            "Translating {} records into {}",
            records.len(),
            targets
                .iter()
                .map(|l| l.code().to_uppercase())
                .collect::<Vec<_>>()
                .join(", ")
        ));
        if let Some(pivot) = pivot {
            self.output_formatter
                .info(&format!("Using {} as pivot language", pivot.display_name()));
        }

        let pb = self
            .progress_manager
            .create_item_progress(records.len() as u64, "records");
        let filled = translator.translate_faq(&mut records, targets, pivot, overwrite, |_| {
            pb.inc(1);
            self.shutdown.check_shutdown()
        })?;
        ui::progress::finish_progress_with_summary(
            &pb,
            &format!("Filled {} fields", filled),
            start.elapsed(),
        );

        store::write_json(output, &records)?;

        let mut report = JobReport::new("translate", input, &self.config).with_output(output);
        report.items = records.len();
        report.set_count("fields_filled", filled);
        record_translation_stats(&mut report, translator.stats());
        if let Some(path) = translator.cache().path() {
            report.note(format!(
                "Cache: {} ({} entries)",
                path.display(),
                translator.cache().len()
            ));
        }

        self.finish(&writer, report, start)
    }

    pub fn shorten(&self, input: &Path, output: &Path, langs: &[Lang]) -> Result<JobReport> {
        let backend = ChatCompletionsBackend::from_env(&self.config.translate)?;
        self.shorten_with(backend, input, output, langs)
    }

    /// Ask the model to shorten questions and answers past the configured
    /// length. Every shortened field goes to the change log.
    pub fn shorten_with<B: TranslationBackend>(
        &self,
        backend: B,
        input: &Path,
        output: &Path,
        langs: &[Lang],
    ) -> Result<JobReport> {
        let start = Instant::now();
        self.shutdown.check_shutdown()?;
        let writer = self.writer(output)?;

        let mut records: Vec<FaqRecord> = store::read_json(input)?;
        let mut translator = self.translator(backend)?;
        let max_len = self.config.translate.shorten_max_len;

        self.output_formatter.start_operation(&format!(
            "Shortening texts longer than {} characters in {} records",
            max_len,
            records.len()
        ));
        let pb = self
            .progress_manager
            .create_item_progress(records.len() as u64, "records");
        let changes = translator.shorten_faq(&mut records, langs, max_len, |_| {
            pb.inc(1);
            self.shutdown.check_shutdown()
        })?;
        ui::progress::finish_progress_with_summary(
            &pb,
            &format!("Shortened {} fields", changes.len()),
            start.elapsed(),
        );

        store::write_json(output, &records)?;
        let total = records.len();
        let outcome = PatchOutcome {
            records,
            changes,
            removed: 0,
        };
        let log = writer.save_change_log(&outcome.changes)?;

        let mut report = JobReport::new("shorten", input, &self.config).with_output(output);
        report.items = total;
        report.record_changes(&outcome);
        record_translation_stats(&mut report, translator.stats());
        report.note(format!("Change log: {}", log.display()));

        self.finish(&writer, report, start)
    }

    /// Build a series catalog from a product map keyed `"Serie Färg"`.
    pub fn series_build(&self, input: &Path, output: &Path) -> Result<JobReport> {
        let start = Instant::now();
        self.shutdown.check_shutdown()?;
        let writer = self.writer(output)?;

        self.output_formatter.start_operation("Building series catalog");
        let raw: serde_json::Map<String, serde_json::Value> = store::read_json(input)?;
        let catalog = SeriesCatalog::from_color_keys(&raw)?;
        catalog.save(output)?;

        let mut report = JobReport::new("series-build", input, &self.config).with_output(output);
        report.items = raw.len();
        report.set_count("series", catalog.len());
        for series in catalog.iter() {
            report.add_example(
                "series",
                format!(
                    "{}: {} formats, {} colors",
                    series.name,
                    series.formats.len(),
                    series.colors.len()
                ),
            );
        }

        self.finish(&writer, report, start)
    }

    /// Rewrite Swedish answers to series questions with the catalog's
    /// reference answer. Color and format questions naming no known series
    /// are reported as warnings.
    pub fn series_facit(&self, input: &Path, output: &Path) -> Result<JobReport> {
        let start = Instant::now();
        self.shutdown.check_shutdown()?;
        let writer = self.writer(output)?;

        self.output_formatter.start_operation("Rewriting series answers");
        let records: Vec<FaqRecord> = store::read_json(input)?;
        let patcher = FaqPatcher::new(&self.config, self.load_catalog()?);

        let total = records.len();
        let facit = patcher.apply_facit(records)?;

        store::write_json(output, &facit.patched.records)?;
        let log = writer.save_change_log(&facit.patched.changes)?;

        let mut report = JobReport::new("series-facit", input, &self.config).with_output(output);
        report.items = total;
        report.record_changes(&facit.patched);
        report.set_count("unmatched", facit.unmatched.len());
        report
            .errors
            .extend(facit.unmatched.iter().map(|q| format!("No series found for: {}", q)));
        report.note(format!("Change log: {}", log.display()));

        self.finish(&writer, report, start)
    }

    /// Sanity report. With `autofix_output`, the fixed dataset is written there
    /// and the report describes what is left after fixing.
    pub fn sanity(&self, input: &Path, autofix_output: Option<&Path>) -> Result<JobReport> {
        let start = Instant::now();
        self.shutdown.check_shutdown()?;

        self.output_formatter.start_operation("Checking FAQ sanity");
        let records: Vec<FaqRecord> = store::read_json(input)?;
        let total = records.len();
        let before = faq::sanity::check(&records);

        let mut report = JobReport::new("sanity", input, &self.config);
        report.items = total;
        report.set_count("issues_found", before.issue_count());

        let (writer, remaining) = match autofix_output {
            Some(output) => {
                let writer = self.writer(output)?;
                let fixed = faq::sanity::autofix(records);
                store::write_json(output, &fixed.records)?;

                report.output = Some(output.display().to_string());
                report.set_count("capitalized", fixed.capitalized);
                report.set_count("duplicates_flagged", fixed.duplicates_flagged);
                report.set_count("sources_filled", fixed.sources_filled);
                (writer, faq::sanity::check(&fixed.records))
            }
            None => (ReportWriter::new(input).with_force_overwrite(true), before),
        };

        for (lang, stats) in &remaining.languages {
            report.note(format!(
                "{}: {} entries, {} issues",
                lang.code().to_uppercase(),
                stats.entries,
                stats.issue_count()
            ));
        }
        report.errors.extend(remaining.issues());

        self.finish(&writer, report, start)
    }

    /// Merge two translation caches; entries from `newer` win.
    pub fn merge_cache(&self, older: &Path, newer: &Path, output: &Path) -> Result<JobReport> {
        let start = Instant::now();
        self.shutdown.check_shutdown()?;
        let writer = self.writer(output)?;

        for path in [older, newer] {
            if !path.exists() {
                return Err(FaqKitError::InputNotFound {
                    path: path.display().to_string(),
                });
            }
        }

        self.output_formatter.start_operation("Merging translation caches");
        let mut merged = TranslationCache::load(older)?;
        let incoming = TranslationCache::load(newer)?;
        let before = merged.len();
        merged.merge(&incoming);
        merged.save_to(output)?;

        let mut report = JobReport::new("merge-cache", older, &self.config).with_output(output);
        report.items = merged.len();
        report.set_count("older", before);
        report.set_count("newer", incoming.len());
        report.set_count("added", merged.len() - before);

        self.finish(&writer, report, start)
    }

    fn writer(&self, output: &Path) -> Result<ReportWriter> {
        let writer = ReportWriter::new(output).with_force_overwrite(self.force);
        writer.check_output()?;
        Ok(writer)
    }

    fn translator<B: TranslationBackend>(&self, backend: B) -> Result<Translator<B>> {
        let cache = TranslationCache::load(&self.config.translate.cache_path)?;
        let protected = self
            .load_catalog()?
            .map(|catalog| catalog.protected_terms())
            .unwrap_or_default();

        Ok(Translator::new(backend, cache, &self.config.translate)
            .with_protected_terms(protected)
            .with_missing_marker(self.config.patch.missing_marker.clone()))
    }

    fn load_catalog(&self) -> Result<Option<SeriesCatalog>> {
        match self.config.patch.series_catalog {
            Some(ref path) => {
                let catalog = SeriesCatalog::load(path)?;
                self.output_formatter
                    .debug(&format!("Loaded {} series from {}", catalog.len(), path.display()));
                Ok(Some(catalog))
            }
            None => Ok(None),
        }
    }

    fn finish(&self, writer: &ReportWriter, mut report: JobReport, start: Instant) -> Result<JobReport> {
        report.finish(start.elapsed());
        writer.save_report(&report)?;
        info!(job = %report.job, items = report.items, errors = report.errors.len(), "job finished");
        Ok(report)
    }

    pub fn generate_sample_config<P: AsRef<Path>>(output_path: P) -> Result<()> {
        let sample_config = Config::create_sample_config();
        std::fs::write(output_path.as_ref(), sample_config)?;
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn output_formatter(&self) -> &OutputFormatter {
        &self.output_formatter
    }

    pub fn is_running(&self) -> bool {
        self.shutdown.is_running()
    }

    pub fn request_shutdown(&self) {
        self.shutdown.request_shutdown();
    }

    pub fn handle_error(&self, error: &FaqKitError) {
        self.progress_manager.clear();
        self.output_formatter.print_user_friendly_error(error);
    }
}

fn targets_or_default(targets: &[Lang]) -> Vec<Lang> {
    if targets.is_empty() {
        Lang::TARGETS.to_vec()
    } else {
        targets.iter().copied().filter(|l| !l.is_source()).collect()
    }
}

fn langs_or_all(langs: &[Lang]) -> Vec<Lang> {
    if langs.is_empty() {
        Lang::ALL.to_vec()
    } else {
        langs.to_vec()
    }
}

fn record_translation_stats(report: &mut JobReport, stats: &translate::TranslationStats) {
    for source in Source::ALL {
        let count = stats.count(source);
        if count > 0 {
            report.set_count(format!("source:{}", source.as_str()), count);
        }
    }
    report.set_count("remote_calls", stats.remote_calls);
    report.set_count("strict_retries", stats.strict_retries);
    report.errors.extend(stats.errors.iter().cloned());
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

/// Keywords come from a CSV column or a JSON array of strings.
fn read_keywords(path: &Path, column: &str) -> Result<Vec<String>> {
    if is_csv(path) {
        store::read_csv_column(path, column)
    } else {
        store::read_json(path)
    }
}

fn write_keywords(path: &Path, column: &str, words: &[String]) -> Result<()> {
    if is_csv(path) {
        store::write_csv_column(path, column, words)
    } else {
        store::write_json(path, words)
    }
}

pub fn version_info() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: env!("CARGO_PKG_VERSION"),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown"),
        build_date: option_env!("BUILD_DATE").unwrap_or("unknown"),
        target: std::env::consts::ARCH.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct BuildInfo {
    pub version: &'static str,
    pub git_hash: &'static str,
    pub build_date: &'static str,
    pub target: String,
}

impl std::fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "faqkit {} ({}) built on {} for {}",
            self.version, self.git_hash, self.build_date, self.target
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::faq::FaqEntry;
    use crate::translate::ChatRequest;
    use std::cell::Cell;
    use std::fs;
    use tempfile::TempDir;

    /// Answers every request with `"[XX] <last line of the prompt>"`.
    struct EchoBackend {
        calls: Cell<usize>,
    }

    impl EchoBackend {
        fn new() -> Self {
            Self { calls: Cell::new(0) }
        }
    }

    impl TranslationBackend for EchoBackend {
        fn complete(&self, request: &ChatRequest) -> Result<String> {
            self.calls.set(self.calls.get() + 1);
            let prompt = &request.messages[1].content;
            let text = prompt.lines().last().unwrap_or_default();
            Ok(format!("[T] {}", text.trim_matches('"').trim_start_matches("Keyword: ").trim_matches('"')))
        }
    }

    fn test_config(dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.translate.cache_path = dir.path().join("cache.json");
        config.translate.request_delay_ms = 0;
        config
    }

    fn write_faq(dir: &TempDir, records: &[FaqRecord]) -> std::path::PathBuf {
        let path = dir.path().join("faq.json");
        store::write_json(&path, records).unwrap();
        path
    }

    #[test]
    fn test_faqkit_creation() {
        let kit = FaqKit::new_for_test(Config::default());
        assert!(kit.is_running());
        assert_eq!(kit.config().teaser.limit, 200);
    }

    #[test]
    fn test_normalize_keywords_from_csv() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("keywords.csv");
        fs::write(&input, "SE,Note\nuv,a\nPlattor,b\nplattor,c\n60 X 60 cm,d\n60x60,e\n300,f\nab,g\n").unwrap();
        let output = dir.path().join("keywords_clean.json");

        let kit = FaqKit::new_for_test(test_config(&dir));
        let report = kit.normalize_keywords(&input, &output, None).unwrap();

        let words: Vec<String> = store::read_json(&output).unwrap();
        assert_eq!(words, vec!["UV-tålig", "Plattor", "60x60 cm", "300 mm"]);
        assert_eq!(report.count("duplicates"), 2);
        assert_eq!(report.count("dropped"), 1);
        assert!(dir.path().join("keywords_clean.size_variants.json").exists());
        assert!(dir.path().join("keywords_clean.pedestals.csv").exists());
        assert!(dir.path().join("keywords_clean.report.json").exists());
    }

    #[test]
    fn test_existing_output_is_refused_without_force() {
        let dir = TempDir::new().unwrap();
        let input = write_faq(&dir, &[FaqRecord::swedish(FaqEntry::new("Fråga?", "Svar."))]);
        let output = dir.path().join("out.json");
        fs::write(&output, "[]").unwrap();

        let kit = FaqKit::new_for_test(test_config(&dir));
        assert!(matches!(
            kit.formats(&input, &output),
            Err(FaqKitError::OutputExists { .. })
        ));

        let kit = FaqKit::new_for_test(test_config(&dir)).with_force_overwrite(true);
        assert!(kit.formats(&input, &output).is_ok());
    }

    #[test]
    fn test_patch_writes_change_log() {
        let dir = TempDir::new().unwrap();
        let mut record = FaqRecord::swedish(FaqEntry::new("Vilka storlekar finns?", "Vi har 60 x 60 cm."));
        record.en = Some(FaqEntry::new("Which sizes exist?", ""));
        let input = write_faq(&dir, &[record]);
        let output = dir.path().join("patched.json");

        let kit = FaqKit::new_for_test(test_config(&dir));
        let report = kit.patch(&input, &output).unwrap();

        let patched: Vec<FaqRecord> = store::read_json(&output).unwrap();
        assert_eq!(patched[0].entry(Lang::Se).unwrap().answer, "Vi har 60x60 cm.");
        assert_eq!(patched[0].entry(Lang::En).unwrap().answer, "MISSING_TRANSLATION");
        // Missing EN, DA and DE answers.
        assert_eq!(report.count("MISSING"), 3);
        assert_eq!(report.count("FORMAT_NORMALIZED"), 1);
        assert!(dir.path().join("patched.changes.csv").exists());
    }

    #[test]
    fn test_formats_removes_invalid_rows() {
        let dir = TempDir::new().unwrap();
        let records = vec![
            FaqRecord::swedish(FaqEntry::new("Fråga", "0x80")),
            FaqRecord::swedish(FaqEntry::new("Storlek?", "Vi har 60x60.")),
        ];
        let input = write_faq(&dir, &records);
        let output = dir.path().join("formats.json");

        let kit = FaqKit::new_for_test(test_config(&dir));
        let report = kit.formats(&input, &output).unwrap();

        let kept: Vec<FaqRecord> = store::read_json(&output).unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(report.count("removed"), 1);
        assert_eq!(report.count("INVALID_ROW"), 1);
    }

    #[test]
    fn test_translate_with_mock_backend() {
        let dir = TempDir::new().unwrap();
        let input = write_faq(&dir, &[FaqRecord::swedish(FaqEntry::new("Tål plattorna frost?", "Ja."))]);
        let output = dir.path().join("translated.json");

        let kit = FaqKit::new_for_test(test_config(&dir));
        let report = kit
            .translate_with(EchoBackend::new(), &input, &output, &[Lang::En], false)
            .unwrap();

        let translated: Vec<FaqRecord> = store::read_json(&output).unwrap();
        let en = translated[0].entry(Lang::En).unwrap();
        assert_eq!(en.question, "[T] Tål plattorna frost?");
        assert_eq!(en.source.as_deref(), Some("AI"));
        assert_eq!(report.count("fields_filled"), 2);
        assert!(dir.path().join("cache.json").exists());
        assert!(!report.has_warnings());
    }

    #[test]
    fn test_cancelled_translation_keeps_output_untouched() {
        let dir = TempDir::new().unwrap();
        let input = write_faq(&dir, &[FaqRecord::swedish(FaqEntry::new("Fråga", "Svar"))]);
        let output = dir.path().join("translated.json");

        let kit = FaqKit::new_for_test(test_config(&dir));
        kit.request_shutdown();
        let result = kit.translate_with(EchoBackend::new(), &input, &output, &[Lang::En], false);

        assert!(matches!(result, Err(FaqKitError::Cancelled)));
        assert!(!output.exists());
    }

    #[test]
    fn test_translate_keywords_job() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("keywords.json");
        store::write_json(&input, &vec!["Mossa".to_string()]).unwrap();
        let output = dir.path().join("lookup.json");

        let kit = FaqKit::new_for_test(test_config(&dir));
        let report = kit
            .translate_keywords_with(EchoBackend::new(), &input, &output, &Lang::TARGETS, false)
            .unwrap();

        let records: Vec<KeywordRecord> = store::read_json(&output).unwrap();
        assert_eq!(records[0].en, "[T] Mossa");
        assert_eq!(records[0].category, faq::Category::Maintenance);
        assert_eq!(records[0].synonyms_en, "");
        assert_eq!(report.count("source:remote"), 3);
    }

    #[test]
    fn test_translate_keywords_job_with_synonyms() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("keywords.json");
        store::write_json(&input, &vec!["Mossa".to_string()]).unwrap();
        let output = dir.path().join("lookup.json");

        let kit = FaqKit::new_for_test(test_config(&dir));
        let report = kit
            .translate_keywords_with(EchoBackend::new(), &input, &output, &[Lang::En], true)
            .unwrap();

        let records: Vec<KeywordRecord> = store::read_json(&output).unwrap();
        assert_eq!(records[0].synonyms_en, "[T] [T] Mossa");
        assert_eq!(records[0].synonyms_da, "");
        assert_eq!(report.count("remote_calls"), 2);
    }

    #[test]
    fn test_shorten_job_logs_changes() {
        let dir = TempDir::new().unwrap();
        let long = "Plattorna tål frost och salt året runt. ".repeat(3);
        let input = write_faq(&dir, &[FaqRecord::swedish(FaqEntry::new("Tål plattorna frost?", long.trim()))]);
        let output = dir.path().join("short.json");

        let mut config = test_config(&dir);
        config.translate.shorten_max_len = 60;
        let kit = FaqKit::new_for_test(config);
        let report = kit.shorten_with(EchoBackend::new(), &input, &output, &[Lang::Se]).unwrap();

        assert_eq!(report.count("SHORTENED"), 1);
        let shortened: Vec<FaqRecord> = store::read_json(&output).unwrap();
        let se = shortened[0].entry(Lang::Se).unwrap();
        assert!(se.answer.starts_with("[T] "));
        assert_eq!(se.answer_full.as_deref(), Some(long.trim()));
        assert_eq!(se.question, "Tål plattorna frost?");

        let log = fs::read_to_string(dir.path().join("short.changes.csv")).unwrap();
        assert!(log.contains("SHORTENED"));
    }

    #[test]
    fn test_series_build_then_facit() {
        let dir = TempDir::new().unwrap();
        let products = dir.path().join("products.json");
        fs::write(
            &products,
            r#"{"Konjak Antracit": ["60x60cm"], "Konjak Grå": ["40x120cm", "60x60cm"]}"#,
        )
        .unwrap();
        let catalog = dir.path().join("series.json");

        let kit = FaqKit::new_for_test(test_config(&dir));
        let report = kit.series_build(&products, &catalog).unwrap();
        assert_eq!(report.count("series"), 1);

        let mut config = test_config(&dir);
        config.patch.series_catalog = Some(catalog);
        let kit = FaqKit::new_for_test(config);
        let input = write_faq(
            &dir,
            &[
                FaqRecord::swedish(FaqEntry::new("Vilka färger finns Konjak i?", "Grå.")),
                FaqRecord::swedish(FaqEntry::new("Vilka format har Lava?", "60x60.")),
            ],
        );
        let output = dir.path().join("facit.json");
        let report = kit.series_facit(&input, &output).unwrap();

        assert_eq!(report.count("SERIES_FACIT"), 1);
        assert_eq!(report.count("unmatched"), 1);
        assert!(report.has_warnings());

        let records: Vec<FaqRecord> = store::read_json(&output).unwrap();
        assert_eq!(
            records[0].entry(Lang::Se).unwrap().answer,
            "Följande färger finns i serien Konjak: Antracit, Grå\nTillgängliga format: 40x120 cm, 60x60 cm"
        );
    }

    #[test]
    fn test_match_keywords_job() {
        let dir = TempDir::new().unwrap();
        let lookup = dir.path().join("lookup.json");
        store::write_json(&lookup, &vec![KeywordRecord::new("Frost", "Frost", "Frost", "Frost")]).unwrap();
        let input = write_faq(&dir, &[FaqRecord::swedish(FaqEntry::new("Tål plattorna frost?", "Ja"))]);
        let output = dir.path().join("matches.json");

        let kit = FaqKit::new_for_test(test_config(&dir));
        let report = kit.match_keywords(&lookup, &input, &output).unwrap();

        assert_eq!(report.count("matched:se"), 1);
        let raw = fs::read_to_string(&output).unwrap();
        assert!(raw.contains("\"Frost\""));
    }

    #[test]
    fn test_sanity_with_autofix() {
        let dir = TempDir::new().unwrap();
        let records = vec![
            FaqRecord::swedish(FaqEntry::new("hur gör jag?", "så här.")),
            FaqRecord::swedish(FaqEntry::new("hur gör jag?", "Så här.")),
        ];
        let input = write_faq(&dir, &records);
        let fixed_path = dir.path().join("fixed.json");

        let kit = FaqKit::new_for_test(test_config(&dir));
        let report = kit.sanity(&input, Some(&fixed_path)).unwrap();
        assert!(report.count("issues_found") > 0);
        assert!(report.count("capitalized") >= 3);

        let fixed: Vec<FaqRecord> = store::read_json(&fixed_path).unwrap();
        assert!(fixed.iter().all(|r| r.entry(Lang::Se).unwrap().duplicate));

        let plain = kit.sanity(&input, None).unwrap();
        assert!(plain.has_warnings());
    }

    #[test]
    fn test_merge_cache_job() {
        let dir = TempDir::new().unwrap();
        let old = dir.path().join("old.json");
        let new = dir.path().join("new.json");
        fs::write(&old, r#"{"Hej::en": "Hi", "Tack::en": "Thanks"}"#).unwrap();
        fs::write(&new, r#"{"Hej::en": "Hello"}"#).unwrap();
        let output = dir.path().join("merged.json");

        let kit = FaqKit::new_for_test(test_config(&dir));
        let report = kit.merge_cache(&old, &new, &output).unwrap();

        let merged = TranslationCache::load(&output).unwrap();
        assert_eq!(merged.get("Hej", Lang::En), Some("Hello"));
        assert_eq!(report.items, 2);
        assert_eq!(report.count("added"), 0);
    }

    #[test]
    fn test_missing_input() {
        let dir = TempDir::new().unwrap();
        let kit = FaqKit::new_for_test(test_config(&dir));
        let result = kit.patch(&dir.path().join("nope.json"), &dir.path().join("out.json"));
        assert!(matches!(result, Err(FaqKitError::InputNotFound { .. })));
    }

    #[test]
    fn test_sample_config_generation() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("sample.toml");

        FaqKit::generate_sample_config(&config_path).unwrap();

        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("[formats]"));
        assert!(content.contains("[translate]"));
        assert!(Config::load_from_file(&config_path).is_ok());
    }

    #[test]
    fn test_version_info() {
        assert!(!version_info().is_empty());
        assert!(build_info().to_string().starts_with("faqkit "));
    }
}
