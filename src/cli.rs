use crate::config::{CliOverrides, Config};
use crate::error::Result;
use crate::faq::model::Lang;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "faqkit")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Clean, normalize, translate and check a multilingual FAQ dataset")]
#[command(
    long_about = "faqkit runs the batch jobs behind a Swedish/English/Danish/German FAQ: \
                  keyword cleanup, tile-size normalization, teaser truncation, cache-backed \
                  translation and sanity checks. Each job reads a file and writes a file."
)]
#[command(before_help = "🧹 faqkit - FAQ dataset tooling")]
#[command(after_help = "EXAMPLES:\n  \
    faqkit keywords keywords.csv -o keywords_clean.json\n  \
    faqkit keywords-translate keywords_clean.json -o lookup.json --targets en,de\n  \
    faqkit patch faq.json -o faq_patched.json --series-catalog series.json\n  \
    faqkit translate faq_patched.json -o faq_translated.json --pivot en\n  \
    faqkit sanity faq_translated.json --autofix faq_fixed.json\n  \
    faqkit --generate-config --config faqkit.toml")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Configuration file path
    #[arg(short, long, global = true, help = "Path to TOML configuration file")]
    pub config: Option<PathBuf>,

    /// Output format for results
    #[arg(long, value_enum, global = true, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Verbose output level (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-essential output)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Overwrite existing output files
    #[arg(long, global = true)]
    pub force: bool,

    /// Dry run (show what would be done without executing)
    #[arg(long, global = true, help = "Show the job plan without reading or writing data")]
    pub dry_run: bool,

    /// Generate sample configuration file
    #[arg(long, help = "Generate a sample configuration file")]
    pub generate_config: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Normalize and dedupe a keyword column
    Keywords {
        /// CSV file with a keyword column, or a JSON array of strings
        input: PathBuf,
        /// Output file (.json or .csv)
        #[arg(short, long)]
        output: PathBuf,
        /// CSV column holding the keywords
        #[arg(long)]
        column: Option<String>,
        /// Existing keyword list to merge the new words into
        #[arg(long)]
        merge: Option<PathBuf>,
    },

    /// Translate keywords and derive CHECK, category and domain flags
    KeywordsTranslate {
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long)]
        column: Option<String>,
        /// Target languages (comma-separated, default en,da,de)
        #[arg(long, value_enum, value_delimiter = ',')]
        targets: Vec<Lang>,
        /// Also ask for up to three synonyms per translated keyword
        #[arg(long)]
        synonyms: bool,
        #[arg(long)]
        cache: Option<PathBuf>,
    },

    /// Find which lookup keywords occur in each FAQ question
    KeywordsMatch {
        /// Keyword lookup JSON produced by keywords-translate
        lookup: PathBuf,
        /// FAQ JSON
        faq: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Patch pass: missing translations, product names, teasers, formats, series
    Patch {
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long)]
        series_catalog: Option<PathBuf>,
        #[arg(long)]
        teaser_limit: Option<usize>,
    },

    /// Format-only pass; rows left with only invalid formats are removed
    Formats {
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long)]
        series_catalog: Option<PathBuf>,
    },

    /// Translate Swedish entries into the target languages
    Translate {
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, value_enum, value_delimiter = ',')]
        targets: Vec<Lang>,
        /// Translate the other targets from this language's output
        #[arg(long, value_enum)]
        pivot: Option<Lang>,
        /// Replace target fields that already have text
        #[arg(long)]
        overwrite: bool,
        #[arg(long)]
        cache: Option<PathBuf>,
        #[arg(long)]
        model: Option<String>,
        /// Pause between remote requests, in milliseconds
        #[arg(long)]
        request_delay_ms: Option<u64>,
        #[arg(long)]
        series_catalog: Option<PathBuf>,
    },

    /// Shorten long questions and answers to at most two sentences
    Shorten {
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// Languages to shorten (comma-separated, default all)
        #[arg(long, value_enum, value_delimiter = ',')]
        langs: Vec<Lang>,
        /// Texts longer than this many characters are shortened
        #[arg(long)]
        max_len: Option<usize>,
        #[arg(long)]
        cache: Option<PathBuf>,
        #[arg(long)]
        model: Option<String>,
    },

    /// Build a series catalog from a product map keyed "Serie Färg"
    SeriesBuild {
        /// JSON object mapping "Serie Färg" to its formats
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Replace Swedish answers to series questions with the catalog answer
    SeriesFacit {
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long)]
        series_catalog: Option<PathBuf>,
    },

    /// Report empty, lowercase and duplicated entries
    Sanity {
        input: PathBuf,
        /// Write a fixed copy of the dataset to this path
        #[arg(long)]
        autofix: Option<PathBuf>,
    },

    /// Merge two translation caches; entries in NEW win
    MergeCache {
        old: PathBuf,
        new: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Keywords { .. } => "keywords",
            Command::KeywordsTranslate { .. } => "keywords-translate",
            Command::KeywordsMatch { .. } => "keywords-match",
            Command::Patch { .. } => "patch",
            Command::Formats { .. } => "formats",
            Command::Translate { .. } => "translate",
            Command::Shorten { .. } => "shorten",
            Command::SeriesBuild { .. } => "series-build",
            Command::SeriesFacit { .. } => "series-facit",
            Command::Sanity { .. } => "sanity",
            Command::MergeCache { .. } => "merge-cache",
        }
    }

    /// Files the job reads, for the dry-run plan.
    pub fn inputs(&self) -> Vec<&PathBuf> {
        match self {
            Command::Keywords { input, merge, .. } => {
                let mut inputs = vec![input];
                inputs.extend(merge.as_ref());
                inputs
            }
            Command::KeywordsTranslate { input, .. }
            | Command::Patch { input, .. }
            | Command::Formats { input, .. }
            | Command::Translate { input, .. }
            | Command::Shorten { input, .. }
            | Command::SeriesBuild { input, .. }
            | Command::SeriesFacit { input, .. }
            | Command::Sanity { input, .. } => vec![input],
            Command::KeywordsMatch { lookup, faq, .. } => vec![lookup, faq],
            Command::MergeCache { old, new, .. } => vec![old, new],
        }
    }

    pub fn output(&self) -> Option<&PathBuf> {
        match self {
            Command::Keywords { output, .. }
            | Command::KeywordsTranslate { output, .. }
            | Command::KeywordsMatch { output, .. }
            | Command::Patch { output, .. }
            | Command::Formats { output, .. }
            | Command::Translate { output, .. }
            | Command::Shorten { output, .. }
            | Command::SeriesBuild { output, .. }
            | Command::SeriesFacit { output, .. }
            | Command::MergeCache { output, .. } => Some(output),
            Command::Sanity { autofix, .. } => autofix.as_ref(),
        }
    }

    pub fn uses_backend(&self) -> bool {
        matches!(
            self,
            Command::KeywordsTranslate { .. } | Command::Translate { .. } | Command::Shorten { .. }
        )
    }
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON formatted output
    Json,
    /// Plain text output
    Plain,
}

impl Cli {
    /// File, then environment, then flags.
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_with_defaults(self.config.as_ref())?;
        config.apply_env();

        let overrides = self.create_cli_overrides();
        config.merge_with_cli_args(&overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn create_cli_overrides(&self) -> CliOverrides {
        let overrides = CliOverrides::new();

        match self.command {
            Some(Command::Keywords { ref column, .. }) => overrides.with_column(column.clone()),
            Some(Command::KeywordsTranslate {
                ref column,
                ref cache,
                ..
            }) => overrides
                .with_column(column.clone())
                .with_cache_path(cache.clone()),
            Some(Command::Patch {
                ref series_catalog,
                teaser_limit,
                ..
            }) => overrides
                .with_series_catalog(series_catalog.clone())
                .with_teaser_limit(teaser_limit),
            Some(Command::Formats {
                ref series_catalog,
                ..
            }) => overrides.with_series_catalog(series_catalog.clone()),
            Some(Command::Translate {
                pivot,
                ref cache,
                ref model,
                request_delay_ms,
                ref series_catalog,
                ..
            }) => overrides
                .with_pivot(pivot)
                .with_cache_path(cache.clone())
                .with_model(model.clone())
                .with_request_delay_ms(request_delay_ms)
                .with_series_catalog(series_catalog.clone()),
            Some(Command::Shorten {
                max_len,
                ref cache,
                ref model,
                ..
            }) => overrides
                .with_shorten_max_len(max_len)
                .with_cache_path(cache.clone())
                .with_model(model.clone()),
            Some(Command::SeriesFacit {
                ref series_catalog,
                ..
            }) => overrides.with_series_catalog(series_catalog.clone()),
            _ => overrides,
        }
    }

    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }
}
