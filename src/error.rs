use thiserror::Error;

#[derive(Error, Debug)]
pub enum FaqKitError {
    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Input file not found: {path}")]
    InputNotFound { path: String },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Missing column '{column}' in {path}")]
    MissingColumn { path: String, column: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing environment variable: {name}")]
    MissingEnv { name: String },

    #[error("Translation backend failed: {message}")]
    Backend { message: String },

    #[error("Translation backend returned HTTP {status}: {message}")]
    BackendStatus { status: u16, message: String },

    #[error("Unknown series: {name}")]
    UnknownSeries { name: String },

    #[error("Unsupported language: {code}")]
    UnsupportedLanguage { code: String },

    #[error("Operation was cancelled by user")]
    Cancelled,

    #[error("Output file already exists: {path}")]
    OutputExists { path: String },
}

pub trait UserFriendlyError {
    fn user_message(&self) -> String;
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for FaqKitError {
    fn user_message(&self) -> String {
        match self {
            FaqKitError::InputNotFound { path } => {
                format!("Could not find input file: {}", path)
            }
            FaqKitError::Parse { path, message } => {
                format!("Could not read {}: {}", path, message)
            }
            FaqKitError::MissingColumn { path, column } => {
                format!("The file {} has no column named '{}'", path, column)
            }
            FaqKitError::Config { message } => {
                format!("Configuration error: {}", message)
            }
            FaqKitError::MissingEnv { name } => {
                format!("Environment variable {} is not set", name)
            }
            FaqKitError::Backend { message } => {
                format!("Translation request failed: {}", message)
            }
            FaqKitError::BackendStatus { status, message } => {
                format!("Translation service answered HTTP {}: {}", status, message)
            }
            FaqKitError::UnknownSeries { name } => {
                format!("Series '{}' is not in the series catalog", name)
            }
            FaqKitError::UnsupportedLanguage { code } => {
                format!("Unsupported language code: {}", code)
            }
            FaqKitError::Cancelled => "Operation was cancelled by user".to_string(),
            FaqKitError::OutputExists { path } => {
                format!("Output file already exists: {}", path)
            }
            _ => self.to_string(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            FaqKitError::InputNotFound { .. } => Some(
                "Check the path, or run the previous step of the pipeline first to produce this file.".to_string()
            ),
            FaqKitError::Parse { .. } => Some(
                "Make sure the file is valid UTF-8 JSON or CSV in the expected layout.".to_string()
            ),
            FaqKitError::MissingColumn { .. } => Some(
                "Select another column with --column or fix the CSV header.".to_string()
            ),
            FaqKitError::Config { .. } => Some(
                "Check your configuration file syntax. Run with --generate-config to see every available setting.".to_string()
            ),
            FaqKitError::MissingEnv { name } => Some(format!(
                "Add {} to .env.local or export it in your shell.",
                name
            )),
            FaqKitError::Backend { .. } | FaqKitError::BackendStatus { .. } => Some(
                "Check your network connection and API key. Cached translations are kept, so the run can be repeated.".to_string()
            ),
            FaqKitError::UnknownSeries { .. } => Some(
                "Add the series to the catalog file referenced by [patch].series_catalog.".to_string()
            ),
            FaqKitError::UnsupportedLanguage { .. } => Some(
                "Use one of: se, en, da, de.".to_string()
            ),
            FaqKitError::OutputExists { .. } => Some(
                "Choose another output path with --output or pass --force to overwrite.".to_string()
            ),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for FaqKitError {
    fn from(error: toml::de::Error) -> Self {
        FaqKitError::Config {
            message: error.to_string(),
        }
    }
}

impl From<serde_json::Error> for FaqKitError {
    fn from(error: serde_json::Error) -> Self {
        FaqKitError::Parse {
            path: "<json>".to_string(),
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for FaqKitError {
    fn from(error: csv::Error) -> Self {
        match error.into_kind() {
            csv::ErrorKind::Io(io) => FaqKitError::Io(io),
            other => FaqKitError::Parse {
                path: "<csv>".to_string(),
                message: format!("{:?}", other),
            },
        }
    }
}

impl From<reqwest::Error> for FaqKitError {
    fn from(error: reqwest::Error) -> Self {
        match error.status() {
            Some(status) => FaqKitError::BackendStatus {
                status: status.as_u16(),
                message: error.to_string(),
            },
            None => FaqKitError::Backend {
                message: error.to_string(),
            },
        }
    }
}

impl From<url::ParseError> for FaqKitError {
    fn from(error: url::ParseError) -> Self {
        FaqKitError::Config {
            message: format!("invalid endpoint URL: {}", error),
        }
    }
}

pub type Result<T> = std::result::Result<T, FaqKitError>;
