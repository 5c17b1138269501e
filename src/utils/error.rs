use thiserror::Error;

#[derive(Error, Debug)]
pub enum SjrError {
    #[error("Navigation to {url} did not settle within {timeout_secs}s")]
    NavigationTimeout { url: String, timeout_secs: u64 },

    #[error("Search input '{selector}' not found on the site root")]
    SearchEntryNotFound { selector: String },

    #[error("Browser error: {0}")]
    BrowserError(#[from] chromiumoxide::error::CdpError),

    #[error("Browser session error: {message}")]
    SessionError { message: String },

    #[error("Another lookup is already running on this browser session")]
    SessionBusy,

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration '{field}'")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Navigation,
    Browser,
    Network,
    Data,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl SjrError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            SjrError::NavigationTimeout { .. } | SjrError::SearchEntryNotFound { .. } => {
                ErrorCategory::Navigation
            }
            SjrError::BrowserError(_) | SjrError::SessionError { .. } | SjrError::SessionBusy => {
                ErrorCategory::Browser
            }
            SjrError::HttpError(_) => ErrorCategory::Network,
            SjrError::CsvError(_) | SjrError::SerializationError(_) => ErrorCategory::Data,
            SjrError::ConfigError { .. }
            | SjrError::ConfigValidationError { .. }
            | SjrError::InvalidConfigValueError { .. }
            | SjrError::MissingConfigError { .. } => ErrorCategory::Configuration,
            SjrError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 網站暫時性問題，稍後重試通常可以解決
            SjrError::NavigationTimeout { .. } | SjrError::HttpError(_) | SjrError::SessionBusy => {
                ErrorSeverity::Medium
            }
            SjrError::SearchEntryNotFound { .. }
            | SjrError::CsvError(_)
            | SjrError::SerializationError(_)
            | SjrError::ConfigError { .. }
            | SjrError::ConfigValidationError { .. }
            | SjrError::InvalidConfigValueError { .. }
            | SjrError::MissingConfigError { .. } => ErrorSeverity::High,
            SjrError::BrowserError(_) | SjrError::SessionError { .. } | SjrError::IoError(_) => {
                ErrorSeverity::Critical
            }
        }
    }

    /// Only session establishment and query submission end a whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SjrError::NavigationTimeout { .. }
                | SjrError::SearchEntryNotFound { .. }
                | SjrError::BrowserError(_)
                | SjrError::SessionError { .. }
                | SjrError::SessionBusy
        )
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            SjrError::NavigationTimeout { .. } => {
                "The site is slow or showing a challenge; solve it in the browser window or raise timeouts.navigation_secs"
            }
            SjrError::SearchEntryNotFound { .. } => {
                "The site layout may have changed or a challenge page is covering it; retry with a visible browser"
            }
            SjrError::BrowserError(_) | SjrError::SessionError { .. } => {
                "Check that Chrome/Chromium is installed or set browser.executable in the config file"
            }
            SjrError::SessionBusy => "Wait for the running lookup to finish before starting another",
            SjrError::HttpError(_) => "Check the network connection and try again",
            SjrError::CsvError(_) | SjrError::SerializationError(_) => {
                "The output could not be encoded; check the output directory contents"
            }
            SjrError::IoError(_) => "Check file permissions and free disk space",
            SjrError::ConfigError { .. }
            | SjrError::ConfigValidationError { .. }
            | SjrError::InvalidConfigValueError { .. }
            | SjrError::MissingConfigError { .. } => {
                "Fix the configuration file or command line arguments"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            SjrError::NavigationTimeout { url, .. } => {
                format!("The page {} took too long to load", url)
            }
            SjrError::SearchEntryNotFound { .. } => {
                "Could not find the journal search box on the site".to_string()
            }
            SjrError::SessionBusy => "A lookup is already in progress".to_string(),
            SjrError::BrowserError(_) | SjrError::SessionError { .. } => {
                "The browser could not be started or stopped responding".to_string()
            }
            SjrError::InvalidConfigValueError { field, reason, .. } => {
                format!("Invalid setting '{}': {}", field, reason)
            }
            SjrError::MissingConfigError { field } => {
                format!("Missing setting '{}'", field)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SjrError>;
