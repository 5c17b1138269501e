use crate::domain::model::CategoryKind;
use crate::utils::error::{Result, SjrError};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://www.scimagojr.com";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SjrConfig {
    pub site: SiteConfig,
    pub browser: BrowserSettings,
    pub timeouts: TimeoutConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub base_url: String,
    pub user_agent: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl SiteConfig {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Site root with a trailing slash, so relative targets join under it.
    pub fn root_url(&self) -> Result<Url> {
        let root = format!("{}/", self.base_url.trim_end_matches('/'));
        Url::parse(&root).map_err(|e| SjrError::InvalidConfigValueError {
            field: "site.base_url".to_string(),
            value: self.base_url.clone(),
            reason: format!("Invalid URL format: {}", e),
        })
    }

    /// Absolute targets pass through; anything else is taken relative to the site root.
    pub fn resolve(&self, target: &str) -> Result<String> {
        let root = self.root_url()?;
        let joined = root
            .join(target.trim())
            .map_err(|e| SjrError::ConfigError {
                message: format!("Cannot resolve '{}' against {}: {}", target, root, e),
            })?;
        Ok(joined.to_string())
    }

    pub fn ranking_url(&self, kind: CategoryKind, id: u32, year: &str) -> Result<String> {
        self.resolve(&format!(
            "journalrank.php?{}={}&year={}",
            kind.query_key(),
            id,
            year.trim()
        ))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    pub headless: bool,
    pub executable: Option<String>,
    pub window_width: u32,
    pub window_height: u32,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        // 需要人工處理驗證頁面，預設開啟可見視窗
        Self {
            headless: false,
            executable: None,
            window_width: 1280,
            window_height: 900,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub navigation_secs: u64,
    pub search_input_secs: u64,
    pub results_url_secs: u64,
    pub indicator_secs: u64,
    pub export_probe_secs: u64,
    pub export_wait_secs: u64,
    pub download_secs: u64,
    pub poll_interval_ms: u64,
    pub ad_settle_ms: u64,
    pub challenge_settle_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            navigation_secs: 60,
            search_input_secs: 5,
            results_url_secs: 30,
            indicator_secs: 30,
            export_probe_secs: 5,
            export_wait_secs: 300,
            download_secs: 60,
            poll_interval_ms: 500,
            ad_settle_ms: 1000,
            challenge_settle_ms: 2000,
        }
    }
}

impl TimeoutConfig {
    pub fn navigation(&self) -> Duration {
        Duration::from_secs(self.navigation_secs)
    }

    pub fn search_input(&self) -> Duration {
        Duration::from_secs(self.search_input_secs)
    }

    pub fn results_url(&self) -> Duration {
        Duration::from_secs(self.results_url_secs)
    }

    pub fn indicator(&self) -> Duration {
        Duration::from_secs(self.indicator_secs)
    }

    pub fn export_probe(&self) -> Duration {
        Duration::from_secs(self.export_probe_secs)
    }

    pub fn export_wait(&self) -> Duration {
        Duration::from_secs(self.export_wait_secs)
    }

    pub fn download(&self) -> Duration {
        Duration::from_secs(self.download_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn ad_settle(&self) -> Duration {
        Duration::from_millis(self.ad_settle_ms)
    }

    pub fn challenge_settle(&self) -> Duration {
        Duration::from_millis(self.challenge_settle_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: Option<String>,
    pub diagnostics_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: None,
            diagnostics_dir: ".".to_string(),
        }
    }
}

impl SjrConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(SjrError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| SjrError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${SJR_BASE_URL})
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| SjrError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }
}

impl Validate for SjrConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_url("site.base_url", &self.site.base_url)?;
        validation::validate_non_empty_string("site.user_agent", &self.site.user_agent)?;

        if let Some(executable) = &self.browser.executable {
            validation::validate_path("browser.executable", executable)?;
        }
        validation::validate_range("browser.window_width", self.browser.window_width, 320, 7680)?;
        validation::validate_range("browser.window_height", self.browser.window_height, 240, 4320)?;

        let t = &self.timeouts;
        for (field, value) in [
            ("timeouts.navigation_secs", t.navigation_secs),
            ("timeouts.search_input_secs", t.search_input_secs),
            ("timeouts.results_url_secs", t.results_url_secs),
            ("timeouts.indicator_secs", t.indicator_secs),
            ("timeouts.export_probe_secs", t.export_probe_secs),
            ("timeouts.export_wait_secs", t.export_wait_secs),
            ("timeouts.download_secs", t.download_secs),
            ("timeouts.poll_interval_ms", t.poll_interval_ms),
        ] {
            validation::validate_positive_number(field, value, 1)?;
        }

        if let Some(path) = &self.output.path {
            validation::validate_path("output.path", path)?;
        }
        validation::validate_path("output.diagnostics_dir", &self.output.diagnostics_dir)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = SjrConfig::from_toml_str("").unwrap();

        assert_eq!(config.site.base_url, DEFAULT_BASE_URL);
        assert!(!config.browser.headless);
        assert_eq!(config.timeouts.export_wait_secs, 300);
        assert_eq!(config.timeouts.navigation(), Duration::from_secs(60));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_toml_config() {
        let toml_content = r#"
[site]
base_url = "http://127.0.0.1:8080"

[browser]
headless = true

[timeouts]
export_wait_secs = 120
"#;

        let config = SjrConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.site.base_url, "http://127.0.0.1:8080");
        assert_eq!(config.site.user_agent, DEFAULT_USER_AGENT);
        assert!(config.browser.headless);
        assert_eq!(config.timeouts.export_wait_secs, 120);
        assert_eq!(config.timeouts.download_secs, 60);
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("SJR_TEST_BASE_URL", "https://mirror.example.org");

        let toml_content = r#"
[site]
base_url = "${SJR_TEST_BASE_URL}"
"#;

        let config = SjrConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.site.base_url, "https://mirror.example.org");

        std::env::remove_var("SJR_TEST_BASE_URL");
    }

    #[test]
    fn test_config_validation() {
        let config = SjrConfig::from_toml_str(
            r#"
[site]
base_url = "invalid-url"
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());

        let config = SjrConfig::from_toml_str(
            r#"
[timeouts]
navigation_secs = 0
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[output]\npath = \"./reports\"\n")
            .unwrap();

        let config = SjrConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.output.path.as_deref(), Some("./reports"));
    }

    #[test]
    fn test_resolve_locators() {
        let site = SiteConfig::default();

        assert_eq!(
            site.resolve("journalsearch.php?q=22258&tip=sid&clean=0").unwrap(),
            "https://www.scimagojr.com/journalsearch.php?q=22258&tip=sid&clean=0"
        );
        assert_eq!(
            site.resolve("/journalsearch.php?q=1").unwrap(),
            "https://www.scimagojr.com/journalsearch.php?q=1"
        );
        assert_eq!(
            site.resolve("https://other.example.com/x?q=1").unwrap(),
            "https://other.example.com/x?q=1"
        );
    }

    #[test]
    fn test_ranking_url() {
        let site = SiteConfig::with_base_url("https://www.scimagojr.com/");

        assert_eq!(
            site.ranking_url(CategoryKind::Category, 1207, "2022").unwrap(),
            "https://www.scimagojr.com/journalrank.php?category=1207&year=2022"
        );
        assert_eq!(
            site.ranking_url(CategoryKind::Area, 1200, "2022").unwrap(),
            "https://www.scimagojr.com/journalrank.php?area=1200&year=2022"
        );
    }
}
