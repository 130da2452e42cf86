use anyhow::{Context, Result};
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Top-level refseek configuration, loaded from `config.toml`.
///
/// Resolution order: `REFSEEK_CONFIG_DIR` env → `~/.refseek/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to config.toml - computed, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,
    /// API key for a remote Ollama endpoint. Overridden by `REFSEEK_API_KEY`.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Base URL override for the Ollama API (e.g. "http://10.0.0.1:11434")
    #[serde(default)]
    pub api_url: Option<String>,
    /// Default model (e.g. `"llama3.1"`). An `"ollama:"` prefix is accepted
    /// and stripped before use.
    #[serde(default = "default_model")]
    pub default_model: Option<String>,
    /// Default model temperature (0.0-2.0).
    #[serde(default = "default_temperature")]
    pub default_temperature: f64,

    /// Agent loop settings (`[agent]`).
    #[serde(default)]
    pub agent: AgentConfig,

    /// arXiv paper search settings (`[arxiv]`).
    #[serde(default)]
    pub arxiv: ArxivConfig,

    /// Tavily web search settings (`[web_search]`).
    #[serde(default)]
    pub web_search: WebSearchConfig,

    /// Wikipedia lookup settings (`[wikipedia]`).
    #[serde(default)]
    pub wikipedia: WikipediaConfig,

    /// Source-trust evaluation settings (`[evaluation]`).
    #[serde(default)]
    pub evaluation: EvaluationConfig,
}

/// Agent loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Maximum provider/tool round-trips per task.
    pub max_iterations: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self { max_iterations: 5 }
    }
}

/// arXiv paper search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArxivConfig {
    /// Results per query, capped at 5 by the tool.
    pub max_results: usize,
    pub timeout_secs: u64,
}

impl Default for ArxivConfig {
    fn default() -> Self {
        Self {
            max_results: 5,
            timeout_secs: 15,
        }
    }
}

/// Tavily web search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSearchConfig {
    /// Tavily API key. Overridden by `TAVILY_API_KEY`.
    pub api_key: Option<String>,
    pub max_results: usize,
    pub include_images: bool,
    pub timeout_secs: u64,
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            max_results: 5,
            include_images: false,
            timeout_secs: 15,
        }
    }
}

/// Wikipedia lookup settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WikipediaConfig {
    /// Wikipedia language edition.
    pub language: String,
    /// Sentences per summary, capped at 10 by the tool.
    pub sentences: usize,
    pub timeout_secs: u64,
}

impl Default for WikipediaConfig {
    fn default() -> Self {
        Self {
            language: "en".into(),
            sentences: 5,
            timeout_secs: 15,
        }
    }
}

/// Source-trust evaluation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Domain suffixes considered authoritative.
    pub trusted_domains: Vec<String>,
    /// Minimum acceptable trusted-source ratio, in `[0, 1]`.
    pub min_ratio: f64,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            trusted_domains: vec![
                "wikipedia.org".into(),
                "nature.com".into(),
                "science.org".into(),
                "arxiv.org".into(),
                "nasa.gov".into(),
                "mit.edu".into(),
                "stanford.edu".into(),
                "harvard.edu".into(),
            ],
            min_ratio: 0.4,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: PathBuf::new(),
            api_key: None,
            api_url: None,
            default_model: default_model(),
            default_temperature: default_temperature(),
            agent: AgentConfig::default(),
            arxiv: ArxivConfig::default(),
            web_search: WebSearchConfig::default(),
            wikipedia: WikipediaConfig::default(),
            evaluation: EvaluationConfig::default(),
        }
    }
}

fn default_model() -> Option<String> {
    Some("llama3.1".into())
}

fn default_temperature() -> f64 {
    0.1
}

fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("REFSEEK_CONFIG_DIR") {
        let trimmed = dir.trim();
        if !trimmed.is_empty() {
            return Ok(PathBuf::from(trimmed));
        }
    }

    let user_dirs = UserDirs::new().context("Could not determine home directory")?;
    Ok(user_dirs.home_dir().join(".refseek"))
}

impl Config {
    /// Resolved path of `config.toml`, whether or not the file exists yet.
    pub fn default_config_path() -> Result<PathBuf> {
        Ok(config_dir()?.join("config.toml"))
    }

    /// Load `config.toml`, creating the directory and a default config file
    /// on first run.
    pub async fn load_or_init() -> Result<Self> {
        let dir = config_dir()?;
        let config_path = dir.join("config.toml");

        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create config directory {}", dir.display()))?;

        let mut config = if config_path.exists() {
            let contents = fs::read_to_string(&config_path)
                .await
                .context("Failed to read config file")?;
            toml::from_str::<Config>(&contents).context("Failed to parse config file")?
        } else {
            let config = Config::default();
            config.write_to(&config_path).await?;
            tracing::info!(path = %config_path.display(), "Wrote default config");
            config
        };

        config.config_path = config_path;
        Ok(config)
    }

    /// Overwrite `config.toml` with this configuration.
    pub async fn save(&self) -> Result<()> {
        self.write_to(&self.config_path).await
    }

    async fn write_to(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, contents)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// Environment variables override the file: `REFSEEK_API_KEY`,
    /// `REFSEEK_API_URL`, `REFSEEK_MODEL`, and `TAVILY_API_KEY`.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("REFSEEK_API_KEY") {
            if !key.is_empty() {
                self.api_key = Some(key);
            }
        }
        if let Ok(url) = std::env::var("REFSEEK_API_URL") {
            if !url.is_empty() {
                self.api_url = Some(url);
            }
        }
        if let Ok(model) = std::env::var("REFSEEK_MODEL") {
            if !model.is_empty() {
                self.default_model = Some(model);
            }
        }
        if let Ok(key) = std::env::var("TAVILY_API_KEY") {
            if !key.is_empty() {
                self.web_search.api_key = Some(key);
            }
        }
    }

    /// Resolved model name with any `ollama:` prefix stripped.
    pub fn model_name(&self) -> String {
        let model = self.default_model.as_deref().unwrap_or("llama3.1");
        model.strip_prefix("ollama:").unwrap_or(model).to_string()
    }
}
