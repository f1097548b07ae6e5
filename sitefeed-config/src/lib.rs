//! Loader for sitefeed configuration with YAML + environment overlays.
//!
//! Precedence, lowest to highest: built-in defaults, YAML files/snippets in the
//! order they were attached, then `SITEFEED__`-prefixed environment variables
//! (`SITEFEED__FEED__MAX_PAGES=3` sets `feed.max_pages`). String values may
//! reference other variables as `${VAR}`; expansion happens after merging.
//!
//! The GitHub access token is optional. When `feed.access_token` is unset or
//! blank the loader falls back to `PERSONAL_ACCESS_TOKEN`, and a blank value
//! there means the feed is fetched unauthenticated.
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;
const ENV_PREFIX: &str = "SITEFEED";
pub const ACCESS_TOKEN_ENV: &str = "PERSONAL_ACCESS_TOKEN";
/// Upper bound for `feed.cache_ttl_secs` (30 days).
pub const MAX_CACHE_TTL_SECS: u64 = 30 * 24 * 60 * 60;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SitefeedConfig {
    #[serde(default)]
    pub feed: FeedSettings,
    #[serde(default)]
    pub log: LogSettings,
}

/// Upstream, pagination, and cache knobs for the GitHub activity feed.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedSettings {
    pub origin: String,
    pub user: String,
    pub api_version: String,
    pub access_token: Option<String>,
    pub max_pages: u32,
    pub min_entries_per_page: usize,
    pub page_delay_ms: u64,
    pub request_timeout_secs: u64,
    pub request_retries: usize,
    pub cache_key: String,
    pub cache_tag: String,
    pub cache_ttl_secs: u64,
    pub noise_patterns: Vec<String>,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            origin: "https://github.com".into(),
            user: "ryota-murakami".into(),
            api_version: "2022-11-28".into(),
            access_token: None,
            max_pages: 5,
            min_entries_per_page: 5,
            page_delay_ms: 100,
            request_timeout_secs: 15,
            request_retries: 0,
            cache_key: "github-feed".into(),
            cache_tag: "github-feed".into(),
            cache_ttl_secs: 3600,
            noise_patterns: default_noise_patterns(),
        }
    }
}

impl FeedSettings {
    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

pub fn default_noise_patterns() -> Vec<String> {
    ["Dependabot", "dependabot", "Bump", "bump", "hayashima"]
        .into_iter()
        .map(String::from)
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// `text` or `json`.
    pub format: String,
    pub dir: Option<String>,
    pub stderr: bool,
    pub filter: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            format: "text".into(),
            dir: None,
            stderr: false,
            filter: "info".into(),
        }
    }
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Blank tokens count as absent; otherwise fall back to the environment.
fn resolve_access_token(configured: Option<String>) -> Option<String> {
    configured
        .filter(|t| !t.trim().is_empty())
        .or_else(|| std::env::var(ACCESS_TOKEN_ENV).ok())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty() && !t.contains("${"))
}

/// Builder hides the `config` crate wiring (YAML + env overrides).
pub struct SitefeedConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for SitefeedConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl SitefeedConfigLoader {
    /// Start from the built-in defaults.
    ///
    /// ```
    /// use sitefeed_config::SitefeedConfigLoader;
    ///
    /// let config = SitefeedConfigLoader::new()
    ///     .with_yaml_str("feed:\n  user: octocat")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.feed.user, "octocat");
    /// assert_eq!(config.feed.max_pages, 5);
    /// assert_eq!(config.feed.cache_key, "github-feed");
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a YAML/TOML/JSON file; the `config` crate infers format by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Like [`Self::with_file`], but a missing file is skipped so deployments can
    /// rely purely on environment variables.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Allow tests/CLI to merge inline YAML snippets.
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self.builder.add_source(File::from_str(yaml, FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources into strongly typed config.
    ///
    /// ```
    /// use sitefeed_config::SitefeedConfigLoader;
    ///
    /// unsafe { std::env::set_var("FEED_OWNER", "octocat"); }
    ///
    /// let config = SitefeedConfigLoader::new()
    ///     .with_yaml_str(r#"
    /// feed:
    ///   user: "${FEED_OWNER}"
    ///   page_delay_ms: 0
    /// "#)
    ///     .load()
    ///     .expect("valid configuration");
    ///
    /// assert_eq!(config.feed.user, "octocat");
    /// assert!(config.feed.page_delay().is_zero());
    ///
    /// unsafe { std::env::remove_var("FEED_OWNER"); }
    /// ```
    pub fn load(self) -> Result<SitefeedConfig, ConfigError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("feed.noise_patterns"),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let mut typed: SitefeedConfig =
            serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))?;
        typed.feed.access_token = resolve_access_token(typed.feed.access_token.take());

        validate(&typed)?;
        Ok(typed)
    }
}

fn validate(cfg: &SitefeedConfig) -> Result<(), ConfigError> {
    if cfg.feed.max_pages == 0 {
        return Err(ConfigError::Message("feed.max_pages must be at least 1".into()));
    }
    if !cfg.feed.origin.starts_with("http") {
        return Err(ConfigError::Message(format!(
            "feed.origin must be an absolute http(s) URL, got {:?}",
            cfg.feed.origin
        )));
    }
    if cfg.feed.user.trim().is_empty() {
        return Err(ConfigError::Message("feed.user must not be empty".into()));
    }
    if cfg.feed.cache_ttl_secs > MAX_CACHE_TTL_SECS {
        return Err(ConfigError::Message(format!(
            "feed.cache_ttl_secs must be at most {MAX_CACHE_TTL_SECS}, got {}",
            cfg.feed.cache_ttl_secs
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expands_simple_string() {
        temp_env::with_var("FOO", Some("bar"), || {
            let mut v = json!("prefix-${FOO}-suffix");
            expand_env_in_value(&mut v);
            assert_eq!(v, json!("prefix-bar-suffix"));
        });
    }

    #[test]
    fn expands_in_array_and_object() {
        temp_env::with_vars([("ORIGIN", Some("https://ghe.local")), ("OWNER", Some("me"))], || {
            let mut v = json!({
                "feed": { "origin": "$ORIGIN", "noise_patterns": ["${OWNER}-private", 3] }
            });
            expand_env_in_value(&mut v);
            assert_eq!(
                v,
                json!({
                    "feed": { "origin": "https://ghe.local", "noise_patterns": ["me-private", 3] }
                })
            );
        });
    }

    #[test]
    fn stops_on_cycles() {
        temp_env::with_vars([("A", Some("${B}")), ("B", Some("${A}"))], || {
            let mut v = json!("x=${A}-y");
            expand_env_in_value(&mut v);
            let s = v.as_str().unwrap();
            assert!(s.starts_with("x=") && s.ends_with("-y"));
            assert!(s.contains("${"));
        });
    }

    #[test]
    fn unknown_vars_are_left_as_is() {
        let mut v = json!("hi-${DOES_NOT_EXIST_SITEFEED}");
        expand_env_in_value(&mut v);
        assert_eq!(v, json!("hi-${DOES_NOT_EXIST_SITEFEED}"));
    }

    #[test]
    fn blank_token_falls_back_to_env() {
        temp_env::with_var(ACCESS_TOKEN_ENV, Some(" ghp_fromenv "), || {
            assert_eq!(
                resolve_access_token(Some("   ".into())).as_deref(),
                Some("ghp_fromenv")
            );
            assert_eq!(
                resolve_access_token(Some("ghp_explicit".into())).as_deref(),
                Some("ghp_explicit")
            );
        });
    }

    #[test]
    fn missing_token_is_none() {
        temp_env::with_var(ACCESS_TOKEN_ENV, None::<&str>, || {
            assert_eq!(resolve_access_token(None), None);
            assert_eq!(resolve_access_token(Some("".into())), None);
            assert_eq!(resolve_access_token(Some("${UNSET_TOKEN}".into())), None);
        });
    }

    #[test]
    fn defaults_match_upstream_contract() {
        let feed = FeedSettings::default();
        assert_eq!(feed.max_pages, 5);
        assert_eq!(feed.min_entries_per_page, 5);
        assert_eq!(feed.page_delay(), Duration::from_millis(100));
        assert_eq!(feed.cache_ttl(), Duration::from_secs(3600));
        assert_eq!(feed.api_version, "2022-11-28");
        assert_eq!(feed.noise_patterns.len(), 5);
    }
}
