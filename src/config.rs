//! Repository configuration.
//!
//! A configuration file lists the managed working copies in execution order,
//! each with a small set of typed properties, plus process-wide default
//! command templates. Properties are resolved once at load time; the rest of
//! the crate only reads them through the accessors on [`RepoConfig`].

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::actions::Action;
use crate::error::GitBatchError;

pub const DEFAULT_COMMIT_CMD: &str = "git commit -a -m 'Automatic commit'";
pub const DEFAULT_PUSH_CMD: &str = "git push";
pub const DEFAULT_PULL_CMD: &str = "git pull";

/// Environment variable naming an explicit configuration file.
pub const CONFIG_ENV: &str = "GIT_BATCH_CONFIG";

const CONFIG_DIR_NAME: &str = "git-batch";
const CONFIG_FILE_NAMES: &[&str] = &["config.json", "config.yaml", "config.yml"];

/// Process-wide command templates used when a repository does not override them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Defaults {
    pub git_commit_cmd: String,
    pub git_push_cmd: String,
    pub git_pull_cmd: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            git_commit_cmd: DEFAULT_COMMIT_CMD.to_string(),
            git_push_cmd: DEFAULT_PUSH_CMD.to_string(),
            git_pull_cmd: DEFAULT_PULL_CMD.to_string(),
        }
    }
}

/// Command-template properties that fall back to a process default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Property {
    GitCommitCmd,
    GitPushCmd,
    GitPullCmd,
}

/// Per-repository properties. Unknown keys in the source file are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoProperties {
    pub unclean_action: Option<Action>,
    pub git_commit_cmd: Option<String>,
    pub git_push_cmd: Option<String>,
    pub git_pull_cmd: Option<String>,
    pub stash_on_pull: bool,
    pub skip_pull: bool,
}

/// One managed working copy. `path` is the identity key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoConfig {
    path: PathBuf,
    properties: RepoProperties,
}

impl RepoConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            properties: RepoProperties::default(),
        }
    }

    pub fn with_properties(path: impl Into<PathBuf>, properties: RepoProperties) -> Self {
        Self {
            path: path.into(),
            properties,
        }
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.properties.unclean_action = Some(action);
        self
    }

    pub fn with_stash_on_pull(mut self, stash: bool) -> Self {
        self.properties.stash_on_pull = stash;
        self
    }

    pub fn with_skip_pull(mut self, skip: bool) -> Self {
        self.properties.skip_pull = skip;
        self
    }

    pub fn with_command(mut self, key: Property, template: impl Into<String>) -> Self {
        let slot = match key {
            Property::GitCommitCmd => &mut self.properties.git_commit_cmd,
            Property::GitPushCmd => &mut self.properties.git_push_cmd,
            Property::GitPullCmd => &mut self.properties.git_pull_cmd,
        };
        *slot = Some(template.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn properties(&self) -> &RepoProperties {
        &self.properties
    }

    /// Resolve a command template, falling back to the process default.
    pub fn get<'a>(&'a self, key: Property, defaults: &'a Defaults) -> &'a str {
        let (own, fallback) = match key {
            Property::GitCommitCmd => (&self.properties.git_commit_cmd, &defaults.git_commit_cmd),
            Property::GitPushCmd => (&self.properties.git_push_cmd, &defaults.git_push_cmd),
            Property::GitPullCmd => (&self.properties.git_pull_cmd, &defaults.git_pull_cmd),
        };
        own.as_deref().unwrap_or(fallback)
    }

    /// Effective remediation action; `noop` when unset.
    pub fn unclean_action(&self) -> Action {
        self.properties.unclean_action.unwrap_or(Action::Noop)
    }

    pub fn stash_on_pull(&self) -> bool {
        self.properties.stash_on_pull
    }

    pub fn skip_pull(&self) -> bool {
        self.properties.skip_pull
    }
}

/// A loaded configuration: defaults plus the ordered repository list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub defaults: Defaults,
    pub repositories: Vec<RepoConfig>,
}

impl Config {
    /// Build a configuration from a parsed JSON/YAML document.
    pub fn from_value(value: &Value) -> Result<Self> {
        let root = value.as_object().ok_or_else(|| GitBatchError::InvalidConfigList {
            reason: "configuration root is not a mapping".to_string(),
        })?;

        let mut defaults = Defaults::default();
        for (key, slot) in [
            ("git_commit_cmd", &mut defaults.git_commit_cmd),
            ("git_push_cmd", &mut defaults.git_push_cmd),
            ("git_pull_cmd", &mut defaults.git_pull_cmd),
        ] {
            if let Some(template) = root.get(key).and_then(Value::as_str) {
                *slot = template.to_string();
            }
        }

        let repos = root
            .get("repositories")
            .ok_or_else(|| GitBatchError::InvalidConfigList {
                reason: "missing `repositories`".to_string(),
            })?;

        Ok(Self {
            defaults,
            repositories: parse_repositories(repos)?,
        })
    }
}

/// Parse a repository list. Element order is preserved.
pub fn parse_repositories(value: &Value) -> Result<Vec<RepoConfig>> {
    let elements = value.as_array().ok_or_else(|| GitBatchError::InvalidConfigList {
        reason: "`repositories` is not a sequence".to_string(),
    })?;

    elements
        .iter()
        .enumerate()
        .map(|(index, el)| parse_element(index, el))
        .collect()
}

/// Parse one entry: either `{path: ..., <props>}` or `[path, {<props>}]`.
fn parse_element(index: usize, el: &Value) -> Result<RepoConfig> {
    let invalid = |reason: String| GitBatchError::InvalidConfigElement { index, reason };

    let (path, props) = match el {
        Value::Object(map) => {
            let path = map
                .get("path")
                .and_then(Value::as_str)
                .ok_or_else(|| invalid("mapping has no string `path`".to_string()))?;
            let mut props = map.clone();
            props.remove("path");
            (path, Value::Object(props))
        }
        Value::Array(pair) if pair.len() == 2 => {
            let path = pair[0]
                .as_str()
                .ok_or_else(|| invalid("first element of pair is not a path".to_string()))?;
            let props = match &pair[1] {
                Value::Null => Value::Object(Default::default()),
                v @ Value::Object(_) => v.clone(),
                _ => return Err(invalid("second element of pair is not a mapping".to_string()).into()),
            };
            (path, props)
        }
        _ => return Err(invalid("not a path-keyed mapping".to_string()).into()),
    };

    if path.trim().is_empty() {
        return Err(invalid("empty path".to_string()).into());
    }

    let properties: RepoProperties =
        serde_json::from_value(props).map_err(|e| invalid(e.to_string()))?;

    Ok(RepoConfig::with_properties(expand_home(path), properties))
}

fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Check the invariants of a list assembled in code rather than loaded.
pub fn validate_list(cfg: &[RepoConfig]) -> Result<()> {
    if let Some(index) = cfg.iter().position(|el| el.path.as_os_str().is_empty()) {
        return Err(GitBatchError::InvalidConfigList {
            reason: format!("entry #{index} has an empty path"),
        }
        .into());
    }
    Ok(())
}

/// Read a configuration document, trying JSON first and then YAML.
pub fn read_config_value(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    if let Ok(v) = serde_json::from_str::<Value>(&content) {
        return Ok(v);
    }
    let yaml: serde_yaml_ng::Value = serde_yaml_ng::from_str(&content)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    serde_json::to_value(yaml)
        .with_context(|| format!("Unsupported value in config file {}", path.display()))
}

/// Locate the configuration file: explicit path, then `GIT_BATCH_CONFIG`,
/// then the per-user config directory.
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = std::env::var(CONFIG_ENV) {
        if !env_path.is_empty() {
            return Ok(PathBuf::from(env_path));
        }
    }

    let mut searched = Vec::new();
    if let Some(dir) = dirs::config_dir() {
        let dir = dir.join(CONFIG_DIR_NAME);
        for name in CONFIG_FILE_NAMES {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Ok(candidate);
            }
            searched.push(candidate.display().to_string());
        }
    }
    Err(GitBatchError::ConfigNotFound { searched }.into())
}

/// Resolve and load the active configuration.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let path = resolve_config_path(explicit)?;
    log::debug!("Loading configuration from {}", path.display());
    let value = read_config_value(&path)?;
    Config::from_value(&value).with_context(|| format!("Invalid configuration in {}", path.display()))
}
