#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    fmt,
    path::{Path, PathBuf},
};

use bon::Builder;

use crate::{
    constants::{
        DEFAULT_OPENAI_ENDPOINT, DEFAULT_OPENAI_MODEL, DEFAULT_QUESTIONS_ROOT, DEFAULT_SCRATCH_DIR,
    },
    model::CompletionParams,
    scratch::ScratchMode,
};

/// Environment variable holding the OpenAI API key.
pub const OPENAI_API_KEY_VAR: &str = "OPENAI_API_KEY";

/// Problems with the process configuration. Always fatal.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is unset or blank.
    #[error("Missing {0} environment variable")]
    MissingVar(&'static str),
    /// A variable is set to something that cannot be used.
    #[error("Environment variable {var} has invalid value `{value}`: {reason}")]
    InvalidValue {
        /// Variable name
        var:    &'static str,
        /// Offending value
        value:  String,
        /// Why it was rejected
        reason: String,
    },
}

/// OpenAI credentials and model selection sourced from the environment.
#[derive(Clone)]
pub struct OpenAiEnv {
    /// Base URL for the OpenAI-compatible API endpoint.
    api_base: String,
    /// API key used to authenticate requests.
    api_key:  String,
    /// Model identifier for chat completions.
    model:    String,
}

impl OpenAiEnv {
    /// Creates an `OpenAiEnv` from explicit values.
    pub fn new(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            api_base: api_base.into(),
            api_key:  api_key.into(),
            model:    model.into(),
        }
    }

    /// Reads `OPENAI_API_KEY`, `OPENAI_ENDPOINT` and `OPENAI_MODEL` through
    /// `lookup`; returns `None` when no API key is set.
    fn from_lookup<F>(lookup: &F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = non_blank(lookup, OPENAI_API_KEY_VAR)?;
        let api_base = non_blank(lookup, "OPENAI_ENDPOINT")
            .unwrap_or_else(|| DEFAULT_OPENAI_ENDPOINT.to_string());
        let model =
            non_blank(lookup, "OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string());

        Some(Self::new(api_base, api_key, model))
    }

    /// Returns the API base URL.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Returns the API key.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Returns the model identifier.
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl fmt::Debug for OpenAiEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiEnv")
            .field("api_base", &self.api_base)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .finish()
    }
}

/// Everything the grader needs to start: where units live, where scratch
/// artifacts go, and how to reach the model.
#[derive(Clone, Debug, Builder)]
#[builder(on(PathBuf, into))]
pub struct GraderConfig {
    /// Root directory holding one folder per unit.
    #[builder(default = PathBuf::from(DEFAULT_QUESTIONS_ROOT))]
    questions_root: PathBuf,
    /// Directory for scratch artifacts; wiped at startup.
    #[builder(default = PathBuf::from(DEFAULT_SCRATCH_DIR))]
    scratch_dir:    PathBuf,
    /// How grading calls share the scratch directory.
    #[builder(default)]
    scratch_mode:   ScratchMode,
    /// Model credentials, if configured.
    openai:         Option<OpenAiEnv>,
}

impl GraderConfig {
    /// Builds the configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    ///
    /// Recognised variables: `OPENAI_API_KEY`, `OPENAI_ENDPOINT`,
    /// `OPENAI_MODEL`, `TEXGRADE_QUESTIONS_ROOT`, `TEXGRADE_SCRATCH_DIR` and
    /// `TEXGRADE_SCRATCH_MODE` (`serialized` or `per-call`).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let scratch_mode = match non_blank(&lookup, "TEXGRADE_SCRATCH_MODE") {
            Some(value) => value
                .parse::<ScratchMode>()
                .map_err(|reason| ConfigError::InvalidValue {
                    var: "TEXGRADE_SCRATCH_MODE",
                    value,
                    reason,
                })?,
            None => ScratchMode::default(),
        };

        Ok(Self::builder()
            .maybe_questions_root(non_blank(&lookup, "TEXGRADE_QUESTIONS_ROOT"))
            .maybe_scratch_dir(non_blank(&lookup, "TEXGRADE_SCRATCH_DIR"))
            .scratch_mode(scratch_mode)
            .maybe_openai(OpenAiEnv::from_lookup(&lookup))
            .build())
    }

    /// Overrides the questions root.
    pub fn with_questions_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.questions_root = root.into();
        self
    }

    /// Overrides the scratch directory.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    /// Returns the questions root.
    pub fn questions_root(&self) -> &Path {
        &self.questions_root
    }

    /// Returns the scratch directory.
    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// Returns the scratch sharing strategy.
    pub fn scratch_mode(&self) -> ScratchMode {
        self.scratch_mode
    }

    /// Returns the model credentials, or an error naming the missing
    /// variable.
    pub fn openai(&self) -> Result<&OpenAiEnv, ConfigError> {
        self.openai
            .as_ref()
            .ok_or(ConfigError::MissingVar(OPENAI_API_KEY_VAR))
    }

    /// Zero-temperature completion parameters for the configured model.
    pub fn completion_params(&self) -> Result<CompletionParams, ConfigError> {
        Ok(CompletionParams::deterministic(self.openai()?.model()))
    }
}

/// Looks up `key`, trimming the value and treating blank values as unset.
fn non_blank<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = GraderConfig::from_lookup(lookup_from(&[])).expect("empty config");
        assert_eq!(cfg.questions_root(), Path::new(DEFAULT_QUESTIONS_ROOT));
        assert_eq!(cfg.scratch_dir(), Path::new(DEFAULT_SCRATCH_DIR));
        assert_eq!(cfg.scratch_mode(), ScratchMode::Serialized);
        assert_eq!(
            cfg.openai().unwrap_err(),
            ConfigError::MissingVar(OPENAI_API_KEY_VAR)
        );
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let cfg = GraderConfig::from_lookup(lookup_from(&[("OPENAI_API_KEY", "   ")]))
            .expect("config with blank key");
        assert!(cfg.openai().is_err());
        assert!(cfg.completion_params().is_err());
    }

    #[test]
    fn reads_openai_settings() {
        let cfg = GraderConfig::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", " sk-test "),
            ("OPENAI_MODEL", "gpt-test"),
        ]))
        .expect("config with key");
        let openai = cfg.openai().expect("openai configured");
        assert_eq!(openai.api_key(), "sk-test");
        assert_eq!(openai.api_base(), DEFAULT_OPENAI_ENDPOINT);
        assert_eq!(
            cfg.completion_params().expect("params"),
            CompletionParams::deterministic("gpt-test")
        );
        assert!(!format!("{openai:?}").contains("sk-test"));
    }

    #[test]
    fn parses_scratch_mode_and_directories() {
        let cfg = GraderConfig::from_lookup(lookup_from(&[
            ("TEXGRADE_SCRATCH_MODE", "per-call"),
            ("TEXGRADE_QUESTIONS_ROOT", "/srv/units"),
        ]))
        .expect("config with mode")
        .with_scratch_dir("/tmp/scratch");
        assert_eq!(cfg.scratch_mode(), ScratchMode::PerCall);
        assert_eq!(cfg.questions_root(), Path::new("/srv/units"));
        assert_eq!(cfg.scratch_dir(), Path::new("/tmp/scratch"));
    }

    #[test]
    fn rejects_unknown_scratch_mode() {
        let err = GraderConfig::from_lookup(lookup_from(&[("TEXGRADE_SCRATCH_MODE", "random")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                var: "TEXGRADE_SCRATCH_MODE",
                ..
            }
        ));
    }
}
