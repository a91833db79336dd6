use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde_yml::Value;

use crate::cop::{Cop, CopConfig};
use crate::diagnostic::Severity;
use crate::regexp::InterpolationHandling;

/// Resolved configuration from .rubocop.yml.
///
/// Reads a single YAML file: per-cop Enabled/Severity/Exclude/Include plus
/// free-form options, and AllCops.Exclude. No inheritance.
#[derive(Debug)]
pub struct ResolvedConfig {
    /// Directory the config file lives in. Relative globs resolve against it.
    config_dir: Option<PathBuf>,
    /// Per-cop configs keyed by cop name (e.g. "Style/RedundantRegexpCharacterClass")
    cop_configs: HashMap<String, CopConfig>,
    /// Cops whose config sets `Enabled` explicitly.
    explicit_enabled: HashMap<String, bool>,
    cop_filters: HashMap<String, PathFilter>,
    global_excludes: Vec<String>,
}

/// Compiled per-cop Include/Exclude globs.
#[derive(Debug)]
struct PathFilter {
    include: Option<GlobSet>,
    exclude: GlobSet,
}

impl PathFilter {
    fn new(config: &CopConfig, cop_name: &str) -> Result<Self> {
        let include = if config.include.is_empty() {
            None
        } else {
            Some(build_globset(&config.include).with_context(|| format!("invalid Include for {cop_name}"))?)
        };
        let exclude =
            build_globset(&config.exclude).with_context(|| format!("invalid Exclude for {cop_name}"))?;
        Ok(Self { include, exclude })
    }

    fn allows(&self, candidates: &[&Path]) -> bool {
        if candidates.iter().any(|p| self.exclude.is_match(p)) {
            return false;
        }
        match &self.include {
            Some(include) => candidates.iter().any(|p| include.is_match(p)),
            None => true,
        }
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).with_context(|| format!("bad glob `{pattern}`"))?);
    }
    Ok(builder.build()?)
}

impl ResolvedConfig {
    fn empty() -> Self {
        Self {
            config_dir: None,
            cop_configs: HashMap::new(),
            explicit_enabled: HashMap::new(),
            cop_filters: HashMap::new(),
            global_excludes: Vec::new(),
        }
    }
}

/// Load config from the given path, or look for `.rubocop.yml` in the
/// current directory. Returns an empty config if the file doesn't exist.
pub fn load_config(path: Option<&Path>) -> Result<ResolvedConfig> {
    let config_path = match path {
        Some(p) => p.to_path_buf(),
        None => Path::new(".rubocop.yml").to_path_buf(),
    };

    if !config_path.exists() {
        return Ok(ResolvedConfig::empty());
    }

    let contents = std::fs::read_to_string(&config_path)
        .with_context(|| format!("failed to read config {}", config_path.display()))?;
    let raw: Value = serde_yml::from_str(&contents)
        .with_context(|| format!("failed to parse {}", config_path.display()))?;

    let mut config = ResolvedConfig::empty();
    config.config_dir = config_path.parent().map(Path::to_path_buf);

    if let Value::Mapping(map) = &raw {
        for (key, value) in map {
            let Some(key_str) = key.as_str() else {
                continue;
            };

            if key_str == "AllCops" {
                if let Some(excludes) = extract_string_list(value, "Exclude") {
                    config.global_excludes = excludes;
                }
                continue;
            }

            // Cop names contain "/" (e.g. "Lint/MixedRegexpCaptureTypes")
            if key_str.contains('/') {
                let (cop_config, enabled) = parse_cop_config(value);
                validate_cop_options(key_str, &cop_config)
                    .with_context(|| format!("invalid configuration in {}", config_path.display()))?;
                if let Some(enabled) = enabled {
                    config.explicit_enabled.insert(key_str.to_string(), enabled);
                }
                config
                    .cop_filters
                    .insert(key_str.to_string(), PathFilter::new(&cop_config, key_str)?);
                config.cop_configs.insert(key_str.to_string(), cop_config);
            }
        }
    }

    Ok(config)
}

impl ResolvedConfig {
    /// Check if a cop is enabled for the given file path. Cops without an
    /// `Enabled` key fall back to their own default.
    pub fn is_cop_enabled(&self, cop: &dyn Cop, path: &Path) -> bool {
        let name = cop.name();
        let enabled = self
            .explicit_enabled
            .get(name)
            .copied()
            .unwrap_or_else(|| cop.default_enabled());
        if !enabled {
            return false;
        }
        match self.cop_filters.get(name) {
            Some(filter) => {
                let relative = self
                    .config_dir
                    .as_deref()
                    .and_then(|dir| path.strip_prefix(dir).ok());
                let stripped = path.strip_prefix("./").ok();
                let candidates: Vec<&Path> = [Some(path), relative, stripped].into_iter().flatten().collect();
                filter.allows(&candidates)
            }
            None => true,
        }
    }

    /// Get the resolved config for a specific cop.
    pub fn cop_config(&self, name: &str) -> CopConfig {
        self.cop_configs.get(name).cloned().unwrap_or_default()
    }

    /// Global exclude patterns from AllCops.Exclude.
    pub fn global_excludes(&self) -> &[String] {
        &self.global_excludes
    }

    pub fn config_dir(&self) -> Option<&Path> {
        self.config_dir.as_deref()
    }
}

/// Returns the config plus the explicit `Enabled` value, if any.
fn parse_cop_config(value: &Value) -> (CopConfig, Option<bool>) {
    let mut config = CopConfig::default();
    let mut enabled = None;

    if let Value::Mapping(map) = value {
        for (k, v) in map {
            let Some(key) = k.as_str() else {
                continue;
            };
            match key {
                "Enabled" => {
                    if let Some(b) = v.as_bool() {
                        config.enabled = b;
                        enabled = Some(b);
                    }
                }
                "Severity" => {
                    if let Some(s) = v.as_str() {
                        config.severity = Severity::parse(s);
                    }
                }
                "Exclude" => {
                    if let Some(list) = value_to_string_list(v) {
                        config.exclude = list;
                    }
                }
                "Include" => {
                    if let Some(list) = value_to_string_list(v) {
                        config.include = list;
                    }
                }
                _ => {
                    config.options.insert(key.to_string(), v.clone());
                }
            }
        }
    }

    (config, enabled)
}

/// Options with a closed set of values are checked at load time.
fn validate_cop_options(name: &str, config: &CopConfig) -> Result<()> {
    if name == "Lint/MixedRegexpCaptureTypes" {
        if let Some(value) = config.options.get("Interpolation") {
            let text = value.as_str().unwrap_or_default();
            text.parse::<InterpolationHandling>()
                .with_context(|| format!("{name}: Interpolation"))?;
        }
    }
    Ok(())
}

fn extract_string_list(value: &Value, key: &str) -> Option<Vec<String>> {
    value_to_string_list(value.as_mapping()?.get(&Value::String(key.to_string()))?)
}

fn value_to_string_list(value: &Value) -> Option<Vec<String>> {
    value.as_sequence().map(|seq| {
        seq.iter()
            .filter_map(|v| v.as_str().map(String::from))
            .collect()
    })
}
