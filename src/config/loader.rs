//! Configuration loader
//!
//! Loads resolver settings and tag class definitions from YAML files.

use anyhow::{anyhow, Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use super::types::{ResolverConfig, TagClassesConfig};
use crate::label::{Label, LabelConverter};
use crate::schema::AttributeSchema;

pub const CONFIG_DIR_ENV: &str = "TAG_RESOLVER_CONFIG_DIR";
pub const HOST_PLATFORM_ENV: &str = "TAG_RESOLVER_HOST_PLATFORM";

pub struct ConfigLoader {
    config_dir: PathBuf,
}

impl ConfigLoader {
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    /// Create loader from TAG_RESOLVER_CONFIG_DIR or default to "config"
    pub fn from_env() -> Self {
        match std::env::var(CONFIG_DIR_ENV) {
            Ok(dir) => Self::new(dir),
            Err(_) => Self::new("config"),
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Load `resolver.yaml`. A missing file yields the defaults; the
    /// TAG_RESOLVER_HOST_PLATFORM environment variable overrides the platform.
    pub fn load_resolver_config(&self) -> Result<ResolverConfig> {
        let path = self.config_dir.join("resolver.yaml");

        let mut config: ResolverConfig = if path.exists() {
            info!("Loading resolver configuration from {}", path.display());
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        } else {
            debug!("No {} found, using defaults", path.display());
            ResolverConfig::default()
        };

        if let Ok(platform) = std::env::var(HOST_PLATFORM_ENV) {
            config.host_platform = platform;
        }

        Label::parse_canonical(&config.host_platform)
            .with_context(|| format!("Invalid host_platform '{}'", config.host_platform))?;

        Ok(config)
    }

    /// Load tag class definitions
    ///
    /// Supports two modes:
    /// 1. Single file: tag_classes.yaml
    /// 2. Split directory: tag_classes/*.yaml (files starting with '_' are skipped)
    pub fn load_tag_classes(&self) -> Result<BTreeMap<String, Arc<AttributeSchema>>> {
        let dir = self.config_dir.join("tag_classes");

        let config = if dir.is_dir() {
            self.load_tag_classes_from_directory(&dir)?
        } else {
            self.load_tag_classes_from_file(&self.config_dir.join("tag_classes.yaml"))?
        };

        // Allowed labels are written relative to the main repository
        let labels = LabelConverter::main_repo();
        let mut schemas = BTreeMap::new();
        for (name, class) in config.tag_classes {
            let schema = class
                .into_schema(&name, &labels)
                .with_context(|| format!("Invalid tag class '{}'", name))?;
            schemas.insert(name, Arc::new(schema));
        }

        info!("Loaded {} tag classes", schemas.len());
        Ok(schemas)
    }

    fn load_tag_classes_from_file(&self, path: &Path) -> Result<TagClassesConfig> {
        info!("Loading tag classes from {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        serde_yaml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    fn load_tag_classes_from_directory(&self, dir: &Path) -> Result<TagClassesConfig> {
        info!("Loading tag classes from directory {}", dir.display());

        let mut merged = TagClassesConfig {
            version: "1.0".to_string(),
            tag_classes: BTreeMap::new(),
        };

        for path in self.find_yaml_files(dir)? {
            let skipped = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with('_'))
                .unwrap_or(false);
            if skipped {
                continue;
            }

            let partial = self.load_tag_classes_from_file(&path)?;
            for (name, class) in partial.tag_classes {
                if merged.tag_classes.contains_key(&name) {
                    return Err(anyhow!(
                        "Tag class '{}' defined more than once (again in {})",
                        name,
                        path.display()
                    ));
                }
                merged.tag_classes.insert(name, class);
            }
        }

        Ok(merged)
    }

    fn find_yaml_files(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        for entry in std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read directory {}", dir.display()))?
        {
            let path = entry?.path();
            if path.is_file()
                && path
                    .extension()
                    .map(|e| e == "yaml" || e == "yml")
                    .unwrap_or(false)
            {
                files.push(path);
            }
        }

        // Sort for deterministic loading order
        files.sort();
        Ok(files)
    }
}
