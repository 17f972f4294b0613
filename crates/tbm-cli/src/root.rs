use anyhow::Context;
use std::path::{Path, PathBuf};
use tbm_core::catalog::Catalog;
use tbm_core::config::EngineConfig;
use tbm_core::paths::{config_path, CONFIG_FILE};

/// Resolve the engine config file.
///
/// Priority:
/// 1. `--config` flag / `TBM_CONFIG` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `tbm.yaml`
/// 3. None: built-in defaults apply
pub fn resolve_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = explicit {
        return Some(p.to_path_buf());
    }

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let mut dir = cwd;
    loop {
        let candidate = config_path(&dir);
        if candidate.is_file() {
            return Some(candidate);
        }
        match dir.parent() {
            Some(p) => dir = p.to_path_buf(),
            None => return None,
        }
    }
}

/// Where `config init` writes when nothing was resolved.
pub fn default_config_target(explicit: Option<&Path>) -> PathBuf {
    match explicit {
        Some(p) => p.to_path_buf(),
        None => PathBuf::from(CONFIG_FILE),
    }
}

/// Engine config plus the file it came from, if any.
pub struct Loaded {
    pub config: EngineConfig,
    pub path: Option<PathBuf>,
}

impl Loaded {
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let path = resolve_config(explicit);
        let config = EngineConfig::load_or_default(path.as_deref()).with_context(|| {
            format!(
                "failed to load config from {}",
                path.as_deref().unwrap_or(Path::new(CONFIG_FILE)).display()
            )
        })?;
        if let Some(p) = &path {
            tracing::debug!(path = %p.display(), "config loaded");
        }
        Ok(Self { config, path })
    }

    /// The catalog the config points at; relative paths resolve against the
    /// config file's directory.
    pub fn catalog(&self) -> anyhow::Result<Catalog> {
        let base = self.path.as_deref().and_then(Path::parent);
        self.config
            .load_catalog(base)
            .context("failed to load catalog")
    }
}
