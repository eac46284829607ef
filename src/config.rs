use anyhow::{Context, Result, anyhow};
use directories::UserDirs;
use log::info;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::library::ReferenceLibrary;
use crate::recorder::RecorderSettings;

#[derive(Debug, Clone, Deserialize)]
pub struct Meta {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecorderSection {
    pub seq_len: usize,
    pub batch_size: usize,
    pub threshold: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LibrarySection {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub meta: Meta,
    pub recorder: RecorderSection,
    pub library: LibrarySection,
}

impl Settings {
    pub fn from_toml_str(txt: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(txt)?;
        validate_settings(&settings)?;
        Ok(settings)
    }

    /// `[meta] name`, falling back to the settings file stem.
    pub fn name(&self, config_path: &Path) -> String {
        self.meta
            .name
            .clone()
            .or_else(|| config_path.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .unwrap_or_default()
    }

    pub fn recorder_settings(&self) -> RecorderSettings {
        RecorderSettings {
            seq_len: self.recorder.seq_len,
            batch_size: self.recorder.batch_size,
            threshold: self.recorder.threshold,
        }
    }
}

/// Where settings come from plus the library they point at.
#[derive(Debug, Clone)]
pub struct ConfigState {
    pub config_path: PathBuf,
    pub settings: Settings,
    pub library_override: Option<PathBuf>,
}

pub fn config_dir() -> Result<PathBuf> {
    let dirs = UserDirs::new().ok_or_else(|| anyhow!("cannot determine home directory"))?;
    Ok(dirs.home_dir().join(".config").join("signctl"))
}

fn default_config_text() -> &'static str {
    include_str!("../config/default.toml")
}

impl ConfigState {
    pub fn name(&self) -> String {
        self.settings.name(&self.config_path)
    }

    /// Load `config` if given, otherwise `~/.config/signctl/config.toml`,
    /// installing the bundled default there on first use.
    pub fn load(config: Option<PathBuf>, library_override: Option<PathBuf>) -> Result<Self> {
        let config_path = match config {
            Some(p) => p,
            None => install_default()?,
        };
        let settings = load_settings(&config_path)?;
        Ok(Self {
            config_path,
            settings,
            library_override,
        })
    }

    /// Re-read the settings file; on error the current settings stay.
    pub fn reload(&mut self) -> Result<()> {
        self.settings = load_settings(&self.config_path)?;
        Ok(())
    }

    pub fn library_path(&self) -> PathBuf {
        if let Some(p) = &self.library_override {
            return p.clone();
        }
        let p = &self.settings.library.path;
        if p.is_absolute() {
            return p.clone();
        }
        self.config_path
            .parent()
            .map(|dir| dir.join(p))
            .unwrap_or_else(|| p.clone())
    }

    pub fn load_library(&self) -> Result<ReferenceLibrary> {
        let path = self.library_path();
        let lib = ReferenceLibrary::load(&path)?;
        if lib.is_empty() {
            log::warn!("reference library {} is empty; every recording stays blank", path.display());
        }
        Ok(lib)
    }
}

fn install_default() -> Result<PathBuf> {
    let dir = config_dir()?;
    fs::create_dir_all(&dir)?;
    let path = dir.join("config.toml");
    if !path.exists() {
        fs::write(&path, default_config_text())?;
        info!("installed default config at {}", path.display());
    }
    Ok(path)
}

fn load_settings(path: &Path) -> Result<Settings> {
    let txt = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    Settings::from_toml_str(&txt).with_context(|| format!("failed to parse {}", path.display()))
}

fn validate_settings(s: &Settings) -> Result<()> {
    if s.recorder.seq_len == 0 {
        return Err(anyhow!("recorder.seq_len must be positive"));
    }
    if s.recorder.batch_size == 0 {
        return Err(anyhow!("recorder.batch_size must be positive"));
    }
    if !(s.recorder.threshold > 0.0 && s.recorder.threshold <= 1.0) {
        return Err(anyhow!("recorder.threshold must be in (0,1]"));
    }
    if s.library.path.as_os_str().is_empty() {
        return Err(anyhow!("library.path must not be empty"));
    }
    Ok(())
}
