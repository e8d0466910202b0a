use config::{Config, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub mod validator;
pub mod watcher;

use crate::cli::Cli;
use crate::domain::Template;
use crate::engine::DeletePolicy;
use validator::TemplateValidator;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub templates: TemplateSettings,
    #[serde(default)]
    pub forms: FormSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TemplateSettings {
    /// Directory holding one `*.json` file per template
    pub dir: PathBuf,
    /// Character sequence every trigger must start with
    #[serde(default = "default_trigger_prefix")]
    pub trigger_prefix: String,
}

fn default_trigger_prefix() -> String {
    "/".to_string()
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FormSettings {
    #[serde(default)]
    pub delete_policy: DeletePolicy,
}

impl Settings {
    /// Create settings from CLI arguments (config file, then CLI/env overrides)
    pub fn new_with_cli(cli: &Cli) -> Result<Self, anyhow::Error> {
        let mut settings = Self::from_file(&cli.config)?;
        settings.apply_cli_overrides(cli);
        Ok(settings)
    }

    /// Load `<root>/quill.{toml,yaml,json}` if present; the templates
    /// directory defaults to `<root>/templates`.
    pub fn from_root(root: &str) -> Result<Self, anyhow::Error> {
        let config_path = Path::new(root).join("quill");
        let s = Config::builder()
            .add_source(File::from(config_path).required(false))
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("templates.dir", Path::new(root).join("templates").to_string_lossy().to_string())?
            .set_default("templates.trigger_prefix", default_trigger_prefix())?
            .build()?;

        Ok(s.try_deserialize()?)
    }

    fn from_file(config_path: &Path) -> Result<Self, anyhow::Error> {
        let s = Config::builder()
            .add_source(File::from(config_path.to_path_buf()).required(false))
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("templates.dir", "templates")?
            .set_default("templates.trigger_prefix", default_trigger_prefix())?
            .build()?;

        Ok(s.try_deserialize()?)
    }

    fn apply_cli_overrides(&mut self, cli: &Cli) {
        if let Some(host) = &cli.host {
            self.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            self.server.port = port;
        }
        if let Some(dir) = &cli.templates {
            self.templates.dir = dir.clone();
        }
    }

    pub fn validator(&self) -> TemplateValidator {
        TemplateValidator::new(&self.templates.trigger_prefix)
    }
}

/// Load every `*.json` template in `dir`, keyed by file stem, in path order.
///
/// Files failing authoring validation (bad JSON, bad or duplicate trigger)
/// are skipped with a warning. A missing directory yields no templates.
pub fn load_templates_from_dir(dir: &Path, validator: &TemplateValidator) -> Result<Vec<(String, Template)>, anyhow::Error> {
    let mut loaded: Vec<(String, Template)> = Vec::new();
    if !dir.exists() {
        warn!("Templates directory does not exist: {}", dir.display());
        return Ok(loaded);
    }

    let pattern = format!("{}/*.json", dir.display());
    let mut paths: Vec<PathBuf> = glob::glob(&pattern)?.filter_map(Result::ok).collect();
    paths.sort();

    for path in paths {
        let Some(id) = path.file_stem().and_then(|s| s.to_str()).map(String::from) else {
            continue;
        };
        let content = std::fs::read_to_string(&path)?;
        let existing: Vec<&Template> = loaded.iter().map(|(_, t)| t).collect();
        match validator.validate_text(&content, &existing) {
            Ok(template) => loaded.push((id, template)),
            Err(errors) => {
                let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
                warn!("Skipping template {}: {}", path.display(), messages.join("; "));
            }
        }
    }

    info!("Loaded {} templates from {}", loaded.len(), dir.display());
    Ok(loaded)
}
