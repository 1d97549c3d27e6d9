//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{num::NonZeroU32, path::PathBuf, str::FromStr};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

pub use cli::{
    CliArgs, Command, InputArgs, LoggingOverrides, PlaceArgs, RenderArgs, RenderOverrides,
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "placard";
const ENV_PREFIX: &str = "PLACARD";
const DEFAULT_TEMPLATE: &str = "shape";
const DEFAULT_SIBLING_CONCURRENCY: u32 = 1;
const DEFAULT_SCRIPT_BASE: &str = "/js";
const DEFAULT_STYLE_BASE: &str = "/css";

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub render: RenderSettings,
    pub placement: PlacementSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub default_template: String,
    pub sibling_concurrency: NonZeroU32,
    pub minify_assets: bool,
    pub script_base: String,
    pub style_base: String,
}

#[derive(Debug, Clone)]
pub struct PlacementSettings {
    /// Rule files in precedence order.
    pub rule_files: Vec<PathBuf>,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match &cli.command {
        Command::Place(args) => {
            raw.apply_logging_overrides(&args.logging);
            raw.apply_input_overrides(&args.input);
        }
        Command::Render(args) => {
            raw.apply_logging_overrides(&args.logging);
            raw.apply_input_overrides(&args.input);
            raw.apply_render_overrides(&args.render);
        }
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    render: RawRenderSettings,
    placement: RawPlacementSettings,
}

impl RawSettings {
    fn apply_logging_overrides(&mut self, overrides: &LoggingOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }

    fn apply_input_overrides(&mut self, input: &InputArgs) {
        if !input.rules.is_empty() {
            self.placement.rule_files = Some(input.rules.clone());
        }
    }

    fn apply_render_overrides(&mut self, overrides: &RenderOverrides) {
        if let Some(template) = overrides.default_template.as_ref() {
            self.render.default_template = Some(template.clone());
        }
        if let Some(count) = overrides.sibling_concurrency {
            self.render.sibling_concurrency = Some(count.into());
        }
        if let Some(minify) = overrides.minify_assets {
            self.render.minify_assets = Some(minify);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            render,
            placement,
        } = raw;

        let logging = build_logging_settings(logging)?;
        let render = build_render_settings(render)?;
        let placement = build_placement_settings(placement);

        Ok(Self {
            logging,
            render,
            placement,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_render_settings(render: RawRenderSettings) -> Result<RenderSettings, LoadError> {
    let default_template = match render.default_template {
        Some(name) => {
            let trimmed = name.trim();
            if trimmed.is_empty() {
                return Err(LoadError::invalid(
                    "render.default_template",
                    "must not be empty",
                ));
            }
            trimmed.to_string()
        }
        None => DEFAULT_TEMPLATE.to_string(),
    };

    let sibling_concurrency = non_zero_u32(
        render
            .sibling_concurrency
            .unwrap_or(DEFAULT_SIBLING_CONCURRENCY.into()),
        "render.sibling_concurrency",
    )?;

    Ok(RenderSettings {
        default_template,
        sibling_concurrency,
        minify_assets: render.minify_assets.unwrap_or(false),
        script_base: render
            .script_base
            .unwrap_or_else(|| DEFAULT_SCRIPT_BASE.to_string()),
        style_base: render
            .style_base
            .unwrap_or_else(|| DEFAULT_STYLE_BASE.to_string()),
    })
}

fn build_placement_settings(placement: RawPlacementSettings) -> PlacementSettings {
    PlacementSettings {
        rule_files: placement.rule_files.unwrap_or_default(),
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRenderSettings {
    default_template: Option<String>,
    sibling_concurrency: Option<u64>,
    minify_assets: Option<bool>,
    script_base: Option<String>,
    style_base: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawPlacementSettings {
    rule_files: Option<Vec<PathBuf>>,
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
