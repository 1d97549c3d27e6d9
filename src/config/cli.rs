use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the placard binary.
#[derive(Debug, Parser)]
#[command(
    name = "placard",
    version,
    about = "Place shapes into zones and render them as HTML"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "PLACARD_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Place shapes and print the resulting zone tree as JSON.
    Place(PlaceArgs),
    /// Place shapes and stream the rendered HTML page to stdout.
    Render(RenderArgs),
}

#[derive(Debug, Args, Clone)]
pub struct PlaceArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub logging: LoggingOverrides,
}

#[derive(Debug, Args, Clone)]
pub struct RenderArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub logging: LoggingOverrides,

    #[command(flatten)]
    pub render: RenderOverrides,
}

#[derive(Debug, Args, Clone, Default)]
pub struct InputArgs {
    /// JSON array of shapes to place.
    #[arg(
        long,
        value_name = "FILE",
        value_hint = ValueHint::FilePath,
        required_unless_present = "item",
        conflicts_with = "item"
    )]
    pub shapes: Option<PathBuf>,

    /// JSON content item whose parts are loaded into shapes.
    #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub item: Option<PathBuf>,

    /// Display type stamped on shapes loaded from an item.
    #[arg(long = "display-type", value_name = "NAME", default_value = "main")]
    pub display_type: String,

    /// Placement rule files in precedence order; replaces `placement.rule_files`.
    #[arg(long = "rules", value_name = "FILE", value_hint = ValueHint::FilePath, num_args = 1..)]
    pub rules: Vec<PathBuf>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct LoggingOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct RenderOverrides {
    /// Override the template tried after every shape-specific candidate.
    #[arg(long = "default-template", value_name = "NAME")]
    pub default_template: Option<String>,

    /// Override how many sibling shapes may render concurrently.
    #[arg(long = "sibling-concurrency", value_name = "COUNT")]
    pub sibling_concurrency: Option<u32>,

    /// Reference minified script and stylesheet assets.
    #[arg(
        long = "minify-assets",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub minify_assets: Option<bool>,
}
