//! Loading placement rule files, shape lists and content items from disk.
//!
//! Rule files may be JSON or TOML, chosen by extension; anything that is not
//! `.toml` is read as JSON. Shapes and items are always JSON.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tokio::fs;
use tracing::{debug, info};

use crate::application::placement::{RuleFile, RuleSet};
use crate::domain::shape::Shape;
use crate::infra::error::InfraError;

/// Load and compile rule files, keeping the given order as precedence order.
pub async fn load_rule_files(paths: &[PathBuf]) -> Result<RuleSet, InfraError> {
    let mut rules = RuleSet::new();
    for path in paths {
        let file = load_rule_file(path).await?;
        debug!(
            file = %path.display(),
            patterns = file.patterns().len(),
            "loaded placement rules"
        );
        rules.push_file(file);
    }
    info!(files = paths.len(), "placement rules ready");
    Ok(rules)
}

pub async fn load_rule_file(path: &Path) -> Result<RuleFile, InfraError> {
    let source = read_to_string(path).await?;
    let name = path.display().to_string();
    let parsed = if is_toml(path) {
        RuleFile::from_toml_str(&name, &source)
    } else {
        RuleFile::from_json_str(&name, &source)
    };
    parsed.map_err(|source| InfraError::RuleFile {
        path: path.to_path_buf(),
        source,
    })
}

/// Read a JSON array of shapes.
pub async fn load_shapes(path: &Path) -> Result<Vec<Shape>, InfraError> {
    let source = read_to_string(path).await?;
    serde_json::from_str(&source).map_err(|err| InfraError::decode(path, err.to_string()))
}

/// Read a content item; it must be a JSON object.
pub async fn load_item(path: &Path) -> Result<Value, InfraError> {
    let source = read_to_string(path).await?;
    let item: Value =
        serde_json::from_str(&source).map_err(|err| InfraError::decode(path, err.to_string()))?;
    if !item.is_object() {
        return Err(InfraError::decode(path, "content item must be a JSON object"));
    }
    Ok(item)
}

async fn read_to_string(path: &Path) -> Result<String, InfraError> {
    fs::read_to_string(path)
        .await
        .map_err(|source| InfraError::Read {
            path: path.to_path_buf(),
            source,
        })
}

fn is_toml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"))
}
