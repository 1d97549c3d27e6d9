//! Declarative placement rules, merged from many rule files into one
//! immutable [`RuleSet`].
//!
//! A rule file is a mapping. Its `matches` array holds pattern rules: every key
//! other than `path` and `order` is a predicate (`type`, `displayType`, `id`,
//! `name`, or a dotted path such as `meta.item.meta.type`) whose value is a
//! regular expression. Every other top-level key is a shorthand rule keyed by an
//! exact shape type or shape name.
//!
//! ```json
//! {
//!   "matches": [
//!     {"type": "^page$", "displayType": "main", "path": "content", "order": "before"}
//!   ],
//!   "tag-cloud-widget": {"path": "footer"}
//! }
//! ```

use std::sync::Arc;

use indexmap::IndexMap;
use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::{
    error::DomainError,
    order::PlacementTarget,
    shape::{AttributePath, Shape},
};

const MATCHES_KEY: &str = "matches";
const PATH_KEY: &str = "path";
const ORDER_KEY: &str = "order";

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("rule file `{file}`: predicate `{key}` is not a valid pattern")]
    InvalidPattern {
        file: String,
        key: String,
        #[source]
        source: regex::Error,
    },
    #[error("rule file `{file}`: invalid target for `{rule}`")]
    InvalidTarget {
        file: String,
        rule: String,
        #[source]
        source: DomainError,
    },
    #[error("rule file `{file}` is malformed: {reason}")]
    Malformed { file: String, reason: String },
    #[error("rule file `{file}` could not be decoded: {message}")]
    Decode { file: String, message: String },
}

impl RuleError {
    fn malformed(file: &str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            file: file.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Predicate {
    key: String,
    attribute: AttributePath,
    pattern: Regex,
}

impl Predicate {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Unanchored: `^...$` must be spelled out for a full match.
    pub fn matches(&self, shape: &Shape) -> bool {
        shape
            .attribute(&self.attribute)
            .is_some_and(|value| self.pattern.is_match(&value))
    }
}

#[derive(Debug, Clone)]
pub struct PatternRule {
    pub(crate) source: Arc<str>,
    pub(crate) index: usize,
    predicates: Vec<Predicate>,
    pub(crate) target: PlacementTarget,
}

impl PatternRule {
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn target(&self) -> &PlacementTarget {
        &self.target
    }

    /// A rule without predicates matches every shape.
    pub fn matches(&self, shape: &Shape) -> bool {
        self.predicates.iter().all(|predicate| predicate.matches(shape))
    }
}

#[derive(Debug, Clone)]
pub struct ShorthandRule {
    pub(crate) source: Arc<str>,
    pub(crate) target: PlacementTarget,
}

impl ShorthandRule {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn target(&self) -> &PlacementTarget {
        &self.target
    }
}

/// One parsed rule file, in declaration order.
#[derive(Debug, Clone)]
pub struct RuleFile {
    name: Arc<str>,
    patterns: Vec<PatternRule>,
    shorthands: IndexMap<String, PlacementTarget>,
}

impl RuleFile {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn patterns(&self) -> &[PatternRule] {
        &self.patterns
    }

    pub fn from_json_str(name: &str, source: &str) -> Result<Self, RuleError> {
        let value: Value = serde_json::from_str(source).map_err(|err| RuleError::Decode {
            file: name.to_string(),
            message: err.to_string(),
        })?;
        Self::from_value(name, &value)
    }

    pub fn from_toml_str(name: &str, source: &str) -> Result<Self, RuleError> {
        let value: Value = toml::from_str(source).map_err(|err| RuleError::Decode {
            file: name.to_string(),
            message: err.to_string(),
        })?;
        Self::from_value(name, &value)
    }

    /// Compile a rule file. Patterns and targets are validated here so a bad
    /// file fails at load time instead of during placement.
    pub fn from_value(name: &str, value: &Value) -> Result<Self, RuleError> {
        let object = value
            .as_object()
            .ok_or_else(|| RuleError::malformed(name, "top level must be a mapping"))?;
        let source: Arc<str> = Arc::from(name);

        let mut patterns = Vec::new();
        let mut shorthands = IndexMap::new();

        for (key, entry) in object {
            if key == MATCHES_KEY {
                let rules = entry.as_array().ok_or_else(|| {
                    RuleError::malformed(name, "`matches` must be an array of rules")
                })?;
                for (index, rule) in rules.iter().enumerate() {
                    patterns.push(compile_pattern_rule(&source, index, rule)?);
                }
                continue;
            }

            let rule = entry.as_object().ok_or_else(|| {
                RuleError::malformed(name, format!("shorthand `{key}` must be a mapping"))
            })?;
            let target = compile_target(&source, key, rule)?;
            shorthands.insert(key.clone(), target);
        }

        Ok(Self {
            name: source,
            patterns,
            shorthands,
        })
    }
}

fn compile_pattern_rule(source: &Arc<str>, index: usize, rule: &Value) -> Result<PatternRule, RuleError> {
    let label = format!("{MATCHES_KEY}[{index}]");
    let rule = rule.as_object().ok_or_else(|| {
        RuleError::malformed(source, format!("`{label}` must be a mapping"))
    })?;

    let mut predicates = Vec::new();
    for (key, pattern) in rule {
        if key == PATH_KEY || key == ORDER_KEY {
            continue;
        }
        let pattern = pattern.as_str().ok_or_else(|| {
            RuleError::malformed(
                source,
                format!("`{label}`: predicate `{key}` must be a string pattern"),
            )
        })?;
        let pattern = Regex::new(pattern).map_err(|err| RuleError::InvalidPattern {
            file: source.to_string(),
            key: key.clone(),
            source: err,
        })?;
        predicates.push(Predicate {
            key: key.clone(),
            attribute: AttributePath::parse(key),
            pattern,
        });
    }

    Ok(PatternRule {
        source: Arc::clone(source),
        index,
        predicates,
        target: compile_target(source, &label, rule)?,
    })
}

fn compile_target(
    source: &Arc<str>,
    rule: &str,
    entry: &Map<String, Value>,
) -> Result<PlacementTarget, RuleError> {
    let path = entry
        .get(PATH_KEY)
        .and_then(Value::as_str)
        .ok_or_else(|| RuleError::malformed(source, format!("`{rule}` needs a string `path`")))?;

    let order = match entry.get(ORDER_KEY) {
        None | Some(Value::Null) => None,
        Some(Value::String(order)) => Some(order.clone()),
        Some(Value::Number(order)) => Some(order.to_string()),
        Some(_) => {
            return Err(RuleError::malformed(
                source,
                format!("`{rule}`: `order` must be a string or number"),
            ));
        }
    };

    PlacementTarget::parse(path, order.as_deref()).map_err(|err| RuleError::InvalidTarget {
        file: source.to_string(),
        rule: rule.to_string(),
        source: err,
    })
}

/// Every rule file merged into a single priority-ordered table.
///
/// Pattern rules from all files come first, in file order and then declaration
/// order. Shorthand rules come after them; for a repeated key the
/// earliest file keeps it.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    patterns: Vec<PatternRule>,
    shorthands: IndexMap<String, ShorthandRule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_files(files: impl IntoIterator<Item = RuleFile>) -> Self {
        let mut set = Self::new();
        for file in files {
            set.push_file(file);
        }
        set
    }

    pub fn push_file(&mut self, file: RuleFile) {
        let RuleFile {
            name,
            patterns,
            shorthands,
        } = file;

        self.patterns.extend(patterns);
        for (key, target) in shorthands {
            self.shorthands.entry(key).or_insert_with(|| ShorthandRule {
                source: Arc::clone(&name),
                target,
            });
        }
    }

    pub fn patterns(&self) -> &[PatternRule] {
        &self.patterns
    }

    pub fn shorthand(&self, key: &str) -> Option<&ShorthandRule> {
        self.shorthands.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty() && self.shorthands.is_empty()
    }
}
