//! First-match-wins evaluation of a shape against a [`RuleSet`].

use std::fmt;

use crate::application::placement::rules::RuleSet;
use crate::domain::{order::PlacementTarget, shape::Shape};

/// Which rule produced a decision; carried along for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecisionOrigin {
    SelfPlacement,
    Pattern { file: String, index: usize },
    Shorthand { file: String, key: String },
    Function { name: String },
}

impl fmt::Display for DecisionOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecisionOrigin::SelfPlacement => f.write_str("self-placement"),
            DecisionOrigin::Pattern { file, index } => write!(f, "{file}#matches[{index}]"),
            DecisionOrigin::Shorthand { file, key } => write!(f, "{file}#{key}"),
            DecisionOrigin::Function { name } => write!(f, "function `{name}`"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementDecision {
    pub target: PlacementTarget,
    pub origin: DecisionOrigin,
}

/// Find the placement for `shape`.
///
/// Pattern rules are tried first across every file. Only when none of them
/// matches does the shorthand table get consulted, by `meta.name` and then by
/// `meta.type`.
pub fn match_zone(shape: &Shape, rules: &RuleSet) -> Option<PlacementDecision> {
    if let Some(rule) = rules.patterns().iter().find(|rule| rule.matches(shape)) {
        return Some(PlacementDecision {
            target: rule.target.clone(),
            origin: DecisionOrigin::Pattern {
                file: rule.source.to_string(),
                index: rule.index,
            },
        });
    }

    [shape.name(), shape.shape_type()]
        .into_iter()
        .flatten()
        .find_map(|key| {
            rules.shorthand(key).map(|rule| PlacementDecision {
                target: rule.target.clone(),
                origin: DecisionOrigin::Shorthand {
                    file: rule.source.to_string(),
                    key: key.to_string(),
                },
            })
        })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::application::placement::rules::RuleFile;

    fn rules(files: &[(&str, serde_json::Value)]) -> RuleSet {
        RuleSet::from_files(
            files
                .iter()
                .map(|(name, value)| RuleFile::from_value(name, value).expect("valid rules")),
        )
    }

    fn zone_of(shape: &Shape, set: &RuleSet) -> Option<String> {
        match_zone(shape, set).map(|decision| decision.target.path.to_string())
    }

    #[test]
    fn first_matching_pattern_wins() {
        let set = rules(&[(
            "a.json",
            json!({"matches": [
                {"type": "^page$", "path": "content"},
                {"type": "page", "path": "aside"}
            ]}),
        )]);

        let decision = match_zone(&Shape::new("page"), &set).expect("placed");
        assert_eq!(decision.target.path.to_string(), "content");
        assert_eq!(
            decision.origin,
            DecisionOrigin::Pattern {
                file: "a.json".into(),
                index: 0
            }
        );
    }

    #[test]
    fn every_predicate_must_match() {
        let set = rules(&[(
            "a.json",
            json!({"matches": [
                {"id": "^/foo/.*", "type": "^(page|post)$", "displayType": "summary", "path": "content/header"}
            ]}),
        )]);

        let summary = Shape::new("post").with_display_type("summary").with_field("id", "/foo/post");
        let main = Shape::new("post").with_display_type("main").with_field("id", "/foo/post");
        let elsewhere = Shape::new("post").with_display_type("summary").with_field("id", "/bar");

        assert_eq!(zone_of(&summary, &set).as_deref(), Some("content/header"));
        assert_eq!(zone_of(&main, &set), None);
        assert_eq!(zone_of(&elsewhere, &set), None);
    }

    #[test]
    fn patterns_are_unanchored() {
        let set = rules(&[("a.json", json!({"matches": [{"type": "widget", "path": "sidebar"}]}))]);
        assert_eq!(zone_of(&Shape::new("html-widget"), &set).as_deref(), Some("sidebar"));
        assert_eq!(zone_of(&Shape::new("tag-cloud-widget"), &set).as_deref(), Some("sidebar"));
    }

    #[test]
    fn patterns_in_later_files_beat_shorthands_in_earlier_files() {
        let set = rules(&[
            ("a.json", json!({"tag-cloud-widget": {"path": "footer"}})),
            ("b.json", json!({"matches": [{"type": "widget", "path": "sidebar"}]})),
        ]);
        assert_eq!(zone_of(&Shape::new("tag-cloud-widget"), &set).as_deref(), Some("sidebar"));
    }

    #[test]
    fn name_shorthand_is_consulted_before_type_shorthand() {
        let set = rules(&[
            ("a.json", json!({"text": {"path": "content"}})),
            ("b.json", json!({"summary": {"path": "aside"}})),
        ]);
        let shape = Shape::new("text").named("summary");
        let decision = match_zone(&shape, &set).unwrap();
        assert_eq!(decision.target.path.to_string(), "aside");
        assert_eq!(
            decision.origin,
            DecisionOrigin::Shorthand {
                file: "b.json".into(),
                key: "summary".into()
            }
        );
    }

    #[test]
    fn earlier_files_win_within_a_rule_class() {
        let set = rules(&[
            ("a.json", json!({"matches": [{"type": "^page$", "path": "first"}], "shape3": {"path": "zone2"}})),
            ("b.json", json!({"matches": [{"type": "^page$", "path": "second"}], "shape3": {"path": "zone1"}})),
        ]);
        assert_eq!(zone_of(&Shape::new("page"), &set).as_deref(), Some("first"));
        assert_eq!(zone_of(&Shape::new("shape3"), &set).as_deref(), Some("zone2"));
    }

    #[test]
    fn unmatched_shapes_get_no_decision() {
        let set = rules(&[("a.json", json!({"shape1": {"path": "zone1"}}))]);
        assert!(match_zone(&Shape::new("wont-get-placed"), &set).is_none());
        assert!(match_zone(&Shape::default(), &set).is_none());
    }
}
