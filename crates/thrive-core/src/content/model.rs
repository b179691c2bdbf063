use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// How a content item is addressed.
///
/// Serialized as `{"day": 3}`, `{"theme": "sleep"}` or `"rotating"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKey {
    /// Exact week-one day, 1 through 7.
    Day(u8),
    /// Cornerstone identifier, used from day 8 on.
    Theme(String),
    /// The theme-independent "day 0" pool used in maintenance.
    Rotating,
}

/// A narrative message for one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentDose {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub message: String,
    pub key: ContentKey,
    #[serde(default)]
    pub target_labels: Vec<String>,
    #[serde(default = "default_true")]
    pub active: bool,
}

/// A short actionable task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoItem {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub key: ContentKey,
    #[serde(default)]
    pub target_labels: Vec<String>,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

/// Content that can be biased toward user labels.
pub trait Targeted {
    fn target_labels(&self) -> &[String];
    fn is_active(&self) -> bool;

    /// Shares at least one label with the user.
    fn matches(&self, user_labels: &BTreeSet<String>) -> bool {
        self.target_labels()
            .iter()
            .any(|label| user_labels.contains(label))
    }
}

impl Targeted for ContentDose {
    fn target_labels(&self) -> &[String] {
        &self.target_labels
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

impl Targeted for DoItem {
    fn target_labels(&self) -> &[String] {
        &self.target_labels
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

/// A bundle of content, as imported from a JSON content pack.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentPack {
    #[serde(default)]
    pub doses: Vec<ContentDose>,
    #[serde(default)]
    pub do_items: Vec<DoItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_key_wire_format() {
        assert_eq!(serde_json::to_string(&ContentKey::Day(3)).unwrap(), r#"{"day":3}"#);
        assert_eq!(
            serde_json::to_string(&ContentKey::Theme("sleep".into())).unwrap(),
            r#"{"theme":"sleep"}"#
        );
        assert_eq!(serde_json::to_string(&ContentKey::Rotating).unwrap(), r#""rotating""#);
    }

    #[test]
    fn pack_defaults_optional_fields() {
        let json = r#"{
            "doses": [{"id": "d1", "message": "Hello", "key": {"day": 1}}],
            "do_items": [{"id": "t1", "title": "Walk", "key": "rotating", "target_labels": ["needs-movement"]}]
        }"#;
        let pack: ContentPack = serde_json::from_str(json).unwrap();
        assert!(pack.doses[0].active);
        assert!(pack.doses[0].target_labels.is_empty());
        assert_eq!(pack.do_items[0].key, ContentKey::Rotating);
    }

    #[test]
    fn matches_requires_shared_label() {
        let item = DoItem {
            id: "t1".into(),
            title: "Walk".into(),
            description: String::new(),
            key: ContentKey::Rotating,
            target_labels: vec!["needs-movement".into(), "low-mobility".into()],
            active: true,
        };
        let user: BTreeSet<String> = ["low-mobility".to_string()].into_iter().collect();
        assert!(item.matches(&user));
        assert!(!item.matches(&BTreeSet::new()));
    }
}
