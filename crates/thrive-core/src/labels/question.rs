//! Onboarding question metadata and answers.

use serde::{Deserialize, Serialize};

use super::Label;

/// What a question asks about, bound once from its identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    OverallHealth,
    Exercise,
    Sleep,
    Stress,
    Social,
    Goal,
    Mobility,
    Diet,
    AgingAttitude,
    /// Asked for context only; never labels anyone.
    Other,
}

/// Identifier keywords, in binding priority order.
const KEYWORDS: &[(&str, QuestionKind)] = &[
    ("overall_health", QuestionKind::OverallHealth),
    ("health_rating", QuestionKind::OverallHealth),
    ("exercise", QuestionKind::Exercise),
    ("movement", QuestionKind::Exercise),
    ("sleep", QuestionKind::Sleep),
    ("stress", QuestionKind::Stress),
    ("social", QuestionKind::Social),
    ("friends", QuestionKind::Social),
    ("goal", QuestionKind::Goal),
    ("mobility", QuestionKind::Mobility),
    ("diet", QuestionKind::Diet),
    ("eating", QuestionKind::Diet),
    ("aging", QuestionKind::AgingAttitude),
    ("attitude", QuestionKind::AgingAttitude),
];

impl QuestionKind {
    /// Bind a free-form question identifier or label text to a kind.
    ///
    /// Matching is case-insensitive and the first keyword hit wins, so a
    /// question belongs to exactly one label family. Spaces and hyphens
    /// count as underscores, so "Overall health" binds like `overall_health`.
    pub fn from_identifier(identifier: &str) -> Self {
        let folded: String = identifier
            .to_lowercase()
            .chars()
            .map(|c| if c.is_whitespace() || c == '-' { '_' } else { c })
            .collect();
        KEYWORDS
            .iter()
            .find(|(keyword, _)| folded.contains(keyword))
            .map(|(_, kind)| *kind)
            .unwrap_or(QuestionKind::Other)
    }

    /// Label emitted for `value`, if the answer triggers this kind's rule.
    pub fn label_for(&self, value: &AnswerValue) -> Option<Label> {
        let text = value.folded_text();
        let contains_any = |needles: &[&str]| needles.iter().any(|n| text.contains(n));

        match self {
            QuestionKind::OverallHealth => value
                .as_number()
                .filter(|n| *n <= 4.0)
                .map(|_| Label::PoorHealth),
            QuestionKind::Exercise => {
                let is_zero = value.as_number() == Some(0.0);
                (is_zero || contains_any(&["1-2", "none"])).then_some(Label::NeedsMovement)
            }
            QuestionKind::Sleep => {
                contains_any(&["less than", "5-6", "< 6"]).then_some(Label::NeedsSleep)
            }
            QuestionKind::Stress => value
                .as_number()
                .filter(|n| *n >= 7.0)
                .map(|_| Label::HighStress),
            QuestionKind::Social => {
                contains_any(&["monthly", "rarely", "never"]).then_some(Label::SociallyIsolated)
            }
            QuestionKind::Goal => contains_any(&["weight"]).then_some(Label::WeightLossGoal),
            QuestionKind::Mobility => {
                contains_any(&["limited", "wheelchair", "walker"]).then_some(Label::LowMobility)
            }
            QuestionKind::Diet => {
                contains_any(&["processed", "fast food", "poor"]).then_some(Label::PoorDiet)
            }
            QuestionKind::AgingAttitude => {
                if text == "d" || text == "e" || contains_any(&["pessimist", "dreading"]) {
                    Some(Label::AgingPessimist)
                } else if text == "a" || text == "b" || contains_any(&["optimist", "excited"]) {
                    Some(Label::AgingOptimist)
                } else {
                    None
                }
            }
            QuestionKind::Other => None,
        }
    }
}

/// A question as defined by the survey.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDefinition {
    pub id: String,
    #[serde(default, alias = "label")]
    pub text: String,
    /// Explicit binding; derived from `id`, then `text`, when absent.
    #[serde(default)]
    pub kind: Option<QuestionKind>,
}

impl QuestionDefinition {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: String::new(),
            kind: None,
        }
    }

    pub fn with_kind(mut self, kind: QuestionKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Resolved kind for this question.
    ///
    /// Opaque ids such as `q4` fall back to the label text.
    pub fn kind(&self) -> QuestionKind {
        self.kind.unwrap_or_else(|| match QuestionKind::from_identifier(&self.id) {
            QuestionKind::Other => QuestionKind::from_identifier(&self.text),
            kind => kind,
        })
    }
}

/// A raw answer value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Number(f64),
    Bool(bool),
    Text(String),
    /// Multi-select answer.
    List(Vec<String>),
}

impl AnswerValue {
    /// Numeric reading of the answer; text is parsed after trimming.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            AnswerValue::Number(n) => Some(*n),
            AnswerValue::Text(s) => s.trim().parse().ok(),
            AnswerValue::Bool(_) | AnswerValue::List(_) => None,
        }
    }

    /// Lower-cased, trimmed text reading of the answer.
    ///
    /// List choices are joined with `", "` so text rules see every choice.
    pub fn folded_text(&self) -> String {
        match self {
            AnswerValue::Number(n) => n.to_string(),
            AnswerValue::Bool(b) => b.to_string(),
            AnswerValue::Text(s) => s.trim().to_lowercase(),
            AnswerValue::List(items) => items
                .iter()
                .map(|item| item.trim().to_lowercase())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

impl From<&str> for AnswerValue {
    fn from(value: &str) -> Self {
        AnswerValue::Text(value.to_string())
    }
}

impl From<i64> for AnswerValue {
    fn from(value: i64) -> Self {
        AnswerValue::Number(value as f64)
    }
}

impl From<bool> for AnswerValue {
    fn from(value: bool) -> Self {
        AnswerValue::Bool(value)
    }
}

impl From<Vec<&str>> for AnswerValue {
    fn from(value: Vec<&str>) -> Self {
        AnswerValue::List(value.into_iter().map(str::to_string).collect())
    }
}

impl From<i32> for AnswerValue {
    fn from(value: i32) -> Self {
        AnswerValue::Number(f64::from(value))
    }
}

/// One submitted answer, matched to its question by position or by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingAnswer {
    #[serde(default, alias = "question_index", skip_serializing_if = "Option::is_none")]
    pub question_index: Option<usize>,
    #[serde(default, alias = "question_id", skip_serializing_if = "Option::is_none")]
    pub question_id: Option<String>,
    #[serde(default, alias = "answerValue")]
    pub value: Option<AnswerValue>,
}

impl OnboardingAnswer {
    pub fn new(question_index: usize, value: impl Into<AnswerValue>) -> Self {
        Self {
            question_index: Some(question_index),
            question_id: None,
            value: Some(value.into()),
        }
    }

    /// Answer keyed by question id instead of position.
    pub fn for_question(question_id: impl Into<String>, value: impl Into<AnswerValue>) -> Self {
        Self {
            question_index: None,
            question_id: Some(question_id.into()),
            value: Some(value.into()),
        }
    }

    pub fn skipped(question_index: usize) -> Self {
        Self {
            question_index: Some(question_index),
            question_id: None,
            value: None,
        }
    }

    /// The question this answers. The index wins when both keys are given.
    pub fn question<'q>(&self, questions: &'q [QuestionDefinition]) -> Option<&'q QuestionDefinition> {
        match (self.question_index, self.question_id.as_deref()) {
            (Some(index), _) => questions.get(index),
            (None, Some(id)) => questions.iter().find(|q| q.id == id),
            (None, None) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binds_identifiers_by_keyword() {
        assert_eq!(QuestionKind::from_identifier("stress_level"), QuestionKind::Stress);
        assert_eq!(
            QuestionKind::from_identifier("q17_aging_attitude"),
            QuestionKind::AgingAttitude
        );
        assert_eq!(
            QuestionKind::from_identifier("Overall_Health_Rating"),
            QuestionKind::OverallHealth
        );
        assert_eq!(QuestionKind::from_identifier("Q4_EATING_habits"), QuestionKind::Diet);
        assert_eq!(QuestionKind::from_identifier("favorite_color"), QuestionKind::Other);
    }

    #[test]
    fn first_keyword_wins() {
        // both "sleep" and "stress" appear; sleep is listed first
        assert_eq!(QuestionKind::from_identifier("sleep_stress"), QuestionKind::Sleep);
    }

    #[test]
    fn explicit_kind_overrides_identifier() {
        let q = QuestionDefinition::new("q3").with_kind(QuestionKind::Mobility);
        assert_eq!(q.kind(), QuestionKind::Mobility);
        assert_eq!(QuestionDefinition::new("q3").kind(), QuestionKind::Other);
    }

    #[test]
    fn label_text_binds_opaque_ids() {
        let q = QuestionDefinition::new("q4").with_text("How would you rate your stress?");
        assert_eq!(q.kind(), QuestionKind::Stress);

        let q = QuestionDefinition::new("q1").with_text("Overall health, 1-10");
        assert_eq!(q.kind(), QuestionKind::OverallHealth);

        // the id binding wins over the text
        let q = QuestionDefinition::new("sleep_hours").with_text("Stress before bed?");
        assert_eq!(q.kind(), QuestionKind::Sleep);

        let q = QuestionDefinition::new("q4")
            .with_text("How would you rate your stress?")
            .with_kind(QuestionKind::Diet);
        assert_eq!(q.kind(), QuestionKind::Diet);
    }

    #[test]
    fn label_alias_feeds_text() {
        let q: QuestionDefinition =
            serde_json::from_str(r#"{"id": "q9", "label": "Do you have weekly social plans?"}"#)
                .unwrap();
        assert_eq!(q.kind(), QuestionKind::Social);
    }

    #[test]
    fn numeric_text_is_parsed() {
        assert_eq!(AnswerValue::from(" 3 ").as_number(), Some(3.0));
        assert_eq!(AnswerValue::from("often").as_number(), None);
    }

    #[test]
    fn exercise_rule_matches_zero_and_ranges() {
        let kind = QuestionKind::Exercise;
        assert_eq!(kind.label_for(&AnswerValue::from(0)), Some(Label::NeedsMovement));
        assert_eq!(kind.label_for(&"0".into()), Some(Label::NeedsMovement));
        assert_eq!(kind.label_for(&"1-2 times a week".into()), Some(Label::NeedsMovement));
        assert_eq!(kind.label_for(&"None at all".into()), Some(Label::NeedsMovement));
        assert_eq!(kind.label_for(&"5+ times".into()), None);
    }

    #[test]
    fn aging_rule_prefers_pessimist_markers() {
        let kind = QuestionKind::AgingAttitude;
        assert_eq!(kind.label_for(&"e".into()), Some(Label::AgingPessimist));
        assert_eq!(kind.label_for(&"B".into()), Some(Label::AgingOptimist));
        assert_eq!(
            kind.label_for(&"Honestly dreading it".into()),
            Some(Label::AgingPessimist)
        );
        assert_eq!(kind.label_for(&"C".into()), None);
    }

    #[test]
    fn answers_deserialize_from_survey_json() {
        let json = r#"[{"questionIndex": 0, "value": 8}, {"questionIndex": 1, "answerValue": "Rarely"}, {"questionIndex": 2, "value": null}]"#;
        let answers: Vec<OnboardingAnswer> = serde_json::from_str(json).unwrap();
        assert_eq!(answers[0].value, Some(AnswerValue::Number(8.0)));
        assert_eq!(answers[1].value, Some(AnswerValue::Text("Rarely".into())));
        assert!(answers[2].value.is_none());
    }

    #[test]
    fn bool_and_list_values_deserialize() {
        let json = r#"[{"questionIndex": 0, "value": true}, {"questionId": "diet", "value": ["Fast food", "Salads"]}]"#;
        let answers: Vec<OnboardingAnswer> = serde_json::from_str(json).unwrap();
        assert_eq!(answers[0].value, Some(AnswerValue::Bool(true)));
        assert_eq!(answers[1].question_id.as_deref(), Some("diet"));
        assert_eq!(answers[1].question_index, None);
        assert_eq!(
            answers[1].value.as_ref().map(AnswerValue::folded_text).as_deref(),
            Some("fast food, salads")
        );
    }

    #[test]
    fn list_choices_reach_text_rules() {
        let kind = QuestionKind::Mobility;
        assert_eq!(
            kind.label_for(&vec!["Stairs", "Use a walker"].into()),
            Some(Label::LowMobility)
        );
        assert_eq!(kind.label_for(&vec!["D"].into()), None);
        assert_eq!(
            QuestionKind::AgingAttitude.label_for(&vec!["D"].into()),
            Some(Label::AgingPessimist)
        );
        assert_eq!(QuestionKind::Stress.label_for(&true.into()), None);
    }

    #[test]
    fn answers_resolve_by_index_or_id() {
        let qs = vec![QuestionDefinition::new("stress_level"), QuestionDefinition::new("sleep")];
        let by_id = OnboardingAnswer::for_question("sleep", "5-6");
        assert_eq!(by_id.question(&qs).map(|q| q.id.as_str()), Some("sleep"));
        assert!(OnboardingAnswer::for_question("missing", 1).question(&qs).is_none());
        assert_eq!(
            OnboardingAnswer::new(0, 1).question(&qs).map(|q| q.id.as_str()),
            Some("stress_level")
        );
    }
}
