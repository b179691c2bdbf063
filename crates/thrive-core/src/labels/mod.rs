//! Personalization labels derived from the onboarding questionnaire.
//!
//! Labels are computed once, when onboarding completes, and merged into
//! the user's stored label set. Content carries target labels and the
//! selector prefers items that share at least one with the user.

mod question;

pub use question::{AnswerValue, OnboardingAnswer, QuestionDefinition, QuestionKind};

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A personalization tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Label {
    PoorHealth,
    NeedsMovement,
    NeedsSleep,
    HighStress,
    SociallyIsolated,
    WeightLossGoal,
    LowMobility,
    PoorDiet,
    AgingPessimist,
    AgingOptimist,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::PoorHealth => "poor-health",
            Label::NeedsMovement => "needs-movement",
            Label::NeedsSleep => "needs-sleep",
            Label::HighStress => "high-stress",
            Label::SociallyIsolated => "socially-isolated",
            Label::WeightLossGoal => "weight-loss-goal",
            Label::LowMobility => "low-mobility",
            Label::PoorDiet => "poor-diet",
            Label::AgingPessimist => "aging-pessimist",
            Label::AgingOptimist => "aging-optimist",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify answers against their question definitions.
///
/// Answers are matched to questions by index, or by question id when no
/// index is given. Skipped answers and answers that match no question are
/// ignored.
pub fn classify(answers: &[OnboardingAnswer], questions: &[QuestionDefinition]) -> BTreeSet<Label> {
    answers
        .iter()
        .filter_map(|answer| {
            let value = answer.value.as_ref()?;
            let question = answer.question(questions)?;
            question.kind().label_for(value)
        })
        .collect()
}

/// Parse a JSON answer array one element at a time.
///
/// Elements that do not parse are dropped with a warning; the rest are
/// kept. Anything other than an array yields no answers.
pub fn parse_answers(answers: &serde_json::Value) -> Vec<OnboardingAnswer> {
    let Some(items) = answers.as_array() else {
        tracing::warn!("onboarding answers are not a list, ignoring them");
        return Vec::new();
    };
    items
        .iter()
        .enumerate()
        .filter_map(|(position, item)| match OnboardingAnswer::deserialize(item) {
            Ok(answer) => Some(answer),
            Err(e) => {
                tracing::warn!(position, error = %e, "skipping unparseable onboarding answer");
                None
            }
        })
        .collect()
}

/// Classify raw survey JSON.
///
/// Malformed question metadata yields an empty set. Malformed answers are
/// skipped individually. Callers never see a classification error.
pub fn classify_json(answers: &serde_json::Value, questions: &serde_json::Value) -> BTreeSet<Label> {
    let questions: Vec<QuestionDefinition> = match serde_json::from_value(questions.clone()) {
        Ok(q) => q,
        Err(e) => {
            tracing::warn!(error = %e, "unparseable question metadata, skipping classification");
            return BTreeSet::new();
        }
    };
    classify(&parse_answers(answers), &questions)
}

/// Union `new` into `existing`. Labels are never removed.
pub fn merge_labels(existing: &BTreeSet<String>, new: &BTreeSet<Label>) -> BTreeSet<String> {
    existing
        .iter()
        .cloned()
        .chain(new.iter().map(|l| l.as_str().to_string()))
        .collect()
}
