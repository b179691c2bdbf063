//! Onboarding completion: classify the questionnaire and start the program.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::info;

use crate::error::StoreError;
use crate::labels::{classify, merge_labels, Label, OnboardingAnswer, QuestionDefinition};
use crate::users::UserDirectory;

/// What completing onboarding changed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OnboardingOutcome {
    pub user_id: String,
    /// Labels derived from this questionnaire.
    pub derived: BTreeSet<Label>,
    /// The user's full label set after the merge.
    pub labels: BTreeSet<String>,
    pub program_start_date: DateTime<Utc>,
    /// False when the user had already started and the date was kept.
    pub started_now: bool,
}

/// Classify `answers`, merge the labels into the user's set and start the
/// program at `now` unless it has already started.
///
/// Labels only ever grow; re-running onboarding never removes one.
pub fn complete_onboarding<D: UserDirectory + ?Sized>(
    directory: &D,
    user_id: &str,
    answers: &[OnboardingAnswer],
    questions: &[QuestionDefinition],
    now: DateTime<Utc>,
) -> Result<OnboardingOutcome, StoreError> {
    let user = directory.get_user(user_id)?;
    let derived = classify(answers, questions);
    let labels = merge_labels(&user.labels, &derived);
    let program_start_date = user.program_start_date.unwrap_or(now);

    directory.save_onboarding(user_id, &labels, program_start_date)?;
    info!(
        user = user_id,
        derived = derived.len(),
        total = labels.len(),
        "onboarding complete"
    );

    Ok(OnboardingOutcome {
        user_id: user_id.to_string(),
        derived,
        labels,
        program_start_date,
        started_now: user.program_start_date.is_none(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::QuestionKind;
    use crate::storage::ProgramDb;
    use crate::users::User;
    use chrono::TimeZone;

    fn questions() -> Vec<QuestionDefinition> {
        vec![
            QuestionDefinition::new("stress_level"),
            QuestionDefinition::new("q2").with_kind(QuestionKind::Sleep),
        ]
    }

    #[test]
    fn first_completion_starts_program() {
        let db = ProgramDb::open_memory().unwrap();
        db.upsert_user(&User::new("u1", "u1@example.com")).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap();

        let answers = vec![
            OnboardingAnswer::new(0, 8),
            OnboardingAnswer::new(1, "Less than 5 hours"),
        ];
        let outcome = complete_onboarding(&db, "u1", &answers, &questions(), now).unwrap();

        assert!(outcome.started_now);
        assert_eq!(outcome.program_start_date, now);
        assert!(outcome.derived.contains(&Label::HighStress));
        assert!(outcome.derived.contains(&Label::NeedsSleep));

        let stored = db.get_user("u1").unwrap();
        assert_eq!(stored.program_start_date, Some(now));
        assert!(stored.labels.contains("high-stress"));
    }

    #[test]
    fn repeat_completion_keeps_start_and_old_labels() {
        let db = ProgramDb::open_memory().unwrap();
        let start = Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap();
        let mut user = User::new("u1", "u1@example.com");
        user.program_start_date = Some(start);
        user.labels.insert("poor-diet".into());
        db.upsert_user(&user).unwrap();

        let later = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap();
        let answers = vec![OnboardingAnswer::new(0, 1)];
        let outcome = complete_onboarding(&db, "u1", &answers, &questions(), later).unwrap();

        assert!(!outcome.started_now);
        assert_eq!(outcome.program_start_date, start);
        assert!(outcome.derived.is_empty());
        assert!(outcome.labels.contains("poor-diet"));
    }

    #[test]
    fn unknown_user_is_an_error() {
        let db = ProgramDb::open_memory().unwrap();
        let now = Utc::now();
        assert!(complete_onboarding(&db, "ghost", &[], &questions(), now).is_err());
    }
}
