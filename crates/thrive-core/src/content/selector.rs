//! Daily content selection.
//!
//! Selection is deterministic: among `n` candidates the item at
//! `day mod n` wins, so the same day always yields the same item and
//! consecutive days walk through the pool.

use serde::Serialize;
use std::collections::BTreeSet;

use super::model::{ContentDose, DoItem, Targeted};
use super::store::ContentStore;
use crate::cornerstone::Cornerstone;
use crate::error::StoreError;
use crate::program::{ProgramPhase, ProgramPosition};

/// Upper bound on do-items shown for a theme or maintenance day.
pub const MAX_DO_ITEMS: usize = 5;

/// Content resolved for one user on one day.
#[derive(Debug, Clone, Serialize)]
pub struct DailyContent {
    pub phase: ProgramPhase,
    pub day: i64,
    pub theme: &'static Cornerstone,
    pub dose: Option<ContentDose>,
    pub do_items: Vec<DoItem>,
}

impl DailyContent {
    fn empty(position: ProgramPosition) -> Self {
        Self {
            phase: position.phase,
            day: position.day,
            theme: position.theme(),
            dose: None,
            do_items: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.dose.is_none() && self.do_items.is_empty()
    }
}

/// Picks the dose and do-items for a program position.
pub struct ContentSelector<'a, S: ContentStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: ContentStore + ?Sized> ContentSelector<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Resolve content for `position`.
    ///
    /// A phase with no candidates yields an empty result; only store
    /// failures are errors.
    pub fn select(
        &self,
        position: ProgramPosition,
        user_labels: &BTreeSet<String>,
    ) -> Result<DailyContent, StoreError> {
        let mut content = DailyContent::empty(position);
        content.dose = self.dose_for(position, user_labels)?;

        match position.phase {
            ProgramPhase::NotStarted => {}
            ProgramPhase::WeekOne => {
                content.do_items = active(self.store.do_items_by_day(position.day as u8)?);
            }
            ProgramPhase::Personalized => {
                let theme = position.theme();
                content.do_items =
                    matching_first(active(self.store.do_items_by_theme(theme.id)?), user_labels);
            }
            ProgramPhase::Maintenance => {
                content.do_items =
                    matching_first(active(self.store.rotating_do_items()?), user_labels);
            }
        }

        if content.is_empty() && position.is_started() {
            tracing::debug!(
                phase = position.phase.as_str(),
                day = position.day,
                theme = content.theme.id,
                "no content for day"
            );
        }

        Ok(content)
    }

    /// Dose only; used by the email job.
    pub fn select_dose(
        &self,
        position: ProgramPosition,
        user_labels: &BTreeSet<String>,
    ) -> Result<Option<ContentDose>, StoreError> {
        self.dose_for(position, user_labels)
    }

    fn dose_for(
        &self,
        position: ProgramPosition,
        user_labels: &BTreeSet<String>,
    ) -> Result<Option<ContentDose>, StoreError> {
        let dose = match position.phase {
            ProgramPhase::NotStarted => None,
            ProgramPhase::WeekOne => self
                .store
                .dose_by_day(position.day as u8)?
                .filter(|d| d.active),
            ProgramPhase::Personalized => pick_preferring_labels(
                active(self.store.doses_by_theme(position.theme().id)?),
                user_labels,
                position.day,
            ),
            ProgramPhase::Maintenance => pick(active(self.store.rotating_doses()?), position.day),
        };
        Ok(dose)
    }
}

/// Index into a pool of `len` items for `day`.
pub fn rotation_index(day: i64, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some(day.rem_euclid(len as i64) as usize)
}

fn active<T: Targeted>(items: Vec<T>) -> Vec<T> {
    items.into_iter().filter(|i| i.is_active()).collect()
}

fn pick<T>(mut pool: Vec<T>, day: i64) -> Option<T> {
    let index = rotation_index(day, pool.len())?;
    Some(pool.swap_remove(index))
}

fn pick_preferring_labels<T: Targeted>(
    candidates: Vec<T>,
    user_labels: &BTreeSet<String>,
    day: i64,
) -> Option<T> {
    let (matching, rest): (Vec<T>, Vec<T>) =
        candidates.into_iter().partition(|c| c.matches(user_labels));
    if matching.is_empty() {
        pick(rest, day)
    } else {
        pick(matching, day)
    }
}

fn matching_first<T: Targeted>(items: Vec<T>, user_labels: &BTreeSet<String>) -> Vec<T> {
    let (mut ordered, rest): (Vec<T>, Vec<T>) =
        items.into_iter().partition(|i| i.matches(user_labels));
    ordered.extend(rest);
    ordered.truncate(MAX_DO_ITEMS);
    ordered
}
