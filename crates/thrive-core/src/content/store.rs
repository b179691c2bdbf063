use super::model::{ContentDose, DoItem};
use crate::error::StoreError;

/// Read access to program content.
///
/// Implementations must return list results in a stable order: the
/// selector rotates by index, so a reordering changes what users see.
pub trait ContentStore: Send + Sync {
    /// Week-one dose for an exact day.
    fn dose_by_day(&self, day: u8) -> Result<Option<ContentDose>, StoreError>;

    /// Doses tagged with a cornerstone.
    fn doses_by_theme(&self, theme_id: &str) -> Result<Vec<ContentDose>, StoreError>;

    /// The maintenance pool.
    fn rotating_doses(&self) -> Result<Vec<ContentDose>, StoreError>;

    fn do_items_by_day(&self, day: u8) -> Result<Vec<DoItem>, StoreError>;

    fn do_items_by_theme(&self, theme_id: &str) -> Result<Vec<DoItem>, StoreError>;

    fn rotating_do_items(&self) -> Result<Vec<DoItem>, StoreError>;
}
