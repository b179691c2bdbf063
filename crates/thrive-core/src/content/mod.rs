//! Program content: doses, do-items and the daily selector.

pub mod model;
pub mod selector;
pub mod store;

pub use model::{ContentDose, ContentKey, ContentPack, DoItem, Targeted};
pub use selector::{ContentSelector, DailyContent, MAX_DO_ITEMS};
pub use store::ContentStore;

use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::users::User;

/// In-app content for `user` at `now`.
///
/// Unlike the email path there is no day-1 default: a user who has not
/// started sees nothing.
pub fn today_for_user<S: ContentStore + ?Sized>(
    user: &User,
    store: &S,
    now: DateTime<Utc>,
) -> Result<DailyContent, StoreError> {
    ContentSelector::new(store).select(user.position(now), &user.labels)
}
