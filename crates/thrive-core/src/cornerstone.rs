//! The seven cornerstones and the daily rotation between them.
//!
//! Program day 1 focuses on the first cornerstone, day 7 on the last,
//! day 8 starts over. Days at or before zero fall back to the first.

use serde::Serialize;

/// One of the fixed wellness themes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Cornerstone {
    /// Stable identifier, used to tag theme content.
    pub id: &'static str,
    /// 1-based position in the rotation.
    pub position: u8,
    /// Display name.
    pub name: &'static str,
    pub summary: &'static str,
}

pub const CORNERSTONE_COUNT: usize = 7;

/// The rotation, in order.
pub static CORNERSTONES: [Cornerstone; CORNERSTONE_COUNT] = [
    Cornerstone {
        id: "movement",
        position: 1,
        name: "Movement",
        summary: "Keep the body moving every day.",
    },
    Cornerstone {
        id: "nutrition",
        position: 2,
        name: "Nutrition",
        summary: "Eat for energy and longevity.",
    },
    Cornerstone {
        id: "sleep",
        position: 3,
        name: "Sleep",
        summary: "Protect rest and recovery.",
    },
    Cornerstone {
        id: "stress",
        position: 4,
        name: "Stress Relief",
        summary: "Notice tension and let it go.",
    },
    Cornerstone {
        id: "connection",
        position: 5,
        name: "Connection",
        summary: "Stay close to the people who matter.",
    },
    Cornerstone {
        id: "purpose",
        position: 6,
        name: "Purpose",
        summary: "Do something that matters to you.",
    },
    Cornerstone {
        id: "outlook",
        position: 7,
        name: "Outlook",
        summary: "Treat aging as a chapter, not an ending.",
    },
];

/// Cornerstone in focus on program day `day`.
pub fn focused_theme(day: i64) -> &'static Cornerstone {
    if day <= 0 {
        return &CORNERSTONES[0];
    }
    let index = (day - 1).rem_euclid(CORNERSTONE_COUNT as i64) as usize;
    &CORNERSTONES[index]
}

/// Look up a cornerstone by its identifier.
pub fn by_id(id: &str) -> Option<&'static Cornerstone> {
    CORNERSTONES.iter().find(|c| c.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn positions_are_one_through_seven() {
        for (i, c) in CORNERSTONES.iter().enumerate() {
            assert_eq!(c.position as usize, i + 1);
        }
    }

    #[test]
    fn identifiers_are_unique() {
        for (i, a) in CORNERSTONES.iter().enumerate() {
            for b in &CORNERSTONES[i + 1..] {
                assert_ne!(a.id, b.id);
            }
        }
    }

    #[test]
    fn first_week_walks_the_list() {
        assert_eq!(focused_theme(1).id, "movement");
        assert_eq!(focused_theme(7).id, "outlook");
        assert_eq!(focused_theme(8).id, "movement");
        assert_eq!(focused_theme(11).id, "stress");
    }

    #[test]
    fn by_id_finds_known_themes() {
        assert_eq!(by_id("sleep").map(|c| c.position), Some(3));
        assert!(by_id("unknown").is_none());
    }

    proptest! {
        #[test]
        fn non_positive_days_fall_back_to_first(day in i64::MIN..=0) {
            prop_assert_eq!(focused_theme(day), &CORNERSTONES[0]);
        }

        #[test]
        fn positive_days_rotate(day in 1i64..1_000_000) {
            let expected = &CORNERSTONES[((day - 1) % 7) as usize];
            prop_assert_eq!(focused_theme(day), expected);
        }
    }
}
