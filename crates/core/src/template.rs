//! Fixed-slot personalisation for the summary templates.
//!
//! The provider's templates cannot loop over a list, so each message has a
//! title plus exactly [`SLOT_COUNT`] line placeholders (`not1` .. `not10`).
//! Unused placeholders are sent as empty strings.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::description::{changes_since_title, render};
use crate::kinds::Channel;
use crate::notification::ShiftChange;

/// Lines per message.
pub const SLOT_COUNT: usize = 10;

/// Template values for one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Personalisation {
    pub title: Option<String>,
    pub slots: [String; SLOT_COUNT],
}

impl Personalisation {
    /// Render up to [`SLOT_COUNT`] changes into slots, padding the rest.
    ///
    /// Changes beyond the slot count are ignored; callers chunk first.
    pub fn for_chunk<'a, I>(chunk: I, channel: Channel, today: NaiveDate) -> Self
    where
        I: IntoIterator<Item = &'a ShiftChange>,
    {
        let mut slots: [String; SLOT_COUNT] = Default::default();
        let mut earliest = None;

        for (slot, change) in slots.iter_mut().zip(chunk) {
            *slot = render(change, channel, today);
            earliest = match earliest {
                Some(e) if e <= change.shift_modified_at => Some(e),
                _ => Some(change.shift_modified_at),
            };
        }

        Self {
            title: earliest.map(|e| changes_since_title(e, today)),
            slots,
        }
    }

    /// Number of slots holding a rendered line.
    pub fn filled(&self) -> usize {
        self.slots.iter().filter(|s| !s.is_empty()).count()
    }

    /// Provider-facing key/value form.
    pub fn to_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        if let Some(title) = &self.title {
            map.insert("title".to_string(), title.clone());
        }
        for (i, line) in self.slots.iter().enumerate() {
            map.insert(format!("not{}", i + 1), line.clone());
        }
        map
    }
}
