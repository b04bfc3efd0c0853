//! Like-event digest building
//!
//! Pending likes are grouped per (post, recipient) and cut into windows
//! anchored on each window's first event. One notification is rendered per
//! window.

use chrono::Duration;
use std::collections::BTreeMap;

use crate::types::LikeEvent;

/// Title of every digest notification
pub const DIGEST_TITLE: &str = "Someone is praying for you";

/// A group of likes collapsed into one notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestWindow {
    pub target_id: String,
    pub recipient_id: String,
    /// Sorted by `due_at`, never empty
    pub events: Vec<LikeEvent>,
}

impl DigestWindow {
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn event_ids(&self) -> Vec<i64> {
        self.events.iter().map(|e| e.id).collect()
    }

    pub fn actors(&self) -> Vec<&str> {
        self.events
            .iter()
            .map(|e| e.actor_display_name.as_str())
            .collect()
    }

    /// Rendered notification body
    pub fn body(&self, batch_threshold: usize) -> String {
        render_digest(&self.actors(), batch_threshold)
    }
}

/// Cut events, already sorted by `due_at`, into first-anchored windows.
///
/// An event joins the current window when its `due_at` is at most `width`
/// after the window's first event; otherwise it opens a new window.
pub fn partition_windows(sorted: Vec<LikeEvent>, width: Duration) -> Vec<Vec<LikeEvent>> {
    let mut windows: Vec<Vec<LikeEvent>> = Vec::new();

    for event in sorted {
        let joins = windows
            .last()
            .map(|current| event.due_at - current[0].due_at <= width)
            .unwrap_or(false);

        match windows.last_mut() {
            Some(current) if joins => current.push(event),
            _ => windows.push(vec![event]),
        }
    }

    windows
}

/// Group pending events by (target, recipient) and window each group
pub fn build_windows(events: Vec<LikeEvent>, width: Duration) -> Vec<DigestWindow> {
    let mut groups: BTreeMap<(String, String), Vec<LikeEvent>> = BTreeMap::new();
    for event in events {
        groups
            .entry((event.target_id.clone(), event.recipient_id.clone()))
            .or_default()
            .push(event);
    }

    let mut windows = Vec::new();
    for ((target_id, recipient_id), mut group) in groups {
        group.sort_by(|a, b| a.due_at.cmp(&b.due_at).then(a.id.cmp(&b.id)));
        for events in partition_windows(group, width) {
            windows.push(DigestWindow {
                target_id: target_id.clone(),
                recipient_id: recipient_id.clone(),
                events,
            });
        }
    }
    windows
}

/// Phrase a digest body from the actors' display names.
///
/// One name: singular form. Up to `batch_threshold - 1` names: all of them,
/// comma-joined. At or above the threshold: first name and "+N others".
pub fn render_digest(actors: &[&str], batch_threshold: usize) -> String {
    match actors {
        [] => "Someone will make dua for you".to_string(),
        [only] => format!("{} will make dua for you", only),
        [first, rest @ ..] if actors.len() >= batch_threshold => {
            format!("{} +{} others will make dua for you", first, rest.len())
        }
        _ => format!("{} will make dua for you", actors.join(", ")),
    }
}
