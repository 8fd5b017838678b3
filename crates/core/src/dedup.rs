//! Contiguous-duplicate collapsing
//!
//! For one path, two CREATE events (or two DELETE events) with nothing else
//! for that path between them are a duplicate, and the later one is dropped.
//! Any other event for the path, MODIFY included, ends the run, so
//! CREATE, MODIFY, CREATE survives intact. MODIFY events are never dropped.

use crate::{CanonicalPath, ChangeEvent, EventType};
use ahash::AHashMap;
use tracing::{debug, error};

/// Longest change summary before it is cut short
const SUMMARY_LIMIT: usize = 256;

/// Drop every `event_type` event whose previous event for the same path had the same type
///
/// Keeps the first of each run so the earliest timestamp survives.
pub fn remove_duplicate_events_of_type(events: Vec<ChangeEvent>, event_type: EventType) -> Vec<ChangeEvent> {
    if event_type == EventType::Modify {
        error!("MODIFY events are never deduplicated");
        return events;
    }

    let mut last_type: AHashMap<CanonicalPath, EventType> = AHashMap::new();

    events
        .into_iter()
        .filter(|event| {
            let previous = last_type.insert(event.path.clone(), event.event_type);
            let duplicate = event.event_type == event_type && previous == Some(event_type);
            if duplicate {
                debug!("Removing duplicate event: {} {}", event.event_type, event.path);
            }
            !duplicate
        })
        .collect()
}

/// Full deduplication pass for one batch
///
/// Events are stably sorted by timestamp first, so the output is
/// non-decreasing by timestamp and equal timestamps keep creation order.
pub fn deduplicate(mut events: Vec<ChangeEvent>) -> Vec<ChangeEvent> {
    events.sort_by_key(|event| event.timestamp_millis);
    let events = remove_duplicate_events_of_type(events, EventType::Create);
    remove_duplicate_events_of_type(events, EventType::Delete)
}

/// First event that repeats the CREATE or DELETE immediately before it for the same path
pub fn contains_adjacent_duplicates(events: &[ChangeEvent]) -> Option<&ChangeEvent> {
    let mut last_type: AHashMap<&CanonicalPath, EventType> = AHashMap::new();

    events.iter().find(|event| {
        let previous = last_type.insert(&event.path, event.event_type);
        event.event_type != EventType::Modify && previous == Some(event.event_type)
    })
}

/// Compact `[ +name >name -name ]` summary for logs, cut at 256 characters
pub fn change_summary(events: &[ChangeEvent]) -> String {
    let mut summary = String::from("[ ");

    for event in events {
        summary.push(event.event_type.marker());
        summary.push_str(event.path.file_name());
        summary.push(' ');

        if summary.len() > SUMMARY_LIMIT {
            summary.push_str(" (...) ");
            break;
        }
    }

    summary.push(']');
    summary
}
