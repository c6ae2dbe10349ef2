use crate::feeds::{EventId, GlobalEvent};
use std::collections::HashSet;

/// How many events stay on the globe at once.
pub const MAX_EVENTS: usize = 20;

/// Drop repeated identifiers (first occurrence wins) and keep at most `cap`
/// events.
pub fn dedupe_events<I>(events: I, cap: usize) -> Vec<GlobalEvent>
where
    I: IntoIterator<Item = GlobalEvent>,
{
    let mut seen = HashSet::new();
    events
        .into_iter()
        .filter(|event| seen.insert(event.id.clone()))
        .take(cap)
        .collect()
}

/// Recency window of events shown on the globe, newest first.
#[derive(Debug, Clone)]
pub struct EventStore {
    events: Vec<GlobalEvent>,
    cap: usize,
}

impl Default for EventStore {
    fn default() -> Self {
        Self::new(MAX_EVENTS)
    }
}

impl EventStore {
    pub fn new(cap: usize) -> Self {
        Self {
            events: Vec::new(),
            cap: cap.max(1),
        }
    }

    /// Put a freshly polled batch in front of what is already held.
    pub fn merge(&mut self, incoming: Vec<GlobalEvent>) {
        let existing = std::mem::take(&mut self.events);
        self.events = dedupe_events(incoming.into_iter().chain(existing), self.cap);
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn get(&self, id: &EventId) -> Option<&GlobalEvent> {
        self.events.iter().find(|event| &event.id == id)
    }

    pub fn contains(&self, id: &EventId) -> bool {
        self.get(id).is_some()
    }

    pub fn position(&self, id: &EventId) -> Option<usize> {
        self.events.iter().position(|event| &event.id == id)
    }

    pub fn events(&self) -> &[GlobalEvent] {
        &self.events
    }

    pub fn iter(&self) -> impl Iterator<Item = &GlobalEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::geo::Sentiment;

    pub(crate) fn event(id: &str, sentiment: &str) -> GlobalEvent {
        GlobalEvent {
            id: EventId::from(id),
            topic: "Global Sentiment".to_string(),
            lat: 10.0,
            lng: 20.0,
            sentiment: Sentiment::from(sentiment.to_string()),
            lang: "en".to_string(),
            text: format!("event {}", id),
            score: 0.5,
            timestamp: None,
            is_live: false,
        }
    }

    #[test]
    fn test_dedupe_keeps_first_occurrence() {
        let events = vec![
            event("a", "fear"),
            event("b", "joy"),
            event("a", "anger"),
            event("c", "sadness"),
            event("b", "anger"),
        ];
        let deduped = dedupe_events(events, MAX_EVENTS);
        let ids: Vec<String> = deduped.iter().map(|e| e.id.to_string()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert_eq!(deduped[0].sentiment, Sentiment::Fear);
        assert_eq!(deduped[1].sentiment, Sentiment::Joy);
    }

    #[test]
    fn test_dedupe_caps_length() {
        let events: Vec<_> = (0..50).map(|i| event(&i.to_string(), "joy")).collect();
        let deduped = dedupe_events(events, MAX_EVENTS);
        assert_eq!(deduped.len(), 20);
        assert_eq!(deduped[0].id.to_string(), "0");
        assert_eq!(deduped[19].id.to_string(), "19");
    }

    #[test]
    fn test_dedupe_caps_after_removing_duplicates() {
        let mut events = Vec::new();
        for i in 0..30 {
            events.push(event(&i.to_string(), "joy"));
            events.push(event(&i.to_string(), "fear"));
        }
        let deduped = dedupe_events(events, MAX_EVENTS);
        assert_eq!(deduped.len(), 20);
        assert!(deduped.iter().all(|e| e.sentiment == Sentiment::Joy));
    }

    #[test]
    fn test_merge_puts_newest_first() {
        let mut store = EventStore::new(4);
        store.merge(vec![event("a", "fear"), event("b", "fear")]);
        store.merge(vec![event("c", "joy"), event("a", "joy")]);

        let ids: Vec<String> = store.iter().map(|e| e.id.to_string()).collect();
        assert_eq!(ids, ["c", "a", "b"]);
        // The newer copy of "a" replaced the old one
        assert_eq!(store.get(&EventId::from("a")).unwrap().sentiment, Sentiment::Joy);

        store.merge(vec![event("d", "anger"), event("e", "anger")]);
        let ids: Vec<String> = store.iter().map(|e| e.id.to_string()).collect();
        assert_eq!(ids, ["d", "e", "c", "a"]);
        assert!(!store.contains(&EventId::from("b")));
    }

    #[test]
    fn test_clear() {
        let mut store = EventStore::default();
        store.merge(vec![event("a", "fear")]);
        assert_eq!(store.len(), 1);
        store.clear();
        assert!(store.is_empty());
    }
}
