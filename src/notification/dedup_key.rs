//! Dedup key for notification deduplication
//!
//! A key identifies one notification opportunity: the ticket plus a string
//! naming the sub-event (`created`, `threadentry:<id>`, `status:<name>`).
//! It is persisted as `"<ticketId>|<eventKey>"`.

use std::fmt;

/// Event key for a newly created ticket
pub const CREATED_EVENT_KEY: &str = "created";

/// Unique identity of "this exact notification opportunity"
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub ticket_id: u64,
    pub event_key: String,
}

impl DedupKey {
    pub fn new(ticket_id: u64, event_key: impl Into<String>) -> Self {
        Self {
            ticket_id,
            event_key: event_key.into(),
        }
    }

    /// Key for the ticket-created notification
    pub fn created(ticket_id: u64) -> Self {
        Self::new(ticket_id, CREATED_EVENT_KEY)
    }

    /// Key for a single thread entry
    pub fn thread_entry(ticket_id: u64, entry_id: u64) -> Self {
        Self::new(ticket_id, format!("threadentry:{}", entry_id))
    }

    /// Key for a status change, keyed by the resulting status name
    ///
    /// Two edits that land on the same status collapse into one key no matter
    /// which descriptor key triggered them.
    pub fn status(ticket_id: u64, status_name: &str) -> Self {
        Self::new(ticket_id, format!("status:{}", status_name))
    }

    /// Storage form used in the cache file
    pub fn storage_key(&self) -> String {
        format!("{}|{}", self.ticket_id, self.event_key)
    }
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.ticket_id, self.event_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_key_format() {
        assert_eq!(DedupKey::created(42).storage_key(), "42|created");
        assert_eq!(DedupKey::thread_entry(42, 901).storage_key(), "42|threadentry:901");
        assert_eq!(DedupKey::status(7, "Closed").storage_key(), "7|status:Closed");
    }

    #[test]
    fn test_display_matches_storage_key() {
        let key = DedupKey::status(7, "Open");
        assert_eq!(key.to_string(), key.storage_key());
    }

    #[test]
    fn test_same_ticket_different_events_are_distinct() {
        assert_ne!(DedupKey::created(1), DedupKey::thread_entry(1, 1));
        assert_ne!(DedupKey::status(1, "Open"), DedupKey::status(1, "Closed"));
        assert_ne!(DedupKey::created(1), DedupKey::created(2));
    }
}
