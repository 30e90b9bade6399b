use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Correlation ID type for tracking a job across the scraper, embedder and
/// Qdrant sink.
///
/// Uses UUID v4 for guaranteed uniqueness without a coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    /// Generate a new correlation ID using UUID v4.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn to_uuid(self) -> Uuid {
        self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for CorrelationId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl From<&str> for CorrelationId {
    fn from(id: &str) -> Self {
        Uuid::try_parse(id).map_or_else(|_| Self(Uuid::new_v4()), Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_display_and_parse() {
        let id = CorrelationId::new();
        let text = id.to_string();
        let parsed = CorrelationId::from(text.as_str());
        assert_eq!(id, parsed);
    }

    #[test]
    fn falls_back_to_fresh_id_on_garbage_input() {
        let id = CorrelationId::from("not-a-uuid");
        assert_ne!(id.to_string(), "not-a-uuid");
    }
}
