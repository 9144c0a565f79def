use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::Event;
use serde::{Deserialize, Serialize};
use serde_plain::derive_display_from_serialize;
use std::fmt::{Display, Formatter};

/// The `type` of a Kubernetes event.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum EventSeverity {
    Normal,
    Warning,
}

derive_display_from_serialize!(EventSeverity);

/// The slice of a Kubernetes `Event` that failure detection cares about.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ClusterEvent {
    /// Identifies the event object, `uid` when available and `name` otherwise.
    pub id: String,
    pub namespace: String,
    pub timestamp: DateTime<Utc>,
    pub severity: EventSeverity,
    pub reason: String,
    pub message: String,
    pub involved_kind: String,
    pub involved_name: String,
}

impl ClusterEvent {
    /// Convert a core/v1 `Event`. Returns `None` for events without any usable timestamp, which
    /// cannot be ordered against a baseline.
    pub fn from_event(event: &Event) -> Option<ClusterEvent> {
        let timestamp = event
            .last_timestamp
            .as_ref()
            .map(|t| t.0)
            .or_else(|| event.event_time.as_ref().map(|t| t.0))
            .or_else(|| event.first_timestamp.as_ref().map(|t| t.0))
            .or_else(|| event.metadata.creation_timestamp.as_ref().map(|t| t.0))?;
        let severity = match event.type_.as_deref() {
            Some("Warning") => EventSeverity::Warning,
            _ => EventSeverity::Normal,
        };
        Some(ClusterEvent {
            id: event
                .metadata
                .uid
                .clone()
                .or_else(|| event.metadata.name.clone())
                .unwrap_or_default(),
            namespace: event.metadata.namespace.clone().unwrap_or_default(),
            timestamp,
            severity,
            reason: event.reason.clone().unwrap_or_default(),
            message: event.message.clone().unwrap_or_default(),
            involved_kind: event.involved_object.kind.clone().unwrap_or_default(),
            involved_name: event.involved_object.name.clone().unwrap_or_default(),
        })
    }
}

impl Display for ClusterEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} event '{}' for {} '{}' at {}: {}",
            self.severity,
            self.reason,
            self.involved_kind,
            self.involved_name,
            self.timestamp.to_rfc3339(),
            self.message
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use k8s_openapi::api::core::v1::ObjectReference;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};

    #[test]
    fn warning_event_conversion() {
        let at = Utc::now();
        let event = Event {
            metadata: ObjectMeta {
                name: Some("broker-0.17a".to_string()),
                namespace: Some("amq".to_string()),
                ..Default::default()
            },
            type_: Some("Warning".to_string()),
            reason: Some("ErrImagePull".to_string()),
            message: Some("manifest unknown".to_string()),
            first_timestamp: Some(Time(at)),
            involved_object: ObjectReference {
                kind: Some("Pod".to_string()),
                name: Some("broker-0".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let converted = ClusterEvent::from_event(&event).unwrap();
        assert_eq!(converted.id, "broker-0.17a");
        assert_eq!(converted.severity, EventSeverity::Warning);
        assert_eq!(converted.timestamp, at);
        assert_eq!(converted.involved_name, "broker-0");
    }

    #[test]
    fn events_without_time_are_skipped() {
        assert!(ClusterEvent::from_event(&Event::default()).is_none());
    }
}
