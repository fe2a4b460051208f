use serde_json::{Map, Value};

/// One message moving toward or away from the broker: a topic plus its JSON
/// payload. Payload keys keep their insertion order end to end.
///
/// Publications are built transiently, once per message, and discarded after
/// forwarding or publishing.
#[derive(Debug, Clone, PartialEq)]
pub struct Publication {
    pub topic: String,
    pub payload: Map<String, Value>,
}

impl Publication {
    pub fn new(topic: impl Into<String>, payload: Map<String, Value>) -> Self {
        Self {
            topic: topic.into(),
            payload,
        }
    }

    /// Build from a publish-request document: `{"topic": .., "payload": {..}}`.
    /// Returns `None` when either field is missing or of the wrong shape.
    pub fn from_request(doc: &Map<String, Value>) -> Option<Self> {
        let topic = doc.get("topic")?.as_str()?;
        let payload = doc.get("payload")?.as_object()?;

        Some(Self::new(topic, payload.clone()))
    }

    /// Parse the wrapped line shape back into a publication. The document must
    /// hold exactly one key, the topic, mapped to the payload object.
    pub fn from_wrapped(doc: &Map<String, Value>) -> Option<Self> {
        if doc.len() != 1 {
            return None;
        }

        let (topic, payload) = doc.iter().next()?;

        Some(Self::new(topic.clone(), payload.as_object()?.clone()))
    }

    /// The publish-request shape, used on the inbound-to-broker side.
    pub fn request_line(&self) -> String {
        let mut doc = Map::new();
        doc.insert("topic".to_string(), Value::String(self.topic.clone()));
        doc.insert("payload".to_string(), Value::Object(self.payload.clone()));

        Value::Object(doc).to_string()
    }

    /// The wrapped outbound-from-broker shape: `{"<topic>": {payload}}`.
    pub fn wrapped_line(&self) -> String {
        let mut doc = Map::new();
        doc.insert(self.topic.clone(), Value::Object(self.payload.clone()));

        Value::Object(doc).to_string()
    }

    /// The bare payload shape.
    pub fn payload_line(&self) -> String {
        Value::Object(self.payload.clone()).to_string()
    }
}

// --------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> Map<String, Value> {
        let doc: Value =
            serde_json::from_str(r#"{"tag": "x1", "val": {"NO2": 12.3}}"#).unwrap();
        doc.as_object().unwrap().clone()
    }

    #[test]
    fn request_round_trip_preserves_topic_and_key_order() {
        let publication = Publication::new("site/1/gases", payload());
        let line = publication.request_line();

        let doc: Map<String, Value> = serde_json::from_str(&line).unwrap();
        let decoded = Publication::from_request(&doc).unwrap();

        assert_eq!(decoded, publication);

        let keys: Vec<&String> = decoded.payload.keys().collect();
        assert_eq!(keys, ["tag", "val"]);
    }

    #[test]
    fn wrapped_round_trip() {
        let publication = Publication::new("site/1/gases", payload());
        let line = publication.wrapped_line();

        assert!(line.starts_with(r#"{"site/1/gases":{"#));

        let doc: Map<String, Value> = serde_json::from_str(&line).unwrap();
        let decoded = Publication::from_wrapped(&doc).unwrap();

        assert_eq!(decoded, publication);
    }

    #[test]
    fn from_request_rejects_malformed_documents() {
        let no_topic: Map<String, Value> =
            serde_json::from_str(r#"{"payload": {"a": 1}}"#).unwrap();
        assert!(Publication::from_request(&no_topic).is_none());

        let bad_topic: Map<String, Value> =
            serde_json::from_str(r#"{"topic": 3, "payload": {"a": 1}}"#).unwrap();
        assert!(Publication::from_request(&bad_topic).is_none());

        let bad_payload: Map<String, Value> =
            serde_json::from_str(r#"{"topic": "t", "payload": 7}"#).unwrap();
        assert!(Publication::from_request(&bad_payload).is_none());
    }

    #[test]
    fn from_wrapped_requires_a_single_topic_key() {
        let two_keys: Map<String, Value> =
            serde_json::from_str(r#"{"a": {}, "b": {}}"#).unwrap();
        assert!(Publication::from_wrapped(&two_keys).is_none());
    }

    #[test]
    fn payload_line_is_the_bare_document() {
        let publication = Publication::new("site/1/gases", payload());
        assert_eq!(
            publication.payload_line(),
            r#"{"tag":"x1","val":{"NO2":12.3}}"#
        );
    }
}
