//! Payload pieces sent back to the source system.

use serde::{Deserialize, Serialize};

/// A person attribute to create on ingestion, in the source system's REST shape.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct PersonAttributeInput {
    #[serde(rename = "attributeType")]
    pub attribute_type: String,

    pub value: String,
}

/// Error body returned by the proxy when it rejects a request.
///
/// The proxy is inconsistent about the member name, so both are accepted.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct RemoteMessage {
    #[serde(default)]
    pub message: Option<String>,

    #[serde(default)]
    pub error: Option<String>,
}

impl RemoteMessage {
    /// The human-readable message, whichever member carried it.
    pub fn text(&self) -> Option<&str> {
        self.message.as_deref().or(self.error.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialises_attribute_type_in_camel_case() {
        let input = PersonAttributeInput {
            attribute_type: "a384873b-847a-4a86-b869-28fb601162dd".into(),
            value: "555".into(),
        };
        let json = serde_json::to_value(&input).expect("serialise");
        assert_eq!(
            json,
            serde_json::json!({ "attributeType": "a384873b-847a-4a86-b869-28fb601162dd", "value": "555" })
        );
    }

    #[test]
    fn remote_message_reads_either_member() {
        let a: RemoteMessage = serde_json::from_str(r#"{ "message": "duplicate" }"#).expect("a");
        let b: RemoteMessage = serde_json::from_str(r#"{ "error": "bad gender" }"#).expect("b");
        assert_eq!(a.text(), Some("duplicate"));
        assert_eq!(b.text(), Some("bad gender"));
    }
}
