//! Person attributes: links as they appear on a source record, and their dereferenced detail.

use crate::search::Link;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An unresolved person attribute, as embedded in a source record's `extension` list.
///
/// `display` is the server's summary text (often `"Type = value"`); it is not used for
/// classification. Only the dereferenced [`PersonAttributeDetail`] carries the type identifier.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct AttributeLinkWire {
    #[serde(default)]
    pub uuid: String,

    #[serde(default)]
    pub display: String,

    #[serde(default)]
    pub links: Vec<Link>,
}

/// An indirection to a typed fact about a person.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeLink {
    /// Identifier of the attribute instance (not its type).
    pub id: String,

    /// Server-provided summary text.
    pub display: String,

    /// Where the attribute can be dereferenced. `None` when the wire carried no link.
    pub locator: Option<String>,
}

impl From<AttributeLinkWire> for AttributeLink {
    fn from(wire: AttributeLinkWire) -> Self {
        let locator = wire
            .links
            .iter()
            .find(|l| l.rel.as_deref() == Some("self"))
            .or_else(|| wire.links.first())
            .map(|l| l.uri.clone());

        AttributeLink {
            id: wire.uuid,
            display: wire.display,
            locator,
        }
    }
}

/// Reference to an attribute's type.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct AttributeTypeRef {
    pub uuid: String,

    #[serde(default)]
    pub display: Option<String>,
}

/// A dereferenced person attribute.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct PersonAttributeDetail {
    #[serde(default)]
    pub uuid: Option<String>,

    /// Human-readable value. For coded attributes this is the concept name.
    #[serde(default)]
    pub display: Option<String>,

    /// Raw value: a string for free-text attributes, an object for coded ones.
    #[serde(default)]
    pub value: Value,

    #[serde(rename = "attributeType")]
    pub attribute_type: AttributeTypeRef,

    #[serde(default)]
    pub voided: bool,

    #[serde(rename = "resourceVersion", default)]
    pub resource_version: Option<String>,
}

impl PersonAttributeDetail {
    /// The value text both systems exchange: `display`, falling back to a string `value`.
    pub fn value_text(&self) -> Option<&str> {
        self.display
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .or_else(|| self.value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{decode, Envelope, OpenmrsError};

    #[test]
    fn link_prefers_self_rel() {
        let wire: AttributeLinkWire = serde_json::from_value(serde_json::json!({
            "uuid": "attr-1",
            "display": "Telefono = 555",
            "links": [
                { "rel": "full", "uri": "http://x/attr-1?v=full" },
                { "rel": "self", "uri": "http://x/attr-1", "resourceAlias": "attribute" }
            ]
        }))
        .expect("parse");

        let link = AttributeLink::from(wire);
        assert_eq!(link.id, "attr-1");
        assert_eq!(link.locator.as_deref(), Some("http://x/attr-1"));
    }

    #[test]
    fn link_without_links_has_no_locator() {
        let link = AttributeLink::from(AttributeLinkWire {
            uuid: "attr-2".into(),
            display: String::new(),
            links: vec![],
        });
        assert!(link.locator.is_none());
    }

    #[test]
    fn decodes_enveloped_detail() {
        let envelope: Envelope<PersonAttributeDetail> = decode(serde_json::json!({
            "data": {
                "uuid": "attr-1",
                "display": "Chile",
                "value": { "uuid": "concept-1", "display": "Chile" },
                "attributeType": { "uuid": "7bb331e1-968f-4e26-96c5-cc9eb55fba11", "display": "Nacionalidad" },
                "voided": false,
                "resourceVersion": "1.8"
            },
            "message": null,
            "status": "ok"
        }))
        .expect("decode");

        assert_eq!(envelope.data.value_text(), Some("Chile"));
        assert_eq!(
            envelope.data.attribute_type.uuid,
            "7bb331e1-968f-4e26-96c5-cc9eb55fba11"
        );
    }

    #[test]
    fn value_text_falls_back_to_string_value() {
        let detail: PersonAttributeDetail = serde_json::from_value(serde_json::json!({
            "display": " ",
            "value": "+56 9 1234 5678",
            "attributeType": { "uuid": "a384873b-847a-4a86-b869-28fb601162dd" }
        }))
        .expect("parse");
        assert_eq!(detail.value_text(), Some("+56 9 1234 5678"));
    }

    #[test]
    fn missing_attribute_type_reports_path() {
        let err = decode::<Envelope<PersonAttributeDetail>>(serde_json::json!({
            "data": { "display": "Chile" }
        }))
        .expect_err("attributeType is required");

        match err {
            OpenmrsError::Schema { path, message } => {
                assert!(path.starts_with("data"), "{path}");
                assert!(message.contains("attributeType"), "{message}");
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }
}
