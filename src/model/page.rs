use serde::Deserialize;

pub type Payload = serde_json::Map<String, serde_json::Value>;

/// One page of a query result
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryPage {
    #[serde(default)]
    pub total_size: usize,
    pub done: bool,
    #[serde(default)]
    pub next_records_url: Option<String>,
    #[serde(default)]
    pub records: Vec<Payload>,
}

/// The `attributes` block every server-returned record carries
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RecordAttributes {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub url: Option<String>,
}

impl RecordAttributes {
    /// Read the self-description of a payload, if it has one.
    pub fn of(payload: &Payload) -> Option<Self> {
        payload
            .get("attributes")
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }
}

/// Body of a successful create call
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreateResponse {
    pub id: String,
    #[serde(default)]
    pub success: bool,
}
