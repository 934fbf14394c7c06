use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    #[serde(rename = "customerId")]
    pub customer_id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(rename = "isPrimary", default)]
    pub is_primary: bool,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

impl Contact {
    pub fn position_display(&self) -> &str {
        self.position.as_deref().unwrap_or("-")
    }
}

/// Partial contact payload for create and update calls.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ContactDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(rename = "isPrimary", skip_serializing_if = "Option::is_none")]
    pub is_primary: Option<bool>,
}
