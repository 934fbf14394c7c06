use serde::{Deserialize, Serialize};

use crate::utils::initials;

/// Lifecycle status of a customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomerStatus {
    Active,
    Inactive,
    Lead,
}

impl CustomerStatus {
    pub const ALL: [CustomerStatus; 3] = [
        CustomerStatus::Active,
        CustomerStatus::Inactive,
        CustomerStatus::Lead,
    ];

    /// Wire value, used for the `status` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerStatus::Active => "active",
            CustomerStatus::Inactive => "inactive",
            CustomerStatus::Lead => "lead",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CustomerStatus::Active => "Active",
            CustomerStatus::Inactive => "Inactive",
            CustomerStatus::Lead => "Lead",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomerType {
    Individual,
    Business,
}

impl CustomerType {
    pub fn label(&self) -> &'static str {
        match self {
            CustomerType::Individual => "Individual",
            CustomerType::Business => "Business",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(rename = "zipCode", default, skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl Address {
    /// Lines suitable for display, skipping empty parts.
    /// City, state and zip share a line: "Springfield, IL 62701".
    pub fn display_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(ref street) = self.street {
            if !street.is_empty() {
                lines.push(street.clone());
            }
        }

        let mut locality = String::new();
        if let Some(ref city) = self.city {
            locality.push_str(city);
        }
        if let Some(ref state) = self.state {
            if !locality.is_empty() {
                locality.push_str(", ");
            }
            locality.push_str(state);
        }
        if let Some(ref zip) = self.zip_code {
            if !locality.is_empty() {
                locality.push(' ');
            }
            locality.push_str(zip);
        }
        if !locality.is_empty() {
            lines.push(locality);
        }

        if let Some(ref country) = self.country {
            if !country.is_empty() {
                lines.push(country.clone());
            }
        }
        lines
    }

    pub fn is_empty(&self) -> bool {
        self.display_lines().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    pub status: CustomerStatus,
    #[serde(rename = "type")]
    pub customer_type: CustomerType,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub last_contact: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub address: Option<Address>,
}

impl Customer {
    /// Secondary line under the name: the company, falling back to email.
    pub fn subtitle(&self) -> &str {
        self.company
            .as_deref()
            .filter(|c| !c.is_empty())
            .unwrap_or(&self.email)
    }

    pub fn initials(&self) -> String {
        initials(&self.name)
    }

    pub fn is_active(&self) -> bool {
        self.status == CustomerStatus::Active
    }
}

/// Partial customer payload for create and update calls.
/// Unset fields are omitted from the JSON body.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<CustomerStatus>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub customer_type: Option<CustomerType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
}
