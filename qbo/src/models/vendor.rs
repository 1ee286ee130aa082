use serde::{Deserialize, Serialize};

use super::core::{EmailAddress, PhoneNumber, PhysicalAddress, QboEntity};

#[derive(Clone, Debug, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Vendor {
    pub id: String,
    pub display_name: Option<String>,
    pub company_name: Option<String>,
    pub primary_email_addr: Option<EmailAddress>,
    pub primary_phone: Option<PhoneNumber>,
    /// Tracks payments for 1099, which is how subcontractors are told apart from
    /// ordinary vendors
    pub vendor1099: Option<bool>,
    pub balance: Option<f64>,
    pub bill_addr: Option<PhysicalAddress>,
    #[serde(default)]
    pub custom_field: Vec<CustomField>,
}

#[derive(Clone, Debug, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct CustomField {
    pub definition_id: String,
    pub name: Option<String>,
    #[serde(rename = "Type")]
    pub field_type: Option<String>,
    pub string_value: Option<String>,
}

impl QboEntity for Vendor {
    const ENTITY: &'static str = "Vendor";
}

/// Payload for creating a vendor; QuickBooks assigns the id
#[derive(Clone, Debug, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct NewVendor {
    pub display_name: String,
    pub company_name: String,
    pub vendor1099: bool,
}

impl NewVendor {
    #[must_use]
    pub fn named(name: &str, vendor1099: bool) -> Self {
        NewVendor {
            display_name: name.to_string(),
            company_name: name.to_string(),
            vendor1099,
        }
    }
}

impl Vendor {
    /// `DisplayName`, falling back to `CompanyName`
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.display_name
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.company_name.as_deref().filter(|s| !s.is_empty()))
    }

    #[must_use]
    pub fn is_subcontractor(&self) -> bool {
        self.vendor1099 == Some(true)
    }

    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.primary_email_addr
            .as_ref()
            .map(|e| e.address.as_str())
            .filter(|s| !s.is_empty())
    }

    #[must_use]
    pub fn phone(&self) -> Option<&str> {
        self.primary_phone
            .as_ref()
            .map(|p| p.free_form_number.as_str())
            .filter(|s| !s.is_empty())
    }
}
