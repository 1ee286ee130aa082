use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::core::{EmailAddress, PhoneNumber, PhysicalAddress, QboEntity, Reference};

/// A QuickBooks customer. Jobs (projects) are customers too, with `Job = true` and a
/// `ParentRef` pointing at the owning customer.
///
/// Fields we do not model are kept in `other`, so a record fetched from QuickBooks can be
/// posted back in full when doing a non-sparse update.
#[derive(Clone, Debug, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Customer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_email_addr: Option<EmailAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_phone: Option<PhoneNumber>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bill_addr: Option<PhysicalAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bill_with_parent: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_ref: Option<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<f64>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl QboEntity for Customer {
    const ENTITY: &'static str = "Customer";
}

impl Customer {
    /// A plain top level customer where display name and company name are the same
    #[must_use]
    pub fn named(name: &str) -> Self {
        Customer {
            display_name: Some(name.to_string()),
            company_name: Some(name.to_string()),
            ..Default::default()
        }
    }

    /// A job (sub-customer) billed with its parent, which is what QuickBooks requires
    /// for it to be converted into a project
    #[must_use]
    pub fn job_of(parent_id: &str, project_number: &str, project_name: &str) -> Self {
        Customer {
            display_name: Some(format!("{project_number} {project_name}")),
            job: Some(true),
            bill_with_parent: Some(true),
            parent_ref: Some(Reference::to(parent_id)),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        self.id.as_deref().unwrap_or_default()
    }

    /// `DisplayName`, falling back to `CompanyName`
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.display_name
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.company_name.as_deref().filter(|s| !s.is_empty()))
    }

    #[must_use]
    pub fn is_top_level(&self) -> bool {
        self.parent_ref.is_none()
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_unmodelled_fields_for_full_updates() {
        let json = r#"{
            "Id": "58",
            "SyncToken": "3",
            "DisplayName": "Aagaard Homes",
            "Taxable": false,
            "MetaData": {"CreateTime": "2024-01-01T10:00:00-08:00"}
        }"#;
        let mut customer: Customer = serde_json::from_str(json).unwrap();
        customer.display_name = Some("Aagaard Homes Inc".into());

        let back = serde_json::to_value(&customer).unwrap();
        assert_eq!(back["DisplayName"], "Aagaard Homes Inc");
        assert_eq!(back["Taxable"], false);
        assert_eq!(back["SyncToken"], "3");
        assert!(back.get("ParentRef").is_none());
    }

    #[test]
    fn job_display_name_starts_with_project_number() {
        let job = Customer::job_of("12", "1290", "Lakeside Remodel");
        assert_eq!(job.display_name.as_deref(), Some("1290 Lakeside Remodel"));
        assert_eq!(job.parent_ref, Some(Reference::to("12")));
        assert_eq!(job.bill_with_parent, Some(true));
        assert!(!job.is_top_level());
    }

    #[test]
    fn name_falls_back_to_company_name() {
        let customer = Customer {
            display_name: Some(String::new()),
            company_name: Some("Fallback LLC".into()),
            ..Default::default()
        };
        assert_eq!(customer.name(), Some("Fallback LLC"));
        assert_eq!(Customer::default().name(), None);
    }
}
