use serde::{Deserialize, Deserializer, Serialize};

/// Every QuickBooks entity is wrapped in an object keyed by its entity name, both in
/// single-entity responses (`{"Customer": {...}}`) and in query results
/// (`{"QueryResponse": {"Customer": [...]}}`).
pub trait QboEntity {
    const ENTITY: &'static str;
}

/// Reference to another entity, i.e. `CustomerRef` or `ItemRef`
#[derive(Clone, Debug, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct Reference {
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Reference {
    #[must_use]
    pub fn to(id: impl Into<String>) -> Self {
        Reference {
            value: id.into(),
            name: None,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct EmailAddress {
    #[serde(rename = "Address")]
    pub address: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct PhoneNumber {
    #[serde(rename = "FreeFormNumber")]
    pub free_form_number: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct PhysicalAddress {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_sub_division_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
}

/// Escapes a value for use inside a single quoted literal of the QuickBooks query language
#[must_use]
pub fn escape_literal(value: &str) -> String {
    value.replace('\'', "\\'")
}

/// Amounts usually arrive as JSON numbers, payroll payloads sometimes send them as text
#[allow(clippy::missing_errors_doc)]
pub fn lenient_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Number(n)) => Some(n),
        Some(Raw::Text(text)) => text.replace(',', "").trim().parse().ok(),
        None => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_single_quotes() {
        assert_eq!(escape_literal("O'Brien's Paving"), r"O\'Brien\'s Paving");
        assert_eq!(escape_literal("Acme"), "Acme");
    }

    #[test]
    fn reference_omits_missing_name() {
        let json = serde_json::to_string(&Reference::to("42")).unwrap();
        assert_eq!(json, r#"{"value":"42"}"#);
    }

    #[test]
    fn amounts_may_be_text() {
        #[derive(Deserialize)]
        struct Line {
            #[serde(default, deserialize_with = "lenient_amount")]
            amount: Option<f64>,
        }
        let parse = |json: &str| serde_json::from_str::<Line>(json).unwrap().amount;

        assert_eq!(parse(r#"{"amount": 12.5}"#), Some(12.5));
        assert_eq!(parse(r#"{"amount": "1,200.00"}"#), Some(1200.0));
        assert_eq!(parse(r#"{"amount": null}"#), None);
        assert_eq!(parse("{}"), None);
    }
}
