use serde::{Deserialize, Serialize};

use super::core::{QboEntity, Reference};

#[derive(Clone, Debug, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Item {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(rename = "Type")]
    pub item_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub income_account_ref: Option<Reference>,
}

impl QboEntity for Item {
    const ENTITY: &'static str = "Item";
}

#[derive(Clone, Debug, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Account {
    pub id: String,
    pub name: String,
    pub account_type: Option<String>,
    pub account_sub_type: Option<String>,
}

impl QboEntity for Account {
    const ENTITY: &'static str = "Account";
}
