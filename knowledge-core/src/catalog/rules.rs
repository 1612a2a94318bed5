//! Rules and rule sections

use serde::{Deserialize, Serialize};

use super::catalog_entity;
use super::reference::ResourceRef;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub index: String,
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subsections: Option<Vec<ResourceRef>>,
}
catalog_entity!(Rule, Rules);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSection {
    pub index: String,
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
}
catalog_entity!(RuleSection, RuleSections);
