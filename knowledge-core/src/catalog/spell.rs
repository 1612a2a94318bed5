//! Spells

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{boolish, catalog_entity};
use super::reference::ResourceRef;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spell {
    pub index: String,
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub higher_level: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
    /// Components as listed (V, S, M)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    #[serde(
        default,
        deserialize_with = "boolish::deserialize",
        serialize_with = "boolish::serialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub ritual: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(
        default,
        deserialize_with = "boolish::deserialize",
        serialize_with = "boolish::serialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub concentration: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub casting_time: Option<String>,
    pub level: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attack_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damage: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school: Option<ResourceRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classes: Option<Vec<ResourceRef>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subclasses: Option<Vec<ResourceRef>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dc: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_of_effect: Option<Value>,
}
catalog_entity!(Spell, Spells);

impl Spell {
    /// Whether the given class can cast this spell
    pub fn castable_by(&self, class_index: &str) -> bool {
        self.classes
            .as_ref()
            .is_some_and(|refs| refs.iter().any(|r| r.index == class_index))
    }
}
