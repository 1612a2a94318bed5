//! Progression family: class features and level tables

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::catalog_entity;
use super::reference::ResourceRef;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub index: String,
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<i64>,
    #[serde(rename = "class", default, skip_serializing_if = "Option::is_none")]
    pub class_ref: Option<ResourceRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subclass: Option<ResourceRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ResourceRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prerequisites: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_specific: Option<Value>,
}
catalog_entity!(Feature, Features);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub index: String,
    pub name: String,
    pub url: String,
    pub level: i64,
    #[serde(rename = "class", default, skip_serializing_if = "Option::is_none")]
    pub class_ref: Option<ResourceRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subclass: Option<ResourceRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ability_score_bonuses: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prof_bonus: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<ResourceRef>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spellcasting: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_specific: Option<Value>,
}
catalog_entity!(Level, Levels);
