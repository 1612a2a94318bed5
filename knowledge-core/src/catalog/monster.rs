//! Monsters

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::catalog_entity;
use super::reference::ResourceRef;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Monster {
    pub index: String,
    pub name: String,
    pub url: String,
    pub size: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub armor_class: Option<Value>,
    pub hit_points: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hit_dice: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hit_points_roll: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<Value>,
    pub strength: i64,
    pub dexterity: i64,
    pub constitution: i64,
    pub intelligence: i64,
    pub wisdom: i64,
    pub charisma: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proficiencies: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damage_vulnerabilities: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damage_resistances: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damage_immunities: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition_immunities: Option<Vec<ResourceRef>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub senses: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub languages: Option<String>,
    pub challenge_rating: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proficiency_bonus: Option<i64>,
    pub xp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_abilities: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legendary_actions: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reactions: Option<Value>,
}
catalog_entity!(Monster, Monsters);

impl Monster {
    /// Whether this monster has legendary actions
    pub fn is_legendary(&self) -> bool {
        self.legendary_actions
            .as_ref()
            .and_then(Value::as_array)
            .is_some_and(|actions| !actions.is_empty())
    }
}
