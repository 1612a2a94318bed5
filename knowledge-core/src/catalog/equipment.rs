//! Equipment family: gear, equipment categories, magic items, magic schools,
//! weapon properties

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{boolish, catalog_entity};
use super::reference::ResourceRef;

/// Purchase cost of a piece of equipment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cost {
    pub quantity: i64,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equipment {
    pub index: String,
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment_category: Option<ResourceRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weapon_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weapon_range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<Cost>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damage: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Vec<ResourceRef>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub armor_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub armor_class: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub str_minimum: Option<i64>,
    #[serde(
        default,
        deserialize_with = "boolish::deserialize",
        serialize_with = "boolish::serialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub stealth_disadvantage: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gear_category: Option<ResourceRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<Vec<String>>,
}
catalog_entity!(Equipment, Equipment);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentCategory {
    pub index: String,
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment: Option<Vec<ResourceRef>>,
}
catalog_entity!(EquipmentCategory, EquipmentCategories);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MagicItem {
    pub index: String,
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment_category: Option<ResourceRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rarity: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variants: Option<Vec<ResourceRef>>,
    #[serde(
        default,
        deserialize_with = "boolish::deserialize",
        serialize_with = "boolish::serialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub variant: Option<bool>,
}
catalog_entity!(MagicItem, MagicItems);

impl MagicItem {
    /// Rarity display name, when present
    pub fn rarity_name(&self) -> Option<&str> {
        self.rarity.as_ref()?.get("name")?.as_str()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MagicSchool {
    pub index: String,
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
}
catalog_entity!(MagicSchool, MagicSchools);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponProperty {
    pub index: String,
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<Vec<String>>,
}
catalog_entity!(WeaponProperty, WeaponProperties);
