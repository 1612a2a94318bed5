//! Character-option family: backgrounds, classes, feats, races, subclasses,
//! subraces, racial traits

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::catalog_entity;
use super::reference::{Choice, ResourceRef};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Background {
    pub index: String,
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starting_proficiencies: Option<Vec<ResourceRef>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starting_equipment: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starting_equipment_options: Option<Vec<Choice>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_options: Option<Choice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personality_traits: Option<Choice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ideals: Option<Choice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bonds: Option<Choice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flaws: Option<Choice>,
}
catalog_entity!(Background, Backgrounds);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterClass {
    pub index: String,
    pub name: String,
    pub url: String,
    pub hit_die: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proficiencies: Option<Vec<ResourceRef>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proficiency_choices: Option<Vec<Choice>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saving_throws: Option<Vec<ResourceRef>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starting_equipment: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starting_equipment_options: Option<Vec<Choice>>,
    /// URL of the class levels endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_levels: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multi_classing: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subclasses: Option<Vec<ResourceRef>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spellcasting: Option<Value>,
    /// URL of the class spell list endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spells: Option<String>,
}
catalog_entity!(CharacterClass, Classes);

impl CharacterClass {
    /// Whether this class has any spellcasting progression
    pub fn is_spellcaster(&self) -> bool {
        self.spellcasting.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feat {
    pub index: String,
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prerequisites: Option<Value>,
}
catalog_entity!(Feat, Feats);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Race {
    pub index: String,
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ability_bonuses: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ability_bonus_options: Option<Choice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starting_proficiencies: Option<Vec<ResourceRef>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starting_proficiency_options: Option<Choice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub languages: Option<Vec<ResourceRef>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_options: Option<Choice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_desc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traits: Option<Vec<ResourceRef>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subraces: Option<Vec<ResourceRef>>,
}
catalog_entity!(Race, Races);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subclass {
    pub index: String,
    pub name: String,
    pub url: String,
    #[serde(rename = "class", default, skip_serializing_if = "Option::is_none")]
    pub class_ref: Option<ResourceRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subclass_flavor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subclass_levels: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spells: Option<Value>,
}
catalog_entity!(Subclass, Subclasses);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subrace {
    pub index: String,
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub race: Option<ResourceRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ability_bonuses: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starting_proficiencies: Option<Vec<ResourceRef>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub languages: Option<Vec<ResourceRef>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_options: Option<Choice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub racial_traits: Option<Vec<ResourceRef>>,
}
catalog_entity!(Subrace, Subraces);

/// A racial trait. Named to avoid colliding with the `trait` keyword while
/// the table stays `traits`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RacialTrait {
    pub index: String,
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub races: Option<Vec<ResourceRef>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subraces: Option<Vec<ResourceRef>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proficiencies: Option<Vec<ResourceRef>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proficiency_choices: Option<Choice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_options: Option<Choice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trait_specific: Option<Value>,
}
catalog_entity!(RacialTrait, Traits);
