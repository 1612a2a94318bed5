//! Catalog domain models
//!
//! One module per entity family; every model is a pure value object with
//! serde derives. The storage layer deserializes rows into these types, and
//! that deserialization is the schema revalidation step: a row that does not
//! fit the model is rejected at the repository edge.

pub mod character;
pub mod equipment;
pub mod kind;
pub mod mechanics;
pub mod monster;
pub mod pack;
pub mod progression;
pub mod reference;
pub mod rules;
pub mod spell;

pub use character::{Background, CharacterClass, Feat, Race, RacialTrait, Subclass, Subrace};
pub use equipment::{Cost, Equipment, EquipmentCategory, MagicItem, MagicSchool, WeaponProperty};
pub use kind::EntityKind;
pub use mechanics::{AbilityScore, Alignment, Condition, DamageType, Language, Proficiency, Skill};
pub use monster::Monster;
pub use pack::ContentPack;
pub use progression::{Feature, Level};
pub use reference::{Choice, OptionEntry, OptionSet, ResourceRef};
pub use rules::{Rule, RuleSection};
pub use spell::Spell;

/// Common surface of all 25 catalog models
pub trait CatalogEntity:
    serde::Serialize + serde::de::DeserializeOwned + Send + Sync + 'static
{
    /// The kind this model belongs to
    const KIND: EntityKind;

    /// Stable string id, unique within a pack
    fn index(&self) -> &str;

    /// Display name
    fn name(&self) -> &str;

    /// API-style URL identifying the entity across packs
    fn url(&self) -> &str;
}

macro_rules! catalog_entity {
    ($ty:ident, $kind:ident) => {
        impl crate::catalog::CatalogEntity for $ty {
            const KIND: crate::catalog::EntityKind = crate::catalog::EntityKind::$kind;

            fn index(&self) -> &str {
                &self.index
            }

            fn name(&self) -> &str {
                &self.name
            }

            fn url(&self) -> &str {
                &self.url
            }
        }
    };
}
pub(crate) use catalog_entity;

/// Serde adapter for boolean columns that come back from SQLite as 0/1
pub(crate) mod boolish {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrInt {
        Bool(bool),
        Int(i64),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
        let raw = Option::<BoolOrInt>::deserialize(d)?;
        Ok(raw.map(|v| match v {
            BoolOrInt::Bool(b) => b,
            BoolOrInt::Int(i) => i != 0,
        }))
    }

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(v: &Option<bool>, s: S) -> Result<S::Ok, S::Error> {
        match v {
            Some(b) => s.serialize_bool(*b),
            None => s.serialize_none(),
        }
    }
}
