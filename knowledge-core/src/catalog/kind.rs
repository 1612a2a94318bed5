//! Entity kind enumeration and per-kind table metadata
//!
//! `EntityKind` is the compile-time whitelist for every piece of dynamic SQL
//! that interpolates a table name. It also carries the per-kind column
//! metadata the storage layer needs: extra DDL, JSON-encoded columns, and
//! column-to-field renames.

use serde::{Deserialize, Serialize};

/// The 25 catalog entity kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    AbilityScores,
    Alignments,
    Backgrounds,
    Classes,
    Conditions,
    DamageTypes,
    Equipment,
    EquipmentCategories,
    Feats,
    Features,
    Languages,
    Levels,
    MagicItems,
    MagicSchools,
    Monsters,
    Proficiencies,
    Races,
    Rules,
    RuleSections,
    Skills,
    Spells,
    Subclasses,
    Subraces,
    Traits,
    WeaponProperties,
}

impl EntityKind {
    /// Every kind, in table-name order
    pub const ALL: [EntityKind; 25] = [
        EntityKind::AbilityScores,
        EntityKind::Alignments,
        EntityKind::Backgrounds,
        EntityKind::Classes,
        EntityKind::Conditions,
        EntityKind::DamageTypes,
        EntityKind::Equipment,
        EntityKind::EquipmentCategories,
        EntityKind::Feats,
        EntityKind::Features,
        EntityKind::Languages,
        EntityKind::Levels,
        EntityKind::MagicItems,
        EntityKind::MagicSchools,
        EntityKind::Monsters,
        EntityKind::Proficiencies,
        EntityKind::Races,
        EntityKind::Rules,
        EntityKind::RuleSections,
        EntityKind::Skills,
        EntityKind::Spells,
        EntityKind::Subclasses,
        EntityKind::Subraces,
        EntityKind::Traits,
        EntityKind::WeaponProperties,
    ];

    /// Kinds the indexing job embeds for retrieval. The remaining kinds are
    /// lookup-only reference data.
    pub const RAG_INDEXED: [EntityKind; 12] = [
        EntityKind::Spells,
        EntityKind::Monsters,
        EntityKind::Equipment,
        EntityKind::Classes,
        EntityKind::Features,
        EntityKind::Backgrounds,
        EntityKind::Races,
        EntityKind::Feats,
        EntityKind::MagicItems,
        EntityKind::Traits,
        EntityKind::Conditions,
        EntityKind::Skills,
    ];

    /// Backing table name. The only values ever interpolated into SQL.
    pub fn table_name(self) -> &'static str {
        match self {
            EntityKind::AbilityScores => "ability_scores",
            EntityKind::Alignments => "alignments",
            EntityKind::Backgrounds => "backgrounds",
            EntityKind::Classes => "classes",
            EntityKind::Conditions => "conditions",
            EntityKind::DamageTypes => "damage_types",
            EntityKind::Equipment => "equipment",
            EntityKind::EquipmentCategories => "equipment_categories",
            EntityKind::Feats => "feats",
            EntityKind::Features => "features",
            EntityKind::Languages => "languages",
            EntityKind::Levels => "levels",
            EntityKind::MagicItems => "magic_items",
            EntityKind::MagicSchools => "magic_schools",
            EntityKind::Monsters => "monsters",
            EntityKind::Proficiencies => "proficiencies",
            EntityKind::Races => "races",
            EntityKind::Rules => "rules",
            EntityKind::RuleSections => "rule_sections",
            EntityKind::Skills => "skills",
            EntityKind::Spells => "spells",
            EntityKind::Subclasses => "subclasses",
            EntityKind::Subraces => "subraces",
            EntityKind::Traits => "traits",
            EntityKind::WeaponProperties => "weapon_properties",
        }
    }

    /// Resolve a table name back to its kind. Returns `None` for anything
    /// not on the whitelist; callers turn that into an invalid-argument
    /// error before building SQL.
    pub fn from_table_name(name: &str) -> Option<EntityKind> {
        EntityKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.table_name() == name)
    }

    /// Singular display label used in textual views ("Spell: Fireball")
    pub fn display_label(self) -> &'static str {
        match self {
            EntityKind::AbilityScores => "Ability Score",
            EntityKind::Alignments => "Alignment",
            EntityKind::Backgrounds => "Background",
            EntityKind::Classes => "Class",
            EntityKind::Conditions => "Condition",
            EntityKind::DamageTypes => "Damage Type",
            EntityKind::Equipment => "Equipment",
            EntityKind::EquipmentCategories => "Equipment Category",
            EntityKind::Feats => "Feat",
            EntityKind::Features => "Feature",
            EntityKind::Languages => "Language",
            EntityKind::Levels => "Level",
            EntityKind::MagicItems => "Magic Item",
            EntityKind::MagicSchools => "Magic School",
            EntityKind::Monsters => "Monster",
            EntityKind::Proficiencies => "Proficiency",
            EntityKind::Races => "Race",
            EntityKind::Rules => "Rule",
            EntityKind::RuleSections => "Rule Section",
            EntityKind::Skills => "Skill",
            EntityKind::Spells => "Spell",
            EntityKind::Subclasses => "Subclass",
            EntityKind::Subraces => "Subrace",
            EntityKind::Traits => "Trait",
            EntityKind::WeaponProperties => "Weapon Property",
        }
    }

    /// Kind-specific columns appended to the shared DDL. JSON-structured
    /// fields are stored as TEXT and parsed at the repository edge.
    pub fn extra_columns_ddl(self) -> &'static str {
        match self {
            EntityKind::AbilityScores => "full_name TEXT, \"desc\" TEXT, skills TEXT",
            EntityKind::Alignments => "\"desc\" TEXT, abbreviation TEXT",
            EntityKind::Backgrounds => {
                "starting_proficiencies TEXT, starting_equipment TEXT, \
                 starting_equipment_options TEXT, language_options TEXT, feature TEXT, \
                 personality_traits TEXT, ideals TEXT, bonds TEXT, flaws TEXT"
            }
            EntityKind::Classes => {
                "hit_die INTEGER NOT NULL, proficiencies TEXT, proficiency_choices TEXT, \
                 saving_throws TEXT, starting_equipment TEXT, starting_equipment_options TEXT, \
                 class_levels TEXT, multi_classing TEXT, subclasses TEXT, spellcasting TEXT, \
                 spells TEXT"
            }
            EntityKind::Conditions | EntityKind::DamageTypes | EntityKind::WeaponProperties => {
                "\"desc\" TEXT"
            }
            EntityKind::Equipment => {
                "equipment_category TEXT, weapon_category TEXT, weapon_range TEXT, \
                 category_range TEXT, cost TEXT, damage TEXT, range TEXT, weight REAL, \
                 properties TEXT, armor_category TEXT, armor_class TEXT, str_minimum INTEGER, \
                 stealth_disadvantage INTEGER, tool_category TEXT, vehicle_category TEXT, \
                 speed TEXT, capacity TEXT, gear_category TEXT, quantity INTEGER, \"desc\" TEXT"
            }
            EntityKind::EquipmentCategories => "equipment TEXT",
            EntityKind::Feats => "\"desc\" TEXT, prerequisites TEXT",
            EntityKind::Features => {
                "level INTEGER, class_ref TEXT, subclass TEXT, \"desc\" TEXT, parent TEXT, \
                 prerequisites TEXT, feature_specific TEXT"
            }
            EntityKind::Languages => "type TEXT, typical_speakers TEXT, script TEXT, \"desc\" TEXT",
            EntityKind::Levels => {
                "level INTEGER NOT NULL, class_ref TEXT, subclass TEXT, \
                 ability_score_bonuses INTEGER, prof_bonus INTEGER, features TEXT, \
                 spellcasting TEXT, class_specific TEXT"
            }
            EntityKind::MagicItems => {
                "equipment_category TEXT, \"desc\" TEXT, rarity TEXT, variants TEXT, variant INTEGER"
            }
            EntityKind::MagicSchools | EntityKind::RuleSections => "\"desc\" TEXT",
            EntityKind::Monsters => {
                "size TEXT NOT NULL, type TEXT NOT NULL, subtype TEXT, alignment TEXT, \
                 armor_class TEXT, hit_points INTEGER NOT NULL, hit_dice TEXT, \
                 hit_points_roll TEXT, speed TEXT, strength INTEGER NOT NULL, \
                 dexterity INTEGER NOT NULL, constitution INTEGER NOT NULL, \
                 intelligence INTEGER NOT NULL, wisdom INTEGER NOT NULL, \
                 charisma INTEGER NOT NULL, proficiencies TEXT, damage_vulnerabilities TEXT, \
                 damage_resistances TEXT, damage_immunities TEXT, condition_immunities TEXT, \
                 senses TEXT, languages TEXT, challenge_rating REAL NOT NULL, \
                 proficiency_bonus INTEGER, xp INTEGER NOT NULL, special_abilities TEXT, \
                 actions TEXT, legendary_actions TEXT, reactions TEXT"
            }
            EntityKind::Proficiencies => {
                "type TEXT, classes TEXT, races TEXT, \"references\" TEXT"
            }
            EntityKind::Races => {
                "speed INTEGER, ability_bonuses TEXT, ability_bonus_options TEXT, \
                 alignment TEXT, age TEXT, size TEXT, size_description TEXT, \
                 starting_proficiencies TEXT, starting_proficiency_options TEXT, \
                 languages TEXT, language_options TEXT, language_desc TEXT, traits TEXT, \
                 subraces TEXT"
            }
            EntityKind::Rules => "\"desc\" TEXT, subsections TEXT",
            EntityKind::Skills => "\"desc\" TEXT, ability_score TEXT",
            EntityKind::Spells => {
                "\"desc\" TEXT, higher_level TEXT, range TEXT, components TEXT, material TEXT, \
                 ritual INTEGER, duration TEXT, concentration INTEGER, casting_time TEXT, \
                 level INTEGER NOT NULL, attack_type TEXT, damage TEXT, school TEXT, \
                 classes TEXT, subclasses TEXT, dc TEXT, area_of_effect TEXT"
            }
            EntityKind::Subclasses => {
                "class_ref TEXT, subclass_flavor TEXT, \"desc\" TEXT, subclass_levels TEXT, \
                 spells TEXT"
            }
            EntityKind::Subraces => {
                "race TEXT, \"desc\" TEXT, ability_bonuses TEXT, starting_proficiencies TEXT, \
                 languages TEXT, language_options TEXT, racial_traits TEXT"
            }
            EntityKind::Traits => {
                "races TEXT, subraces TEXT, \"desc\" TEXT, proficiencies TEXT, \
                 proficiency_choices TEXT, language_options TEXT, trait_specific TEXT"
            }
        }
    }

    /// Columns stored as JSON text that must be parsed before validation
    pub fn json_columns(self) -> &'static [&'static str] {
        match self {
            EntityKind::AbilityScores => &["desc", "skills"],
            EntityKind::Alignments | EntityKind::MagicSchools | EntityKind::RuleSections => &[],
            EntityKind::Backgrounds => &[
                "starting_proficiencies",
                "starting_equipment",
                "starting_equipment_options",
                "language_options",
                "feature",
                "personality_traits",
                "ideals",
                "bonds",
                "flaws",
            ],
            EntityKind::Classes => &[
                "proficiencies",
                "proficiency_choices",
                "saving_throws",
                "starting_equipment",
                "starting_equipment_options",
                "multi_classing",
                "subclasses",
                "spellcasting",
            ],
            EntityKind::Conditions
            | EntityKind::DamageTypes
            | EntityKind::WeaponProperties => &["desc"],
            EntityKind::Equipment => &[
                "equipment_category",
                "cost",
                "damage",
                "range",
                "properties",
                "armor_class",
                "speed",
                "gear_category",
                "desc",
            ],
            EntityKind::EquipmentCategories => &["equipment"],
            EntityKind::Feats => &["desc", "prerequisites"],
            EntityKind::Features => &[
                "class_ref",
                "subclass",
                "desc",
                "parent",
                "prerequisites",
                "feature_specific",
            ],
            EntityKind::Languages => &["typical_speakers"],
            EntityKind::Levels => &[
                "class_ref",
                "subclass",
                "features",
                "spellcasting",
                "class_specific",
            ],
            EntityKind::MagicItems => &["equipment_category", "desc", "rarity", "variants"],
            EntityKind::Monsters => &[
                "armor_class",
                "speed",
                "proficiencies",
                "damage_vulnerabilities",
                "damage_resistances",
                "damage_immunities",
                "condition_immunities",
                "senses",
                "special_abilities",
                "actions",
                "legendary_actions",
                "reactions",
            ],
            EntityKind::Proficiencies => &["classes", "races", "references"],
            EntityKind::Races => &[
                "ability_bonuses",
                "ability_bonus_options",
                "starting_proficiencies",
                "starting_proficiency_options",
                "languages",
                "language_options",
                "traits",
                "subraces",
            ],
            EntityKind::Rules => &["subsections"],
            EntityKind::Skills => &["desc", "ability_score"],
            EntityKind::Spells => &[
                "desc",
                "higher_level",
                "components",
                "damage",
                "school",
                "classes",
                "subclasses",
                "dc",
                "area_of_effect",
            ],
            EntityKind::Subclasses => &["class_ref", "desc", "spells"],
            EntityKind::Subraces => &[
                "race",
                "ability_bonuses",
                "starting_proficiencies",
                "languages",
                "language_options",
                "racial_traits",
            ],
            EntityKind::Traits => &[
                "races",
                "subraces",
                "desc",
                "proficiencies",
                "proficiency_choices",
                "language_options",
                "trait_specific",
            ],
        }
    }

    /// Column-to-field renames applied between storage and the domain
    /// schema, as `(column, field)` pairs. The ingestion JSON uses `class`
    /// where the column is `class_ref`.
    pub fn column_renames(self) -> &'static [(&'static str, &'static str)] {
        match self {
            EntityKind::Features | EntityKind::Levels | EntityKind::Subclasses => {
                &[("class_ref", "class")]
            }
            _ => &[],
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.table_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_has_25_distinct_kinds() {
        let mut names: Vec<&str> = EntityKind::ALL.iter().map(|k| k.table_name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 25);
    }

    #[test]
    fn table_name_roundtrip() {
        for kind in EntityKind::ALL {
            assert_eq!(EntityKind::from_table_name(kind.table_name()), Some(kind));
        }
        assert_eq!(EntityKind::from_table_name("users"), None);
        assert_eq!(EntityKind::from_table_name("spells; DROP TABLE"), None);
    }

    #[test]
    fn serde_uses_table_names() {
        let json = serde_json::to_string(&EntityKind::RuleSections).unwrap();
        assert_eq!(json, "\"rule_sections\"");
    }

    #[test]
    fn class_rename_applies_to_progression_kinds() {
        assert_eq!(
            EntityKind::Features.column_renames(),
            &[("class_ref", "class")]
        );
        assert!(EntityKind::Spells.column_renames().is_empty());
    }
}
