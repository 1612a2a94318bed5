//! By-value reference triples and choice-like structures
//!
//! Catalog rows point at each other with `{index, name, url}` triples rather
//! than foreign keys, so a row can be loaded, serialized, and handed to a
//! caller without touching a session. Choice-like JSON blobs parse into a
//! discriminated union keyed by `option_type`; unknown shapes are preserved
//! as raw JSON instead of failing validation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// By-value pointer to another catalog entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub index: String,
    pub name: String,
    pub url: String,
}

impl ResourceRef {
    pub fn new(
        index: impl Into<String>,
        name: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            index: index.into(),
            name: name.into(),
            url: url.into(),
        }
    }
}

/// A choice a character-building step presents (pick N from a set)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choose: Option<i64>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(rename = "from", default, skip_serializing_if = "Option::is_none")]
    pub from: Option<OptionSet>,
}

/// The pool a [`Choice`] draws from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option_set_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<OptionEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment_category: Option<ResourceRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_list_url: Option<String>,
}

/// One selectable entry, discriminated by `option_type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "option_type", rename_all = "snake_case")]
pub enum OptionEntry {
    Reference {
        item: ResourceRef,
    },
    Choice {
        choice: Box<Choice>,
    },
    String {
        string: String,
    },
    Ideal {
        desc: String,
        #[serde(default)]
        alignments: Vec<ResourceRef>,
    },
    CountedReference {
        count: i64,
        of: ResourceRef,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prerequisites: Option<Value>,
    },
    Multiple {
        items: Vec<OptionEntry>,
    },
    /// Shapes the schema does not model stay available as raw JSON
    #[serde(untagged)]
    Other(Value),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_option_parses() {
        let json = serde_json::json!({
            "option_type": "reference",
            "item": {"index": "fireball", "name": "Fireball", "url": "/api/spells/fireball"}
        });
        let entry: OptionEntry = serde_json::from_value(json).unwrap();
        match entry {
            OptionEntry::Reference { item } => assert_eq!(item.index, "fireball"),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn nested_choice_parses() {
        let json = serde_json::json!({
            "option_type": "choice",
            "choice": {
                "desc": "one martial weapon",
                "choose": 1,
                "type": "equipment",
                "from": {
                    "option_set_type": "equipment_category",
                    "equipment_category": {
                        "index": "martial-weapons",
                        "name": "Martial Weapons",
                        "url": "/api/equipment-categories/martial-weapons"
                    }
                }
            }
        });
        let entry: OptionEntry = serde_json::from_value(json).unwrap();
        match entry {
            OptionEntry::Choice { choice } => {
                assert_eq!(choice.choose, Some(1));
                let from = choice.from.unwrap();
                assert_eq!(
                    from.equipment_category.unwrap().index,
                    "martial-weapons"
                );
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn unknown_option_type_falls_back_to_raw_json() {
        let json = serde_json::json!({
            "option_type": "breath",
            "name": "Fire Breath",
            "dc": {"dc_type": {"index": "dex", "name": "DEX", "url": "/api/ability-scores/dex"}}
        });
        let entry: OptionEntry = serde_json::from_value(json.clone()).unwrap();
        match entry {
            OptionEntry::Other(raw) => assert_eq!(raw, json),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn choice_roundtrips_through_json() {
        let choice = Choice {
            desc: Some("choose two skills".into()),
            choose: Some(2),
            kind: Some("proficiencies".into()),
            from: Some(OptionSet {
                option_set_type: Some("options_array".into()),
                options: Some(vec![OptionEntry::Reference {
                    item: ResourceRef::new("skill-arcana", "Skill: Arcana", "/api/proficiencies/skill-arcana"),
                }]),
                equipment_category: None,
                resource_list_url: None,
            }),
        };
        let json = serde_json::to_value(&choice).unwrap();
        assert_eq!(json["type"], "proficiencies");
        let back: Choice = serde_json::from_value(json).unwrap();
        assert_eq!(back, choice);
    }
}
