//! Process-wide field-mapping cache
//!
//! Holds, per entity kind, the column-to-field renames and the set of
//! JSON-encoded columns used when converting rows into domain models. The
//! cache is populated under a lock on first repository construction of a
//! kind and read lock-free afterward. It is purely a performance
//! affordance: the data comes straight from [`EntityKind`] metadata.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::LazyLock;

use parking_lot::RwLock;

use gm_knowledge_core::EntityKind;

/// Column metadata for one kind
pub struct FieldMap {
    /// Columns whose TEXT payload is JSON and must be parsed before
    /// validation
    pub json_columns: HashSet<&'static str>,
    /// `(column, field)` renames applied reading; reversed when writing
    pub renames: &'static [(&'static str, &'static str)],
}

impl FieldMap {
    fn for_kind(kind: EntityKind) -> Self {
        Self {
            json_columns: kind.json_columns().iter().copied().collect(),
            renames: kind.column_renames(),
        }
    }

    /// Domain field name for a column
    pub fn field_for_column<'a>(&self, column: &'a str) -> &'a str {
        self.renames
            .iter()
            .find(|(col, _)| *col == column)
            .map_or(column, |(_, field)| *field)
    }

    /// Column name for a domain field
    pub fn column_for_field<'a>(&self, field: &'a str) -> &'a str {
        self.renames
            .iter()
            .find(|(_, f)| *f == field)
            .map_or(field, |(col, _)| *col)
    }
}

static FIELD_MAPS: LazyLock<RwLock<HashMap<EntityKind, Arc<FieldMap>>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Get (and lazily build) the field map for a kind
pub fn field_map(kind: EntityKind) -> Arc<FieldMap> {
    if let Some(map) = FIELD_MAPS.read().get(&kind) {
        return Arc::clone(map);
    }
    let mut write = FIELD_MAPS.write();
    Arc::clone(
        write
            .entry(kind)
            .or_insert_with(|| Arc::new(FieldMap::for_kind(kind))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_returns_the_same_instance() {
        let first = field_map(EntityKind::Spells);
        let second = field_map(EntityKind::Spells);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn feature_class_column_renames_both_ways() {
        let map = field_map(EntityKind::Features);
        assert_eq!(map.field_for_column("class_ref"), "class");
        assert_eq!(map.column_for_field("class"), "class_ref");
        assert_eq!(map.field_for_column("level"), "level");
    }

    #[test]
    fn spell_json_columns_include_structured_fields() {
        let map = field_map(EntityKind::Spells);
        assert!(map.json_columns.contains("desc"));
        assert!(map.json_columns.contains("school"));
        assert!(!map.json_columns.contains("range"));
    }
}
