//! Row-to-model conversion
//!
//! Every repository read goes through the same pipeline: copy the row's
//! declared columns into an owned JSON map, parse JSON-encoded columns,
//! apply column renames, then deserialize into the domain model. The
//! deserialization is the revalidation step the session-isolation contract
//! requires; nothing produced here can hold a database handle.

use chrono::{DateTime, Utc};
use serde_json::{Map, Number, Value};
use tracing::warn;

use gm_knowledge_core::catalog::CatalogEntity;
use gm_knowledge_core::{ContentPack, Error, Result};

use crate::fields::FieldMap;

/// Decode a packed little-endian f32 blob
pub fn blob_to_vec(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Encode a vector as a packed little-endian f32 blob
pub fn vec_to_blob(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Column names of a result set, captured before iterating rows
pub fn column_names(rows: &libsql::Rows) -> Vec<String> {
    (0..rows.column_count())
        .map(|i| rows.column_name(i).unwrap_or_default().to_string())
        .collect()
}

/// Copy one row into an owned JSON map keyed by domain field names.
///
/// Blob columns are skipped (the embedding never leaves the storage layer)
/// and JSON-encoded TEXT columns are parsed; a payload that fails to parse
/// is kept as the raw string so validation surfaces the problem.
pub fn row_to_json_map(
    row: &libsql::Row,
    names: &[String],
    fields: &FieldMap,
) -> Result<Map<String, Value>> {
    let mut map = Map::with_capacity(names.len());

    for (i, name) in names.iter().enumerate() {
        let value = row
            .get_value(i as i32)
            .map_err(|e| Error::database("read column", format!("{name}: {e}")))?;

        let json = match value {
            libsql::Value::Null => Value::Null,
            libsql::Value::Integer(n) => Value::Number(Number::from(n)),
            libsql::Value::Real(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
            libsql::Value::Text(text) => {
                if fields.json_columns.contains(name.as_str()) {
                    parse_json_column(name, &text)
                } else {
                    Value::String(text)
                }
            }
            libsql::Value::Blob(_) => continue,
        };

        if json.is_null() {
            continue;
        }
        map.insert(fields.field_for_column(name).to_string(), json);
    }

    Ok(map)
}

fn parse_json_column(column: &str, text: &str) -> Value {
    if text == "null" {
        return Value::Null;
    }
    match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            warn!(column, "JSON column failed to parse, keeping raw text: {e}");
            Value::String(text.to_string())
        }
    }
}

/// Validate a row map into its domain model. The pack id is dropped here,
/// so the returned value carries no storage-only fields.
pub fn to_model<T: CatalogEntity>(mut map: Map<String, Value>) -> Result<T> {
    map.remove("content_pack_id");
    map.remove("distance");

    let index = map
        .get("index")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();

    serde_json::from_value(Value::Object(map)).map_err(|e| {
        warn!(
            kind = T::KIND.table_name(),
            index, "row failed domain validation: {e}"
        );
        Error::validation("entity", format!("{}/{index}: {e}", T::KIND.table_name()))
    })
}

/// Parse one `content_packs` row selected with the canonical column order
pub fn row_to_content_pack(row: &libsql::Row) -> Result<ContentPack> {
    let parse_time = |value: String, field: &str| -> Result<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&value)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|_| Error::validation(field, value.clone()))
    };

    let created_at: String = row
        .get(6)
        .map_err(|e| Error::database("read content pack", e))?;
    let updated_at: String = row
        .get(7)
        .map_err(|e| Error::database("read content pack", e))?;

    Ok(ContentPack {
        id: row.get(0).map_err(|e| Error::database("read content pack", e))?,
        name: row.get(1).map_err(|e| Error::database("read content pack", e))?,
        description: row
            .get::<Option<String>>(2)
            .map_err(|e| Error::database("read content pack", e))?,
        version: row.get(3).map_err(|e| Error::database("read content pack", e))?,
        author: row
            .get::<Option<String>>(4)
            .map_err(|e| Error::database("read content pack", e))?,
        is_active: row
            .get::<i64>(5)
            .map_err(|e| Error::database("read content pack", e))?
            != 0,
        created_at: parse_time(created_at, "created_at")?,
        updated_at: parse_time(updated_at, "updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gm_knowledge_core::catalog::Spell;
    use gm_knowledge_core::EntityKind;

    use crate::fields::field_map;

    #[test]
    fn blob_roundtrip_preserves_values() {
        let vector = vec![0.25_f32, -1.5, 3.75, 0.0];
        let blob = vec_to_blob(&vector);
        assert_eq!(blob.len(), 16);
        assert_eq!(blob_to_vec(&blob), vector);
    }

    #[test]
    fn blob_layout_is_little_endian() {
        let blob = vec_to_blob(&[1.0_f32]);
        assert_eq!(blob, 1.0_f32.to_le_bytes().to_vec());
    }

    #[test]
    fn spell_map_validates_into_model() {
        let mut map = Map::new();
        map.insert("index".into(), Value::String("fireball".into()));
        map.insert("name".into(), Value::String("Fireball".into()));
        map.insert("url".into(), Value::String("/api/spells/fireball".into()));
        map.insert("level".into(), Value::Number(3.into()));
        map.insert("content_pack_id".into(), Value::String("srd".into()));
        map.insert(
            "desc".into(),
            serde_json::json!(["A bright streak flashes toward a point you choose."]),
        );

        let spell: Spell = to_model(map).unwrap();
        assert_eq!(spell.index, "fireball");
        assert_eq!(spell.level, 3);
        // The pack id was stripped before validation
        let json = serde_json::to_value(&spell).unwrap();
        assert!(json.get("content_pack_id").is_none());
    }

    #[test]
    fn invalid_row_yields_validation_error() {
        let mut map = Map::new();
        map.insert("index".into(), Value::String("broken".into()));
        map.insert("name".into(), Value::String("Broken".into()));
        map.insert("url".into(), Value::String("/api/spells/broken".into()));
        // level missing entirely
        let result: Result<Spell> = to_model(map);
        assert!(matches!(result, Err(Error::Validation { .. })));
    }

    #[test]
    fn unparseable_json_column_stays_raw() {
        let fields = field_map(EntityKind::Spells);
        assert_eq!(
            parse_json_column("desc", "not json at all"),
            Value::String("not json at all".into())
        );
        assert_eq!(parse_json_column("desc", "null"), Value::Null);
        let _ = fields;
    }
}
