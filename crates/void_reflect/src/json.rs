//! JSON ingestion into scopes
//!
//! A document is an object whose members describe attributes:
//!
//! ```json
//! {
//!     "Name":     { "type": "string", "value": "Hero" },
//!     "Health":   { "type": "integer", "value": [100, 80] },
//!     "Position": { "type": "vector", "value": "vec4(1, 2, 3, 1)" },
//!     "Items":    { "type": "table", "class": "Torch", "value": [ { ... }, { ... } ] }
//! }
//! ```
//!
//! Table values are nested documents (one object or an array of them). With
//! `"class"` each child is built through the [`Factory`]; without it the
//! children are plain scopes.

use crate::datum::{Datum, DatumType};
use crate::error::{ReflectError, Result};
use crate::factory::Factory;
use crate::scope::{ScopeArena, ScopeId};
use crate::type_manager::TypeManager;
use glam::{Mat4, Vec4};
use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Entry {
    #[serde(rename = "type")]
    datum_type: DatumType,
    #[serde(default)]
    value: Value,
    #[serde(default)]
    class: Option<String>,
}

/// Loads JSON documents into existing scopes
#[derive(Debug, Clone, Copy)]
pub struct JsonLoader<'a> {
    types: &'a TypeManager,
    factory: &'a Factory,
}

impl<'a> JsonLoader<'a> {
    pub fn new(types: &'a TypeManager, factory: &'a Factory) -> Self {
        Self { types, factory }
    }

    /// Parse `text` and load it into `target`
    pub fn load_str(&self, arena: &mut ScopeArena, target: ScopeId, text: &str) -> Result<()> {
        let document: Value = serde_json::from_str(text)?;
        self.load_value(arena, target, &document)
    }

    /// Load an already parsed document into `target`
    pub fn load_value(&self, arena: &mut ScopeArena, target: ScopeId, document: &Value) -> Result<()> {
        let members = document
            .as_object()
            .ok_or_else(|| ReflectError::Json(String::from("document root must be an object")))?;
        self.load_members(arena, target, members)
    }

    fn load_members(&self, arena: &mut ScopeArena, target: ScopeId, members: &Map<String, Value>) -> Result<()> {
        for (key, raw) in members {
            let entry = Entry::deserialize(raw)
                .map_err(|e| ReflectError::Json(format!("attribute '{}': {}", key, e)))?;
            match entry.datum_type {
                DatumType::Table => self.load_table(arena, target, key, &entry)?,
                DatumType::Unknown => {
                    arena.scope_mut(target)?.append(key)?;
                }
                datum_type => {
                    let datum = arena.scope_mut(target)?.append_with_type(key, datum_type)?;
                    load_elements(datum, &entry.value)?;
                }
            }
        }
        Ok(())
    }

    fn load_table(&self, arena: &mut ScopeArena, target: ScopeId, key: &str, entry: &Entry) -> Result<()> {
        let children: Vec<&Map<String, Value>> = match &entry.value {
            Value::Null => Vec::new(),
            Value::Object(members) => vec![members],
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_object().ok_or_else(|| {
                        ReflectError::Json(format!("table '{}' holds a non-object element", key))
                    })
                })
                .collect::<Result<_>>()?,
            _ => {
                return Err(ReflectError::Json(format!(
                    "table '{}' must be an object or an array of objects",
                    key
                )))
            }
        };

        arena.scope_mut(target)?.entry_with_type(key, DatumType::Table)?;
        for members in children {
            let child = match &entry.class {
                Some(class) => arena.create_child(self.types, self.factory, target, class, key)?,
                None => arena.append_scope(target, key)?,
            };
            self.load_members(arena, child, members)?;
        }
        Ok(())
    }
}

/// Resize `datum` to the number of values and write each one
fn load_elements(datum: &mut Datum, value: &Value) -> Result<()> {
    let items = split_elements(datum.datum_type(), value);
    datum.resize(items.len())?;
    for (index, item) in items.into_iter().enumerate() {
        load_element(datum, item, index)?;
    }
    Ok(())
}

/// A numeric array is one vector/matrix element; otherwise arrays list elements
fn split_elements(datum_type: DatumType, value: &Value) -> Vec<&Value> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items)
            if matches!(datum_type, DatumType::Vector | DatumType::Matrix)
                && !items.is_empty()
                && items.iter().all(Value::is_number) =>
        {
            vec![value]
        }
        Value::Array(items) => items.iter().collect(),
        _ => vec![value],
    }
}

fn load_element(datum: &mut Datum, value: &Value, index: usize) -> Result<()> {
    let datum_type = datum.datum_type();
    let mismatch = || ReflectError::Parse {
        datum_type,
        text: value.to_string(),
    };

    match (datum_type, value) {
        (_, Value::String(text)) => datum.set_from_string(text, index),
        (DatumType::Pointer | DatumType::Reference, Value::Null) => Ok(()),
        (DatumType::Integer, Value::Number(n)) => {
            let n = n.as_i64().and_then(|n| i32::try_from(n).ok()).ok_or_else(mismatch)?;
            datum.set(n, index)
        }
        (DatumType::Float, Value::Number(n)) => {
            let n = n.as_f64().ok_or_else(mismatch)?;
            datum.set(n as f32, index)
        }
        (DatumType::Vector, Value::Array(items)) => {
            let c = numbers::<4>(items).ok_or_else(mismatch)?;
            datum.set(Vec4::from_array(c), index)
        }
        (DatumType::Matrix, Value::Array(items)) => {
            let c = numbers::<16>(items).ok_or_else(mismatch)?;
            datum.set(Mat4::from_cols_array(&c), index)
        }
        _ => Err(mismatch()),
    }
}

fn numbers<const N: usize>(items: &[Value]) -> Option<[f32; N]> {
    if items.len() != N {
        return None;
    }
    let mut out = [0.0f32; N];
    for (slot, item) in out.iter_mut().zip(items) {
        *slot = item.as_f64()? as f32;
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(text: &str) -> Result<(ScopeArena, ScopeId)> {
        let types = TypeManager::new();
        let factory = Factory::new();
        let mut arena = ScopeArena::new();
        let root = arena.create_scope();
        JsonLoader::new(&types, &factory).load_str(&mut arena, root, text)?;
        Ok((arena, root))
    }

    #[test]
    fn test_scalars_and_arrays() {
        let (arena, root) = load(
            r#"{
                "Name": { "type": "string", "value": "Hero" },
                "Health": { "type": "integer", "value": [100, 80] },
                "Speed": { "type": "float", "value": 2.5 },
                "Position": { "type": "vector", "value": [1, 2, 3, 1] },
                "Waypoints": { "type": "vector", "value": ["vec4(0, 0, 0, 1)", [5, 5, 5, 1]] },
                "Transform": { "type": "matrix", "value": [1,0,0,0, 0,1,0,0, 0,0,1,0, 0,0,0,1] },
                "Target": { "type": "pointer", "value": null }
            }"#,
        )
        .unwrap();

        let scope = arena.scope(root).unwrap();
        assert_eq!(scope.at("Name").unwrap().get::<String>(0).unwrap(), "Hero");
        assert_eq!(scope.at("Health").unwrap().to_vec::<i32>().unwrap(), vec![100, 80]);
        assert_eq!(scope.at("Speed").unwrap().get::<f32>(0).unwrap(), 2.5);
        assert_eq!(
            scope.at("Position").unwrap().get::<Vec4>(0).unwrap(),
            Vec4::new(1.0, 2.0, 3.0, 1.0)
        );
        assert_eq!(scope.at("Waypoints").unwrap().size(), 2);
        assert_eq!(scope.at("Transform").unwrap().get::<Mat4>(0).unwrap(), Mat4::IDENTITY);
        assert_eq!(scope.at("Target").unwrap().size(), 0);
        assert_eq!(scope.keys().collect::<Vec<_>>()[0], "Name");
    }

    #[test]
    fn test_nested_tables() {
        let (arena, root) = load(
            r#"{
                "Children": { "type": "table", "value": [
                    { "Id": { "type": "integer", "value": 1 } },
                    { "Id": { "type": "integer", "value": 2 },
                      "Inner": { "type": "table", "value": { "Leaf": { "type": "string", "value": "x" } } } }
                ] }
            }"#,
        )
        .unwrap();

        let children = arena.children(root);
        assert_eq!(children.len(), 2);
        let (leaf_owner, _) = arena.search_children(root, "Leaf").unwrap();
        assert_eq!(arena.scope(leaf_owner).unwrap().parent(), Some(children[1]));
    }

    #[test]
    fn test_rejects_bad_documents() {
        assert!(matches!(load("[1, 2]"), Err(ReflectError::Json(_))));
        assert!(matches!(load("{ not json"), Err(ReflectError::Json(_))));
        assert!(matches!(
            load(r#"{ "A": { "type": "integer", "value": 1.5 } }"#),
            Err(ReflectError::Parse { .. })
        ));
        assert!(matches!(
            load(r#"{ "A": { "type": "widget", "value": 1 } }"#),
            Err(ReflectError::Json(_))
        ));
        assert!(matches!(
            load(r#"{ "A": { "type": "table", "class": "Nope", "value": {} } }"#),
            Err(ReflectError::UnknownClass(_))
        ));
    }
}
