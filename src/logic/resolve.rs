use crate::error::{Error, Result};
use crate::model::{FieldType, FieldValue, SchemaDescription};
use std::collections::HashMap;

const CUSTOM_SUFFIX: &str = "__c";

/// What a dynamic accessor name refers to on a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Accessor {
    /// A field held directly in the field map
    Field(String),
    /// A related record reached through the foreign-key field `key`
    Reference { key: String, target: String },
}

/// Resolve an accessor name against a schema and the fields a record holds.
///
/// Precedence:
/// 1. a schema field or a key already in the field map
/// 2. `<name>id` when that field is a reference
/// 3. `<name minus __c>id__c` or `<name>_lookup__c` when that field is a reference
///
/// Step 3 fails with [`Error::AmbiguousReference`] when both conventions match.
pub fn resolve_accessor(
    schema: &SchemaDescription,
    fields: &HashMap<String, FieldValue>,
    name: &str,
) -> Result<Accessor> {
    let name = name.to_lowercase();

    if schema.has_field(&name) || fields.contains_key(&name) {
        return Ok(Accessor::Field(name));
    }

    if let Some(accessor) = reference_through(schema, format!("{name}id")) {
        return Ok(accessor);
    }

    let stem = name.strip_suffix(CUSTOM_SUFFIX).unwrap_or(&name);
    let mut candidates: Vec<Accessor> = [format!("{stem}id__c"), format!("{name}_lookup__c")]
        .into_iter()
        .filter_map(|key| reference_through(schema, key))
        .collect();

    if candidates.len() > 1 {
        return Err(Error::AmbiguousReference {
            type_name: schema.type_name.clone(),
            field: name,
            candidates: candidates
                .into_iter()
                .filter_map(|c| match c {
                    Accessor::Reference { key, .. } => Some(key),
                    Accessor::Field(_) => None,
                })
                .collect(),
        });
    }

    candidates.pop().ok_or_else(|| Error::UndefinedField {
        type_name: schema.type_name.clone(),
        field: name,
    })
}

fn reference_through(schema: &SchemaDescription, key: String) -> Option<Accessor> {
    let descriptor = schema.lookup(&key)?;
    if descriptor.field_type != FieldType::Reference {
        return None;
    }
    let target = descriptor.reference_to.first()?.clone();
    Some(Accessor::Reference { key, target })
}
