use crate::error::{Error, Result};
use crate::model::FieldType;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One field definition from a describe call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub updateable: bool,
    #[serde(default)]
    pub createable: bool,
    /// Target types of a reference field. The first entry is used when resolving.
    #[serde(default)]
    pub reference_to: Vec<String>,
    /// Remaining describe properties (label, length, picklistValues, ...)
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl FieldDescriptor {
    pub fn new(name: &str, field_type: FieldType) -> Self {
        Self {
            name: name.to_lowercase(),
            field_type,
            updateable: false,
            createable: false,
            reference_to: Vec::new(),
            extra: serde_json::Map::new(),
        }
    }

    pub fn updateable(mut self) -> Self {
        self.updateable = true;
        self.createable = true;
        self
    }

    pub fn references(mut self, target: &str) -> Self {
        self.reference_to.push(target.to_string());
        self
    }
}

#[derive(Debug, Clone, Deserialize)]
struct DescribePayload {
    name: Option<String>,
    fields: Vec<FieldDescriptor>,
}

/// Server-described schema of one record type.
///
/// Field names are stored lowercased; every lookup lowercases first.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDescription {
    pub type_name: String,
    fields: Vec<FieldDescriptor>,
    index: HashMap<String, usize>,
}

impl SchemaDescription {
    pub fn new(type_name: &str, fields: Vec<FieldDescriptor>) -> Self {
        let mut ordered: Vec<FieldDescriptor> = Vec::with_capacity(fields.len());
        let mut index = HashMap::new();
        for mut field in fields {
            field.name = field.name.to_lowercase();
            match index.get(&field.name) {
                Some(&position) => ordered[position] = field,
                None => {
                    index.insert(field.name.clone(), ordered.len());
                    ordered.push(field);
                }
            }
        }
        Self {
            type_name: type_name.to_string(),
            fields: ordered,
            index,
        }
    }

    /// Parse a describe response body
    pub fn from_describe(type_name: &str, body: &str) -> Result<Self> {
        let payload: DescribePayload = serde_json::from_str(body)?;
        let name = payload.name.unwrap_or_else(|| type_name.to_string());
        Ok(Self::new(&name, payload.fields))
    }

    pub fn lookup(&self, field: &str) -> Option<&FieldDescriptor> {
        self.index
            .get(&field.to_lowercase())
            .map(|&position| &self.fields[position])
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.lookup(field).is_some()
    }

    /// Like [`lookup`](Self::lookup) but a missing field is an error.
    pub fn field(&self, field: &str) -> Result<&FieldDescriptor> {
        self.lookup(field).ok_or_else(|| Error::UndefinedField {
            type_name: self.type_name.clone(),
            field: field.to_lowercase(),
        })
    }

    pub fn field_type(&self, field: &str) -> Result<FieldType> {
        Ok(self.field(field)?.field_type)
    }

    pub fn is_updateable(&self, field: &str) -> Result<bool> {
        Ok(self.field(field)?.updateable)
    }

    /// Read any describe property of a field by its wire name.
    ///
    /// Properties the server did not report come back as `Null`; a field
    /// absent from the schema is an error.
    pub fn field_property(&self, field: &str, property: &str) -> Result<serde_json::Value> {
        let descriptor = self.field(field)?;
        let value = match property {
            "name" => serde_json::Value::String(descriptor.name.clone()),
            "type" => serde_json::Value::String(descriptor.field_type.as_str().to_string()),
            "updateable" => serde_json::Value::Bool(descriptor.updateable),
            "createable" => serde_json::Value::Bool(descriptor.createable),
            "referenceTo" => serde_json::Value::from(descriptor.reference_to.clone()),
            other => descriptor
                .extra
                .get(other)
                .cloned()
                .unwrap_or(serde_json::Value::Null),
        };
        Ok(value)
    }

    /// Field names in describe order
    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }
}
