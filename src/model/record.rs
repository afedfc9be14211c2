use crate::error::{Error, Result, ServerError};
use crate::logic::{coerce_value, resolve_accessor, serialize_value, Accessor};
use crate::model::{CreateResponse, FieldValue, Id, Payload, RecordAttributes, SchemaDescription};
use crate::store::{Client, Method, Response};
use std::collections::{BTreeMap, HashMap};

/// Id of a raw payload, whatever the case of its key
pub fn payload_id(payload: &Payload) -> Option<String> {
    payload
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case("id"))
        .and_then(|(_, value)| value.as_str())
        .map(str::to_string)
}

/// One record of a server-described type.
///
/// Field names are lowercased on ingestion. A record without an id is new
/// and saves with a create; otherwise saves are full-field updates to `url`.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    type_name: String,
    id: Option<Id>,
    url: String,
    fields: HashMap<String, FieldValue>,
    last_response: Option<Response>,
    last_error: Option<ServerError>,
}

impl Record {
    /// Build a record from a payload, coercing values against the type's schema.
    ///
    /// The payload's own `attributes.type` wins over `declared_type`. Nested
    /// objects carrying `attributes` become embedded records.
    pub fn from_payload(
        client: &Client,
        declared_type: Option<&str>,
        payload: Payload,
    ) -> Result<Self> {
        let attributes = RecordAttributes::of(&payload);
        let type_name = attributes
            .as_ref()
            .map(|a| a.type_name.as_str())
            .or(declared_type)
            .ok_or_else(|| Error::Protocol("record payload carries no type".to_string()))?;
        let record_type = client.types().resolve(type_name)?;
        let schema = client.describe(&record_type.name)?;

        let mut fields = HashMap::with_capacity(payload.len());
        for (key, value) in payload {
            if key == "attributes" {
                continue;
            }
            let key = key.to_lowercase();
            let value = match value {
                serde_json::Value::Object(nested) if RecordAttributes::of(&nested).is_some() => {
                    FieldValue::Record(Box::new(Record::from_payload(client, None, nested)?))
                }
                other => coerce_value(&key, schema.lookup(&key).map(|f| f.field_type), other)?,
            };
            fields.insert(key, value);
        }

        let id = fields
            .get("id")
            .and_then(FieldValue::as_str)
            .map(str::to_string);
        let base_url = client.base_url();
        let url = match (&id, attributes.and_then(|a| a.url)) {
            (Some(_), Some(url)) => client.absolute_url(&url),
            (Some(id), None) => record_type.record_url(&base_url, id),
            (None, _) => record_type.collection_url(&base_url),
        };

        Ok(Self {
            type_name: record_type.name,
            id,
            url,
            fields,
            last_response: None,
            last_error: None,
        })
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    /// Raw field value without consulting the schema
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(&name.to_lowercase())
    }

    /// Field map with null entries left out
    pub fn fields(&self) -> BTreeMap<&str, &FieldValue> {
        self.fields
            .iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(name, value)| (name.as_str(), value))
            .collect()
    }

    /// Shallow merge. Values are validated against the schema only on save.
    pub fn merge_fields<I, K, V>(&mut self, updates: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<FieldValue>,
    {
        for (name, value) in updates {
            self.fields.insert(name.as_ref().to_lowercase(), value.into());
        }
    }

    /// Read a field or a related record by name.
    ///
    /// Reference accessors (`account` for `accountid`) fetch the related
    /// record through its type's finder; a null foreign key reads as `Null`.
    pub fn get(&self, client: &Client, name: &str) -> Result<FieldValue> {
        let schema = client.describe(&self.type_name)?;
        match resolve_accessor(&schema, &self.fields, name)? {
            Accessor::Field(key) => Ok(self.fields.get(&key).cloned().unwrap_or(FieldValue::Null)),
            Accessor::Reference { key, target } => {
                match self.fields.get(&key).and_then(FieldValue::as_str) {
                    Some(id) => {
                        log::debug!("resolving {}.{} -> {}:{}", self.type_name, key, target, id);
                        let related = client.sobject(&target)?.find(id)?;
                        Ok(FieldValue::Record(Box::new(related)))
                    }
                    None => Ok(FieldValue::Null),
                }
            }
        }
    }

    /// Write a field. Related-record accessors are read-only.
    pub fn set(&mut self, client: &Client, name: &str, value: impl Into<FieldValue>) -> Result<()> {
        let schema = client.describe(&self.type_name)?;
        match resolve_accessor(&schema, &self.fields, name)? {
            Accessor::Field(key) => {
                let value = match value.into() {
                    FieldValue::Scalar(raw) => {
                        coerce_value(&key, schema.lookup(&key).map(|f| f.field_type), raw)?
                    }
                    other => other,
                };
                self.fields.insert(key, value);
                Ok(())
            }
            Accessor::Reference { .. } => Err(Error::UndefinedField {
                type_name: self.type_name.clone(),
                field: name.to_lowercase(),
            }),
        }
    }

    /// Non-null fields the schema marks updateable, in wire form
    pub fn saveable_fields(&self, schema: &SchemaDescription) -> serde_json::Map<String, serde_json::Value> {
        self.fields()
            .into_iter()
            .filter_map(|(name, value)| {
                let descriptor = schema.lookup(name)?;
                if !descriptor.updateable {
                    return None;
                }
                Some((name.to_string(), serialize_value(descriptor.field_type, value)))
            })
            .collect()
    }

    /// Create or update the record remotely.
    ///
    /// The raw response and any parsed server error are kept for
    /// [`last_response`](Self::last_response) / [`last_error`](Self::last_error).
    pub fn save(&mut self, client: &Client) -> Result<()> {
        let schema = client.describe(&self.type_name)?;
        let body = serde_json::Value::Object(self.saveable_fields(&schema)).to_string();
        let method = if self.is_new() { Method::Post } else { Method::Patch };

        let response = client.send(method, &self.url, &[], Some(body))?;
        self.last_response = Some(response.clone());

        if response.is_success() {
            self.last_error = None;
            if self.is_new() {
                self.adopt_created_id(client, &response)?;
            }
            return Ok(());
        }

        let error = ServerError::from_body(response.status, &response.body);
        let context = format!("{}:{}", self.type_name, self.id().unwrap_or("new"));
        let classified = client.classify(&error, Some(&context));
        self.last_error = Some(error);
        Err(classified)
    }

    fn adopt_created_id(&mut self, client: &Client, response: &Response) -> Result<()> {
        let created = serde_json::from_str::<CreateResponse>(&response.body)
            .map_err(|_| Error::Protocol("create response carried no id".to_string()))?;
        let record_type = client.types().resolve(&self.type_name)?;
        self.url = record_type.record_url(&client.base_url(), &created.id);
        self.fields
            .insert("id".to_string(), FieldValue::from(created.id.as_str()));
        self.id = Some(created.id);
        Ok(())
    }

    pub fn update_attributes<I, K, V>(&mut self, client: &Client, updates: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<FieldValue>,
    {
        self.merge_fields(updates);
        self.save(client)
    }

    /// Delete remotely; returns whether the server reported success
    pub fn delete(&self, client: &Client) -> Result<bool> {
        if self.is_new() {
            return Err(Error::Unsaved(self.type_name.clone()));
        }
        let response = client.send(Method::Delete, &self.url, &[], None)?;
        Ok(response.is_success())
    }

    /// Replace local state with a fresh fetch by id
    pub fn reload(&mut self, client: &Client) -> Result<()> {
        let id = self
            .id
            .clone()
            .ok_or_else(|| Error::Unsaved(self.type_name.clone()))?;
        *self = client.sobject(&self.type_name)?.find(&id)?;
        Ok(())
    }

    pub fn last_response(&self) -> Option<&Response> {
        self.last_response.as_ref()
    }

    pub fn last_error(&self) -> Option<&ServerError> {
        self.last_error.as_ref()
    }

    /// Non-null fields as a JSON object
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.fields()
                .into_iter()
                .map(|(name, value)| (name.to_string(), value.to_json()))
                .collect(),
        )
    }
}
