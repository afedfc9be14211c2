use crate::config::AppConfig;
use crate::error::{DefaultClassifier, Error, ErrorClassifier, Result, ServerError};
use crate::logic::{throttle, Query, QuerySpec, RecordType, TypeRegistry};
use crate::model::{Payload, Record, SchemaDescription};
use crate::store::{AuthProvider, HttpTransport, Method, Request, Response, SchemaRegistry, StaticAuth, Transport};
use std::fmt;
use std::sync::Arc;

/// Fields fetched per call when a record has to be read in slices
pub const DEFAULT_THROTTLE_BATCH_SIZE: usize = 20;

/// Entry point to the remote record API.
///
/// Owns the transport and auth seams plus the two process-wide registries:
/// memoized schemas and the type-name factory.
pub struct Client {
    transport: Arc<dyn Transport>,
    auth: Arc<dyn AuthProvider>,
    classifier: Arc<dyn ErrorClassifier>,
    schemas: SchemaRegistry,
    types: TypeRegistry,
    throttle_batch_size: usize,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.auth.base_url())
            .field("throttle_batch_size", &self.throttle_batch_size)
            .finish_non_exhaustive()
    }
}

impl Client {
    pub fn new(
        transport: impl Transport + 'static,
        auth: impl AuthProvider + 'static,
    ) -> Self {
        Self {
            transport: Arc::new(transport),
            auth: Arc::new(auth),
            classifier: Arc::new(DefaultClassifier),
            schemas: SchemaRegistry::new(),
            types: TypeRegistry::new(),
            throttle_batch_size: DEFAULT_THROTTLE_BATCH_SIZE,
        }
    }

    /// Build an HTTP-backed client and register the configured types
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let client = Self::new(
            HttpTransport::from_config(config)?,
            StaticAuth::from_config(config)?,
        )
        .with_throttle_batch_size(config.query.throttle_batch_size);
        for name in &config.query.types {
            client.register_type(name);
        }
        Ok(client)
    }

    pub fn with_classifier(mut self, classifier: impl ErrorClassifier + 'static) -> Self {
        self.classifier = Arc::new(classifier);
        self
    }

    pub fn with_throttle_batch_size(mut self, batch_size: usize) -> Self {
        self.throttle_batch_size = batch_size.max(1);
        self
    }

    pub fn register_type(&self, name: &str) -> &Self {
        self.types.register(name);
        self
    }

    pub fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn throttle_batch_size(&self) -> usize {
        self.throttle_batch_size
    }

    pub fn base_url(&self) -> String {
        self.auth.base_url()
    }

    /// Resolve a server-relative path (`/services/data/...`) against the instance
    pub fn absolute_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.auth.instance_url(), path)
        }
    }

    /// Class-level handle for a registered type
    pub fn sobject(&self, name: &str) -> Result<RecordClass<'_>> {
        Ok(RecordClass {
            client: self,
            record_type: self.types.resolve(name)?,
        })
    }

    /// Schema of a type, fetched on first use and memoized
    pub fn describe(&self, type_name: &str) -> Result<Arc<SchemaDescription>> {
        self.schemas.get_or_fetch(type_name, || {
            let record_type = self.types.resolve(type_name)?;
            let response = self.send(
                Method::Get,
                &record_type.describe_url(&self.base_url()),
                &[],
                None,
            )?;
            if !response.is_success() {
                return Err(self.remote_error(&response, Some(&record_type.name)));
            }
            SchemaDescription::from_describe(&record_type.name, &response.body)
        })
    }

    pub fn query(&self, spec: QuerySpec) -> Query<'_> {
        Query::new(self, spec)
    }

    /// Build a record from a server or caller payload
    pub fn materialize(&self, declared_type: Option<&str>, payload: Payload) -> Result<Record> {
        Record::from_payload(self, declared_type, payload)
    }

    pub(crate) fn send(
        &self,
        method: Method,
        url: &str,
        params: &[(&str, &str)],
        body: Option<String>,
    ) -> Result<Response> {
        log::debug!("{} {}", method.as_str(), url);
        self.transport.send(Request {
            method,
            url: url.to_string(),
            headers: self.auth.headers(),
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body,
        })
    }

    pub(crate) fn classify(&self, error: &ServerError, context: Option<&str>) -> Error {
        self.classifier
            .classify(&error.error_code, &error.message, context)
    }

    /// Classified error for a non-success response
    pub(crate) fn remote_error(&self, response: &Response, context: Option<&str>) -> Error {
        self.classify(&ServerError::from_body(response.status, &response.body), context)
    }
}

/// Type-scoped operations, the equivalent of class methods on a record type
#[derive(Debug, Clone)]
pub struct RecordClass<'c> {
    client: &'c Client,
    record_type: RecordType,
}

impl<'c> RecordClass<'c> {
    pub fn name(&self) -> &str {
        &self.record_type.name
    }

    pub fn client(&self) -> &'c Client {
        self.client
    }

    pub fn describe(&self) -> Result<Arc<SchemaDescription>> {
        self.client.describe(&self.record_type.name)
    }

    pub fn field_type(&self, field: &str) -> Result<crate::model::FieldType> {
        self.describe()?.field_type(field)
    }

    pub fn is_updateable(&self, field: &str) -> Result<bool> {
        self.describe()?.is_updateable(field)
    }

    pub fn field_property(&self, field: &str, property: &str) -> Result<serde_json::Value> {
        self.describe()?.field_property(field, property)
    }

    /// Query over `id` only
    pub fn spec(&self) -> QuerySpec {
        QuerySpec::new(&self.record_type.name)
    }

    pub fn select<I, S>(&self, fields: I) -> QuerySpec
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.spec().select(fields)
    }

    /// Every record of the type with every schema field
    pub fn all(&self) -> Result<Query<'c>> {
        let fields = self.describe()?.field_names();
        Ok(self.client.query(self.select(fields)))
    }

    pub fn query_where(&self, condition: &str) -> Result<Query<'c>> {
        let fields = self.describe()?.field_names();
        Ok(self.client.query(self.select(fields).filter(condition)))
    }

    /// Unsaved record of this type
    pub fn new_record(&self, fields: serde_json::Value) -> Result<Record> {
        match fields {
            serde_json::Value::Object(payload) => {
                self.client.materialize(Some(&self.record_type.name), payload)
            }
            other => Err(Error::Protocol(format!(
                "record fields must be an object, got {}",
                other
            ))),
        }
    }

    pub fn create(&self, fields: serde_json::Value) -> Result<Record> {
        let mut record = self.new_record(fields)?;
        record.save(self.client)?;
        Ok(record)
    }

    /// Fetch one record by id, reading it in slices if the server refuses the full fetch
    pub fn find(&self, id: &str) -> Result<Record> {
        let context = format!("{}:{}", self.record_type.name, id);
        let url = self.record_type.record_url(&self.client.base_url(), id);
        let response = self.client.send(Method::Get, &url, &[], None)?;

        if response.is_success() {
            let payload: Payload = serde_json::from_str(&response.body)?;
            return self.client.materialize(Some(&self.record_type.name), payload);
        }

        match self.client.remote_error(&response, Some(&context)) {
            error if error.is_query_too_complicated() => {
                log::warn!("{} too wide for one fetch, reading in slices", context);
                self.find_throttled(id)
            }
            error => Err(error),
        }
    }

    pub fn find_fields_by_id<S: AsRef<str>>(&self, id: &str, fields: &[S]) -> Result<Record> {
        let payload = self.fetch_row(id, fields)?;
        self.client
            .materialize(Some(&self.record_type.name), payload)
    }

    pub fn find_throttled(&self, id: &str) -> Result<Record> {
        let payload = throttle::fetch_in_batches(self, id, self.client.throttle_batch_size())?;
        self.client
            .materialize(Some(&self.record_type.name), payload)
    }

    /// Raw payload of the single row `id = <id>` restricted to `fields`
    pub(crate) fn fetch_row<S: AsRef<str>>(&self, id: &str, fields: &[S]) -> Result<Payload> {
        let spec = self
            .select(fields.iter().map(|f| f.as_ref()))
            .filter(format!("id = {}", crate::logic::quote_literal(id)))
            .limit(1);
        let query = self.client.query(spec);
        let row = query.raw_records()?.first().cloned();
        row.ok_or_else(|| Error::ObjectNotFound {
            context: format!("{}:{}", self.record_type.name, id),
        })
    }

    pub fn count(&self) -> Result<usize> {
        self.client.query(self.spec()).total_size()
    }

    pub fn first(&self) -> Result<Option<Record>> {
        let query = self.client.query(self.spec().limit(1));
        let id = query
            .raw_records()?
            .first()
            .and_then(crate::model::payload_id);
        match id {
            Some(id) => self.find(&id).map(Some),
            None => Ok(None),
        }
    }
}
