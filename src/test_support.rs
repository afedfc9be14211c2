//! Canned transport and fixtures for unit tests.

use crate::error::Result;
use crate::model::{FieldDescriptor, FieldType, SchemaDescription};
use crate::store::{Client, Method, Request, Response, StaticAuth, Transport};
use parking_lot::Mutex;
use std::sync::Arc;

pub const INSTANCE: &str = "https://test.example.com";
pub const BASE: &str = "https://test.example.com/services/data/v58.0";

enum Matcher {
    Exact(Method, String),
    Query(String),
}

impl Matcher {
    fn matches(&self, request: &Request) -> bool {
        match self {
            Matcher::Exact(method, url) => {
                *method == request.method && *url == request.url && request.params.is_empty()
            }
            Matcher::Query(fragment) => {
                request.method == Method::Get
                    && request.url == format!("{BASE}/query")
                    && request
                        .params
                        .iter()
                        .any(|(name, soql)| name == "q" && soql.contains(fragment.as_str()))
            }
        }
    }
}

#[derive(Default)]
struct MockState {
    routes: Vec<(Matcher, Response)>,
    requests: Vec<Request>,
}

/// Records every request and answers from registered routes.
///
/// The first matching route wins, so register specific queries before
/// broader ones. Unmatched requests get a `NOT_FOUND` error body.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expect(&self, method: Method, url: &str, response: Response) {
        self.state
            .lock()
            .routes
            .push((Matcher::Exact(method, url.to_string()), response));
    }

    /// Answer query calls whose SOQL contains `fragment`
    pub fn expect_query(&self, fragment: &str, response: Response) {
        self.state
            .lock()
            .routes
            .push((Matcher::Query(fragment.to_string()), response));
    }

    pub fn requests(&self) -> Vec<Request> {
        self.state.lock().requests.clone()
    }

    pub fn last_request(&self) -> Option<Request> {
        self.state.lock().requests.last().cloned()
    }

    /// Requests with `method` whose URL contains `url_fragment`
    pub fn count(&self, method: Method, url_fragment: &str) -> usize {
        self.state
            .lock()
            .requests
            .iter()
            .filter(|r| r.method == method && r.url.contains(url_fragment))
            .count()
    }
}

impl Transport for MockTransport {
    fn send(&self, request: Request) -> Result<Response> {
        let mut state = self.state.lock();
        let response = state
            .routes
            .iter()
            .find(|(matcher, _)| matcher.matches(&request))
            .map(|(_, response)| response.clone())
            .unwrap_or_else(|| {
                Response::new(
                    404,
                    format!(
                        r#"[{{"errorCode":"NOT_FOUND","message":"no route for {} {}"}}]"#,
                        request.method.as_str(),
                        request.url
                    ),
                )
            });
        state.requests.push(request);
        Ok(response)
    }
}

pub fn account_schema() -> SchemaDescription {
    SchemaDescription::new(
        "Account",
        vec![
            FieldDescriptor::new("Id", FieldType::Id),
            FieldDescriptor::new("Name", FieldType::String).updateable(),
        ],
    )
}

pub fn opportunity_schema() -> SchemaDescription {
    SchemaDescription::new(
        "Opportunity",
        vec![
            FieldDescriptor::new("Id", FieldType::Id),
            FieldDescriptor::new("Name", FieldType::String).updateable(),
            FieldDescriptor::new("Amount", FieldType::Currency).updateable(),
            FieldDescriptor::new("CloseDate", FieldType::Date).updateable(),
            FieldDescriptor::new("StageName", FieldType::Picklist).updateable(),
            FieldDescriptor::new("AccountId", FieldType::Reference)
                .updateable()
                .references("Account"),
            FieldDescriptor::new("IsWon", FieldType::Boolean),
            FieldDescriptor::new("LastModifiedDate", FieldType::Datetime),
        ],
    )
}

/// Client over `mock` with Account, Opportunity and Contact registered and
/// the Account and Opportunity schemas preloaded
pub fn test_client(mock: &MockTransport) -> Client {
    let client = Client::new(mock.clone(), StaticAuth::new(INSTANCE, "58.0", "test-token"));
    client
        .register_type("Account")
        .register_type("Opportunity")
        .register_type("Contact");
    client.schemas().preload(account_schema());
    client.schemas().preload(opportunity_schema());
    client
}
