use crate::error::Result;
use crate::model::{Payload, QueryPage, Record};
use crate::store::{Client, Method};
use itertools::Itertools;
use std::cell::OnceCell;
use std::fmt;

/// Quote a value as a query string literal
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// What to ask the server for: type, fields, filter and limit.
///
/// Fields are lowercased and de-duplicated, and always start with `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    type_name: String,
    fields: Vec<String>,
    conditions: Vec<String>,
    limit: Option<usize>,
}

impl QuerySpec {
    pub fn new(type_name: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            fields: vec!["id".to_string()],
            conditions: Vec::new(),
            limit: None,
        }
    }

    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let requested = fields.into_iter().map(|f| f.as_ref().to_lowercase());
        self.fields = std::iter::once("id".to_string())
            .chain(self.fields.drain(..))
            .chain(requested)
            .unique()
            .collect();
        self
    }

    /// Add a WHERE fragment; fragments are joined with AND
    pub fn filter(mut self, condition: impl Into<String>) -> Self {
        self.conditions.push(condition.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn conditions(&self) -> &[String] {
        &self.conditions
    }

    pub fn row_limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn to_soql(&self) -> String {
        let mut soql = format!("SELECT {} FROM {}", self.fields.join(", "), self.type_name);
        if !self.conditions.is_empty() {
            soql.push_str(" WHERE ");
            soql.push_str(&self.conditions.join(" AND "));
        }
        if let Some(limit) = self.limit {
            soql.push_str(&format!(" LIMIT {}", limit));
        }
        soql
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    /// Nothing fetched yet
    Fresh,
    /// Page cached and the server has more
    PageLoaded,
    /// Page cached and it was the last one
    Exhausted,
}

/// One page of a server query plus the way to the next.
///
/// The page is fetched on first access and cached for the life of the
/// value. A continuation fetches its page URL verbatim but keeps its `QuerySpec` so
/// it can build its own successor; each query builds at most one successor.
pub struct Query<'c> {
    client: &'c Client,
    spec: QuerySpec,
    page_url: Option<String>,
    page: OnceCell<QueryPage>,
    successor: OnceCell<Box<Query<'c>>>,
}

impl fmt::Debug for Query<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("spec", &self.spec)
            .field("page_url", &self.page_url)
            .field("state", &self.state())
            .finish()
    }
}

impl<'c> Query<'c> {
    pub fn new(client: &'c Client, spec: QuerySpec) -> Self {
        Self {
            client,
            spec,
            page_url: None,
            page: OnceCell::new(),
            successor: OnceCell::new(),
        }
    }

    pub fn continuation(client: &'c Client, spec: QuerySpec, page_url: String) -> Self {
        Self {
            page_url: Some(page_url),
            ..Self::new(client, spec)
        }
    }

    pub fn spec(&self) -> &QuerySpec {
        &self.spec
    }

    pub fn page_url(&self) -> Option<&str> {
        self.page_url.as_deref()
    }

    pub fn is_continuation(&self) -> bool {
        self.page_url.is_some()
    }

    pub fn state(&self) -> PageState {
        match self.page.get() {
            None => PageState::Fresh,
            Some(page) if page.done || page.next_records_url.is_none() => PageState::Exhausted,
            Some(_) => PageState::PageLoaded,
        }
    }

    fn fetch_page(&self) -> Result<QueryPage> {
        let response = match &self.page_url {
            Some(url) => {
                self.client
                    .send(Method::Get, &self.client.absolute_url(url), &[], None)?
            }
            None => {
                let soql = self.spec.to_soql();
                let url = format!("{}/query", self.client.base_url());
                self.client
                    .send(Method::Get, &url, &[("q", soql.as_str())], None)?
            }
        };
        if !response.is_success() {
            return Err(self
                .client
                .remote_error(&response, Some(&self.spec.type_name)));
        }
        Ok(serde_json::from_str(&response.body)?)
    }

    /// Cached page, fetched on first call
    pub fn page(&self) -> Result<&QueryPage> {
        if let Some(page) = self.page.get() {
            return Ok(page);
        }
        let page = self.fetch_page()?;
        Ok(self.page.get_or_init(|| page))
    }

    pub fn raw_records(&self) -> Result<&[Payload]> {
        Ok(&self.page()?.records)
    }

    /// Server-reported size of the whole result, across pages
    pub fn total_size(&self) -> Result<usize> {
        Ok(self.page()?.total_size)
    }

    /// Records of this page only
    pub fn page_records(&self) -> Result<Vec<Record>> {
        self.raw_records()?
            .iter()
            .map(|raw| self.materialize(raw))
            .collect()
    }

    fn materialize(&self, raw: &Payload) -> Result<Record> {
        self.client
            .materialize(Some(&self.spec.type_name), raw.clone())
    }

    /// Successor query for the next page, or `None` once the server is done
    pub fn next_page(&self) -> Result<Option<&Query<'c>>> {
        let page = self.page()?;
        if page.done {
            return Ok(None);
        }
        let Some(url) = page.next_records_url.as_ref() else {
            log::warn!(
                "{} page reports more records but no next URL; stopping",
                self.spec.type_name
            );
            return Ok(None);
        };
        let successor = self.successor.get_or_init(|| {
            Box::new(Query::continuation(self.client, self.spec.clone(), url.clone()))
        });
        Ok(Some(successor))
    }

    pub fn iter(&self) -> QueryIter<'_, 'c> {
        QueryIter {
            current: Some(self),
            index: 0,
            yielded: 0,
            limit: self.spec.limit,
        }
    }
}

impl<'q, 'c> IntoIterator for &'q Query<'c> {
    type Item = Result<Record>;
    type IntoIter = QueryIter<'q, 'c>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Lazy walk over every page of a query, in server order.
///
/// Pages are fetched on demand; a page's records are all yielded before the
/// next page is requested. An error ends the walk.
pub struct QueryIter<'q, 'c> {
    current: Option<&'q Query<'c>>,
    index: usize,
    yielded: usize,
    limit: Option<usize>,
}

impl<'q, 'c> Iterator for QueryIter<'q, 'c> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.limit.is_some_and(|limit| self.yielded >= limit) {
            return None;
        }
        loop {
            let query = self.current?;
            let page = match query.page() {
                Ok(page) => page,
                Err(e) => {
                    self.current = None;
                    return Some(Err(e));
                }
            };

            if let Some(raw) = page.records.get(self.index) {
                self.index += 1;
                self.yielded += 1;
                return Some(query.materialize(raw));
            }

            match query.next_page() {
                Ok(next) => {
                    self.current = next;
                    self.index = 0;
                }
                Err(e) => {
                    self.current = None;
                    return Some(Err(e));
                }
            }
        }
    }
}
