//! Client-side state for paged, filterable, sortable lists.
//!
//! [`PagedList`] keeps the current [`ListQuery`] and asks an
//! [`ItemSource`] for a page whenever the query changes. Changing the
//! filter, status or sort field starts over at page 1; changing the page
//! keeps everything else.

use std::future::Future;

use serde::Serialize;
use serde_json::Value;

use crate::error::{DomainError, DomainResult, Result};
use crate::schema::{self, FieldSpec, FieldType, Schema};

pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Status value meaning "do not filter by status".
pub const ALL_STATUSES: &str = "all";

/// Options passed to every page request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub filter: String,
    pub status: String,
    pub sort: String,
    pub page: u32,
    pub page_size: u32,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            filter: String::new(),
            status: ALL_STATUSES.to_string(),
            sort: String::new(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ListQuery {
    pub fn with_page_size(page_size: u32) -> Self {
        Self {
            page_size,
            ..Self::default()
        }
    }

    /// True when the filter text or the status narrows the result.
    pub fn narrows(&self) -> bool {
        !self.filter.trim().is_empty() || self.status != ALL_STATUSES
    }

    /// Query-string pairs understood by the server.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("filter", self.filter.clone()),
            ("status", self.status.clone()),
            ("sort", self.sort.clone()),
            ("page", self.page.to_string()),
            ("limit", self.page_size.to_string()),
        ]
    }
}

/// One page of results as returned by the server.
#[derive(Debug, Clone, PartialEq)]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub limit: u32,
    pub offset: u64,
    pub total: u64,
    pub max_pages: u32,
}

impl<T> PagedResult<T> {
    pub fn schema() -> Schema {
        Schema::new("pagedResult")
            .field(FieldSpec::required("items", FieldType::array_of(FieldType::Object)))
            .field(FieldSpec::required("page", FieldType::Integer))
            .field(FieldSpec::required("limit", FieldType::Integer))
            .field(FieldSpec::required("offset", FieldType::Integer))
            .field(FieldSpec::required("total", FieldType::Integer))
            .field(FieldSpec::required("maxPages", FieldType::Integer))
    }

    /// Validates the page envelope, then converts every item with `item`.
    pub fn from_json<F>(value: &Value, item: F) -> DomainResult<Self>
    where
        F: FnMut(&Value) -> DomainResult<T>,
    {
        schema::validate(&Self::schema(), &[], value).into_result()?;

        let number = |name: &str| -> DomainResult<u64> {
            value[name].as_u64().ok_or_else(|| DomainError::InvalidValue {
                field: name.to_string(),
                reason: "expected a non-negative integer".into(),
            })
        };
        let small = |name: &str| -> DomainResult<u32> {
            u32::try_from(number(name)?).map_err(|e| DomainError::InvalidValue {
                field: name.to_string(),
                reason: e.to_string(),
            })
        };

        let items = value["items"]
            .as_array()
            .map(|items| items.iter().map(item).collect::<DomainResult<Vec<_>>>())
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            items,
            page: small("page")?,
            limit: small("limit")?,
            offset: number("offset")?,
            total: number("total")?,
            max_pages: small("maxPages")?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// What a list view should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayState {
    /// The underlying collection is empty.
    NoEntities,
    /// The filter or status excludes everything.
    NoResults,
    HaveResults,
}

impl DisplayState {
    fn of<T>(query: &ListQuery, result: &PagedResult<T>) -> Self {
        if !result.is_empty() {
            Self::HaveResults
        } else if query.narrows() {
            Self::NoResults
        } else {
            Self::NoEntities
        }
    }
}

/// Supplies pages for a [`PagedList`].
pub trait ItemSource {
    type Item;

    fn get_items(&self, query: &ListQuery) -> impl Future<Output = Result<PagedResult<Self::Item>>>;
}

/// A list view's filter, sort and paging state.
pub struct PagedList<S: ItemSource> {
    source: S,
    query: ListQuery,
    result: Option<PagedResult<S::Item>>,
    display_state: Option<DisplayState>,
}

impl<S: ItemSource> PagedList<S> {
    pub fn new(source: S, query: ListQuery) -> Self {
        Self {
            source,
            query,
            result: None,
            display_state: None,
        }
    }

    pub fn query(&self) -> &ListQuery {
        &self.query
    }

    pub fn result(&self) -> Option<&PagedResult<S::Item>> {
        self.result.as_ref()
    }

    pub fn items(&self) -> &[S::Item] {
        self.result.as_ref().map_or(&[], |r| r.items.as_slice())
    }

    /// `None` until the first page has loaded.
    pub fn display_state(&self) -> Option<DisplayState> {
        self.display_state
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Requests the current page again.
    pub async fn reload(&mut self) -> Result<DisplayState> {
        tracing::debug!(query = ?self.query, "loading page");
        let result = self.source.get_items(&self.query).await?;
        let state = DisplayState::of(&self.query, &result);
        self.result = Some(result);
        self.display_state = Some(state);
        Ok(state)
    }

    async fn reload_if(&mut self, changed: bool) -> Result<DisplayState> {
        match self.display_state {
            Some(state) if !changed => Ok(state),
            _ => self.reload().await,
        }
    }

    pub async fn set_filter(&mut self, filter: impl Into<String>) -> Result<DisplayState> {
        let filter = filter.into();
        let changed = filter != self.query.filter;
        if changed {
            self.query.filter = filter;
            self.query.page = 1;
        }
        self.reload_if(changed).await
    }

    pub async fn set_status(&mut self, status: impl Into<String>) -> Result<DisplayState> {
        let status = status.into();
        let changed = status != self.query.status;
        if changed {
            self.query.status = status;
            self.query.page = 1;
        }
        self.reload_if(changed).await
    }

    pub async fn set_sort(&mut self, sort: impl Into<String>) -> Result<DisplayState> {
        let sort = sort.into();
        let changed = sort != self.query.sort;
        if changed {
            self.query.sort = sort;
            self.query.page = 1;
        }
        self.reload_if(changed).await
    }

    pub async fn set_page(&mut self, page: u32) -> Result<DisplayState> {
        let page = page.max(1);
        let changed = page != self.query.page;
        self.query.page = page;
        self.reload_if(changed).await
    }
}
