//! Page-number pagination for HTML listings and limit/offset pagination for
//! the API.

use rocket::{
    request::{self, FromRequest},
    Request,
};
use sea_orm::{ConnectionTrait, DbErr, EntityTrait, PaginatorTrait, QuerySelect, Select};
use serde::Serialize;

/// Position of one page inside a listing of `count` items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: u64,
    pub num_pages: u64,
    pub offset: u64,
    pub limit: u64,
}

impl PageWindow {
    /// Missing or malformed page numbers select the first page, numbers out
    /// of range clamp to the nearest existing page. An empty listing still
    /// has one (empty) page.
    pub fn new(requested: Option<&str>, count: u64, per_page: u64) -> Self {
        let per_page = per_page.max(1);
        let num_pages = count.div_ceil(per_page).max(1);
        let number = requested
            .and_then(|p| p.trim().parse::<i64>().ok())
            .map_or(1, |n| n.clamp(1, num_pages as i64) as u64);

        Self {
            number,
            num_pages,
            offset: (number - 1) * per_page,
            limit: per_page,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u64,
    pub num_pages: u64,
    pub count: u64,
    pub has_next: bool,
    pub has_previous: bool,
    pub next_page_number: Option<u64>,
    pub previous_page_number: Option<u64>,
}

impl<T> Page<T> {
    pub fn new(window: PageWindow, count: u64, items: Vec<T>) -> Self {
        let has_next = window.number < window.num_pages;
        let has_previous = window.number > 1;
        Self {
            items,
            number: window.number,
            num_pages: window.num_pages,
            count,
            has_next,
            has_previous,
            next_page_number: has_next.then(|| window.number + 1),
            previous_page_number: has_previous.then(|| window.number - 1),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            number: self.number,
            num_pages: self.num_pages,
            count: self.count,
            has_next: self.has_next,
            has_previous: self.has_previous,
            next_page_number: self.next_page_number,
            previous_page_number: self.previous_page_number,
        }
    }
}

/// Runs `query` for the requested page; the query's ordering is kept.
pub async fn paginate<'db, C, E>(
    db: &'db C,
    query: Select<E>,
    requested: Option<&str>,
    per_page: u64,
) -> Result<Page<E::Model>, DbErr>
where
    C: ConnectionTrait,
    E: EntityTrait,
    E::Model: Send + Sync + 'db,
{
    let count = query.clone().count(db).await?;
    let window = PageWindow::new(requested, count, per_page);
    let items = query
        .offset(window.offset)
        .limit(window.limit)
        .all(db)
        .await?;

    Ok(Page::new(window, count, items))
}

/// Query parameters of an API listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub path: String,
    pub has_params: bool,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ListQuery {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, ()> {
        let uri = req.uri();
        request::Outcome::Success(Self {
            path: uri.path().to_string(),
            has_params: uri.query().map_or(false, |q| !q.as_str().is_empty()),
            limit: req.query_value::<u64>("limit").and_then(Result::ok),
            offset: req.query_value::<u64>("offset").and_then(Result::ok),
        })
    }
}

/// Either every item as a bare list (no query parameters were given) or the
/// `{count, next, previous, results}` envelope.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Listing<T> {
    Bare(Vec<T>),
    Paged {
        count: u64,
        next: Option<String>,
        previous: Option<String>,
        results: Vec<T>,
    },
}

/// SQLite binds LIMIT and OFFSET as signed 64-bit integers.
const MAX_BOUND: u64 = i64::MAX as u64;

impl ListQuery {
    /// `(limit, offset)`, both clamped to what the database accepts.
    pub fn window(&self, default_limit: u64) -> (u64, u64) {
        let limit = self
            .limit
            .filter(|l| *l > 0)
            .unwrap_or(default_limit)
            .clamp(1, MAX_BOUND);
        (limit, self.offset.unwrap_or(0).min(MAX_BOUND))
    }

    pub fn envelope<T>(&self, count: u64, limit: u64, offset: u64, results: Vec<T>) -> Listing<T> {
        let end = offset.saturating_add(limit);
        let next = (end < count).then(|| format!("{}?limit={limit}&offset={end}", self.path));
        let previous = match offset {
            0 => None,
            o if o <= limit => Some(format!("{}?limit={limit}", self.path)),
            o => Some(format!("{}?limit={limit}&offset={}", self.path, o - limit)),
        };

        Listing::Paged {
            count,
            next,
            previous,
            results,
        }
    }
}
