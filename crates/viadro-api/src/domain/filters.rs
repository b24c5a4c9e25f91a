//! Listing query parameters, sort safelist and pagination metadata.

use crate::domain::types::normalize_tags;
use crate::domain::validation::FieldErrors;
use serde::Serialize;
use std::collections::HashMap;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE: u32 = 10_000_000;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Lowercased alphanumeric runs of `text`. Titles and title queries share it.
pub fn title_terms(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
}

/// Sortable columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortField {
    Id,
    Title,
    CreatedAt,
}

/// A safelisted sort column with direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SortKey {
    pub field: SortField,
    pub descending: bool,
}

impl Default for SortKey {
    fn default() -> Self {
        Self {
            field: SortField::Id,
            descending: false,
        }
    }
}

impl SortKey {
    /// Parse `id`, `title`, `created_at`, each optionally prefixed with `-`.
    pub fn parse(raw: &str) -> Option<Self> {
        let (descending, column) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        let field = match column {
            "id" => SortField::Id,
            "title" => SortField::Title,
            "created_at" => SortField::CreatedAt,
            _ => return None,
        };
        Some(Self { field, descending })
    }

    /// Canonical text form; `parse(as_param())` is the identity.
    pub fn as_param(&self) -> String {
        let column = match self.field {
            SortField::Id => "id",
            SortField::Title => "title",
            SortField::CreatedAt => "created_at",
        };
        if self.descending {
            format!("-{}", column)
        } else {
            column.to_string()
        }
    }
}

/// Owner selector of the public listing endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OwnerParam {
    #[default]
    All,
    Me,
    NotMe,
}

/// Normalized listing query. Title is lower-cased and whitespace-collapsed,
/// tags are a sorted set, so equal queries compare equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingQuery {
    pub title: String,
    pub tags: Vec<String>,
    pub page: u32,
    pub page_size: u32,
    pub sort: SortKey,
}

impl Default for ListingQuery {
    fn default() -> Self {
        Self {
            title: String::new(),
            tags: Vec::new(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            sort: SortKey::default(),
        }
    }
}

impl ListingQuery {
    /// Parse raw query-string parameters. Unknown parameters are ignored.
    pub fn from_params(params: &HashMap<String, String>) -> Result<(Self, OwnerParam), FieldErrors> {
        let mut errors = FieldErrors::new();
        let mut query = ListingQuery::default();

        if let Some(title) = params.get("title") {
            query.title = title_terms(title).collect::<Vec<_>>().join(" ");
        }
        if let Some(tags) = params.get("tags") {
            query.tags = normalize_tags(tags.split(','));
        }
        if let Some(page) = params.get("page") {
            match page.parse::<u32>() {
                Ok(n) if (1..=MAX_PAGE).contains(&n) => query.page = n,
                Ok(0) => errors.add("page", "must be greater than zero"),
                Ok(_) => errors.add("page", "must be a maximum of 10 million"),
                Err(_) => errors.add("page", "must be an integer value"),
            }
        }
        if let Some(size) = params.get("page_size") {
            match size.parse::<u32>() {
                Ok(n) if (1..=MAX_PAGE_SIZE).contains(&n) => query.page_size = n,
                Ok(0) => errors.add("page_size", "must be greater than zero"),
                Ok(_) => errors.add("page_size", "must be a maximum of 100"),
                Err(_) => errors.add("page_size", "must be an integer value"),
            }
        }
        if let Some(sort) = params.get("sort") {
            match SortKey::parse(sort) {
                Some(key) => query.sort = key,
                None => errors.add("sort", "invalid sort value"),
            }
        }
        let owner = match params.get("owner").map(String::as_str) {
            None | Some("all") | Some("") => OwnerParam::All,
            Some("me") => OwnerParam::Me,
            Some("-me") => OwnerParam::NotMe,
            Some(_) => {
                errors.add("owner", "must be one of all, me, -me");
                OwnerParam::All
            }
        };

        errors.into_result().map(|()| (query, owner))
    }

    /// Zero-based offset of the first row of the page.
    pub fn offset(&self) -> usize {
        (self.page as usize - 1) * self.page_size as usize
    }

    /// Words every matching title must contain.
    pub fn title_words(&self) -> impl Iterator<Item = String> + '_ {
        title_terms(&self.title)
    }
}

/// Pagination metadata. All fields zero when there are no records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Metadata {
    #[serde(skip_serializing_if = "is_zero")]
    pub current_page: u32,
    #[serde(skip_serializing_if = "is_zero")]
    pub page_size: u32,
    #[serde(skip_serializing_if = "is_zero")]
    pub first_page: u32,
    #[serde(skip_serializing_if = "is_zero")]
    pub last_page: u32,
    #[serde(skip_serializing_if = "is_zero_u64")]
    pub total_records: u64,
    pub cache_epoch: u64,
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

fn is_zero_u64(n: &u64) -> bool {
    *n == 0
}

impl Metadata {
    pub fn calculate(total_records: u64, page: u32, page_size: u32) -> Self {
        if total_records == 0 || page_size == 0 {
            return Self::default();
        }
        let last_page = total_records.div_ceil(page_size as u64);
        Self {
            current_page: page,
            page_size,
            first_page: 1,
            last_page: u32::try_from(last_page).unwrap_or(u32::MAX),
            total_records,
            cache_epoch: 0,
        }
    }

    pub fn with_epoch(mut self, epoch: u64) -> Self {
        self.cache_epoch = epoch;
        self
    }
}
