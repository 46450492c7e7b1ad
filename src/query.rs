use serde::Deserialize;
use std::cmp::Ordering;
use utoipa::IntoParams;

use crate::models::WalkDetail;

/// Default page size when the caller does not ask for one.
pub const DEFAULT_PAGE_SIZE: i64 = 1000;

/// WalkListParams
///
/// The accepted query parameters for the walk listing endpoint
/// (GET /api/walks). Bound by Axum's Query extractor; every parameter is
/// optional and no value here can cause a 4xx. Unrecognized `filter_on` /
/// `sort_by` values degrade silently to "no filter" / "no sort".
#[derive(Debug, Clone, Deserialize, IntoParams, Default)]
#[serde(rename_all = "camelCase")]
pub struct WalkListParams {
    /// Field to filter on. Only "Name" (case-insensitive) is recognized.
    pub filter_on: Option<String>,
    /// Substring to match. Applied only when `filter_on` is recognized and
    /// this is non-blank.
    pub filter_query: Option<String>,
    /// Field to sort by. "Name" and "Length" (case-insensitive) recognized.
    pub sort_by: Option<String>,
    /// Sort direction; defaults to ascending.
    pub is_ascending: Option<bool>,
    /// 1-based page number; defaults to 1. Values below 1 are not rejected.
    pub page_number: Option<i64>,
    /// Page size; defaults to 1000. No upper bound is enforced here.
    pub page_size: Option<i64>,
}

/// Sortable walk fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkSortField {
    Name,
    Length,
}

/// A recognized sort request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkSort {
    pub field: WalkSortField,
    pub ascending: bool,
}

/// WalkQuery
///
/// The normalized plan for one listing request: filter -> sort -> paginate.
/// Both backends consume this same plan (the Postgres repository renders it
/// to SQL, the in-memory mock applies it with `apply`), so the recognition
/// and degradation rules live in exactly one place.
///
/// Substring matching is case-insensitive, matching the recognition policy
/// already used for the field names themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct WalkQuery {
    /// Case-insensitive substring the walk name must contain, if any.
    pub name_contains: Option<String>,
    /// Recognized sort request, if any. Absent means store-native order.
    pub sort: Option<WalkSort>,
    /// Items to skip: (pageNumber - 1) * pageSize, floored at zero.
    pub offset: i64,
    /// Items to take.
    pub limit: i64,
}

impl WalkQuery {
    /// Normalizes raw query parameters into a plan. Never fails: unrecognized
    /// field selectors are dropped, missing values take their defaults.
    pub fn from_params(params: &WalkListParams) -> Self {
        let name_contains = match (&params.filter_on, &params.filter_query) {
            (Some(field), Some(query))
                if field.eq_ignore_ascii_case("name") && !query.trim().is_empty() =>
            {
                Some(query.clone())
            }
            _ => None,
        };

        let ascending = params.is_ascending.unwrap_or(true);
        let sort = params.sort_by.as_deref().and_then(|field| {
            if field.eq_ignore_ascii_case("name") {
                Some(WalkSort {
                    field: WalkSortField::Name,
                    ascending,
                })
            } else if field.eq_ignore_ascii_case("length") {
                Some(WalkSort {
                    field: WalkSortField::Length,
                    ascending,
                })
            } else {
                None
            }
        });

        let page_number = params.page_number.unwrap_or(1);
        let page_size = params.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        // pageNumber < 1 is the caller's problem per the contract; flooring the
        // offset keeps the store from seeing a negative OFFSET.
        let offset = (page_number - 1).max(0).saturating_mul(page_size.max(0));

        Self {
            name_contains,
            sort,
            offset,
            limit: page_size.max(0),
        }
    }

    /// The filter substring with SQL LIKE metacharacters escaped, ready to be
    /// wrapped in `%...%` and bound to an ILIKE. Returns None when no filter
    /// applies.
    pub fn like_pattern(&self) -> Option<String> {
        self.name_contains.as_ref().map(|q| {
            let escaped = q
                .replace('\\', "\\\\")
                .replace('%', "\\%")
                .replace('_', "\\_");
            format!("%{}%", escaped)
        })
    }

    /// Applies the plan to an in-memory snapshot. This is the reference
    /// semantics for the pipeline: filter, then a stable sort (ties keep
    /// store-native relative order), then skip/take.
    pub fn apply(&self, mut walks: Vec<WalkDetail>) -> Vec<WalkDetail> {
        if let Some(q) = &self.name_contains {
            let needle = q.to_lowercase();
            walks.retain(|w| w.name.to_lowercase().contains(&needle));
        }

        if let Some(sort) = self.sort {
            walks.sort_by(|a, b| {
                let ord = match sort.field {
                    WalkSortField::Name => a.name.cmp(&b.name),
                    WalkSortField::Length => a
                        .length_in_km
                        .partial_cmp(&b.length_in_km)
                        .unwrap_or(Ordering::Equal),
                };
                if sort.ascending { ord } else { ord.reverse() }
            });
        }

        walks
            .into_iter()
            .skip(self.offset.max(0) as usize)
            .take(self.limit.max(0) as usize)
            .collect()
    }
}
