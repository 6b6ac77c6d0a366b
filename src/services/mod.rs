//! Entity services: one per collection.
//!
//! Each operation validates its input, performs a single read or write
//! against its collection and shapes the result. Authorization decisions
//! take the request [`Principal`](crate::context::Principal) as an argument.

pub mod booking;
pub mod home;
pub mod review;
pub mod user;

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer};

use crate::storage::Storage;

pub use booking::BookingService;
pub use home::HomeService;
pub use review::ReviewService;
pub use user::UserService;

#[derive(Clone)]
pub struct Services {
    pub users: UserService,
    pub homes: HomeService,
    pub bookings: BookingService,
    pub reviews: ReviewService,
}

impl Services {
    pub fn new(storage: Storage, password_cost: u32) -> Self {
        Self {
            users: UserService::new(storage.clone(), password_cost),
            homes: HomeService::new(storage.clone()),
            bookings: BookingService::new(storage.clone()),
            reviews: ReviewService::new(storage),
        }
    }
}

/// Query-string field where an empty value means "not supplied".
pub(crate) fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(de::Error::custom),
    }
}

/// Lowercased needle for case-insensitive substring matching; `None` when blank.
pub(crate) fn needle(txt: Option<&str>) -> Option<String> {
    txt.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

pub(crate) fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

/// Sort direction for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDir {
    Asc,
    #[default]
    Desc,
}

impl SortDir {
    pub fn parse(s: Option<&str>) -> Self {
        match s {
            Some("asc") => SortDir::Asc,
            _ => SortDir::Desc,
        }
    }

    pub fn apply(self, ord: std::cmp::Ordering) -> std::cmp::Ordering {
        match self {
            SortDir::Asc => ord,
            SortDir::Desc => ord.reverse(),
        }
    }
}
