use serde::{Deserialize, Serialize};

use crate::id::ObjectId;

/// Stored user record. Never serialized to callers; see [`UserView`].
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub username: String,
    pub password_hash: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img_url: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub favorites: Vec<String>,
    #[serde(default, rename = "searching_history")]
    pub searching_history: Vec<serde_json::Value>,
}

/// Public projection of a user: everything but the password hash.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img_url: Option<String>,
    pub is_admin: bool,
    pub favorites: Vec<String>,
    #[serde(rename = "searching_history")]
    pub searching_history: Vec<serde_json::Value>,
    pub created_at: i64,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            img_url: user.img_url.clone(),
            is_admin: user.is_admin,
            favorites: user.favorites.clone(),
            searching_history: user.searching_history.clone(),
            created_at: user.id.timestamp_millis(),
        }
    }
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        UserView::from(&user)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Location {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "countryCode")]
    pub country_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MsgAuthor {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub username: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HomeMsg {
    pub id: ObjectId,
    pub txt: String,
    pub by: MsgAuthor,
    pub created_at: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Home {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    #[serde(rename = "host_id")]
    pub host_id: ObjectId,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub capacity: u32,
    pub rooms: u32,
    pub beds: u32,
    pub bathrooms: u32,
    #[serde(rename = "type")]
    pub home_type: String,
    pub img_urls: Vec<String>,
    pub rating: f64,
    pub number_of_raters: u32,
    pub added_to_wishlist: u32,
    pub guest_favorite: bool,
    pub location: Location,
    pub amenities: Vec<String>,
    pub highlights: serde_json::Value,
    pub msgs: Vec<HomeMsg>,
    pub unavailable_dates: Vec<String>,
    pub last_search_value: String,
    pub created_at: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BookingStatus {
    #[default]
    Pending,
    Paid,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 4] = [
        BookingStatus::Pending,
        BookingStatus::Paid,
        BookingStatus::Cancelled,
        BookingStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "Pending",
            BookingStatus::Paid => "Paid",
            BookingStatus::Cancelled => "Cancelled",
            BookingStatus::Completed => "Completed",
        }
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BookingStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("bad status: {s}"))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    #[serde(rename = "home_id")]
    pub home_id: ObjectId,
    #[serde(rename = "guest_id")]
    pub guest_id: ObjectId,
    #[serde(rename = "host_id")]
    pub host_id: ObjectId,
    pub check_in: String,
    pub check_out: String,
    pub check_in_at: i64,
    pub check_out_at: i64,
    pub price_per_night: f64,
    pub discount: f64,
    pub tax: f64,
    pub total_price: f64,
    pub status: BookingStatus,
    pub created_at: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    #[serde(rename = "home_id")]
    pub home_id: ObjectId,
    #[serde(rename = "user_id")]
    pub user_id: ObjectId,
    pub rating: f64,
    pub comment: String,
    pub created_at: i64,
}

/// JWT claims for a logged-in user.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AuthPayload {
    pub sub: String, // user id
    pub username: String,
    #[serde(default)]
    pub is_admin: bool,
    pub exp: usize,
}

/// Offset page of results.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub limit: usize,
    pub total: usize,
    pub pages: usize,
}

impl<T> Page<T> {
    pub const DEFAULT_LIMIT: usize = 20;
    pub const MAX_LIMIT: usize = 100;

    /// Slices `all` for a 1-based page; page and limit are clamped first.
    pub fn paginate(all: Vec<T>, page: Option<usize>, limit: Option<usize>) -> Self {
        let page = page.unwrap_or(1).max(1);
        let limit = limit.unwrap_or(Self::DEFAULT_LIMIT).clamp(1, Self::MAX_LIMIT);
        let total = all.len();
        let items = all.into_iter().skip((page - 1).saturating_mul(limit)).take(limit).collect();
        Self {
            items,
            page,
            limit,
            total,
            pages: total.div_ceil(limit),
        }
    }

    /// Everything on a single page.
    pub fn whole(all: Vec<T>) -> Self {
        let total = all.len();
        Self {
            items: all,
            page: 1,
            limit: total,
            total,
            pages: 1,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            limit: self.limit,
            total: self.total,
            pages: self.pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paginate_clamps_and_counts_pages() {
        let page = Page::paginate((0..45).collect::<Vec<_>>(), Some(3), Some(20));
        assert_eq!(page.items, (40..45).collect::<Vec<_>>());
        assert_eq!(page.total, 45);
        assert_eq!(page.pages, 3);

        let clamped = Page::paginate((0..5).collect::<Vec<_>>(), Some(0), Some(1000));
        assert_eq!(clamped.page, 1);
        assert_eq!(clamped.limit, 100);
        assert_eq!(clamped.items.len(), 5);

        let far = Page::paginate((0..5).collect::<Vec<_>>(), Some(usize::MAX), Some(100));
        assert!(far.items.is_empty());
        assert_eq!((far.page, far.total, far.pages), (usize::MAX, 5, 1));
    }

    #[test]
    fn whole_page_reports_total_as_limit() {
        let page = Page::whole(vec!["a", "b"]);
        assert_eq!((page.page, page.limit, page.total, page.pages), (1, 2, 2, 1));
    }

    #[test]
    fn user_view_has_no_password_hash() {
        let user = User {
            id: ObjectId::new(),
            username: "muki".into(),
            password_hash: "$2b$secret".into(),
            first_name: "Muki".into(),
            last_name: "Ja".into(),
            email: "muki@example.com".into(),
            phone: "0501234567".into(),
            img_url: None,
            is_admin: false,
            favorites: vec![],
            searching_history: vec![],
        };
        let json = serde_json::to_value(UserView::from(&user)).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["username"], "muki");
        assert_eq!(json["_id"], user.id.to_string());
    }

    #[test]
    fn booking_status_parses_only_known_values() {
        assert_eq!("Paid".parse::<BookingStatus>().unwrap(), BookingStatus::Paid);
        assert!("paid".parse::<BookingStatus>().is_err());
        assert!("Refunded".parse::<BookingStatus>().is_err());
    }
}
