//! Bookings: pricing on write, overlap search on read.

use std::cmp::Ordering;

use serde::Deserialize;

use crate::context::Principal;
use crate::error::{AppError, AppResult};
use crate::id::ObjectId;
use crate::models::{Booking, BookingStatus, Home, Page};
use crate::pricing::{self, PriceInput};
use crate::storage::{Collection, Storage, BOOKINGS, HOMES};

use super::{empty_as_none, SortDir};

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct BookingFilter {
    pub home_id: Option<String>,
    pub host_id: Option<String>,
    pub guest_id: Option<String>,
    pub status: Option<String>,
    pub check_in: Option<String>,
    pub check_out: Option<String>,
    pub sort_by: Option<String>,
    pub sort_dir: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub page: Option<usize>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BookingClause {
    Home(ObjectId),
    Host(ObjectId),
    Guest(ObjectId),
    Status(BookingStatus),
    /// Half-open intersection with `[check_in_at, check_out_at)`.
    Overlap { check_in_at: i64, check_out_at: i64 },
}

impl BookingClause {
    pub fn matches(&self, b: &Booking) -> bool {
        match *self {
            BookingClause::Home(id) => b.home_id == id,
            BookingClause::Host(id) => b.host_id == id,
            BookingClause::Guest(id) => b.guest_id == id,
            BookingClause::Status(status) => b.status == status,
            BookingClause::Overlap { check_in_at, check_out_at } => {
                b.check_in_at < check_out_at && b.check_out_at > check_in_at
            }
        }
    }
}

fn supplied(s: &Option<String>) -> Option<&str> {
    s.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn parse_status(s: &str) -> AppResult<BookingStatus> {
    s.parse().map_err(AppError::Validation)
}

fn parse_ref(value: &str, field: &str) -> AppResult<ObjectId> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::validation(format!("bad {field}")))
}

impl BookingFilter {
    /// Id and status filters must be well formed. A date pair that is
    /// missing, unparseable or not chronological adds no overlap clause.
    pub fn clauses(&self) -> AppResult<Vec<BookingClause>> {
        let mut clauses = Vec::new();
        if let Some(id) = supplied(&self.home_id) {
            clauses.push(BookingClause::Home(id.parse()?));
        }
        if let Some(id) = supplied(&self.host_id) {
            clauses.push(BookingClause::Host(id.parse()?));
        }
        if let Some(id) = supplied(&self.guest_id) {
            clauses.push(BookingClause::Guest(id.parse()?));
        }
        if let Some(status) = supplied(&self.status) {
            clauses.push(BookingClause::Status(parse_status(status)?));
        }

        let check_in = supplied(&self.check_in).and_then(pricing::parse_date);
        let check_out = supplied(&self.check_out).and_then(pricing::parse_date);
        if let (Some(check_in_at), Some(check_out_at)) = (check_in, check_out) {
            if check_out_at > check_in_at {
                clauses.push(BookingClause::Overlap { check_in_at, check_out_at });
            }
        }
        Ok(clauses)
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewBooking {
    #[serde(default, rename = "home_id")]
    pub home_id: String,
    /// Defaults to the caller. Booking for someone else is admin-only.
    #[serde(default, rename = "guest_id")]
    pub guest_id: Option<String>,
    /// Must match the home's host; defaults to it when blank.
    #[serde(default, rename = "host_id")]
    pub host_id: String,
    #[serde(default)]
    pub check_in: String,
    #[serde(default)]
    pub check_out: String,
    pub price_per_night: f64,
    pub discount: Option<f64>,
    pub tax: Option<f64>,
    pub total_price: Option<f64>,
    pub status: Option<String>,
}

/// Fields a guest or host may change. Home, guest and host links are fixed.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct BookingUpdate {
    pub check_in: Option<String>,
    pub check_out: Option<String>,
    pub price_per_night: Option<f64>,
    pub discount: Option<f64>,
    pub tax: Option<f64>,
    pub total_price: Option<f64>,
    pub status: Option<String>,
}

#[derive(Clone)]
pub struct BookingService {
    storage: Storage,
}

impl BookingService {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    async fn collection(&self) -> AppResult<Collection> {
        self.storage.collection(BOOKINGS).await
    }

    pub async fn query(&self, filter: &BookingFilter) -> AppResult<Page<Booking>> {
        let clauses = filter.clauses()?;
        let mut bookings: Vec<Booking> = self
            .collection()
            .await?
            .find(|b: &Booking| clauses.iter().all(|c| c.matches(b)))?;

        let dir = SortDir::parse(filter.sort_dir.as_deref());
        let by_check_in = filter.sort_by.as_deref() == Some("checkIn");
        bookings.sort_by(|a, b| {
            let primary = if by_check_in {
                a.check_in_at.cmp(&b.check_in_at)
            } else {
                a.created_at.cmp(&b.created_at)
            };
            match dir.apply(primary) {
                Ordering::Equal => b.id.cmp(&a.id),
                ord => ord,
            }
        });

        if filter.page.is_none() && filter.limit.is_none() {
            return Ok(Page::whole(bookings));
        }
        Ok(Page::paginate(bookings, filter.page, filter.limit))
    }

    pub async fn get_by_id(&self, id: ObjectId) -> AppResult<Option<Booking>> {
        self.collection().await?.get(&id)
    }

    pub async fn add(&self, principal: &Principal, new: NewBooking) -> AppResult<Booking> {
        let home_id = parse_ref(&new.home_id, "home_id")?;
        let home: Home = self
            .storage
            .collection(HOMES)
            .await?
            .get(&home_id)?
            .ok_or_else(|| AppError::not_found("home"))?;
        let host_id = match new.host_id.trim() {
            "" => home.host_id,
            raw => parse_ref(raw, "host_id")?,
        };
        if host_id != home.host_id {
            return Err(AppError::validation("host_id does not match home"));
        }
        let guest_id = match supplied(&new.guest_id) {
            Some(raw) => parse_ref(raw, "guest_id")?,
            None => principal.id(),
        };
        principal.require_owner(guest_id, "cannot book for another guest")?;

        let quote = pricing::quote(&PriceInput {
            check_in: &new.check_in,
            check_out: &new.check_out,
            price_per_night: new.price_per_night,
            discount: new.discount,
            tax: new.tax,
            total_price: new.total_price,
        })?;
        let status = match supplied(&new.status) {
            Some(s) => parse_status(s)?,
            None => BookingStatus::default(),
        };

        let id = ObjectId::new();
        let booking = Booking {
            id,
            home_id,
            guest_id,
            host_id,
            check_in: new.check_in.trim().to_string(),
            check_out: new.check_out.trim().to_string(),
            check_in_at: quote.check_in_at,
            check_out_at: quote.check_out_at,
            price_per_night: new.price_per_night,
            discount: new.discount.unwrap_or(0.0),
            tax: new.tax.unwrap_or(0.0),
            total_price: quote.total_price,
            status,
            created_at: id.timestamp_millis(),
        };

        self.collection().await?.insert(&booking.id, &booking)?;
        tracing::info!(
            booking_id = %booking.id,
            home_id = %booking.home_id,
            nights = quote.nights,
            total = booking.total_price,
            "booking added"
        );
        Ok(booking)
    }

    /// Overlays `patch` on the stored booking. The total is recomputed only
    /// when a pricing field changes; an explicit `totalPrice` always wins.
    pub async fn update(
        &self,
        principal: &Principal,
        id: ObjectId,
        patch: BookingUpdate,
    ) -> AppResult<Option<Booking>> {
        let col = self.collection().await?;
        let Some(stored) = col.get::<Booking>(&id)? else {
            return Ok(None);
        };
        require_party(principal, &stored)?;

        let reprices = patch.check_in.is_some()
            || patch.check_out.is_some()
            || patch.price_per_night.is_some()
            || patch.discount.is_some()
            || patch.tax.is_some();
        let total_price = match patch.total_price {
            Some(total) => Some(total),
            None if reprices => None,
            None => Some(stored.total_price),
        };

        let check_in = patch.check_in.unwrap_or(stored.check_in);
        let check_out = patch.check_out.unwrap_or(stored.check_out);
        let price_per_night = patch.price_per_night.unwrap_or(stored.price_per_night);
        let discount = patch.discount.unwrap_or(stored.discount);
        let tax = patch.tax.unwrap_or(stored.tax);
        let status = match supplied(&patch.status) {
            Some(s) => parse_status(s)?,
            None => stored.status,
        };

        let quote = pricing::quote(&PriceInput {
            check_in: &check_in,
            check_out: &check_out,
            price_per_night,
            discount: Some(discount),
            tax: Some(tax),
            total_price,
        })?;

        let booking = Booking {
            check_in: check_in.trim().to_string(),
            check_out: check_out.trim().to_string(),
            check_in_at: quote.check_in_at,
            check_out_at: quote.check_out_at,
            price_per_night,
            discount,
            tax,
            total_price: quote.total_price,
            status,
            ..stored
        };

        if !col.replace(&id, &booking)? {
            return Ok(None);
        }
        Ok(Some(booking))
    }

    pub async fn remove(&self, principal: &Principal, id: ObjectId) -> AppResult<()> {
        let col = self.collection().await?;
        let booking: Booking = col.get(&id)?.ok_or_else(|| AppError::not_found("booking"))?;
        require_party(principal, &booking)?;

        col.remove(&id)?;
        tracing::info!(booking_id = %id, by = %principal.id(), "booking removed");
        Ok(())
    }
}

/// Guest, host or admin.
fn require_party(principal: &Principal, booking: &Booking) -> AppResult<()> {
    if principal.id() == booking.guest_id || principal.can_act_for(booking.host_id) {
        Ok(())
    } else {
        Err(AppError::forbidden("Not your booking"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::home::{HomeService, NewHome};

    const DAY: i64 = pricing::DAY_MS;

    fn stored(check_in_day: i64, check_out_day: i64) -> Booking {
        let id = ObjectId::new();
        Booking {
            id,
            home_id: ObjectId::new(),
            guest_id: ObjectId::new(),
            host_id: ObjectId::new(),
            check_in: String::new(),
            check_out: String::new(),
            check_in_at: check_in_day * DAY,
            check_out_at: check_out_day * DAY,
            price_per_night: 100.0,
            discount: 0.0,
            tax: 0.0,
            total_price: 0.0,
            status: BookingStatus::Pending,
            created_at: id.timestamp_millis(),
        }
    }

    fn overlap(from_day: i64, to_day: i64) -> BookingClause {
        BookingClause::Overlap {
            check_in_at: from_day * DAY,
            check_out_at: to_day * DAY,
        }
    }

    fn services() -> (BookingService, HomeService) {
        let storage = Storage::temporary();
        (BookingService::new(storage.clone()), HomeService::new(storage))
    }

    /// Lists a home owned by `host` and returns its id.
    async fn listing(homes: &HomeService, host: ObjectId) -> ObjectId {
        let owner = Principal::new(host, "host", false);
        let new = NewHome {
            title: "Loft".into(),
            price: Some(100.0),
            ..NewHome::default()
        };
        homes.add(&owner, new).await.unwrap().id
    }

    fn new_booking(home: ObjectId, host: ObjectId, check_in: &str, check_out: &str) -> NewBooking {
        NewBooking {
            home_id: home.to_string(),
            host_id: host.to_string(),
            check_in: check_in.to_string(),
            check_out: check_out.to_string(),
            price_per_night: 100.0,
            ..NewBooking::default()
        }
    }

    #[test]
    fn overlap_is_half_open() {
        let b = stored(10, 20);
        assert!(overlap(15, 25).matches(&b));
        assert!(!overlap(20, 30).matches(&b));
        assert!(!overlap(5, 9).matches(&b));
        assert!(overlap(5, 11).matches(&b));
        assert!(overlap(12, 13).matches(&b));
    }

    #[test]
    fn invalid_date_pair_adds_no_overlap_clause() {
        for (check_in, check_out) in [("2025-07-10", "2025-07-01"), ("soon", "2025-07-01"), ("2025-07-01", "")] {
            let filter = BookingFilter {
                check_in: Some(check_in.into()),
                check_out: Some(check_out.into()),
                ..Default::default()
            };
            assert!(filter.clauses().unwrap().is_empty(), "{check_in}..{check_out}");
        }
    }

    #[test]
    fn malformed_filter_ids_and_status_rejected() {
        let bad_id = BookingFilter { home_id: Some("abc".into()), ..Default::default() };
        assert!(matches!(bad_id.clauses(), Err(AppError::Validation(_))));

        let bad_status = BookingFilter { status: Some("Refunded".into()), ..Default::default() };
        assert!(matches!(bad_status.clauses(), Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn add_prices_and_defaults_to_caller_as_guest() {
        let (bookings, homes) = services();
        let guest = Principal::new(ObjectId::new(), "guest", false);
        let host = ObjectId::new();
        let home = listing(&homes, host).await;

        let mut new = new_booking(home, host, "2025-07-01", "2025-07-04");
        new.discount = Some(0.1);
        new.tax = Some(12.5);
        let booking = bookings.add(&guest, new).await.unwrap();

        assert_eq!(booking.guest_id, guest.id());
        assert_eq!(booking.total_price, 282.5);
        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.check_out_at - booking.check_in_at, 3 * DAY);
        assert_eq!(bookings.get_by_id(booking.id).await.unwrap(), Some(booking));
    }

    #[tokio::test]
    async fn host_comes_from_the_home() {
        let (bookings, homes) = services();
        let guest = Principal::new(ObjectId::new(), "guest", false);
        let host = ObjectId::new();
        let home = listing(&homes, host).await;

        let mut blank_host = new_booking(home, host, "2025-07-01", "2025-07-02");
        blank_host.host_id.clear();
        assert_eq!(bookings.add(&guest, blank_host).await.unwrap().host_id, host);

        let accomplice = new_booking(home, guest.id(), "2025-07-01", "2025-07-02");
        assert!(matches!(bookings.add(&guest, accomplice).await, Err(AppError::Validation(_))));

        let unlisted = new_booking(ObjectId::new(), host, "2025-07-01", "2025-07-02");
        assert!(matches!(bookings.add(&guest, unlisted).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn add_rejects_bad_input_without_writing() {
        let (bookings, homes) = services();
        let guest = Principal::new(ObjectId::new(), "guest", false);
        let host = ObjectId::new();
        let home = listing(&homes, host).await;

        let mut bad_status = new_booking(home, host, "2025-07-01", "2025-07-04");
        bad_status.status = Some("Refunded".into());
        let mut bad_home = new_booking(home, host, "2025-07-01", "2025-07-04");
        bad_home.home_id.clear();
        let inverted = new_booking(home, host, "2025-07-04", "2025-07-01");
        let mut other_guest = new_booking(home, host, "2025-07-01", "2025-07-04");
        other_guest.guest_id = Some(ObjectId::new().to_string());

        for new in [bad_status, bad_home, inverted] {
            assert!(matches!(bookings.add(&guest, new).await, Err(AppError::Validation(_))));
        }
        assert!(matches!(bookings.add(&guest, other_guest).await, Err(AppError::Forbidden(_))));
        assert!(bookings.query(&BookingFilter::default()).await.unwrap().items.is_empty());
    }

    #[tokio::test]
    async fn query_filters_by_overlap_and_sorts() {
        let (bookings, homes) = services();
        let guest = Principal::new(ObjectId::new(), "guest", false);
        let host = ObjectId::new();
        let home = listing(&homes, host).await;
        let other_home = listing(&homes, host).await;

        let july = bookings.add(&guest, new_booking(home, host, "2025-07-10", "2025-07-20")).await.unwrap();
        let august = bookings.add(&guest, new_booking(home, host, "2025-08-01", "2025-08-05")).await.unwrap();
        bookings.add(&guest, new_booking(other_home, host, "2025-07-15", "2025-07-16")).await.unwrap();

        let filter = BookingFilter {
            home_id: Some(home.to_string()),
            check_in: Some("2025-07-15".into()),
            check_out: Some("2025-07-25".into()),
            ..Default::default()
        };
        let page = bookings.query(&filter).await.unwrap();
        assert_eq!(page.items, vec![july.clone()]);
        assert_eq!((page.page, page.limit, page.total, page.pages), (1, 1, 1, 1));

        let touching = BookingFilter {
            home_id: Some(home.to_string()),
            check_in: Some("2025-07-20".into()),
            check_out: Some("2025-07-30".into()),
            ..Default::default()
        };
        assert!(bookings.query(&touching).await.unwrap().items.is_empty());

        let by_check_in = BookingFilter {
            home_id: Some(home.to_string()),
            sort_by: Some("checkIn".into()),
            sort_dir: Some("asc".into()),
            ..Default::default()
        };
        let ids: Vec<_> = bookings.query(&by_check_in).await.unwrap().items.iter().map(|b| b.id).collect();
        assert_eq!(ids, [july.id, august.id]);

        let paged = BookingFilter { limit: Some(2), ..Default::default() };
        let page = bookings.query(&paged).await.unwrap();
        assert_eq!((page.items.len(), page.total, page.pages), (2, 3, 2));

        let far = BookingFilter { page: Some(usize::MAX), limit: Some(2), ..Default::default() };
        assert!(bookings.query(&far).await.unwrap().items.is_empty());
    }

    #[tokio::test]
    async fn update_merges_stored_fields_and_reprices() {
        let (bookings, homes) = services();
        let guest = Principal::new(ObjectId::new(), "guest", false);
        let stranger = Principal::new(ObjectId::new(), "stranger", false);
        let host_id = ObjectId::new();
        let host = Principal::new(host_id, "host", false);
        let home = listing(&homes, host_id).await;

        let mut new = new_booking(home, host_id, "2025-07-01", "2025-07-03");
        new.tax = Some(10.0);
        let booking = bookings.add(&guest, new).await.unwrap();
        assert_eq!(booking.total_price, 210.0);

        let later = BookingUpdate { check_out: Some("2025-07-05".into()), ..Default::default() };
        assert!(matches!(
            bookings.update(&stranger, booking.id, later.clone()).await,
            Err(AppError::Forbidden(_))
        ));

        let updated = bookings.update(&guest, booking.id, later).await.unwrap().unwrap();
        assert_eq!(updated.check_in, "2025-07-01");
        assert_eq!(updated.tax, 10.0);
        assert_eq!(updated.total_price, 410.0);

        let paid = BookingUpdate { status: Some("Paid".into()), total_price: Some(99.0), ..Default::default() };
        let updated = bookings.update(&host, booking.id, paid).await.unwrap().unwrap();
        assert_eq!((updated.status, updated.total_price), (BookingStatus::Paid, 99.0));

        let inverted = BookingUpdate { check_in: Some("2025-07-09".into()), ..Default::default() };
        assert!(matches!(bookings.update(&guest, booking.id, inverted).await, Err(AppError::Validation(_))));
        assert_eq!(bookings.get_by_id(booking.id).await.unwrap().unwrap().status, BookingStatus::Paid);

        assert!(bookings.update(&guest, ObjectId::new(), BookingUpdate::default()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn status_change_keeps_explicit_total() {
        let (bookings, homes) = services();
        let guest = Principal::new(ObjectId::new(), "guest", false);
        let host = ObjectId::new();
        let home = listing(&homes, host).await;

        let mut new = new_booking(home, host, "2025-07-01", "2025-07-03");
        new.total_price = Some(99.0);
        let booking = bookings.add(&guest, new).await.unwrap();
        assert_eq!(booking.total_price, 99.0);

        let paid = BookingUpdate { status: Some("Paid".into()), ..Default::default() };
        let updated = bookings.update(&guest, booking.id, paid).await.unwrap().unwrap();
        assert_eq!((updated.status, updated.total_price), (BookingStatus::Paid, 99.0));

        let cheaper = BookingUpdate { price_per_night: Some(50.0), ..Default::default() };
        let updated = bookings.update(&guest, booking.id, cheaper).await.unwrap().unwrap();
        assert_eq!(updated.total_price, 100.0);
    }

    #[tokio::test]
    async fn remove_allowed_for_parties_only() {
        let (bookings, homes) = services();
        let guest = Principal::new(ObjectId::new(), "guest", false);
        let stranger = Principal::new(ObjectId::new(), "stranger", false);
        let admin = Principal::new(ObjectId::new(), "admin", true);
        let host = ObjectId::new();
        let home = listing(&homes, host).await;
        let booking = bookings
            .add(&guest, new_booking(home, host, "2025-07-01", "2025-07-02"))
            .await
            .unwrap();

        assert!(matches!(bookings.remove(&stranger, booking.id).await, Err(AppError::Forbidden(_))));
        bookings.remove(&admin, booking.id).await.unwrap();
        assert!(matches!(bookings.remove(&admin, booking.id).await, Err(AppError::NotFound(_))));
    }
}
