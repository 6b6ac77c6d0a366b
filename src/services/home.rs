use std::cmp::Ordering;
use std::str::FromStr;

use serde::Deserialize;

use crate::context::Principal;
use crate::error::{AppError, AppResult};
use crate::id::ObjectId;
use crate::models::{Home, HomeMsg, Location, MsgAuthor};
use crate::storage::{Collection, Storage, HOMES};

use super::{contains_ci, needle};

pub const PAGE_SIZE: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomeSortField {
    Price,
    Rating,
    Capacity,
    Rooms,
    Beds,
    Bathrooms,
    NumberOfRaters,
    AddedToWishlist,
    CreatedAt,
    Title,
}

impl FromStr for HomeSortField {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "price" => HomeSortField::Price,
            "rating" => HomeSortField::Rating,
            "capacity" => HomeSortField::Capacity,
            "rooms" => HomeSortField::Rooms,
            "beds" => HomeSortField::Beds,
            "bathrooms" => HomeSortField::Bathrooms,
            "numberOfRaters" => HomeSortField::NumberOfRaters,
            "addedToWishlist" => HomeSortField::AddedToWishlist,
            "createdAt" => HomeSortField::CreatedAt,
            "title" => HomeSortField::Title,
            other => return Err(AppError::validation(format!("cannot sort by {other}"))),
        })
    }
}

impl HomeSortField {
    fn compare(self, a: &Home, b: &Home) -> Ordering {
        match self {
            HomeSortField::Price => a.price.total_cmp(&b.price),
            HomeSortField::Rating => a.rating.total_cmp(&b.rating),
            HomeSortField::Capacity => a.capacity.cmp(&b.capacity),
            HomeSortField::Rooms => a.rooms.cmp(&b.rooms),
            HomeSortField::Beds => a.beds.cmp(&b.beds),
            HomeSortField::Bathrooms => a.bathrooms.cmp(&b.bathrooms),
            HomeSortField::NumberOfRaters => a.number_of_raters.cmp(&b.number_of_raters),
            HomeSortField::AddedToWishlist => a.added_to_wishlist.cmp(&b.added_to_wishlist),
            HomeSortField::CreatedAt => a.created_at.cmp(&b.created_at),
            HomeSortField::Title => a.title.cmp(&b.title),
        }
    }
}

/// Search criteria for listings. Every field is optional; only supplied
/// ones constrain the result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HomeFilter {
    pub txt: Option<String>,
    pub home_type: Option<String>,
    pub host_id: Option<ObjectId>,
    pub capacity: Option<u32>,
    pub rooms: Option<u32>,
    pub beds: Option<u32>,
    pub bathrooms: Option<u32>,
    pub rating_min: Option<f64>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub amenities: Vec<String>,
    pub guest_favorite: Option<bool>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub sort_field: Option<HomeSortField>,
    pub sort_desc: bool,
    pub page_idx: Option<usize>,
}

fn parse_field<T: FromStr>(key: &str, value: &str) -> AppResult<T> {
    value
        .parse()
        .map_err(|_| AppError::validation(format!("bad {key}: {value}")))
}

/// Zero thresholds impose nothing, same as leaving them out.
fn positive(n: u32) -> Option<u32> {
    (n > 0).then_some(n)
}

impl HomeFilter {
    /// Builds a filter from raw query pairs. `amenities` and `amenities[]`
    /// may repeat; blank values count as absent; unknown keys are ignored.
    pub fn from_pairs(pairs: &[(String, String)]) -> AppResult<Self> {
        let mut f = HomeFilter::default();
        for (key, value) in pairs {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match key.as_str() {
                "txt" => f.txt = Some(value.to_string()),
                "type" => f.home_type = Some(value.to_string()),
                "city" => f.city = Some(value.to_string()),
                "country" => f.country = Some(value.to_string()),
                "host_id" => f.host_id = Some(value.parse()?),
                "minPrice" => f.min_price = Some(parse_field(key, value)?),
                "maxPrice" => f.max_price = Some(parse_field(key, value)?),
                "capacity" => f.capacity = positive(parse_field(key, value)?),
                "rooms" => f.rooms = positive(parse_field(key, value)?),
                "beds" => f.beds = positive(parse_field(key, value)?),
                "bathrooms" => f.bathrooms = positive(parse_field(key, value)?),
                "ratingMin" => {
                    let min: f64 = parse_field(key, value)?;
                    f.rating_min = (min > 0.0).then_some(min);
                }
                "amenities" | "amenities[]" => f.amenities.push(value.to_string()),
                "guestFavorite" => f.guest_favorite = Some(parse_field(key, value)?),
                "sortField" => f.sort_field = Some(value.parse()?),
                "sortDir" => f.sort_desc = value == "-1",
                "pageIdx" => f.page_idx = Some(parse_field(key, value)?),
                _ => {}
            }
        }
        Ok(f)
    }

    /// The conjunctive predicate: one clause per supplied criterion.
    pub fn clauses(&self) -> Vec<HomeClause> {
        let mut clauses = Vec::new();
        if let Some(txt) = needle(self.txt.as_deref()) {
            clauses.push(HomeClause::Text(txt));
        }
        if let Some(t) = &self.home_type {
            clauses.push(HomeClause::Type(t.clone()));
        }
        if let Some(host) = self.host_id {
            clauses.push(HomeClause::Host(host));
        }
        if let Some(n) = self.capacity {
            clauses.push(HomeClause::MinCapacity(n));
        }
        if let Some(n) = self.rooms {
            clauses.push(HomeClause::MinRooms(n));
        }
        if let Some(n) = self.beds {
            clauses.push(HomeClause::MinBeds(n));
        }
        if let Some(n) = self.bathrooms {
            clauses.push(HomeClause::MinBathrooms(n));
        }
        if self.min_price.is_some() || self.max_price.is_some() {
            clauses.push(HomeClause::Price {
                min: self.min_price,
                max: self.max_price,
            });
        }
        if let Some(r) = self.rating_min {
            clauses.push(HomeClause::MinRating(r));
        }
        if !self.amenities.is_empty() {
            clauses.push(HomeClause::Amenities(self.amenities.clone()));
        }
        if let Some(fav) = self.guest_favorite {
            clauses.push(HomeClause::GuestFavorite(fav));
        }
        if let Some(country) = &self.country {
            clauses.push(HomeClause::Country(country.clone()));
        }
        if let Some(city) = &self.city {
            clauses.push(HomeClause::City(city.clone()));
        }
        clauses
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HomeClause {
    /// Lowercased; matched against title or description.
    Text(String),
    Type(String),
    Host(ObjectId),
    MinCapacity(u32),
    MinRooms(u32),
    MinBeds(u32),
    MinBathrooms(u32),
    MinRating(f64),
    /// Inclusive on both ends.
    Price { min: Option<f64>, max: Option<f64> },
    /// All listed amenities must be present.
    Amenities(Vec<String>),
    GuestFavorite(bool),
    Country(String),
    City(String),
}

impl HomeClause {
    pub fn matches(&self, home: &Home) -> bool {
        match self {
            HomeClause::Text(t) => contains_ci(&home.title, t) || contains_ci(&home.description, t),
            HomeClause::Type(t) => &home.home_type == t,
            HomeClause::Host(id) => home.host_id == *id,
            HomeClause::MinCapacity(n) => home.capacity >= *n,
            HomeClause::MinRooms(n) => home.rooms >= *n,
            HomeClause::MinBeds(n) => home.beds >= *n,
            HomeClause::MinBathrooms(n) => home.bathrooms >= *n,
            HomeClause::MinRating(r) => home.rating >= *r,
            HomeClause::Price { min, max } => {
                min.map_or(true, |m| home.price >= m) && max.map_or(true, |m| home.price <= m)
            }
            HomeClause::Amenities(wanted) => wanted.iter().all(|a| home.amenities.contains(a)),
            HomeClause::GuestFavorite(fav) => home.guest_favorite == *fav,
            HomeClause::Country(c) => home.location.country.as_deref() == Some(c.as_str()),
            HomeClause::City(c) => home.location.city.as_deref() == Some(c.as_str()),
        }
    }
}

fn dedupe(amenities: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(amenities.len());
    for a in amenities {
        let a = a.trim().to_string();
        if !a.is_empty() && !out.contains(&a) {
            out.push(a);
        }
    }
    out
}

fn check_price(price: f64) -> AppResult<()> {
    if price.is_finite() && price >= 0.0 {
        Ok(())
    } else {
        Err(AppError::validation("bad price"))
    }
}

fn check_rating(rating: f64) -> AppResult<()> {
    if (0.0..=5.0).contains(&rating) {
        Ok(())
    } else {
        Err(AppError::validation("bad rating"))
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewHome {
    /// Honored only for admins; hosts always list under their own id.
    #[serde(default, rename = "host_id")]
    pub host_id: Option<ObjectId>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: Option<f64>,
    pub capacity: Option<u32>,
    pub rooms: Option<u32>,
    pub beds: Option<u32>,
    pub bathrooms: Option<u32>,
    #[serde(rename = "type")]
    pub home_type: Option<String>,
    #[serde(default)]
    pub img_urls: Vec<String>,
    pub rating: Option<f64>,
    pub number_of_raters: Option<u32>,
    pub added_to_wishlist: Option<u32>,
    #[serde(default)]
    pub guest_favorite: bool,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub amenities: Vec<String>,
    pub highlights: Option<serde_json::Value>,
    #[serde(default)]
    pub unavailable_dates: Vec<String>,
    #[serde(default)]
    pub last_search_value: String,
}

/// Listing update. Absent fields keep their stored value.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct HomeUpdate {
    /// Reassigning a listing is admin-only.
    #[serde(rename = "host_id")]
    pub host_id: Option<ObjectId>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub capacity: Option<u32>,
    pub rooms: Option<u32>,
    pub beds: Option<u32>,
    pub bathrooms: Option<u32>,
    #[serde(rename = "type")]
    pub home_type: Option<String>,
    pub img_urls: Option<Vec<String>>,
    pub rating: Option<f64>,
    pub number_of_raters: Option<u32>,
    pub added_to_wishlist: Option<u32>,
    pub guest_favorite: Option<bool>,
    pub location: Option<Location>,
    pub amenities: Option<Vec<String>>,
    pub highlights: Option<serde_json::Value>,
    pub unavailable_dates: Option<Vec<String>>,
    pub last_search_value: Option<String>,
}

#[derive(Clone)]
pub struct HomeService {
    storage: Storage,
}

impl HomeService {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    async fn collection(&self) -> AppResult<Collection> {
        self.storage.collection(HOMES).await
    }

    pub async fn query(&self, filter: &HomeFilter) -> AppResult<Vec<Home>> {
        let clauses = filter.clauses();
        let mut homes: Vec<Home> = self
            .collection()
            .await?
            .find(|h: &Home| clauses.iter().all(|c| c.matches(h)))?;

        if let Some(field) = filter.sort_field {
            homes.sort_by(|a, b| {
                let ord = field.compare(a, b);
                if filter.sort_desc {
                    ord.reverse()
                } else {
                    ord
                }
            });
        }

        if let Some(page_idx) = filter.page_idx {
            homes = homes
                .into_iter()
                .skip(page_idx.saturating_mul(PAGE_SIZE))
                .take(PAGE_SIZE)
                .collect();
        }
        Ok(homes)
    }

    pub async fn get_by_id(&self, id: ObjectId) -> AppResult<Option<Home>> {
        self.collection().await?.get(&id)
    }

    pub async fn add(&self, principal: &Principal, new: NewHome) -> AppResult<Home> {
        let title = new.title.trim().to_string();
        if title.is_empty() {
            return Err(AppError::validation("title required"));
        }
        let price = new.price.unwrap_or(0.0);
        check_price(price)?;
        let rating = new.rating.unwrap_or(0.0);
        check_rating(rating)?;

        let host_id = match new.host_id {
            Some(host) if principal.is_admin() => host,
            _ => principal.id(),
        };
        let at_least_one = |n: Option<u32>| n.filter(|&n| n > 0).unwrap_or(1);

        let id = ObjectId::new();
        let home = Home {
            id,
            host_id,
            title,
            description: new.description,
            price,
            capacity: at_least_one(new.capacity),
            rooms: at_least_one(new.rooms),
            beds: at_least_one(new.beds),
            bathrooms: at_least_one(new.bathrooms),
            home_type: new
                .home_type
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| "house".to_string()),
            img_urls: new.img_urls,
            rating,
            number_of_raters: new.number_of_raters.unwrap_or(0),
            added_to_wishlist: new.added_to_wishlist.unwrap_or(0),
            guest_favorite: new.guest_favorite,
            location: new.location,
            amenities: dedupe(new.amenities),
            highlights: new.highlights.unwrap_or_else(|| serde_json::json!({})),
            msgs: Vec::new(),
            unavailable_dates: new.unavailable_dates,
            last_search_value: new.last_search_value,
            created_at: id.timestamp_millis(),
        };

        self.collection().await?.insert(&home.id, &home)?;
        tracing::info!(home_id = %home.id, host_id = %home.host_id, "home added");
        Ok(home)
    }

    pub async fn update(
        &self,
        principal: &Principal,
        id: ObjectId,
        patch: HomeUpdate,
    ) -> AppResult<Option<Home>> {
        let col = self.collection().await?;
        let Some(mut home) = col.get::<Home>(&id)? else {
            return Ok(None);
        };
        principal.require_owner(home.host_id, "Not your home")?;

        if let Some(host) = patch.host_id {
            if host != home.host_id {
                principal.require_admin()?;
                home.host_id = host;
            }
        }
        if let Some(title) = patch.title {
            let title = title.trim().to_string();
            if title.is_empty() {
                return Err(AppError::validation("title required"));
            }
            home.title = title;
        }
        if let Some(price) = patch.price {
            check_price(price)?;
            home.price = price;
        }
        if let Some(rating) = patch.rating {
            check_rating(rating)?;
            home.rating = rating;
        }
        if let Some(v) = patch.description {
            home.description = v;
        }
        if let Some(v) = patch.capacity {
            home.capacity = v;
        }
        if let Some(v) = patch.rooms {
            home.rooms = v;
        }
        if let Some(v) = patch.beds {
            home.beds = v;
        }
        if let Some(v) = patch.bathrooms {
            home.bathrooms = v;
        }
        if let Some(v) = patch.home_type {
            home.home_type = v;
        }
        if let Some(v) = patch.img_urls {
            home.img_urls = v;
        }
        if let Some(v) = patch.number_of_raters {
            home.number_of_raters = v;
        }
        if let Some(v) = patch.added_to_wishlist {
            home.added_to_wishlist = v;
        }
        if let Some(v) = patch.guest_favorite {
            home.guest_favorite = v;
        }
        if let Some(v) = patch.location {
            home.location = v;
        }
        if let Some(v) = patch.amenities {
            home.amenities = dedupe(v);
        }
        if let Some(v) = patch.highlights {
            home.highlights = v;
        }
        if let Some(v) = patch.unavailable_dates {
            home.unavailable_dates = v;
        }
        if let Some(v) = patch.last_search_value {
            home.last_search_value = v;
        }

        if !col.replace(&id, &home)? {
            return Ok(None);
        }
        Ok(Some(home))
    }

    /// Deletes a listing owned by the principal (or any listing, for admins).
    pub async fn remove(&self, principal: &Principal, id: ObjectId) -> AppResult<ObjectId> {
        let col = self.collection().await?;
        let home: Home = col.get(&id)?.ok_or_else(|| AppError::not_found("home"))?;
        principal.require_owner(home.host_id, "Not your home")?;

        col.remove(&id)?;
        tracing::info!(home_id = %id, by = %principal.id(), "home removed");
        Ok(id)
    }

    pub async fn add_msg(&self, principal: &Principal, home_id: ObjectId, txt: &str) -> AppResult<HomeMsg> {
        let txt = txt.trim();
        if txt.is_empty() {
            return Err(AppError::validation("message text required"));
        }

        let col = self.collection().await?;
        let mut home: Home = col.get(&home_id)?.ok_or_else(|| AppError::not_found("home"))?;

        let id = ObjectId::new();
        let msg = HomeMsg {
            id,
            txt: txt.to_string(),
            by: MsgAuthor {
                id: principal.id(),
                username: principal.username().to_string(),
            },
            created_at: id.timestamp_millis(),
        };
        home.msgs.push(msg.clone());
        col.replace(&home_id, &home)?;
        Ok(msg)
    }

    /// Message author, listing owner and admins may delete a message.
    pub async fn remove_msg(
        &self,
        principal: &Principal,
        home_id: ObjectId,
        msg_id: ObjectId,
    ) -> AppResult<ObjectId> {
        let col = self.collection().await?;
        let mut home: Home = col.get(&home_id)?.ok_or_else(|| AppError::not_found("home"))?;
        let pos = home
            .msgs
            .iter()
            .position(|m| m.id == msg_id)
            .ok_or_else(|| AppError::not_found("message"))?;

        if home.msgs[pos].by.id != principal.id() && !principal.can_act_for(home.host_id) {
            return Err(AppError::forbidden("Not your message"));
        }

        home.msgs.remove(pos);
        col.replace(&home_id, &home)?;
        Ok(msg_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(list: &[(&str, &str)]) -> Vec<(String, String)> {
        list.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn new_home(title: &str, price: f64) -> NewHome {
        NewHome {
            title: title.to_string(),
            price: Some(price),
            ..NewHome::default()
        }
    }

    #[test]
    fn no_criteria_means_no_clauses() {
        let f = HomeFilter::from_pairs(&pairs(&[("txt", ""), ("type", "  ")])).unwrap();
        assert!(f.clauses().is_empty());
        assert_eq!(f.page_idx, None);
    }

    #[test]
    fn parses_every_documented_field() {
        let host = ObjectId::new();
        let host_hex = host.to_string();
        let f = HomeFilter::from_pairs(&pairs(&[
            ("txt", "Beach"),
            ("type", "villa"),
            ("city", "Haifa"),
            ("country", "Israel"),
            ("minPrice", "100"),
            ("maxPrice", "300.5"),
            ("capacity", "4"),
            ("rooms", "0"),
            ("ratingMin", "4.5"),
            ("amenities[]", "Wifi"),
            ("amenities", "Pool"),
            ("guestFavorite", "true"),
            ("sortField", "price"),
            ("sortDir", "-1"),
            ("pageIdx", "2"),
            ("host_id", host_hex.as_str()),
        ]))
        .unwrap();

        assert_eq!(f.min_price, Some(100.0));
        assert_eq!(f.max_price, Some(300.5));
        assert_eq!(f.capacity, Some(4));
        assert_eq!(f.rooms, None);
        assert_eq!(f.amenities, ["Wifi", "Pool"]);
        assert_eq!(f.guest_favorite, Some(true));
        assert_eq!(f.sort_field, Some(HomeSortField::Price));
        assert!(f.sort_desc);
        assert_eq!(f.page_idx, Some(2));
        assert_eq!(f.host_id, Some(host));
        assert!(f.clauses().contains(&HomeClause::Text("beach".into())));
        assert!(f.clauses().contains(&HomeClause::Price { min: Some(100.0), max: Some(300.5) }));
    }

    #[test]
    fn malformed_values_are_client_errors() {
        for bad in [("minPrice", "cheap"), ("host_id", "123"), ("sortField", "secret"), ("guestFavorite", "yes")] {
            let err = HomeFilter::from_pairs(&pairs(&[bad])).unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "{bad:?}");
        }
    }

    #[tokio::test]
    async fn filters_combine_with_and() {
        let homes = HomeService::new(Storage::temporary());
        let host = Principal::new(ObjectId::new(), "host", false);

        let mut beach = new_home("Beach house", 200.0);
        beach.amenities = vec!["Wifi".into(), "Pool".into(), "Wifi".into()];
        beach.capacity = Some(6);
        beach.location = Location { city: Some("Eilat".into()), ..Location::default() };
        let beach = homes.add(&host, beach).await.unwrap();
        assert_eq!(beach.amenities, ["Wifi", "Pool"]);

        let mut cabin = new_home("Cabin", 80.0);
        cabin.description = "Quiet place near the BEACH".into();
        cabin.amenities = vec!["Wifi".into()];
        homes.add(&host, cabin).await.unwrap();

        let all = homes.query(&HomeFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);

        let text = HomeFilter { txt: Some("beach".into()), ..Default::default() };
        assert_eq!(homes.query(&text).await.unwrap().len(), 2);

        let both = HomeFilter {
            txt: Some("beach".into()),
            amenities: vec!["Wifi".into(), "Pool".into()],
            ..Default::default()
        };
        let found = homes.query(&both).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, beach.id);

        let city = HomeFilter { city: Some("Eilat".into()), capacity: Some(6), ..Default::default() };
        assert_eq!(homes.query(&city).await.unwrap().len(), 1);

        let inverted = HomeFilter { min_price: Some(300.0), max_price: Some(100.0), ..Default::default() };
        assert!(homes.query(&inverted).await.unwrap().is_empty());

        let inclusive = HomeFilter { min_price: Some(80.0), max_price: Some(80.0), ..Default::default() };
        assert_eq!(homes.query(&inclusive).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn sorts_and_pages() {
        let homes = HomeService::new(Storage::temporary());
        let host = Principal::new(ObjectId::new(), "host", false);
        for i in 0..15 {
            homes.add(&host, new_home(&format!("Home {i:02}"), i as f64 * 10.0)).await.unwrap();
        }

        let desc = HomeFilter { sort_field: Some(HomeSortField::Price), sort_desc: true, ..Default::default() };
        let sorted = homes.query(&desc).await.unwrap();
        assert_eq!(sorted[0].price, 140.0);
        assert_eq!(sorted.len(), 15);

        let second_page = HomeFilter { page_idx: Some(1), ..desc.clone() };
        let page = homes.query(&second_page).await.unwrap();
        assert_eq!(page.len(), 3);
        assert_eq!(page[0].price, 20.0);

        let huge = usize::MAX.to_string();
        let far = HomeFilter::from_pairs(&pairs(&[("pageIdx", huge.as_str())])).unwrap();
        assert!(homes.query(&far).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn added_home_reads_back_unchanged() {
        let homes = HomeService::new(Storage::temporary());
        let host = Principal::new(ObjectId::new(), "host", false);
        let mut new = new_home("  Garden Flat ", 140.0);
        new.description = "Ground floor".into();
        new.capacity = Some(3);
        new.amenities = vec![" Wifi ".into(), "Garden".into()];
        new.location = Location {
            city: Some("Porto".into()),
            country: Some("Portugal".into()),
            ..Location::default()
        };
        new.highlights = Some(serde_json::json!({ "selfCheckIn": true }));

        let home = homes.add(&host, new).await.unwrap();
        assert_eq!(home.title, "Garden Flat");
        assert_eq!(home.host_id, host.id());
        assert_eq!(home.amenities, ["Wifi", "Garden"]);
        assert_eq!(homes.get_by_id(home.id).await.unwrap(), Some(home));
    }

    #[tokio::test]
    async fn non_owner_cannot_remove() {
        let homes = HomeService::new(Storage::temporary());
        let owner = Principal::new(ObjectId::new(), "owner", false);
        let stranger = Principal::new(ObjectId::new(), "stranger", false);
        let admin = Principal::new(ObjectId::new(), "admin", true);
        let home = homes.add(&owner, new_home("Loft", 120.0)).await.unwrap();

        let err = homes.remove(&stranger, home.id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert!(homes.get_by_id(home.id).await.unwrap().is_some());

        let missing = homes.remove(&stranger, ObjectId::new()).await.unwrap_err();
        assert!(matches!(missing, AppError::NotFound(_)));

        assert_eq!(homes.remove(&admin, home.id).await.unwrap(), home.id);
        assert!(homes.get_by_id(home.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_checks_owner_and_keeps_unspecified_fields() {
        let homes = HomeService::new(Storage::temporary());
        let owner = Principal::new(ObjectId::new(), "owner", false);
        let stranger = Principal::new(ObjectId::new(), "stranger", false);
        let mut new = new_home("Loft", 120.0);
        new.description = "Nice".into();
        let home = homes.add(&owner, new).await.unwrap();

        let patch = HomeUpdate { price: Some(150.0), ..Default::default() };
        assert!(matches!(
            homes.update(&stranger, home.id, patch.clone()).await,
            Err(AppError::Forbidden(_))
        ));

        let updated = homes.update(&owner, home.id, patch).await.unwrap().unwrap();
        assert_eq!(updated.price, 150.0);
        assert_eq!(updated.description, "Nice");

        let steal = HomeUpdate { host_id: Some(stranger.id()), ..Default::default() };
        assert!(matches!(homes.update(&owner, home.id, steal).await, Err(AppError::Forbidden(_))));

        assert!(homes.update(&owner, ObjectId::new(), HomeUpdate::default()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn admin_may_list_for_another_host() {
        let homes = HomeService::new(Storage::temporary());
        let admin = Principal::new(ObjectId::new(), "admin", true);
        let host = ObjectId::new();
        let mut new = new_home("Seeded", 10.0);
        new.host_id = Some(host);
        assert_eq!(homes.add(&admin, new.clone()).await.unwrap().host_id, host);

        let plain = Principal::new(ObjectId::new(), "p", false);
        assert_eq!(homes.add(&plain, new).await.unwrap().host_id, plain.id());
    }

    #[tokio::test]
    async fn messages_add_and_remove() {
        let homes = HomeService::new(Storage::temporary());
        let owner = Principal::new(ObjectId::new(), "owner", false);
        let guest = Principal::new(ObjectId::new(), "guest", false);
        let stranger = Principal::new(ObjectId::new(), "stranger", false);
        let home = homes.add(&owner, new_home("Loft", 120.0)).await.unwrap();

        let msg = homes.add_msg(&guest, home.id, " Is it quiet? ").await.unwrap();
        assert_eq!(msg.txt, "Is it quiet?");
        assert_eq!(msg.by.username, "guest");
        assert!(matches!(homes.add_msg(&guest, home.id, "  ").await, Err(AppError::Validation(_))));

        let stored = homes.get_by_id(home.id).await.unwrap().unwrap();
        assert_eq!(stored.msgs, vec![msg.clone()]);

        assert!(matches!(
            homes.remove_msg(&stranger, home.id, msg.id).await,
            Err(AppError::Forbidden(_))
        ));
        assert_eq!(homes.remove_msg(&owner, home.id, msg.id).await.unwrap(), msg.id);
        assert!(matches!(
            homes.remove_msg(&owner, home.id, msg.id).await,
            Err(AppError::NotFound(_))
        ));
    }
}
