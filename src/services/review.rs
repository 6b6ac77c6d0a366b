use std::cmp::Ordering;

use serde::Deserialize;

use crate::context::Principal;
use crate::error::{AppError, AppResult};
use crate::id::ObjectId;
use crate::models::{Page, Review};
use crate::storage::{Collection, Storage, REVIEWS};

use super::{contains_ci, empty_as_none, needle, SortDir};

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReviewFilter {
    pub txt: Option<String>,
    pub user_id: Option<String>,
    pub home_id: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub min_rating: Option<f64>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub max_rating: Option<f64>,
    pub sort_by: Option<String>,
    pub sort_dir: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub page: Option<usize>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub limit: Option<usize>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct NewReview {
    #[serde(default)]
    pub home_id: String,
    pub rating: f64,
    #[serde(default)]
    pub comment: String,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct ReviewUpdate {
    pub rating: Option<f64>,
    pub comment: Option<String>,
}

fn check_rating(rating: f64) -> AppResult<()> {
    if rating.is_finite() && (0.0..=5.0).contains(&rating) {
        Ok(())
    } else {
        Err(AppError::validation("bad rating"))
    }
}

fn parse_ref(raw: Option<&str>) -> AppResult<Option<ObjectId>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => Ok(Some(s.parse()?)),
        None => Ok(None),
    }
}

#[derive(Clone)]
pub struct ReviewService {
    storage: Storage,
}

impl ReviewService {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    async fn collection(&self) -> AppResult<Collection> {
        self.storage.collection(REVIEWS).await
    }

    pub async fn query(&self, filter: &ReviewFilter) -> AppResult<Page<Review>> {
        let txt = needle(filter.txt.as_deref());
        let user_id = parse_ref(filter.user_id.as_deref())?;
        let home_id = parse_ref(filter.home_id.as_deref())?;

        let mut reviews: Vec<Review> = self.collection().await?.find(|r: &Review| {
            txt.as_deref().map_or(true, |t| contains_ci(&r.comment, t))
                && user_id.map_or(true, |id| r.user_id == id)
                && home_id.map_or(true, |id| r.home_id == id)
                && filter.min_rating.map_or(true, |min| r.rating >= min)
                && filter.max_rating.map_or(true, |max| r.rating <= max)
        })?;

        let dir = SortDir::parse(filter.sort_dir.as_deref());
        let by_rating = filter.sort_by.as_deref() == Some("rating");
        reviews.sort_by(|a, b| {
            let primary = if by_rating {
                a.rating.total_cmp(&b.rating)
            } else {
                a.created_at.cmp(&b.created_at)
            };
            match dir.apply(primary) {
                Ordering::Equal => b.id.cmp(&a.id),
                ord => ord,
            }
        });

        Ok(Page::paginate(reviews, filter.page, filter.limit))
    }

    pub async fn get_by_id(&self, id: ObjectId) -> AppResult<Option<Review>> {
        self.collection().await?.get(&id)
    }

    /// The author is always the caller.
    pub async fn add(&self, principal: &Principal, new: NewReview) -> AppResult<Review> {
        let home_id = parse_ref(Some(new.home_id.as_str()))?
            .ok_or_else(|| AppError::validation("bad home_id"))?;
        check_rating(new.rating)?;

        let id = ObjectId::new();
        let review = Review {
            id,
            home_id,
            user_id: principal.id(),
            rating: new.rating,
            comment: new.comment.trim().to_string(),
            created_at: id.timestamp_millis(),
        };

        self.collection().await?.insert(&review.id, &review)?;
        tracing::info!(review_id = %review.id, home_id = %review.home_id, "review added");
        Ok(review)
    }

    pub async fn update(
        &self,
        principal: &Principal,
        id: ObjectId,
        patch: ReviewUpdate,
    ) -> AppResult<Option<Review>> {
        let col = self.collection().await?;
        let Some(mut review) = col.get::<Review>(&id)? else {
            return Ok(None);
        };
        principal.require_owner(review.user_id, "Not your review")?;

        if let Some(rating) = patch.rating {
            check_rating(rating)?;
            review.rating = rating;
        }
        if let Some(comment) = patch.comment {
            review.comment = comment.trim().to_string();
        }

        if !col.replace(&id, &review)? {
            return Ok(None);
        }
        Ok(Some(review))
    }

    pub async fn remove(&self, principal: &Principal, id: ObjectId) -> AppResult<()> {
        let col = self.collection().await?;
        let review: Review = col.get(&id)?.ok_or_else(|| AppError::not_found("review"))?;
        principal.require_owner(review.user_id, "Not your review")?;
        col.remove(&id)?;
        Ok(())
    }
}
