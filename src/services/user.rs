use serde::Deserialize;

use crate::auth::{hash_password, verify_password};
use crate::context::Principal;
use crate::error::{AppError, AppResult};
use crate::id::ObjectId;
use crate::models::{Page, User, UserView};
use crate::storage::{Collection, Storage, USERS};

use super::{contains_ci, empty_as_none, needle};

#[derive(Deserialize, Debug, Clone, Default)]
pub struct UserFilter {
    #[serde(default)]
    pub txt: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub page: Option<usize>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub limit: Option<usize>,
}

/// Signup payload.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub img_url: Option<String>,
    #[serde(default)]
    pub favorites: Vec<String>,
    #[serde(default, rename = "searching_history")]
    pub searching_history: Vec<serde_json::Value>,
    /// Only seeding and admin tooling set this; signup never does.
    #[serde(skip)]
    pub is_admin: bool,
}

/// Profile update. Absent fields keep their stored value; an empty
/// `imgUrl` removes the picture.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub img_url: Option<String>,
    pub favorites: Option<Vec<String>>,
    #[serde(rename = "searching_history")]
    pub searching_history: Option<Vec<serde_json::Value>>,
}

#[derive(Clone)]
pub struct UserService {
    storage: Storage,
    password_cost: u32,
}

impl UserService {
    pub fn new(storage: Storage, password_cost: u32) -> Self {
        Self { storage, password_cost }
    }

    async fn collection(&self) -> AppResult<Collection> {
        self.storage.collection(USERS).await
    }

    pub async fn query(&self, filter: &UserFilter) -> AppResult<Page<UserView>> {
        let txt = needle(filter.txt.as_deref());
        let phone = filter.phone.as_deref().map(str::trim).filter(|p| !p.is_empty());

        let users: Vec<User> = self.collection().await?.find(|u: &User| {
            let txt_ok = txt.as_deref().map_or(true, |t| {
                [&u.username, &u.first_name, &u.last_name, &u.email]
                    .iter()
                    .any(|field| contains_ci(field, t))
            });
            let phone_ok = phone.map_or(true, |p| u.phone == p);
            txt_ok && phone_ok
        })?;

        Ok(Page::paginate(users, filter.page, filter.limit).map(UserView::from))
    }

    pub async fn get_by_id(&self, id: ObjectId) -> AppResult<Option<UserView>> {
        let user: Option<User> = self.collection().await?.get(&id)?;
        Ok(user.map(UserView::from))
    }

    /// Full record including the password hash; login only.
    pub async fn get_by_username(&self, username: &str) -> AppResult<Option<User>> {
        self.collection().await?.find_one(|u: &User| u.username == username)
    }

    pub async fn get_by_phone(&self, phone: &str) -> AppResult<Option<User>> {
        self.collection().await?.find_one(|u: &User| !u.phone.is_empty() && u.phone == phone)
    }

    pub async fn add(&self, new: NewUser) -> AppResult<UserView> {
        let username = new.username.trim().to_string();
        if username.is_empty() {
            return Err(AppError::validation("username required"));
        }
        if new.password.is_empty() {
            return Err(AppError::validation("password required"));
        }
        if self.get_by_username(&username).await?.is_some() {
            return Err(AppError::validation("username already taken"));
        }

        let user = User {
            id: ObjectId::new(),
            username,
            password_hash: hash_password(&new.password, self.password_cost)?,
            first_name: new.first_name,
            last_name: new.last_name,
            email: new.email,
            phone: new.phone,
            img_url: new.img_url.filter(|url| !url.trim().is_empty()),
            is_admin: new.is_admin,
            favorites: new.favorites,
            searching_history: new.searching_history,
        };

        self.collection().await?.insert(&user.id, &user)?;
        tracing::info!(user_id = %user.id, username = %user.username, "user added");
        Ok(UserView::from(user))
    }

    pub async fn update(
        &self,
        principal: &Principal,
        id: ObjectId,
        patch: UserUpdate,
    ) -> AppResult<Option<UserView>> {
        principal.require_owner(id, "not your profile")?;

        let col = self.collection().await?;
        let Some(mut user) = col.get::<User>(&id)? else {
            return Ok(None);
        };

        if let Some(username) = patch.username {
            let username = username.trim().to_string();
            if username.is_empty() {
                return Err(AppError::validation("username required"));
            }
            if username != user.username {
                let taken = col.find_one(|u: &User| u.username == username && u.id != id)?;
                if taken.is_some() {
                    return Err(AppError::validation("username already taken"));
                }
            }
            user.username = username;
        }
        if let Some(v) = patch.first_name {
            user.first_name = v;
        }
        if let Some(v) = patch.last_name {
            user.last_name = v;
        }
        if let Some(v) = patch.email {
            user.email = v;
        }
        if let Some(v) = patch.phone {
            user.phone = v;
        }
        if let Some(url) = patch.img_url {
            user.img_url = if url.trim().is_empty() { None } else { Some(url) };
        }
        if let Some(v) = patch.favorites {
            user.favorites = v;
        }
        if let Some(v) = patch.searching_history {
            user.searching_history = v;
        }

        if !col.replace(&id, &user)? {
            return Ok(None);
        }
        Ok(Some(UserView::from(user)))
    }

    pub async fn remove(&self, principal: &Principal, id: ObjectId) -> AppResult<()> {
        principal.require_admin()?;
        if !self.collection().await?.remove(&id)? {
            return Err(AppError::not_found("user"));
        }
        tracing::info!(user_id = %id, by = %principal.id(), "user removed");
        Ok(())
    }

    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<User> {
        let user = self.get_by_username(username.trim()).await?;
        check_password(user, password)
    }

    pub async fn authenticate_phone(&self, phone: &str, password: &str) -> AppResult<User> {
        let user = self.get_by_phone(phone.trim()).await?;
        check_password(user, password)
    }
}

fn check_password(user: Option<User>, password: &str) -> AppResult<User> {
    let invalid = || AppError::Unauthorized("invalid credentials".to_string());
    let user = user.ok_or_else(invalid)?;
    if verify_password(password, &user.password_hash).unwrap_or(false) {
        Ok(user)
    } else {
        Err(invalid())
    }
}
