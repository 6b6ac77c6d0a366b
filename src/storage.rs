use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::Db;
use tokio::sync::OnceCell;

use crate::error::AppResult;
use crate::id::ObjectId;

pub const USERS: &str = "user";
pub const HOMES: &str = "home";
pub const BOOKINGS: &str = "booking";
pub const REVIEWS: &str = "review";

/// Shared handle to the embedded store.
///
/// The sled database is opened on the first `collection` call and reused
/// for the rest of the process. Clones share the same handle.
#[derive(Clone)]
pub struct Storage {
    inner: std::sync::Arc<StorageInner>,
}

struct StorageInner {
    config: sled::Config,
    db: OnceCell<Db>,
}

impl Storage {
    pub fn new(path: &str) -> Self {
        Self::with_config(sled::Config::new().path(path))
    }

    /// In-memory database removed on drop (tests, demos).
    pub fn temporary() -> Self {
        Self::with_config(sled::Config::new().temporary(true))
    }

    fn with_config(config: sled::Config) -> Self {
        Self {
            inner: std::sync::Arc::new(StorageInner {
                config,
                db: OnceCell::new(),
            }),
        }
    }

    async fn db(&self) -> AppResult<&Db> {
        let db = self
            .inner
            .db
            .get_or_try_init(|| async {
                tracing::info!("opening sled database");
                self.inner.config.open()
            })
            .await?;
        Ok(db)
    }

    /// Named collection (one sled tree per name).
    pub async fn collection(&self, name: &str) -> AppResult<Collection> {
        let tree = self.db().await?.open_tree(name)?;
        Ok(Collection { tree })
    }
}

/// JSON documents keyed by `ObjectId`.
#[derive(Clone)]
pub struct Collection {
    tree: sled::Tree,
}

impl Collection {
    pub fn insert<T: Serialize>(&self, id: &ObjectId, doc: &T) -> AppResult<()> {
        let bytes = serde_json::to_vec(doc)?;
        self.tree.insert(id.as_bytes(), bytes)?;
        Ok(())
    }

    /// Overwrites the stored document; returns false when no record existed.
    pub fn replace<T: Serialize>(&self, id: &ObjectId, doc: &T) -> AppResult<bool> {
        if !self.tree.contains_key(id.as_bytes())? {
            return Ok(false);
        }
        self.insert(id, doc)?;
        Ok(true)
    }

    pub fn get<T: DeserializeOwned>(&self, id: &ObjectId) -> AppResult<Option<T>> {
        match self.tree.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn remove(&self, id: &ObjectId) -> AppResult<bool> {
        Ok(self.tree.remove(id.as_bytes())?.is_some())
    }

    /// Full scan in insertion order, keeping documents matching `pred`.
    pub fn find<T, P>(&self, mut pred: P) -> AppResult<Vec<T>>
    where
        T: DeserializeOwned,
        P: FnMut(&T) -> bool,
    {
        let mut docs = Vec::new();
        for item in self.tree.iter() {
            let (_, value) = item?;
            let doc: T = serde_json::from_slice(&value)?;
            if pred(&doc) {
                docs.push(doc);
            }
        }
        Ok(docs)
    }

    pub fn find_one<T, P>(&self, mut pred: P) -> AppResult<Option<T>>
    where
        T: DeserializeOwned,
        P: FnMut(&T) -> bool,
    {
        for item in self.tree.iter() {
            let (_, value) = item?;
            let doc: T = serde_json::from_slice(&value)?;
            if pred(&doc) {
                return Ok(Some(doc));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
    struct Doc {
        name: String,
        score: u32,
    }

    #[tokio::test]
    async fn insert_get_replace_remove() {
        let storage = Storage::temporary();
        let col = storage.collection("docs").await.expect("open collection");

        let id = ObjectId::new();
        let doc = Doc { name: "a".into(), score: 1 };
        col.insert(&id, &doc).unwrap();
        assert_eq!(col.get::<Doc>(&id).unwrap(), Some(doc.clone()));

        let updated = Doc { score: 2, ..doc };
        assert!(col.replace(&id, &updated).unwrap());
        assert_eq!(col.get::<Doc>(&id).unwrap().unwrap().score, 2);

        assert!(col.remove(&id).unwrap());
        assert!(!col.remove(&id).unwrap());
        assert_eq!(col.get::<Doc>(&id).unwrap(), None);
        assert!(!col.replace(&id, &updated).unwrap());
    }

    #[tokio::test]
    async fn find_scans_in_insertion_order() {
        let storage = Storage::temporary();
        let col = storage.collection("docs").await.unwrap();
        for score in 0..5 {
            col.insert(&ObjectId::new(), &Doc { name: format!("d{score}"), score }).unwrap();
        }

        let odd: Vec<Doc> = col.find(|d: &Doc| d.score % 2 == 1).unwrap();
        let names: Vec<_> = odd.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["d1", "d3"]);

        let first: Option<Doc> = col.find_one(|d: &Doc| d.score > 2).unwrap();
        assert_eq!(first.unwrap().name, "d3");
        assert_eq!(col.find(|_: &Doc| true).unwrap().len(), 5);
    }

    #[tokio::test]
    async fn collections_are_isolated_and_share_one_handle() {
        let storage = Storage::temporary();
        let clone = storage.clone();
        let a = storage.collection("a").await.unwrap();
        let b = clone.collection("b").await.unwrap();
        a.insert(&ObjectId::new(), &Doc { name: "x".into(), score: 0 }).unwrap();
        let all = |col: &Collection| col.find(|_: &Doc| true).unwrap().len();
        assert_eq!(all(&a), 1);
        assert_eq!(all(&b), 0);

        let again = clone.collection("a").await.unwrap();
        assert_eq!(all(&again), 1);
    }
}
