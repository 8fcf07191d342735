use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Mutex;

use crate::ids::Base62IdGenerator;
use crate::{CoreError, IdGenerator, Profile, ProfileId, ProfileRepository};

/// Simple in-memory profile store. A single mutex guards the whole map.
pub struct InMemoryProfileRepo<G: IdGenerator = Base62IdGenerator> {
    inner: Mutex<BTreeMap<ProfileId, Profile>>,
    ids: G,
}

impl InMemoryProfileRepo {
    pub fn new() -> Self {
        Self::with_generator(Base62IdGenerator::default())
    }
}

impl<G: IdGenerator> InMemoryProfileRepo<G> {
    pub fn with_generator(ids: G) -> Self {
        Self {
            inner: Mutex::new(BTreeMap::new()),
            ids,
        }
    }

    fn locked(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<ProfileId, Profile>>, CoreError> {
        self.inner
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))
    }

    fn save_now(&self, mut profile: Profile) -> Result<Profile, CoreError> {
        let mut map = self.locked()?;
        let id = match profile.id.take() {
            Some(id) => id,
            None => {
                // Counter ids never repeat, but a caller may have upserted
                // an explicit id that collides with a generated one.
                let mut id = self.ids.next_id();
                while map.contains_key(&id) {
                    id = self.ids.next_id();
                }
                id
            }
        };
        let stored = Profile::with_id(id.clone(), profile.email);
        map.insert(id, stored.clone());
        Ok(stored)
    }
}

impl Default for InMemoryProfileRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: IdGenerator> ProfileRepository for InMemoryProfileRepo<G> {
    fn find_all(&self) -> impl Future<Output = Result<Vec<Profile>, CoreError>> + Send {
        let res = self.locked().map(|map| map.values().cloned().collect());
        async move { res }
    }

    fn find_by_id(
        &self,
        id: &ProfileId,
    ) -> impl Future<Output = Result<Option<Profile>, CoreError>> + Send {
        let res = self.locked().map(|map| map.get(id).cloned());
        async move { res }
    }

    fn save(&self, profile: Profile) -> impl Future<Output = Result<Profile, CoreError>> + Send {
        let res = self.save_now(profile);
        async move { res }
    }

    fn delete_by_id(&self, id: &ProfileId) -> impl Future<Output = Result<(), CoreError>> + Send {
        let res = self.locked().map(|mut map| {
            map.remove(id);
        });
        async move { res }
    }

    fn delete_all(&self) -> impl Future<Output = Result<(), CoreError>> + Send {
        let res = self.locked().map(|mut map| map.clear());
        async move { res }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_assigns_id_and_find_returns_it() {
        let repo = InMemoryProfileRepo::new();
        let saved = repo.save(Profile::new("a@x.com")).await.unwrap();
        let id = saved.id.clone().expect("id assigned");

        let got = repo.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(got, saved);
    }

    #[tokio::test]
    async fn save_with_id_overwrites() {
        let repo = InMemoryProfileRepo::new();
        let saved = repo.save(Profile::new("a@x.com")).await.unwrap();
        let id = saved.id.clone().unwrap();

        repo.save(Profile::with_id(id.clone(), "b@x.com")).await.unwrap();
        let all = repo.find_all().await.unwrap();
        assert_eq!(all, vec![Profile::with_id(id, "b@x.com")]);
    }

    #[tokio::test]
    async fn save_with_unknown_id_inserts() {
        let repo = InMemoryProfileRepo::new();
        let id = ProfileId::new("explicit").unwrap();
        repo.save(Profile::with_id(id.clone(), "a@x.com")).await.unwrap();
        assert!(repo.find_by_id(&id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn generated_id_skips_taken_ones() {
        let repo = InMemoryProfileRepo::with_generator(Base62IdGenerator::new(0));
        // "0" is what the generator hands out first
        repo.save(Profile::with_id(ProfileId::new("0").unwrap(), "taken@x.com"))
            .await
            .unwrap();
        let saved = repo.save(Profile::new("a@x.com")).await.unwrap();
        assert_eq!(saved.id.unwrap().as_str(), "1");
        assert_eq!(repo.find_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn delete_by_id_is_idempotent() {
        let repo = InMemoryProfileRepo::new();
        let id = repo.save(Profile::new("a@x.com")).await.unwrap().id.unwrap();

        repo.delete_by_id(&id).await.unwrap();
        repo.delete_by_id(&id).await.unwrap();
        assert_eq!(repo.find_by_id(&id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_all_wipes() {
        let repo = InMemoryProfileRepo::new();
        for i in 0..3 {
            repo.save(Profile::new(format!("{i}@x.com"))).await.unwrap();
        }
        repo.delete_all().await.unwrap();
        assert!(repo.find_all().await.unwrap().is_empty());
    }
}
