use std::sync::Arc;

use crate::events::{EventPublisher, ProfileEvent};
use crate::{CoreError, Profile, ProfileId, ProfileRepository};

/// Application service orchestrating profile use cases.
///
/// Every call goes straight to the repository; nothing is cached between
/// calls. Store errors are returned unchanged, there is no retry.
pub struct ProfileService<R: ProfileRepository> {
    repo: R,
    events: Arc<EventPublisher>,
}

impl<R: ProfileRepository> ProfileService<R> {
    pub fn new(repo: R, events: Arc<EventPublisher>) -> Self {
        Self { repo, events }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// List every stored profile.
    pub async fn all(&self) -> Result<Vec<Profile>, CoreError> {
        self.repo.find_all().await
    }

    /// Fetch a single profile.
    pub async fn get(&self, id: &ProfileId) -> Result<Option<Profile>, CoreError> {
        self.repo.find_by_id(id).await
    }

    /// Store a new profile and announce it.
    ///
    /// The `Created` event is published after the store acknowledged the
    /// write and before this call returns. A failed save publishes nothing,
    /// and a failing listener does not undo the save.
    pub async fn create(&self, email: &str) -> Result<Profile, CoreError> {
        let saved = self.repo.save(Profile::new(email)).await?;
        self.events.publish(&ProfileEvent::Created(saved.clone()));
        Ok(saved)
    }

    /// Replace the email of an existing profile.
    ///
    /// Returns `Ok(None)` without writing anything when `id` is unknown.
    pub async fn update(&self, id: &ProfileId, email: &str) -> Result<Option<Profile>, CoreError> {
        let Some(existing) = self.repo.find_by_id(id).await? else {
            return Ok(None);
        };
        let id = existing.id.unwrap_or_else(|| id.clone());
        let saved = self.repo.save(Profile::with_id(id, email)).await?;
        Ok(Some(saved))
    }

    /// Remove a profile and hand back the value it had before removal.
    ///
    /// Returns `Ok(None)` when `id` is unknown.
    pub async fn delete(&self, id: &ProfileId) -> Result<Option<Profile>, CoreError> {
        let Some(existing) = self.repo.find_by_id(id).await? else {
            return Ok(None);
        };
        self.repo.delete_by_id(id).await?;
        Ok(Some(existing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_repo::InMemoryProfileRepo;
    use crate::events::RecordingListener;

    fn service() -> (ProfileService<InMemoryProfileRepo>, Arc<RecordingListener>) {
        let events = Arc::new(EventPublisher::new());
        let recorder = Arc::new(RecordingListener::new());
        events.subscribe(recorder.clone());
        (ProfileService::new(InMemoryProfileRepo::new(), events), recorder)
    }

    fn saved_id(p: &Profile) -> ProfileId {
        p.id.clone().expect("store assigns an id")
    }

    /// Repository whose every call fails as if the store were down.
    struct BrokenRepo;

    impl ProfileRepository for BrokenRepo {
        async fn find_all(&self) -> Result<Vec<Profile>, CoreError> {
            Err(CoreError::StoreUnavailable("down".into()))
        }

        async fn find_by_id(&self, _id: &ProfileId) -> Result<Option<Profile>, CoreError> {
            Err(CoreError::StoreUnavailable("down".into()))
        }

        async fn save(&self, _profile: Profile) -> Result<Profile, CoreError> {
            Err(CoreError::StoreUnavailable("down".into()))
        }

        async fn delete_by_id(&self, _id: &ProfileId) -> Result<(), CoreError> {
            Err(CoreError::StoreUnavailable("down".into()))
        }

        async fn delete_all(&self) -> Result<(), CoreError> {
            Err(CoreError::StoreUnavailable("down".into()))
        }
    }

    #[tokio::test]
    async fn create_then_get_returns_same_profile() {
        let (svc, _) = service();
        let created = svc.create("a@x.com").await.unwrap();
        let id = saved_id(&created);

        let got = svc.get(&id).await.unwrap().expect("profile exists");
        assert_eq!(got.id, Some(id));
        assert_eq!(got.email, "a@x.com");
    }

    #[tokio::test]
    async fn create_publishes_exactly_one_event_with_assigned_id() {
        let (svc, recorder) = service();
        let created = svc.create("a@x.com").await.unwrap();

        let events = recorder.events();
        assert_eq!(events, vec![ProfileEvent::Created(created.clone())]);
        assert!(events[0].profile().is_persisted());
    }

    #[tokio::test]
    async fn failed_save_publishes_nothing() {
        let events = Arc::new(EventPublisher::new());
        let recorder = Arc::new(RecordingListener::new());
        events.subscribe(recorder.clone());
        let svc = ProfileService::new(BrokenRepo, events);

        let err = svc.create("a@x.com").await.unwrap_err();
        assert!(matches!(err, CoreError::StoreUnavailable(_)));
        assert!(recorder.events().is_empty());
    }

    #[tokio::test]
    async fn listener_panic_keeps_the_saved_profile() {
        let events = Arc::new(EventPublisher::new());
        events.subscribe(Arc::new(|_: &ProfileEvent| panic!("listener bug")));
        let svc = ProfileService::new(InMemoryProfileRepo::new(), events);

        let created = svc.create("a@x.com").await.unwrap();
        let id = saved_id(&created);
        assert_eq!(svc.get(&id).await.unwrap(), Some(created));
    }

    #[tokio::test]
    async fn store_errors_propagate_from_every_operation() {
        let svc = ProfileService::new(BrokenRepo, Arc::new(EventPublisher::new()));
        let id = ProfileId::new("x").unwrap();
        assert!(svc.all().await.is_err());
        assert!(svc.get(&id).await.is_err());
        assert!(svc.update(&id, "b@x.com").await.is_err());
        assert!(svc.delete(&id).await.is_err());
    }

    #[tokio::test]
    async fn update_replaces_email_and_keeps_id() {
        let (svc, recorder) = service();
        let id = saved_id(&svc.create("a@x.com").await.unwrap());

        let updated = svc.update(&id, "b@x.com").await.unwrap().expect("exists");
        assert_eq!(updated, Profile::with_id(id.clone(), "b@x.com"));
        assert_eq!(svc.get(&id).await.unwrap().unwrap().email, "b@x.com");
        assert_eq!(svc.all().await.unwrap().len(), 1);
        // Updates are not announced
        assert_eq!(recorder.events().len(), 1);
    }

    #[tokio::test]
    async fn update_missing_id_is_noop() {
        let (svc, _) = service();
        let missing = ProfileId::new("missing").unwrap();

        assert_eq!(svc.update(&missing, "b@x.com").await.unwrap(), None);
        assert_eq!(svc.get(&missing).await.unwrap(), None);
        assert!(svc.all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_returns_snapshot_and_removes() {
        let (svc, _) = service();
        let created = svc.create("a@x.com").await.unwrap();
        let id = saved_id(&created);

        let deleted = svc.delete(&id).await.unwrap();
        assert_eq!(deleted, Some(created));
        assert_eq!(svc.get(&id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_missing_id_is_idempotent() {
        let (svc, _) = service();
        let keep = svc.create("keep@x.com").await.unwrap();
        let missing = ProfileId::new("missing").unwrap();

        assert_eq!(svc.delete(&missing).await.unwrap(), None);
        assert_eq!(svc.delete(&missing).await.unwrap(), None);
        assert_eq!(svc.all().await.unwrap(), vec![keep]);
    }

    #[tokio::test]
    async fn create_update_delete_scenario() {
        let (svc, _) = service();
        let x = saved_id(&svc.create("a@x.com").await.unwrap());

        let all = svc.all().await.unwrap();
        assert_eq!(all, vec![Profile::with_id(x.clone(), "a@x.com")]);

        svc.update(&x, "b@x.com").await.unwrap();
        assert_eq!(svc.get(&x).await.unwrap().unwrap().email, "b@x.com");

        svc.delete(&x).await.unwrap();
        assert_eq!(svc.get(&x).await.unwrap(), None);
        assert!(svc.all().await.unwrap().iter().all(|p| p.id.as_ref() != Some(&x)));
    }
}
