//! Demo sample data.
//!
//! Runs once per process, after the server socket is bound, and only when
//! the `demo` mode is active. Writes go straight to the repository, so no
//! creation events are published.

use domain::{CoreError, Profile, ProfileRepository};
use tracing::info;

/// Emails of the sample profiles, in insertion order.
pub const SAMPLE_EMAILS: [&str; 4] = ["A@email.com", "B@email.com", "C@email.com", "D@email.com"];

/// Wipe the store, insert the sample profiles one by one, then log and
/// return whatever the store now holds.
pub async fn seed_sample_data<R: ProfileRepository>(repo: &R) -> Result<Vec<Profile>, CoreError> {
    repo.delete_all().await?;
    for email in SAMPLE_EMAILS {
        repo.save(Profile::new(email)).await?;
    }
    let stored = repo.find_all().await?;
    for profile in &stored {
        let id = profile.id.as_ref().map(|id| id.as_str()).unwrap_or("-");
        info!(id = %id, email = %profile.email, "seeded profile");
    }
    info!(count = stored.len(), "sample data ready");
    Ok(stored)
}
