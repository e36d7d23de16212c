use crate::{Result, User, store::BookingStore};

/// Demo account names, created in this order so they get ids 1 and 2 on an
/// empty store.
pub const DEMO_USERNAMES: [&str; 2] = ["admin", "user"];

/// Creates the demo users that are missing.
pub async fn seed_demo_users<S: BookingStore + ?Sized>(store: &S) -> Result<Vec<User>> {
    let mut created = Vec::new();
    for username in DEMO_USERNAMES {
        if store.find_user_by_username(username).await?.is_none() {
            created.push(store.insert_user(username).await?);
        }
    }
    if !created.is_empty() {
        tracing::info!(count = created.len(), "seeded demo users");
    }
    Ok(created)
}
