use std::collections::HashMap;
use tokio::sync::RwLock;
use yol_core::{HolderProfile, UserId};

#[derive(Debug, Clone, PartialEq)]
pub struct UserProfile {
    pub user_id: UserId,
    pub phone: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub rating: Option<f32>,
}

impl UserProfile {
    pub fn holder_profile(&self) -> HolderProfile {
        HolderProfile {
            user_id: self.user_id.as_str().to_string(),
            display_name: self.display_name.clone(),
            avatar_url: self.avatar_url.clone(),
            rating: self.rating,
        }
    }
}

/// Users known to the backend, keyed by id and by phone.
#[derive(Debug, Default)]
pub struct UserDirectory {
    inner: RwLock<Directory>,
}

#[derive(Debug, Default)]
struct Directory {
    by_id: HashMap<UserId, UserProfile>,
    by_phone: HashMap<String, UserId>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find the user for `phone`, creating one on first sign-in.
    ///
    /// A non-empty `display_name` replaces the stored one.
    pub async fn upsert_by_phone(&self, phone: &str, display_name: Option<&str>) -> UserProfile {
        let phone = normalize_phone(phone);
        let mut dir = self.inner.write().await;

        if let Some(id) = dir.by_phone.get(&phone).cloned() {
            if let Some(profile) = dir.by_id.get_mut(&id) {
                if let Some(name) = display_name.filter(|n| !n.trim().is_empty()) {
                    profile.display_name = name.trim().to_string();
                }
                return profile.clone();
            }
        }

        let profile = UserProfile {
            user_id: UserId::new(format!("u-{}", uuid::Uuid::new_v4().simple())),
            display_name: display_name
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .unwrap_or(&phone)
                .to_string(),
            phone: phone.clone(),
            avatar_url: None,
            rating: None,
        };
        dir.by_phone.insert(phone, profile.user_id.clone());
        dir.by_id.insert(profile.user_id.clone(), profile.clone());
        tracing::info!(user_id = %profile.user_id, "registered new user");
        profile
    }

    pub async fn get(&self, id: &UserId) -> Option<UserProfile> {
        self.inner.read().await.by_id.get(id).cloned()
    }

    /// Snapshot of holder profiles, for rendering many seats at once.
    pub async fn profiles(&self) -> HashMap<UserId, HolderProfile> {
        self.inner
            .read()
            .await
            .by_id
            .iter()
            .map(|(id, p)| (id.clone(), p.holder_profile()))
            .collect()
    }
}

fn normalize_phone(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit() || *c == '+').collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_same_phone_same_user() {
        let dir = UserDirectory::new();
        let first = dir.upsert_by_phone("+998 90 123-45-67", Some("Bekzod")).await;
        let again = dir.upsert_by_phone("+998901234567", None).await;

        assert_eq!(first.user_id, again.user_id);
        assert_eq!(again.display_name, "Bekzod");
        assert_eq!(again.phone, "+998901234567");
    }

    #[tokio::test]
    async fn test_name_defaults_to_phone_and_updates() {
        let dir = UserDirectory::new();
        let user = dir.upsert_by_phone("+998711112233", Some("  ")).await;
        assert_eq!(user.display_name, "+998711112233");

        let renamed = dir.upsert_by_phone("+998711112233", Some("Gulnora")).await;
        assert_eq!(renamed.display_name, "Gulnora");
        assert_eq!(dir.profiles().await[&user.user_id].display_name, "Gulnora");
    }
}
