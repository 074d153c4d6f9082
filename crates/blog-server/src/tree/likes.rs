use blog_shared::Like;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::TreeError;
use crate::auth::Principal;

/// Likes of one post, at most one per principal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LikeSet(Vec<Like>);

impl LikeSet {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, user_id: Uuid) -> bool {
        self.0.iter().any(|like| like.user_id == user_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Like> {
        self.0.iter()
    }

    pub fn to_vec(&self) -> Vec<Like> {
        self.0.clone()
    }

    pub fn add(&mut self, principal: &Principal, now: DateTime<Utc>) -> Result<(), TreeError> {
        if self.contains(principal.id) {
            return Err(TreeError::AlreadyLiked);
        }
        self.0.push(Like {
            user_id: principal.id,
            username: principal.username.clone(),
            created_at: now,
        });
        Ok(())
    }

    pub fn remove(&mut self, principal: &Principal) -> Result<(), TreeError> {
        let before = self.0.len();
        self.0.retain(|like| like.user_id != principal.id);
        if self.0.len() == before {
            return Err(TreeError::NotLiked);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use blog_shared::Role;

    use super::*;

    fn principal(n: u128) -> Principal {
        Principal {
            id: Uuid::from_u128(n),
            username: format!("user{n}"),
            role: Role::User,
        }
    }

    #[test]
    fn one_like_per_principal() {
        let mut likes = LikeSet::default();
        let now = Utc::now();

        likes.add(&principal(1), now).unwrap();
        likes.add(&principal(2), now).unwrap();
        assert_eq!(likes.add(&principal(1), now), Err(TreeError::AlreadyLiked));
        assert_eq!(likes.len(), 2);
        assert_eq!(likes.iter().next().unwrap().username, "user1");
    }

    #[test]
    fn unlike_requires_an_existing_like() {
        let mut likes = LikeSet::default();

        assert_eq!(likes.remove(&principal(1)), Err(TreeError::NotLiked));

        likes.add(&principal(1), Utc::now()).unwrap();
        likes.remove(&principal(1)).unwrap();
        assert!(likes.is_empty());
        assert!(!likes.contains(Uuid::from_u128(1)));
    }
}
