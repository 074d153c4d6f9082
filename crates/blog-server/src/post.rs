use blog_shared::{AssetRef, Post, PostSummary, Role};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::Principal;
use crate::tree::{CommentArena, LikeSet, NodePath, TreeError, TreeMutator};

/// Default thread every new post starts with: (author, text), one level per entry.
const SEED_THREAD: [(&str, &str); 3] = [
    ("admin 1", "This is default comment by admin 1."),
    ("admin 2", "Reply to the comment by admin 2."),
    ("replyer_username", "Reply to the reply."),
];

pub const FIRST_VERSION: i64 = 1;

/// Stored form of a post: the comment tree stays flat until it is rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct PostRecord {
    pub id: Uuid,
    pub writer_id: Uuid,
    pub author: String,
    pub title: String,
    pub category: Option<String>,
    pub content: String,
    pub assets: Vec<AssetRef>,
    /// Version that wrote the current `assets`; their blobs live under
    /// `{id}/{asset_revision}/`.
    pub asset_revision: i64,
    /// Public URL of the cover image.
    pub image: Option<String>,
    pub likes: LikeSet,
    pub comments: CommentArena,
    pub likes_count: i64,
    pub comments_count: i64,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PostRecord {
    pub fn new(
        id: Uuid,
        writer: &Principal,
        title: String,
        category: Option<String>,
        content: String,
        assets: Vec<AssetRef>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            writer_id: writer.id,
            author: writer.username.clone(),
            title,
            category: category.as_deref().and_then(normalize_category),
            content,
            assets,
            asset_revision: FIRST_VERSION,
            image: None,
            likes: LikeSet::default(),
            comments: CommentArena::default(),
            likes_count: 0,
            comments_count: 0,
            version: FIRST_VERSION,
            created_at: now,
            updated_at: now,
        }
    }

    /// Appends the default three-level thread, authored by system principals.
    pub fn seed_thread(&mut self, mutator: &TreeMutator, now: DateTime<Utc>) -> Result<(), TreeError> {
        let mut parent: Option<NodePath> = None;
        for (username, text) in SEED_THREAD.into_iter().take(mutator.max_depth() as usize) {
            let system = Principal {
                id: Uuid::nil(),
                username: username.to_string(),
                role: Role::User,
            };
            let node = mutator.append(&mut self.comments, parent.as_ref(), text, &system, now)?;
            parent = Some(match parent {
                Some(path) => path.child(node.id),
                None => NodePath::comment(node.id),
            });
        }
        self.refresh_counters();
        Ok(())
    }

    /// Recomputes both counters from the like set and the arena.
    pub fn refresh_counters(&mut self) {
        self.likes_count = self.likes.len() as i64;
        self.comments_count = self.comments.top_level_count() as i64;
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now.max(self.created_at);
    }

    pub fn to_post(&self) -> Post {
        Post {
            id: self.id,
            writer_id: self.writer_id,
            author: self.author.clone(),
            title: self.title.clone(),
            category: self.category.clone(),
            content: self.content.clone(),
            image: self.image.clone(),
            assets: self.assets.clone(),
            likes: self.likes.to_vec(),
            likes_count: self.likes_count,
            comments: self.comments.threads(),
            comments_count: self.comments_count,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn to_summary(&self) -> PostSummary {
        PostSummary {
            id: self.id,
            writer_id: self.writer_id,
            author: self.author.clone(),
            title: self.title.clone(),
            category: self.category.clone(),
            image: self.image.clone(),
            likes_count: self.likes_count,
            comments_count: self.comments_count,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Categories are matched case-insensitively and stored lowercase; blank means none.
pub fn normalize_category(category: &str) -> Option<String> {
    let category = category.trim();
    (!category.is_empty()).then(|| category.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn writer() -> Principal {
        Principal {
            id: Uuid::from_u128(1),
            username: "writer".to_string(),
            role: Role::User,
        }
    }

    #[test]
    fn seeded_post_satisfies_counter_invariants() {
        let now = Utc::now();
        let mut post = PostRecord::new(
            Uuid::new_v4(),
            &writer(),
            "Title".to_string(),
            Some(" Rust ".to_string()),
            String::new(),
            Vec::new(),
            now,
        );
        post.seed_thread(&TreeMutator::default(), now).unwrap();

        assert_eq!(post.category.as_deref(), Some("rust"));
        assert_eq!(post.comments.len(), 3);
        assert_eq!(post.comments_count, 1);
        assert_eq!(post.likes_count, 0);

        let rendered = post.to_post();
        let thread = &rendered.comments[0];
        assert_eq!(thread.comment.text, "This is default comment by admin 1.");
        assert_eq!(thread.comment.author.user_id, Uuid::nil());
        assert_eq!(thread.replies[0].comment.author.username, "admin 2");
        assert_eq!(thread.replies[0].replies[0].comment.text, "Reply to the reply.");
    }

    #[test]
    fn seed_respects_a_shallower_depth_limit() {
        let now = Utc::now();
        let mut post = PostRecord::new(
            Uuid::new_v4(),
            &writer(),
            "Title".to_string(),
            None,
            String::new(),
            Vec::new(),
            now,
        );
        post.seed_thread(&TreeMutator::new(1), now).unwrap();

        assert_eq!(post.comments.len(), 1);
        assert_eq!(post.comments_count, 1);
    }

    #[test]
    fn blank_categories_are_dropped() {
        assert_eq!(normalize_category("  "), None);
        assert_eq!(normalize_category("Tech"), Some("tech".to_string()));
    }
}
