use shardline_core::{CommentId, LikeId, PostId, Timestamp};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRow {
    pub id: PostId,
    pub user_id: String,
    pub content: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentRow {
    pub id: CommentId,
    pub post_id: PostId,
    pub user_id: String,
    pub content: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikeRow {
    pub id: LikeId,
    pub post_id: PostId,
    pub user_id: String,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UserStats {
    pub post_count: i64,
    pub comment_count: i64,
    pub like_count: i64,
}

impl PostRow {
    /// `updated_at >= created_at` is an invariant maintained on every
    /// mutation; checked here so both the real and fake store can assert it
    /// in the same place.
    pub fn invariant_holds(&self) -> bool {
        self.updated_at >= self.created_at
    }
}

impl CommentRow {
    pub fn invariant_holds(&self) -> bool {
        self.updated_at >= self.created_at
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn post_row_invariant_holds_on_creation() {
        let now = Utc::now();
        let row = PostRow {
            id: PostId::generate(),
            user_id: "alice".into(),
            content: "hi".into(),
            created_at: now,
            updated_at: now,
        };
        assert!(row.invariant_holds());
    }

    #[test]
    fn post_row_invariant_violated_when_updated_before_created() {
        let now = Utc::now();
        let row = PostRow {
            id: PostId::generate(),
            user_id: "alice".into(),
            content: "hi".into(),
            created_at: now,
            updated_at: now - chrono::Duration::seconds(1),
        };
        assert!(!row.invariant_holds());
    }

    #[test]
    fn comment_row_invariant_holds_on_creation() {
        let now = Utc::now();
        let row = CommentRow {
            id: CommentId::generate(),
            post_id: PostId::generate(),
            user_id: "bob".into(),
            content: "nice".into(),
            created_at: now,
            updated_at: now,
        };
        assert!(row.invariant_holds());
    }
}
