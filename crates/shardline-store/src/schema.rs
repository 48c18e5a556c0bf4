//! Reference DDL for the three per-shard tables.
//!
//! Every shard is an identically-shaped Postgres database; nothing here is
//! executed automatically; operators apply it (or an equivalent migration)
//! when provisioning a new shard. Kept as constants rather than a `.sql`
//! file so the statement contract in [`crate::pg`] and the schema it
//! depends on stay in the same crate.

pub const CREATE_POSTS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS posts (
    id UUID PRIMARY KEY,
    user_id TEXT NOT NULL,
    content TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL
)";

pub const CREATE_POSTS_USER_ID_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS posts_user_id_created_at_idx ON posts (user_id, created_at DESC)";

pub const CREATE_POSTS_RECENCY_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS posts_created_at_idx ON posts (created_at DESC, id ASC)";

pub const CREATE_COMMENTS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS comments (
    id UUID PRIMARY KEY,
    post_id UUID NOT NULL,
    user_id TEXT NOT NULL,
    content TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL
)";

pub const CREATE_COMMENTS_POST_ID_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS comments_post_id_created_at_idx ON comments (post_id, created_at ASC)";

pub const CREATE_LIKES_TABLE: &str = "
CREATE TABLE IF NOT EXISTS likes (
    id UUID PRIMARY KEY,
    post_id UUID NOT NULL,
    user_id TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    UNIQUE (post_id, user_id)
)";

pub const CREATE_LIKES_POST_ID_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS likes_post_id_idx ON likes (post_id)";

pub const CREATE_LIKES_USER_ID_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS likes_user_id_idx ON likes (user_id)";

/// All statements in dependency order, for a one-shot provisioning script.
pub const ALL_STATEMENTS: &[&str] = &[
    CREATE_POSTS_TABLE,
    CREATE_POSTS_USER_ID_INDEX,
    CREATE_POSTS_RECENCY_INDEX,
    CREATE_COMMENTS_TABLE,
    CREATE_COMMENTS_POST_ID_INDEX,
    CREATE_LIKES_TABLE,
    CREATE_LIKES_POST_ID_INDEX,
    CREATE_LIKES_USER_ID_INDEX,
];
