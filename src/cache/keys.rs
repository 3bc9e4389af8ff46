/// Cache key builders
///
/// Every key the core reads or invalidates is built here. The grammar is part
/// of the external interface (other services invalidate against it), so these
/// strings must not drift: population and invalidation agree on a key only
/// because both call the same builder.
///
/// Keys are hierarchical (`entity:{id}`, `entity:relation:{id}`,
/// `entity:list:{qualifier}`) so a single wildcard covers a whole family.

pub fn user(id: &str) -> String {
    format!("user:{}", id)
}

pub fn user_email(email: &str) -> String {
    format!("user:email:{}", email)
}

pub fn user_username(username: &str) -> String {
    format!("user:username:{}", username)
}

pub fn user_relationships(id: &str) -> String {
    format!("user:relationships:{}", id)
}

pub fn user_followers(id: &str) -> String {
    format!("user:followers:{}", id)
}

pub fn user_following(id: &str) -> String {
    format!("user:following:{}", id)
}

pub fn is_following(follower: &str, followee: &str) -> String {
    format!("isFollowing:{}:{}", follower, followee)
}

pub fn users_all(exclude: Option<&str>) -> String {
    match exclude {
        Some(id) => format!("users:all:exclude:{}", id),
        None => "users:all".to_string(),
    }
}

pub fn users_search(query: &str) -> String {
    format!("users:search:{}", query)
}

pub fn dataset(id: &str) -> String {
    format!("dataset:{}", id)
}

pub fn datasets_all() -> String {
    "datasets:all".to_string()
}

pub fn datasets_approved() -> String {
    "datasets:approved".to_string()
}

/// Social composite for a dataset as seen by `viewer`; anonymous readers
/// share one `anon` slot.
pub fn dataset_social(id: &str, viewer: Option<&str>) -> String {
    format!("dataset:social:{}:{}", id, viewer.unwrap_or("anon"))
}

pub fn dataset_votes(id: &str) -> String {
    format!("dataset:votes:{}", id)
}

pub fn dataset_followers(id: &str) -> String {
    format!("dataset:followers:{}", id)
}

pub fn user_datasets(owner_id: &str) -> String {
    format!("user:datasets:{}", owner_id)
}

// Invalidation patterns. A new user or dataset can surface in any listing or
// search result, so creation fans out to the whole entity family.

pub fn user_pattern() -> String {
    "user:*".to_string()
}

pub fn users_pattern() -> String {
    "users:*".to_string()
}

pub fn users_all_pattern() -> String {
    "users:all*".to_string()
}

pub fn dataset_pattern() -> String {
    "dataset:*".to_string()
}

pub fn datasets_pattern() -> String {
    "datasets:*".to_string()
}

pub fn dataset_social_pattern(id: &str) -> String {
    format!("dataset:social:{}:*", id)
}

pub fn is_following_source_pattern(id: &str) -> String {
    format!("isFollowing:{}:*", id)
}

pub fn is_following_target_pattern(id: &str) -> String {
    format!("isFollowing:*:{}", id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_grammar() {
        assert_eq!(user("u1"), "user:u1");
        assert_eq!(user_email("a@b.c"), "user:email:a@b.c");
        assert_eq!(user_username("alice"), "user:username:alice");
        assert_eq!(user_relationships("u1"), "user:relationships:u1");
        assert_eq!(is_following("u1", "u2"), "isFollowing:u1:u2");
        assert_eq!(users_all(None), "users:all");
        assert_eq!(users_all(Some("u1")), "users:all:exclude:u1");
        assert_eq!(users_search("ali"), "users:search:ali");
        assert_eq!(dataset("d1"), "dataset:d1");
        assert_eq!(datasets_all(), "datasets:all");
        assert_eq!(datasets_approved(), "datasets:approved");
        assert_eq!(dataset_social("d1", Some("u1")), "dataset:social:d1:u1");
        assert_eq!(dataset_social("d1", None), "dataset:social:d1:anon");
        assert_eq!(dataset_votes("d1"), "dataset:votes:d1");
        assert_eq!(dataset_followers("d1"), "dataset:followers:d1");
        assert_eq!(user_datasets("u1"), "user:datasets:u1");
    }

    #[test]
    fn test_patterns_cover_their_keys() {
        // The users:all* pattern must cover both the plain and exclude forms.
        assert!(users_all(None).starts_with("users:all"));
        assert!(users_all(Some("u1")).starts_with("users:all"));
        // The social pattern covers every viewer slot, anonymous included.
        assert!(dataset_social("d1", None).starts_with("dataset:social:d1:"));
        assert!(dataset_social("d1", Some("u9")).starts_with("dataset:social:d1:"));
    }
}
