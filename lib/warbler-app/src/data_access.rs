use std::future::Future;

use crate::{Message, MessageId, User, UserId};

/// How many messages a single timeline page loads at most.
pub const TIMELINE_LOAD_LIMIT: i64 = 100;

// written as a macro to use Self::Error
macro_rules! async_result {
    ($t:ty) => {
        impl Future<Output = Result<$t, Self::Error>> + Send
    };
}

/// Storage seam for the four tables: users, messages, follows, likes.
///
/// Edge creation returns `false` when the edge (or, for `create_user`, the
/// username/email) already exists; deletion returns `false` when there was
/// nothing to delete. Username and email comparisons are case-insensitive.
///
/// `delete_user` and `delete_message` must remove all dependent rows (likes,
/// follow edges, owned messages and their likes, authentication) together
/// with the row itself, atomically.
pub trait DataAccess: 'static + Send + Sync + Clone {
    type Error: 'static + std::error::Error + Send + Sync;

    fn fetch_users(&self) -> async_result!(Vec<User>);
    fn fetch_user(&self, user_id: &UserId) -> async_result!(Option<User>);
    fn find_user_by_username(&self, requested_username: &str) -> async_result!(Option<UserId>) {
        async move {
            let res = self
                .fetch_users()
                .await?
                .into_iter()
                .filter_map(|user| {
                    if user.username.to_lowercase() == requested_username.to_lowercase() {
                        Some(user.id)
                    } else {
                        None
                    }
                })
                .next();
            Ok(res)
        }
    }
    fn find_user_by_email(&self, requested_email: &str) -> async_result!(Option<UserId>) {
        async move {
            let res = self
                .fetch_users()
                .await?
                .into_iter()
                .filter_map(|user| {
                    if user.email.to_lowercase() == requested_email.to_lowercase() {
                        Some(user.id)
                    } else {
                        None
                    }
                })
                .next();
            Ok(res)
        }
    }
    fn find_users_by_substring(&self, substring: &str) -> async_result!(Vec<User>) {
        async {
            let search_query = substring.to_lowercase();
            let res = self
                .fetch_users()
                .await?
                .into_iter()
                .filter(|user| user.username.to_lowercase().contains(&search_query))
                .collect();
            Ok(res)
        }
    }
    fn create_user(&self, user: &User) -> async_result!(bool);
    fn update_user(&self, user: &User) -> async_result!(bool);
    fn delete_user(&self, user_id: &UserId) -> async_result!(bool);

    fn create_message(&self, message: &Message) -> async_result!(());
    fn fetch_message(&self, message_id: &MessageId) -> async_result!(Option<Message>);
    /// A user's own messages, newest first.
    fn fetch_user_messages(&self, user_id: &UserId) -> async_result!(Vec<Message>);
    /// The user's and their followed users' messages, newest first,
    /// capped at [`TIMELINE_LOAD_LIMIT`].
    fn fetch_timeline(&self, user_id: &UserId) -> async_result!(Vec<Message>);
    fn delete_message(&self, message_id: &MessageId) -> async_result!(bool);

    fn create_follow(&self, follower_id: &UserId, followed_id: &UserId) -> async_result!(bool);
    fn delete_follow(&self, follower_id: &UserId, followed_id: &UserId) -> async_result!(bool);
    fn follow_exists(&self, follower_id: &UserId, followed_id: &UserId) -> async_result!(bool);
    fn fetch_following(&self, user_id: &UserId) -> async_result!(Vec<User>);
    fn fetch_followers(&self, user_id: &UserId) -> async_result!(Vec<User>);

    fn create_like(&self, user_id: &UserId, message_id: &MessageId) -> async_result!(bool);
    fn delete_like(&self, user_id: &UserId, message_id: &MessageId) -> async_result!(bool);
    fn fetch_liked_messages(&self, user_id: &UserId) -> async_result!(Vec<Message>);
}
