use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use warbler_app::data_access::{DataAccess, TIMELINE_LOAD_LIMIT};
use warbler_app::{Message, MessageId, User, UserId};
use warbler_auth::{AuthStorage, AuthenticationInfo};

struct MessageRecord {
    id: MessageId,
    user_id: UserId,
    text: String,
    timestamp: chrono::DateTime<chrono::Utc>,
}

impl MessageRecord {
    fn to_message(&self) -> Message {
        Message {
            id: self.id,
            user_id: self.user_id,
            text: self.text.clone(),
            timestamp: self.timestamp,
        }
    }
}

struct AuthRecord {
    user_id: UserId,
    phc_string: password_hash::PasswordHashString,
}

#[derive(Debug)]
pub enum Error {
    ThreadPoisonError,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ThreadPoisonError => write!(f, "Thread poisoning error"),
        }
    }
}

impl std::error::Error for Error {}

impl<T> From<PoisonError<T>> for Error {
    fn from(_value: PoisonError<T>) -> Self {
        Self::ThreadPoisonError
    }
}

/// In-memory storage for tests and the `--mock` server mode. Starts out
/// empty. Whenever several tables are touched, locks are taken in a fixed
/// order: users, messages, follows, likes, auth.
#[derive(Clone, Default)]
pub struct Db {
    users: Arc<Mutex<Vec<User>>>,
    messages: Arc<Mutex<Vec<MessageRecord>>>,
    follows: Arc<Mutex<Vec<(UserId, UserId)>>>,
    likes: Arc<Mutex<Vec<(UserId, MessageId)>>>,
    auth: Arc<Mutex<Vec<AuthRecord>>>,
}

impl Db {
    pub fn new() -> Self {
        Db::default()
    }
}

impl DataAccess for Db {
    type Error = Error;

    async fn fetch_users(&self) -> Result<Vec<User>, Error> {
        Ok(self.users.lock()?.iter().cloned().collect())
    }

    async fn fetch_user(&self, user_id: &UserId) -> Result<Option<User>, Error> {
        let res = self
            .users
            .lock()?
            .iter()
            .find(|user| user.id == *user_id)
            .cloned();
        Ok(res)
    }

    async fn create_user(&self, user: &User) -> Result<bool, Error> {
        let mut table_locked = self.users.lock()?;

        let taken = table_locked.iter().any(|record| {
            record.username.to_lowercase() == user.username.to_lowercase()
                || record.email.to_lowercase() == user.email.to_lowercase()
        });
        if taken {
            return Ok(false);
        };

        table_locked.push(user.clone());
        Ok(true)
    }

    async fn update_user(&self, user: &User) -> Result<bool, Error> {
        let mut table_locked = self.users.lock()?;
        for record in table_locked.iter_mut() {
            if record.id == user.id {
                *record = user.clone();
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn delete_user(&self, user_id: &UserId) -> Result<bool, Error> {
        let mut users = self.users.lock()?;
        let mut messages = self.messages.lock()?;
        let mut follows = self.follows.lock()?;
        let mut likes = self.likes.lock()?;
        let mut auth = self.auth.lock()?;

        let Some(position) = users.iter().position(|user| user.id == *user_id) else {
            return Ok(false);
        };

        let owned_messages: HashSet<MessageId> = messages
            .iter()
            .filter(|record| record.user_id == *user_id)
            .map(|record| record.id)
            .collect();

        likes.retain(|(liker, message_id)| {
            liker != user_id && !owned_messages.contains(message_id)
        });
        follows.retain(|(follower, followed)| follower != user_id && followed != user_id);
        messages.retain(|record| record.user_id != *user_id);
        auth.retain(|record| record.user_id != *user_id);
        users.remove(position);

        Ok(true)
    }

    async fn create_message(&self, message: &Message) -> Result<(), Error> {
        self.messages.lock()?.push(MessageRecord {
            id: message.id,
            user_id: message.user_id,
            text: message.text.clone(),
            timestamp: message.timestamp,
        });
        Ok(())
    }

    async fn fetch_message(&self, message_id: &MessageId) -> Result<Option<Message>, Error> {
        let res = self
            .messages
            .lock()?
            .iter()
            .find(|record| record.id == *message_id)
            .map(MessageRecord::to_message);
        Ok(res)
    }

    async fn fetch_user_messages(&self, user_id: &UserId) -> Result<Vec<Message>, Error> {
        let res = self
            .messages
            .lock()?
            .iter()
            .rev()
            .filter(|record| record.user_id == *user_id)
            .map(MessageRecord::to_message)
            .collect();
        Ok(res)
    }

    async fn fetch_timeline(&self, user_id: &UserId) -> Result<Vec<Message>, Error> {
        let followed: HashSet<UserId> = self
            .follows
            .lock()?
            .iter()
            .filter(|(follower, _)| follower == user_id)
            .map(|(_, followed)| *followed)
            .collect();

        let res = self
            .messages
            .lock()?
            .iter()
            .rev()
            .filter(|record| record.user_id == *user_id || followed.contains(&record.user_id))
            .take(TIMELINE_LOAD_LIMIT as usize)
            .map(MessageRecord::to_message)
            .collect();
        Ok(res)
    }

    async fn delete_message(&self, message_id: &MessageId) -> Result<bool, Error> {
        let mut messages = self.messages.lock()?;
        let mut likes = self.likes.lock()?;

        let Some(position) = messages.iter().position(|record| record.id == *message_id) else {
            return Ok(false);
        };

        likes.retain(|(_, liked)| liked != message_id);
        messages.remove(position);
        Ok(true)
    }

    async fn create_follow(&self, follower_id: &UserId, followed_id: &UserId) -> Result<bool, Error> {
        let mut table_locked = self.follows.lock()?;
        let edge = (*follower_id, *followed_id);
        if table_locked.contains(&edge) {
            return Ok(false);
        }
        table_locked.push(edge);
        Ok(true)
    }

    async fn delete_follow(&self, follower_id: &UserId, followed_id: &UserId) -> Result<bool, Error> {
        let mut table_locked = self.follows.lock()?;
        let before = table_locked.len();
        table_locked.retain(|(follower, followed)| {
            !(follower == follower_id && followed == followed_id)
        });
        Ok(table_locked.len() < before)
    }

    async fn follow_exists(&self, follower_id: &UserId, followed_id: &UserId) -> Result<bool, Error> {
        let res = self
            .follows
            .lock()?
            .contains(&(*follower_id, *followed_id));
        Ok(res)
    }

    async fn fetch_following(&self, user_id: &UserId) -> Result<Vec<User>, Error> {
        let users = self.users.lock()?;
        let res = self
            .follows
            .lock()?
            .iter()
            .filter(|(follower, _)| follower == user_id)
            .filter_map(|(_, followed)| users.iter().find(|user| user.id == *followed).cloned())
            .collect();
        Ok(res)
    }

    async fn fetch_followers(&self, user_id: &UserId) -> Result<Vec<User>, Error> {
        let users = self.users.lock()?;
        let res = self
            .follows
            .lock()?
            .iter()
            .filter(|(_, followed)| followed == user_id)
            .filter_map(|(follower, _)| users.iter().find(|user| user.id == *follower).cloned())
            .collect();
        Ok(res)
    }

    async fn create_like(&self, user_id: &UserId, message_id: &MessageId) -> Result<bool, Error> {
        let mut table_locked = self.likes.lock()?;
        let edge = (*user_id, *message_id);
        if table_locked.contains(&edge) {
            return Ok(false);
        }
        table_locked.push(edge);
        Ok(true)
    }

    async fn delete_like(&self, user_id: &UserId, message_id: &MessageId) -> Result<bool, Error> {
        let mut table_locked = self.likes.lock()?;
        let before = table_locked.len();
        table_locked.retain(|(liker, liked)| !(liker == user_id && liked == message_id));
        Ok(table_locked.len() < before)
    }

    async fn fetch_liked_messages(&self, user_id: &UserId) -> Result<Vec<Message>, Error> {
        let messages = self.messages.lock()?;
        let liked: HashSet<MessageId> = self
            .likes
            .lock()?
            .iter()
            .filter(|(liker, _)| liker == user_id)
            .map(|(_, message_id)| *message_id)
            .collect();

        let res = messages
            .iter()
            .rev()
            .filter(|record| liked.contains(&record.id))
            .map(MessageRecord::to_message)
            .collect();
        Ok(res)
    }
}

impl AuthStorage for Db {
    type Error = Error;

    async fn fetch_authentication(
        &self,
        user_id: &UserId,
    ) -> Result<Option<AuthenticationInfo>, Error> {
        let res = self
            .auth
            .lock()?
            .iter()
            .find(|record| record.user_id == *user_id)
            .map(|record| AuthenticationInfo::from(record.phc_string.clone()));
        Ok(res)
    }

    async fn update_authentication(
        &self,
        user_id: &UserId,
        auth_info: AuthenticationInfo,
    ) -> Result<Option<AuthenticationInfo>, Error> {
        let mut table_locked = self.auth.lock()?;
        for record in table_locked.iter_mut() {
            if record.user_id == *user_id {
                let old_auth = record.phc_string.clone();
                record.phc_string = auth_info.phc_string().clone();
                return Ok(Some(old_auth.into()));
            };
        }
        table_locked.push(AuthRecord {
            user_id: *user_id,
            phc_string: auth_info.phc_string().clone(),
        });
        Ok(None)
    }
}
