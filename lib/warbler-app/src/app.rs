use anyhow::Context;
use uuid::Uuid;

use crate::authorization::AuthService;
use crate::data_access::DataAccess;
use crate::error::{Error, Result};
use crate::{
    Message, MessageId, NewUser, ProfileUpdate, User, UserId, DEFAULT_HEADER_IMAGE_URL,
    DEFAULT_IMAGE_URL, MESSAGE_MAX_LENGTH,
};

/// The application service. Owns every invariant of the social graph:
/// identity uniqueness, bounded message text, no self-follow, idempotent
/// follow/like, ordered cascade deletes.
#[derive(Clone)]
pub struct Warbler<D, A> {
    data_access: D,
    auth_service: A,
}

impl<D: DataAccess, A> Warbler<D, A> {
    pub fn new(data_access: D, auth_service: A) -> Self {
        Warbler {
            data_access,
            auth_service,
        }
    }

    pub async fn fetch_user(&self, user_id: &UserId) -> Result<Option<User>> {
        let user = self
            .data_access
            .fetch_user(user_id)
            .await
            .with_context(|| format!("Couldn't fetch user with id {user_id}"))?;
        Ok(user)
    }

    pub async fn fetch_users(&self) -> Result<Vec<User>> {
        let users = self
            .data_access
            .fetch_users()
            .await
            .context("Couldn't fetch user list")?;
        Ok(users)
    }

    pub async fn find_users_by_substring(&self, substring: &str) -> Result<Vec<User>> {
        let users = self
            .data_access
            .find_users_by_substring(substring)
            .await
            .with_context(|| format!("Couldn't process user search request: {substring}"))?;
        Ok(users)
    }

    pub async fn post_message(&self, user_id: &UserId, text: String) -> Result<MessageId> {
        if text.trim().is_empty() {
            return Err(Error::ValidationFailure("message text must not be empty"));
        }
        if text.chars().count() > MESSAGE_MAX_LENGTH {
            return Err(Error::ValidationFailure("message text is too long"));
        }

        if self.fetch_user(user_id).await?.is_none() {
            return Err(Error::NotFound("user"));
        }

        let message = Message {
            id: Uuid::new_v4(),
            user_id: *user_id,
            text,
            timestamp: chrono::Utc::now(),
        };

        self.data_access
            .create_message(&message)
            .await
            .with_context(|| format!("Couldn't create message for user {user_id}"))?;

        Ok(message.id)
    }

    pub async fn fetch_message(&self, message_id: &MessageId) -> Result<Option<Message>> {
        let message = self
            .data_access
            .fetch_message(message_id)
            .await
            .with_context(|| format!("Couldn't fetch message {message_id}"))?;
        Ok(message)
    }

    pub async fn user_messages(&self, user_id: &UserId) -> Result<Vec<Message>> {
        let messages = self
            .data_access
            .fetch_user_messages(user_id)
            .await
            .with_context(|| format!("Couldn't fetch messages of user {user_id}"))?;
        Ok(messages)
    }

    pub async fn timeline(&self, user_id: &UserId) -> Result<Vec<Message>> {
        let messages = self
            .data_access
            .fetch_timeline(user_id)
            .await
            .with_context(|| format!("Couldn't fetch timeline for user {user_id}"))?;
        Ok(messages)
    }

    /// Removes the message and every like pointing at it.
    pub async fn delete_message(&self, message_id: &MessageId) -> Result<()> {
        let deleted = self
            .data_access
            .delete_message(message_id)
            .await
            .with_context(|| format!("Couldn't delete message {message_id}"))?;
        if !deleted {
            return Err(Error::NotFound("message"));
        }
        Ok(())
    }

    /// Inserts a follow edge. Following yourself is rejected; re-following
    /// an already followed user is a no-op.
    pub async fn follow(&self, follower_id: &UserId, followed_id: &UserId) -> Result<()> {
        if follower_id == followed_id {
            return Err(Error::ValidationFailure("cannot follow yourself"));
        }
        if self.fetch_user(followed_id).await?.is_none() {
            return Err(Error::NotFound("user"));
        }
        self.data_access
            .create_follow(follower_id, followed_id)
            .await
            .with_context(|| format!("Couldn't follow {followed_id} as {follower_id}"))?;
        Ok(())
    }

    /// Removes a follow edge; a no-op when the edge is absent.
    pub async fn unfollow(&self, follower_id: &UserId, followed_id: &UserId) -> Result<()> {
        self.data_access
            .delete_follow(follower_id, followed_id)
            .await
            .with_context(|| format!("Couldn't unfollow {followed_id} as {follower_id}"))?;
        Ok(())
    }

    pub async fn is_following(&self, user_id: &UserId, other_id: &UserId) -> Result<bool> {
        let res = self
            .data_access
            .follow_exists(user_id, other_id)
            .await
            .context("Couldn't check follow edge")?;
        Ok(res)
    }

    pub async fn is_followed_by(&self, user_id: &UserId, other_id: &UserId) -> Result<bool> {
        self.is_following(other_id, user_id).await
    }

    pub async fn following(&self, user_id: &UserId) -> Result<Vec<User>> {
        let users = self
            .data_access
            .fetch_following(user_id)
            .await
            .with_context(|| format!("Couldn't fetch users followed by {user_id}"))?;
        Ok(users)
    }

    pub async fn followers(&self, user_id: &UserId) -> Result<Vec<User>> {
        let users = self
            .data_access
            .fetch_followers(user_id)
            .await
            .with_context(|| format!("Couldn't fetch followers of {user_id}"))?;
        Ok(users)
    }

    /// Inserts a like edge. Liking your own message is allowed; liking the
    /// same message twice is a no-op.
    pub async fn like(&self, user_id: &UserId, message_id: &MessageId) -> Result<()> {
        if self.fetch_message(message_id).await?.is_none() {
            return Err(Error::NotFound("message"));
        }
        self.data_access
            .create_like(user_id, message_id)
            .await
            .with_context(|| format!("Couldn't like message {message_id} as {user_id}"))?;
        Ok(())
    }

    /// Removes a like edge; a no-op when the edge is absent.
    pub async fn unlike(&self, user_id: &UserId, message_id: &MessageId) -> Result<()> {
        self.data_access
            .delete_like(user_id, message_id)
            .await
            .with_context(|| format!("Couldn't unlike message {message_id} as {user_id}"))?;
        Ok(())
    }

    pub async fn liked_messages(&self, user_id: &UserId) -> Result<Vec<Message>> {
        let messages = self
            .data_access
            .fetch_liked_messages(user_id)
            .await
            .with_context(|| format!("Couldn't fetch liked messages of {user_id}"))?;
        Ok(messages)
    }

    pub async fn has_liked(&self, user_id: &UserId, message_id: &MessageId) -> Result<bool> {
        let liked = self.liked_messages(user_id).await?;
        Ok(liked.iter().any(|message| message.id == *message_id))
    }

    /// Removes the user together with their messages, their likes, likes on
    /// their messages, follow edges in both directions and their stored
    /// credentials.
    pub async fn delete_user(&self, user_id: &UserId) -> Result<()> {
        let deleted = self
            .data_access
            .delete_user(user_id)
            .await
            .with_context(|| format!("Couldn't delete user {user_id}"))?;
        if !deleted {
            return Err(Error::NotFound("user"));
        }
        Ok(())
    }
}

impl<D: DataAccess, A: AuthService> Warbler<D, A> {
    /// Creates an account. The password is stored only as a one-way hash.
    pub async fn sign_up(&self, new_user: NewUser, password: String) -> Result<UserId> {
        if new_user.username.trim().is_empty() {
            return Err(Error::ValidationFailure("username must not be empty"));
        }
        if new_user.email.trim().is_empty() {
            return Err(Error::ValidationFailure("email must not be empty"));
        }
        if password.is_empty() {
            return Err(Error::ValidationFailure("password must not be empty"));
        }

        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username,
            email: new_user.email,
            image_url: new_user
                .image_url
                .filter(|url| !url.is_empty())
                .unwrap_or_else(|| DEFAULT_IMAGE_URL.to_owned()),
            header_image_url: DEFAULT_HEADER_IMAGE_URL.to_owned(),
            bio: None,
            location: None,
        };

        let created = self
            .data_access
            .create_user(&user)
            .await
            .with_context(|| format!("Couldn't create user {}", user.username))?;
        if !created {
            return Err(Error::DuplicateIdentity);
        }

        // a user without stored credentials must not keep the username
        if let Err(error) = self.auth_service.set_password(&user.id, password).await {
            self.data_access
                .delete_user(&user.id)
                .await
                .with_context(|| format!("Couldn't roll back user {}", user.username))?;
            return Err(anyhow::Error::new(error)
                .context(format!("Couldn't store credentials for {}", user.username))
                .into());
        }

        Ok(user.id)
    }

    /// Returns the user id only when both the username exists and the
    /// password matches. Unknown username and wrong password are
    /// indistinguishable to the caller.
    pub async fn authenticate(&self, username: &str, password: String) -> Result<Option<UserId>> {
        let user_id = match self
            .data_access
            .find_user_by_username(username)
            .await
            .with_context(|| format!("Couldn't look up username {username}"))?
        {
            Some(user_id) => user_id,
            None => return Ok(None),
        };

        let verified = self
            .auth_service
            .verify_password(&user_id, password)
            .await
            .with_context(|| format!("Couldn't verify password for {user_id}"))?;

        if verified {
            Ok(Some(user_id))
        } else {
            Ok(None)
        }
    }

    /// Applies a profile edit after re-checking the current password.
    pub async fn update_profile(
        &self,
        user_id: &UserId,
        password: String,
        update: ProfileUpdate,
    ) -> Result<()> {
        let mut user = self
            .fetch_user(user_id)
            .await?
            .ok_or(Error::NotFound("user"))?;

        let verified = self
            .auth_service
            .verify_password(user_id, password)
            .await
            .with_context(|| format!("Couldn't verify password for {user_id}"))?;
        if !verified {
            return Err(Error::AuthenticationFailed);
        }

        if let Some(username) = update.username {
            if username.trim().is_empty() {
                return Err(Error::ValidationFailure("username must not be empty"));
            }
            match self
                .data_access
                .find_user_by_username(&username)
                .await
                .with_context(|| format!("Couldn't look up username {username}"))?
            {
                Some(existing) if existing != *user_id => return Err(Error::DuplicateIdentity),
                _ => user.username = username,
            }
        }

        if let Some(email) = update.email {
            if email.trim().is_empty() {
                return Err(Error::ValidationFailure("email must not be empty"));
            }
            match self
                .data_access
                .find_user_by_email(&email)
                .await
                .with_context(|| format!("Couldn't look up email {email}"))?
            {
                Some(existing) if existing != *user_id => return Err(Error::DuplicateIdentity),
                _ => user.email = email,
            }
        }

        if let Some(image_url) = update.image_url {
            user.image_url = if image_url.is_empty() {
                DEFAULT_IMAGE_URL.to_owned()
            } else {
                image_url
            };
        }
        if let Some(header_image_url) = update.header_image_url {
            user.header_image_url = if header_image_url.is_empty() {
                DEFAULT_HEADER_IMAGE_URL.to_owned()
            } else {
                header_image_url
            };
        }
        if let Some(bio) = update.bio {
            user.bio = if bio.is_empty() { None } else { Some(bio) };
        }
        if let Some(location) = update.location {
            user.location = if location.is_empty() {
                None
            } else {
                Some(location)
            };
        }

        let updated = self
            .data_access
            .update_user(&user)
            .await
            .with_context(|| format!("Couldn't update user {user_id}"))?;
        if !updated {
            return Err(Error::NotFound("user"));
        }
        Ok(())
    }
}
