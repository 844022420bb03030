use std::collections::HashMap;

use anyhow::{Context, Result};
use askama::Template;

use warbler_app::app::Warbler;
use warbler_app::data_access::DataAccess;
use warbler_app::{Message, User, UserId};

use crate::routing::error_message;

/// Display-ready user card. Everything is a plain string so the templates
/// stay dumb.
pub struct UserCard {
    pub id: String,
    pub username: String,
    pub image_url: String,
    pub bio: String,
}

impl From<&User> for UserCard {
    fn from(user: &User) -> Self {
        UserCard {
            id: user.id.to_string(),
            username: user.username.clone(),
            image_url: user.image_url.clone(),
            bio: user.bio.clone().unwrap_or_default(),
        }
    }
}

/// Display-ready message with its author resolved.
pub struct MessageView {
    pub id: String,
    pub text: String,
    pub timestamp: String,
    pub author_id: String,
    pub author_username: String,
    pub author_image_url: String,
}

fn format_timestamp(timestamp: &chrono::DateTime<chrono::Utc>) -> String {
    timestamp.format("%d %B %Y").to_string()
}

/// Resolves message authors through a small id -> user cache so a page
/// with many messages from one author fetches that author once.
pub async fn message_views<A>(
    app: &Warbler<impl DataAccess, A>,
    messages: &[Message],
) -> Result<Vec<MessageView>> {
    let mut authors: HashMap<UserId, User> = HashMap::new();
    let mut res = Vec::with_capacity(messages.len());

    for message in messages {
        if !authors.contains_key(&message.user_id) {
            let author = app
                .fetch_user(&message.user_id)
                .await?
                .with_context(|| format!("Message {} has no author", message.id))?;
            authors.insert(message.user_id, author);
        }
        let author = &authors[&message.user_id];
        res.push(MessageView {
            id: message.id.to_string(),
            text: message.text.clone(),
            timestamp: format_timestamp(&message.timestamp),
            author_id: author.id.to_string(),
            author_username: author.username.clone(),
            author_image_url: author.image_url.clone(),
        });
    }
    Ok(res)
}

#[derive(Template)]
#[template(path = "home.html")]
struct HomePage {
    username: String,
    user_id: String,
    messages: Vec<MessageView>,
}

#[derive(Template)]
#[template(path = "home_anon.html")]
struct HomeAnonPage {}

#[derive(Template)]
#[template(path = "login.html")]
struct LoginPage {
    error: String,
}

#[derive(Template)]
#[template(path = "signup.html")]
struct SignUpPage {
    error: String,
}

#[derive(Template)]
#[template(path = "users/index.html")]
struct UsersIndexPage {
    users: Vec<UserCard>,
}

#[derive(Template)]
#[template(path = "users/show.html")]
struct UserProfilePage {
    user_id: String,
    username: String,
    image_url: String,
    header_image_url: String,
    bio: String,
    location: String,
    message_count: usize,
    following_count: usize,
    follower_count: usize,
    like_count: usize,
    messages: Vec<MessageView>,
}

#[derive(Template)]
#[template(path = "users/following.html")]
struct FollowingPage {
    username: String,
    user_id: String,
    users: Vec<UserCard>,
}

#[derive(Template)]
#[template(path = "users/followers.html")]
struct FollowersPage {
    username: String,
    user_id: String,
    users: Vec<UserCard>,
}

#[derive(Template)]
#[template(path = "users/likes.html")]
struct LikesPage {
    username: String,
    user_id: String,
    messages: Vec<MessageView>,
}

#[derive(Template)]
#[template(path = "users/edit.html")]
struct EditProfilePage {
    username: String,
    email: String,
    image_url: String,
    header_image_url: String,
    bio: String,
    location: String,
    error: String,
}

#[derive(Template)]
#[template(path = "messages/new.html")]
struct NewMessagePage {
    error: String,
}

#[derive(Template)]
#[template(path = "messages/show.html")]
struct MessagePage {
    message: MessageView,
}

pub async fn home_page<A>(
    app: &Warbler<impl DataAccess, A>,
    user_id: &UserId,
) -> Result<String> {
    let user = app
        .fetch_user(user_id)
        .await?
        .with_context(|| format!("Incorrect user id: {user_id}"))?;
    let timeline = app.timeline(user_id).await?;
    let messages = message_views(app, &timeline).await?;

    HomePage {
        username: user.username,
        user_id: user.id.to_string(),
        messages,
    }
    .render()
    .context("Could not render home.html")
}

pub fn home_anon_page() -> Result<String> {
    HomeAnonPage {}
        .render()
        .context("Could not render home_anon.html")
}

pub fn login_page(error: Option<&warbler_app::error::Error>) -> Result<String> {
    LoginPage {
        error: error_message(error),
    }
    .render()
    .context("Could not render login.html")
}

pub fn login_failed_page() -> Result<String> {
    LoginPage {
        error: "Invalid credentials.".into(),
    }
    .render()
    .context("Could not render login.html")
}

pub fn signup_page(error: Option<&warbler_app::error::Error>) -> Result<String> {
    SignUpPage {
        error: error_message(error),
    }
    .render()
    .context("Could not render signup.html")
}

pub fn users_index_page(users: &[User]) -> Result<String> {
    UsersIndexPage {
        users: users.iter().map(UserCard::from).collect(),
    }
    .render()
    .context("Could not render users/index.html")
}

pub async fn user_profile_page<A>(
    app: &Warbler<impl DataAccess, A>,
    user: &User,
) -> Result<String> {
    let user_messages = app.user_messages(&user.id).await?;
    let messages = message_views(app, &user_messages).await?;
    let following_count = app.following(&user.id).await?.len();
    let follower_count = app.followers(&user.id).await?.len();
    let like_count = app.liked_messages(&user.id).await?.len();

    UserProfilePage {
        user_id: user.id.to_string(),
        username: user.username.clone(),
        image_url: user.image_url.clone(),
        header_image_url: user.header_image_url.clone(),
        bio: user.bio.clone().unwrap_or_default(),
        location: user.location.clone().unwrap_or_default(),
        message_count: messages.len(),
        following_count,
        follower_count,
        like_count,
        messages,
    }
    .render()
    .context("Could not render users/show.html")
}

pub fn following_page(user: &User, following: &[User]) -> Result<String> {
    FollowingPage {
        username: user.username.clone(),
        user_id: user.id.to_string(),
        users: following.iter().map(UserCard::from).collect(),
    }
    .render()
    .context("Could not render users/following.html")
}

pub fn followers_page(user: &User, followers: &[User]) -> Result<String> {
    FollowersPage {
        username: user.username.clone(),
        user_id: user.id.to_string(),
        users: followers.iter().map(UserCard::from).collect(),
    }
    .render()
    .context("Could not render users/followers.html")
}

pub async fn likes_page<A>(
    app: &Warbler<impl DataAccess, A>,
    user: &User,
) -> Result<String> {
    let liked = app.liked_messages(&user.id).await?;
    let messages = message_views(app, &liked).await?;

    LikesPage {
        username: user.username.clone(),
        user_id: user.id.to_string(),
        messages,
    }
    .render()
    .context("Could not render users/likes.html")
}

pub fn edit_profile_page(user: &User, error: Option<&warbler_app::error::Error>) -> Result<String> {
    EditProfilePage {
        username: user.username.clone(),
        email: user.email.clone(),
        image_url: user.image_url.clone(),
        header_image_url: user.header_image_url.clone(),
        bio: user.bio.clone().unwrap_or_default(),
        location: user.location.clone().unwrap_or_default(),
        error: error_message(error),
    }
    .render()
    .context("Could not render users/edit.html")
}

pub fn new_message_page(error: Option<&warbler_app::error::Error>) -> Result<String> {
    NewMessagePage {
        error: error_message(error),
    }
    .render()
    .context("Could not render messages/new.html")
}

pub async fn message_page<A>(
    app: &Warbler<impl DataAccess, A>,
    message: &Message,
) -> Result<String> {
    let mut views = message_views(app, std::slice::from_ref(message)).await?;
    let message = views.pop().context("Message view missing")?;

    MessagePage { message }
        .render()
        .context("Could not render messages/show.html")
}
