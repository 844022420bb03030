use anyhow::Result;
use serde::Deserialize;
use tokio::io::AsyncRead;

use http_server::request::Request;
use http_server::response::Response;

use warbler_app::app::Warbler;
use warbler_app::authorization::AuthService;
use warbler_app::data_access::DataAccess;
use warbler_app::error::Error;
use warbler_app::{MessageId, NewUser, ProfileUpdate, UserId};

use warbler_utils::http::{get_cookies_hashmap, header_set_cookie};
use warbler_utils::serde::form_data;

use crate::routing;
use crate::routing::html;
use crate::sessions;

fn logged_in_redirect(user_id: &UserId, location: String) -> Result<Response> {
    let session_id = sessions::generate_session_id();
    sessions::update_session_info(session_id.clone(), sessions::SessionInfo { user_id: *user_id })?;
    let headers = vec![header_set_cookie(sessions::SESSION_ID_COOKIE, &session_id)];
    Ok(Response::Redirect { location, headers })
}

pub fn logout<T: AsyncRead + Unpin>(request: &Request<T>) -> Result<Response> {
    let cookies = match get_cookies_hashmap(request.headers()) {
        Ok(cookies) => cookies,
        Err(_) => return Ok(Response::BadRequest),
    };

    let session_id = match cookies.get(sessions::SESSION_ID_COOKIE) {
        Some(session_id) => session_id,
        None => return Ok(routing::unauthorized_redirect()),
    };

    sessions::remove_session_info(session_id)?;

    Ok(routing::unauthorized_redirect())
}

#[derive(Deserialize)]
struct SignupForm {
    username: String,
    email: String,
    password: String,
    image_url: Option<String>,
}

pub async fn signup<T: AsyncRead + Unpin>(
    request: &mut Request<T>,
    app: Warbler<impl DataAccess, impl AuthService>,
) -> Result<Response> {
    let content = request.content().await?;
    let signup_form: SignupForm = match form_data::from_str(&content) {
        Ok(res) => res,
        Err(_) => return Ok(Response::BadRequest),
    };

    let new_user = NewUser {
        username: signup_form.username,
        email: signup_form.email,
        image_url: signup_form.image_url,
    };

    match app.sign_up(new_user, signup_form.password).await {
        Ok(user_id) => logged_in_redirect(&user_id, "/".into()),
        Err(error @ (Error::DuplicateIdentity | Error::ValidationFailure(_))) => {
            Ok(Response::Html {
                content: html::signup_page(Some(&error))?,
                headers: Vec::new(),
            })
        }
        Err(error) => Err(error.into()),
    }
}

#[derive(Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

pub async fn login<T: AsyncRead + Unpin>(
    request: &mut Request<T>,
    app: Warbler<impl DataAccess, impl AuthService>,
) -> Result<Response> {
    let content = request.content().await?;
    let login_form: LoginForm = match form_data::from_str(&content) {
        Ok(res) => res,
        Err(_) => return Ok(Response::BadRequest),
    };

    match app
        .authenticate(&login_form.username, login_form.password)
        .await?
    {
        Some(user_id) => logged_in_redirect(&user_id, "/".into()),
        None => Ok(Response::Html {
            content: html::login_failed_page()?,
            headers: Vec::new(),
        }),
    }
}

pub async fn follow<A, T: AsyncRead + Unpin>(
    request: &Request<T>,
    app: Warbler<impl DataAccess, A>,
    followed_id: &str,
) -> Result<Response> {
    let user_id = match routing::get_authorization(request.headers())? {
        Some(user_id) => user_id,
        None => return Ok(routing::unauthorized_redirect()),
    };

    let followed_id: UserId = match followed_id.parse() {
        Ok(res) => res,
        Err(_) => return Ok(Response::BadRequest),
    };

    match app.follow(&user_id, &followed_id).await {
        Ok(()) => Ok(Response::Redirect {
            location: format!("/users/{user_id}/following"),
            headers: Vec::new(),
        }),
        Err(Error::ValidationFailure(_)) => Ok(Response::BadRequest),
        Err(Error::NotFound(_)) => Ok(Response::NotFound),
        Err(error) => Err(error.into()),
    }
}

pub async fn stop_following<A, T: AsyncRead + Unpin>(
    request: &Request<T>,
    app: Warbler<impl DataAccess, A>,
    followed_id: &str,
) -> Result<Response> {
    let user_id = match routing::get_authorization(request.headers())? {
        Some(user_id) => user_id,
        None => return Ok(routing::unauthorized_redirect()),
    };

    let followed_id: UserId = match followed_id.parse() {
        Ok(res) => res,
        Err(_) => return Ok(Response::BadRequest),
    };

    app.unfollow(&user_id, &followed_id).await?;

    Ok(Response::Redirect {
        location: format!("/users/{user_id}/following"),
        headers: Vec::new(),
    })
}

/// Like when not yet liked, unlike otherwise. The original form posts to a
/// single toggle endpoint.
pub async fn toggle_like<A, T: AsyncRead + Unpin>(
    request: &Request<T>,
    app: Warbler<impl DataAccess, A>,
    message_id: &str,
) -> Result<Response> {
    let user_id = match routing::get_authorization(request.headers())? {
        Some(user_id) => user_id,
        None => return Ok(routing::unauthorized_redirect()),
    };

    let message_id: MessageId = match message_id.parse() {
        Ok(res) => res,
        Err(_) => return Ok(Response::BadRequest),
    };

    let result = if app.has_liked(&user_id, &message_id).await? {
        app.unlike(&user_id, &message_id).await
    } else {
        app.like(&user_id, &message_id).await
    };

    match result {
        Ok(()) => Ok(Response::Redirect {
            location: format!("/users/{user_id}/likes"),
            headers: Vec::new(),
        }),
        Err(Error::NotFound(_)) => Ok(Response::NotFound),
        Err(error) => Err(error.into()),
    }
}

#[derive(Deserialize)]
struct MessageForm {
    text: String,
}

pub async fn post_message<A, T: AsyncRead + Unpin>(
    request: &mut Request<T>,
    app: Warbler<impl DataAccess, A>,
) -> Result<Response> {
    let user_id = match routing::get_authorization(request.headers())? {
        Some(user_id) => user_id,
        None => return Ok(routing::unauthorized_redirect()),
    };

    let content = request.content().await?;
    let message_form: MessageForm = match form_data::from_str(&content) {
        Ok(res) => res,
        Err(_) => return Ok(Response::BadRequest),
    };

    match app.post_message(&user_id, message_form.text).await {
        Ok(_) => Ok(Response::Redirect {
            location: format!("/users/{user_id}"),
            headers: Vec::new(),
        }),
        Err(error @ Error::ValidationFailure(_)) => Ok(Response::Html {
            content: html::new_message_page(Some(&error))?,
            headers: Vec::new(),
        }),
        Err(Error::NotFound(_)) => Ok(routing::unauthorized_redirect()),
        Err(error) => Err(error.into()),
    }
}

pub async fn delete_message<A, T: AsyncRead + Unpin>(
    request: &Request<T>,
    app: Warbler<impl DataAccess, A>,
    message_id: &str,
) -> Result<Response> {
    let user_id = match routing::get_authorization(request.headers())? {
        Some(user_id) => user_id,
        None => return Ok(routing::unauthorized_redirect()),
    };

    let message_id: MessageId = match message_id.parse() {
        Ok(res) => res,
        Err(_) => return Ok(Response::BadRequest),
    };

    let message = match app.fetch_message(&message_id).await? {
        Some(message) => message,
        None => return Ok(Response::NotFound),
    };

    // only the owner may delete a message
    if message.user_id != user_id {
        return Ok(routing::unauthorized_redirect());
    }

    app.delete_message(&message_id).await?;

    Ok(Response::Redirect {
        location: format!("/users/{user_id}"),
        headers: Vec::new(),
    })
}

#[derive(Deserialize)]
struct ProfileEditForm {
    username: Option<String>,
    email: Option<String>,
    image_url: Option<String>,
    header_image_url: Option<String>,
    bio: Option<String>,
    location: Option<String>,
    password: String,
}

pub async fn update_profile<T: AsyncRead + Unpin>(
    request: &mut Request<T>,
    app: Warbler<impl DataAccess, impl AuthService>,
) -> Result<Response> {
    let user_id = match routing::get_authorization(request.headers())? {
        Some(user_id) => user_id,
        None => return Ok(routing::unauthorized_redirect()),
    };

    let content = request.content().await?;
    let profile_form: ProfileEditForm = match form_data::from_str(&content) {
        Ok(res) => res,
        Err(_) => return Ok(Response::BadRequest),
    };

    let update = ProfileUpdate {
        username: profile_form.username,
        email: profile_form.email,
        image_url: profile_form.image_url,
        header_image_url: profile_form.header_image_url,
        bio: profile_form.bio,
        location: profile_form.location,
    };

    match app
        .update_profile(&user_id, profile_form.password, update)
        .await
    {
        Ok(()) => Ok(Response::Redirect {
            location: format!("/users/{user_id}"),
            headers: Vec::new(),
        }),
        Err(Error::AuthenticationFailed) => Ok(routing::unauthorized_redirect()),
        Err(error @ (Error::DuplicateIdentity | Error::ValidationFailure(_))) => {
            let user = match app.fetch_user(&user_id).await? {
                Some(user) => user,
                None => return Ok(routing::unauthorized_redirect()),
            };
            Ok(Response::Html {
                content: html::edit_profile_page(&user, Some(&error))?,
                headers: Vec::new(),
            })
        }
        Err(Error::NotFound(_)) => Ok(routing::unauthorized_redirect()),
        Err(error) => Err(error.into()),
    }
}

pub async fn delete_user<A, T: AsyncRead + Unpin>(
    request: &Request<T>,
    app: Warbler<impl DataAccess, A>,
) -> Result<Response> {
    let user_id = match routing::get_authorization(request.headers())? {
        Some(user_id) => user_id,
        None => return Ok(routing::unauthorized_redirect()),
    };

    match app.delete_user(&user_id).await {
        Ok(()) => {}
        Err(Error::NotFound(_)) => return Ok(routing::unauthorized_redirect()),
        Err(error) => return Err(error.into()),
    }

    sessions::remove_sessions_for_user(&user_id)?;

    Ok(Response::Redirect {
        location: "/signup".into(),
        headers: Vec::new(),
    })
}
