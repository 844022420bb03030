mod actions;
mod html;
mod pages;

use std::collections::HashMap;

use anyhow::Result;
use tokio::io::AsyncRead;

use http_server::request::Request;
use http_server::response::Response;

use warbler_app::app::Warbler;
use warbler_app::authorization::AuthService;
use warbler_app::data_access::DataAccess;
use warbler_app::UserId;

use warbler_utils::http::get_cookies_hashmap;
use warbler_utils::utils::{log_internal_error, CaseInsensitiveString};

use crate::request_handler::RequestHandlerError;
use crate::sessions;

pub async fn route<T: AsyncRead + Unpin>(
    request: &mut Request<T>,
    app: Warbler<impl DataAccess, impl AuthService>,
) -> Result<Response, RequestHandlerError> {
    let url = request.url();
    let (path, params_anchor) = match url.split_once('?') {
        Some(res) => res,
        None => (url, ""),
    };
    let path = path.to_owned();

    let (params, _anchor) = match params_anchor.split_once('#') {
        Some(res) => res,
        None => (params_anchor, ""),
    };
    let params = params.to_owned();

    let mut path_segments = path.split('/').filter(|s| !s.is_empty());

    let method = request.method();
    let query = (
        &method,
        path_segments.next(),
        path_segments.next(),
        path_segments.next(),
        path_segments.next(),
    );

    use http_server::method::Method::*;
    let response = match query {
        (Get, None, ..) => pages::home(request, app).await,
        (Get, Some("signup"), None, ..) => pages::signup(),
        (Post, Some("signup"), None, ..) => actions::signup(request, app).await,
        (Get, Some("login"), None, ..) => pages::login(),
        (Post, Some("login"), None, ..) => actions::login(request, app).await,
        (Get, Some("logout"), None, ..) => actions::logout(request),
        (Get, Some("users"), None, ..) => pages::users_index(request, app, &params).await,
        (Get, Some("users"), Some("profile"), None, ..) => pages::edit_profile(request, app).await,
        (Post, Some("users"), Some("profile"), None, ..) => {
            actions::update_profile(request, app).await
        }
        (Post, Some("users"), Some("delete"), None, ..) => actions::delete_user(request, app).await,
        (Post, Some("users"), Some("follow"), Some(user_id), None) => {
            actions::follow(request, app, user_id).await
        }
        (Post, Some("users"), Some("stop-following"), Some(user_id), None) => {
            actions::stop_following(request, app, user_id).await
        }
        (Post, Some("users"), Some("add_like"), Some(message_id), None) => {
            actions::toggle_like(request, app, message_id).await
        }
        (Get, Some("users"), Some(user_id), None, ..) => {
            pages::user_profile(request, app, user_id).await
        }
        (Get, Some("users"), Some(user_id), Some("following"), None) => {
            pages::following(request, app, user_id).await
        }
        (Get, Some("users"), Some(user_id), Some("followers"), None) => {
            pages::followers(request, app, user_id).await
        }
        (Get, Some("users"), Some(user_id), Some("likes"), None) => {
            pages::likes(request, app, user_id).await
        }
        (Get, Some("messages"), Some("new"), None, ..) => pages::new_message(request, app).await,
        (Post, Some("messages"), Some("new"), None, ..) => {
            actions::post_message(request, app).await
        }
        (Get, Some("messages"), Some(message_id), None, ..) => {
            pages::show_message(request, app, message_id).await
        }
        (Post, Some("messages"), Some(message_id), Some("delete"), None) => {
            actions::delete_message(request, app, message_id).await
        }
        (Get, Some("favicon.ico"), None, ..) => Ok(Response::Empty),
        _ => Ok(Response::NotFound),
    };

    let response = response.unwrap_or_else(|error| {
        log_internal_error(error);
        Response::InternalServerError
    });

    Ok(response)
}

pub(crate) fn unauthorized_redirect() -> Response {
    Response::Redirect {
        location: "/login".into(),
        headers: Vec::new(),
    }
}

/// Inline form message for a domain error; empty when there is none.
pub(crate) fn error_message(error: Option<&warbler_app::error::Error>) -> String {
    match error {
        Some(error) => error.to_string(),
        None => String::new(),
    }
}

pub(crate) fn get_authorization(
    headers: &HashMap<CaseInsensitiveString, String>,
) -> Result<Option<UserId>> {
    let cookies = match get_cookies_hashmap(headers) {
        Ok(cookies) => cookies,
        Err(_) => return Ok(None),
    };

    let session_id = match cookies.get(sessions::SESSION_ID_COOKIE) {
        Some(session_id) => session_id,
        None => return Ok(None),
    };
    let session_info = sessions::get_session_info(session_id)?;
    Ok(session_info.map(|v| v.user_id))
}
