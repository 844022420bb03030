use anyhow::Result;
use serde::Deserialize;
use tokio::io::AsyncRead;

use http_server::request::Request;
use http_server::response::Response;

use warbler_app::app::Warbler;
use warbler_app::data_access::DataAccess;
use warbler_app::{MessageId, UserId};

use warbler_utils::serde::form_data;

use crate::routing;
use crate::routing::html;

pub async fn home<A, T: AsyncRead + Unpin>(
    request: &Request<T>,
    app: Warbler<impl DataAccess, A>,
) -> Result<Response> {
    let content = match routing::get_authorization(request.headers())? {
        Some(user_id) => html::home_page(&app, &user_id).await?,
        None => html::home_anon_page()?,
    };

    Ok(Response::Html {
        content,
        headers: Vec::new(),
    })
}

pub fn signup() -> Result<Response> {
    let content = html::signup_page(None)?;
    Ok(Response::Html {
        content,
        headers: Vec::new(),
    })
}

pub fn login() -> Result<Response> {
    let content = html::login_page(None)?;
    Ok(Response::Html {
        content,
        headers: Vec::new(),
    })
}

#[derive(Deserialize)]
struct UserSearchParams {
    q: Option<String>,
}

pub async fn users_index<A, T: AsyncRead + Unpin>(
    request: &Request<T>,
    app: Warbler<impl DataAccess, A>,
    params: &str,
) -> Result<Response> {
    if routing::get_authorization(request.headers())?.is_none() {
        return Ok(routing::unauthorized_redirect());
    }

    let search_params: UserSearchParams = match form_data::from_str(params) {
        Ok(res) => res,
        Err(_) => UserSearchParams { q: None },
    };

    let users = match search_params.q {
        Some(query) if !query.is_empty() => app.find_users_by_substring(&query).await?,
        _ => app.fetch_users().await?,
    };

    Ok(Response::Html {
        content: html::users_index_page(&users)?,
        headers: Vec::new(),
    })
}

pub async fn user_profile<A, T: AsyncRead + Unpin>(
    request: &Request<T>,
    app: Warbler<impl DataAccess, A>,
    user_id: &str,
) -> Result<Response> {
    if routing::get_authorization(request.headers())?.is_none() {
        return Ok(routing::unauthorized_redirect());
    }

    let user_id: UserId = match user_id.parse() {
        Ok(res) => res,
        Err(_) => return Ok(Response::BadRequest),
    };

    let user = match app.fetch_user(&user_id).await? {
        Some(user) => user,
        None => return Ok(Response::NotFound),
    };

    Ok(Response::Html {
        content: html::user_profile_page(&app, &user).await?,
        headers: Vec::new(),
    })
}

pub async fn following<A, T: AsyncRead + Unpin>(
    request: &Request<T>,
    app: Warbler<impl DataAccess, A>,
    user_id: &str,
) -> Result<Response> {
    if routing::get_authorization(request.headers())?.is_none() {
        return Ok(routing::unauthorized_redirect());
    }

    let user_id: UserId = match user_id.parse() {
        Ok(res) => res,
        Err(_) => return Ok(Response::BadRequest),
    };

    let user = match app.fetch_user(&user_id).await? {
        Some(user) => user,
        None => return Ok(Response::NotFound),
    };
    let following = app.following(&user_id).await?;

    Ok(Response::Html {
        content: html::following_page(&user, &following)?,
        headers: Vec::new(),
    })
}

pub async fn followers<A, T: AsyncRead + Unpin>(
    request: &Request<T>,
    app: Warbler<impl DataAccess, A>,
    user_id: &str,
) -> Result<Response> {
    if routing::get_authorization(request.headers())?.is_none() {
        return Ok(routing::unauthorized_redirect());
    }

    let user_id: UserId = match user_id.parse() {
        Ok(res) => res,
        Err(_) => return Ok(Response::BadRequest),
    };

    let user = match app.fetch_user(&user_id).await? {
        Some(user) => user,
        None => return Ok(Response::NotFound),
    };
    let followers = app.followers(&user_id).await?;

    Ok(Response::Html {
        content: html::followers_page(&user, &followers)?,
        headers: Vec::new(),
    })
}

pub async fn likes<A, T: AsyncRead + Unpin>(
    request: &Request<T>,
    app: Warbler<impl DataAccess, A>,
    user_id: &str,
) -> Result<Response> {
    if routing::get_authorization(request.headers())?.is_none() {
        return Ok(routing::unauthorized_redirect());
    }

    let user_id: UserId = match user_id.parse() {
        Ok(res) => res,
        Err(_) => return Ok(Response::BadRequest),
    };

    let user = match app.fetch_user(&user_id).await? {
        Some(user) => user,
        None => return Ok(Response::NotFound),
    };

    Ok(Response::Html {
        content: html::likes_page(&app, &user).await?,
        headers: Vec::new(),
    })
}

pub async fn edit_profile<A, T: AsyncRead + Unpin>(
    request: &Request<T>,
    app: Warbler<impl DataAccess, A>,
) -> Result<Response> {
    let user_id = match routing::get_authorization(request.headers())? {
        Some(user_id) => user_id,
        None => return Ok(routing::unauthorized_redirect()),
    };

    let user = match app.fetch_user(&user_id).await? {
        Some(user) => user,
        None => return Ok(routing::unauthorized_redirect()),
    };

    Ok(Response::Html {
        content: html::edit_profile_page(&user, None)?,
        headers: Vec::new(),
    })
}

pub async fn new_message<A, T: AsyncRead + Unpin>(
    request: &Request<T>,
    _app: Warbler<impl DataAccess, A>,
) -> Result<Response> {
    if routing::get_authorization(request.headers())?.is_none() {
        return Ok(routing::unauthorized_redirect());
    }

    Ok(Response::Html {
        content: html::new_message_page(None)?,
        headers: Vec::new(),
    })
}

pub async fn show_message<A, T: AsyncRead + Unpin>(
    request: &Request<T>,
    app: Warbler<impl DataAccess, A>,
    message_id: &str,
) -> Result<Response> {
    if routing::get_authorization(request.headers())?.is_none() {
        return Ok(routing::unauthorized_redirect());
    }

    let message_id: MessageId = match message_id.parse() {
        Ok(res) => res,
        Err(_) => return Ok(Response::BadRequest),
    };

    let message = match app.fetch_message(&message_id).await? {
        Some(message) => message,
        None => return Ok(Response::NotFound),
    };

    Ok(Response::Html {
        content: html::message_page(&app, &message).await?,
        headers: Vec::new(),
    })
}
