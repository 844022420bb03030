use warbler_utils::http::Header;

pub enum Response {
    Html {
        content: String,
        headers: Vec<Header>,
    },
    Redirect {
        location: String,
        headers: Vec<Header>,
    },
    BadRequest,
    NotFound,
    InternalServerError,
    Empty,
}

impl Response {
    pub fn is_bad_request(&self) -> bool {
        matches!(self, Response::BadRequest)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Response::NotFound)
    }

    pub fn is_redirect_to(&self, expected: &str) -> bool {
        matches!(self, Response::Redirect { location, .. } if location == expected)
    }
}
