use tokio::io::AsyncRead;

use http_server::request::Request;
use http_server::response::Response;
use http_server::server;

use warbler_app::app::Warbler;
use warbler_app::authorization::AuthService;
use warbler_app::data_access::DataAccess;

use crate::routing;

#[derive(Clone)]
pub struct RequestHandler<D, A> {
    app: Warbler<D, A>,
}

impl<D: DataAccess, A: AuthService> RequestHandler<D, A> {
    pub fn new(data_access: D, auth_service: A) -> Self {
        RequestHandler {
            app: Warbler::new(data_access, auth_service),
        }
    }
}

#[derive(Debug)]
pub struct RequestHandlerError {
    inner: anyhow::Error,
}

impl From<anyhow::Error> for RequestHandlerError {
    fn from(inner: anyhow::Error) -> Self {
        RequestHandlerError { inner }
    }
}

impl std::fmt::Display for RequestHandlerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl std::error::Error for RequestHandlerError {}

impl<D: DataAccess, A: AuthService, T: AsyncRead + Unpin + Sync + Send>
    server::RequestHandler<Request<T>> for RequestHandler<D, A>
{
    type Error = RequestHandlerError;

    fn handle(
        self,
        request: &mut Request<T>,
    ) -> impl std::future::Future<Output = Result<Response, Self::Error>> + Send {
        routing::route(request, self.app)
    }
}
