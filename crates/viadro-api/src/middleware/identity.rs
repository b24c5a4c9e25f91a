//! Identity middleware.
//!
//! Resolves the bearer token on every request and stores the resulting
//! [`Principal`] in the request extensions. Every response varies on
//! `Authorization`.

use crate::auth::identity::{IdentityError, IdentityResolver};
use crate::domain::ApiError;
use axum::{
    body::Body,
    http::{header, HeaderValue, Request},
    response::{IntoResponse, Response},
};
use tower::{Layer, Service};
use tracing::{debug, warn};

/// Identity layer
#[derive(Clone)]
pub struct IdentityLayer {
    resolver: IdentityResolver,
}

impl IdentityLayer {
    pub fn new(resolver: IdentityResolver) -> Self {
        Self { resolver }
    }
}

impl<S> Layer<S> for IdentityLayer {
    type Service = IdentityService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        IdentityService {
            inner,
            resolver: self.resolver.clone(),
        }
    }
}

/// Identity service
#[derive(Clone)]
pub struct IdentityService<S> {
    inner: S,
    resolver: IdentityResolver,
}

fn vary_on_authorization(mut response: Response) -> Response {
    response
        .headers_mut()
        .append(header::VARY, HeaderValue::from_static("Authorization"));
    response
}

impl<S> Service<Request<Body>> for IdentityService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let resolver = self.resolver.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            // A header that is not valid visible ASCII is as malformed as a bad scheme
            let header = match req.headers().get(header::AUTHORIZATION) {
                None => Ok(None),
                Some(value) => value.to_str().map(Some).map_err(|_| IdentityError::InvalidToken),
            };

            let resolved = match header {
                Ok(header) => resolver.authenticate(header).await,
                Err(e) => Err(e),
            };

            let principal = match resolved {
                Ok(principal) => principal,
                Err(IdentityError::InvalidToken) => {
                    debug!(path = %req.uri().path(), "rejected bearer token");
                    return Ok(vary_on_authorization(
                        ApiError::invalid_authentication_token().into_response(),
                    ));
                }
                Err(IdentityError::Internal(detail)) => {
                    warn!(error = %detail, "identity resolution failed");
                    return Ok(vary_on_authorization(
                        ApiError::server_error(detail).into_response(),
                    ));
                }
            };

            req.extensions_mut().insert(principal);
            let response = inner.call(req).await?;
            Ok(vary_on_authorization(response))
        })
    }
}
