//! Resolves the `Authorization: Bearer <token>` header into the caller's session.
//!
//! Wrap a scope with [`SessionAuthFactory`] and every handler inside it can extract the session with
//! `web::ReqData<SessionData>` and the raw token with `web::ReqData<AccessToken>`. Requests without a live session
//! never reach the handler.

use std::{future::Future, pin::Pin, rc::Rc};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderMap, AUTHORIZATION},
    Error,
    HttpMessage,
};
use futures::future::{ok, Ready};
use log::*;
use shop_engine::{CacheBackend, ShopCache};

use crate::errors::{AuthError, ServerError};

/// The access token the request was made with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken(pub String);

/// Reads the bearer token from the headers. A missing header is `Ok(None)`.
pub fn bearer_token(headers: &HeaderMap) -> Result<Option<String>, AuthError> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|e| AuthError::PoorlyFormattedToken(e.to_string()))?;
    let token = value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AuthError::PoorlyFormattedToken("Expected 'Bearer <token>'".to_string()))?;
    Ok(Some(token.to_string()))
}

pub struct SessionAuthFactory<C> {
    cache: ShopCache<C>,
}

impl<C: CacheBackend> SessionAuthFactory<C> {
    pub fn new(cache: C) -> Self {
        Self { cache: ShopCache::new(cache) }
    }
}

impl<S, B, C> Transform<S, ServiceRequest> for SessionAuthFactory<C>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
    C: CacheBackend,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = SessionAuthService<S, C>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(SessionAuthService { cache: self.cache.clone(), service: Rc::new(service) })
    }
}

pub struct SessionAuthService<S, C> {
    cache: ShopCache<C>,
    service: Rc<S>,
}

impl<S, B, C> Service<ServiceRequest> for SessionAuthService<S, C>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
    C: CacheBackend,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let cache = self.cache.clone();
        Box::pin(async move {
            let token = bearer_token(req.headers())
                .map_err(ServerError::from)?
                .ok_or(ServerError::AuthenticationError(AuthError::MissingToken))?;
            let session = cache.session(&token).await.map_err(ServerError::from)?.ok_or_else(|| {
                debug!("💻️ Request to {} with an unknown or expired token", req.path());
                ServerError::AuthenticationError(AuthError::SessionExpired)
            })?;
            trace!("💻️ Request to {} from user {}", req.path(), session.user_id);
            req.extensions_mut().insert(session);
            req.extensions_mut().insert(AccessToken(token));
            service.call(req).await
        })
    }
}

#[cfg(test)]
mod test {
    use actix_web::http::header::HeaderValue;

    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn reads_bearer_tokens() {
        assert_eq!(bearer_token(&HeaderMap::new()).unwrap(), None);
        assert_eq!(bearer_token(&headers("Bearer abc123")).unwrap(), Some("abc123".to_string()));
        assert!(bearer_token(&headers("Basic abc123")).is_err());
        assert!(bearer_token(&headers("Bearer ")).is_err());
    }
}
