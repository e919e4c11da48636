//! Request forgery protection.
//!
//! Form views get a token, which must come back with each state changing POST
//! either in the form field [`FORM_FIELD`] or in the header [`HEADER`].
//! The same token travels in a signed cookie, so nothing is kept on the server.

use std::{
    convert::Infallible,
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use axum::{
    body::Body,
    extract::Request,
    response::{IntoResponse, Response},
};
use http::{header::CONTENT_TYPE, Method};
use tower::{Layer, Service};
use tower_cookies::{cookie::SameSite, Cookie, Cookies, Key};
use tracing::{debug, error};

use crate::{
    error::{ApiError, ApiResult},
    state::AppConfig,
};

pub const FORM_FIELD: &str = "__RequestVerificationToken";
pub const HEADER: &str = "RequestVerificationToken";

/// Issues tokens and reads them back from the signed cookie.
#[derive(Clone)]
pub struct AntiForgeryTokens {
    key: Key,
    cookie_name: String,
    secure: bool,
    max_age: time::Duration,
}

impl AntiForgeryTokens {
    pub fn new(key: Key, config: &AppConfig) -> Self {
        AntiForgeryTokens {
            key,
            cookie_name: config.token_cookie.clone(),
            secure: config.secure_cookie,
            max_age: config.token_max_age,
        }
    }

    /// Returns token of the client, creating one if needed, and (re)sets its cookie.
    pub fn issue(&self, cookies: &Cookies) -> String {
        let token = self.cookie_token(cookies).unwrap_or_else(|| {
            debug!("Issued new anti-forgery token");
            uuid::Uuid::new_v4().simple().to_string()
        });
        let cookie = Cookie::build((self.cookie_name.clone(), token.clone()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(self.secure)
            .max_age(self.max_age)
            .build();
        cookies.signed(&self.key).add(cookie);
        token
    }

    /// Token from the cookie, `None` if absent or the signature does not match.
    fn cookie_token(&self, cookies: &Cookies) -> Option<String> {
        cookies
            .signed(&self.key)
            .get(&self.cookie_name)
            .map(|c| c.value().to_string())
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();
    if a_bytes.len() != b_bytes.len() {
        return false;
    }
    let mut result = 0;
    for (x, y) in a_bytes.iter().zip(b_bytes.iter()) {
        result |= x ^ y;
    }
    result == 0
}

fn token_from_form(body: &[u8]) -> Option<String> {
    url::form_urlencoded::parse(body)
        .find(|(name, _)| name == FORM_FIELD)
        .map(|(_, value)| value.into_owned())
}

fn is_form(request: &Request) -> bool {
    request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/x-www-form-urlencoded"))
        .unwrap_or(false)
}

/// Checks submitted token against the cookie, returns request with body restored.
async fn verify(
    request: Request,
    tokens: &AntiForgeryTokens,
    form_size_limit: usize,
) -> ApiResult<Request> {
    let cookies = request.extensions().get::<Cookies>().cloned().ok_or_else(|| {
        error!("Cookie layer is missing, cannot verify anti-forgery token");
        ApiError::InternalError(anyhow::anyhow!("Missing cookies"))
    })?;
    let expected = tokens.cookie_token(&cookies).ok_or_else(|| {
        debug!("No valid anti-forgery cookie");
        ApiError::InvalidAntiForgeryToken
    })?;

    let header_token = request
        .headers()
        .get(HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());

    let (request, submitted) = match header_token {
        Some(token) => (request, Some(token)),
        None if is_form(&request) => {
            let (parts, body) = request.into_parts();
            let bytes = axum::body::to_bytes(body, form_size_limit)
                .await
                .map_err(|e| ApiError::InvalidRequest(format!("Cannot read form: {e}")))?;
            let token = token_from_form(&bytes);
            (Request::from_parts(parts, Body::from(bytes)), token)
        }
        None => (request, None),
    };

    match submitted {
        Some(token) if constant_time_eq(&token, &expected) => Ok(request),
        Some(_) => {
            debug!("Anti-forgery token mismatch");
            Err(ApiError::InvalidAntiForgeryToken)
        }
        None => {
            debug!("Anti-forgery token not submitted");
            Err(ApiError::InvalidAntiForgeryToken)
        }
    }
}

/// Layer rejecting POST requests without valid anti-forgery token.
///
/// Requires `tower_cookies::CookieManagerLayer` further out in the stack.
#[derive(Clone)]
pub struct AntiForgeryLayer {
    tokens: AntiForgeryTokens,
    form_size_limit: usize,
}

impl AntiForgeryLayer {
    pub fn new(tokens: AntiForgeryTokens, form_size_limit: usize) -> Self {
        Self {
            tokens,
            form_size_limit,
        }
    }
}

impl<S> Layer<S> for AntiForgeryLayer {
    type Service = AntiForgery<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AntiForgery {
            inner,
            tokens: self.tokens.clone(),
            form_size_limit: self.form_size_limit,
        }
    }
}

#[derive(Clone)]
pub struct AntiForgery<S> {
    inner: S,
    tokens: AntiForgeryTokens,
    form_size_limit: usize,
}

impl<S> Service<Request> for AntiForgery<S>
where
    S: Service<Request, Response = Response, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        // inner service was made ready in poll_ready, keep that one and leave a clone behind
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let tokens = self.tokens.clone();
        let form_size_limit = self.form_size_limit;
        Box::pin(async move {
            if request.method() != Method::POST {
                return inner.call(request).await;
            }
            match verify(request, &tokens, form_size_limit).await {
                Ok(request) => inner.call(request).await,
                Err(e) => Ok(e.into_response()),
            }
        })
    }
}
