//! Per-request session context.
//!
//! [`RequestContext`] loads the caller's session from the cookie, carries
//! flash messages through the handler, and persists the session when the
//! handler calls [`RequestContext::finish`].

use auth::{Flash, FlashKind, SESSION_COOKIE_NAME, SESSION_TTL_DAYS, Session, SessionToken, SessionUser};
use axum::{
    extract::FromRequestParts,
    http::{
        HeaderMap,
        header::{ACCEPT, REFERER},
        request::Parts,
    },
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use location_store::LocationStore;
use serde::Serialize;
use tracing::{debug, error};

use crate::error::ServerError;
use crate::state::{AppState, SharedState};

/// Flash shown on the page after logout.
pub const LOGGED_OUT_MESSAGE: &str = "You have been logged out!";

/// How the handler should answer: JSON body or redirect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    Json,
    Redirect,
}

impl ResponseMode {
    /// JSON when the `Accept` header mentions json.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let wants_json = headers
            .get(ACCEPT)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|accept| accept.to_ascii_lowercase().contains("json"));

        if wants_json {
            ResponseMode::Json
        } else {
            ResponseMode::Redirect
        }
    }
}

/// View model handed to the template layer.
#[derive(Debug, Serialize)]
pub struct Page<T: Serialize> {
    pub template: &'static str,
    pub locals: T,
    pub flash: Flash,
    pub current_user: Option<SessionUser>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Active,
    LoggedIn,
    Destroyed,
}

/// Session state for one request.
#[derive(Debug)]
pub struct RequestContext {
    token: Option<SessionToken>,
    session: Session,
    lifecycle: Lifecycle,
    referer: Option<String>,
    logged_out: bool,
    /// Response strategy for endpoints that serve both JSON and forms.
    pub mode: ResponseMode,
}

impl RequestContext {
    /// Creates a context for a request without a stored session.
    pub fn anonymous(mode: ResponseMode) -> Self {
        Self {
            token: None,
            session: Session::new(),
            lifecycle: Lifecycle::Active,
            referer: None,
            logged_out: false,
            mode,
        }
    }

    /// Returns the logged-in user.
    pub fn user(&self) -> Option<&SessionUser> {
        self.session.user.as_ref()
    }

    /// Queues a flash message.
    pub fn flash(&mut self, kind: FlashKind, message: impl Into<String>) {
        self.session.flash.push(kind, message);
    }

    /// Queues an error flash.
    pub fn error(&mut self, message: impl Into<String>) {
        self.flash(FlashKind::Error, message);
    }

    /// Queues a success flash.
    pub fn success(&mut self, message: impl Into<String>) {
        self.flash(FlashKind::Success, message);
    }

    /// Returns the page the request came from, or `/`.
    pub fn back(&self) -> String {
        self.referer
            .clone()
            .filter(|referer| !referer.is_empty())
            .unwrap_or_else(|| "/".to_string())
    }

    /// Redirect to [`Self::back`].
    pub fn redirect_back(&self) -> Redirect {
        Redirect::to(&self.back())
    }

    /// Logs the user in. A fresh session token is issued.
    pub fn login(&mut self, user: SessionUser) {
        self.session.user = Some(user);
        self.lifecycle = Lifecycle::LoggedIn;
    }

    /// Destroys the session.
    pub fn logout(&mut self) {
        self.session = Session::new();
        self.lifecycle = Lifecycle::Destroyed;
    }

    /// Builds a page view model, consuming the queued flash.
    pub fn render<T: Serialize>(&mut self, template: &'static str, locals: T) -> Page<T> {
        let mut flash = self.session.flash.take();
        if self.logged_out {
            flash.success = vec![LOGGED_OUT_MESSAGE.to_string()];
        }

        Page {
            template,
            locals,
            flash,
            current_user: self.session.user.clone(),
        }
    }

    fn session_cookie(value: String, max_age: time::Duration, secure: bool) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE_NAME, value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(secure)
            .max_age(max_age)
            .build()
    }

    /// Persists the session and attaches the session cookie to `response`.
    ///
    /// Sessions holding neither a user nor flash messages are not stored.
    pub async fn finish<S: LocationStore>(
        self,
        state: &AppState<S>,
        response: impl IntoResponse,
    ) -> Response {
        let response = response.into_response();
        let secure = state.config.secure_cookies();
        let sessions = &state.sessions;

        let replaces_token = self.lifecycle != Lifecycle::Active;
        if replaces_token || self.session.is_empty() {
            if let Some(old_token) = &self.token {
                if let Err(e) = sessions.destroy(old_token).await {
                    error!(error = %e, "Failed to destroy session");
                }
            }
        }

        if self.lifecycle == Lifecycle::Destroyed {
            let cookie = Self::session_cookie(String::new(), time::Duration::ZERO, secure);
            return (CookieJar::new().add(cookie), response).into_response();
        }
        if self.session.is_empty() {
            return response;
        }

        let token = match self.token {
            Some(token) if !replaces_token => token,
            _ => SessionToken::generate(),
        };
        if let Err(e) = sessions.save(&token, &self.session).await {
            error!(error = %e, "Failed to save session");
            return response;
        }
        debug!(logged_in = self.session.user.is_some(), "Session saved");

        let cookie = Self::session_cookie(
            token.as_str().to_string(),
            time::Duration::days(SESSION_TTL_DAYS),
            secure,
        );
        (CookieJar::new().add(cookie), response).into_response()
    }
}

fn has_logged_out_flag(parts: &Parts) -> bool {
    parts.uri.query().is_some_and(|query| {
        query
            .split('&')
            .any(|pair| pair.split('=').next() == Some("logged_out"))
    })
}

impl<S> FromRequestParts<SharedState<S>> for RequestContext
where
    S: LocationStore + 'static,
{
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState<S>,
    ) -> Result<Self, Self::Rejection> {
        let mut context = Self::anonymous(ResponseMode::from_headers(&parts.headers));
        context.referer = parts
            .headers
            .get(REFERER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        context.logged_out = has_logged_out_flag(parts);

        let jar = CookieJar::from_headers(&parts.headers);
        if let Some(cookie) = jar.get(SESSION_COOKIE_NAME) {
            let token = SessionToken::from_cookie(cookie.value());
            if let Some(session) = state.sessions.load(&token).await? {
                context.session = session;
                context.token = Some(token);
            }
        }

        Ok(context)
    }
}
