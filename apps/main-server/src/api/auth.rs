//! Registration, login and logout.

use auth::{
    RegisterFailure, SessionUser, hash_password, map_register_error, validate_login,
    validate_register, verify_password,
};
use axum::{
    Form,
    extract::State,
    response::{Redirect, Response},
};
use entities::User;
use location_store::{LocationStore, StoreError};
use mailer::EmailJob;
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::middleware::RequestContext;
use crate::state::SharedState;

const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid username or password";

/// Registration form.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Login form.
#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default, rename = "usernameOrEmail")]
    pub username_or_email: String,
    #[serde(default)]
    pub password: String,
}

fn session_user(user: &User) -> SessionUser {
    SessionUser {
        id: user.id,
        username: user.username.clone(),
        email: user.email.clone(),
    }
}

/// Describes a store failure in the shape the message lookup expects.
fn register_failure(err: &StoreError) -> RegisterFailure {
    match err {
        StoreError::DuplicateKey { field, .. } => RegisterFailure::DuplicateKey {
            field: field.to_string(),
        },
        StoreError::Validation { field, message, .. } => RegisterFailure::Validation {
            username: (*field == "username").then(|| message.clone()),
            email: (*field == "email").then(|| message.clone()),
            message: message.clone(),
        },
        StoreError::Other(message) => RegisterFailure::Other {
            message: Some(message.clone()),
        },
        other => RegisterFailure::Other {
            message: Some(other.to_string()),
        },
    }
}

/// `POST /register`
pub async fn register<S: LocationStore + 'static>(
    State(state): State<SharedState<S>>,
    mut ctx: RequestContext,
    Form(form): Form<RegisterForm>,
) -> Response {
    let validation = validate_register(&form.username, &form.email, &form.password);
    if !validation.valid {
        ctx.error(validation.errors.join(" "));
        return ctx.finish(&state, Redirect::to("/register")).await;
    }

    let password_hash = match hash_password(&validation.password) {
        Ok(hash) => hash,
        Err(e) => {
            error!(error = %e, "Failed to hash password");
            ctx.error(map_register_error(&RegisterFailure::Other { message: None }));
            return ctx.finish(&state, Redirect::to("/register")).await;
        }
    };

    let user = User::new(&validation.username, password_hash).with_email(&validation.email);
    let user = match state.store.create_user(user).await {
        Ok(user) => user,
        Err(e) => {
            warn!(username = %validation.username, error = %e, "Registration failed");
            ctx.error(map_register_error(&register_failure(&e)));
            return ctx.finish(&state, Redirect::to("/register")).await;
        }
    };

    info!(user_id = %user.id, username = %user.username, "User registered");
    ctx.login(session_user(&user));
    ctx.success(format!("Welcome to BuenaVista, {}!", user.username));
    let response = ctx.finish(&state, Redirect::to("/locations")).await;

    if let Some(email) = user.email() {
        state.mailer.dispatch(EmailJob::Onboarding {
            to: email.to_string(),
            username: user.username.clone(),
        });
    }

    response
}

/// `POST /login`
pub async fn login<S: LocationStore + 'static>(
    State(state): State<SharedState<S>>,
    mut ctx: RequestContext,
    Form(form): Form<LoginForm>,
) -> Response {
    let validation = validate_login(&form.username_or_email, &form.password);
    if !validation.valid {
        ctx.error(validation.message.unwrap_or_default());
        return ctx.finish(&state, Redirect::to("/login")).await;
    }

    let found = state
        .store
        .find_user_by_login(form.username_or_email.trim())
        .await
        .inspect_err(|e| error!(error = %e, "Failed to look up user"))
        .ok()
        .flatten();

    let user = match found {
        Some(user) if verify_password(&form.password, &user.password_hash) => user,
        _ => {
            ctx.error(INVALID_CREDENTIALS_MESSAGE);
            return ctx.finish(&state, Redirect::to("/login")).await;
        }
    };

    info!(user_id = %user.id, "User logged in");
    ctx.login(session_user(&user));
    ctx.success(format!("Welcome back, {}!", user.username));
    ctx.finish(&state, Redirect::to("/locations")).await
}

/// `GET /logout`
pub async fn logout<S: LocationStore + 'static>(
    State(state): State<SharedState<S>>,
    mut ctx: RequestContext,
) -> Response {
    if let Some(user) = ctx.user() {
        info!(user_id = %user.id, "User logged out");
    }
    ctx.logout();
    ctx.finish(&state, Redirect::to("/locations?logged_out=1")).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_failure_mapping() {
        let duplicate = StoreError::duplicate_key("User", "email", "a@example.com");
        assert_eq!(
            map_register_error(&register_failure(&duplicate)),
            auth::DUPLICATE_EMAIL_MESSAGE
        );

        let invalid = StoreError::Validation {
            entity_type: "User",
            field: "username",
            message: "Username is invalid".to_string(),
        };
        assert_eq!(map_register_error(&register_failure(&invalid)), "Username is invalid");

        let other = StoreError::Other("connection reset".to_string());
        assert_eq!(map_register_error(&register_failure(&other)), "connection reset");
    }
}
