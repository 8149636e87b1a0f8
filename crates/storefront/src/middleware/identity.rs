//! Identity resolution extractors.
//!
//! A request is resolved, in order, to:
//!
//! 1. the account in the session (`current_user`, written by the sign-in flow)
//! 2. the account in `x-account-id`, when the upstream gateway is trusted
//! 3. an anonymous guest, minted on first use and kept in the session
//!
//! When a request resolves to an account while the session still carries a
//! guest ID, the guest cart is folded into the account cart and the guest ID
//! is dropped from the session.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};
use secrecy::ExposeSecret;
use tower_sessions::Session;
use tracing::debug;

use bazaar_core::{AccountId, CartOwner, GuestId};

use crate::error::{AppError, set_sentry_user};
use crate::models::{CurrentUser, session_keys};
use crate::state::AppState;

/// Header carrying the account ID from a trusted upstream gateway.
pub const ACCOUNT_HEADER: &str = "x-account-id";

fn session_error(e: &tower_sessions::session::Error) -> AppError {
    AppError::Internal(format!("session error: {e}"))
}

async fn session_user(session: Option<&Session>) -> Result<Option<CurrentUser>, AppError> {
    match session {
        Some(session) => session
            .get::<CurrentUser>(session_keys::CURRENT_USER)
            .await
            .map_err(|e| session_error(&e)),
        None => Ok(None),
    }
}

fn header_account(headers: &HeaderMap) -> Result<Option<AccountId>, AppError> {
    headers
        .get(ACCOUNT_HEADER)
        .map(|value| {
            value
                .to_str()
                .ok()
                .and_then(|s| s.parse::<AccountId>().ok())
                .ok_or_else(|| AppError::BadRequest(format!("Invalid {ACCOUNT_HEADER} header")))
        })
        .transpose()
}

/// Resolve the signed-in account (session first, then trusted header) and
/// merge any leftover guest cart into it.
async fn resolve_account(
    parts: &Parts,
    state: &AppState,
) -> Result<Option<(AccountId, Option<CurrentUser>)>, AppError> {
    let session = parts.extensions.get::<Session>();
    let user = session_user(session).await?;

    let account = match &user {
        Some(user) => Some(user.id),
        None if state.config().trust_account_header => header_account(&parts.headers)?,
        None => None,
    };
    let Some(account) = account else {
        return Ok(None);
    };

    set_sentry_user(&account);

    if let Some(session) = session
        && let Some(guest) = session
            .get::<GuestId>(session_keys::GUEST_ID)
            .await
            .map_err(|e| session_error(&e))?
    {
        state.carts().merge_guest(guest, account).await?;
        session
            .remove::<GuestId>(session_keys::GUEST_ID)
            .await
            .map_err(|e| session_error(&e))?;
        debug!(%guest, %account, "Guest cart merged after sign-in");
    }

    Ok(Some((account, user)))
}

/// Extractor resolving the cart owner: the signed-in account, or a guest.
///
/// Never rejects an anonymous caller; a guest ID is minted and stored in
/// the session on first use.
pub struct CartOwnerExt(pub CartOwner);

impl FromRequestParts<AppState> for CartOwnerExt {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some((account, _)) = resolve_account(parts, state).await? {
            return Ok(Self(CartOwner::Account(account)));
        }

        let session = parts
            .extensions
            .get::<Session>()
            .ok_or_else(|| AppError::Internal("session layer missing".to_string()))?;

        let existing = session
            .get::<GuestId>(session_keys::GUEST_ID)
            .await
            .map_err(|e| session_error(&e))?;
        let guest = match existing {
            Some(guest) => guest,
            None => {
                let guest = GuestId::generate();
                session
                    .insert(session_keys::GUEST_ID, guest)
                    .await
                    .map_err(|e| session_error(&e))?;
                debug!(%guest, "Guest session started");
                guest
            }
        };

        Ok(Self(CartOwner::Guest(guest)))
    }
}

/// Extractor that requires a signed-in account.
///
/// Rejects anonymous callers with 401.
pub struct RequireAccount(pub AccountId);

impl FromRequestParts<AppState> for RequireAccount {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        resolve_account(parts, state)
            .await?
            .map(|(account, _)| Self(account))
            .ok_or_else(|| AppError::Unauthorized("Sign in required".to_string()))
    }
}

/// Extractor for administrative routes.
///
/// Accepts `Authorization: Bearer <STOREFRONT_ADMIN_TOKEN>` or a session
/// user with the admin role. Anonymous callers get 401, signed-in
/// customers 403.
pub struct RequireAdmin;

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(token) = bearer_token(&parts.headers) {
            if constant_time_compare(token, state.config().admin_token.expose_secret()) {
                return Ok(Self);
            }
            return Err(AppError::Unauthorized("Invalid admin token".to_string()));
        }

        match session_user(parts.extensions.get::<Session>()).await? {
            Some(user) if user.is_admin() => Ok(Self),
            Some(_) => Err(AppError::Forbidden("Admin access required".to_string())),
            None => Err(AppError::Unauthorized("Sign in required".to_string())),
        }
    }
}

/// Helper for the sign-in flow to record the current user in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Helper to clear the current user from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentUser>(session_keys::CURRENT_USER)
        .await?;
    Ok(())
}
