use anyhow::Context;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use super::dto::RegisterRequest;
use super::repo_types::{NewUser, User};
use crate::auth::password::hash_password;
use crate::db::Store;
use crate::error::{AppError, FieldError};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Emails are stored and looked up trimmed and lower-cased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

/// Field-level checks for a registration; empty when the request is valid.
/// Expects the email to be normalized already.
pub fn validate_registration(req: &RegisterRequest) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if is_blank(&req.first_name) {
        errors.push(FieldError::new("firstName", "First name is required."));
    }
    if is_blank(&req.last_name) {
        errors.push(FieldError::new("lastName", "Last name is required."));
    }
    match req.email_address.as_deref() {
        None | Some("") => {
            errors.push(FieldError::new("emailAddress", "Email address is required."))
        }
        Some(email) if !is_valid_email(email) => {
            errors.push(FieldError::new("emailAddress", "Email address is not valid."))
        }
        Some(_) => {}
    }
    if req.password.as_deref().map_or(true, str::is_empty) {
        errors.push(FieldError::new("password", "Password is required."));
    }
    errors
}

/// Validate, reject taken emails, hash the password and persist.
pub async fn register(store: &dyn Store, mut req: RegisterRequest) -> Result<User, AppError> {
    req.email_address = req.email_address.as_deref().map(normalize_email);

    let errors = validate_registration(&req);
    if !errors.is_empty() {
        warn!(fields = ?errors.iter().map(|e| e.field).collect::<Vec<_>>(), "invalid registration");
        return Err(AppError::validation(errors));
    }

    let RegisterRequest {
        first_name: Some(first_name),
        last_name: Some(last_name),
        email_address: Some(email_address),
        password: Some(password),
    } = req
    else {
        return Err(AppError::validation(Vec::new()));
    };

    // Checked up front; the unique index only backs up concurrent registrations.
    if store.find_user_by_email(&email_address).await?.is_some() {
        warn!(email = %email_address, "email already registered");
        return Err(AppError::validation(vec![FieldError::new(
            "emailAddress",
            "Email address is already in use.",
        )]));
    }

    let password_hash = hash_password(&password).context("hash password")?;
    drop(password);

    let user = store
        .create_user(NewUser {
            first_name: first_name.trim().to_string(),
            last_name: last_name.trim().to_string(),
            email_address,
            password_hash,
        })
        .await?;

    info!(user_id = %user.id, email = %user.email_address, "user registered");
    Ok(user)
}
