use anyhow::Context;
use lazy_static::lazy_static;
use tracing::{debug, warn};
use uuid::Uuid;

use super::basic::Credentials;
use super::password::{hash_password, verify_password};
use crate::db::Store;
use crate::error::AppError;
use crate::users::services::normalize_email;

/// Request-scoped identity established by a successful Basic login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub email: String,
}

lazy_static! {
    /// Verified against on unknown emails so both failures cost one argon2 run.
    static ref DUMMY_HASH: Option<String> = hash_password("not-a-real-password").ok();
}

/// Unknown email and wrong password fail identically.
pub async fn authenticate(store: &dyn Store, creds: &Credentials) -> Result<Identity, AppError> {
    let email = normalize_email(&creds.name);

    let Some(user) = store.find_user_by_email(&email).await? else {
        if let Some(hash) = DUMMY_HASH.as_deref() {
            let _ = verify_password(&creds.pass, hash);
        }
        warn!(email = %email, "authentication failed: unknown email");
        return Err(AppError::authentication("Access denied"));
    };

    let ok = verify_password(&creds.pass, &user.password)
        .context("verify stored password hash")?;
    if !ok {
        warn!(email = %email, user_id = %user.id, "authentication failed: wrong password");
        return Err(AppError::authentication("Access denied"));
    }

    debug!(user_id = %user.id, "authenticated");
    Ok(Identity {
        user_id: user.id,
        email: user.email_address,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::users::repo_types::NewUser;

    async fn store_with_user(email: &str, password: &str) -> (MemoryStore, Uuid) {
        let store = MemoryStore::new();
        let user = store
            .create_user(NewUser {
                first_name: "Grace".into(),
                last_name: "Hopper".into(),
                email_address: email.into(),
                password_hash: hash_password(password).unwrap(),
            })
            .await
            .unwrap();
        (store, user.id)
    }

    fn creds(name: &str, pass: &str) -> Credentials {
        Credentials {
            name: name.into(),
            pass: pass.into(),
        }
    }

    #[tokio::test]
    async fn valid_credentials_yield_identity() {
        let (store, id) = store_with_user("grace@navy.mil", "cobol").await;
        let identity = authenticate(&store, &creds("grace@navy.mil", "cobol"))
            .await
            .unwrap();
        assert_eq!(identity.user_id, id);
        assert_eq!(identity.email, "grace@navy.mil");
    }

    #[tokio::test]
    async fn login_name_is_case_insensitive() {
        let (store, id) = store_with_user("grace@navy.mil", "cobol").await;
        let identity = authenticate(&store, &creds("  Grace@Navy.MIL ", "cobol"))
            .await
            .unwrap();
        assert_eq!(identity.user_id, id);
    }

    #[tokio::test]
    async fn unknown_email_is_authentication_error() {
        let (store, _) = store_with_user("grace@navy.mil", "cobol").await;
        let err = authenticate(&store, &creds("nobody@navy.mil", "cobol"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Authentication(_)));
    }

    #[test]
    fn unknown_email_path_runs_a_real_verification() {
        let hash = DUMMY_HASH.as_deref().expect("dummy hash is generated");
        assert!(hash.starts_with("$argon2"));
        assert!(!verify_password("cobol", hash).unwrap());
    }

    #[tokio::test]
    async fn wrong_password_is_authentication_error() {
        let (store, _) = store_with_user("grace@navy.mil", "cobol").await;
        let err = authenticate(&store, &creds("grace@navy.mil", "fortran"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Authentication(_)));
    }
}
