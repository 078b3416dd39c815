// Auth Service - registered users and the current session

use crate::application::json_store::{decode_array, encode};
use crate::domain::expiry::to_iso_string;
use crate::domain::user::{AUTH_KEY, USERS_KEY};
use crate::domain::{AuthSession, FieldErrors, User};
use crate::error::{AppError, Result};
use crate::port::{IdProvider, KeyValueStore, TimeProvider};
use std::sync::Arc;
use tracing::{info, warn};

/// Shortest accepted password
pub const MIN_PASSWORD_LEN: usize = 6;

pub struct AuthService {
    store: Arc<dyn KeyValueStore>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            store,
            id_provider,
            time_provider,
        }
    }

    /// Register a new user and sign them in
    pub async fn signup(&self, name: &str, email: &str, password: &str) -> Result<User> {
        let mut errors = FieldErrors::new();
        if name.trim().is_empty() {
            errors.add("name", "Name is required");
        }
        if email.trim().is_empty() {
            errors.add("email", "Email is required");
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            errors.add(
                "password",
                format!("Password must be at least {} characters", MIN_PASSWORD_LEN),
            );
        }
        errors.into_result()?;

        let mut tx = self.store.begin().await?;
        let mut users: Vec<User> = decode_array(USERS_KEY, tx.get(USERS_KEY).await?)?;

        if users.iter().any(|u| u.email == email) {
            tx.rollback().await?;
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let now = self.time_provider.now();
        let user = User {
            id: format!(
                "user_{}_{}",
                now.timestamp_millis(),
                self.id_provider.generate_id()
            ),
            name: name.trim().to_string(),
            email: email.to_string(),
            password: password.to_string(),
            created_at: to_iso_string(now),
        };

        users.push(user.clone());
        tx.set(USERS_KEY, &encode(&users)?).await?;
        tx.set(AUTH_KEY, &encode(&AuthSession::logged_in(user.clone()))?)
            .await?;
        tx.commit().await?;

        info!(user_id = %user.id, "User signed up");
        Ok(user)
    }

    /// Sign in with email and password
    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        let user = self
            .users()
            .await?
            .into_iter()
            .find(|u| u.email == email && u.password == password)
            .ok_or_else(|| AppError::Unauthorized("Invalid email or password".to_string()))?;

        self.save_session(&AuthSession::logged_in(user.clone()))
            .await?;
        info!(user_id = %user.id, "User logged in");
        Ok(user)
    }

    pub async fn logout(&self) -> Result<()> {
        self.save_session(&AuthSession::signed_out()).await?;
        info!("Signed out");
        Ok(())
    }

    /// Browse without an account. Guests can read but never own listings.
    pub async fn continue_as_guest(&self) -> Result<()> {
        self.save_session(&AuthSession::guest()).await
    }

    /// Current session. A missing or unreadable record means signed out.
    pub async fn session(&self) -> Result<AuthSession> {
        let Some(raw) = self.store.get(AUTH_KEY).await? else {
            return Ok(AuthSession::signed_out());
        };

        match serde_json::from_str::<AuthSession>(&raw) {
            Ok(session) => Ok(session.normalized()),
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable auth session");
                Ok(AuthSession::signed_out())
            }
        }
    }

    pub async fn users(&self) -> Result<Vec<User>> {
        decode_array(USERS_KEY, self.store.get(USERS_KEY).await?)
    }

    pub async fn user_by_id(&self, id: &str) -> Result<Option<User>> {
        Ok(self.users().await?.into_iter().find(|u| u.id == id))
    }

    /// Contact email shown on a listing card
    pub async fn user_email(&self, id: &str) -> Result<Option<String>> {
        Ok(self.user_by_id(id).await?.map(|u| u.email))
    }

    async fn save_session(&self, session: &AuthSession) -> Result<()> {
        self.store.set(AUTH_KEY, &encode(session)?).await
    }
}
