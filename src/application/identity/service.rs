//! Identity and session use-cases

use std::sync::Arc;

use chrono::Utc;
use tracing::warn;
use uuid::Uuid;

use crate::application::fleet::{FleetService, NewVehicleInput};
use crate::application::ports::{EmailSender, TokenRevocationStore};
use crate::domain::password_reset::PasswordReset;
use crate::domain::user::{is_institutional_email, PaymentMethod, Role, RoleSet, User};
use crate::domain::{DomainError, DomainResult, RepositoryProvider};
use crate::infrastructure::crypto::jwt::{create_token, JwtConfig};
use crate::infrastructure::crypto::password::{hash_password, verify_password};
use crate::infrastructure::crypto::reset_token;

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Payload of `POST /auth/register`.
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub university_id: String,
    pub phone: String,
    pub photo_url: Option<String>,
    pub role: String,
    /// Required when registering as a driver.
    pub vehicle: Option<NewVehicleInput>,
}

/// Payload of `PUT /auth/me`.
#[derive(Debug, Clone, Default)]
pub struct UpdateProfileInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub photo_url: Option<String>,
    pub emergency_contact: Option<String>,
    pub preferred_payment_method: Option<String>,
}

/// A successful login.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub expires_in_seconds: i64,
    pub user: User,
}

pub struct IdentityService {
    repos: Arc<dyn RepositoryProvider>,
    fleet: Arc<FleetService>,
    mailer: Arc<dyn EmailSender>,
    revocation: Arc<dyn TokenRevocationStore>,
    jwt: JwtConfig,
}

impl IdentityService {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        fleet: Arc<FleetService>,
        mailer: Arc<dyn EmailSender>,
        revocation: Arc<dyn TokenRevocationStore>,
        jwt: JwtConfig,
    ) -> Self {
        Self {
            repos,
            fleet,
            mailer,
            revocation,
            jwt,
        }
    }

    /// Register a passenger, or a driver together with their first vehicle.
    pub async fn register(&self, input: RegisterInput) -> DomainResult<User> {
        let now = Utc::now();
        let email = input.email.trim().to_lowercase();

        if !is_institutional_email(&email) {
            return Err(DomainError::validation("INVALID_EMAIL_DOMAIN"));
        }
        if input.password.len() < MIN_PASSWORD_LEN {
            return Err(DomainError::validation("WEAK_PASSWORD"));
        }
        let requested_role = Role::parse(&input.role)
            .ok_or_else(|| DomainError::validation("INVALID_ROLE"))?;
        if input.first_name.trim().is_empty()
            || input.last_name.trim().is_empty()
            || input.university_id.trim().is_empty()
            || input.phone.trim().is_empty()
        {
            return Err(DomainError::validation("MISSING_REQUIRED_FIELDS"));
        }

        let vehicle_input = match (requested_role, input.vehicle) {
            (Role::Driver, None) => return Err(DomainError::validation("VEHICLE_REQUIRED")),
            (Role::Driver, Some(v)) => {
                // Reject bad vehicle payloads (expired documents included)
                // before the user row exists.
                self.fleet.validate_new(&v, now)?;
                Some(v)
            }
            (Role::Passenger, _) => None,
        };

        let user = User {
            id: Uuid::new_v4().to_string(),
            email: email.clone(),
            password_hash: hash_password(&input.password)
                .map_err(|e| DomainError::internal(e.to_string()))?,
            first_name: input.first_name.trim().to_string(),
            last_name: input.last_name.trim().to_string(),
            university_id: input.university_id.trim().to_string(),
            phone: input.phone.trim().to_string(),
            photo_url: input.photo_url,
            roles: RoleSet::passenger_only(),
            active_role: Role::Passenger,
            active_vehicle_id: None,
            emergency_contact: None,
            preferred_payment_method: PaymentMethod::Cash,
            created_at: now,
            updated_at: now,
        };
        self.repos.users().insert(user.clone()).await?;

        if let Some(vehicle_input) = vehicle_input {
            if let Err(e) = self.fleet.create_vehicle(&user.id, vehicle_input).await {
                // Driver registration is atomic: no user without its vehicle.
                if let Err(del) = self.repos.users().delete(&user.id).await {
                    warn!("failed to roll back user {}: {}", user.id, del);
                }
                return Err(e);
            }
            // create_vehicle granted the role and the active vehicle.
            let mut registered = self
                .repos
                .users()
                .find_by_id(&user.id)
                .await?
                .ok_or_else(|| DomainError::not_found("User", "id", user.id.clone()))?;
            registered.active_role = Role::Driver;
            registered.updated_at = Utc::now();
            self.repos.users().update(registered.clone()).await?;
            self.dispatch_welcome(&registered).await;
            return Ok(registered);
        }

        self.dispatch_welcome(&user).await;
        Ok(user)
    }

    async fn dispatch_welcome(&self, user: &User) {
        if let Err(e) = self.mailer.send_welcome(&user.email, &user.first_name).await {
            warn!("welcome email to {} failed: {}", user.email, e);
        }
    }

    /// Verify credentials and mint a bearer token.
    pub async fn login(&self, email: &str, password: &str) -> DomainResult<Session> {
        let email = email.trim().to_lowercase();
        let user = self.repos.users().find_by_email(&email).await?;

        // Unknown user and wrong password answer identically.
        let Some(user) = user else {
            return Err(DomainError::Unauthenticated("INVALID_CREDENTIALS".into()));
        };
        if !verify_password(password, &user.password_hash).unwrap_or(false) {
            return Err(DomainError::Unauthenticated("INVALID_CREDENTIALS".into()));
        }

        let token = create_token(&user.id, &user.email, &self.jwt)
            .map_err(|e| DomainError::internal(e.to_string()))?;
        Ok(Session {
            token,
            expires_in_seconds: self.jwt.expiration_days * 24 * 3600,
            user,
        })
    }

    pub async fn current_user(&self, user_id: &str) -> DomainResult<User> {
        self.repos
            .users()
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("User", "id", user_id))
    }

    pub async fn update_profile(
        &self,
        user_id: &str,
        input: UpdateProfileInput,
    ) -> DomainResult<User> {
        let mut user = self.current_user(user_id).await?;

        if let Some(first_name) = input.first_name {
            if first_name.trim().is_empty() {
                return Err(DomainError::validation("MISSING_REQUIRED_FIELDS"));
            }
            user.first_name = first_name.trim().to_string();
        }
        if let Some(last_name) = input.last_name {
            if last_name.trim().is_empty() {
                return Err(DomainError::validation("MISSING_REQUIRED_FIELDS"));
            }
            user.last_name = last_name.trim().to_string();
        }
        if let Some(phone) = input.phone {
            user.phone = phone.trim().to_string();
        }
        if let Some(photo_url) = input.photo_url {
            user.photo_url = Some(photo_url);
        }
        if let Some(contact) = input.emergency_contact {
            user.emergency_contact = Some(contact);
        }
        if let Some(method) = input.preferred_payment_method {
            user.preferred_payment_method = PaymentMethod::parse(&method)
                .ok_or_else(|| DomainError::validation("INVALID_PAYMENT_METHOD"))?;
        }
        user.updated_at = Utc::now();
        self.repos.users().update(user.clone()).await?;
        Ok(user)
    }

    /// Server-side token invalidation.
    pub fn logout(&self, token: &str, exp: i64) {
        self.revocation.revoke(token, exp);
    }

    /// `PUT /auth/role`: flip the active role within the capability set.
    pub async fn switch_role(&self, user_id: &str, role: &str) -> DomainResult<User> {
        let now = Utc::now();
        let mut user = self.current_user(user_id).await?;
        let role = Role::parse(role).ok_or_else(|| DomainError::validation("INVALID_ROLE"))?;

        if !user.roles.contains(role) {
            return Err(DomainError::forbidden("ROLE_NOT_ENABLED"));
        }

        if role == Role::Driver {
            let vehicles = self.repos.vehicles().find_by_owner(&user.id).await?;
            let eligible: Vec<_> = vehicles.iter().filter(|v| v.is_activatable(now)).collect();
            if eligible.is_empty() {
                return Err(DomainError::precondition("DOCUMENTS_INVALID"));
            }
            if user.active_vehicle_id.is_none() {
                user.active_vehicle_id = eligible.first().map(|v| v.id.clone());
            }
        }

        user.active_role = role;
        user.updated_at = now;
        self.repos.users().update(user.clone()).await?;
        Ok(user)
    }

    /// `POST /auth/forgot-password`: always succeeds, to avoid enumeration.
    pub async fn forgot_password(&self, email: &str) -> DomainResult<()> {
        let email = email.trim().to_lowercase();
        let Some(user) = self.repos.users().find_by_email(&email).await? else {
            return Ok(());
        };

        let now = Utc::now();
        let (raw, hash) = reset_token::generate();
        let reset = PasswordReset::issue(Uuid::new_v4().to_string(), user.id.clone(), hash, now);
        let expires_at = reset.expires_at;
        self.repos.password_resets().issue(reset).await?;

        if let Err(e) = self
            .mailer
            .send_password_reset(&user.email, &raw, expires_at)
            .await
        {
            warn!("password reset email to {} failed: {}", user.email, e);
        }
        Ok(())
    }

    /// `POST /auth/reset-password`: single-use, hash-addressed.
    pub async fn reset_password(&self, raw_token: &str, new_password: &str) -> DomainResult<()> {
        if new_password.len() < MIN_PASSWORD_LEN {
            return Err(DomainError::validation("WEAK_PASSWORD"));
        }

        let hash = reset_token::hash_token(raw_token);
        let reset = self
            .repos
            .password_resets()
            .find_by_token_hash(&hash)
            .await?;
        let Some(reset) = reset else {
            return Err(DomainError::precondition("TOKEN_INVALID_OR_EXPIRED"));
        };
        if !reset.is_redeemable(Utc::now()) {
            return Err(DomainError::precondition("TOKEN_INVALID_OR_EXPIRED"));
        }

        let password_hash =
            hash_password(new_password).map_err(|e| DomainError::internal(e.to_string()))?;
        self.repos
            .password_resets()
            .redeem(&reset.id, &password_hash)
            .await
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{DateTime, Duration};

    use super::*;
    use crate::application::fleet::VehicleLimits;
    use crate::application::ports::EmailSender;
    use crate::domain::vehicle::VehicleStatus;
    use crate::domain::DomainResult;
    use crate::infrastructure::database::test_support::connect_test_db;
    use crate::infrastructure::database::SeaOrmRepositoryProvider;
    use crate::infrastructure::storage::MemoryBlobStore;
    use crate::infrastructure::InMemoryRevocationStore;

    /// Captures outbound mail so tests can read the raw reset token.
    #[derive(Default)]
    struct RecordingMailer {
        reset_tokens: Mutex<Vec<String>>,
        welcomes: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl EmailSender for RecordingMailer {
        async fn send_welcome(&self, to: &str, _first_name: &str) -> DomainResult<()> {
            self.welcomes.lock().unwrap().push(to.to_string());
            Ok(())
        }

        async fn send_password_reset(
            &self,
            _to: &str,
            raw_token: &str,
            _expires_at: DateTime<Utc>,
        ) -> DomainResult<()> {
            self.reset_tokens.lock().unwrap().push(raw_token.to_string());
            Ok(())
        }

        async fn send_trip_cancelled(
            &self,
            _to: &str,
            _passenger_name: &str,
            _origin: &str,
            _destination: &str,
            _departure_at: DateTime<Utc>,
        ) -> DomainResult<()> {
            Ok(())
        }
    }

    struct Harness {
        identity: IdentityService,
        fleet: Arc<FleetService>,
        mailer: Arc<RecordingMailer>,
        repos: Arc<dyn RepositoryProvider>,
    }

    async fn harness() -> Harness {
        let db = connect_test_db().await;
        let repos: Arc<dyn RepositoryProvider> = Arc::new(SeaOrmRepositoryProvider::new(db));
        let fleet = Arc::new(FleetService::new(
            repos.clone(),
            Arc::new(MemoryBlobStore::new()),
            VehicleLimits::default(),
        ));
        let mailer = Arc::new(RecordingMailer::default());
        let identity = IdentityService::new(
            repos.clone(),
            fleet.clone(),
            mailer.clone(),
            Arc::new(InMemoryRevocationStore::new()),
            crate::infrastructure::crypto::jwt::JwtConfig::new("test-secret", 7),
        );
        Harness {
            identity,
            fleet,
            mailer,
            repos,
        }
    }

    fn passenger_input(email: &str) -> RegisterInput {
        RegisterInput {
            email: email.to_string(),
            password: "SecurePass123".to_string(),
            first_name: "Laura".to_string(),
            last_name: "Gonzalez".to_string(),
            university_id: format!("A{}", Uuid::new_v4().simple()),
            phone: "3001234567".to_string(),
            photo_url: None,
            role: "passenger".to_string(),
            vehicle: None,
        }
    }

    fn vehicle_input() -> NewVehicleInput {
        let now = Utc::now();
        NewVehicleInput {
            plate: "ABC123".to_string(),
            brand: "Toyota".to_string(),
            model: "Corolla".to_string(),
            capacity: 4,
            year: None,
            color: None,
            soat_expiration: Some(now + Duration::days(90)),
            license_number: "LIC-1".to_string(),
            license_expiration: Some(now + Duration::days(200)),
            vehicle_photo_url: None,
            soat_photo_url: Some("soat.pdf".to_string()),
            license_photo_url: Some("lic.pdf".to_string()),
            uploads: Vec::new(),
        }
    }

    fn driver_input(email: &str) -> RegisterInput {
        let mut input = passenger_input(email);
        input.role = "driver".to_string();
        input.vehicle = Some(vehicle_input());
        input
    }

    #[tokio::test]
    async fn register_rejects_foreign_email_domains() {
        let h = harness().await;
        let err = h
            .identity
            .register(passenger_input("laura@gmail.com"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_EMAIL_DOMAIN");
    }

    #[tokio::test]
    async fn register_rejects_short_passwords() {
        let h = harness().await;
        let mut input = passenger_input("laura@unisabana.edu.co");
        input.password = "short1".to_string();
        let err = h.identity.register(input).await.unwrap_err();
        assert_eq!(err.code(), "WEAK_PASSWORD");
    }

    #[tokio::test]
    async fn register_normalizes_email_and_sends_welcome() {
        let h = harness().await;
        let user = h
            .identity
            .register(passenger_input("  Laura@UNISABANA.edu.co "))
            .await
            .unwrap();
        assert_eq!(user.email, "laura@unisabana.edu.co");
        assert_eq!(user.active_role, Role::Passenger);
        assert!(!user.is_driver());
        assert_eq!(
            h.mailer.welcomes.lock().unwrap().as_slice(),
            ["laura@unisabana.edu.co"]
        );
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let h = harness().await;
        h.identity
            .register(passenger_input("laura@unisabana.edu.co"))
            .await
            .unwrap();
        let err = h
            .identity
            .register(passenger_input("laura@unisabana.edu.co"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "DUPLICATE_EMAIL");
    }

    #[tokio::test]
    async fn driver_registration_creates_and_adopts_vehicle() {
        let h = harness().await;
        let user = h
            .identity
            .register(driver_input("conductor@unisabana.edu.co"))
            .await
            .unwrap();

        assert!(user.roles.contains(Role::Passenger));
        assert!(user.roles.contains(Role::Driver));
        assert_eq!(user.active_role, Role::Driver);

        let vehicles = h.repos.vehicles().find_by_owner(&user.id).await.unwrap();
        assert_eq!(vehicles.len(), 1);
        assert_eq!(vehicles[0].plate, "ABC123");
        assert_eq!(user.active_vehicle_id.as_deref(), Some(vehicles[0].id.as_str()));
    }

    #[tokio::test]
    async fn driver_registration_rejects_expired_documents_atomically() {
        let h = harness().await;
        let mut input = driver_input("conductor@unisabana.edu.co");
        input.vehicle.as_mut().unwrap().soat_expiration =
            Some(Utc::now() - Duration::days(1));

        let err = h.identity.register(input).await.unwrap_err();
        assert_eq!(err.code(), "EXPIRED_DOCUMENT");

        // No half-registered account remains.
        assert!(h
            .repos
            .users()
            .find_by_email("conductor@unisabana.edu.co")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn driver_registration_rolls_back_user_on_plate_conflict() {
        let h = harness().await;
        h.identity
            .register(driver_input("primero@unisabana.edu.co"))
            .await
            .unwrap();

        let err = h
            .identity
            .register(driver_input("segundo@unisabana.edu.co"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "DUPLICATE_PLATE");
        assert!(h
            .repos
            .users()
            .find_by_email("segundo@unisabana.edu.co")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn login_answers_identically_for_unknown_user_and_wrong_password() {
        let h = harness().await;
        h.identity
            .register(passenger_input("laura@unisabana.edu.co"))
            .await
            .unwrap();

        let unknown = h
            .identity
            .login("nadie@unisabana.edu.co", "SecurePass123")
            .await
            .unwrap_err();
        let wrong = h
            .identity
            .login("laura@unisabana.edu.co", "WrongPass123")
            .await
            .unwrap_err();
        assert_eq!(unknown.code(), "INVALID_CREDENTIALS");
        assert_eq!(wrong.code(), "INVALID_CREDENTIALS");
    }

    #[tokio::test]
    async fn login_returns_a_verifiable_session() {
        let h = harness().await;
        let registered = h
            .identity
            .register(passenger_input("laura@unisabana.edu.co"))
            .await
            .unwrap();
        let session = h
            .identity
            .login("laura@unisabana.edu.co", "SecurePass123")
            .await
            .unwrap();
        assert_eq!(session.user.id, registered.id);
        assert_eq!(session.expires_in_seconds, 7 * 24 * 3600);
        assert!(!session.token.is_empty());
    }

    #[tokio::test]
    async fn switch_role_requires_capability() {
        let h = harness().await;
        let user = h
            .identity
            .register(passenger_input("laura@unisabana.edu.co"))
            .await
            .unwrap();
        let err = h.identity.switch_role(&user.id, "driver").await.unwrap_err();
        assert_eq!(err.code(), "ROLE_NOT_ENABLED");
    }

    #[tokio::test]
    async fn switch_to_driver_requires_a_verified_vehicle() {
        let h = harness().await;
        let user = h
            .identity
            .register(driver_input("conductor@unisabana.edu.co"))
            .await
            .unwrap();
        h.identity.switch_role(&user.id, "passenger").await.unwrap();

        // Vehicle is still pending review.
        let err = h.identity.switch_role(&user.id, "driver").await.unwrap_err();
        assert_eq!(err.code(), "DOCUMENTS_INVALID");

        let vehicles = h.repos.vehicles().find_by_owner(&user.id).await.unwrap();
        h.fleet
            .request_review(&user.id, &vehicles[0].id)
            .await
            .unwrap();
        h.fleet
            .apply_review_decision(&vehicles[0].id, VehicleStatus::Verified, "admin", None)
            .await
            .unwrap();

        let switched = h.identity.switch_role(&user.id, "driver").await.unwrap();
        assert_eq!(switched.active_role, Role::Driver);
    }

    #[tokio::test]
    async fn forgot_password_is_silent_for_unknown_accounts() {
        let h = harness().await;
        h.identity
            .forgot_password("nadie@unisabana.edu.co")
            .await
            .unwrap();
        assert!(h.mailer.reset_tokens.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn password_reset_round_trip_and_single_use() {
        let h = harness().await;
        h.identity
            .register(passenger_input("reset@unisabana.edu.co"))
            .await
            .unwrap();

        h.identity
            .forgot_password("reset@unisabana.edu.co")
            .await
            .unwrap();
        let raw = h.mailer.reset_tokens.lock().unwrap().last().unwrap().clone();

        h.identity
            .reset_password(&raw, "NuevoPass123")
            .await
            .unwrap();

        // Old password no longer works; the new one does.
        assert!(h
            .identity
            .login("reset@unisabana.edu.co", "SecurePass123")
            .await
            .is_err());
        h.identity
            .login("reset@unisabana.edu.co", "NuevoPass123")
            .await
            .unwrap();

        // A token is redeemable exactly once.
        let err = h
            .identity
            .reset_password(&raw, "OtraClave123")
            .await
            .unwrap_err();
        assert_eq!(err.code(), "TOKEN_INVALID_OR_EXPIRED");
    }

    #[tokio::test]
    async fn issuing_a_new_token_invalidates_the_previous_one() {
        let h = harness().await;
        h.identity
            .register(passenger_input("reset@unisabana.edu.co"))
            .await
            .unwrap();

        h.identity
            .forgot_password("reset@unisabana.edu.co")
            .await
            .unwrap();
        h.identity
            .forgot_password("reset@unisabana.edu.co")
            .await
            .unwrap();

        let tokens = h.mailer.reset_tokens.lock().unwrap().clone();
        assert_eq!(tokens.len(), 2);

        let err = h
            .identity
            .reset_password(&tokens[0], "NuevoPass123")
            .await
            .unwrap_err();
        assert_eq!(err.code(), "TOKEN_INVALID_OR_EXPIRED");
        h.identity
            .reset_password(&tokens[1], "NuevoPass123")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn garbage_reset_token_is_rejected() {
        let h = harness().await;
        let err = h
            .identity
            .reset_password("not-a-real-token", "NuevoPass123")
            .await
            .unwrap_err();
        assert_eq!(err.code(), "TOKEN_INVALID_OR_EXPIRED");
    }
}
