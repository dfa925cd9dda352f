//! Accounts: registration, login and refresh tokens, and the two-step
//! profile update confirmed by an emailed code.

use std::sync::Arc;

use chrono::{Duration, Utc};
use rand::Rng;
use tracing::{info, warn};

use agora_db::Database;
use agora_types::api::{RegisterResponse, TokenResponse, UserResponse};
use agora_types::email::EmailJob;
use agora_types::models::{ProfileChanges, Role};

use crate::convert::{parse_timestamp, user_response};
use crate::password::PasswordHasher;
use crate::pending::{PendingUpdate, PendingUpdateStore};
use crate::queue::EmailQueue;
use crate::tokens::{REFRESH_TOKEN_TTL_DAYS, TokenIssuer, generate_refresh_token};
use crate::{Actor, Result, ServiceError};

pub const CONFIRMATION_SUBJECT: &str = "Confirm Your Profile Update";
pub const CONFIRMATION_TTL_HOURS: i64 = 1;

/// Result of [`UserService::confirm_update`]. Only `Applied` changes the
/// account; the rest are ordinary outcomes, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    Applied,
    NoPendingUpdate,
    InvalidOrExpiredCode,
    UserNotFound,
}

impl ConfirmOutcome {
    pub fn is_applied(&self) -> bool {
        *self == Self::Applied
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::NoPendingUpdate => "no pending update for this email",
            Self::InvalidOrExpiredCode => "invalid or expired confirmation code",
            Self::UserNotFound => "user not found",
        }
    }
}

pub struct UserService {
    db: Arc<Database>,
    queue: Arc<dyn EmailQueue>,
    pending: Arc<dyn PendingUpdateStore>,
    passwords: PasswordHasher,
    tokens: TokenIssuer,
}

impl UserService {
    pub fn new(
        db: Arc<Database>,
        queue: Arc<dyn EmailQueue>,
        pending: Arc<dyn PendingUpdateStore>,
        passwords: PasswordHasher,
        tokens: TokenIssuer,
    ) -> Self {
        Self {
            db,
            queue,
            pending,
            passwords,
            tokens,
        }
    }

    pub fn register(&self, username: &str, email: &str, password: &str) -> Result<RegisterResponse> {
        validate_username(username)?;
        validate_email(email)?;
        if password.len() < 8 {
            return Err(ServiceError::InvalidInput("password must be at least 8 characters".into()));
        }
        if self.db.is_identity_taken(username, email, None)? {
            return Err(ServiceError::Conflict("username or email already in use".into()));
        }

        let hash = self.passwords.hash(password)?;
        let id = self.db.create_user(username, email, &hash, Role::User.as_str())?;

        let welcome = EmailJob::new(
            email,
            "Welcome to Agora",
            format!("<p>Hi {}, your Agora account is ready.</p>", username),
        );
        if let Err(e) = self.queue.publish(&welcome) {
            // Registration fails as a whole; the account must not outlive it.
            warn!("Welcome email for user {} not queued, rolling back registration: {}", id, e);
            self.db.delete_user(id)?;
            return Err(e.into());
        }
        info!("User registered: {} ({})", username, id);

        Ok(RegisterResponse {
            id,
            username: username.to_string(),
            email: email.to_string(),
        })
    }

    pub fn login(&self, username: &str, password: &str) -> Result<TokenResponse> {
        let invalid = || ServiceError::Unauthorized("invalid username or password".into());

        let user = self.db.get_user_by_username(username)?.ok_or_else(invalid)?;
        if !self.passwords.verify(password, &user.password)? {
            return Err(invalid());
        }

        let role = user.role.parse().unwrap_or(Role::User);
        self.issue_pair(user.id, &user.username, &user.email, role)
    }

    /// Exchange an expired access token plus its refresh token for a new
    /// pair. The refresh token is rotated.
    pub fn refresh(&self, access_token: &str, refresh_token: &str) -> Result<TokenResponse> {
        let claims = self
            .tokens
            .verify_ignoring_expiry(access_token)
            .map_err(|_| ServiceError::Unauthorized("invalid access token".into()))?;

        let user = self
            .db
            .get_user_by_id(claims.sub)?
            .ok_or_else(|| ServiceError::Unauthorized("invalid access token".into()))?;

        let still_valid = user
            .refresh_token_expires_at
            .as_deref()
            .and_then(parse_timestamp)
            .is_some_and(|expires_at| expires_at > Utc::now());
        if user.refresh_token.as_deref() != Some(refresh_token) || !still_valid {
            return Err(ServiceError::Unauthorized("invalid or expired refresh token".into()));
        }

        let role = user.role.parse().unwrap_or(Role::User);
        self.issue_pair(user.id, &user.username, &user.email, role)
    }

    pub fn revoke(&self, user_id: i64) -> Result<()> {
        self.db.set_refresh_token(user_id, None, None)?;
        info!("Refresh token revoked for user {}", user_id);
        Ok(())
    }

    fn issue_pair(&self, user_id: i64, username: &str, email: &str, role: Role) -> Result<TokenResponse> {
        let access_token = self.tokens.issue(user_id, username, email, role)?;
        let refresh_token = generate_refresh_token();
        let expires_at = (Utc::now() + Duration::days(REFRESH_TOKEN_TTL_DAYS)).to_rfc3339();
        self.db.set_refresh_token(user_id, Some(&refresh_token), Some(&expires_at))?;

        Ok(TokenResponse {
            access_token,
            refresh_token,
        })
    }

    pub fn get_user(&self, id: i64) -> Result<UserResponse> {
        let user = self
            .db
            .get_user_by_id(id)?
            .ok_or_else(|| ServiceError::NotFound(format!("user {}", id)))?;
        Ok(user_response(user))
    }

    /// Members may only change their own profile; admins may change anyone's.
    pub fn request_update_as(&self, actor: Actor, user_id: i64, changes: ProfileChanges) -> Result<()> {
        if actor.user_id != user_id && !actor.is_admin() {
            return Err(ServiceError::Forbidden("only admins can update other users".into()));
        }
        self.request_update(user_id, changes)
    }

    /// Park `changes` until the owner proves control of their current email
    /// address. The account itself is not touched.
    pub fn request_update(&self, user_id: i64, changes: ProfileChanges) -> Result<()> {
        validate_username(&changes.username)?;
        validate_email(&changes.email_address)?;

        let user = self
            .db
            .get_user_by_id(user_id)?
            .ok_or_else(|| ServiceError::NotFound(format!("user {}", user_id)))?;
        if self
            .db
            .is_identity_taken(&changes.username, &changes.email_address, Some(user.id))?
        {
            return Err(ServiceError::Conflict("username or email already in use".into()));
        }

        let code = rand::rng().random_range(100_000..=999_999).to_string();
        let body = format!(
            "Your confirmation code is: {}. This code will expire in {} hour.",
            code, CONFIRMATION_TTL_HOURS
        );

        self.pending.put(PendingUpdate {
            email: user.email.clone(),
            changes,
            code,
            expires_at: Utc::now() + Duration::hours(CONFIRMATION_TTL_HOURS),
        });
        self.queue
            .publish(&EmailJob::new(user.email.as_str(), CONFIRMATION_SUBJECT, body))?;

        info!("Profile update requested for user {}", user_id);
        Ok(())
    }

    pub fn confirm_update(&self, email: &str, code: &str) -> Result<ConfirmOutcome> {
        let Some(pending) = self.pending.take(email) else {
            return Ok(ConfirmOutcome::NoPendingUpdate);
        };
        if !pending.is_valid(code, Utc::now()) {
            return Ok(ConfirmOutcome::InvalidOrExpiredCode);
        }
        let Some(user) = self.db.get_user_by_email(email)? else {
            return Ok(ConfirmOutcome::UserNotFound);
        };

        let changes = pending.changes;
        if self
            .db
            .is_identity_taken(&changes.username, &changes.email_address, Some(user.id))?
        {
            return Err(ServiceError::Conflict("username or email already in use".into()));
        }
        if !self
            .db
            .update_user_profile(user.id, &changes.username, &changes.email_address)?
        {
            return Ok(ConfirmOutcome::UserNotFound);
        }

        info!("Profile update applied for user {}", user.id);
        Ok(ConfirmOutcome::Applied)
    }

    pub fn set_avatar(&self, user_id: i64, image_url: &str) -> Result<()> {
        if !self.db.set_user_image(user_id, image_url)? {
            return Err(ServiceError::NotFound(format!("user {}", user_id)));
        }
        Ok(())
    }

    /// Create the configured admin account unless the username exists.
    /// Returns true if an account was created.
    pub fn ensure_admin(&self, username: &str, email: &str, password: &str) -> Result<bool> {
        if self.db.get_user_by_username(username)?.is_some() {
            return Ok(false);
        }
        validate_username(username)?;
        validate_email(email)?;

        let hash = self.passwords.hash(password)?;
        let id = self.db.create_user(username, email, &hash, Role::Admin.as_str())?;
        info!("Admin account '{}' created ({})", username, id);
        Ok(true)
    }
}

fn validate_username(username: &str) -> Result<()> {
    let len = username.chars().count();
    if !(3..=32).contains(&len) {
        return Err(ServiceError::InvalidInput("username must be 3-32 characters".into()));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<()> {
    if email.trim().is_empty() || !email.contains('@') {
        return Err(ServiceError::InvalidInput("invalid email address".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::pending::InMemoryPendingUpdates;
    use crate::queue::QueueError;

    #[derive(Default)]
    struct RecordingQueue {
        jobs: Mutex<Vec<EmailJob>>,
    }

    impl EmailQueue for RecordingQueue {
        fn publish(&self, job: &EmailJob) -> std::result::Result<(), QueueError> {
            self.jobs.lock().unwrap().push(job.clone());
            Ok(())
        }
    }

    struct DownQueue;

    impl EmailQueue for DownQueue {
        fn publish(&self, _job: &EmailJob) -> std::result::Result<(), QueueError> {
            Err(QueueError::Unavailable(anyhow::anyhow!("connection refused")))
        }
    }

    struct Fixture {
        service: UserService,
        db: Arc<Database>,
        queue: Arc<RecordingQueue>,
        pending: Arc<InMemoryPendingUpdates>,
        user_id: i64,
    }

    fn fixture() -> Fixture {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let queue = Arc::new(RecordingQueue::default());
        let pending = Arc::new(InMemoryPendingUpdates::new());
        let service = UserService::new(
            Arc::clone(&db),
            queue.clone(),
            pending.clone(),
            PasswordHasher::new("test-pepper"),
            TokenIssuer::new("test-secret", "https://agora.test"),
        );
        let user_id = service.register("alice", "Alice@Example.com", "password123").unwrap().id;
        queue.jobs.lock().unwrap().clear();
        Fixture {
            service,
            db,
            queue,
            pending,
            user_id,
        }
    }

    fn changes(username: &str, email: &str) -> ProfileChanges {
        ProfileChanges {
            username: username.into(),
            email_address: email.into(),
        }
    }

    fn last_code(queue: &RecordingQueue) -> String {
        let jobs = queue.jobs.lock().unwrap();
        let body = &jobs.last().unwrap().body;
        body.split(": ").nth(1).unwrap()[..6].to_string()
    }

    #[test]
    fn request_update_stores_one_entry_and_publishes_code() {
        let f = fixture();
        let before = Utc::now();
        f.service.request_update(f.user_id, changes("alice2", "new@example.com")).unwrap();
        let after = Utc::now();

        assert_eq!(f.pending.len(), 1);
        let entry = f.pending.peek("alice@example.com").unwrap();
        assert!(entry.expires_at >= before + Duration::hours(1));
        assert!(entry.expires_at <= after + Duration::hours(1));
        assert_eq!(entry.code.len(), 6);
        let code: u32 = entry.code.parse().unwrap();
        assert!((100_000..=999_999).contains(&code));

        let jobs = f.queue.jobs.lock().unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].to_email, "Alice@Example.com");
        assert_eq!(jobs[0].subject, CONFIRMATION_SUBJECT);
        assert!(jobs[0].body.contains(&entry.code));

        // Nothing applied yet.
        assert_eq!(f.db.get_user_by_id(f.user_id).unwrap().unwrap().username, "alice");
    }

    #[test]
    fn correct_code_applies_once() {
        let f = fixture();
        f.service.request_update(f.user_id, changes("alice2", "new@example.com")).unwrap();
        let code = last_code(&f.queue);

        let outcome = f.service.confirm_update("ALICE@example.com", &code).unwrap();
        assert_eq!(outcome, ConfirmOutcome::Applied);

        let user = f.db.get_user_by_id(f.user_id).unwrap().unwrap();
        assert_eq!(user.username, "alice2");
        assert_eq!(user.email, "new@example.com");

        let again = f.service.confirm_update("alice@example.com", &code).unwrap();
        assert_eq!(again, ConfirmOutcome::NoPendingUpdate);
    }

    #[test]
    fn second_request_invalidates_first_code() {
        let f = fixture();
        f.service.request_update(f.user_id, changes("first", "first@example.com")).unwrap();
        let first = f.pending.peek("alice@example.com").unwrap().code;
        f.service.request_update(f.user_id, changes("second", "second@example.com")).unwrap();
        let second = f.pending.peek("alice@example.com").unwrap();

        assert_eq!(f.pending.len(), 1);
        assert_eq!(second.changes.username, "second");
        if first != second.code {
            assert_eq!(
                f.service.confirm_update("alice@example.com", &first).unwrap(),
                ConfirmOutcome::InvalidOrExpiredCode
            );
        }
    }

    #[test]
    fn wrong_code_consumes_the_entry() {
        let f = fixture();
        f.service.request_update(f.user_id, changes("alice2", "new@example.com")).unwrap();
        let code = last_code(&f.queue);
        let wrong = if code == "123456" { "654321" } else { "123456" };

        assert_eq!(
            f.service.confirm_update("alice@example.com", wrong).unwrap(),
            ConfirmOutcome::InvalidOrExpiredCode
        );
        assert!(f.pending.is_empty());
        assert_eq!(
            f.service.confirm_update("alice@example.com", &code).unwrap(),
            ConfirmOutcome::NoPendingUpdate
        );
    }

    #[test]
    fn expired_code_is_rejected() {
        let f = fixture();
        f.pending.put(PendingUpdate {
            email: "alice@example.com".into(),
            changes: changes("late", "late@example.com"),
            code: "123456".into(),
            expires_at: Utc::now() - Duration::seconds(1),
        });

        assert_eq!(
            f.service.confirm_update("alice@example.com", "123456").unwrap(),
            ConfirmOutcome::InvalidOrExpiredCode
        );
        assert_eq!(f.db.get_user_by_id(f.user_id).unwrap().unwrap().username, "alice");
    }

    #[test]
    fn confirm_for_deleted_account_reports_user_not_found() {
        let f = fixture();
        f.pending.put(PendingUpdate {
            email: "ghost@example.com".into(),
            changes: changes("ghost2", "ghost2@example.com"),
            code: "123456".into(),
            expires_at: Utc::now() + Duration::hours(1),
        });

        assert_eq!(
            f.service.confirm_update("ghost@example.com", "123456").unwrap(),
            ConfirmOutcome::UserNotFound
        );
    }

    #[test]
    fn request_update_for_unknown_user_is_not_found() {
        let f = fixture();
        let err = f.service.request_update(999, changes("nobody", "n@example.com")).unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        assert!(f.pending.is_empty());
    }

    #[test]
    fn members_cannot_update_other_accounts() {
        let f = fixture();
        let other = f.service.register("bob", "bob@example.com", "password123").unwrap().id;
        let member = Actor {
            user_id: f.user_id,
            role: Role::User,
        };
        let admin = Actor {
            user_id: f.user_id,
            role: Role::Admin,
        };

        let err = f
            .service
            .request_update_as(member, other, changes("bobby", "bob@example.com"))
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
        f.service
            .request_update_as(admin, other, changes("bobby", "bob@example.com"))
            .unwrap();
        assert!(f.pending.peek("bob@example.com").is_some());
    }

    fn service_with_down_queue(db: &Arc<Database>) -> UserService {
        UserService::new(
            Arc::clone(db),
            Arc::new(DownQueue),
            Arc::new(InMemoryPendingUpdates::new()),
            PasswordHasher::new("test-pepper"),
            TokenIssuer::new("test-secret", "https://agora.test"),
        )
    }

    #[test]
    fn queue_failure_fails_the_request() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let service = service_with_down_queue(&db);
        let id = db.create_user("carol", "carol@example.com", "hash", "user").unwrap();

        let err = service.request_update(id, changes("carol2", "c2@example.com")).unwrap_err();
        assert!(matches!(err, ServiceError::Transport(_)));
    }

    #[test]
    fn queue_failure_fails_registration() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let service = service_with_down_queue(&db);

        let err = service.register("carol", "carol@example.com", "password123").unwrap_err();
        assert!(matches!(err, ServiceError::Transport(_)));
        assert!(db.get_user_by_username("carol").unwrap().is_none());
        assert!(db.get_user_by_email("carol@example.com").unwrap().is_none());
    }

    #[test]
    fn non_ascii_email_confirms_in_any_case() {
        let f = fixture();
        let id = f.service.register("emile", "Émile@example.com", "password123").unwrap().id;
        f.service.request_update(id, changes("emile2", "emile2@example.com")).unwrap();
        let code = last_code(&f.queue);

        let outcome = f.service.confirm_update("émile@example.com", &code).unwrap();
        assert_eq!(outcome, ConfirmOutcome::Applied);
        assert!(f.pending.is_empty());
        assert_eq!(f.db.get_user_by_id(id).unwrap().unwrap().username, "emile2");
    }

    #[test]
    fn register_rejects_duplicates_and_weak_input() {
        let f = fixture();
        assert!(matches!(
            f.service.register("alice", "other@example.com", "password123"),
            Err(ServiceError::Conflict(_))
        ));
        assert!(matches!(
            f.service.register("zed", "zed@example.com", "password123"),
            Ok(_)
        ));
        assert!(matches!(
            f.service.register("ab", "ab@example.com", "password123"),
            Err(ServiceError::InvalidInput(_))
        ));
        assert!(matches!(
            f.service.register("dave", "dave@example.com", "short"),
            Err(ServiceError::InvalidInput(_))
        ));
    }

    #[test]
    fn login_and_refresh_rotate_tokens() {
        let f = fixture();
        assert!(matches!(
            f.service.login("alice", "wrong-password"),
            Err(ServiceError::Unauthorized(_))
        ));

        let first = f.service.login("alice", "password123").unwrap();
        let second = f.service.refresh(&first.access_token, &first.refresh_token).unwrap();
        assert_ne!(first.refresh_token, second.refresh_token);

        // The old refresh token was rotated out.
        assert!(f.service.refresh(&second.access_token, &first.refresh_token).is_err());

        f.service.revoke(f.user_id).unwrap();
        assert!(f.service.refresh(&second.access_token, &second.refresh_token).is_err());
    }

    #[test]
    fn ensure_admin_is_idempotent() {
        let f = fixture();
        assert!(f.service.ensure_admin("root", "root@example.com", "password123").unwrap());
        assert!(!f.service.ensure_admin("root", "root@example.com", "password123").unwrap());

        let root = f.db.get_user_by_username("root").unwrap().unwrap();
        assert_eq!(root.role, "admin");
    }
}
