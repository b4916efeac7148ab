//! Login, signup and logout forms
//!
//! Input is validated locally before any request is made. The backend's own
//! error text is shown verbatim when it sends one.

use crate::api::{ApiBackend, ApiError, LoginRequest, SignupRequest};
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{info, warn};

pub const LOGIN_FAILED: &str = "Login failed. Please try again.";
pub const SIGNUP_FAILED: &str = "Signup failed. Please try again.";
pub const LOGIN_SUCCEEDED: &str = "Login successful! Redirecting...";
pub const SIGNUP_SUCCEEDED: &str = "Account created successfully! Redirecting to login...";

const MIN_USERNAME_LEN: usize = 3;
const MIN_PASSWORD_LEN: usize = 6;
const SPECIAL_CHARS: &str = "!@#$%^&*";

static EMAIL_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

/// A form problem found before submitting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please fill in all fields")]
    MissingFields,
    #[error("Username must be at least 3 characters")]
    UsernameTooShort,
    #[error("Please enter a valid email address")]
    InvalidEmail,
    #[error("Password must be at least 6 characters")]
    PasswordTooShort,
    #[error("Passwords do not match")]
    PasswordMismatch,
}

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Default)]
pub struct SignupForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// Check a login form. The username is trimmed, the password is not.
pub fn validate_login(form: &LoginForm) -> Result<LoginRequest, ValidationError> {
    let username = form.username.trim();
    if username.is_empty() || form.password.is_empty() {
        return Err(ValidationError::MissingFields);
    }
    Ok(LoginRequest {
        username: username.to_string(),
        password: form.password.clone(),
    })
}

/// Check a signup form; the first failing rule is reported.
pub fn validate_signup(form: &SignupForm) -> Result<SignupRequest, ValidationError> {
    let username = form.username.trim();
    let email = form.email.trim();
    if username.is_empty()
        || email.is_empty()
        || form.password.is_empty()
        || form.confirm_password.is_empty()
    {
        return Err(ValidationError::MissingFields);
    }
    if username.chars().count() < MIN_USERNAME_LEN {
        return Err(ValidationError::UsernameTooShort);
    }
    if !EMAIL_SHAPE.is_match(email) {
        return Err(ValidationError::InvalidEmail);
    }
    if form.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort);
    }
    if form.password != form.confirm_password {
        return Err(ValidationError::PasswordMismatch);
    }
    Ok(SignupRequest {
        username: username.to_string(),
        email: email.to_string(),
        password: form.password.clone(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordStrength {
    Empty,
    Weak,
    Medium,
    Strong,
}

impl PasswordStrength {
    pub fn hint(&self) -> &'static str {
        match self {
            PasswordStrength::Empty => "",
            PasswordStrength::Weak => "Weak - Use at least 6 characters",
            PasswordStrength::Medium => "Medium - Add numbers or special characters",
            PasswordStrength::Strong => "Strong password!",
        }
    }
}

/// Strength meter shown while typing a new password
pub fn password_strength(password: &str) -> PasswordStrength {
    if password.is_empty() {
        return PasswordStrength::Empty;
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return PasswordStrength::Weak;
    }
    let classes = [
        password.chars().any(|c| c.is_ascii_lowercase()),
        password.chars().any(|c| c.is_ascii_uppercase()),
        password.chars().any(|c| c.is_ascii_digit()),
        password.chars().any(|c| SPECIAL_CHARS.contains(c)),
    ]
    .into_iter()
    .filter(|present| *present)
    .count();

    if classes <= 2 {
        PasswordStrength::Medium
    } else {
        PasswordStrength::Strong
    }
}

/// Page the front end navigates to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Chat,
    Login,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Chat => "/chat",
            Route::Login => "/login",
        }
    }
}

/// Result of submitting a form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Rejected locally; nothing was sent
    Invalid(ValidationError),
    /// A submit is already in flight
    Busy,
    /// The backend refused, or could not be reached; the text is user-facing
    Rejected(String),
    /// Show `notice`, then navigate to `to`
    Redirect { to: Route, notice: &'static str },
}

/// Clears the submitting flag however the submit ends.
struct Submitting<'a>(&'a mut bool);

impl Drop for Submitting<'_> {
    fn drop(&mut self) {
        *self.0 = false;
    }
}

#[derive(Debug, Default)]
pub struct AuthController {
    submitting: bool,
}

impl AuthController {
    pub fn new() -> Self {
        Self::default()
    }

    /// The submit control is disabled while this is true
    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    fn start(&mut self) -> Option<Submitting<'_>> {
        if self.submitting {
            return None;
        }
        self.submitting = true;
        Some(Submitting(&mut self.submitting))
    }

    pub async fn login(&mut self, api: &dyn ApiBackend, form: &LoginForm) -> AuthOutcome {
        let request = match validate_login(form) {
            Ok(request) => request,
            Err(e) => return AuthOutcome::Invalid(e),
        };
        let Some(_submitting) = self.start() else {
            return AuthOutcome::Busy;
        };

        match api.login(&request).await {
            Ok(()) => {
                info!(username = %request.username, "Logged in");
                AuthOutcome::Redirect {
                    to: Route::Chat,
                    notice: LOGIN_SUCCEEDED,
                }
            }
            Err(e) => rejected(e, LOGIN_FAILED),
        }
    }

    pub async fn signup(&mut self, api: &dyn ApiBackend, form: &SignupForm) -> AuthOutcome {
        let request = match validate_signup(form) {
            Ok(request) => request,
            Err(e) => return AuthOutcome::Invalid(e),
        };
        let Some(_submitting) = self.start() else {
            return AuthOutcome::Busy;
        };

        match api.signup(&request).await {
            Ok(()) => {
                info!(username = %request.username, "Account created");
                AuthOutcome::Redirect {
                    to: Route::Login,
                    notice: SIGNUP_SUCCEEDED,
                }
            }
            Err(e) => rejected(e, SIGNUP_FAILED),
        }
    }
}

fn rejected(error: ApiError, fallback: &str) -> AuthOutcome {
    warn!(error = %error, "Auth request failed");
    AuthOutcome::Rejected(error.user_message(fallback))
}

/// Proof that the user confirmed logging out
#[derive(Debug)]
#[must_use]
pub struct LogoutConfirmation(());

impl LogoutConfirmation {
    pub const PROMPT: &'static str = "Are you sure you want to logout?";
}

/// First step of a logout; show [`LogoutConfirmation::PROMPT`] before confirming.
pub fn request_logout() -> LogoutConfirmation {
    LogoutConfirmation(())
}

/// End the backend session. The user lands on the login page either way.
pub async fn logout(api: &dyn ApiBackend, _confirmation: LogoutConfirmation) -> Route {
    match api.logout().await {
        Ok(()) => info!("Logged out"),
        Err(e) => warn!(error = %e, "Logout request failed"),
    }
    Route::Login
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Endpoint, MockBackend, CONNECTION_ERROR};

    fn signup_form(username: &str, email: &str, password: &str, confirm: &str) -> SignupForm {
        SignupForm {
            username: username.into(),
            email: email.into(),
            password: password.into(),
            confirm_password: confirm.into(),
        }
    }

    #[test]
    fn test_validate_login() {
        let form = LoginForm {
            username: "  alex ".into(),
            password: " pw ".into(),
        };
        let request = validate_login(&form).unwrap();
        assert_eq!(request.username, "alex");
        assert_eq!(request.password, " pw ");

        let blank = LoginForm {
            username: "   ".into(),
            password: "x".into(),
        };
        assert_eq!(validate_login(&blank), Err(ValidationError::MissingFields));
    }

    #[test]
    fn test_signup_validation_order() {
        use ValidationError::*;
        let cases = [
            (signup_form("", "bad", "1", "2"), MissingFields),
            (signup_form("ab", "bad", "1", "2"), UsernameTooShort),
            (signup_form("abc", "bad", "1", "2"), InvalidEmail),
            (signup_form("abc", "a b@c.de", "1", "2"), InvalidEmail),
            (signup_form("abc", "a@b.co", "12345", "2"), PasswordTooShort),
            (signup_form("abc", "a@b.co", "123456", "1234567"), PasswordMismatch),
        ];
        for (form, expected) in cases {
            assert_eq!(validate_signup(&form).unwrap_err(), expected);
        }
        assert!(validate_signup(&signup_form(" abc ", "a@b.co", "123456", "123456")).is_ok());
    }

    #[test]
    fn test_validation_messages() {
        assert_eq!(
            ValidationError::PasswordMismatch.to_string(),
            "Passwords do not match"
        );
        assert_eq!(
            ValidationError::MissingFields.to_string(),
            "Please fill in all fields"
        );
    }

    #[test]
    fn test_password_strength() {
        assert_eq!(password_strength(""), PasswordStrength::Empty);
        assert_eq!(password_strength("abc"), PasswordStrength::Weak);
        assert_eq!(password_strength("abcdef12"), PasswordStrength::Medium);
        assert_eq!(password_strength("Abcdef12"), PasswordStrength::Strong);
        assert_eq!(password_strength("abcdef!1"), PasswordStrength::Strong);
        assert_eq!(PasswordStrength::Weak.hint(), "Weak - Use at least 6 characters");
    }

    #[tokio::test]
    async fn test_invalid_form_makes_no_request() {
        let api = MockBackend::new();
        let mut auth = AuthController::new();
        let outcome = auth.login(&api, &LoginForm::default()).await;
        assert_eq!(outcome, AuthOutcome::Invalid(ValidationError::MissingFields));
        assert_eq!(api.total_calls().await, 0);
    }

    #[tokio::test]
    async fn test_login_redirects_to_chat() {
        let api = MockBackend::new().with_account("alex", "alex@example.com", "secret1");
        let mut auth = AuthController::new();
        let form = LoginForm {
            username: "alex".into(),
            password: "secret1".into(),
        };
        let outcome = auth.login(&api, &form).await;
        assert_eq!(
            outcome,
            AuthOutcome::Redirect {
                to: Route::Chat,
                notice: LOGIN_SUCCEEDED
            }
        );
        assert!(!auth.is_submitting());
        assert_eq!(api.logged_in_user().await.as_deref(), Some("alex"));
    }

    #[tokio::test]
    async fn test_server_error_shown_verbatim() {
        let api = MockBackend::new();
        let mut auth = AuthController::new();
        let form = LoginForm {
            username: "ghost".into(),
            password: "whatever".into(),
        };
        assert_eq!(
            auth.login(&api, &form).await,
            AuthOutcome::Rejected("Invalid username or password".into())
        );
        assert!(!auth.is_submitting());
    }

    #[tokio::test]
    async fn test_fallback_and_transport_messages() {
        let api = MockBackend::new();
        let form = signup_form("alex", "alex@example.com", "secret1", "secret1");
        let mut auth = AuthController::new();

        api.fail(
            Endpoint::Signup,
            ApiError::Application {
                status: 500,
                message: None,
            },
        )
        .await;
        assert_eq!(
            auth.signup(&api, &form).await,
            AuthOutcome::Rejected(SIGNUP_FAILED.into())
        );

        api.fail(Endpoint::Signup, ApiError::Transport("refused".into()))
            .await;
        assert_eq!(
            auth.signup(&api, &form).await,
            AuthOutcome::Rejected(CONNECTION_ERROR.into())
        );

        api.recover(Endpoint::Signup).await;
        assert_eq!(
            auth.signup(&api, &form).await,
            AuthOutcome::Redirect {
                to: Route::Login,
                notice: SIGNUP_SUCCEEDED
            }
        );
    }

    #[tokio::test]
    async fn test_logout_always_lands_on_login() {
        let api = MockBackend::new();
        assert_eq!(logout(&api, request_logout()).await, Route::Login);
        api.fail(Endpoint::Logout, ApiError::Transport("down".into()))
            .await;
        assert_eq!(logout(&api, request_logout()).await, Route::Login);
        assert_eq!(api.call_count(Endpoint::Logout).await, 2);
        assert_eq!(Route::Login.path(), "/login");
    }

    #[tokio::test]
    async fn test_requesting_logout_sends_nothing() {
        let api = MockBackend::new();
        let confirmation = request_logout();
        assert_eq!(
            LogoutConfirmation::PROMPT,
            "Are you sure you want to logout?"
        );
        assert_eq!(api.total_calls().await, 0);

        assert_eq!(logout(&api, confirmation).await, Route::Login);
        assert_eq!(api.call_count(Endpoint::Logout).await, 1);
    }
}
