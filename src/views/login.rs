use validator::{Validate, ValidationErrors};

use crate::client::api::ApiClient;
use crate::client::messages;
use crate::client::response::{ClientError, ROLE_SELECTION};
use crate::client::token_store::{Credentials, Profile, Role};
use crate::client::types::LoginResponse;

#[derive(Debug, Clone, Default, Validate)]
pub struct LoginForm {
    #[validate(
        length(min = 1, message = "Vui lòng nhập email và mật khẩu."),
        email(message = "Email không hợp lệ")
    )]
    pub email: String,
    #[validate(length(min = 1, message = "Vui lòng nhập email và mật khẩu."))]
    pub password: String,
}

impl LoginForm {
    pub fn new(email: &str, password: &str) -> Self {
        Self { email: email.trim().to_string(), password: password.to_string() }
    }
}

/// The portal a login page belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Portal {
    Student,
    Teacher,
}

impl Portal {
    pub fn role(self) -> Role {
        match self {
            Self::Student => Role::Student,
            Self::Teacher => Role::Teacher,
        }
    }

    pub fn landing_page(self) -> &'static str {
        match self {
            Self::Student => "/student/dashboard",
            Self::Teacher => "/teacher/dashboard",
        }
    }
}

/// Login page for one portal.
#[derive(Debug, Clone)]
pub struct LoginView {
    api: ApiClient,
    portal: Portal,
    error: Option<String>,
    loading: bool,
}

impl LoginView {
    pub fn new(api: ApiClient, portal: Portal) -> Self {
        Self { api, portal, error: None, loading: false }
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Validates, logs in, stores the session and moves to the portal's
    /// landing page. On failure the localized message is kept in `error`.
    pub async fn submit(&mut self, form: LoginForm) -> Result<Profile, String> {
        self.error = None;
        if let Err(errors) = form.validate() {
            let message = first_message(&errors);
            self.error = Some(message.clone());
            return Err(message);
        }

        self.loading = true;
        let outcome = self.sign_in(&form).await;
        self.loading = false;

        match outcome {
            Ok(profile) => {
                self.api.pipeline().navigator().push(self.portal.landing_page());
                Ok(profile)
            }
            Err(err) => {
                tracing::info!(portal = ?self.portal, error = %err, "login failed");
                let message = translate_login_error(&err.to_string());
                self.error = Some(message.clone());
                Err(message)
            }
        }
    }

    async fn sign_in(&self, form: &LoginForm) -> Result<Profile, ClientError> {
        let response = self.api.login(&form.email, &form.password).await?;
        let store = self.api.pipeline().store();

        if let Some(token) = response.token.clone().filter(|token| !token.is_empty()) {
            store.set(Credentials::new(token, response.refresh_token.clone()));
        }

        match profile_for(&response, &form.email, self.portal) {
            Ok(profile) => {
                store.set_profile(profile.clone());
                Ok(profile)
            }
            Err(err) => {
                store.clear();
                Err(err)
            }
        }
    }

    /// Best-effort backend logout, then a local teardown.
    pub async fn logout(api: &ApiClient) {
        if let Err(err) = api.logout().await {
            tracing::debug!(error = %err, "logout call failed");
        }
        api.pipeline().store().clear();
        api.pipeline().navigator().push(ROLE_SELECTION);
    }
}

fn profile_for(response: &LoginResponse, email: &str, portal: Portal) -> Result<Profile, ClientError> {
    let user = response.user.clone().unwrap_or_default();
    let role = match user.role.as_deref() {
        Some(raw) => Role::from_backend(raw),
        None => Some(portal.role()),
    };

    match role {
        Some(role) if role == portal.role() => Ok(Profile {
            id: user.user_id.map(|id| id.to_string()).unwrap_or_default(),
            name: user
                .full_name
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string()),
            email: user.email.filter(|value| !value.is_empty()).unwrap_or_else(|| email.to_string()),
            role,
            code: match role {
                Role::Teacher => user.lecturer_code,
                Role::Student => user.student_code,
            },
        }),
        _ => Err(ClientError::InvalidInput(messages::ROLE_MISMATCH.to_string())),
    }
}

/// A blank field wins over a malformed one.
fn first_message(errors: &ValidationErrors) -> String {
    let fields = errors.field_errors();
    let failures: Vec<_> = ["email", "password"]
        .iter()
        .filter_map(|field| fields.get(*field))
        .flat_map(|errors| errors.iter())
        .collect();

    if failures.iter().any(|error| error.code == "length") {
        return messages::CREDENTIALS_REQUIRED.to_string();
    }
    failures
        .iter()
        .find_map(|error| error.message.as_ref().map(|message| message.to_string()))
        .unwrap_or_else(|| messages::EMAIL_INVALID.to_string())
}

/// Maps backend phrasing onto the messages the login page shows.
pub(crate) fn translate_login_error(message: &str) -> String {
    let lower = message.to_lowercase();
    if lower.contains("invalid email or password")
        || (lower.contains("invalid") && lower.contains("password"))
        || lower.contains("unauthorized")
    {
        messages::WRONG_CREDENTIALS.to_string()
    } else if lower.contains("email and password are required") {
        messages::CREDENTIALS_REQUIRED.to_string()
    } else if message.is_empty() {
        messages::LOGIN_FAILED.to_string()
    } else {
        message.to_string()
    }
}
