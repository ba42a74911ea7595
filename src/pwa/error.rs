use std::fmt::{Display, Formatter};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PwaErrorCode {
    UnsupportedBrowser,
    RegistrationFailed,
    UpdateFailed,
    MessageFailed,
    InstallPromptFailed,
    PermissionFailed,
    PushSubscribeFailed,
    TokenSendFailed,
    InvalidConfig,
    Internal,
}

impl PwaErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PwaErrorCode::UnsupportedBrowser => "pwa/unsupported-browser",
            PwaErrorCode::RegistrationFailed => "pwa/registration-failed",
            PwaErrorCode::UpdateFailed => "pwa/update-failed",
            PwaErrorCode::MessageFailed => "pwa/message-failed",
            PwaErrorCode::InstallPromptFailed => "pwa/install-prompt-failed",
            PwaErrorCode::PermissionFailed => "pwa/permission-failed",
            PwaErrorCode::PushSubscribeFailed => "pwa/push-subscribe-failed",
            PwaErrorCode::TokenSendFailed => "pwa/token-send-failed",
            PwaErrorCode::InvalidConfig => "pwa/invalid-config",
            PwaErrorCode::Internal => "pwa/internal",
        }
    }
}

#[derive(Clone, Debug)]
pub struct PwaError {
    pub code: PwaErrorCode,
    message: String,
}

impl PwaError {
    pub fn new(code: PwaErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for PwaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code_str())
    }
}

impl std::error::Error for PwaError {}

pub type PwaResult<T> = Result<T, PwaError>;

pub fn unsupported_browser(message: impl Into<String>) -> PwaError {
    PwaError::new(PwaErrorCode::UnsupportedBrowser, message)
}

pub fn registration_failed(message: impl Into<String>) -> PwaError {
    PwaError::new(PwaErrorCode::RegistrationFailed, message)
}

pub fn update_failed(message: impl Into<String>) -> PwaError {
    PwaError::new(PwaErrorCode::UpdateFailed, message)
}

pub fn message_failed(message: impl Into<String>) -> PwaError {
    PwaError::new(PwaErrorCode::MessageFailed, message)
}

pub fn install_prompt_failed(message: impl Into<String>) -> PwaError {
    PwaError::new(PwaErrorCode::InstallPromptFailed, message)
}

pub fn permission_failed(message: impl Into<String>) -> PwaError {
    PwaError::new(PwaErrorCode::PermissionFailed, message)
}

pub fn push_subscribe_failed(message: impl Into<String>) -> PwaError {
    PwaError::new(PwaErrorCode::PushSubscribeFailed, message)
}

pub fn token_send_failed(message: impl Into<String>) -> PwaError {
    PwaError::new(PwaErrorCode::TokenSendFailed, message)
}

pub fn invalid_config(message: impl Into<String>) -> PwaError {
    PwaError::new(PwaErrorCode::InvalidConfig, message)
}

pub fn internal_error(message: impl Into<String>) -> PwaError {
    PwaError::new(PwaErrorCode::Internal, message)
}
