//! Request payloads and the shape checks both the server and the client run on them.
//!
//! Every payload is a closed struct (`deny_unknown_fields`), so a body with an
//! unexpected key is rejected at deserialisation instead of being ignored.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use reqwest::Url;
use serde::{Deserialize, Serialize};

pub const USERNAME_PATTERN: &str = "^[A-Za-z0-9_]{3,20}$";
pub const MAX_TAGLINE_CHARS: usize = 160;
pub const MAX_CAPTION_CHARS: usize = 280;
pub const MAX_URL_CHARS: usize = 2048;
pub const MAX_EMAIL_CHARS: usize = 254;
pub const MIN_PASSWORD_CHARS: usize = 8;
pub const MAX_OBJECT_KEY_LEN: usize = 256;

/// Malformed input, reported against the offending field
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

fn username_regex() -> &'static Regex {
    static USERNAME: OnceLock<Regex> = OnceLock::new();
    USERNAME.get_or_init(|| Regex::new(USERNAME_PATTERN).expect("username pattern compiles"))
}

pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username_regex().is_match(username) {
        Ok(())
    } else {
        Err(ValidationError::new(
            "username",
            "must be 3-20 letters, digits or underscores",
        ))
    }
}

pub fn validate_tagline(tagline: &str) -> Result<(), ValidationError> {
    if tagline.chars().count() > MAX_TAGLINE_CHARS {
        return Err(ValidationError::new(
            "tagline",
            format!("must be at most {MAX_TAGLINE_CHARS} characters"),
        ));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    let email = email.trim();
    let Some((local, domain)) = email.split_once('@') else {
        return Err(ValidationError::new("email", "must be an email address"));
    };
    if local.is_empty() || domain.is_empty() || email.len() > MAX_EMAIL_CHARS {
        return Err(ValidationError::new("email", "must be an email address"));
    }
    Ok(())
}

/// Parse a link URL, accepting only absolute http(s) URLs with a host
pub fn parse_link_url(url: &str) -> Result<Url, ValidationError> {
    let url = url.trim();
    if url.len() > MAX_URL_CHARS {
        return Err(ValidationError::new(
            "url",
            format!("must be at most {MAX_URL_CHARS} characters"),
        ));
    }
    let parsed = Url::parse(url).map_err(|_| ValidationError::new("url", "must be a valid URL"))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(ValidationError::new("url", "must be an http or https URL"));
    }
    Ok(parsed)
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("email", &self.email)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl Validate for RegisterRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_email(&self.email)?;
        validate_username(self.username.trim())?;
        if self.password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(ValidationError::new(
                "password",
                format!("must be at least {MIN_PASSWORD_CHARS} characters"),
            ));
        }
        Ok(())
    }
}

/// Email + password pair handed to the credential check.
///
/// A missing password is representable so the check can report it as a
/// credential mismatch rather than a malformed request.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    #[serde(default)]
    pub password: Option<String>,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.email.trim().is_empty() {
            return Err(ValidationError::new("email", "is required"));
        }
        Ok(())
    }
}

/// Partial profile edit; only the fields present are changed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EditProfileRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tagline: Option<String>,
}

impl EditProfileRequest {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.tagline.is_none()
    }
}

impl Validate for EditProfileRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.is_empty() {
            return Err(ValidationError::new("request", "nothing to update"));
        }
        if let Some(username) = &self.username {
            validate_username(username)?;
        }
        if let Some(tagline) = &self.tagline {
            validate_tagline(tagline)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddLinkRequest {
    pub url: String,
}

impl Validate for AddLinkRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        parse_link_url(&self.url).map(|_| ())
    }
}

/// Commit an uploaded avatar by the object key its upload target named
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfirmImageRequest {
    pub key: String,
}

impl Validate for ConfirmImageRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.key.is_empty() || self.key.len() > MAX_OBJECT_KEY_LEN {
            return Err(ValidationError::new("key", "is not an upload key"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreatePostRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

impl Validate for CreatePostRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        if let Some(caption) = &self.caption {
            if caption.chars().count() > MAX_CAPTION_CHARS {
                return Err(ValidationError::new(
                    "caption",
                    format!("must be at most {MAX_CAPTION_CHARS} characters"),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames() {
        assert!(validate_username("ada_lovelace").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username("a".repeat(21).as_str()).is_err());
    }

    #[test]
    fn register_checks_every_field() {
        let ok = RegisterRequest {
            email: "a@x.com".to_string(),
            username: "ada".to_string(),
            password: "long enough".to_string(),
        };
        assert!(ok.validate().is_ok());

        let short = RegisterRequest {
            password: "short".to_string(),
            ..ok.clone()
        };
        assert_eq!(short.validate().unwrap_err().field, "password");

        let bad_email = RegisterRequest {
            email: "nope".to_string(),
            ..ok
        };
        assert_eq!(bad_email.validate().unwrap_err().field, "email");
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result: Result<EditProfileRequest, _> =
            serde_json::from_str(r#"{"username":"ada","admin":true}"#);
        assert!(result.is_err());
    }

    #[test]
    fn empty_edit_is_invalid() {
        let err = EditProfileRequest::default().validate().unwrap_err();
        assert_eq!(err.field, "request");
    }

    #[test]
    fn long_tagline_is_invalid() {
        let edit = EditProfileRequest {
            username: None,
            tagline: Some("x".repeat(MAX_TAGLINE_CHARS + 1)),
        };
        assert_eq!(edit.validate().unwrap_err().field, "tagline");
    }

    #[test]
    fn link_urls() {
        assert!(parse_link_url("https://github.com/ada").is_ok());
        assert!(parse_link_url("  https://ada.dev  ").is_ok());
        assert!(parse_link_url("github.com/ada").is_err());
        assert!(parse_link_url("ftp://files.test/x").is_err());
        assert!(parse_link_url("javascript:alert(1)").is_err());
    }

    #[test]
    fn login_password_is_optional_and_redacted() {
        let login: LoginRequest = serde_json::from_str(r#"{"email":"a@x.com"}"#).unwrap();
        assert_eq!(login.password, None);

        let login = LoginRequest {
            email: "a@x.com".to_string(),
            password: Some("hunter22".to_string()),
        };
        assert!(!format!("{login:?}").contains("hunter22"));
    }

    #[test]
    fn image_keys_must_be_present_and_short() {
        let confirm = |key: String| ConfirmImageRequest { key }.validate();
        assert!(confirm("avatars/1/2".to_string()).is_ok());
        assert_eq!(confirm(String::new()).unwrap_err().field, "key");
        assert!(confirm("k".repeat(MAX_OBJECT_KEY_LEN + 1)).is_err());
    }
}
