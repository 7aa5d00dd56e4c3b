//! Form payloads and the typed schemas actions validate them against.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use quill_types::models::{DocumentKind, Visibility, VotePolarity};

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MAX_PASSWORD_LEN: usize = 128;
pub const MAX_MESSAGE_LEN: usize = 4000;
pub const MAX_TITLE_LEN: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing field '{0}'")]
    Missing(String),

    #[error("invalid {field}: {reason}")]
    Invalid { field: String, reason: String },
}

impl ValidationError {
    fn invalid(field: &str, reason: impl ToString) -> Self {
        Self::Invalid {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// The raw key/value bag a form submission decodes into.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct FormData(HashMap<String, String>);

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    /// Present and non-blank, trimmed.
    pub fn text(&self, key: &str) -> Result<&str, ValidationError> {
        self.optional(key)
            .ok_or_else(|| ValidationError::Missing(key.to_string()))
    }

    /// Trimmed value, or `None` when absent or blank.
    pub fn optional(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn parse<T>(&self, key: &str) -> Result<T, ValidationError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.text(key)?
            .parse()
            .map_err(|e| ValidationError::invalid(key, e))
    }

    pub fn uuid(&self, key: &str) -> Result<Uuid, ValidationError> {
        self.parse(key)
    }

    pub fn timestamp(&self, key: &str) -> Result<DateTime<Utc>, ValidationError> {
        let raw = self.text(key)?;
        DateTime::parse_from_rfc3339(raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(|e| ValidationError::invalid(key, e))
    }

    /// Like `text`, bounded to `max` characters.
    fn bounded(&self, key: &str, max: usize) -> Result<&str, ValidationError> {
        let value = self.text(key)?;
        if value.chars().count() > max {
            return Err(ValidationError::invalid(key, format!("longer than {max} characters")));
        }
        Ok(value)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormData {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}

// -- Schemas --

#[derive(Debug)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    /// Emails are compared lower-cased. Passwords are taken verbatim.
    pub fn parse(form: &FormData) -> Result<Self, ValidationError> {
        let email = form.text("email")?.to_lowercase();
        if !is_valid_email(&email) {
            return Err(ValidationError::invalid("email", "not an email address"));
        }

        let password = form
            .0
            .get("password")
            .ok_or_else(|| ValidationError::Missing("password".to_string()))?;
        let len = password.chars().count();
        if len < MIN_PASSWORD_LEN {
            return Err(ValidationError::invalid(
                "password",
                format!("shorter than {MIN_PASSWORD_LEN} characters"),
            ));
        }
        if len > MAX_PASSWORD_LEN {
            return Err(ValidationError::invalid(
                "password",
                format!("longer than {MAX_PASSWORD_LEN} characters"),
            ));
        }

        Ok(Self {
            email,
            password: password.clone(),
        })
    }
}

#[derive(Debug)]
pub struct VisibilityChange {
    pub chat_id: Uuid,
    pub visibility: Visibility,
}

impl VisibilityChange {
    pub fn parse(form: &FormData) -> Result<Self, ValidationError> {
        Ok(Self {
            chat_id: form.uuid("chat_id")?,
            visibility: form.parse("visibility")?,
        })
    }
}

#[derive(Debug)]
pub struct ChatRef {
    pub chat_id: Uuid,
}

impl ChatRef {
    pub fn parse(form: &FormData) -> Result<Self, ValidationError> {
        Ok(Self {
            chat_id: form.uuid("chat_id")?,
        })
    }
}

#[derive(Debug)]
pub struct MessageRef {
    pub message_id: Uuid,
}

impl MessageRef {
    pub fn parse(form: &FormData) -> Result<Self, ValidationError> {
        Ok(Self {
            message_id: form.uuid("message_id")?,
        })
    }
}

#[derive(Debug)]
pub struct OutgoingMessage {
    pub chat_id: Uuid,
    pub message_id: Uuid,
    pub content: String,
    pub visibility: Visibility,
}

impl OutgoingMessage {
    pub fn parse(form: &FormData) -> Result<Self, ValidationError> {
        let visibility = match form.optional("visibility") {
            Some(raw) => raw
                .parse()
                .map_err(|e| ValidationError::invalid("visibility", e))?,
            None => Visibility::default(),
        };

        Ok(Self {
            chat_id: form.uuid("chat_id")?,
            message_id: form.uuid("message_id")?,
            content: form.bounded("content", MAX_MESSAGE_LEN)?.to_string(),
            visibility,
        })
    }
}

#[derive(Debug)]
pub struct VoteInput {
    pub chat_id: Uuid,
    pub message_id: Uuid,
    pub polarity: VotePolarity,
}

impl VoteInput {
    pub fn parse(form: &FormData) -> Result<Self, ValidationError> {
        Ok(Self {
            chat_id: form.uuid("chat_id")?,
            message_id: form.uuid("message_id")?,
            polarity: form.parse("type")?,
        })
    }
}

#[derive(Debug)]
pub struct DocumentInput {
    pub id: Uuid,
    pub title: String,
    pub kind: DocumentKind,
    pub content: String,
}

impl DocumentInput {
    /// `content` may be empty; a blank document is a valid first version.
    pub fn parse(form: &FormData) -> Result<Self, ValidationError> {
        let kind = match form.optional("kind") {
            Some(raw) => raw.parse().map_err(|e| ValidationError::invalid("kind", e))?,
            None => DocumentKind::default(),
        };

        Ok(Self {
            id: form.uuid("id")?,
            title: form.bounded("title", MAX_TITLE_LEN)?.to_string(),
            kind,
            content: form.0.get("content").cloned().unwrap_or_default(),
        })
    }
}

#[derive(Debug)]
pub struct DocumentRollback {
    pub id: Uuid,
    pub after: DateTime<Utc>,
}

impl DocumentRollback {
    pub fn parse(form: &FormData) -> Result<Self, ValidationError> {
        Ok(Self {
            id: form.uuid("id")?,
            after: form.timestamp("timestamp")?,
        })
    }
}

#[derive(Debug)]
pub struct SuggestionInput {
    pub document_id: Uuid,
    pub original_text: String,
    pub suggested_text: String,
    pub description: Option<String>,
}

impl SuggestionInput {
    pub fn parse(form: &FormData) -> Result<Self, ValidationError> {
        Ok(Self {
            document_id: form.uuid("document_id")?,
            original_text: form.text("original_text")?.to_string(),
            suggested_text: form.text("suggested_text")?.to_string(),
            description: form.optional("description").map(str::to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shapes() {
        for good in ["a@b.com", "first.last@mail.example.org", "x+tag@y.io"] {
            assert!(is_valid_email(good), "{good}");
        }
        for bad in ["", "a@", "@b.com", "a@b", "a@@b.com", "a b@c.com", "a@b.", "a@.com"] {
            assert!(!is_valid_email(bad), "{bad}");
        }
    }

    #[test]
    fn short_password_is_invalid() {
        let form = FormData::new()
            .with("email", "a@b.com")
            .with("password", "short");

        let err = Credentials::parse(&form).unwrap_err();
        assert!(matches!(err, ValidationError::Invalid { ref field, .. } if field == "password"));
    }

    #[test]
    fn credentials_normalize_email_but_not_password() {
        let form = FormData::new()
            .with("email", "  Mixed@Case.COM ")
            .with("password", " spaced pass ");

        let creds = Credentials::parse(&form).unwrap();
        assert_eq!(creds.email, "mixed@case.com");
        assert_eq!(creds.password, " spaced pass ");
    }

    #[test]
    fn missing_and_blank_fields_are_missing() {
        let form = FormData::new().with("chat_id", "   ");
        assert_eq!(
            ChatRef::parse(&form).unwrap_err(),
            ValidationError::Missing("chat_id".to_string())
        );
    }

    #[test]
    fn enums_and_ids_are_checked() {
        let id = Uuid::new_v4().to_string();

        let form = FormData::new()
            .with("chat_id", id.as_str())
            .with("visibility", "friends");
        assert!(VisibilityChange::parse(&form).is_err());

        let form = FormData::new()
            .with("chat_id", "c1")
            .with("visibility", "public");
        assert!(VisibilityChange::parse(&form).is_err());

        let form = FormData::new()
            .with("chat_id", id.as_str())
            .with("visibility", "public");
        assert_eq!(
            VisibilityChange::parse(&form).unwrap().visibility,
            Visibility::Public
        );
    }

    #[test]
    fn outgoing_message_defaults_to_private_and_bounds_content() {
        let base = [
            ("chat_id", Uuid::new_v4().to_string()),
            ("message_id", Uuid::new_v4().to_string()),
        ];

        let form: FormData = base
            .iter()
            .cloned()
            .chain([("content", "hello".to_string())])
            .collect();
        let msg = OutgoingMessage::parse(&form).unwrap();
        assert_eq!(msg.visibility, Visibility::Private);

        let form: FormData = base
            .iter()
            .cloned()
            .chain([("content", "x".repeat(MAX_MESSAGE_LEN + 1))])
            .collect();
        assert!(OutgoingMessage::parse(&form).is_err());
    }

    #[test]
    fn rollback_needs_rfc3339() {
        let id = Uuid::new_v4().to_string();
        let form = FormData::new()
            .with("id", id.as_str())
            .with("timestamp", "yesterday");
        assert!(DocumentRollback::parse(&form).is_err());

        let form = FormData::new()
            .with("id", id.as_str())
            .with("timestamp", "2026-01-02T03:04:05.000006Z");
        assert!(DocumentRollback::parse(&form).is_ok());
    }
}
