use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Raised when a stored or submitted string is not a member of one of the
/// fixed enumerations below.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! string_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

/// Who can read a chat: only its owner, or any signed-in user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    #[default]
    Private,
}

string_enum!(Visibility, "visibility", {
    Public => "public",
    Private => "private",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

string_enum!(Role, "role", {
    User => "user",
    Assistant => "assistant",
    System => "system",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VotePolarity {
    Up,
    Down,
}

string_enum!(VotePolarity, "vote type", {
    Up => "up",
    Down => "down",
});

impl VotePolarity {
    pub fn is_upvote(&self) -> bool {
        matches!(self, Self::Up)
    }

    pub fn from_upvoted(is_upvoted: bool) -> Self {
        if is_upvoted { Self::Up } else { Self::Down }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    #[default]
    Text,
    Code,
    Image,
    Sheet,
}

string_enum!(DocumentKind, "document kind", {
    Text => "text",
    Code => "code",
    Image => "image",
    Sheet => "sheet",
});

// -- Entities as exposed to clients. The password hash never leaves quill-db. --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub visibility: Visibility,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    pub chat_id: Uuid,
    pub message_id: Uuid,
    #[serde(rename = "type")]
    pub polarity: VotePolarity,
}

/// One version of a document. Versions share `id` and differ in `created_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub user_id: Uuid,
    pub title: String,
    pub kind: DocumentKind,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: Uuid,
    pub document_id: Uuid,
    pub document_created_at: DateTime<Utc>,
    pub user_id: Uuid,
    pub original_text: String,
    pub suggested_text: String,
    pub description: Option<String>,
    pub is_resolved: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visibility_parses_known_values_only() {
        assert_eq!("public".parse::<Visibility>().unwrap(), Visibility::Public);
        assert_eq!("private".parse::<Visibility>().unwrap(), Visibility::Private);

        let err = "friends".parse::<Visibility>().unwrap_err();
        assert_eq!(err.kind, "visibility");
        assert_eq!(err.to_string(), "unknown visibility 'friends'");
    }

    #[test]
    fn vote_polarity_maps_to_flag() {
        assert!(VotePolarity::Up.is_upvote());
        assert_eq!(VotePolarity::from_upvoted(false), VotePolarity::Down);
    }

    #[test]
    fn vote_serializes_polarity_as_type() {
        let vote = Vote {
            chat_id: Uuid::nil(),
            message_id: Uuid::nil(),
            polarity: VotePolarity::Down,
        };
        let json = serde_json::to_value(&vote).unwrap();
        assert_eq!(json["type"], "down");
    }
}
