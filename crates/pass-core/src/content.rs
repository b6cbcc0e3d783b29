//! Item and vault content messages
//!
//! Plaintext payloads of the envelope. They are prost-encoded before
//! encryption, end to end for the server and with the main key for the
//! local cache.

#![allow(missing_docs)] // Proto fields don't need individual docs

use crate::error::{Error, Result};
use prost::Message;

/// Decrypted item payload
#[derive(Clone, PartialEq, Message)]
pub struct ItemContent {
    #[prost(message, optional, tag = "1")]
    pub metadata: Option<Metadata>,
    #[prost(message, optional, tag = "2")]
    pub content: Option<Content>,
    #[prost(message, repeated, tag = "3")]
    pub extra_fields: Vec<ExtraField>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Metadata {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub note: String,
    #[prost(string, tag = "3")]
    pub item_uuid: String,
}

/// Type-specific payload
#[derive(Clone, PartialEq, Message)]
pub struct Content {
    #[prost(oneof = "content::Kind", tags = "2, 3, 4, 5")]
    pub kind: Option<content::Kind>,
}

pub mod content {
    /// Item type
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Kind {
        #[prost(message, tag = "2")]
        Note(super::Note),
        #[prost(message, tag = "3")]
        Login(super::Login),
        #[prost(message, tag = "4")]
        Alias(super::Alias),
        #[prost(message, tag = "5")]
        CreditCard(super::CreditCard),
    }
}

#[derive(Clone, PartialEq, Message)]
pub struct Note {}

#[derive(Clone, PartialEq, Message)]
pub struct Alias {}

#[derive(Clone, PartialEq, Message)]
pub struct Login {
    #[prost(string, tag = "1")]
    pub username: String,
    #[prost(string, tag = "2")]
    pub password: String,
    #[prost(string, repeated, tag = "3")]
    pub urls: Vec<String>,
    #[prost(string, tag = "4")]
    pub totp_uri: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct CreditCard {
    #[prost(string, tag = "1")]
    pub cardholder_name: String,
    #[prost(string, tag = "2")]
    pub number: String,
    #[prost(string, tag = "3")]
    pub verification_number: String,
    #[prost(string, tag = "4")]
    pub expiration_date: String,
    #[prost(string, tag = "5")]
    pub pin: String,
}

/// User-defined extra field
#[derive(Clone, PartialEq, Message)]
pub struct ExtraField {
    #[prost(string, tag = "1")]
    pub field_name: String,
    #[prost(oneof = "extra_field::Value", tags = "2, 3, 4")]
    pub value: Option<extra_field::Value>,
}

pub mod extra_field {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Value {
        #[prost(message, tag = "2")]
        Text(super::ExtraText),
        #[prost(message, tag = "3")]
        Hidden(super::ExtraHidden),
        #[prost(message, tag = "4")]
        Totp(super::ExtraTotp),
    }
}

#[derive(Clone, PartialEq, Message)]
pub struct ExtraText {
    #[prost(string, tag = "1")]
    pub content: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct ExtraHidden {
    #[prost(string, tag = "1")]
    pub content: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct ExtraTotp {
    #[prost(string, tag = "1")]
    pub totp_uri: String,
}

/// Decrypted vault metadata, carried in `Share.content`
#[derive(Clone, PartialEq, Message)]
pub struct VaultContent {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub description: String,
    #[prost(message, optional, tag = "3")]
    pub display: Option<VaultDisplay>,
}

#[derive(Clone, PartialEq, Message)]
pub struct VaultDisplay {
    #[prost(int32, tag = "1")]
    pub icon: i32,
    #[prost(int32, tag = "2")]
    pub color: i32,
}

/// Item type discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemContentType {
    Note,
    Login,
    Alias,
    CreditCard,
}

impl ItemContent {
    fn with_kind(name: &str, note: &str, kind: content::Kind) -> Self {
        Self {
            metadata: Some(Metadata {
                name: name.to_string(),
                note: note.to_string(),
                item_uuid: uuid::Uuid::new_v4().to_string(),
            }),
            content: Some(Content { kind: Some(kind) }),
            extra_fields: Vec::new(),
        }
    }

    /// Build a note item
    pub fn note(name: &str, note: &str) -> Self {
        Self::with_kind(name, note, content::Kind::Note(Note {}))
    }

    /// Build a login item
    pub fn login(name: &str, username: &str, password: &str, urls: Vec<String>) -> Self {
        Self::with_kind(
            name,
            "",
            content::Kind::Login(Login {
                username: username.to_string(),
                password: password.to_string(),
                urls,
                totp_uri: String::new(),
            }),
        )
    }

    /// Build an alias item
    pub fn alias(name: &str, note: &str) -> Self {
        Self::with_kind(name, note, content::Kind::Alias(Alias {}))
    }

    /// Build a credit card item
    pub fn credit_card(name: &str, card: CreditCard) -> Self {
        Self::with_kind(name, "", content::Kind::CreditCard(card))
    }

    /// Item name, empty when metadata is absent
    pub fn name(&self) -> &str {
        self.metadata.as_ref().map(|m| m.name.as_str()).unwrap_or_default()
    }

    /// Type of the payload
    pub fn content_type(&self) -> Result<ItemContentType> {
        let kind = self
            .content
            .as_ref()
            .and_then(|c| c.kind.as_ref())
            .ok_or_else(|| Error::corrupted("ItemContent", "content"))?;
        Ok(match kind {
            content::Kind::Note(_) => ItemContentType::Note,
            content::Kind::Login(_) => ItemContentType::Login,
            content::Kind::Alias(_) => ItemContentType::Alias,
            content::Kind::CreditCard(_) => ItemContentType::CreditCard,
        })
    }

    /// Whether the item should be offered for AutoFill
    pub fn is_log_in_item(&self) -> bool {
        matches!(self.content_type(), Ok(ItemContentType::Login))
    }

    /// Login payload, if this is a login
    pub fn login_data(&self) -> Option<&Login> {
        match self.content.as_ref()?.kind.as_ref()? {
            content::Kind::Login(login) => Some(login),
            _ => None,
        }
    }

    /// Canonical binary form
    pub fn to_bytes(&self) -> Vec<u8> {
        self.encode_to_vec()
    }

    /// Parse the canonical binary form
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(Self::decode(bytes)?)
    }
}

impl VaultContent {
    /// Canonical binary form
    pub fn to_bytes(&self) -> Vec<u8> {
        self.encode_to_vec()
    }

    /// Parse the canonical binary form
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(Self::decode(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_content_type() {
        let content = ItemContent::login("Bank", "john", "hunter2", vec!["https://bank.example".into()]);
        assert_eq!(content.content_type().unwrap(), ItemContentType::Login);
        assert!(content.is_log_in_item());
        assert_eq!(content.login_data().unwrap().username, "john");
        assert_eq!(content.name(), "Bank");
    }

    #[test]
    fn test_note_is_not_login() {
        let content = ItemContent::note("Wifi", "garage code 1234");
        assert_eq!(content.content_type().unwrap(), ItemContentType::Note);
        assert!(!content.is_log_in_item());
        assert!(content.login_data().is_none());
    }

    #[test]
    fn test_missing_kind_is_corrupted() {
        let content = ItemContent::default();
        let err = content.content_type().unwrap_err();
        assert_eq!(err.to_string(), "Corrupted ItemContent: missing value for content");
    }

    #[test]
    fn test_binary_form() {
        let mut content = ItemContent::credit_card(
            "Visa",
            CreditCard {
                cardholder_name: "J Doe".into(),
                number: "4111111111111111".into(),
                ..Default::default()
            },
        );
        content.extra_fields.push(ExtraField {
            field_name: "pin hint".into(),
            value: Some(extra_field::Value::Hidden(ExtraHidden { content: "birthday".into() })),
        });
        let decoded = ItemContent::from_bytes(&content.to_bytes()).unwrap();
        assert_eq!(decoded, content);
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(
            ItemContent::from_bytes(&[0xff, 0xff, 0xff]),
            Err(Error::InvalidContent(_))
        ));
    }
}
