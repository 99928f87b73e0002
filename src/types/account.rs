//! Account-related types for the import pipeline
//!
//! Accounts live on the remote finance API. The importer only ever holds
//! deferred references to them until a lookup resolves those references.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Remote account identifier
pub type AccountId = String;

/// Which account field a reference value should be matched against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierKind {
    /// The remote account id
    Id,
    /// The account's display name
    Name,
    /// The bank account number (IBAN or similar)
    AccountNumber,
}

impl IdentifierKind {
    /// All kinds, in lookup order
    pub const ALL: [IdentifierKind; 3] = [
        IdentifierKind::Id,
        IdentifierKind::Name,
        IdentifierKind::AccountNumber,
    ];

    /// Read the field this kind identifies from an account
    pub fn value_of<'a>(&self, account: &'a Account) -> Option<&'a str> {
        match self {
            IdentifierKind::Id => Some(account.id.as_str()),
            IdentifierKind::Name => Some(account.name.as_str()),
            IdentifierKind::AccountNumber => account.account_number.as_deref(),
        }
    }
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IdentifierKind::Id => "id",
            IdentifierKind::Name => "name",
            IdentifierKind::AccountNumber => "account_number",
        };
        f.write_str(name)
    }
}

/// Account as known to the remote API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Remote id, used in submitted transactions
    pub id: AccountId,

    /// Display name
    pub name: String,

    /// Bank account number, when the account has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_number: Option<String>,
}

impl Account {
    /// Create an account without an account number
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Account {
            id: id.into(),
            name: name.into(),
            account_number: None,
        }
    }

    /// Attach an account number
    pub fn with_account_number(mut self, number: impl Into<String>) -> Self {
        self.account_number = Some(number.into());
        self
    }
}

/// Deferred pointer to an account
///
/// Expressed as an identifying field and the raw value read from the file.
/// Resolution happens later through the account resolution cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountReference {
    pub identifier_kind: IdentifierKind,
    pub value: String,
}

impl AccountReference {
    pub fn new(identifier_kind: IdentifierKind, value: impl Into<String>) -> Self {
        AccountReference {
            identifier_kind,
            value: value.into(),
        }
    }

    /// Whether `account` is the one this reference points at
    pub fn matches(&self, account: &Account) -> bool {
        self.identifier_kind.value_of(account) == Some(self.value.as_str())
    }
}

impl fmt::Display for AccountReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.identifier_kind, self.value)
    }
}
