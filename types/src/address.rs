//! Account identity type with `0x` prefix.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TypesError;

/// An account identity: `0x` followed by 20 bytes of hex.
///
/// Always stored lowercase so that two spellings of the same account compare
/// equal and hash identically.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId(String);

impl AccountId {
    /// The standard prefix for all account ids.
    pub const PREFIX: &'static str = "0x";

    /// Number of raw bytes behind an account id.
    pub const LEN: usize = 20;

    /// Parse and normalise an account id.
    pub fn parse(raw: &str) -> Result<Self, TypesError> {
        let body = raw
            .strip_prefix(Self::PREFIX)
            .or_else(|| raw.strip_prefix("0X"))
            .ok_or_else(|| TypesError::InvalidAccount(raw.to_string()))?;
        let bytes = hex::decode(body).map_err(|_| TypesError::InvalidAccount(raw.to_string()))?;
        if bytes.len() != Self::LEN {
            return Err(TypesError::InvalidAccount(raw.to_string()));
        }
        Ok(Self::from_bytes(
            bytes.try_into().expect("length checked above"),
        ))
    }

    /// Build an account id from its raw bytes.
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(format!("{}{}", Self::PREFIX, hex::encode(bytes)))
    }

    /// Return the normalised address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Raw bytes of the account.
    pub fn to_bytes(&self) -> [u8; 20] {
        let mut out = [0u8; 20];
        // The inner string is only ever produced by `from_bytes`.
        hex::decode_to_slice(&self.0[Self::PREFIX.len()..], &mut out)
            .expect("account id is always valid hex");
        out
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AccountId {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for AccountId {
    type Error = TypesError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<AccountId> for String {
    fn from(id: AccountId) -> Self {
        id.0
    }
}
