//! Domain labels and pricing
//!
//! A label is the user-chosen part of a name; the `.hell` suffix is display
//! only and never reaches the contract.

use ethers::types::{Address, U256};
use serde::Serialize;
use std::fmt;

use crate::error::NameServiceError;

/// Shortest label the registry sells
pub const MIN_LABEL_LENGTH: usize = 3;

pub const LABEL_TOO_SHORT_NOTICE: &str = "Domain must be at least 3 characters long";
pub const LABEL_EMPTY_NOTICE: &str = "Domain must not be empty";

/// A label that passed validation; length counts Unicode scalar values
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DomainLabel(String);

impl DomainLabel {
    pub fn parse(input: &str) -> Result<Self, NameServiceError> {
        if input.is_empty() {
            return Err(NameServiceError::Validation(LABEL_EMPTY_NOTICE.to_string()));
        }
        if input.chars().count() < MIN_LABEL_LENGTH {
            return Err(NameServiceError::Validation(
                LABEL_TOO_SHORT_NOTICE.to_string(),
            ));
        }
        Ok(Self(input.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn price(&self) -> PriceTier {
        PriceTier::for_label(self)
    }

    pub fn display_name(&self, tld: &str) -> String {
        format!("{}{}", self.0, tld)
    }
}

impl fmt::Display for DomainLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DomainLabel {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Registration price, a pure function of label length
///
/// | length | price |
/// |--------|-------|
/// | 3      | 0.5   |
/// | 4      | 0.3   |
/// | 5+     | 0.1   |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PriceTier {
    ThreeCharacter,
    FourCharacter,
    Standard,
}

impl PriceTier {
    pub fn for_label(label: &DomainLabel) -> Self {
        match label.len() {
            3 => Self::ThreeCharacter,
            4 => Self::FourCharacter,
            _ => Self::Standard,
        }
    }

    /// Price in whole native units, as shown to the user
    pub fn ether(&self) -> &'static str {
        match self {
            Self::ThreeCharacter => "0.5",
            Self::FourCharacter => "0.3",
            Self::Standard => "0.1",
        }
    }

    /// Price in wei (18 decimals), the transaction `value`
    pub fn wei(&self) -> U256 {
        let tenths = match self {
            Self::ThreeCharacter => 5u64,
            Self::FourCharacter => 3,
            Self::Standard => 1,
        };
        U256::exp10(17) * U256::from(tenths)
    }
}

/// `0x1234...abcd` form used in headers
pub fn short_address(address: &Address) -> String {
    let full = format!("{:?}", address);
    format!("{}...{}", &full[..6], &full[full.len() - 4..])
}
