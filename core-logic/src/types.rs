//! Token, amount and receipt types shared by the dispatcher and transfer clients.

use anyhow::{Context, Result};
use ethers::types::{Address, H256, U256};
use std::fmt;

/// Decimals used by the chain's native coin.
pub const NATIVE_DECIMALS: u8 = 18;

/// What is being sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Asset {
    Native,
    Erc20(Address),
}

impl Asset {
    /// Parses `native` or an ERC-20 contract address.
    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        if trimmed.eq_ignore_ascii_case("native") {
            return Some(Asset::Native);
        }
        crate::utils::address_book::parse_address(trimmed).map(Asset::Erc20)
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Asset::Native => f.write_str("native"),
            Asset::Erc20(addr) => write!(f, "{:?}", addr),
        }
    }
}

/// Chain plus asset a transfer is submitted against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenTarget {
    pub chain_id: u64,
    pub asset: Asset,
}

impl TokenTarget {
    pub fn new(chain_id: u64, asset: Asset) -> Self {
        Self { chain_id, asset }
    }

    pub fn native(chain_id: u64) -> Self {
        Self::new(chain_id, Asset::Native)
    }

    pub fn erc20(chain_id: u64, contract: Address) -> Self {
        Self::new(chain_id, Asset::Erc20(contract))
    }
}

impl fmt::Display for TokenTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.asset, self.chain_id)
    }
}

/// An amount already rounded to the token's precision.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenAmount {
    text: String,
    value: f64,
    decimals: u8,
}

impl TokenAmount {
    /// Builds `steps * 10^-digits`, for a token with `decimals` precision.
    /// `digits` must not exceed `decimals`.
    pub fn from_steps(steps: u128, digits: u8, decimals: u8) -> Self {
        let scale = 10u128.pow(digits as u32);
        let text = if digits == 0 {
            steps.to_string()
        } else {
            format!(
                "{}.{:0width$}",
                steps / scale,
                steps % scale,
                width = digits as usize
            )
        };
        let value = text
            .parse::<f64>()
            .unwrap_or(steps as f64 / scale as f64);
        Self {
            text,
            value,
            decimals,
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Number of digits after the decimal point in the rounded text.
    pub fn fractional_digits(&self) -> usize {
        self.text
            .split_once('.')
            .map(|(_, frac)| frac.len())
            .unwrap_or(0)
    }

    /// Amount in the token's smallest unit.
    pub fn to_base_units(&self) -> Result<U256> {
        let parsed = ethers::utils::parse_units(&self.text, self.decimals as u32)
            .with_context(|| format!("Cannot scale {} by 10^{}", self.text, self.decimals))?;
        Ok(parsed.into())
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Confirmation record of a submitted transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
    pub tx_hash: H256,
    pub block_number: Option<u64>,
    pub endpoint: String,
}
