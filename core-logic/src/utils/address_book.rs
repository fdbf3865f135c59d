//! Recipient address persistence.
//!
//! Addresses live either in a JSON array (`addresses.json`) or in a plain
//! text file with one address per line. The file is re-read on every load.

use crate::error::WalletError;
use crate::traits::RecipientStore;
use anyhow::{Context, Result};
use async_trait::async_trait;
use ethers::types::Address;
use ethers::utils::to_checksum;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Parses a `0x` + 40 hex address. Mixed-case input must carry a valid
/// EIP-55 checksum.
pub fn parse_address(value: &str) -> Option<Address> {
    let trimmed = value.trim();
    let hex_part = trimmed.strip_prefix("0x")?;
    if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let address: Address = trimmed.parse().ok()?;

    let has_upper = hex_part.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = hex_part.chars().any(|c| c.is_ascii_lowercase());
    if has_upper && has_lower && to_checksum(&address, None) != trimmed {
        return None;
    }

    Some(address)
}

/// Splits operator input on commas and whitespace. Invalid entries are
/// returned separately so the caller can report them.
pub fn parse_address_list(input: &str) -> (Vec<Address>, Vec<WalletError>) {
    let mut valid = Vec::new();
    let mut invalid = Vec::new();

    for item in input
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
    {
        match parse_address(item) {
            Some(addr) => valid.push(addr),
            None => invalid.push(WalletError::InvalidAddress {
                value: item.to_string(),
            }),
        }
    }

    (valid, invalid)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileFormat {
    Json,
    Lines,
}

/// File-backed recipient list.
pub struct FileRecipientStore {
    path: PathBuf,
    format: FileFormat,
}

impl FileRecipientStore {
    /// `.json` files hold an array; anything else is one address per line.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = if path.extension().is_some_and(|ext| ext == "json") {
            FileFormat::Json
        } else {
            FileFormat::Lines
        };
        Self { path, format }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parse_entries(&self, entries: Vec<String>) -> Vec<Address> {
        entries
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.trim().is_empty())
            .filter_map(|(i, entry)| match parse_address(entry) {
                Some(addr) => Some(addr),
                None => {
                    warn!(
                        "Invalid address at entry {} in {}: '{}'",
                        i + 1,
                        self.path.display(),
                        entry.trim()
                    );
                    None
                }
            })
            .collect()
    }
}

#[async_trait]
impl RecipientStore for FileRecipientStore {
    async fn load(&self) -> Result<Vec<Address>> {
        if !tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            debug!("{} does not exist yet", self.path.display());
            return Ok(Vec::new());
        }

        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read address file: {}", self.path.display()))?;

        let entries: Vec<String> = match self.format {
            FileFormat::Json if content.trim().is_empty() => Vec::new(),
            FileFormat::Json => serde_json::from_str(&content)
                .with_context(|| format!("{} is not a JSON array of strings", self.path.display()))?,
            FileFormat::Lines => content.lines().map(str::to_string).collect(),
        };

        Ok(self.parse_entries(entries))
    }

    async fn save(&self, recipients: &[Address]) -> Result<()> {
        let entries: Vec<String> = recipients.iter().map(|a| to_checksum(a, None)).collect();

        let body = match self.format {
            FileFormat::Json => serde_json::to_string_pretty(&entries)?,
            FileFormat::Lines => {
                let mut text = entries.join("\n");
                text.push('\n');
                text
            }
        };

        tokio::fs::write(&self.path, body)
            .await
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        Ok(())
    }
}
