use crate::error::WalletError;
use crate::traits::CredentialStore;
use crate::types::{Asset, TokenTarget};
use anyhow::{Context, Result};
use async_trait::async_trait;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::Address;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::warn;
use zeroize::Zeroizing;

/// A signing key and the address derived from it.
#[derive(Clone)]
pub struct Credential {
    wallet: LocalWallet,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("address", &self.wallet.address())
            .field("private_key", &"***REDACTED***")
            .finish()
    }
}

impl Credential {
    /// Builds a credential from a `0x`-prefixed 64 hex char private key.
    pub fn from_private_key(raw: &str) -> Result<Self, WalletError> {
        let trimmed = raw.trim();
        let hex_part = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or(WalletError::InvalidKeyFormat)?;

        if hex_part.len() != 64 {
            return Err(WalletError::InvalidKeyLength {
                length: hex_part.len(),
            });
        }

        let bytes = Zeroizing::new(hex::decode(hex_part).map_err(|_| WalletError::InvalidKeyFormat)?);
        let wallet = LocalWallet::from_bytes(&bytes).map_err(|_| WalletError::InvalidKeyFormat)?;

        Ok(Self { wallet })
    }

    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    pub fn wallet(&self) -> &LocalWallet {
        &self.wallet
    }

    /// Short form used in log lines.
    pub fn label(&self) -> String {
        let addr = format!("{:?}", self.address());
        format!("{}..{}", &addr[..6], &addr[addr.len() - 4..])
    }

    pub(crate) fn secret_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(format!("0x{}", hex::encode(self.wallet.signer().to_bytes())))
    }
}

/// A credential together with the token it sends.
#[derive(Debug, Clone)]
pub struct Account {
    pub credential: Credential,
    pub target: TokenTarget,
}

impl Account {
    pub fn new(credential: Credential, target: TokenTarget) -> Self {
        Self { credential, target }
    }
}

/// Result of parsing a `key,asset,key,asset,...` list.
#[derive(Debug, Default)]
pub struct ParsedAccounts {
    pub accounts: Vec<Account>,
    pub rejected: Vec<WalletError>,
}

/// Keeps enough of a secret to recognise it in an error message.
fn redact(value: &str) -> String {
    let visible: String = value.chars().take(6).collect();
    format!("{}***", visible)
}

/// Parses comma separated `privateKey,asset` pairs. Bad pairs are skipped
/// and reported; good ones are kept.
pub fn parse_account_pairs(input: &str, chain_id: u64) -> ParsedAccounts {
    let items: Vec<&str> = input
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();

    let mut parsed = ParsedAccounts::default();

    for pair in items.chunks(2) {
        let [key, asset] = pair else {
            parsed.rejected.push(WalletError::UnpairedEntry {
                entry: redact(pair[0]),
            });
            continue;
        };

        let credential = match Credential::from_private_key(key) {
            Ok(c) => c,
            Err(e) => {
                parsed.rejected.push(e);
                continue;
            }
        };

        match Asset::parse(asset) {
            Some(asset) => parsed
                .accounts
                .push(Account::new(credential, TokenTarget::new(chain_id, asset))),
            None => parsed.rejected.push(WalletError::InvalidAddress {
                value: asset.to_string(),
            }),
        }
    }

    parsed
}

/// Plain text credential file, one `privateKey,asset` per line.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self, chain_id: u64) -> Result<Vec<Account>> {
        if !tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            return Ok(Vec::new());
        }

        let content = Zeroizing::new(
            tokio::fs::read_to_string(&self.path)
                .await
                .with_context(|| format!("Failed to read {}", self.path.display()))?,
        );

        let mut accounts = Vec::new();
        for (i, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let parsed = parse_account_pairs(trimmed, chain_id);
            for err in parsed.rejected {
                warn!("Skipping line {} in {}: {}", i + 1, self.path.display(), err);
            }
            accounts.extend(parsed.accounts);
        }

        Ok(accounts)
    }

    async fn append(&self, accounts: &[Account]) -> Result<()> {
        use tokio::io::AsyncWriteExt;

        let mut lines = Zeroizing::new(String::new());
        for account in accounts {
            lines.push_str(&account.credential.secret_hex());
            lines.push(',');
            lines.push_str(&account.target.asset.to_string());
            lines.push('\n');
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("Failed to open {}", self.path.display()))?;
        file.write_all(lines.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
    const TOKEN: &str = "0x20c0000000000000000000000000000000000001";

    #[test]
    fn rejects_malformed_keys() {
        assert_eq!(
            Credential::from_private_key("4c0883a6").unwrap_err(),
            WalletError::InvalidKeyFormat
        );
        assert_eq!(
            Credential::from_private_key("0x1234").unwrap_err(),
            WalletError::InvalidKeyLength { length: 4 }
        );
        let not_hex = format!("0x{}", "zz".repeat(32));
        assert_eq!(
            Credential::from_private_key(&not_hex).unwrap_err(),
            WalletError::InvalidKeyFormat
        );
    }

    #[test]
    fn debug_output_hides_key() {
        let credential = Credential::from_private_key(KEY).unwrap();
        let printed = format!("{:?}", credential);
        assert!(printed.contains("REDACTED"));
        assert!(!printed.contains("4c0883a6"));
    }

    #[test]
    fn parses_pairs_and_skips_bad_ones() {
        let input = format!("{KEY},{TOKEN}, 0xbad,{TOKEN},{KEY},native,{KEY}");
        let parsed = parse_account_pairs(&input, 10218);

        assert_eq!(parsed.accounts.len(), 2);
        assert_eq!(parsed.accounts[1].target.asset, Asset::Native);
        assert_eq!(parsed.rejected.len(), 2);
        assert!(matches!(parsed.rejected[1], WalletError::UnpairedEntry { .. }));
    }

    #[tokio::test]
    async fn file_store_round_trips_accounts() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("accounts.txt"));

        assert!(store.load(1).await.unwrap().is_empty());

        let parsed = parse_account_pairs(&format!("{KEY},{TOKEN}"), 1);
        store.append(&parsed.accounts).await.unwrap();
        store.append(&parsed.accounts).await.unwrap();

        let loaded = store.load(1).await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].credential.address(), parsed.accounts[0].credential.address());
        assert_eq!(loaded[0].target, parsed.accounts[0].target);
    }
}
