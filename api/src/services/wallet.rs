//! Custodial Wallets
//!
//! filmmaker / distributor / platform용 Base 호환 지갑을 생성하고,
//! 개인키를 AES-256-GCM으로 암호화해 저장한다.
//!
//! 저장 형식: `hex(nonce):hex(ciphertext || tag)`

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use anyhow::Result;
use ethers::signers::{LocalWallet, Signer};
use ethers::utils::to_checksum;
use rand::RngCore;
use thiserror::Error;

use crate::db::{MarketplaceStore, NewWallet, Wallet};

const NONCE_LEN: usize = 12;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("WALLET_ENCRYPTION_KEY not set")]
    MissingKey,

    #[error("WALLET_ENCRYPTION_KEY must be 32 bytes of hex")]
    InvalidKey,

    #[error("malformed encrypted key")]
    Malformed,

    #[error("encryption failed")]
    Encryption,

    #[error("decryption failed")]
    Decryption,
}

/// 지갑 소유자 종류
pub const USER_TYPES: &[&str] = &["filmmaker", "distributor", "platform", "buyer"];

/// 지갑 키 암호화기
pub struct KeyVault {
    cipher: Aes256Gcm,
}

impl KeyVault {
    pub fn from_hex(key: Option<&str>) -> Result<Self, WalletError> {
        let key = key.ok_or(WalletError::MissingKey)?;
        let bytes = hex::decode(key.trim()).map_err(|_| WalletError::InvalidKey)?;
        let cipher = Aes256Gcm::new_from_slice(&bytes).map_err(|_| WalletError::InvalidKey)?;
        Ok(Self { cipher })
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, WalletError> {
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);

        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
            .map_err(|_| WalletError::Encryption)?;

        Ok(format!("{}:{}", hex::encode(nonce), hex::encode(ciphertext)))
    }

    pub fn decrypt(&self, encrypted: &str) -> Result<String, WalletError> {
        let (nonce_hex, ciphertext_hex) = encrypted.split_once(':').ok_or(WalletError::Malformed)?;
        let nonce = hex::decode(nonce_hex).map_err(|_| WalletError::Malformed)?;
        let ciphertext = hex::decode(ciphertext_hex).map_err(|_| WalletError::Malformed)?;
        if nonce.len() != NONCE_LEN {
            return Err(WalletError::Malformed);
        }

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(&nonce), ciphertext.as_ref())
            .map_err(|_| WalletError::Decryption)?;

        String::from_utf8(plaintext).map_err(|_| WalletError::Decryption)
    }
}

/// 새 키쌍 생성: (checksum 주소, hex 개인키)
pub fn generate_keypair() -> (String, String) {
    let wallet = LocalWallet::new(&mut rand::thread_rng());
    let address = to_checksum(&wallet.address(), None);
    let private_key = hex::encode(wallet.signer().to_bytes());
    (address, private_key)
}

/// 사용자 지갑 생성 (이미 있으면 기존 지갑 반환)
pub async fn create_wallet_for_user(
    store: &dyn MarketplaceStore,
    vault: &KeyVault,
    user_id: &str,
    user_type: &str,
) -> Result<Wallet> {
    if let Some(existing) = store.get_wallet_for_user(user_id).await? {
        return Ok(existing);
    }

    let (address, private_key) = generate_keypair();
    let encrypted = vault.encrypt(&private_key)?;

    let wallet = store
        .insert_wallet(&NewWallet {
            user_id: user_id.to_string(),
            user_type: user_type.to_string(),
            wallet_address: address,
            encrypted_private_key: encrypted,
        })
        .await?;

    tracing::info!(user_id, user_type, address = %wallet.wallet_address, "wallet created");
    Ok(wallet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;
    use tokio_test::{assert_err, assert_ok};

    fn vault() -> KeyVault {
        KeyVault::from_hex(Some(&"ab".repeat(32))).unwrap()
    }

    #[test]
    fn test_encrypt_decrypt() {
        let vault = vault();
        let encrypted = assert_ok!(vault.encrypt("deadbeef"));
        assert_ne!(encrypted, "deadbeef");
        assert_eq!(assert_ok!(vault.decrypt(&encrypted)), "deadbeef");
    }

    #[test]
    fn test_wrong_key_fails() {
        let encrypted = vault().encrypt("deadbeef").unwrap();
        let other = KeyVault::from_hex(Some(&"cd".repeat(32))).unwrap();
        let err = assert_err!(other.decrypt(&encrypted));
        assert!(matches!(err, WalletError::Decryption));
    }

    #[test]
    fn test_invalid_keys() {
        assert!(matches!(KeyVault::from_hex(None), Err(WalletError::MissingKey)));
        assert!(matches!(KeyVault::from_hex(Some("abcd")), Err(WalletError::InvalidKey)));
        assert!(matches!(vault().decrypt("nocolon"), Err(WalletError::Malformed)));
    }

    #[test]
    fn test_generated_keypair() {
        let (address, private_key) = generate_keypair();
        assert!(address.starts_with("0x"));
        assert_eq!(address.len(), 42);
        assert_eq!(private_key.len(), 64);
        // 개인키에서 같은 주소가 복원돼야 함
        let restored: LocalWallet = private_key.parse().unwrap();
        assert_eq!(to_checksum(&restored.address(), None), address);
    }

    #[tokio::test]
    async fn test_create_wallet_is_idempotent() {
        let store = MemoryStore::new();
        let vault = vault();

        let first = create_wallet_for_user(&store, &vault, "user-1", "distributor")
            .await
            .unwrap();
        let second = create_wallet_for_user(&store, &vault, "user-1", "distributor")
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.wallet_address, second.wallet_address);
        assert_ok!(vault.decrypt(&first.encrypted_private_key));
    }
}
