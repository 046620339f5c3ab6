//! Encrypted provider credential store.
//!
//! The mapping lives in memory for the lifetime of the process. Every
//! mutation is applied to a copy, sealed, written to `<file>.tmp` and renamed
//! over the store file before the copy is published, so readers only ever
//! see committed state and a failed write changes nothing.

use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, RwLock};

use super::codec::{open_mapping, seal_mapping};
use super::crypto::SecretsCrypto;
use super::types::{is_valid_provider, Credential, CredentialMapping, StoreError, StoreInitError};

/// Read-only access to provider secrets for code that calls providers.
#[async_trait]
pub trait SecretSource: Send + Sync {
    async fn secret(&self, provider: &str) -> Option<String>;
}

pub struct KeyStore {
    path: PathBuf,
    crypto: SecretsCrypto,
    credentials: RwLock<CredentialMapping>,
    /// Serializes writers. Tokio's mutex is FIFO, so concurrent writes queue.
    persist_lock: Mutex<()>,
}

impl KeyStore {
    /// Load the store from `path`, or start empty if the file does not exist.
    pub async fn load(
        path: impl Into<PathBuf>,
        crypto: SecretsCrypto,
    ) -> Result<Self, StoreInitError> {
        let path = path.into();

        let tmp_path = tmp_path_for(&path);
        match fs::remove_file(&tmp_path).await {
            Ok(()) => tracing::warn!(
                "Discarded incomplete key store write at {}",
                tmp_path.display()
            ),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                "Could not remove stale key store temp file {}: {}",
                tmp_path.display(),
                e
            ),
        }

        let credentials = match fs::read(&path).await {
            Ok(bytes) => open_mapping(&crypto, &bytes).map_err(|source| StoreInitError {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(
                    "No key store found at {}, starting empty",
                    path.display()
                );
                CredentialMapping::new()
            }
            Err(e) => {
                return Err(StoreInitError {
                    path,
                    source: StoreError::Io(e),
                })
            }
        };

        tracing::info!(
            "Loaded {} provider credential(s) from {}",
            credentials.len(),
            path.display()
        );

        Ok(Self {
            path,
            crypto,
            credentials: RwLock::new(credentials),
            persist_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up a credential. Memory only.
    pub async fn get(&self, provider: &str) -> Option<Credential> {
        self.credentials.read().await.get(provider).cloned()
    }

    /// Decrypted secret for internal consumers.
    pub async fn get_secret(&self, provider: &str) -> Option<String> {
        self.credentials
            .read()
            .await
            .get(provider)
            .map(|c| c.secret.clone())
    }

    /// Provider names in sorted order.
    pub async fn list(&self) -> Vec<String> {
        self.credentials.read().await.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.credentials.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.credentials.read().await.is_empty()
    }

    /// Create or overwrite a credential and persist before returning.
    pub async fn set(&self, provider: &str, secret: &str) -> Result<Credential, StoreError> {
        if !is_valid_provider(provider) {
            return Err(StoreError::InvalidProvider);
        }

        let _guard = self.persist_lock.lock().await;

        let credential = Credential {
            provider: provider.to_string(),
            secret: secret.to_string(),
            updated_at: Utc::now(),
        };
        let mut next = self.credentials.read().await.clone();
        let replaced = next
            .insert(provider.to_string(), credential.clone())
            .is_some();

        self.persist(&next).await?;
        *self.credentials.write().await = next;

        if replaced {
            tracing::info!("Updated credential for provider {}", provider);
        } else {
            tracing::info!("Stored new credential for provider {}", provider);
        }
        Ok(credential)
    }

    /// Remove a credential. Returns `false` without touching disk if it was absent.
    pub async fn delete(&self, provider: &str) -> Result<bool, StoreError> {
        let _guard = self.persist_lock.lock().await;

        let mut next = self.credentials.read().await.clone();
        if next.remove(provider).is_none() {
            tracing::debug!("Delete for unknown provider {}", provider);
            return Ok(false);
        }

        self.persist(&next).await?;
        *self.credentials.write().await = next;

        tracing::info!("Deleted credential for provider {}", provider);
        Ok(true)
    }

    /// Seal `mapping` and atomically replace the store file. Caller holds `persist_lock`.
    async fn persist(&self, mapping: &CredentialMapping) -> Result<(), StoreError> {
        let data = seal_mapping(&self.crypto, mapping)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let tmp_path = tmp_path_for(&self.path);
        if let Err(e) = write_synced(&tmp_path, &data).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&tmp_path, &self.path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }

        tracing::debug!("Saved key store to {}", self.path.display());
        Ok(())
    }
}

#[async_trait]
impl SecretSource for KeyStore {
    async fn secret(&self, provider: &str) -> Option<String> {
        self.get_secret(provider).await
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

async fn write_synced(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path).await?;
    file.write_all(data).await?;
    file.sync_all().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::crypto::{generate_key, CryptoError, SecretboxKey};
    use std::sync::Arc;

    async fn open_store(path: &Path, key: &SecretboxKey) -> KeyStore {
        KeyStore::load(path, SecretsCrypto::new(key)).await.unwrap()
    }

    #[tokio::test]
    async fn test_missing_file_starts_empty() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("keys.enc");

        let store = open_store(&path, &generate_key()).await;

        assert!(store.is_empty().await);
        assert!(store.list().await.is_empty());
        assert!(store.get("gnews").await.is_none());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_set_persists_across_reload() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("nested").join("keys.enc");
        let key = generate_key();

        let store = open_store(&path, &key).await;
        let stored = store.set("gnews", "abc").await.unwrap();
        store.set("places", "xyz").await.unwrap();
        assert_eq!(stored.provider, "gnews");
        assert!(path.exists());
        drop(store);

        let reloaded = open_store(&path, &key).await;
        assert_eq!(reloaded.list().await, vec!["gnews", "places"]);
        assert_eq!(reloaded.get_secret("gnews").await.as_deref(), Some("abc"));
        assert_eq!(reloaded.get("gnews").await, Some(stored));
    }

    #[tokio::test]
    async fn test_set_overwrites_and_bumps_timestamp() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = open_store(&temp.path().join("keys.enc"), &generate_key()).await;

        let first = store.set("gnews", "old").await.unwrap();
        let second = store.set("gnews", "new").await.unwrap();

        assert!(second.updated_at >= first.updated_at);
        assert_eq!(store.len().await, 1);
        assert_eq!(store.get_secret("gnews").await.as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_provider_names_are_case_sensitive() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = open_store(&temp.path().join("keys.enc"), &generate_key()).await;

        store.set("gnews", "lower").await.unwrap();
        store.set("GNews", "mixed").await.unwrap();

        assert_eq!(store.len().await, 2);
        assert_eq!(store.get_secret("GNews").await.as_deref(), Some("mixed"));
    }

    #[tokio::test]
    async fn test_set_rejects_empty_provider() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("keys.enc");
        let store = open_store(&path, &generate_key()).await;

        assert!(matches!(
            store.set("", "abc").await,
            Err(StoreError::InvalidProvider)
        ));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_delete_reports_whether_removed() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("keys.enc");
        let key = generate_key();
        let store = open_store(&path, &key).await;

        store.set("gnews", "abc").await.unwrap();
        assert!(store.delete("gnews").await.unwrap());
        assert!(!store.delete("gnews").await.unwrap());
        drop(store);

        let reloaded = open_store(&path, &key).await;
        assert!(reloaded.is_empty().await);
    }

    #[tokio::test]
    async fn test_delete_unknown_leaves_file_untouched() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("keys.enc");
        let store = open_store(&path, &generate_key()).await;

        store.set("gnews", "abc").await.unwrap();
        let before = std::fs::read(&path).unwrap();

        assert!(!store.delete("unknown").await.unwrap());

        // Re-sealing would pick a new nonce, so identical bytes mean no write happened
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_fatal() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("keys.enc");
        std::fs::write(&path, b"definitely not an envelope").unwrap();

        let err = KeyStore::load(&path, SecretsCrypto::new(&generate_key()))
            .await
            .err()
            .expect("load must fail");
        assert!(matches!(err.source, StoreError::Codec(_)));
        assert_eq!(err.path, path);
    }

    #[tokio::test]
    async fn test_wrong_key_is_fatal() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("keys.enc");

        let store = open_store(&path, &generate_key()).await;
        store.set("gnews", "sk-live-unique-secret").await.unwrap();
        drop(store);

        let err = KeyStore::load(&path, SecretsCrypto::new(&generate_key()))
            .await
            .err()
            .expect("load must fail");
        assert!(matches!(
            err.source,
            StoreError::Crypto(CryptoError::Decryption)
        ));
        assert!(!err.to_string().contains("sk-live-unique-secret"));
    }

    #[tokio::test]
    async fn test_interrupted_write_recovers_previous_mapping() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("keys.enc");
        let key = generate_key();

        let store = open_store(&path, &key).await;
        store.set("gnews", "abc").await.unwrap();
        drop(store);

        // Crash between writing the temp file and renaming it
        let tmp = tmp_path_for(&path);
        std::fs::write(&tmp, b"{\"version\":1,\"nonce\":\"trunc").unwrap();

        let reloaded = open_store(&path, &key).await;
        assert_eq!(reloaded.list().await, vec!["gnews"]);
        assert_eq!(reloaded.get_secret("gnews").await.as_deref(), Some("abc"));
        assert!(!tmp.exists());
    }

    #[tokio::test]
    async fn test_failed_write_keeps_previous_state() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("keys.enc");
        let store = open_store(&path, &generate_key()).await;

        // A directory at the store path makes the rename fail
        std::fs::create_dir(&path).unwrap();

        assert!(matches!(
            store.set("gnews", "abc").await,
            Err(StoreError::Io(_))
        ));
        assert!(store.get("gnews").await.is_none());
        assert!(!tmp_path_for(&path).exists());
    }

    #[tokio::test]
    async fn test_concurrent_sets_lose_nothing() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("keys.enc");
        let key = generate_key();
        let store = Arc::new(open_store(&path, &key).await);

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .set(&format!("provider-{i:02}"), &format!("secret-{i}"))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        drop(store);

        let reloaded = open_store(&path, &key).await;
        assert_eq!(reloaded.len().await, 16);
        assert_eq!(
            reloaded.get_secret("provider-07").await.as_deref(),
            Some("secret-7")
        );
    }

    #[tokio::test]
    async fn test_secret_source_reads_through() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = open_store(&temp.path().join("keys.enc"), &generate_key()).await;
        store.set("places", "pk-123").await.unwrap();

        let source: &dyn SecretSource = &store;
        assert_eq!(source.secret("places").await.as_deref(), Some("pk-123"));
        assert_eq!(source.secret("missing").await, None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_store_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("keys.enc");
        let store = open_store(&path, &generate_key()).await;
        store.set("gnews", "abc").await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
