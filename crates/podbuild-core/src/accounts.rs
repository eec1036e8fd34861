//! Lookup of service accounts and their secrets.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use podbuild_model::{Secret, ServiceAccount};
use serde::Deserialize;

use crate::error::LookupError;

/// Live read access to the orchestrator's service accounts and secrets.
#[async_trait]
pub trait AccountLookup: Send + Sync {
    async fn service_account(&self, namespace: &str, name: &str)
        -> Result<ServiceAccount, LookupError>;

    async fn secret(&self, namespace: &str, name: &str) -> Result<Secret, LookupError>;
}

/// In-memory lookup keyed by `(namespace, name)`.
///
/// Backs the CLI's `--accounts` file and the tests.
#[derive(Debug, Default)]
pub struct StaticAccounts {
    accounts: RwLock<HashMap<(String, String), ServiceAccount>>,
    secrets: RwLock<HashMap<(String, String), Secret>>,
}

/// On-disk shape accepted by [`StaticAccounts::from_json`].
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct AccountsDocument {
    service_accounts: Vec<ServiceAccount>,
    secrets: Vec<Secret>,
}

impl StaticAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `{"serviceAccounts": [...], "secrets": [...]}`.
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        let doc: AccountsDocument = serde_json::from_str(raw)?;
        let store = Self::new();
        for account in doc.service_accounts {
            store.insert_account(account);
        }
        for secret in doc.secrets {
            store.insert_secret(secret);
        }
        Ok(store)
    }

    pub fn insert_account(&self, account: ServiceAccount) {
        let key = (
            account.metadata.namespace.clone(),
            account.metadata.name.clone(),
        );
        self.accounts.write().unwrap().insert(key, account);
    }

    pub fn insert_secret(&self, secret: Secret) {
        let key = (
            secret.metadata.namespace.clone(),
            secret.metadata.name.clone(),
        );
        self.secrets.write().unwrap().insert(key, secret);
    }

    /// Register an account without secrets unless one already exists.
    pub fn ensure_account(&self, namespace: &str, name: &str) {
        let key = (namespace.to_string(), name.to_string());
        self.accounts
            .write()
            .unwrap()
            .entry(key)
            .or_insert_with(|| ServiceAccount {
                metadata: podbuild_model::ObjectMeta::named(namespace, name),
                secrets: Vec::new(),
            });
    }
}

#[async_trait]
impl AccountLookup for StaticAccounts {
    async fn service_account(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<ServiceAccount, LookupError> {
        let accounts = self.accounts.read().unwrap();
        accounts
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| LookupError::ServiceAccountNotFound {
                namespace: namespace.to_string(),
                name: name.to_string(),
            })
    }

    async fn secret(&self, namespace: &str, name: &str) -> Result<Secret, LookupError> {
        let secrets = self.secrets.read().unwrap();
        secrets
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| LookupError::SecretNotFound {
                namespace: namespace.to_string(),
                name: name.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_account_is_lookup_error() {
        let store = StaticAccounts::new();
        let err = store.service_account("ns", "default").await.unwrap_err();
        assert!(matches!(err, LookupError::ServiceAccountNotFound { .. }));
    }

    #[tokio::test]
    async fn test_from_json_registers_everything() {
        let store = StaticAccounts::from_json(
            r#"{
                "serviceAccounts": [{ "metadata": { "name": "builder", "namespace": "ns" },
                                      "secrets": [{ "name": "git-creds" }] }],
                "secrets": [{ "metadata": { "name": "git-creds", "namespace": "ns" },
                              "type": "kubernetes.io/basic-auth" }]
            }"#,
        )
        .unwrap();

        let account = store.service_account("ns", "builder").await.unwrap();
        assert_eq!(account.secrets[0].name, "git-creds");
        assert!(store.secret("ns", "git-creds").await.is_ok());
        assert!(store.secret("other", "git-creds").await.is_err());
    }

    #[tokio::test]
    async fn test_ensure_account_keeps_existing_secrets() {
        let store = StaticAccounts::from_json(
            r#"{ "serviceAccounts": [{ "metadata": { "name": "default", "namespace": "ns" },
                                       "secrets": [{ "name": "s" }] }] }"#,
        )
        .unwrap();
        store.ensure_account("ns", "default");
        store.ensure_account("ns", "fresh");

        assert_eq!(store.service_account("ns", "default").await.unwrap().secrets.len(), 1);
        assert!(store.service_account("ns", "fresh").await.unwrap().secrets.is_empty());
    }
}
