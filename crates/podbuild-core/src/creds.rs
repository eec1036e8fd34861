//! Credential initializer: the first unit of every build pod.
//!
//! Secrets referenced by the build's service account are matched against the
//! known credential kinds by annotation. Every matched secret is mounted into
//! the initializer and turned into flags telling it what to install.

use std::collections::BTreeMap;

use podbuild_model::{Build, Container, Secret, SecretType, Volume, VolumeMount};
use tracing::debug;

use crate::accounts::AccountLookup;
use crate::config::BuildConfig;
use crate::error::LookupError;
use crate::pod::{implicit_env_vars, implicit_volume_mounts, CREDS_INIT_NAME, WORKSPACE_DIR};

pub const DOCKER_ANNOTATION_PREFIX: &str = "build.knative.dev/docker-";
pub const GIT_ANNOTATION_PREFIX: &str = "build.knative.dev/git-";

/// Directory under which secret volumes are mounted.
pub const SECRET_MOUNT_ROOT: &str = "/var/build-secrets";
/// Prefix of the pod volume created for each matched secret.
pub const SECRET_VOLUME_PREFIX: &str = "secret-volume-";

pub const DEFAULT_SERVICE_ACCOUNT: &str = "default";

/// A kind of credential the initializer knows how to install.
pub trait CredentialBuilder: Send + Sync {
    /// Initializer flags for `secret`; empty when the secret is not of this kind.
    fn matching_annotations(&self, secret: &Secret) -> Vec<String>;
}

/// Registry credentials from basic-auth secrets.
pub struct DockerCredentials;

impl CredentialBuilder for DockerCredentials {
    fn matching_annotations(&self, secret: &Secret) -> Vec<String> {
        match secret.secret_type {
            SecretType::BasicAuth => {
                sorted_annotations(&secret.metadata.annotations, DOCKER_ANNOTATION_PREFIX)
                    .into_iter()
                    .map(|url| format!("-basic-docker={}={}", secret.metadata.name, url))
                    .collect()
            }
            _ => Vec::new(),
        }
    }
}

/// Git credentials from basic-auth or ssh-auth secrets.
pub struct GitCredentials;

impl CredentialBuilder for GitCredentials {
    fn matching_annotations(&self, secret: &Secret) -> Vec<String> {
        let flag = match secret.secret_type {
            SecretType::BasicAuth => "-basic-git",
            SecretType::SshAuth => "-ssh-git",
            SecretType::Opaque => return Vec::new(),
        };
        sorted_annotations(&secret.metadata.annotations, GIT_ANNOTATION_PREFIX)
            .into_iter()
            .map(|url| format!("{}={}={}", flag, secret.metadata.name, url))
            .collect()
    }
}

/// Values of annotations starting with `prefix`, ordered by key.
fn sorted_annotations<'a>(annotations: &'a BTreeMap<String, String>, prefix: &str) -> Vec<&'a str> {
    annotations
        .iter()
        .filter(|(key, _)| key.starts_with(prefix))
        .map(|(_, value)| value.as_str())
        .collect()
}

/// Mount path of a secret inside the credential initializer.
pub fn secret_mount_path(secret_name: &str) -> String {
    format!("{}/{}", SECRET_MOUNT_ROOT, secret_name)
}

/// Build the credential-initializer unit and the secret volumes it mounts.
pub async fn make_credential_initializer(
    build: &Build,
    accounts: &dyn AccountLookup,
    config: &BuildConfig,
) -> Result<(Container, Vec<Volume>), LookupError> {
    let namespace = build.metadata.namespace.as_str();
    let account_name = match build.spec.service_account_name.as_str() {
        "" => DEFAULT_SERVICE_ACCOUNT,
        name => name,
    };

    let account = accounts.service_account(namespace, account_name).await?;
    let builders: [&dyn CredentialBuilder; 2] = [&DockerCredentials, &GitCredentials];

    let mut volumes = Vec::new();
    let mut volume_mounts = implicit_volume_mounts();
    let mut args = Vec::new();

    for entry in &account.secrets {
        let secret = accounts.secret(namespace, &entry.name).await?;

        let mut matched = false;
        for builder in builders {
            let flags = builder.matching_annotations(&secret);
            if !flags.is_empty() {
                matched = true;
                args.extend(flags);
            }
        }

        if matched {
            let volume_name = format!("{}{}", SECRET_VOLUME_PREFIX, secret.metadata.name);
            debug!(
                secret = %secret.metadata.name,
                volume = %volume_name,
                "Mounting credential secret"
            );
            volume_mounts.push(VolumeMount::new(
                volume_name.clone(),
                secret_mount_path(&secret.metadata.name),
            ));
            volumes.push(Volume::secret(volume_name, secret.metadata.name.clone()));
        }
    }

    let container = Container {
        name: CREDS_INIT_NAME.to_string(),
        image: config.creds_image.clone(),
        args,
        volume_mounts,
        env: implicit_env_vars(),
        working_dir: WORKSPACE_DIR.to_string(),
        ..Container::default()
    };

    Ok((container, volumes))
}
