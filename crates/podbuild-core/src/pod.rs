//! Build → pod conversion.
//!
//! Every unit of the build becomes an init container of one pod. The
//! orchestrator runs init containers strictly one at a time in declaration
//! order and stops at the first non-zero exit, which is the only sequencing
//! primitive relied on here. Units share the `workspace` and `home` volumes.

use std::collections::{BTreeMap, HashSet};

use podbuild_model::{
    Build, BuildSpec, Container, EnvVar, GcsSourceSpec, GitSourceSpec, ObjectMeta, OwnerReference,
    Pod, PodSpec, RestartPolicy, Volume, VolumeMount,
};
use tracing::debug;

use crate::accounts::AccountLookup;
use crate::config::BuildConfig;
use crate::creds::{make_credential_initializer, SECRET_VOLUME_PREFIX};
use crate::error::{BuildError, ValidationError, ValidationReason};

pub const WORKSPACE_DIR: &str = "/workspace";
pub const HOME_DIR: &str = "/builder/home";

/// Prefix of every unit synthesized from a build.
/// Log collection keys on it; changing it breaks step log routing.
pub const STEP_PREFIX: &str = "build-step-";
pub const UNNAMED_STEP_PREFIX: &str = "build-step-unnamed-";

pub const CREDS_INIT_NAME: &str = "build-step-credential-initializer";
pub const GIT_SOURCE_NAME: &str = "build-step-git-source";
pub const GCS_SOURCE_NAME: &str = "build-step-gcs-source";
/// Name given to a custom source container before the step prefix is applied.
pub const CUSTOM_SOURCE: &str = "custom-source";
pub const CUSTOM_SOURCE_NAME: &str = "build-step-custom-source";

/// Units whose status is hidden from the build's step list.
pub const IMPLICIT_STEP_NAMES: [&str; 4] = [
    CREDS_INIT_NAME,
    GCS_SOURCE_NAME,
    GIT_SOURCE_NAME,
    CUSTOM_SOURCE_NAME,
];

pub const BUILD_NAME_LABEL: &str = "build.knative.dev/buildName";
pub const BUILD_API_VERSION: &str = "build.knative.dev/v1alpha1";
pub const BUILD_KIND: &str = "Build";
pub const NOP_CONTAINER_NAME: &str = "nop";

const WORKSPACE_VOLUME: &str = "workspace";
const HOME_VOLUME: &str = "home";

/// Environment injected ahead of every step's own variables.
pub fn implicit_env_vars() -> Vec<EnvVar> {
    vec![EnvVar::new("HOME", HOME_DIR)]
}

pub fn implicit_volume_mounts() -> Vec<VolumeMount> {
    vec![
        VolumeMount::new(WORKSPACE_VOLUME, WORKSPACE_DIR),
        VolumeMount::new(HOME_VOLUME, HOME_DIR),
    ]
}

pub fn implicit_volumes() -> Vec<Volume> {
    vec![
        Volume::empty_dir(WORKSPACE_VOLUME),
        Volume::empty_dir(HOME_VOLUME),
    ]
}

pub fn is_implicit_step(name: &str) -> bool {
    IMPLICIT_STEP_NAMES.contains(&name)
}

fn git_to_container(
    git: &GitSourceSpec,
    config: &BuildConfig,
) -> Result<Container, ValidationError> {
    if git.url.is_empty() {
        return Err(ValidationError::new(
            ValidationReason::MissingUrl,
            format!("git sources are expected to specify a Url, got: {:?}", git),
        ));
    }
    if git.revision.is_empty() {
        return Err(ValidationError::new(
            ValidationReason::MissingRevision,
            format!("git sources are expected to specify a Revision, got: {:?}", git),
        ));
    }
    Ok(Container {
        name: GIT_SOURCE_NAME.to_string(),
        image: config.git_image.clone(),
        args: vec![
            "-url".to_string(),
            git.url.clone(),
            "-revision".to_string(),
            git.revision.clone(),
        ],
        volume_mounts: implicit_volume_mounts(),
        working_dir: WORKSPACE_DIR.to_string(),
        env: implicit_env_vars(),
        ..Container::default()
    })
}

fn gcs_to_container(
    gcs: &GcsSourceSpec,
    config: &BuildConfig,
) -> Result<Container, ValidationError> {
    if gcs.location.is_empty() {
        return Err(ValidationError::new(
            ValidationReason::MissingLocation,
            format!("gcs sources are expected to specify a Location, got: {:?}", gcs),
        ));
    }
    Ok(Container {
        name: GCS_SOURCE_NAME.to_string(),
        image: config.gcs_fetcher_image.clone(),
        args: vec![
            "--type".to_string(),
            gcs.source_type.to_string(),
            "--location".to_string(),
            gcs.location.clone(),
        ],
        volume_mounts: implicit_volume_mounts(),
        working_dir: WORKSPACE_DIR.to_string(),
        env: implicit_env_vars(),
        ..Container::default()
    })
}

fn custom_to_container(source: &Container) -> Result<Container, ValidationError> {
    if !source.name.is_empty() {
        return Err(ValidationError::new(
            ValidationReason::OmitName,
            format!(
                "custom source containers are expected to omit Name, got: {}",
                source.name
            ),
        ));
    }
    Ok(source.clone().with_name(CUSTOM_SOURCE))
}

/// Augment a user step with the implicit env, mounts, working dir and name.
///
/// `index` is the step's position in the (possibly custom-source prefixed)
/// step list and only shows up in the name of unnamed steps.
fn synthesize_step(mut step: Container, index: usize, workspace_sub_path: &str) -> Container {
    // Prepended, not deduplicated against the step's own variables.
    let mut env = implicit_env_vars();
    env.append(&mut step.env);
    step.env = env;

    let requested: HashSet<String> = step
        .volume_mounts
        .iter()
        .map(|m| clean_path(&m.mount_path))
        .collect();
    for mut implicit in implicit_volume_mounts() {
        if requested.contains(&clean_path(&implicit.mount_path)) {
            continue;
        }
        if !workspace_sub_path.is_empty() && implicit.name == WORKSPACE_VOLUME {
            implicit.sub_path = workspace_sub_path.to_string();
        }
        step.volume_mounts.push(implicit);
    }

    if step.working_dir.is_empty() {
        step.working_dir = WORKSPACE_DIR.to_string();
    }

    step.name = if step.name.is_empty() {
        format!("{}{}", UNNAMED_STEP_PREFIX, index)
    } else {
        format!("{}{}", STEP_PREFIX, step.name)
    };
    step
}

/// Reject volume sets that declare the same name twice.
pub fn validate_volumes(volumes: &[Volume]) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for volume in volumes {
        if !seen.insert(volume.name.as_str()) {
            return Err(ValidationError::new(
                ValidationReason::DuplicateVolumeName,
                format!("multiple volumes named {:?}", volume.name),
            ));
        }
    }
    Ok(())
}

/// Convert a build into the pod that implements it.
///
/// Unit order is credential initializer, then the git or gcs fetcher (if
/// any), then the user steps in declared order. A custom source container is
/// treated as the first user step. A main container running the nop image
/// follows the init containers and only starts once all of them succeeded.
pub async fn from_build(
    build: &Build,
    accounts: &dyn AccountLookup,
    config: &BuildConfig,
) -> Result<Pod, BuildError> {
    let (creds, secret_volumes) = make_credential_initializer(build, accounts, config).await?;

    let mut init_containers = vec![creds];
    let mut steps: Vec<Container> = Vec::with_capacity(build.spec.steps.len() + 1);
    let mut workspace_sub_path = "";

    if let Some(source) = &build.spec.source {
        if let Some(git) = &source.git {
            init_containers.push(git_to_container(git, config)?);
        } else if let Some(gcs) = &source.gcs {
            init_containers.push(gcs_to_container(gcs, config)?);
        } else if let Some(custom) = &source.custom {
            steps.push(custom_to_container(custom)?);
        }
        workspace_sub_path = source.sub_path.as_str();
    }
    steps.extend(build.spec.steps.iter().cloned());

    for (index, step) in steps.into_iter().enumerate() {
        let unit = synthesize_step(step, index, workspace_sub_path);
        debug!(
            build = %build.metadata.name,
            unit = %unit.name,
            image = %unit.image,
            "Synthesized step"
        );
        init_containers.push(unit);
    }

    let mut volumes = build.spec.volumes.clone();
    volumes.extend(implicit_volumes());
    volumes.extend(secret_volumes);
    validate_volumes(&volumes)?;

    let name = &build.metadata.name;
    let metadata = ObjectMeta {
        name: format!("pod-for-{}", name),
        namespace: build.metadata.namespace.clone(),
        uid: String::new(),
        labels: BTreeMap::from([(BUILD_NAME_LABEL.to_string(), name.clone())]),
        annotations: BTreeMap::from([(
            "sidecar.istio.io/inject".to_string(),
            "false".to_string(),
        )]),
        owner_references: vec![OwnerReference {
            api_version: BUILD_API_VERSION.to_string(),
            kind: BUILD_KIND.to_string(),
            name: name.clone(),
            uid: build.metadata.uid.clone(),
            controller: true,
            block_owner_deletion: true,
        }],
    };

    debug!(
        build = %name,
        units = init_containers.len(),
        volumes = volumes.len(),
        "Built pod"
    );

    Ok(Pod {
        metadata,
        spec: PodSpec {
            // A failed build must not be retried by the orchestrator.
            restart_policy: RestartPolicy::Never,
            init_containers,
            containers: vec![
                Container::new(config.nop_image.clone()).with_name(NOP_CONTAINER_NAME),
            ],
            service_account_name: build.spec.service_account_name.clone(),
            volumes,
            node_selector: build.spec.node_selector.clone(),
            affinity: build.spec.affinity.clone(),
        },
        status: Default::default(),
    })
}

fn is_implicit_env_var(env: &EnvVar) -> bool {
    implicit_env_vars().iter().any(|i| i.name == env.name)
}

fn is_implicit_volume_mount(mount: &VolumeMount) -> bool {
    implicit_volume_mounts().iter().any(|i| i.name == mount.name)
}

fn is_implicit_volume(volume: &Volume) -> bool {
    implicit_volumes().iter().any(|i| i.name == volume.name)
        || volume.name.starts_with(SECRET_VOLUME_PREFIX)
}

/// Recover the user-visible part of a build from a pod made by [`from_build`].
///
/// Auxiliary units, implicit env vars, implicit mounts and implicit volumes
/// are dropped and step names lose their prefix (unnamed steps come back
/// unnamed). The source cannot be recovered and is left unset; a step that
/// relied on the default working directory keeps `/workspace`.
pub fn to_build_spec(pod: &Pod) -> BuildSpec {
    let steps = pod
        .spec
        .init_containers
        .iter()
        .filter(|c| !is_implicit_step(&c.name))
        .map(|c| {
            let mut step = c.clone();
            step.name = if step.name.starts_with(UNNAMED_STEP_PREFIX) {
                String::new()
            } else {
                step.name
                    .strip_prefix(STEP_PREFIX)
                    .unwrap_or(&step.name)
                    .to_string()
            };
            step.env.retain(|e| !is_implicit_env_var(e));
            step.volume_mounts.retain(|m| !is_implicit_volume_mount(m));
            step
        })
        .collect();

    BuildSpec {
        service_account_name: pod.spec.service_account_name.clone(),
        source: None,
        steps,
        volumes: pod
            .spec
            .volumes
            .iter()
            .filter(|v| !is_implicit_volume(v))
            .cloned()
            .collect(),
        node_selector: pod.spec.node_selector.clone(),
        affinity: pod.spec.affinity.clone(),
    }
}

/// Lexically normalize a slash-separated path: collapse separators, drop `.`
/// elements and resolve `..` against preceding elements.
pub fn clean_path(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if rooted => {}
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    if rooted {
        format!("/{}", joined)
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}
