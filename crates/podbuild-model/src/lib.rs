//! podbuild data model
//!
//! Serializable shapes exchanged with the orchestrator and with callers:
//! - `Build` / `BuildSpec`: the declarative input (source, ordered steps, volumes)
//! - `Container`: a single step, before and after synthesis
//! - `Pod` / `PodStatus`: the grouped process handed to the orchestrator and its report
//! - `BuildStatus`: the derived build outcome
//!
//! Field names follow the orchestrator's camelCase JSON so documents can be
//! exchanged without an adapter layer.

pub mod build;
pub mod container;
pub mod meta;
pub mod pod;
pub mod secret;
pub mod status;

pub use build::{Build, BuildSpec, GcsSourceSpec, GcsSourceType, GitSourceSpec, SourceSpec};
pub use container::{
    ConfigMapVolumeSource, Container, EmptyDirVolumeSource, EnvVar, HostPathVolumeSource,
    SecretVolumeSource, Volume, VolumeMount, VolumeSource,
};
pub use meta::{ObjectMeta, ObjectReference, OwnerReference};
pub use pod::{
    ConditionStatus, ContainerState, ContainerStateRunning, ContainerStateTerminated,
    ContainerStateWaiting, ContainerStatus, Pod, PodCondition, PodPhase, PodSpec, PodStatus,
    RestartPolicy,
};
pub use secret::{Secret, SecretType, ServiceAccount};
pub use status::{BuildProvider, BuildStatus, ClusterSpec, Condition, ConditionType};

/// podbuild model version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
