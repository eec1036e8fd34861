//! Pod status → build status.
//!
//! Pure and infallible: every pod report maps to one of True / False /
//! Unknown plus best-effort diagnostics. Nothing is remembered between calls.

use podbuild_model::{
    BuildProvider, BuildStatus, ClusterSpec, Condition, ConditionStatus, Pod, PodPhase,
};

use crate::pod::is_implicit_step;

pub const PENDING_MESSAGE: &str = "Pending";
pub const GENERIC_FAILURE_MESSAGE: &str = "build failed for unspecified reasons.";

/// Derive the build status from one observation of the build's pod.
pub fn from_pod(pod: &Pod) -> BuildStatus {
    let mut status = BuildStatus {
        builder: BuildProvider::Cluster,
        cluster: Some(ClusterSpec {
            namespace: pod.metadata.namespace.clone(),
            pod_name: pod.metadata.name.clone(),
        }),
        start_time: pod.status.start_time,
        ..BuildStatus::default()
    };

    for unit in &pod.status.init_container_statuses {
        if is_implicit_step(&unit.name) {
            continue;
        }
        if unit.state.terminated.is_some() {
            status.steps_completed.push(unit.name.clone());
        }
        status.step_states.push(unit.state.clone());
    }

    let condition = match pod.status.phase {
        Some(PodPhase::Failed) => {
            Condition::succeeded(ConditionStatus::False).with_message(failure_message(pod))
        }
        Some(PodPhase::Pending) => Condition::succeeded(ConditionStatus::Unknown)
            .with_message(PENDING_MESSAGE)
            .with_reason(waiting_message(pod)),
        Some(PodPhase::Succeeded) => Condition::succeeded(ConditionStatus::True),
        _ => Condition::succeeded(ConditionStatus::Unknown),
    };
    status.set_condition(condition);

    status
}

/// Reason a pending pod has not started, most specific first.
pub fn waiting_message(pod: &Pod) -> String {
    for unit in &pod.status.init_container_statuses {
        if let Some(waiting) = &unit.state.waiting {
            if !waiting.message.is_empty() {
                return format!(
                    "build step {:?} is pending with reason {:?}",
                    unit.name, waiting.message
                );
            }
        }
    }

    if let Some(cond) = pod
        .status
        .conditions
        .iter()
        .find(|c| c.status != ConditionStatus::True)
    {
        return format!(
            "pod status {:?}:{:?}; message: {:?}",
            cond.condition_type,
            cond.status.as_str(),
            cond.message
        );
    }

    if !pod.status.message.is_empty() {
        return pod.status.message.clone();
    }

    PENDING_MESSAGE.to_string()
}

/// Describe why a failed pod failed, pointing at the first failing unit.
pub fn failure_message(pod: &Pod) -> String {
    for unit in &pod.status.init_container_statuses {
        if let Some(term) = &unit.state.terminated {
            if term.exit_code != 0 {
                return format!(
                    "build step {:?} exited with code {} (image: {:?}); \
                     for logs run: kubectl -n {} logs {} -c {}",
                    unit.name,
                    term.exit_code,
                    unit.image_id,
                    pod.metadata.namespace,
                    pod.metadata.name,
                    unit.name
                );
            }
        }
    }

    if !pod.status.message.is_empty() {
        return pod.status.message.clone();
    }

    GENERIC_FAILURE_MESSAGE.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pod::{CREDS_INIT_NAME, GIT_SOURCE_NAME};
    use podbuild_model::{ContainerStatus, ObjectMeta, PodCondition, PodStatus};

    fn pod(phase: Option<PodPhase>, units: Vec<ContainerStatus>) -> Pod {
        Pod {
            metadata: ObjectMeta::named("ns", "pod-for-b"),
            status: PodStatus {
                phase,
                init_container_statuses: units,
                ..PodStatus::default()
            },
            ..Pod::default()
        }
    }

    fn condition(status: &BuildStatus) -> &Condition {
        status.succeeded().expect("Succeeded condition set")
    }

    #[test]
    fn test_failed_names_first_non_zero_unit() {
        let pod = pod(
            Some(PodPhase::Failed),
            vec![
                ContainerStatus::terminated(CREDS_INIT_NAME, 0, "creds@sha"),
                ContainerStatus::terminated("build-step-compile", 0, "a@sha"),
                ContainerStatus::terminated("build-step-test", 2, "img@sha"),
                ContainerStatus::terminated("build-step-push", 3, "b@sha"),
            ],
        );
        let status = from_pod(&pod);
        let cond = condition(&status);

        assert_eq!(cond.status, ConditionStatus::False);
        assert!(cond.message.contains("\"build-step-test\""));
        assert!(cond.message.contains("code 2"));
        assert!(cond.message.contains("\"img@sha\""));
        assert!(cond
            .message
            .ends_with("kubectl -n ns logs pod-for-b -c build-step-test"));
    }

    #[test]
    fn test_failed_falls_back_to_pod_message() {
        let mut failed = pod(Some(PodPhase::Failed), vec![]);
        failed.status.message = "node lost".to_string();
        assert_eq!(condition(&from_pod(&failed)).message, "node lost");

        let bare = pod(Some(PodPhase::Failed), vec![]);
        assert_eq!(condition(&from_pod(&bare)).message, GENERIC_FAILURE_MESSAGE);
    }

    #[test]
    fn test_failed_auxiliary_unit_still_reported() {
        let pod = pod(
            Some(PodPhase::Failed),
            vec![ContainerStatus::terminated(GIT_SOURCE_NAME, 128, "git@sha")],
        );
        let status = from_pod(&pod);
        assert!(condition(&status).message.contains(GIT_SOURCE_NAME));
        assert!(status.steps_completed.is_empty());
        assert!(status.step_states.is_empty());
    }

    #[test]
    fn test_succeeded_lists_user_steps_only() {
        let pod = pod(
            Some(PodPhase::Succeeded),
            vec![
                ContainerStatus::terminated(CREDS_INIT_NAME, 0, ""),
                ContainerStatus::terminated(GIT_SOURCE_NAME, 0, ""),
                ContainerStatus::terminated("build-step-compile", 0, ""),
                ContainerStatus::terminated("build-step-unnamed-1", 0, ""),
            ],
        );
        let status = from_pod(&pod);
        let cond = condition(&status);

        assert_eq!(cond.status, ConditionStatus::True);
        assert!(cond.message.is_empty());
        assert_eq!(
            status.steps_completed,
            vec!["build-step-compile", "build-step-unnamed-1"]
        );
        assert_eq!(status.step_states.len(), 2);
    }

    #[test]
    fn test_waiting_units_are_states_but_not_completed() {
        let pod = pod(
            Some(PodPhase::Running),
            vec![
                ContainerStatus::terminated("build-step-a", 0, ""),
                ContainerStatus::waiting("build-step-b", "PodInitializing", ""),
            ],
        );
        let status = from_pod(&pod);
        assert_eq!(status.steps_completed, vec!["build-step-a"]);
        assert_eq!(status.step_states.len(), 2);
        assert!(status.step_states[1].waiting.is_some());
        assert_eq!(status.outcome(), ConditionStatus::Unknown);
        assert!(condition(&status).message.is_empty());
    }

    #[test]
    fn test_missing_phase_is_unknown() {
        let status = from_pod(&pod(None, vec![]));
        assert_eq!(status.outcome(), ConditionStatus::Unknown);
        assert!(condition(&status).message.is_empty());
        assert!(condition(&status).reason.is_empty());
    }

    #[test]
    fn test_unrecognised_reported_phase_is_unknown() {
        let mut observed: Pod = serde_json::from_value(serde_json::json!({
            "metadata": { "name": "pod-for-b", "namespace": "ns" },
            "status": { "phase": "Evicted" }
        }))
        .unwrap();
        observed.status.init_container_statuses =
            vec![ContainerStatus::terminated("build-step-a", 0, "img")];

        let status = from_pod(&observed);
        assert_eq!(status.outcome(), ConditionStatus::Unknown);
        assert!(condition(&status).message.is_empty());
        assert_eq!(status.steps_completed, vec!["build-step-a"]);
    }

    #[test]
    fn test_pending_reason_prefers_waiting_unit_message() {
        let mut pending = pod(
            Some(PodPhase::Pending),
            vec![
                ContainerStatus::waiting("build-step-a", "ImagePullBackOff", ""),
                ContainerStatus::waiting("build-step-b", "ErrImagePull", "image not found"),
            ],
        );
        pending.status.conditions = vec![PodCondition {
            condition_type: "PodScheduled".to_string(),
            status: ConditionStatus::False,
            reason: String::new(),
            message: "unschedulable".to_string(),
        }];
        pending.status.message = "pod message".to_string();

        let status = from_pod(&pending);
        let cond = condition(&status);
        assert_eq!(cond.status, ConditionStatus::Unknown);
        assert_eq!(cond.message, PENDING_MESSAGE);
        assert_eq!(
            cond.reason,
            r#"build step "build-step-b" is pending with reason "image not found""#
        );
    }

    #[test]
    fn test_pending_reason_then_first_non_true_condition() {
        let mut pending = pod(Some(PodPhase::Pending), vec![]);
        pending.status.conditions = vec![
            PodCondition {
                condition_type: "Initialized".to_string(),
                status: ConditionStatus::True,
                reason: String::new(),
                message: String::new(),
            },
            PodCondition {
                condition_type: "PodScheduled".to_string(),
                status: ConditionStatus::False,
                reason: String::new(),
                message: "0/3 nodes available".to_string(),
            },
        ];
        pending.status.message = "pod message".to_string();

        assert_eq!(
            condition(&from_pod(&pending)).reason,
            r#"pod status "PodScheduled":"False"; message: "0/3 nodes available""#
        );
    }

    #[test]
    fn test_pending_reason_then_pod_message_then_generic() {
        let mut pending = pod(Some(PodPhase::Pending), vec![]);
        pending.status.message = "waiting for quota".to_string();
        assert_eq!(condition(&from_pod(&pending)).reason, "waiting for quota");

        let bare = pod(Some(PodPhase::Pending), vec![]);
        assert_eq!(condition(&from_pod(&bare)).reason, PENDING_MESSAGE);
    }

    #[test]
    fn test_recomputation_is_identical() {
        let pod = pod(
            Some(PodPhase::Failed),
            vec![ContainerStatus::terminated("build-step-a", 1, "x@sha")],
        );
        assert_eq!(from_pod(&pod), from_pod(&pod));
    }

    #[test]
    fn test_cluster_and_start_time_copied() {
        let mut observed = pod(Some(PodPhase::Running), vec![]);
        let started = chrono::Utc::now();
        observed.status.start_time = Some(started);

        let status = from_pod(&observed);
        assert_eq!(status.start_time, Some(started));
        let cluster = status.cluster.unwrap();
        assert_eq!(cluster.namespace, "ns");
        assert_eq!(cluster.pod_name, "pod-for-b");
    }
}
