//! Build outcome derived from a pod observation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pod::{ConditionStatus, ContainerState};

/// Status of a build as derived from one observation of its pod.
///
/// Nothing here is carried across observations: recomputing from the same
/// pod report yields an equal value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildStatus {
    #[serde(default)]
    pub builder: BuildProvider,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster: Option<ClusterSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,

    /// Names of user-visible steps that reached a terminated state.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps_completed: Vec<String>,

    /// Raw reported state of every user-visible step, in reported order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub step_states: Vec<ContainerState>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

impl BuildStatus {
    /// Insert `condition`, replacing any existing condition of the same type.
    pub fn set_condition(&mut self, condition: Condition) {
        self.conditions
            .retain(|c| c.condition_type != condition.condition_type);
        self.conditions.push(condition);
    }

    pub fn condition(&self, condition_type: ConditionType) -> Option<&Condition> {
        self.conditions
            .iter()
            .find(|c| c.condition_type == condition_type)
    }

    /// The `Succeeded` condition, if one has been set.
    pub fn succeeded(&self) -> Option<&Condition> {
        self.condition(ConditionType::Succeeded)
    }

    /// Tri-state outcome; `Unknown` when no condition is set.
    pub fn outcome(&self) -> ConditionStatus {
        self.succeeded().map(|c| c.status).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildProvider {
    #[default]
    Cluster,
    Google,
}

/// Where the build's pod lives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    pub namespace: String,
    pub pod_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionType {
    Succeeded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(rename = "type")]
    pub condition_type: ConditionType,
    pub status: ConditionStatus,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

impl Condition {
    pub fn succeeded(status: ConditionStatus) -> Self {
        Self {
            condition_type: ConditionType::Succeeded,
            status,
            reason: String::new(),
            message: String::new(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }
}
