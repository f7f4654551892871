//! Shared types used across Hive CRDs

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Reference to an object in the same namespace, by name
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct LocalObjectReference {
    /// Name of the referenced object
    pub name: String,
}

impl LocalObjectReference {
    /// Create a reference to the named object
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Condition status following Kubernetes conventions
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum ConditionStatus {
    /// Condition is true
    True,
    /// Condition is false
    False,
    /// Condition status is unknown
    #[default]
    Unknown,
}

impl std::fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::True => write!(f, "True"),
            Self::False => write!(f, "False"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Kubernetes-style condition with probe and transition timestamps
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition (e.g., Unreachable)
    #[serde(rename = "type")]
    pub type_: String,

    /// Status of the condition (True, False, Unknown)
    pub status: ConditionStatus,

    /// Machine-readable reason for the condition
    #[serde(default)]
    pub reason: String,

    /// Human-readable message
    #[serde(default)]
    pub message: String,

    /// Last time the condition was evaluated
    pub last_probe_time: DateTime<Utc>,

    /// Last time the status changed
    pub last_transition_time: DateTime<Utc>,
}

impl Condition {
    /// Create a new condition whose probe and transition times are `now`
    pub fn new(
        type_: impl Into<String>,
        status: ConditionStatus,
        reason: impl Into<String>,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            type_: type_.into(),
            status,
            reason: reason.into(),
            message: message.into(),
            last_probe_time: now,
            last_transition_time: now,
        }
    }
}

/// When an existing condition with an unchanged status should be rewritten
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateConditionCheck {
    /// Always rewrite, bumping the probe time
    Always,
    /// Rewrite only when the reason or message differs
    IfReasonOrMessageChange,
    /// Never rewrite unless the status changes
    Never,
}

/// Find the condition of the given type
pub fn find_condition<'a>(conditions: &'a [Condition], type_: &str) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.type_ == type_)
}

/// Upsert a condition by type.
///
/// A missing condition is only created when `status` is `True`; absence means
/// the condition does not hold. An existing condition is rewritten when its
/// status changes or when `check` asks for it. `last_transition_time` moves
/// only on a status change. Returns whether anything was modified.
pub fn set_condition(
    conditions: &mut Vec<Condition>,
    type_: &str,
    status: ConditionStatus,
    reason: &str,
    message: &str,
    check: UpdateConditionCheck,
    now: DateTime<Utc>,
) -> bool {
    match conditions.iter_mut().find(|c| c.type_ == type_) {
        None => {
            if status != ConditionStatus::True {
                return false;
            }
            conditions.push(Condition::new(type_, status, reason, message, now));
            true
        }
        Some(existing) => {
            let status_changed = existing.status != status;
            let rewrite = status_changed
                || match check {
                    UpdateConditionCheck::Always => true,
                    UpdateConditionCheck::IfReasonOrMessageChange => {
                        existing.reason != reason || existing.message != message
                    }
                    UpdateConditionCheck::Never => false,
                };
            if !rewrite {
                return false;
            }
            if status_changed {
                existing.last_transition_time = now;
            }
            existing.status = status;
            existing.reason = reason.to_string();
            existing.message = message.to_string();
            existing.last_probe_time = now;
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rstest::rstest;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().expect("valid timestamp")
    }

    fn unreachable(conditions: &mut Vec<Condition>, status: ConditionStatus, now: DateTime<Utc>) {
        set_condition(
            conditions,
            "Unreachable",
            status,
            "ErrorConnectingToCluster",
            "dial tcp: connection refused",
            UpdateConditionCheck::Always,
            now,
        );
    }

    #[test]
    fn same_value_twice_only_advances_probe_time() {
        let mut conditions = Vec::new();
        unreachable(&mut conditions, ConditionStatus::True, t0());
        unreachable(
            &mut conditions,
            ConditionStatus::True,
            t0() + Duration::minutes(10),
        );

        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].last_transition_time, t0());
        assert_eq!(
            conditions[0].last_probe_time,
            t0() + Duration::minutes(10)
        );
    }

    #[test]
    fn status_change_advances_both_timestamps() {
        let mut conditions = Vec::new();
        unreachable(&mut conditions, ConditionStatus::True, t0());
        let later = t0() + Duration::hours(1);
        unreachable(&mut conditions, ConditionStatus::False, later);

        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].status, ConditionStatus::False);
        assert_eq!(conditions[0].last_transition_time, later);
        assert_eq!(conditions[0].last_probe_time, later);
    }

    #[test]
    fn false_condition_is_not_created_from_nothing() {
        let mut conditions = Vec::new();
        let changed = set_condition(
            &mut conditions,
            "Unreachable",
            ConditionStatus::False,
            "ClusterReachable",
            "",
            UpdateConditionCheck::Always,
            t0(),
        );
        assert!(!changed);
        assert!(conditions.is_empty());
    }

    #[rstest]
    #[case::always(UpdateConditionCheck::Always, "same", true)]
    #[case::always_new_message(UpdateConditionCheck::Always, "other", true)]
    #[case::reason_or_message_same(UpdateConditionCheck::IfReasonOrMessageChange, "same", false)]
    #[case::reason_or_message_new(UpdateConditionCheck::IfReasonOrMessageChange, "other", true)]
    #[case::never_same(UpdateConditionCheck::Never, "same", false)]
    #[case::never_new_message(UpdateConditionCheck::Never, "other", false)]
    fn update_check_controls_rewrites(
        #[case] check: UpdateConditionCheck,
        #[case] message: &str,
        #[case] expect_change: bool,
    ) {
        let mut conditions = vec![Condition::new(
            "Unreachable",
            ConditionStatus::True,
            "R",
            "same",
            t0(),
        )];
        let changed = set_condition(
            &mut conditions,
            "Unreachable",
            ConditionStatus::True,
            "R",
            message,
            check,
            t0() + Duration::minutes(1),
        );
        assert_eq!(changed, expect_change);
        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].last_transition_time, t0());
    }

    #[test]
    fn upsert_never_duplicates_a_type() {
        let mut conditions = vec![
            Condition::new("A", ConditionStatus::True, "", "", t0()),
            Condition::new("Unreachable", ConditionStatus::False, "", "", t0()),
        ];
        for i in 0..3 {
            unreachable(
                &mut conditions,
                ConditionStatus::True,
                t0() + Duration::minutes(i),
            );
        }
        assert_eq!(conditions.len(), 2);
        assert_eq!(conditions[0].type_, "A");
        assert_eq!(
            find_condition(&conditions, "Unreachable").map(|c| c.status),
            Some(ConditionStatus::True)
        );
    }

    #[test]
    fn condition_serializes_with_kubernetes_field_names() {
        let c = Condition::new("Unreachable", ConditionStatus::True, "R", "M", t0());
        let json = serde_json::to_value(&c).expect("serialize");
        assert_eq!(json["type"], "Unreachable");
        assert_eq!(json["status"], "True");
        assert!(json.get("lastProbeTime").is_some());
        assert!(json.get("lastTransitionTime").is_some());
    }
}
