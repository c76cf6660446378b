//! Supported Lua targets and per-target test groups.
//!
//! The set of targets is closed: every mapping keyed by [`LuaTarget`] is an
//! exhaustive `match`, so adding a variant fails to compile until each
//! mapping covers it.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use serde::{Deserialize, Serialize};
use tracing::{debug, info_span, warn};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub enum LuaTarget {
    #[serde(rename = "5.1")]
    Lua51,
    #[serde(rename = "5.2")]
    Lua52,
    #[default]
    #[serde(rename = "5.3")]
    Lua53,
    #[serde(rename = "jit")]
    LuaJit,
}

impl LuaTarget {
    /// Every target, in reporting order.
    pub const ALL: [LuaTarget; 4] = [
        LuaTarget::Lua51,
        LuaTarget::Lua52,
        LuaTarget::Lua53,
        LuaTarget::LuaJit,
    ];

    /// Short label used for fixture names and group titles.
    pub const fn label(self) -> &'static str {
        match self {
            LuaTarget::Lua51 => "5.1",
            LuaTarget::Lua52 => "5.2",
            LuaTarget::Lua53 => "5.3",
            LuaTarget::LuaJit => "jit",
        }
    }

    pub const fn display_name(self) -> &'static str {
        match self {
            LuaTarget::Lua51 => "Lua 5.1",
            LuaTarget::Lua52 => "Lua 5.2",
            LuaTarget::Lua53 => "Lua 5.3",
            LuaTarget::LuaJit => "LuaJIT",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|target| target.label() == label)
    }

    /// Title of the test group for this target, e.g. `Lua version 5.1 / global`.
    pub fn describe(self, name: &str) -> String {
        format!("Lua version {} / {}", self.label(), name)
    }
}

impl fmt::Display for LuaTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

// ============================================================================
// TARGET GROUPS
// ============================================================================

/// Outcome of running a body inside one target's group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupOutcome {
    Passed { group: String },
    Failed { group: String, message: String },
}

impl GroupOutcome {
    pub fn group(&self) -> &str {
        match self {
            GroupOutcome::Passed { group } | GroupOutcome::Failed { group, .. } => group,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, GroupOutcome::Failed { .. })
    }
}

/// Run `body` once per target, each inside its own group.
///
/// A panic inside one group is caught and recorded; the remaining groups
/// still run.
pub fn run_target_groups<F>(name: &str, mut body: F) -> Vec<GroupOutcome>
where
    F: FnMut(LuaTarget),
{
    LuaTarget::ALL
        .into_iter()
        .map(|target| {
            let group = target.describe(name);
            let span = info_span!("target_group", group = %group);
            let _entered = span.enter();

            match panic::catch_unwind(AssertUnwindSafe(|| body(target))) {
                Ok(()) => {
                    debug!("group passed");
                    GroupOutcome::Passed { group }
                }
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    warn!(%message, "group failed");
                    GroupOutcome::Failed { group, message }
                }
            }
        })
        .collect()
}

/// Run `body` once per target and panic afterwards if any group failed.
pub fn for_each_target<F>(name: &str, body: F)
where
    F: FnMut(LuaTarget),
{
    let failures: Vec<_> = run_target_groups(name, body)
        .into_iter()
        .filter_map(|outcome| match outcome {
            GroupOutcome::Failed { group, message } => Some(format!("{group}: {message}")),
            GroupOutcome::Passed { .. } => None,
        })
        .collect();

    if !failures.is_empty() {
        panic!(
            "{} of {} target groups failed:\n{}",
            failures.len(),
            LuaTarget::ALL.len(),
            failures.join("\n")
        );
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_round_trip() {
        for target in LuaTarget::ALL {
            assert_eq!(LuaTarget::from_label(target.label()), Some(target));
        }
        assert_eq!(LuaTarget::from_label("5.4"), None);
    }

    #[test]
    fn groups_run_in_declaration_order() {
        let mut seen = Vec::new();
        let outcomes = run_target_groups("order", |target| seen.push(target));
        assert_eq!(seen, LuaTarget::ALL);
        let groups: Vec<_> = outcomes.iter().map(GroupOutcome::group).collect();
        assert_eq!(
            groups,
            [
                "Lua version 5.1 / order",
                "Lua version 5.2 / order",
                "Lua version 5.3 / order",
                "Lua version jit / order",
            ]
        );
    }

    #[test]
    fn a_failing_group_does_not_stop_the_others() {
        let mut ran = Vec::new();
        let outcomes = run_target_groups("isolation", |target| {
            ran.push(target);
            if target == LuaTarget::Lua52 {
                panic!("boom in {}", target.label());
            }
        });
        assert_eq!(ran.len(), 4);
        let failed: Vec<_> = outcomes.iter().filter(|o| o.is_failure()).collect();
        assert_eq!(
            failed,
            [&GroupOutcome::Failed {
                group: "Lua version 5.2 / isolation".to_string(),
                message: "boom in 5.2".to_string(),
            }]
        );
    }

    #[test]
    #[should_panic(expected = "1 of 4 target groups failed")]
    fn for_each_target_reports_failures_after_all_groups() {
        for_each_target("report", |target| {
            assert_ne!(target, LuaTarget::LuaJit);
        });
    }

    #[test]
    fn deserializes_from_labels() {
        let targets: Vec<LuaTarget> = serde_yaml::from_str(r#"["5.1", "jit"]"#).unwrap();
        assert_eq!(targets, [LuaTarget::Lua51, LuaTarget::LuaJit]);
    }
}
