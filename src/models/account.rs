use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-account state owned by one account actor.
///
/// `name` is the logical identity and never changes. `plan` and
/// `plan_valid_from` only change together. `created` and `terminated` are
/// written at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub plan: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub plan_valid_from: Option<DateTime<Utc>>,
}

/// The caller-claimed identity does not own the account
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("access denied to account from {actor}")]
pub struct AuthorizationError {
    pub actor: String,
}

impl Account {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_plan(mut self, plan: impl Into<String>) -> Self {
        self.plan = plan.into();
        self
    }

    /// Fill in first-activation defaults. Existing values are kept, so a
    /// continued run re-activating the same account changes nothing.
    pub fn activate(&mut self, now: DateTime<Utc>, default_plan: &str) {
        if self.created.is_none() {
            self.created = Some(now);
        }
        if self.plan.is_empty() {
            self.plan = default_plan.to_string();
        }
    }

    pub fn authorize(&self, actor: &str) -> Result<(), AuthorizationError> {
        if actor == self.name {
            Ok(())
        } else {
            Err(AuthorizationError {
                actor: actor.to_string(),
            })
        }
    }

    pub fn apply_upgrade(&mut self, to: impl Into<String>, valid_from: DateTime<Utc>) {
        self.plan = to.into();
        self.plan_valid_from = Some(valid_from);
    }

    /// Mark the account as permanently ended. The first termination wins.
    pub fn terminate(&mut self, at: DateTime<Utc>) {
        if self.terminated.is_none() {
            self.terminated = Some(at);
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.is_some()
    }
}
