//! Authorization decision types

use serde::{Deserialize, Serialize};
use std::time::Duration;
use warden_core::RoleClaim;

use crate::artifact::{ArtifactPolicy, Rule};
use crate::duration::serde_secs;
use crate::types::EffectiveGrant;

/// Outcome for one role claim
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub claim: RoleClaim,

    pub allow: bool,

    /// Grant the login will use; always present when `allow` is true
    pub chosen_grant: Option<EffectiveGrant>,

    #[serde(default)]
    pub rules: Vec<Rule>,

    #[serde(with = "serde_secs")]
    pub ttl: Duration,

    #[serde(with = "serde_secs")]
    pub max_ttl: Duration,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

/// Successful authorization of every requested claim
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Authorization {
    pub decisions: Vec<Decision>,

    /// Artifact to create downstream; its name carries `now + max_ttl`
    pub artifact: ArtifactPolicy,

    /// Smallest non-zero ttl across decisions
    #[serde(with = "serde_secs")]
    pub ttl: Duration,

    /// Smallest non-zero max_ttl across decisions
    #[serde(with = "serde_secs")]
    pub max_ttl: Duration,
}

/// Per-claim permission report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleClaimResult {
    #[serde(flatten)]
    pub claim: RoleClaim,

    pub rolebinding_exists: bool,

    pub allow_login: bool,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub require_mfa: bool,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub need_approvals: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Smallest non-zero duration; zero when every input is zero
pub(crate) fn min_non_zero(durations: impl IntoIterator<Item = Duration>) -> Duration {
    durations
        .into_iter()
        .filter(|d| !d.is_zero())
        .min()
        .unwrap_or(Duration::ZERO)
}
