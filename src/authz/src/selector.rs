//! Best-grant selection among policy survivors

use crate::types::EffectiveGrant;

/// Pick the grant that is cheapest to use
///
/// Scans once, in order:
/// 1. the first grant needing neither MFA nor approvals wins immediately;
/// 2. otherwise the first grant needing MFA but no approvals;
/// 3. otherwise the grant needing the fewest approvals, earliest on ties.
///
/// An empty input yields `None`.
pub fn select_best(survivors: &[EffectiveGrant]) -> Option<&EffectiveGrant> {
    let mut mfa_only: Option<&EffectiveGrant> = None;
    let mut fewest_approvals: Option<&EffectiveGrant> = None;

    for grant in survivors {
        if grant.is_unconditional() {
            return Some(grant);
        }
        if grant.need_approvals == 0 {
            mfa_only.get_or_insert(grant);
        } else if fewest_approvals.map_or(true, |best| grant.need_approvals < best.need_approvals) {
            fewest_approvals = Some(grant);
        }
    }

    mfa_only.or(fewest_approvals)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grant(id: &str, require_mfa: bool, need_approvals: u32) -> EffectiveGrant {
        EffectiveGrant {
            role: "ssh".into(),
            grant_id: id.into(),
            binding_ids: vec![id.into()],
            tenant_uuid: "t1".into(),
            project_uuid: None,
            valid_till: 0,
            require_mfa,
            any_project: false,
            projects: Default::default(),
            need_approvals,
            options: Default::default(),
        }
    }

    #[test]
    fn test_empty_input() {
        assert!(select_best(&[]).is_none());
    }

    #[test]
    fn test_unconditional_grant_wins() {
        let grants = [grant("a", true, 0), grant("b", false, 2), grant("c", false, 0), grant("d", false, 0)];
        assert_eq!(select_best(&grants).unwrap().grant_id, "c");
    }

    #[test]
    fn test_mfa_beats_approvals() {
        let grants = [grant("a", false, 1), grant("b", true, 0), grant("c", true, 0)];
        assert_eq!(select_best(&grants).unwrap().grant_id, "b");
    }

    #[test]
    fn test_fewest_approvals_first_on_ties() {
        let grants = [grant("a", true, 3), grant("b", false, 1), grant("c", true, 1), grant("d", false, 2)];
        assert_eq!(select_best(&grants).unwrap().grant_id, "b");
    }
}
