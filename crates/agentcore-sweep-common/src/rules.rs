//! Static deletion-order rules between resource kinds
//!
//! Each rule says resources of kind `before` must be gone before resources of
//! kind `after` can be deleted. New kinds are ordered by adding rows here, not
//! by touching the planner or executor.

use crate::resource_kind::ResourceKind;

/// How a rule selects the resource pairs it orders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Linkage {
    /// Only pairs where the `before` resource names the `after` resource in
    /// its `depends_on` set
    Declared,
    /// Every in-scope `before` resource precedes every in-scope `after` resource
    AllPairs,
}

/// One row of the rule table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DependencyRule {
    pub before: ResourceKind,
    pub after: ResourceKind,
    pub linkage: Linkage,
    pub reason: &'static str,
}

impl DependencyRule {
    pub const fn declared(before: ResourceKind, after: ResourceKind, reason: &'static str) -> Self {
        Self {
            before,
            after,
            linkage: Linkage::Declared,
            reason,
        }
    }

    pub const fn all_pairs(
        before: ResourceKind,
        after: ResourceKind,
        reason: &'static str,
    ) -> Self {
        Self {
            before,
            after,
            linkage: Linkage::AllPairs,
            reason,
        }
    }
}

/// Deletion-order rules for the AgentCore gateway demo
pub const DEPENDENCY_RULES: &[DependencyRule] = &[
    DependencyRule::declared(
        ResourceKind::GatewayTarget,
        ResourceKind::Gateway,
        "targets are registered under their gateway",
    ),
    DependencyRule::declared(
        ResourceKind::UserPoolDomain,
        ResourceKind::UserPool,
        "a pool cannot be deleted while its hosted domain exists",
    ),
    DependencyRule::all_pairs(
        ResourceKind::GatewayTarget,
        ResourceKind::CredentialProvider,
        "targets authenticate outbound calls through credential providers",
    ),
    DependencyRule::all_pairs(
        ResourceKind::GatewayTarget,
        ResourceKind::LambdaFunction,
        "lambda targets invoke the proxy function",
    ),
    DependencyRule::all_pairs(
        ResourceKind::Gateway,
        ResourceKind::UserPool,
        "the gateway authorizer trusts the user pool",
    ),
    DependencyRule::all_pairs(
        ResourceKind::Gateway,
        ResourceKind::IamRole,
        "the gateway runs under its execution role",
    ),
    DependencyRule::all_pairs(
        ResourceKind::LambdaFunction,
        ResourceKind::IamRole,
        "the function runs under its execution role",
    ),
    DependencyRule::all_pairs(
        ResourceKind::CredentialProvider,
        ResourceKind::Secret,
        "credential providers own their backing secret",
    ),
];

/// Rule for an ordered kind pair, if one exists
pub fn rule_for(
    rules: &[DependencyRule],
    before: ResourceKind,
    after: ResourceKind,
) -> Option<&DependencyRule> {
    rules
        .iter()
        .find(|r| r.before == before && r.after == after)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_no_self_rules() {
        for rule in DEPENDENCY_RULES {
            assert_ne!(rule.before, rule.after, "self rule: {rule:?}");
        }
    }

    #[test]
    fn test_no_duplicate_pairs() {
        let pairs: BTreeSet<_> = DEPENDENCY_RULES
            .iter()
            .map(|r| (r.before, r.after))
            .collect();
        assert_eq!(pairs.len(), DEPENDENCY_RULES.len());
    }

    #[test]
    fn test_kind_level_rules_are_acyclic() {
        // Repeatedly strip kinds with no incoming rule; anything left is a cycle.
        let mut remaining: BTreeSet<ResourceKind> = ResourceKind::ALL.into_iter().collect();
        loop {
            let free: Vec<_> = remaining
                .iter()
                .copied()
                .filter(|k| {
                    !DEPENDENCY_RULES
                        .iter()
                        .any(|r| r.after == *k && remaining.contains(&r.before))
                })
                .collect();
            if free.is_empty() {
                break;
            }
            for k in free {
                remaining.remove(&k);
            }
        }
        assert!(remaining.is_empty(), "cyclic kinds: {remaining:?}");
    }

    #[test]
    fn test_declared_rules_follow_parent_kinds() {
        for rule in DEPENDENCY_RULES
            .iter()
            .filter(|r| r.linkage == Linkage::Declared)
        {
            assert_eq!(rule.before.parent_kind(), Some(rule.after), "{rule:?}");
        }
    }

    #[test]
    fn test_every_child_kind_has_a_declared_rule() {
        for kind in ResourceKind::ALL {
            if let Some(parent) = kind.parent_kind() {
                let rule = rule_for(DEPENDENCY_RULES, kind, parent)
                    .unwrap_or_else(|| panic!("no rule for {kind} -> {parent}"));
                assert_eq!(rule.linkage, Linkage::Declared);
            }
        }
    }

    #[test]
    fn test_rule_for_is_directional() {
        assert!(rule_for(DEPENDENCY_RULES, ResourceKind::GatewayTarget, ResourceKind::Gateway).is_some());
        assert!(rule_for(DEPENDENCY_RULES, ResourceKind::Gateway, ResourceKind::GatewayTarget).is_none());
        assert!(rule_for(DEPENDENCY_RULES, ResourceKind::Secret, ResourceKind::IamRole).is_none());
    }
}
