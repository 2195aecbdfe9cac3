use proptest::prelude::*;
use provisioner_domain::{iaas_state_to_node_state, ordinal_gt, IaasState, NodeState};

fn arb_iaas_state() -> impl Strategy<Value = IaasState> {
    prop_oneof![
        Just(IaasState::Running),
        Just(IaasState::Rebooting),
        Just(IaasState::Pending),
        Just(IaasState::Terminated),
        Just(IaasState::Unknown),
    ]
}

/// Invariant M: applying the reconciler's "advance only if strictly
/// greater" rule to any sequence of IaaS-reported states never lets a
/// node's observed state decrease.
proptest! {
    #[test]
    fn advance_if_greater_is_monotonic_over_any_sequence(states in proptest::collection::vec(arb_iaas_state(), 0..50)) {
        let mut current = NodeState::Requested;
        for iaas_state in states {
            let mapped = iaas_state_to_node_state(iaas_state);
            let before = current;
            if ordinal_gt(mapped, current) {
                current = mapped;
            }
            // Never decreases, and only ever changes via genuine advancement.
            prop_assert!(current.ordinal().unwrap_or(0) >= before.ordinal().unwrap_or(0));
        }
    }
}
