//! Stateless behavior trees.
//!
//! A tree is plain data and is re-run from the root on every scheduled tick.
//! Anything that must persist between runs lives in [`AiState`].

use super::context::AiContext;
use super::state::AiState;
use super::{gunnery, piloting};

/// Result of evaluating a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Success,
    Failure,
}

impl From<bool> for Status {
    fn from(ok: bool) -> Self {
        if ok { Status::Success } else { Status::Failure }
    }
}

/// The primitive checks and actions trees are built from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Leaf {
    HasTarget,
    TargetIsAlive,
    TurnToTarget,
    TurretToTarget,
    FireWeapons,
    DetermineForcedWithdrawal,
    TurnToWithdraw,
    VelocityToMax,
    ReachWithdrawPosition,
    Eject,
    GuardArea,
    GuardUnit,
    PatrolPath,
    Wander,
}

/// A node in the behavior tree.
#[derive(Clone, Debug, PartialEq)]
pub enum BehaviorNode {
    /// Runs children in order until one fails
    Sequence(Vec<BehaviorNode>),
    /// Runs children in order until one succeeds
    Selector(Vec<BehaviorNode>),
    /// Runs the child and reports success whatever it returned
    Succeed(Box<BehaviorNode>),
    Leaf(Leaf),
}

impl BehaviorNode {
    pub fn sequence(children: Vec<BehaviorNode>) -> Self {
        BehaviorNode::Sequence(children)
    }

    pub fn selector(children: Vec<BehaviorNode>) -> Self {
        BehaviorNode::Selector(children)
    }

    pub fn succeed(child: BehaviorNode) -> Self {
        BehaviorNode::Succeed(Box::new(child))
    }

    pub fn evaluate(&self, ctx: &mut AiContext, state: &mut AiState) -> Status {
        match self {
            BehaviorNode::Sequence(children) => {
                for child in children {
                    if child.evaluate(ctx, state) == Status::Failure {
                        return Status::Failure;
                    }
                }
                Status::Success
            }
            BehaviorNode::Selector(children) => {
                for child in children {
                    if child.evaluate(ctx, state) == Status::Success {
                        return Status::Success;
                    }
                }
                Status::Failure
            }
            BehaviorNode::Succeed(child) => {
                child.evaluate(ctx, state);
                Status::Success
            }
            BehaviorNode::Leaf(leaf) => run_leaf(*leaf, ctx, state),
        }
    }
}

impl From<Leaf> for BehaviorNode {
    fn from(leaf: Leaf) -> Self {
        BehaviorNode::Leaf(leaf)
    }
}

fn run_leaf(leaf: Leaf, ctx: &mut AiContext, state: &mut AiState) -> Status {
    match leaf {
        Leaf::HasTarget => gunnery::has_target(ctx, state),
        Leaf::TargetIsAlive => gunnery::target_is_alive(ctx, state),
        Leaf::TurretToTarget => gunnery::turret_to_target(ctx, state),
        Leaf::FireWeapons => gunnery::fire_weapons(ctx, state),
        Leaf::TurnToTarget => piloting::turn_to_target(ctx, state),
        Leaf::DetermineForcedWithdrawal => piloting::determine_forced_withdrawal(ctx),
        Leaf::TurnToWithdraw => piloting::turn_to_withdraw(ctx, state),
        Leaf::VelocityToMax => piloting::velocity_to_max(ctx),
        Leaf::ReachWithdrawPosition => piloting::reach_withdraw_position(ctx, state),
        Leaf::Eject => piloting::eject(ctx),
        Leaf::GuardArea => piloting::guard_area(ctx, state),
        Leaf::GuardUnit => piloting::guard_unit(ctx, state),
        Leaf::PatrolPath => piloting::patrol_path(ctx, state),
        Leaf::Wander => piloting::wander(ctx, state),
    }
}

// ============================================================================
// Stock trees
// ============================================================================

/// Leave the field once badly damaged: run for the withdraw area and eject.
pub fn withdrawal_tree() -> BehaviorNode {
    BehaviorNode::sequence(vec![
        Leaf::DetermineForcedWithdrawal.into(),
        Leaf::TurnToWithdraw.into(),
        Leaf::VelocityToMax.into(),
        Leaf::ReachWithdrawPosition.into(),
        Leaf::Eject.into(),
    ])
}

/// The standard combat brain.
///
/// Withdrawal takes priority; otherwise engage a target; otherwise follow
/// whatever standing order is set, falling back to wandering.
pub fn combat_tree() -> BehaviorNode {
    BehaviorNode::selector(vec![
        BehaviorNode::sequence(vec![
            Leaf::DetermineForcedWithdrawal.into(),
            Leaf::TurnToWithdraw.into(),
            Leaf::VelocityToMax.into(),
            BehaviorNode::succeed(BehaviorNode::sequence(vec![
                Leaf::ReachWithdrawPosition.into(),
                Leaf::Eject.into(),
            ])),
        ]),
        BehaviorNode::sequence(vec![
            Leaf::HasTarget.into(),
            Leaf::TargetIsAlive.into(),
            Leaf::TurnToTarget.into(),
            Leaf::TurretToTarget.into(),
            BehaviorNode::succeed(Leaf::FireWeapons.into()),
        ]),
        Leaf::GuardUnit.into(),
        Leaf::GuardArea.into(),
        Leaf::PatrolPath.into(),
        Leaf::Wander.into(),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::ai::harness::Harness;
    use crate::game::map::BattleMap;
    use bevy::math::DVec2;

    /// A lone mech with nothing to shoot at.
    fn lone_mech() -> (Harness, crate::game::simulation::EntityId) {
        let mut h = Harness::new(BattleMap::new(32, 32));
        let me = h.mech(DVec2::new(10.0, 10.0), 0);
        (h, me)
    }

    fn run(h: &mut Harness, unit: crate::game::simulation::EntityId, tree: &BehaviorNode) -> Status {
        let mut state = AiState::default();
        let mut ctx = h.ctx(unit);
        tree.evaluate(&mut ctx, &mut state)
    }

    fn leaves(node: &BehaviorNode, out: &mut Vec<Leaf>) {
        match node {
            BehaviorNode::Sequence(children) | BehaviorNode::Selector(children) => {
                children.iter().for_each(|c| leaves(c, out));
            }
            BehaviorNode::Succeed(child) => leaves(child, out),
            BehaviorNode::Leaf(leaf) => out.push(*leaf),
        }
    }

    #[test]
    fn test_withdrawal_tree_shape() {
        let mut found = Vec::new();
        leaves(&withdrawal_tree(), &mut found);
        assert_eq!(found, vec![
            Leaf::DetermineForcedWithdrawal,
            Leaf::TurnToWithdraw,
            Leaf::VelocityToMax,
            Leaf::ReachWithdrawPosition,
            Leaf::Eject,
        ]);
    }

    #[test]
    fn test_combat_tree_falls_back_to_wander() {
        match combat_tree() {
            BehaviorNode::Selector(children) => {
                assert_eq!(children.len(), 6);
                assert_eq!(children.last(), Some(&BehaviorNode::Leaf(Leaf::Wander)));
            }
            other => panic!("Expected Selector root, got {:?}", other),
        }
    }

    #[test]
    fn test_status_from_bool() {
        assert_eq!(Status::from(true), Status::Success);
        assert_eq!(Status::from(false), Status::Failure);
    }

    #[test]
    fn test_sequence_stops_at_first_failure() {
        let (mut h, me) = lone_mech();
        let tree = BehaviorNode::sequence(vec![Leaf::HasTarget.into(), Leaf::VelocityToMax.into()]);

        assert_eq!(run(&mut h, me, &tree), Status::Failure);
        assert_eq!(h.field.unit(me).unwrap().target_velocity, 0.0, "Later children must not run");
    }

    #[test]
    fn test_sequence_runs_every_child_on_success() {
        let (mut h, me) = lone_mech();
        let tree = BehaviorNode::sequence(vec![Leaf::VelocityToMax.into(), Leaf::Eject.into()]);

        assert_eq!(run(&mut h, me, &tree), Status::Success);
        let unit = h.field.unit(me).unwrap();
        assert_eq!(unit.target_velocity, unit.max_velocity);
        assert!(unit.withdrawn);
    }

    #[test]
    fn test_selector_falls_through_failures() {
        let (mut h, me) = lone_mech();
        let tree = BehaviorNode::selector(vec![Leaf::HasTarget.into(), Leaf::VelocityToMax.into()]);

        assert_eq!(run(&mut h, me, &tree), Status::Success);
        let unit = h.field.unit(me).unwrap();
        assert_eq!(unit.target_velocity, unit.max_velocity);
    }

    #[test]
    fn test_selector_stops_at_first_success() {
        let (mut h, me) = lone_mech();
        let tree = BehaviorNode::selector(vec![Leaf::VelocityToMax.into(), Leaf::Eject.into()]);

        assert_eq!(run(&mut h, me, &tree), Status::Success);
        assert!(!h.field.unit(me).unwrap().withdrawn);
        assert!(h.outbox.withdrawn.is_empty());
    }

    #[test]
    fn test_selector_fails_when_every_child_fails() {
        let (mut h, me) = lone_mech();
        let tree = BehaviorNode::selector(vec![Leaf::HasTarget.into(), Leaf::GuardArea.into()]);

        assert_eq!(run(&mut h, me, &tree), Status::Failure);
    }

    #[test]
    fn test_succeed_masks_child_failure() {
        let (mut h, me) = lone_mech();
        let tree = BehaviorNode::sequence(vec![
            BehaviorNode::succeed(Leaf::HasTarget.into()),
            Leaf::VelocityToMax.into(),
        ]);

        assert_eq!(run(&mut h, me, &tree), Status::Success);
        let unit = h.field.unit(me).unwrap();
        assert_eq!(unit.target_velocity, unit.max_velocity);
    }

    #[test]
    fn test_combat_tree_without_enemies_holds_fire() {
        let (mut h, me) = lone_mech();

        // Engagement fails at HasTarget, so the tree falls through to wandering
        assert_eq!(run(&mut h, me, &combat_tree()), Status::Success);
        let unit = h.field.unit(me).unwrap();
        assert!(unit.target.is_none());
        assert!(unit.armament[0].is_ready());
        assert!(h.field.projectiles.is_empty());
        assert!(h.outbox.fired.is_empty());
    }
}
