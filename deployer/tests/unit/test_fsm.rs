//! Run FSM unit tests

use cfdeploy::deploy::fsm::{RunEvent, RunFsm, RunState};

#[test]
fn test_fsm_initial_state() {
    let fsm = RunFsm::new();
    assert_eq!(fsm.state(), RunState::Received);
    assert!(fsm.error().is_none());
    assert!(!fsm.state().is_terminal());
}

#[test]
fn test_fsm_partial_failure() {
    let mut fsm = RunFsm::new();

    fsm.process(RunEvent::Planned).unwrap();
    fsm.process(RunEvent::Execute).unwrap();
    let state = fsm
        .process(RunEvent::Complete {
            planned: 3,
            failed: 1,
        })
        .unwrap();

    assert_eq!(state, RunState::PartiallyFailed);
}

#[test]
fn test_fsm_failed_only_when_every_role_failed() {
    let mut fsm = RunFsm::new();

    fsm.process(RunEvent::Planned).unwrap();
    fsm.process(RunEvent::Execute).unwrap();
    fsm.process(RunEvent::Complete {
        planned: 2,
        failed: 2,
    })
    .unwrap();

    assert_eq!(fsm.state(), RunState::Failed);
}

#[test]
fn test_fsm_invalid_transitions() {
    let mut fsm = RunFsm::new();

    // Cannot execute before planning
    assert!(fsm.process(RunEvent::Execute).is_err());
    assert_eq!(fsm.state(), RunState::Received);

    fsm.process(RunEvent::Planned).unwrap();
    assert!(fsm.process(RunEvent::Planned).is_err());
    assert!(fsm
        .process(RunEvent::Complete {
            planned: 1,
            failed: 0
        })
        .is_err());
}

#[test]
fn test_fsm_terminal_states_accept_nothing() {
    let mut fsm = RunFsm::new();
    fsm.process(RunEvent::Planned).unwrap();
    fsm.process(RunEvent::Execute).unwrap();
    fsm.process(RunEvent::Complete {
        planned: 1,
        failed: 0,
    })
    .unwrap();

    assert!(fsm.state().is_terminal());
    assert!(fsm.process(RunEvent::Execute).is_err());
    assert!(fsm.process(RunEvent::PlanFailed("late".to_string())).is_err());
}
