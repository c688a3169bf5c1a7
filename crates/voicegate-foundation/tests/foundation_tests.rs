use voicegate_foundation::{ConfigError, PipelineError, WorkerState};

#[test]
fn lifecycle_happy_path() {
    let mut state = WorkerState::Uninitialized;
    state.transition(WorkerState::Ready).unwrap();
    state.transition(WorkerState::Running).unwrap();
    state.transition(WorkerState::Stopped).unwrap();
    assert!(state.is_terminal());
}

#[test]
fn pause_and_resume_between_ready_and_running() {
    let mut state = WorkerState::Uninitialized;
    state.transition(WorkerState::Ready).unwrap();
    state.transition(WorkerState::Running).unwrap();
    state.transition(WorkerState::Ready).unwrap();
    state.transition(WorkerState::Running).unwrap();
    assert_eq!(state, WorkerState::Running);
}

#[test]
fn cannot_run_without_initialization() {
    let mut state = WorkerState::Uninitialized;
    let err = state.transition(WorkerState::Running).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::InvalidTransition {
            from: WorkerState::Uninitialized,
            to: WorkerState::Running,
        }
    ));
    assert_eq!(state, WorkerState::Uninitialized);
}

#[test]
fn stopped_is_terminal() {
    let mut state = WorkerState::Stopped;
    assert!(state.transition(WorkerState::Ready).is_err());
    assert!(state.transition(WorkerState::Running).is_err());
}

#[test]
fn stop_is_idempotent() {
    let mut state = WorkerState::Running;
    state.transition(WorkerState::Stopped).unwrap();
    state.transition(WorkerState::Stopped).unwrap();
    assert_eq!(state, WorkerState::Stopped);
}

#[test]
fn config_error_messages_name_the_offending_values() {
    let err = ConfigError::ThresholdOrder {
        silence: 0.6,
        speech: 0.5,
    };
    assert_eq!(
        err.to_string(),
        "silence threshold 0.6 exceeds speech threshold 0.5"
    );

    let err = ConfigError::MissingParameter("frame_samples");
    assert_eq!(err.to_string(), "missing required parameter: frame_samples");
}
