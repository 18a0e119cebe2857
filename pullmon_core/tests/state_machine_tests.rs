use pullmon_core::job::state_machine::JobStateMachine;
use pullmon_core::types::types::{Category, PullState, RawSignal};

fn signal(raw: &str) -> RawSignal {
    raw.parse().unwrap()
}

fn machine(job_id: &str) -> JobStateMachine {
    JobStateMachine::new(job_id, Category::new("ivi"))
}

#[test]
fn downloading_zero_emits_but_does_not_leave_idle() {
    let mut m = machine("img1");

    let event = m.apply(&signal("Downloading:0")).unwrap();
    assert_eq!(event.state, PullState::Downloading);
    assert_eq!(event.percent, 0);
    // The job is not visibly started yet.
    assert_eq!(m.state(), PullState::Idle);
}

#[test]
fn full_pull_lifecycle() {
    let mut m = machine("img1");

    m.apply(&signal("Downloading:0")).unwrap();
    assert_eq!(m.state(), PullState::Idle);

    let event = m.apply(&signal("Downloading:45")).unwrap();
    assert_eq!(event.state, PullState::Downloading);
    assert_eq!(m.state(), PullState::Downloading);
    assert_eq!(m.percent(), 45);

    let event = m.apply(&signal("Extracting:45")).unwrap();
    assert_eq!(event.state, PullState::Extracting);
    assert_eq!(m.state(), PullState::Extracting);

    let event = m.apply(&signal("Complete:100")).unwrap();
    assert_eq!(event.state, PullState::Complete);
    assert_eq!(m.state(), PullState::Complete);
    assert_eq!(m.percent(), 100);
}

#[test]
fn complete_is_terminal() {
    let mut m = machine("img1");
    m.apply(&signal("Downloading:80")).unwrap();
    m.apply(&signal("Complete:100")).unwrap();

    assert!(m.apply(&signal("Downloading:10")).is_none());
    assert!(m.apply(&signal("Failure:0")).is_none());
    assert!(m.apply(&signal("Complete:100")).is_none());
    assert_eq!(m.state(), PullState::Complete);
    assert_eq!(m.percent(), 100);
}

#[test]
fn failure_resets_for_restart() {
    let mut m = machine("img2");
    m.apply(&signal("Downloading:60")).unwrap();

    let event = m.apply(&signal("Failure:0")).unwrap();
    assert_eq!(event.state, PullState::Failure);
    assert_eq!(event.percent, 0);
    assert_eq!(m.state(), PullState::Idle);
    assert_eq!(m.percent(), 0);

    // The same job id restarts on the next signal.
    let event = m.apply(&signal("Downloading:30")).unwrap();
    assert_eq!(event.state, PullState::Downloading);
    assert_eq!(m.state(), PullState::Downloading);
    assert_eq!(m.percent(), 30);
}

#[test]
fn failure_percent_is_forced_to_zero() {
    let mut m = machine("img2");
    m.apply(&signal("Downloading:60")).unwrap();

    // Even a failure report carrying a stale percent resets to 0.
    let event = m.apply(&signal("Failure:60")).unwrap();
    assert_eq!(event.percent, 0);
    assert_eq!(m.percent(), 0);
}

#[test]
fn complete_before_downloading_is_accepted() {
    let mut m = machine("img1");
    let event = m.apply(&signal("Complete:100")).unwrap();
    assert_eq!(event.state, PullState::Complete);
    assert_eq!(m.state(), PullState::Complete);
}

#[test]
fn percent_regression_keeps_last_value() {
    let mut m = machine("img1");
    m.apply(&signal("Downloading:45")).unwrap();

    let event = m.apply(&signal("Downloading:30")).unwrap();
    assert_eq!(event.percent, 30);
    assert_eq!(m.percent(), 30);
}
