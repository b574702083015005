use std::cell::RefCell;
use std::rc::Rc;

use asc_core::{SchedulerEvent, SchedulerPhase, ScriptHandle, StepError};

use super::runtime_test_support::*;
use super::*;

#[derive(Debug, Default)]
struct SpinProvider {
    visited: Vec<usize>,
    paused: usize,
    resumed: usize,
}

impl SpinProvider {
    fn spin(&mut self, script: &mut ScriptHandle) -> Result<StepOutcome, StepError> {
        self.visited.push(script.cursor());
        script.advance();
        Ok(StepOutcome::Continue)
    }
}

impl StepProvider for SpinProvider {
    fn start_script(&mut self, script: &mut ScriptHandle) -> Result<StepOutcome, StepError> {
        self.spin(script)
    }

    fn execute_step(&mut self, script: &mut ScriptHandle) -> Result<StepOutcome, StepError> {
        self.spin(script)
    }

    fn pause_script(&mut self) {
        self.paused += 1;
    }

    fn resume_script(&mut self) {
        self.resumed += 1;
    }
}

struct PanicProvider;

impl StepProvider for PanicProvider {
    fn start_script(&mut self, _script: &mut ScriptHandle) -> Result<StepOutcome, StepError> {
        Ok(StepOutcome::Continue)
    }

    fn execute_step(&mut self, _script: &mut ScriptHandle) -> Result<StepOutcome, StepError> {
        panic!("provider blew up");
    }
}

fn spin_scheduler() -> (
    ScriptScheduler,
    Rc<RefCell<SpinProvider>>,
    Rc<RefCell<RecordingSink>>,
) {
    let provider = Rc::new(RefCell::new(SpinProvider::default()));
    let sink = Rc::new(RefCell::new(RecordingSink::default()));
    let mut options = ScriptSchedulerOptions::new(Box::new(Rc::clone(&provider)));
    options.notifications = Some(Box::new(Rc::clone(&sink)));
    (ScriptScheduler::new(options), provider, sink)
}

#[test]
fn pause_holds_position_and_resume_continues_without_skipping() {
    let (mut scheduler, provider, sink) = spin_scheduler();
    let lines: Vec<String> = (0..100).map(|index| format!("line {}", index)).collect();
    scheduler.play_lines("spin", &lines).expect("play");

    for _ in 0..3 {
        scheduler.tick();
    }
    assert!(scheduler.pause());
    assert!(!scheduler.pause());
    for _ in 0..5 {
        assert_eq!(scheduler.tick(), SchedulerPhase::Paused);
    }
    assert_eq!(provider.borrow().visited, vec![0, 1, 2]);

    assert!(scheduler.resume());
    assert!(!scheduler.resume());
    scheduler.tick();
    scheduler.tick();

    let provider = provider.borrow();
    assert_eq!(provider.visited, vec![0, 1, 2, 3, 4]);
    assert_eq!((provider.paused, provider.resumed), (1, 1));
    let events = sink.borrow().events.clone();
    assert!(events.contains(&SchedulerEvent::Paused { line: 4 }));
    assert!(events.contains(&SchedulerEvent::Resumed { line: 4 }));
    assert!(!events
        .iter()
        .any(|event| matches!(event, SchedulerEvent::Finished { .. })));
}

#[test]
fn never_completing_script_stays_running() {
    let (mut scheduler, provider, _sink) = spin_scheduler();
    let lines: Vec<String> = (0..10).map(|index| format!("line {}", index)).collect();
    scheduler.play_lines("spin", &lines).expect("play");

    for _ in 0..50 {
        assert_eq!(scheduler.tick(), SchedulerPhase::Running);
    }
    assert_eq!(provider.borrow().visited.len(), 50);
    assert!(scheduler.is_running());
}

#[test]
fn toggle_pause_flips_only_while_running() {
    let (mut scheduler, _provider, _sink) = spin_scheduler();
    assert!(!scheduler.toggle_pause());

    scheduler
        .play_lines("spin", &["a".to_string(), "b".to_string()])
        .expect("play");
    scheduler.tick();
    assert!(scheduler.toggle_pause());
    assert!(scheduler.is_paused());
    assert!(scheduler.toggle_pause());
    assert!(!scheduler.is_paused());

    scheduler.stop();
    assert!(!scheduler.is_paused());
}

#[test]
fn stop_clears_pause_and_queue() {
    let (mut scheduler, _provider, _sink) = spin_scheduler();
    scheduler
        .play_lines("spin", &["a".to_string()])
        .expect("play");
    scheduler.stop();

    assert_eq!(scheduler.phase(), SchedulerPhase::Idle);
    assert_eq!(scheduler.tick(), SchedulerPhase::Idle);
}

#[test]
fn phases_follow_the_call_chain() {
    let mut h = harness(&[("a", &["call b", "say a"]), ("b", &["wait 3"])]);
    assert_eq!(h.scheduler.phase(), SchedulerPhase::Idle);

    h.play("a");
    assert_eq!(h.scheduler.phase(), SchedulerPhase::Queued);
    assert_eq!(h.scheduler.active_script_name(), Some("a"));

    assert_eq!(h.scheduler.tick(), SchedulerPhase::Suspended);
    assert!(h.scheduler.is_running());
    assert_eq!(h.scheduler.tick(), SchedulerPhase::Running);
    assert_eq!(h.scheduler.active_script_name(), Some("b"));

    assert!(h.scheduler.pause());
    assert_eq!(h.scheduler.phase(), SchedulerPhase::Paused);
    assert!(h.scheduler.resume());

    h.drive_to_idle();
    assert_eq!(h.scheduler.active_script_name(), None);
}

#[test]
fn tick_interval_change_keeps_runtime_state() {
    let mut h = harness(&[("a", &["call b"]), ("b", &["wait 5"])]);
    assert_eq!(h.scheduler.tick_interval().as_millis(), 25);
    h.play("a");
    h.scheduler.tick();
    h.scheduler.tick();

    let phase = h.scheduler.phase();
    let depth = h.scheduler.call_depth();
    let line = h.scheduler.current_line();
    h.scheduler.set_tick_interval(0);

    assert_eq!(h.scheduler.tick_interval().as_millis(), 0);
    assert_eq!(h.scheduler.config().tick_interval_ms, 0);
    assert_eq!(h.scheduler.phase(), phase);
    assert_eq!(h.scheduler.call_depth(), depth);
    assert_eq!(h.scheduler.current_line(), line);
    assert_eq!(h.scheduler.active_script_name(), Some("b"));
}

#[test]
fn play_by_name_reports_missing_scripts() {
    let mut h = harness(&[("a", &["say a"])]);
    let error = h.scheduler.play_by_name("nope").unwrap_err();
    assert_eq!(error.code, "ENGINE_SCRIPT_NOT_FOUND");
    assert_eq!(h.scheduler.phase(), SchedulerPhase::Idle);

    h.play("A");
    assert_eq!(h.scheduler.active_script_name(), Some("a"));
}

#[test]
fn call_by_name_reports_missing_targets() {
    let mut h = harness(&[("a", &["say a"])]);
    let error = h.scheduler.call_by_name("ghost", None).unwrap_err();
    assert_eq!(error.code, "ENGINE_CALL_TARGET");
    assert_eq!(h.scheduler.phase(), SchedulerPhase::Idle);
}

#[test]
fn host_call_while_idle_starts_a_run() {
    let mut h = harness(&[("a", &["say a"])]);
    assert!(h
        .scheduler
        .call_by_name("a", Some(vec!["1".to_string()]))
        .expect("resolved"));
    assert_eq!(h.scheduler.call_depth(), 0);
    assert_eq!(h.scheduler.phase(), SchedulerPhase::Queued);
    assert_eq!(h.vars.borrow().get("argc"), Some("1"));

    h.drive_to_idle();
    let events = h.lifecycle_events();
    assert!(matches!(&events[0], SchedulerEvent::Started { name } if name == "a"));
    assert!(matches!(&events[1], SchedulerEvent::Finished { name, .. } if name == "a"));
}

#[test]
fn calls_are_ignored_while_host_is_unavailable() {
    let mut h = harness(&[("a", &["say a"])]);
    h.host.borrow_mut().available = false;
    assert!(!h.scheduler.call_script("a", body(&["say a"]), None));
    assert_eq!(h.scheduler.phase(), SchedulerPhase::Idle);
    assert!(h.events().is_empty());
}

#[test]
fn panicking_provider_becomes_a_script_error() {
    let sink = Rc::new(RefCell::new(RecordingSink::default()));
    let mut options = ScriptSchedulerOptions::new(Box::new(PanicProvider));
    options.notifications = Some(Box::new(Rc::clone(&sink)));
    let mut scheduler = ScriptScheduler::new(options);

    scheduler
        .play_lines("boom", &["one".to_string(), "two".to_string()])
        .expect("play");
    assert_eq!(scheduler.tick(), SchedulerPhase::Running);
    assert_eq!(scheduler.tick(), SchedulerPhase::Idle);

    let events = sink.borrow().events.clone();
    let errored = events
        .iter()
        .find(|event| matches!(event, SchedulerEvent::Errored { .. }));
    match errored {
        Some(SchedulerEvent::Errored { name, message, line }) => {
            assert_eq!(name, "boom");
            assert!(message.contains("provider blew up"));
            assert_eq!(*line, 1);
        }
        other => panic!("expected errored event, got {:?}", other),
    }
    assert!(!scheduler.is_running());
}

#[test]
fn reset_forgets_the_run_name_and_highlight_state() {
    let mut h = harness(&[]);
    h.scheduler
        .play_with_highlight("lit", body(&["wait 9"]), true)
        .expect("play");
    h.scheduler.tick();
    h.scheduler.reset();

    assert_eq!(h.scheduler.active_script_name(), None);
    assert!(!h.scheduler.is_running());
    assert_eq!(h.scheduler.phase(), SchedulerPhase::Idle);

    let before = h.events().len();
    h.scheduler.play("plain", body(&["say x"])).expect("play");
    h.drive_to_idle();
    assert!(!h.events()[before..]
        .iter()
        .any(|event| matches!(event, SchedulerEvent::Highlight { .. })));
}
