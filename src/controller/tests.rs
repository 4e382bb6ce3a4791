use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::*;
use crate::error::{ControllerError, Result};
use crate::host::ControllerHost;
use crate::lifecycle::{LifecycleEvent, LifecycleState};
use crate::logging::{Logger, MemorySink};
use crate::runtime::RuntimeConfig;
use crate::runtime::audit::{LifecycleAuditStage, RecordingAudit};
use crate::surface::Surface;

use LifecycleState::{Created, Destroyed, Resumed, Started};

type Trace = Rc<RefCell<Vec<String>>>;
type Action = Box<dyn Fn(&ControllerContext<'_>) -> Result<()>>;

/// Behaviour that records every hook it receives and runs scripted actions.
struct Scripted {
    name: String,
    trace: Trace,
    counts: [Cell<u32>; 6],
    actions: RefCell<Vec<(LifecycleEvent, Action)>>,
}

impl Scripted {
    fn new(name: &str, trace: &Trace) -> Rc<Self> {
        Rc::new(Self {
            name: name.to_string(),
            trace: Rc::clone(trace),
            counts: Default::default(),
            actions: RefCell::new(Vec::new()),
        })
    }

    fn then(
        &self,
        event: LifecycleEvent,
        action: impl Fn(&ControllerContext<'_>) -> Result<()> + 'static,
    ) {
        self.actions.borrow_mut().push((event, Box::new(action)));
    }

    fn count(&self, event: LifecycleEvent) -> u32 {
        self.counts[event.index()].get()
    }

    fn fire(&self, ctx: &ControllerContext<'_>) -> Result<()> {
        let event = ctx.event();
        self.trace
            .borrow_mut()
            .push(format!("{}.{}", self.name, event.as_str()));
        let slot = &self.counts[event.index()];
        slot.set(slot.get() + 1);
        for (wanted, action) in self.actions.borrow().iter() {
            if *wanted == event {
                action(ctx)?;
            }
        }
        Ok(())
    }
}

impl ControllerBehavior for Scripted {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_create(&self, ctx: &ControllerContext<'_>) -> Result<()> {
        self.fire(ctx)
    }

    fn on_start(&self, ctx: &ControllerContext<'_>) -> Result<()> {
        self.fire(ctx)
    }

    fn on_resume(&self, ctx: &ControllerContext<'_>) -> Result<()> {
        self.fire(ctx)
    }

    fn on_pause(&self, ctx: &ControllerContext<'_>) -> Result<()> {
        self.fire(ctx)
    }

    fn on_stop(&self, ctx: &ControllerContext<'_>) -> Result<()> {
        self.fire(ctx)
    }

    fn on_destroy(&self, ctx: &ControllerContext<'_>) -> Result<()> {
        self.fire(ctx)
    }
}

fn new_trace() -> Trace {
    Rc::new(RefCell::new(Vec::new()))
}

fn scripted(name: &str, trace: &Trace) -> (Rc<Scripted>, Controller) {
    let scripted = Scripted::new(name, trace);
    let controller = Controller::from_behavior(scripted.clone());
    (scripted, controller)
}

fn taken(trace: &Trace) -> Vec<String> {
    std::mem::take(&mut *trace.borrow_mut())
}

fn host_at(state: LifecycleState) -> ControllerHost {
    let host = ControllerHost::new(RuntimeConfig::default());
    host.advance_to(state).unwrap();
    host
}

fn assert_each_hook_once(scripted: &Scripted) {
    for event in LifecycleEvent::ALL {
        assert_eq!(scripted.count(event), 1, "{} {}", scripted.name, event.as_str());
    }
}

#[test]
fn parent_hooks_lead_forward_and_trail_backward() {
    let trace = new_trace();
    let host = host_at(Created);
    let (_, parent) = scripted("parent", &trace);
    let (child_hooks, child) = scripted("child", &trace);

    host.add(&parent).unwrap();
    parent.add_child(&child).unwrap();
    host.advance_to(Resumed).unwrap();
    host.advance_to(Destroyed).unwrap();

    assert_eq!(
        taken(&trace),
        vec![
            "parent.on_create",
            "child.on_create",
            "parent.on_start",
            "child.on_start",
            "parent.on_resume",
            "child.on_resume",
            "child.on_pause",
            "parent.on_pause",
            "child.on_stop",
            "parent.on_stop",
            "child.on_destroy",
            "parent.on_destroy",
        ]
    );
    assert_each_hook_once(&child_hooks);
}

#[test]
fn child_added_from_parent_create_follows_parent() {
    let trace = new_trace();
    let audit = Arc::new(RecordingAudit::new());
    let host = ControllerHost::new(RuntimeConfig::default().with_audit(audit.clone()));
    host.advance_to(Created).unwrap();

    let (parent_hooks, parent) = scripted("parent", &trace);
    let (_, child) = scripted("child", &trace);
    let nested = child.clone();
    parent_hooks.then(LifecycleEvent::Create, move |ctx| ctx.add_child(&nested));

    host.add(&parent).unwrap();
    host.advance_to(Started).unwrap();

    let expected = vec![
        (parent.id(), LifecycleEvent::Create),
        (child.id(), LifecycleEvent::Create),
        (parent.id(), LifecycleEvent::Start),
        (child.id(), LifecycleEvent::Start),
    ];
    assert_eq!(audit.hook_trace(), expected);
    assert_eq!(parent.children(), vec![child.clone()]);
}

#[test]
fn late_add_catches_up_through_every_step() {
    let trace = new_trace();
    let audit = Arc::new(RecordingAudit::new());
    let host = ControllerHost::new(RuntimeConfig::default().with_audit(audit.clone()));
    host.advance_to(Resumed).unwrap();
    let (_, late) = scripted("late", &trace);

    host.add(&late).unwrap();

    assert_eq!(
        taken(&trace),
        vec!["late.on_create", "late.on_start", "late.on_resume"]
    );
    assert_eq!(late.state(), Resumed);

    let stages: Vec<LifecycleAuditStage> = audit.events().iter().map(|e| e.stage).collect();
    assert_eq!(stages.first(), Some(&LifecycleAuditStage::ControllerAttached));
    assert_eq!(stages.last(), Some(&LifecycleAuditStage::ChildAdded));
    assert_eq!(audit.stage_count(LifecycleAuditStage::StepCommitted), 3);
}

#[test]
fn removal_walks_down_from_current_state() {
    let trace = new_trace();
    let host = host_at(Started);
    let (_, started) = scripted("started", &trace);
    host.add(&started).unwrap();
    taken(&trace);

    host.remove(&started).unwrap();
    assert_eq!(taken(&trace), vec!["started.on_stop", "started.on_destroy"]);

    host.advance_to(Resumed).unwrap();
    let (_, resumed) = scripted("resumed", &trace);
    host.add(&resumed).unwrap();
    taken(&trace);

    host.remove(&resumed).unwrap();
    assert_eq!(
        taken(&trace),
        vec!["resumed.on_pause", "resumed.on_stop", "resumed.on_destroy"]
    );
    assert_eq!(started.state(), Destroyed);
    assert!(host.manager().is_empty());
}

#[test]
fn created_child_destroys_without_stop() {
    let trace = new_trace();
    let host = host_at(Created);
    let (_, child) = scripted("child", &trace);
    host.add(&child).unwrap();

    host.advance_to(Destroyed).unwrap();

    assert_eq!(taken(&trace), vec!["child.on_create", "child.on_destroy"]);
}

#[test]
fn sibling_added_mid_dispatch_is_not_notified_twice() {
    let trace = new_trace();
    let host = host_at(Created);
    let (first_hooks, first) = scripted("first", &trace);
    let (second_hooks, second) = scripted("second", &trace);
    let (late_hooks, late) = scripted("late", &trace);

    let manager = host.manager().clone();
    let sibling = late.clone();
    first_hooks.then(LifecycleEvent::Start, move |_| {
        manager.add(Container::Detached, &sibling)
    });

    host.add(&first).unwrap();
    host.add(&second).unwrap();
    taken(&trace);

    host.advance_to(Started).unwrap();
    assert_eq!(
        taken(&trace),
        vec![
            "first.on_start",
            "late.on_create",
            "late.on_start",
            "second.on_start",
        ]
    );

    host.advance_to(Resumed).unwrap();
    assert_eq!(
        taken(&trace),
        vec!["first.on_resume", "second.on_resume", "late.on_resume"]
    );
    for scripted in [&first_hooks, &second_hooks, &late_hooks] {
        assert_eq!(scripted.count(LifecycleEvent::Start), 1);
    }
}

#[test]
fn removing_unvisited_sibling_mid_dispatch_skips_it() {
    let trace = new_trace();
    let host = host_at(Resumed);
    let (first_hooks, first) = scripted("first", &trace);
    let (_, second) = scripted("second", &trace);
    let (third_hooks, third) = scripted("third", &trace);

    host.add(&first).unwrap();
    host.add(&second).unwrap();
    host.add(&third).unwrap();
    let manager = host.manager().clone();
    let victim = first.clone();
    third_hooks.then(LifecycleEvent::Pause, move |_| manager.remove(&victim));
    taken(&trace);

    host.advance_to(Started).unwrap();
    assert_eq!(
        taken(&trace),
        vec![
            "third.on_pause",
            "first.on_pause",
            "first.on_stop",
            "first.on_destroy",
            "second.on_pause",
        ]
    );

    host.advance_to(Destroyed).unwrap();
    assert_each_hook_once(&first_hooks);
    assert!(!taken(&trace).iter().any(|entry| entry.starts_with("first.")));
}

#[test]
fn self_removal_from_pause_completes_once() {
    let trace = new_trace();
    let audit = Arc::new(RecordingAudit::new());
    let host = ControllerHost::new(RuntimeConfig::default().with_audit(audit.clone()));
    host.advance_to(Resumed).unwrap();
    let (quitter_hooks, quitter) = scripted("quitter", &trace);
    let (_, stayer) = scripted("stayer", &trace);
    host.add(&stayer).unwrap();
    host.add(&quitter).unwrap();

    let manager = host.manager().clone();
    quitter_hooks.then(LifecycleEvent::Pause, move |ctx| {
        manager.remove(ctx.controller())
    });
    taken(&trace);

    host.advance_to(Started).unwrap();

    assert_eq!(
        taken(&trace),
        vec![
            "quitter.on_pause",
            "quitter.on_stop",
            "quitter.on_destroy",
            "stayer.on_pause",
        ]
    );
    assert_eq!(quitter.state(), Destroyed);
    assert_eq!(stayer.state(), Started);
    assert_eq!(audit.stage_count(LifecycleAuditStage::TargetDeferred), 1);

    host.advance_to(Destroyed).unwrap();
    assert_each_hook_once(&quitter_hooks);
}

#[test]
fn nested_add_remove_during_dispatch_fires_each_hook_once() {
    let trace = new_trace();
    let host = host_at(Created);
    let (parent_hooks, parent) = scripted("parent", &trace);
    let (c1_hooks, c1) = scripted("c1", &trace);
    let (c2_hooks, c2) = scripted("c2", &trace);
    let (c3_hooks, c3) = scripted("c3", &trace);
    let (c4_hooks, c4) = scripted("c4", &trace);

    let owner = parent.clone();
    let added = c4.clone();
    c1_hooks.then(LifecycleEvent::Start, move |_| owner.add_child(&added));

    let owner = parent.clone();
    c2_hooks.then(LifecycleEvent::Destroy, move |ctx| {
        owner.remove_child(ctx.controller())
    });

    let children = [c1.clone(), c2.clone(), c3.clone()];
    parent_hooks.then(LifecycleEvent::Create, move |ctx| {
        for child in &children {
            ctx.add_child(child)?;
        }
        Ok(())
    });

    host.add(&parent).unwrap();
    host.advance_to(Resumed).unwrap();
    assert_eq!(parent.children(), vec![c1.clone(), c2.clone(), c3.clone(), c4.clone()]);

    host.remove(&parent).unwrap();

    for scripted in [&parent_hooks, &c1_hooks, &c2_hooks, &c3_hooks, &c4_hooks] {
        assert_each_hook_once(scripted);
    }
    for controller in [&parent, &c1, &c2, &c3, &c4] {
        assert_eq!(controller.state(), Destroyed);
    }
    assert!(parent.children().is_empty());
}

#[test]
fn host_teardown_from_child_create_waits_for_the_child() {
    let trace = new_trace();
    let audit = Arc::new(RecordingAudit::new());
    let host = ControllerHost::new(RuntimeConfig::default().with_audit(audit.clone()));
    host.advance_to(Created).unwrap();
    let (parent_hooks, parent) = scripted("parent", &trace);
    let (child_hooks, child) = scripted("child", &trace);
    host.add(&parent).unwrap();
    let teardown = host.clone();
    child_hooks.then(LifecycleEvent::Create, move |_| teardown.advance_to(Destroyed));
    taken(&trace);

    parent.add_child(&child).unwrap();

    assert_eq!(
        taken(&trace),
        vec!["child.on_create", "child.on_destroy", "parent.on_destroy"]
    );
    assert_eq!(parent.state(), Destroyed);
    assert_eq!(child.state(), Destroyed);
    assert_eq!(parent_hooks.count(LifecycleEvent::Destroy), 1);
    assert_eq!(child_hooks.count(LifecycleEvent::Destroy), 1);
    assert_eq!(audit.stage_count(LifecycleAuditStage::TargetDeferred), 1);

    let hooks = audit.hook_trace();
    assert_eq!(
        hooks[hooks.len() - 2..].to_vec(),
        vec![
            (child.id(), LifecycleEvent::Destroy),
            (parent.id(), LifecycleEvent::Destroy),
        ]
    );
}

#[test]
fn parent_removed_from_child_catch_up_walks_down_after_it() {
    let trace = new_trace();
    let host = host_at(Started);
    let (_, parent) = scripted("parent", &trace);
    let (child_hooks, child) = scripted("child", &trace);
    host.add(&parent).unwrap();
    let manager = host.manager().clone();
    let doomed = parent.clone();
    child_hooks.then(LifecycleEvent::Start, move |_| manager.remove(&doomed));
    taken(&trace);

    parent.add_child(&child).unwrap();

    assert_eq!(
        taken(&trace),
        vec![
            "child.on_create",
            "child.on_start",
            "child.on_stop",
            "parent.on_stop",
            "child.on_destroy",
            "parent.on_destroy",
        ]
    );
    for event in [
        LifecycleEvent::Create,
        LifecycleEvent::Start,
        LifecycleEvent::Stop,
        LifecycleEvent::Destroy,
    ] {
        assert_eq!(child_hooks.count(event), 1, "{}", event.as_str());
    }
    assert!(host.manager().is_empty());
    assert!(parent.children().is_empty());
}

#[test]
fn registration_errors() {
    let trace = new_trace();
    let host = ControllerHost::new(RuntimeConfig::default());
    let (_, child) = scripted("child", &trace);

    assert!(matches!(
        host.add(&child),
        Err(ControllerError::InvalidLifecycleState {
            state: LifecycleState::Uninitialized,
            ..
        })
    ));

    host.advance_to(Created).unwrap();
    host.add(&child).unwrap();
    assert!(matches!(
        host.add(&child),
        Err(ControllerError::AlreadyRegistered(id)) if id == child.id()
    ));

    let other = host_at(Created);
    assert!(matches!(
        other.add(&child),
        Err(ControllerError::AlreadyAttached(_))
    ));

    let (_, stranger) = scripted("stranger", &trace);
    assert!(matches!(
        host.remove(&stranger),
        Err(ControllerError::NotRegistered(_))
    ));

    host.remove(&child).unwrap();
    assert!(matches!(
        host.remove(&child),
        Err(ControllerError::NotRegistered(_))
    ));

    host.advance_to(Destroyed).unwrap();
    let (_, late) = scripted("late", &trace);
    assert!(matches!(
        host.add(&late),
        Err(ControllerError::InvalidLifecycleState {
            state: LifecycleState::Destroyed,
            ..
        })
    ));
}

#[test]
fn unattached_controller_cannot_manage_children() {
    let trace = new_trace();
    let (_, loose) = scripted("loose", &trace);
    let (_, child) = scripted("child", &trace);

    assert!(matches!(
        loose.add_child(&child),
        Err(ControllerError::InvalidLifecycleState {
            state: LifecycleState::Uninitialized,
            operation: "add",
        })
    ));
    assert!(matches!(
        loose.remove_child(&child),
        Err(ControllerError::NotRegistered(id)) if id == child.id()
    ));
    assert!(matches!(
        loose.set_owned_surface(|_| Surface::new()),
        Err(ControllerError::NotAttachedToContainer(id)) if id == loose.id()
    ));
    assert!(loose.children().is_empty());
}

struct Session {
    trace: Trace,
}

impl Retained for Session {
    fn on_cleared(&self) {
        self.trace.borrow_mut().push("session.cleared".to_string());
    }
}

#[test]
fn owned_surface_and_retained_objects_released_before_destroy_hook() {
    let trace = new_trace();
    let root = Surface::with_id("root");
    let content = Surface::with_id("content");
    root.add_child(&content).unwrap();
    let host = ControllerHost::with_root(RuntimeConfig::default(), root);
    host.advance_to(Created).unwrap();

    let (panel_hooks, panel) = scripted("panel", &trace);
    let (_, widget) = scripted("widget", &trace);
    let session_trace = Rc::clone(&trace);
    panel_hooks.then(LifecycleEvent::Create, move |ctx| {
        ctx.set_owned_surface(|_| {
            let surface = Surface::with_id("panel");
            surface.add_child(&Surface::with_id("slot")).unwrap();
            surface
        })?;
        ctx.retained().insert(Session {
            trace: Rc::clone(&session_trace),
        })?;
        Ok(())
    });
    let seen_surface = Rc::new(Cell::new(true));
    let seen = Rc::clone(&seen_surface);
    panel_hooks.then(LifecycleEvent::Destroy, move |ctx| {
        seen.set(ctx.owned_surface().is_some());
        Ok(())
    });

    host.add_to("content", &panel).unwrap();
    assert_eq!(content.child_count(), 1);
    panel.add_child_to("slot", &widget).unwrap();
    assert_eq!(widget.container().and_then(|s| s.id().map(str::to_string)), Some("slot".to_string()));
    taken(&trace);

    host.advance_to(Destroyed).unwrap();

    assert_eq!(
        taken(&trace),
        vec!["widget.on_destroy", "session.cleared", "panel.on_destroy"]
    );
    assert!(!seen_surface.get());
    assert_eq!(content.child_count(), 0);
    assert!(panel.owned_surface().is_none());
    assert!(panel.retained().is_cleared());
    assert!(matches!(
        panel.set_owned_surface(|_| Surface::new()),
        Err(ControllerError::InvalidLifecycleState { .. })
    ));
}

#[test]
fn container_resolution_errors() {
    let trace = new_trace();
    let root = Surface::with_id("root");
    let host = ControllerHost::with_root(RuntimeConfig::default(), root.clone());
    host.advance_to(Resumed).unwrap();

    let (_, logic) = scripted("logic", &trace);
    host.add(&logic).unwrap();
    assert!(matches!(
        logic.set_owned_surface(|_| Surface::new()),
        Err(ControllerError::NotAttachedToContainer(_))
    ));

    let (_, framed) = scripted("framed", &trace);
    host.add_to(&root, &framed).unwrap();
    let (_, child) = scripted("child", &trace);
    assert!(matches!(
        framed.add_child_to("slot", &child),
        Err(ControllerError::ContainerNotFound(id)) if id == "slot"
    ));

    framed
        .set_owned_surface(|_| Surface::with_id("frame"))
        .unwrap();
    assert!(matches!(
        framed.add_child_to(&root, &child),
        Err(ControllerError::ContainerNotOwned(_))
    ));
    assert!(matches!(
        host.add_to("missing", &child),
        Err(ControllerError::ContainerNotFound(_))
    ));
    framed.add_child_to("frame", &child).unwrap();
    assert_eq!(child.state(), Resumed);
}

#[test]
fn replacing_owned_surface_detaches_previous() {
    let trace = new_trace();
    let root = Surface::with_id("root");
    let host = ControllerHost::with_root(RuntimeConfig::default(), root.clone());
    host.advance_to(Created).unwrap();
    let (_, screen) = scripted("screen", &trace);
    host.add_to(&root, &screen).unwrap();

    let first = screen.set_owned_surface(|_| Surface::with_id("first")).unwrap();
    let second = screen.set_owned_surface(|_| Surface::with_id("second")).unwrap();

    assert!(first.parent().is_none());
    assert_eq!(root.children(), vec![second.clone()]);
    assert_eq!(screen.owned_surface(), Some(second));
}

#[test]
fn lifecycle_observer_shares_child_ordering() {
    let trace = new_trace();
    let host = host_at(Created);
    let (_, parent) = scripted("parent", &trace);
    let (_, child) = scripted("child", &trace);
    host.add(&parent).unwrap();
    parent.add_child(&child).unwrap();

    let observed = Rc::clone(&trace);
    let token = parent.observe(move |transition| {
        observed
            .borrow_mut()
            .push(format!("observer.{:?}", transition.to));
        Ok(())
    });
    taken(&trace);

    host.advance_to(Started).unwrap();
    host.advance_to(Created).unwrap();
    assert_eq!(
        taken(&trace),
        vec![
            "parent.on_start",
            "child.on_start",
            "observer.Started",
            "observer.Created",
            "child.on_stop",
            "parent.on_stop",
        ]
    );

    assert!(parent.unobserve(token));
    host.advance_to(Started).unwrap();
    assert_eq!(taken(&trace), vec!["parent.on_start", "child.on_start"]);
}

#[test]
fn hook_failure_stops_dispatch_and_keeps_committed_state() {
    let trace = new_trace();
    let host = host_at(Created);
    let (failing_hooks, failing) = scripted("failing", &trace);
    let (_, after) = scripted("after", &trace);
    failing_hooks.then(LifecycleEvent::Start, |ctx| {
        Err(ControllerError::hook(ctx.id(), ctx.event(), "refused"))
    });
    host.add(&failing).unwrap();
    host.add(&after).unwrap();

    let err = host.advance_to(Started).unwrap_err();

    assert!(matches!(
        err,
        ControllerError::Hook {
            event: LifecycleEvent::Start,
            ..
        }
    ));
    assert_eq!(failing.state(), Started);
    assert_eq!(after.state(), Created);
}

#[test]
fn logs_and_metrics_follow_the_tree() {
    let trace = new_trace();
    let sink = MemorySink::new();
    let mut config = RuntimeConfig::default()
        .with_logger(Logger::new(sink.clone()))
        .with_host_label("activity");
    config.enable_metrics();
    let host = ControllerHost::new(config);
    host.advance_to(Resumed).unwrap();
    let (_, child) = scripted("child", &trace);

    host.add(&child).unwrap();
    let snapshot = host.context().metrics_snapshot().unwrap();
    assert_eq!(snapshot.steps, 3);
    assert_eq!(snapshot.hooks, 3);
    assert_eq!(snapshot.children_added, 1);

    host.remove(&child).unwrap();
    let snapshot = host.context().metrics_snapshot().unwrap();
    assert_eq!(snapshot.steps, 6);
    assert_eq!(snapshot.hooks, 6);
    assert_eq!(snapshot.children_removed, 1);
    assert_eq!(snapshot.destroyed, 1);

    let events = sink.events();
    let steps = events
        .iter()
        .filter(|event| event.target == "room::controller" && event.message == "lifecycle.step")
        .count();
    assert_eq!(steps, 6);
    let added = events
        .iter()
        .find(|event| event.message == "child_added")
        .unwrap();
    assert_eq!(added.target, "room::manager");
    assert_eq!(added.field("host"), Some(&serde_json::json!("activity")));
    assert_eq!(added.field("child"), Some(&serde_json::json!(child.id().to_string())));
}

#[test]
fn random_host_walks_keep_every_controller_on_legal_paths() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let audit = Arc::new(RecordingAudit::new());
    let host = ControllerHost::new(RuntimeConfig::default().with_audit(audit.clone()));
    host.advance_to(Created).unwrap();

    let trace = new_trace();
    let mut controllers = Vec::new();
    for index in 0..3 {
        let (_, parent) = scripted(&format!("parent{index}"), &trace);
        host.add(&parent).unwrap();
        for leaf in 0..2 {
            let (_, child) = scripted(&format!("leaf{index}.{leaf}"), &trace);
            parent.add_child(&child).unwrap();
            controllers.push(child);
        }
        controllers.push(parent);
    }

    let live = [Created, Started, Resumed];
    for _ in 0..200 {
        let target = live[rng.gen_range(0..live.len())];
        host.advance_to(target).unwrap();
        for controller in &controllers {
            assert_eq!(controller.state(), target, "{}", controller.name());
        }
    }
    host.advance_to(Destroyed).unwrap();

    let mut paths: HashMap<ControllerId, Vec<LifecycleEvent>> = HashMap::new();
    for (id, event) in audit.hook_trace() {
        paths.entry(id).or_default().push(event);
    }
    assert_eq!(paths.len(), controllers.len());
    for (id, events) in paths {
        let mut state = LifecycleState::Uninitialized;
        for event in &events {
            let next = event.target_state();
            assert_eq!(LifecycleEvent::between(state, next), Some(*event), "{id}");
            state = next;
        }
        assert_eq!(state, Destroyed, "{id}");
        assert_eq!(
            events.iter().filter(|e| **e == LifecycleEvent::Create).count(),
            1
        );
    }
}
