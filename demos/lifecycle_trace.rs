//! Lifecycle trace - prints the hook timeline of a small controller tree
//!
//! A profile page owns a header and a tag strip. The tag strip adds a
//! badge controller for every tag when it is created and lays the badges
//! out with a flow layout. The host is then resumed, paused and destroyed.

use std::sync::Arc;

use room_controllers::{
    Container, Controller, ControllerHost, FlowLayout, FnBehavior, LifecycleState, Logger,
    MemorySink, Rect, RecordingAudit, Result, RuntimeConfig, Surface,
};

const CONTENT_ZONE: &str = "page:content";
const TAGS: &[&str] = &["rust", "lifecycle", "controllers", "ui", "trees"];

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let sink = MemorySink::new();
    let audit = Arc::new(RecordingAudit::new());
    let mut config = RuntimeConfig::default()
        .with_logger(Logger::new(sink.clone()))
        .with_audit(audit.clone())
        .with_host_label("profile");
    config.enable_metrics();

    let root = Surface::with_id("page:root");
    root.add_child(&Surface::with_id(CONTENT_ZONE))?;
    let host = ControllerHost::with_root(config, root);
    host.advance_to(LifecycleState::Created)?;

    host.add_to(CONTENT_ZONE, &Controller::new(FnBehavior::named("header")))?;
    host.add_to(CONTENT_ZONE, &tag_strip())?;

    for state in [
        LifecycleState::Resumed,
        LifecycleState::Started,
        LifecycleState::Destroyed,
    ] {
        host.advance_to(state)?;
    }

    println!("hook timeline");
    for (controller, event) in audit.hook_trace() {
        println!("  {:<6} {}", controller.to_string(), event.as_str());
    }

    if let Some(snapshot) = host.context().metrics_snapshot() {
        println!(
            "\nsteps={} hooks={} added={} destroyed={}",
            snapshot.steps, snapshot.hooks, snapshot.children_added, snapshot.destroyed
        );
    }
    println!("log events: {}", sink.events().len());
    Ok(())
}

fn tag_strip() -> Controller {
    Controller::new(FnBehavior::named("tags").on_create(|ctx| {
        let strip = ctx.set_owned_surface(|_| Surface::with_id("tags:strip"))?;
        for tag in TAGS {
            let badge = Surface::text(format!("tag:{tag}"), format!("#{tag}"));
            strip.add_child(&badge)?;
            ctx.add_child_to(Container::Surface(badge), &badge_controller(tag))?;
        }
        let size = FlowLayout::new()
            .with_gaps(1, 0)
            .arrange(&strip, Rect::new(0, 0, 24, 0));
        println!("tag strip laid out at {}x{}", size.width, size.height);
        for badge in strip.children() {
            let frame = badge.frame();
            println!("  {:<14} at ({}, {})", badge.content(), frame.x, frame.y);
        }
        Ok(())
    }))
}

fn badge_controller(tag: &str) -> Controller {
    let label = tag.to_string();
    Controller::new(FnBehavior::named(format!("badge:{tag}")).on_destroy(move |ctx| -> Result<()> {
        println!("  badge {label} released by {}", ctx.id());
        Ok(())
    }))
}
