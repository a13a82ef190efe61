//! `events`: list recent audit events.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use super::AppContext;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{DetectorEvent, EventPayload};
use crate::domain::ports::SnapshotStore;

#[derive(Args, Debug)]
pub struct EventsArgs {
    /// Maximum number of events to show
    #[arg(short, long, default_value = "20")]
    pub limit: usize,

    /// Only show one event type (attractor_detected, basin_transition)
    #[arg(short = 't', long = "type")]
    pub event_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EventListOutput {
    pub events: Vec<DetectorEvent>,
}

impl EventListOutput {
    pub fn new(events: Vec<DetectorEvent>, event_type: Option<&str>) -> Self {
        let events = match event_type {
            Some(t) => events.into_iter().filter(|e| e.event_type() == t).collect(),
            None => events,
        };
        Self { events }
    }
}

fn describe(event: &DetectorEvent) -> String {
    match &event.payload {
        EventPayload::AttractorDetected {
            attractor_id,
            kind,
            strength,
            evicted,
            ..
        } => {
            let mut line = format!("{attractor_id} detected ({kind}, strength {strength:.3})");
            if !evicted.is_empty() {
                line.push_str(&format!(", evicted {}", evicted.len()));
            }
            line
        }
        EventPayload::BasinTransition {
            from,
            to,
            distance,
            transitions,
        } => {
            let from = from.map_or_else(|| "none".to_string(), |id| id.to_string());
            format!("basin {from} -> {to} (distance {distance:.2}, #{transitions})")
        }
    }
}

impl CommandOutput for EventListOutput {
    fn to_human(&self) -> String {
        if self.events.is_empty() {
            return "No events recorded.".to_string();
        }
        self.events
            .iter()
            .map(|e| format!("{}  {}", e.timestamp.format("%Y-%m-%d %H:%M:%S"), describe(e)))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.events).unwrap_or_default()
    }
}

pub async fn execute(args: EventsArgs, ctx: AppContext, json_mode: bool) -> Result<()> {
    // over-fetch so a type filter still fills the page
    let fetch = if args.event_type.is_some() {
        args.limit.saturating_mul(4)
    } else {
        args.limit
    };
    let events = ctx
        .store
        .recent_events(fetch)
        .await
        .context("Failed to read events")?;

    let mut out = EventListOutput::new(events, args.event_type.as_deref());
    out.events.truncate(args.limit);
    output(&out, json_mode);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{AttractorId, AttractorKind};
    use chrono::Utc;

    fn events() -> Vec<DetectorEvent> {
        vec![
            DetectorEvent::new(
                EventPayload::BasinTransition {
                    from: Some(AttractorId(1)),
                    to: AttractorId(2),
                    distance: 3.25,
                    transitions: 4,
                },
                Utc::now(),
            ),
            DetectorEvent::new(
                EventPayload::AttractorDetected {
                    attractor_id: AttractorId(2),
                    kind: AttractorKind::LimitCycle,
                    strength: 0.75,
                    center: vec![50.0],
                    evicted: vec![AttractorId(1)],
                },
                Utc::now(),
            ),
        ]
    }

    #[test]
    fn test_filter_by_type() {
        let out = EventListOutput::new(events(), Some("attractor_detected"));
        assert_eq!(out.events.len(), 1);
        assert_eq!(out.events[0].event_type(), "attractor_detected");
    }

    #[test]
    fn test_human_output() {
        let text = EventListOutput::new(events(), None).to_human();
        assert!(text.contains("basin attractor-1 -> attractor-2"));
        assert!(text.contains("attractor-2 detected (limit_cycle, strength 0.750), evicted 1"));
    }

    #[test]
    fn test_empty_output() {
        assert_eq!(EventListOutput::new(Vec::new(), None).to_human(), "No events recorded.");
    }
}
