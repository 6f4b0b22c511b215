//! The controller loop.
//!
//! Owns every piece of mutable state (cooldowns, liveness, last selection)
//! and processes one bus event at a time to completion. Errors inside an
//! event are logged and the loop moves on; only startup can fail the
//! process.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use rand::rngs::StdRng;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use xwalkconf::XwalkConfig;
use xwalkproto::{
    ApiRequest, ApiRequestKind, ApiResponse, CommandKind, ControlCommand, ControllerState,
    Heartbeat, InteractionEvent, LastSelection, StatusSnapshot, WireMessage,
};

use crate::bus::{ApiCall, BusEvent, EventBus};
use crate::catalog::{Walk, WalkLibrary};
use crate::clock::Clock;
use crate::cooldown::CooldownTracker;
use crate::error::{Error, Result};
use crate::liveness::{HeartbeatOutcome, LivenessMonitor};
use crate::telemetry::Metrics;

/// Source name used for triggers injected through the API.
pub const API_SOURCE: &str = "api";

#[derive(Debug, Clone, PartialEq)]
pub struct ControllerSettings {
    pub heartbeat_timeout: TimeDelta,
    pub sweep_interval: Duration,
    /// Components reported as UNKNOWN until they first check in.
    pub expected: Vec<String>,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            heartbeat_timeout: TimeDelta::seconds(5),
            sweep_interval: Duration::from_secs(1),
            expected: Vec::new(),
        }
    }
}

impl ControllerSettings {
    pub fn from_config(config: &XwalkConfig) -> Result<Self> {
        let liveness = &config.bootstrap.liveness;
        let heartbeat_timeout = TimeDelta::from_std(liveness.heartbeat_timeout).map_err(|_| {
            Error::config(format!(
                "heartbeat_timeout out of range: {:?}",
                liveness.heartbeat_timeout
            ))
        })?;
        Ok(Self {
            heartbeat_timeout,
            sweep_interval: liveness.sweep_interval.max(Duration::from_millis(10)),
            expected: liveness.expected.clone(),
        })
    }
}

pub struct Controller<B> {
    library: WalkLibrary,
    cooldown: CooldownTracker,
    liveness: LivenessMonitor,
    bus: B,
    clock: Arc<dyn Clock>,
    rng: StdRng,
    state: ControllerState,
    started_at: DateTime<Utc>,
    last_selection: Option<LastSelection>,
    sweep_interval: Duration,
    metrics: Metrics,
}

/// Build the play command for a chosen walk and note it as the latest
/// selection.
fn play_command(
    library: &WalkLibrary,
    walk: &Walk,
    now: DateTime<Utc>,
    rng: &mut StdRng,
) -> Result<(ControlCommand, LastSelection)> {
    let category = library.catalog().category(&walk.category)?;
    let sequence = library.clips().sequence(walk, category, rng);
    let command = ControlCommand::play_walk(&sequence.walk, now)
        .with_category(&sequence.category)
        .with_intro(sequence.intro)
        .with_outro(sequence.outro)
        .with_audio(sequence.audio);
    let selection = LastSelection {
        walk: sequence.walk,
        category: sequence.category,
        selected_at: now,
    };
    Ok((command, selection))
}

impl<B: EventBus> Controller<B> {
    pub fn new(
        library: WalkLibrary,
        bus: B,
        settings: ControllerSettings,
        clock: Arc<dyn Clock>,
        rng: StdRng,
    ) -> Self {
        let mut liveness = LivenessMonitor::new(settings.heartbeat_timeout);
        for component in &settings.expected {
            liveness.register(component, None);
        }
        let cooldown = CooldownTracker::new(library.cooldown_settings());
        let started_at = clock.now();

        Self {
            library,
            cooldown,
            liveness,
            bus,
            clock,
            rng,
            state: ControllerState::Initializing,
            started_at,
            last_selection: None,
            sweep_interval: settings.sweep_interval,
            metrics: Metrics::default(),
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn library(&self) -> &WalkLibrary {
        &self.library
    }

    pub fn cooldown(&self) -> &CooldownTracker {
        &self.cooldown
    }

    pub fn liveness(&self) -> &LivenessMonitor {
        &self.liveness
    }

    pub fn last_selection(&self) -> Option<&LastSelection> {
        self.last_selection.as_ref()
    }

    pub fn status(&self) -> StatusSnapshot {
        let now = self.clock.now();
        StatusSnapshot {
            state: self.state,
            active_profile: self.library.resolver().active_profile(now).name.clone(),
            uptime_secs: (now - self.started_at).num_seconds().max(0) as u64,
            selections: self.cooldown.recorded(),
            components: self.liveness.reports(now),
            last_selection: self.last_selection.clone(),
        }
    }

    /// Process one event to completion.
    pub async fn handle_event(&mut self, event: BusEvent) -> Result<()> {
        match event {
            BusEvent::Interaction(payload) => {
                let event = InteractionEvent::from_bytes(&payload)?;
                if event.kind.is_trigger() {
                    self.trigger(&event.source).await?;
                } else {
                    trace!(source = %event.source, kind = %event.kind, "Ignoring non-trigger interaction");
                }
                Ok(())
            }
            BusEvent::Heartbeat(payload) => {
                let beat = Heartbeat::from_bytes(&payload)?;
                self.heartbeat(&beat);
                Ok(())
            }
            BusEvent::Api(call) => self.handle_api(call).await,
        }
    }

    fn heartbeat(&mut self, beat: &Heartbeat) {
        let now = self.clock.now();
        match self.liveness.heartbeat(beat, now) {
            HeartbeatOutcome::New => {
                info!(component = %beat.component, role = %beat.role(), host = ?beat.host, "Component checked in");
            }
            HeartbeatOutcome::Recovered => {
                info!(component = %beat.component, "Component recovered");
            }
            HeartbeatOutcome::Refreshed => {
                trace!(component = %beat.component, "Heartbeat");
            }
        }
    }

    /// Run a selection and broadcast the result. When nothing is eligible
    /// the fallback walk is played if one is configured, else stations idle.
    pub async fn trigger(&mut self, source: &str) -> Result<ControlCommand> {
        let now = self.clock.now();
        let selector = self.library.selector();

        let (command, selection) = match selector.select(&mut self.cooldown, now, &mut self.rng) {
            Ok(walk) => {
                let (command, selection) = play_command(&self.library, walk, now, &mut self.rng)?;
                (command, Some(selection))
            }
            Err(Error::Exhausted) => {
                self.metrics.exhausted();
                match self.library.fallback_walk() {
                    Some(fallback) => {
                        warn!(source, fallback, "No eligible walk, playing fallback");
                        let walk = selector.select_named(&mut self.cooldown, fallback, now)?;
                        let (command, selection) =
                            play_command(&self.library, walk, now, &mut self.rng)?;
                        (command, Some(selection))
                    }
                    None => {
                        warn!(source, "No eligible walk, idling stations");
                        (ControlCommand::idle(now), None)
                    }
                }
            }
            Err(e) => return Err(e),
        };

        if let Some(selection) = selection {
            info!(
                source,
                walk = %selection.walk,
                category = %selection.category,
                intro = ?command.intro,
                outro = ?command.outro,
                "Walk selected"
            );
            self.metrics.selection(&selection.category);
            self.last_selection = Some(selection);
        }
        self.publish(&command).await;
        Ok(command)
    }

    /// Play a specific walk now, outside the weighted draw.
    pub async fn play_named(&mut self, walk_id: &str) -> Result<ControlCommand> {
        let now = self.clock.now();
        let walk = self
            .library
            .selector()
            .select_named(&mut self.cooldown, walk_id, now)?;
        let (command, selection) = play_command(&self.library, walk, now, &mut self.rng)?;
        info!(walk = %selection.walk, category = %selection.category, "Walk queued");
        self.metrics.selection(&selection.category);
        self.last_selection = Some(selection);
        self.publish(&command).await;
        Ok(command)
    }

    pub async fn reset(&mut self) -> ControlCommand {
        let command = ControlCommand::reset(self.clock.now());
        self.publish(&command).await;
        command
    }

    /// Publishing is best effort: a failed send is a dropped command.
    async fn publish(&mut self, command: &ControlCommand) {
        match self.bus.publish(command).await {
            Ok(()) => debug!(kind = ?command.kind, walk = ?command.walk, "Command published"),
            Err(e) => {
                warn!(kind = ?command.kind, walk = ?command.walk, "Dropping command: {}", e);
                self.metrics.dropped_command();
            }
        }
    }

    async fn handle_api(&mut self, call: ApiCall) -> Result<()> {
        let request = match ApiRequest::from_bytes(&call.payload) {
            Ok(request) => request,
            Err(e) => {
                call.respond(ApiResponse::error(Uuid::nil(), e.to_string()));
                return Err(e.into());
            }
        };
        let id = request.request_id;
        debug!(request_id = %id, kind = ?request.kind, "API request");

        let response = match (request.kind, request.walk) {
            (ApiRequestKind::StatusQuery, _) => {
                ApiResponse::ok(id, "status").with_status(self.status())
            }
            (ApiRequestKind::ManualTrigger, Some(walk)) => match self.play_named(&walk).await {
                Ok(command) => ApiResponse::ok(id, format!("Playing {walk}")).with_command(command),
                Err(e) => {
                    warn!(request_id = %id, "Manual trigger rejected: {}", e);
                    ApiResponse::error(id, e.to_string())
                }
            },
            (ApiRequestKind::ManualTrigger, None) => match self.trigger(API_SOURCE).await {
                Ok(command) => {
                    let message = match (&command.kind, &command.walk) {
                        (CommandKind::PlayWalk, Some(walk)) => format!("Playing {walk}"),
                        _ => "No eligible walk, stations idled".to_string(),
                    };
                    ApiResponse::ok(id, message).with_command(command)
                }
                Err(e) => {
                    warn!(request_id = %id, "Manual trigger failed: {}", e);
                    ApiResponse::error(id, e.to_string())
                }
            },
            (ApiRequestKind::Reset, _) => {
                let command = self.reset().await;
                ApiResponse::ok(id, "Reset broadcast").with_command(command)
            }
        };

        call.respond(response);
        Ok(())
    }

    /// Log components that went stale since the last sweep.
    pub fn sweep(&mut self) -> Vec<String> {
        let stale = self.liveness.sweep(self.clock.now());
        for component in &stale {
            warn!(component = %component, timeout = ?self.liveness.timeout(), "Component went stale");
        }
        stale
    }

    /// Consume events until `shutdown` fires or every inbound source closes,
    /// then tell stations to reset and release the bus.
    pub async fn run(&mut self, shutdown: CancellationToken) {
        self.state = ControllerState::Running;
        info!(
            walks = self.library.catalog().walk_count(),
            categories = self.library.catalog().categories().len(),
            "Controller running"
        );

        let mut sweep = tokio::time::interval(self.sweep_interval);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("Shutdown requested");
                    break;
                }

                _ = sweep.tick() => {
                    self.sweep();
                }

                event = self.bus.recv() => {
                    match event {
                        Some(event) => {
                            if let Err(e) = self.handle_event(event).await {
                                warn!(reason = e.label(), "Event dropped: {}", e);
                                self.metrics.dropped_event(e.label());
                            }
                        }
                        None => {
                            warn!("Inbound event stream closed");
                            break;
                        }
                    }
                }
            }
        }

        self.shutdown().await;
    }

    async fn shutdown(&mut self) {
        self.state = ControllerState::ShuttingDown;
        let command = self.reset().await;
        debug!(issued_at = %command.issued_at, "Reset broadcast on shutdown");
        self.bus.close().await;
        info!(selections = self.cooldown.recorded(), "Controller stopped");
    }
}
