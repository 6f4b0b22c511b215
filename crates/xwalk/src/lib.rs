//! xwalk - crosswalk installation controller
//!
//! Listens for button presses, timer expiries and scheduler ticks from the
//! stations, picks the next walk animation, and broadcasts what to play.
//!
//! ```text
//!  interaction ─┐                  ┌─► Selector ─► Cooldown Tracker
//!  heartbeat ───┼─► event queue ─► Controller    ─► Weight Resolver
//!  api ─────────┘                  ├─► Liveness Monitor
//!                                  └─► control PUB ─► stations
//! ```
//!
//! Selection draws a category by weight under the profile the schedule
//! menu has active, then a walk uniformly among the category's walks that
//! are out of cooldown.

pub mod bus;
pub mod catalog;
pub mod clock;
pub mod controller;
pub mod cooldown;
pub mod error;
pub mod liveness;
pub mod selector;
pub mod sequence;
pub mod telemetry;
pub mod weights;

pub use bus::{BusEvent, EventBus, MemoryBus, MemoryBusHandle, ZmqBus};
pub use catalog::{Catalog, Category, Walk, WalkLibrary};
pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::{Controller, ControllerSettings};
pub use cooldown::{CooldownSettings, CooldownTracker};
pub use error::{Error, Result};
pub use liveness::{HeartbeatOutcome, LivenessMonitor};
pub use selector::Selector;
pub use sequence::{ClipPools, Sequence};
pub use weights::{ScheduleEntry, ScheduleMenu, WeightProfile, WeightResolver};

pub use xwalkproto::ControllerState;
