//! # Countdown Tracker
//!
//! Dated tasks, one-time or recurring, shown as a live "time remaining"
//! countdown, with reminders a day before, an hour before and at the due time.
//!
//! ## Layout
//!
//! The engine is pure and clock-free; callers pass one `now` per batch:
//!
//! - [`recurrence`] rolls overdue recurring tasks forward by whole periods.
//! - [`remaining`] renders "3 days left" / "Overdue" and the calendar label.
//! - [`reminder`] plans the reminder events for a task.
//! - [`projector`] ties these together into display rows and due-date
//!   update requests.
//!
//! Around it sit the collaborators the binary uses: a JSON task store
//! ([`db`]), a JSON reminder outbox ([`notify`]), user [`config`], and the
//! [`service`] flows that apply requests and report failures.
//!
//! ## Quick Start
//!
//! ```bash
//! countdown add "Pay rent" --due 2024-07-01 --repeat monthly
//! countdown add "Standup" --due tomorrow --time 09:30 --repeat daily
//! countdown list
//! countdown remind
//! ```

pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod fields;
pub mod logging;
pub mod notify;
pub mod projector;
pub mod recurrence;
pub mod reminder;
pub mod remaining;
pub mod service;
pub mod task;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{DataPaths, Settings};
pub use db::{JsonTaskStore, NewTask, TaskStore};
pub use error::{EngineError, NotifyError, ServiceError, StoreError, TaskValidationError};
pub use fields::RepeatRule;
pub use notify::{ReminderOutbox, ReminderSink};
pub use projector::{project, project_batch, DueDateUpdateRequest, ProjectedTask, Projection};
pub use recurrence::{compute_effective, Effective};
pub use reminder::{plan, ReminderEvent, ReminderKind};
pub use task::{Task, TaskRecord};
