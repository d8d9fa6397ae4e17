//! Black-box behavioral specifications for the `warden` CLI.
//!
//! Each module exercises one corner of the supervisor end-to-end against
//! the compiled binary and a throwaway project directory, rather than
//! calling library internals directly.

#[path = "specs/prelude.rs"]
mod prelude;

#[path = "specs/lock/stale_lock.rs"]
mod lock_stale_lock;

#[path = "specs/persistence/atomic_write.rs"]
mod persistence_atomic_write;

#[path = "specs/queue/add_and_list.rs"]
mod queue_add_and_list;

#[path = "specs/queue/clear.rs"]
mod queue_clear;

#[path = "specs/queue/pause_resume.rs"]
mod queue_pause_resume;

#[path = "specs/queue/validation.rs"]
mod queue_validation;
