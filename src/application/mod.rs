//! Application layer containing the booking and settlement orchestration.
//!
//! `LessonService` owns the lesson lifecycle, `Scheduler` executes the
//! time-driven follow-ups it persists, and the smaller services cover
//! payouts, support tickets and teacher search.

pub mod catalog;
pub mod commands;
pub mod lifecycle;
pub mod payments;
pub mod payout;
pub mod scheduler;
pub mod support;
