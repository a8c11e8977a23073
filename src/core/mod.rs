//! Core business logic, independent of the HTTP layer.
//!
//! Every operation takes a `SeaORM` connection and returns [`crate::errors::Result`].

pub mod attendance;
pub mod grade;
pub mod guardian;
pub mod payment;
pub mod report;
pub mod schedule;
pub mod student;
mod validation;
