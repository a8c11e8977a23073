//! Route handlers, one module per area of the registry.

/// Attendance sessions, check-in and the trigger endpoints
pub mod attendance;
/// Server time and dashboard
pub mod general;
/// Grades and grade membership
pub mod grades;
/// Guardians
pub mod guardians;
/// Plans, payments and receipts
pub mod payments;
/// Students
pub mod students;

use serde::Serialize;

/// Body returned by delete endpoints.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Deleted {
    /// Id of the removed record
    pub deleted: i64,
}
