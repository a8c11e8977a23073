//! Attendance lifecycle - Opening sessions, marking records and archiving.
//!
//! A grade's session is the set of its rows in `attendances`. Sessions are
//! opened by the generation pass (or manually), rows are toggled while the
//! class runs, and the archive pass turns them into one immutable
//! `attendance_history` entry once the lesson is over.
//!
//! Both passes work grade by grade, each grade in its own transaction. A
//! failing grade is rolled back, logged and reported; the pass carries on with
//! the next grade.
//!
//! Student counters move exactly once per row. Rows created by the session
//! opener start with `counted = false` and are counted when archived; rows
//! recorded directly with a known outcome are counted immediately.

use crate::{
    core::{
        schedule::{self, GenerationTrigger},
        student as students,
    },
    entities::{
        Attendance, AttendanceHistory, AttendanceRecords, AttendanceSnapshot, Grade, Student,
        attendance, attendance_history, grade, student,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, error, info, instrument, warn};

/// What the generation pass did for one grade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GenerationOutcome {
    /// Rows were created
    Generated {
        /// Number of rows created
        records: usize,
        /// Rule that opened the session
        trigger: GenerationTrigger,
    },
    /// A session is already open (or, when forced, every student already has a row)
    AlreadyOpen,
    /// The grade has no active students
    NoActiveStudents,
    /// Neither the class time nor the reset time is near
    NotDue,
    /// The grade's transaction failed and was rolled back
    Failed {
        /// Error description
        error: String,
    },
}

/// Generation outcome for one grade
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GradeGeneration {
    /// Grade id
    pub grade_id: i64,
    /// Grade name
    pub grade: String,
    /// What happened
    #[serde(flatten)]
    pub outcome: GenerationOutcome,
}

/// Result of one generation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
    /// Instant the pass evaluated the schedules at
    pub ran_at: DateTime<Utc>,
    /// Whether the schedule checks were bypassed
    pub forced: bool,
    /// One entry per grade
    pub grades: Vec<GradeGeneration>,
}

impl GenerationReport {
    /// Total rows created across all grades.
    #[must_use]
    pub fn records_created(&self) -> usize {
        self.grades
            .iter()
            .map(|g| match g.outcome {
                GenerationOutcome::Generated { records, .. } => records,
                _ => 0,
            })
            .sum()
    }

    /// Number of grades whose transaction failed.
    #[must_use]
    pub fn failures(&self) -> usize {
        self.grades
            .iter()
            .filter(|g| matches!(g.outcome, GenerationOutcome::Failed { .. }))
            .count()
    }
}

/// What the archive pass did for one grade with an open session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AutosaveOutcome {
    /// The session was written to history and cleared
    Archived {
        /// New history entry
        history_id: i64,
        /// Students marked present
        present: usize,
        /// Students marked absent
        absent: usize,
        /// Hours since the session opened
        elapsed_hours: f64,
    },
    /// The lesson is still running
    NotDue {
        /// Hours since the session opened
        elapsed_hours: f64,
    },
    /// The grade's transaction failed and was rolled back
    Failed {
        /// Error description
        error: String,
    },
}

/// Archive outcome for one grade
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeAutosave {
    /// Grade id
    pub grade_id: i64,
    /// Grade name
    pub grade: String,
    /// What happened
    #[serde(flatten)]
    pub outcome: AutosaveOutcome,
}

/// Result of one archive pass. Grades without an open session are not listed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AutosaveReport {
    /// Instant the pass compared durations against
    pub ran_at: DateTime<Utc>,
    /// Whether the duration checks were bypassed
    pub forced: bool,
    /// One entry per grade with open rows
    pub grades: Vec<GradeAutosave>,
}

impl AutosaveReport {
    /// Number of sessions archived.
    #[must_use]
    pub fn archived(&self) -> usize {
        self.grades
            .iter()
            .filter(|g| matches!(g.outcome, AutosaveOutcome::Archived { .. }))
            .count()
    }

    /// Number of grades whose transaction failed.
    #[must_use]
    pub fn failures(&self) -> usize {
        self.grades
            .iter()
            .filter(|g| matches!(g.outcome, AutosaveOutcome::Failed { .. }))
            .count()
    }
}

enum SessionRows {
    Created(usize),
    AlreadyOpen,
    NoActiveStudents,
}

/// Creates the rows of a session for every active student of the grade.
///
/// With `fill_missing` an existing session is topped up with rows for students
/// that have none, instead of being left alone.
async fn create_session_rows<C>(
    db: &C,
    grade: &grade::Model,
    now: DateTime<Utc>,
    fill_missing: bool,
) -> Result<SessionRows>
where
    C: ConnectionTrait,
{
    let existing = Attendance::find()
        .filter(attendance::Column::GradeId.eq(grade.id))
        .all(db)
        .await?;
    if !existing.is_empty() && !fill_missing {
        return Ok(SessionRows::AlreadyOpen);
    }

    let active = students::active_students_in_grade(db, grade.id).await?;
    if active.is_empty() {
        return Ok(SessionRows::NoActiveStudents);
    }

    let covered: HashSet<i64> = existing.iter().filter_map(|a| a.student_id).collect();
    let rows: Vec<attendance::ActiveModel> = active
        .iter()
        .filter(|s| !covered.contains(&s.id))
        .map(|s| attendance::ActiveModel {
            student_id: Set(Some(s.id)),
            grade_id: Set(grade.id),
            present: Set(false),
            counted: Set(false),
            created_at: Set(now),
            ..Default::default()
        })
        .collect();
    if rows.is_empty() {
        return Ok(SessionRows::AlreadyOpen);
    }

    let created = rows.len();
    Attendance::insert_many(rows)
        .exec_without_returning(db)
        .await?;
    Ok(SessionRows::Created(created))
}

async fn generate_for_grade(
    db: &DatabaseConnection,
    grade: &grade::Model,
    now: DateTime<Utc>,
    force: bool,
) -> Result<GenerationOutcome> {
    let Some(trigger) = schedule::generation_trigger(grade, now, force) else {
        return Ok(GenerationOutcome::NotDue);
    };

    let txn = db.begin().await?;
    let outcome = match create_session_rows(&txn, grade, now, force).await? {
        SessionRows::Created(records) => GenerationOutcome::Generated { records, trigger },
        SessionRows::AlreadyOpen => GenerationOutcome::AlreadyOpen,
        SessionRows::NoActiveStudents => GenerationOutcome::NoActiveStudents,
    };
    txn.commit().await?;
    Ok(outcome)
}

/// Opens sessions for every grade whose class or reset time is near `now`.
///
/// `force` bypasses the schedule; grades that already have a session then only
/// get rows for students missing one.
#[instrument(skip(db))]
pub async fn generate_attendance_sheets(
    db: &DatabaseConnection,
    now: DateTime<Utc>,
    force: bool,
) -> Result<GenerationReport> {
    let grades = Grade::find()
        .order_by_asc(grade::Column::Name)
        .all(db)
        .await?;

    let mut report = GenerationReport {
        ran_at: now,
        forced: force,
        grades: Vec::with_capacity(grades.len()),
    };

    for grade in grades {
        let outcome = match generate_for_grade(db, &grade, now, force).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Attendance generation failed for {}: {}", grade.name, e);
                GenerationOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };

        match &outcome {
            GenerationOutcome::Generated { records, trigger } => info!(
                "Generated attendance sheet for {} with {} student(s) ({:?})",
                grade.name, records, trigger
            ),
            GenerationOutcome::AlreadyOpen => {
                warn!("Attendance for {} already exists, skipping", grade.name);
            }
            GenerationOutcome::NoActiveStudents => {
                warn!("No active students in {}, skipping", grade.name);
            }
            GenerationOutcome::NotDue | GenerationOutcome::Failed { .. } => {
                debug!("{}: {:?}", grade.name, outcome);
            }
        }

        report.grades.push(GradeGeneration {
            grade_id: grade.id,
            grade: grade.name,
            outcome,
        });
    }

    info!(
        "Generation pass done: {} record(s) created, {} failure(s)",
        report.records_created(),
        report.failures()
    );
    Ok(report)
}

/// Summary of a session that was just archived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivedSession {
    /// The new history entry
    pub history: attendance_history::Model,
    /// Creation time of the session's oldest row
    pub opened_at: DateTime<Utc>,
    /// Students marked present
    pub present: usize,
    /// Students marked absent
    pub absent: usize,
}

/// Writes a grade's open rows to history, counts the uncounted ones and deletes
/// them. Returns `None` when the grade has no open rows.
///
/// Rows without a student fail the whole archive with
/// [`Error::OrphanedAttendance`]; the caller's transaction then rolls back.
async fn archive_session<C>(db: &C, grade: &grade::Model) -> Result<Option<ArchivedSession>>
where
    C: ConnectionTrait,
{
    let rows: Vec<(attendance::Model, Option<student::Model>)> = Attendance::find()
        .find_also_related(Student)
        .filter(attendance::Column::GradeId.eq(grade.id))
        .order_by_asc(attendance::Column::CreatedAt)
        .order_by_asc(attendance::Column::Id)
        .all(db)
        .await?;

    let Some((first, _)) = rows.first() else {
        return Ok(None);
    };
    let opened_at = first.created_at;

    let orphans = rows.iter().filter(|(_, s)| s.is_none()).count();
    if orphans > 0 {
        return Err(Error::OrphanedAttendance {
            grade: grade.name.clone(),
            count: orphans,
        });
    }

    let mut snapshots = Vec::with_capacity(rows.len());
    let mut ids = Vec::with_capacity(rows.len());
    for (record, student) in rows.iter().filter_map(|(r, s)| s.as_ref().map(|s| (r, s))) {
        if !record.counted {
            students::increment_attendance_counter(db, student.id, record.present).await?;
        }
        snapshots.push(AttendanceSnapshot {
            first_name: student.first_name.clone(),
            last_name: student.last_name.clone(),
            present: record.present,
        });
        ids.push(record.id);
    }

    let present = snapshots.iter().filter(|s| s.present).count();
    let absent = snapshots.len() - present;

    let history = attendance_history::ActiveModel {
        grade_id: Set(Some(grade.id)),
        attendance_date: Set(opened_at.date_naive()),
        records: Set(AttendanceRecords(snapshots)),
        ..Default::default()
    }
    .insert(db)
    .await?;

    Attendance::delete_many()
        .filter(attendance::Column::Id.is_in(ids))
        .exec(db)
        .await?;

    Ok(Some(ArchivedSession {
        history,
        opened_at,
        present,
        absent,
    }))
}

async fn autosave_grade(
    db: &DatabaseConnection,
    grade: &grade::Model,
    now: DateTime<Utc>,
    force: bool,
) -> Result<Option<AutosaveOutcome>> {
    let oldest = Attendance::find()
        .filter(attendance::Column::GradeId.eq(grade.id))
        .order_by_asc(attendance::Column::CreatedAt)
        .one(db)
        .await?;
    let Some(oldest) = oldest else {
        return Ok(None);
    };

    let elapsed_hours = schedule::elapsed_hours(oldest.created_at, now);
    if !force && !schedule::autosave_due(oldest.created_at, now, grade.lesson_duration) {
        return Ok(Some(AutosaveOutcome::NotDue { elapsed_hours }));
    }

    let txn = db.begin().await?;
    let archived = archive_session(&txn, grade).await?;
    txn.commit().await?;

    Ok(archived.map(|a| AutosaveOutcome::Archived {
        history_id: a.history.id,
        present: a.present,
        absent: a.absent,
        elapsed_hours,
    }))
}

/// Archives every session that has run for its grade's lesson duration.
///
/// `force` archives every open session regardless of duration.
#[instrument(skip(db))]
pub async fn autosave_attendance_sheets(
    db: &DatabaseConnection,
    now: DateTime<Utc>,
    force: bool,
) -> Result<AutosaveReport> {
    let grades = Grade::find()
        .order_by_asc(grade::Column::Name)
        .all(db)
        .await?;

    let mut report = AutosaveReport {
        ran_at: now,
        forced: force,
        grades: Vec::new(),
    };

    for grade in grades {
        let outcome = match autosave_grade(db, &grade, now, force).await {
            Ok(Some(outcome)) => outcome,
            Ok(None) => continue,
            Err(e) => {
                error!("Attendance autosave failed for {}: {}", grade.name, e);
                AutosaveOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };

        if let AutosaveOutcome::Archived {
            present,
            absent,
            elapsed_hours,
            ..
        } = &outcome
        {
            info!(
                "Saved and cleared attendance for {} after {:.1} hour(s): {} present, {} absent",
                grade.name, elapsed_hours, present, absent
            );
        }

        report.grades.push(GradeAutosave {
            grade_id: grade.id,
            grade: grade.name,
            outcome,
        });
    }

    info!(
        "Autosave pass done: {} session(s) archived, {} failure(s)",
        report.archived(),
        report.failures()
    );
    Ok(report)
}

async fn find_grade<C>(db: &C, grade_id: i64) -> Result<grade::Model>
where
    C: ConnectionTrait,
{
    Grade::find_by_id(grade_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Grade", grade_id))
}

/// Opens a session for one grade right away.
///
/// # Returns
/// The number of rows created, `0` when the grade has no active students
pub async fn open_session(
    db: &DatabaseConnection,
    grade_id: i64,
    now: DateTime<Utc>,
) -> Result<usize> {
    let txn = db.begin().await?;
    let grade = find_grade(&txn, grade_id).await?;

    let created = match create_session_rows(&txn, &grade, now, false).await? {
        SessionRows::Created(n) => n,
        SessionRows::NoActiveStudents => 0,
        SessionRows::AlreadyOpen => {
            return Err(Error::SessionAlreadyOpen { grade: grade.name });
        }
    };
    txn.commit().await?;

    info!("Opened attendance session for {} ({} student(s))", grade.name, created);
    Ok(created)
}

/// Archives one grade's session immediately, without the duration check.
///
/// Returns `None` when the grade has no open session.
pub async fn archive_grade_session(
    db: &DatabaseConnection,
    grade_id: i64,
) -> Result<Option<attendance_history::Model>> {
    let txn = db.begin().await?;
    let grade = find_grade(&txn, grade_id).await?;
    let archived = archive_session(&txn, &grade).await?;
    txn.commit().await?;

    Ok(archived.map(|a| {
        info!(
            "Archived attendance for {}: {} present, {} absent",
            grade.name, a.present, a.absent
        );
        a.history
    }))
}

/// Marks an open row present or absent.
///
/// Rows recorded directly are already counted and cannot be changed.
pub async fn mark_attendance(
    db: &DatabaseConnection,
    attendance_id: i64,
    present: bool,
) -> Result<attendance::Model> {
    let record = Attendance::find_by_id(attendance_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Attendance", attendance_id))?;
    if record.counted {
        return Err(Error::validation(
            "Attendance was recorded with a final value and cannot be changed",
        ));
    }

    let mut active: attendance::ActiveModel = record.into();
    active.present = Set(present);
    active.update(db).await.map_err(Into::into)
}

/// Result of a successful check-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckIn {
    /// The student who checked in
    pub student: student::Model,
    /// Their row, now present
    pub attendance: attendance::Model,
}

/// Marks the student with this card UUID present in their open session.
pub async fn check_in(db: &DatabaseConnection, uuid: Uuid) -> Result<CheckIn> {
    let student = students::get_student_by_uuid(db, uuid)
        .await?
        .ok_or_else(|| Error::not_found("Student", uuid))?;

    let record = Attendance::find()
        .filter(attendance::Column::StudentId.eq(student.id))
        .filter(attendance::Column::Counted.eq(false))
        .order_by_desc(attendance::Column::CreatedAt)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Open attendance", &student.student_id))?;

    let mut active: attendance::ActiveModel = record.into();
    active.present = Set(true);
    let attendance = active.update(db).await?;

    info!("{} checked in", student.full_name());
    Ok(CheckIn {
        student,
        attendance,
    })
}

/// Fields accepted when recording a finished attendance directly.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordInput {
    /// Student the record is for
    pub student_id: i64,
    /// Grade of the session; defaults to the student's grade
    #[serde(default)]
    pub grade_id: Option<i64>,
    /// Final value
    pub present: bool,
}

/// Records an attendance whose outcome is already known.
///
/// The student's counter moves now and the row is marked counted, so the
/// archive pass snapshots it without counting it again.
pub async fn record_attendance(
    db: &DatabaseConnection,
    input: RecordInput,
    now: DateTime<Utc>,
) -> Result<attendance::Model> {
    let txn = db.begin().await?;
    let student = Student::find_by_id(input.student_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Student", input.student_id))?;
    let grade_id = input
        .grade_id
        .or(student.grade_id)
        .ok_or_else(|| Error::validation("Student is not assigned to a grade"))?;
    find_grade(&txn, grade_id).await?;

    let record = attendance::ActiveModel {
        student_id: Set(Some(student.id)),
        grade_id: Set(grade_id),
        present: Set(input.present),
        counted: Set(true),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    students::increment_attendance_counter(&txn, student.id, input.present).await?;
    txn.commit().await?;

    Ok(record)
}

/// An open row with its student's name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpenRecord {
    /// The row
    #[serde(flatten)]
    pub attendance: attendance::Model,
    /// "First Last", or `None` for a row that lost its student
    pub student_name: Option<String>,
}

/// One grade's open session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpenSession {
    /// The grade
    pub grade: grade::Model,
    /// Creation time of the oldest row
    pub opened_at: DateTime<Utc>,
    /// Rows marked present
    pub present_count: usize,
    /// Rows marked absent
    pub absent_count: usize,
    /// Rows in creation order
    pub records: Vec<OpenRecord>,
}

/// All open sessions, grouped by grade and ordered by grade name.
pub async fn list_open_sessions(db: &DatabaseConnection) -> Result<Vec<OpenSession>> {
    let rows = Attendance::find()
        .find_also_related(Student)
        .order_by_asc(attendance::Column::CreatedAt)
        .order_by_asc(attendance::Column::Id)
        .all(db)
        .await?;

    let mut by_grade: BTreeMap<i64, Vec<OpenRecord>> = BTreeMap::new();
    for (record, owner) in rows {
        by_grade.entry(record.grade_id).or_default().push(OpenRecord {
            student_name: owner.as_ref().map(student::Model::full_name),
            attendance: record,
        });
    }

    let grades = Grade::find()
        .filter(grade::Column::Id.is_in(by_grade.keys().copied().collect::<Vec<_>>()))
        .order_by_asc(grade::Column::Name)
        .all(db)
        .await?;

    let mut sessions = Vec::with_capacity(grades.len());
    for grade in grades {
        let Some(records) = by_grade.remove(&grade.id) else {
            continue;
        };
        let Some(opened_at) = records.first().map(|r| r.attendance.created_at) else {
            continue;
        };
        let present_count = records.iter().filter(|r| r.attendance.present).count();
        sessions.push(OpenSession {
            absent_count: records.len() - present_count,
            present_count,
            opened_at,
            grade,
            records,
        });
    }
    Ok(sessions)
}

/// A history entry with its name lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    /// The stored snapshot
    #[serde(flatten)]
    pub history: attendance_history::Model,
    /// Names of students marked present
    pub present_students: Vec<String>,
    /// Names of students marked absent
    pub absent_students: Vec<String>,
}

impl From<attendance_history::Model> for HistoryEntry {
    fn from(history: attendance_history::Model) -> Self {
        Self {
            present_students: history.present_students(),
            absent_students: history.absent_students(),
            history,
        }
    }
}

/// Archived sessions of a grade, newest first.
pub async fn get_history_for_grade(
    db: &DatabaseConnection,
    grade_id: i64,
) -> Result<Vec<HistoryEntry>> {
    find_grade(db, grade_id).await?;

    let history = AttendanceHistory::find()
        .filter(attendance_history::Column::GradeId.eq(grade_id))
        .order_by_desc(attendance_history::Column::AttendanceDate)
        .order_by_desc(attendance_history::Column::Id)
        .all(db)
        .await?;
    Ok(history.into_iter().map(HistoryEntry::from).collect())
}
