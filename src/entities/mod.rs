//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod attendance;
pub mod attendance_history;
pub mod grade;
pub mod guardian;
pub mod month;
pub mod payment;
pub mod payment_month;
pub mod payment_plan;
pub mod payment_plan_month;
pub mod receipt;
pub mod student;
pub mod student_guardian;

// Re-export specific types to avoid conflicts
pub use attendance::{Column as AttendanceColumn, Entity as Attendance, Model as AttendanceModel};
pub use attendance_history::{
    AttendanceRecords, AttendanceSnapshot, Column as AttendanceHistoryColumn,
    Entity as AttendanceHistory, Model as AttendanceHistoryModel,
};
pub use grade::{Column as GradeColumn, Entity as Grade, Model as GradeModel};
pub use guardian::{Column as GuardianColumn, Entity as Guardian, Model as GuardianModel};
pub use month::{Column as MonthColumn, Entity as Month, Model as MonthModel};
pub use payment::{Column as PaymentColumn, Entity as Payment, Model as PaymentModel};
pub use payment_month::Entity as PaymentMonth;
pub use payment_plan::{
    Column as PaymentPlanColumn, Entity as PaymentPlan, Model as PaymentPlanModel,
};
pub use payment_plan_month::Entity as PaymentPlanMonth;
pub use receipt::{Column as ReceiptColumn, Entity as Receipt, Model as ReceiptModel};
pub use student::{Column as StudentColumn, Entity as Student, Model as StudentModel};
pub use student_guardian::Entity as StudentGuardian;
