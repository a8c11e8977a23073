//! Payment business logic - Plans, payments, receipts and month proration.
//!
//! A payment's `one_time_fee_paid` flag and its paid months are derived from
//! the receipts recorded against it. [`prorate`] holds the rule as a pure
//! function; [`recompute_months_paid`] applies it to the database and is run
//! whenever a receipt is recorded or a plan changes. Running it twice gives
//! the same result.

use crate::{
    core::validation,
    entities::{
        Month, Payment, PaymentMonth, PaymentPlan, PaymentPlanMonth, Receipt, Student, month,
        payment, payment_month, payment_plan, payment_plan_month, receipt, student,
    },
    errors::{Error, Result},
};
use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Outcome of applying the proration rule to a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Proration {
    /// Sum of all receipts
    pub total_paid: Decimal,
    /// Whether the one-time fee is covered
    pub one_time_fee_paid: bool,
    /// How many of the plan's months are paid. `None` when the plan has no
    /// monthly fee, in which case paid months are only trimmed to the plan.
    pub months_covered: Option<usize>,
}

/// Maps cumulative receipts to a one-time-fee flag and a number of paid months.
///
/// The one-time fee is taken out first. Once it is flagged as paid it stays
/// deducted. Until it is covered no month counts as paid. What remains buys
/// whole months at `monthly_fee`, capped at the number of months in the plan.
#[must_use]
pub fn prorate(
    receipts: &[Decimal],
    one_time_fee: Decimal,
    monthly_fee: Decimal,
    month_count: usize,
    one_time_fee_paid: bool,
) -> Proration {
    let total_paid: Decimal = receipts.iter().copied().sum();
    let mut fee_paid = one_time_fee_paid;
    let mut applicable = total_paid;

    if one_time_fee > Decimal::ZERO {
        if fee_paid || total_paid >= one_time_fee {
            fee_paid = true;
            applicable = total_paid - one_time_fee;
        } else {
            return Proration {
                total_paid,
                one_time_fee_paid: false,
                months_covered: Some(0),
            };
        }
    }

    let months_covered = (monthly_fee > Decimal::ZERO).then(|| {
        let whole = (applicable / monthly_fee).floor();
        if whole <= Decimal::ZERO {
            0
        } else {
            whole.to_usize().map_or(month_count, |m| m.min(month_count))
        }
    });

    Proration {
        total_paid,
        one_time_fee_paid: fee_paid,
        months_covered,
    }
}

/// Default academic year for a date, e.g. `"2024-2025"` for any day of 2024.
#[must_use]
pub fn default_academic_year(today: NaiveDate) -> String {
    format!("{}-{}", today.year(), today.year() + 1)
}

/// A payment plan together with its billable months.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanDetails {
    /// The plan itself
    #[serde(flatten)]
    pub plan: payment_plan::Model,
    /// Months in billing order
    pub months: Vec<month::Model>,
}

/// A payment with its derived state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentDetails {
    /// The payment itself
    #[serde(flatten)]
    pub payment: payment::Model,
    /// Sum of the payment's receipts
    pub total_paid: Decimal,
    /// Months currently covered, in billing order
    pub months_paid: Vec<month::Model>,
}

/// A newly recorded receipt and the payment state it produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordedReceipt {
    /// The inserted receipt
    pub receipt: receipt::Model,
    /// The payment after recomputation
    pub payment: PaymentDetails,
}

/// Fields accepted when creating or updating a payment plan.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlanInput {
    /// Plan name
    pub name: String,
    /// Free-form description
    pub description: String,
    /// Paid once per payment, before any month
    pub one_time_fee: Decimal,
    /// Price of one month
    pub monthly_fee: Decimal,
    /// Months the plan bills for; replaces the current set on update
    pub month_ids: Vec<i64>,
}

impl PlanInput {
    fn validate(&self) -> Result<String> {
        let name = validation::required_text("Plan name", &self.name, 255)?;
        for fee in [self.one_time_fee, self.monthly_fee] {
            if fee < Decimal::ZERO {
                return Err(Error::InvalidAmount {
                    amount: fee.to_string(),
                });
            }
        }
        Ok(name)
    }
}

/// Fields accepted when opening a payment.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentInput {
    /// Paying student
    pub student_id: i64,
    /// Plan being paid
    pub payment_plan_id: i64,
    /// Defaults to the current `YYYY-YYYY+1`
    #[serde(default)]
    pub academic_year: Option<String>,
}

/// Fields accepted when recording a receipt.
#[derive(Debug, Clone, Deserialize)]
pub struct ReceiptInput {
    /// Payment the money goes to
    pub payment_id: i64,
    /// Unique receipt number
    pub receipt_number: String,
    /// Free-form note
    #[serde(default)]
    pub description: String,
    /// Amount received, must be positive
    pub amount_paid: Decimal,
}

/// All months in billing order.
pub async fn list_months(db: &DatabaseConnection) -> Result<Vec<month::Model>> {
    Month::find()
        .order_by_asc(month::Column::SortOrder)
        .all(db)
        .await
        .map_err(Into::into)
}

async fn plan_months<C>(db: &C, plan: &payment_plan::Model) -> Result<Vec<month::Model>>
where
    C: ConnectionTrait,
{
    plan.find_related(Month)
        .order_by_asc(month::Column::SortOrder)
        .all(db)
        .await
        .map_err(Into::into)
}

async fn plan_details<C>(db: &C, plan: payment_plan::Model) -> Result<PlanDetails>
where
    C: ConnectionTrait,
{
    let months = plan_months(db, &plan).await?;
    Ok(PlanDetails { plan, months })
}

async fn replace_plan_months<C>(db: &C, plan_id: i64, month_ids: &[i64]) -> Result<()>
where
    C: ConnectionTrait,
{
    let mut ids = month_ids.to_vec();
    ids.sort_unstable();
    ids.dedup();

    for id in &ids {
        Month::find_by_id(*id)
            .one(db)
            .await?
            .ok_or_else(|| Error::not_found("Month", id))?;
    }

    PaymentPlanMonth::delete_many()
        .filter(payment_plan_month::Column::PaymentPlanId.eq(plan_id))
        .exec(db)
        .await?;

    if !ids.is_empty() {
        let links = ids.into_iter().map(|month_id| payment_plan_month::ActiveModel {
            payment_plan_id: Set(plan_id),
            month_id: Set(month_id),
        });
        PaymentPlanMonth::insert_many(links)
            .exec_without_returning(db)
            .await?;
    }
    Ok(())
}

/// Creates a payment plan billing for the given months.
pub async fn create_plan(db: &DatabaseConnection, input: PlanInput) -> Result<PlanDetails> {
    let name = input.validate()?;

    let txn = db.begin().await?;
    let plan = payment_plan::ActiveModel {
        name: Set(name),
        description: Set(input.description.trim().to_string()),
        one_time_fee: Set(input.one_time_fee),
        monthly_fee: Set(input.monthly_fee),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    replace_plan_months(&txn, plan.id, &input.month_ids).await?;
    let details = plan_details(&txn, plan).await?;
    txn.commit().await?;

    info!("Created payment plan {}", details.plan.name);
    Ok(details)
}

/// Updates a plan and its month set, then recomputes every payment under it.
pub async fn update_plan(
    db: &DatabaseConnection,
    id: i64,
    input: PlanInput,
) -> Result<PlanDetails> {
    let name = input.validate()?;

    let txn = db.begin().await?;
    let existing = PaymentPlan::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Payment plan", id))?;

    let mut active: payment_plan::ActiveModel = existing.into();
    active.name = Set(name);
    active.description = Set(input.description.trim().to_string());
    active.one_time_fee = Set(input.one_time_fee);
    active.monthly_fee = Set(input.monthly_fee);
    let plan = active.update(&txn).await?;
    replace_plan_months(&txn, plan.id, &input.month_ids).await?;

    let payments = Payment::find()
        .filter(payment::Column::PaymentPlanId.eq(plan.id))
        .all(&txn)
        .await?;
    for p in &payments {
        recompute_months_paid(&txn, p.id).await?;
    }

    let details = plan_details(&txn, plan).await?;
    txn.commit().await?;

    info!(
        "Updated payment plan {} ({} payment(s) recomputed)",
        details.plan.name,
        payments.len()
    );
    Ok(details)
}

/// Finds a plan with its months.
pub async fn get_plan(db: &DatabaseConnection, id: i64) -> Result<Option<PlanDetails>> {
    match PaymentPlan::find_by_id(id).one(db).await? {
        Some(plan) => Ok(Some(plan_details(db, plan).await?)),
        None => Ok(None),
    }
}

/// All plans with their months, by name.
pub async fn list_plans(db: &DatabaseConnection) -> Result<Vec<PlanDetails>> {
    let plans = PaymentPlan::find()
        .order_by_asc(payment_plan::Column::Name)
        .all(db)
        .await?;

    let mut details = Vec::with_capacity(plans.len());
    for plan in plans {
        details.push(plan_details(db, plan).await?);
    }
    Ok(details)
}

/// Deletes a plan. Its payments and their receipts are deleted with it, and
/// students following it are left without a plan.
pub async fn delete_plan(db: &DatabaseConnection, id: i64) -> Result<()> {
    let result = PaymentPlan::delete_by_id(id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::not_found("Payment plan", id));
    }
    Ok(())
}

/// Re-derives a payment's one-time-fee flag and paid months from its receipts.
///
/// Takes any connection so it can run inside the caller's transaction.
pub async fn recompute_months_paid<C>(db: &C, payment_id: i64) -> Result<payment::Model>
where
    C: ConnectionTrait,
{
    let payment = Payment::find_by_id(payment_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Payment", payment_id))?;
    let plan = PaymentPlan::find_by_id(payment.payment_plan_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Payment plan", payment.payment_plan_id))?;

    let amounts: Vec<Decimal> = Receipt::find()
        .filter(receipt::Column::PaymentId.eq(payment_id))
        .all(db)
        .await?
        .into_iter()
        .map(|r| r.amount_paid)
        .collect();
    let months = plan_months(db, &plan).await?;

    let proration = prorate(
        &amounts,
        plan.one_time_fee,
        plan.monthly_fee,
        months.len(),
        payment.one_time_fee_paid,
    );
    debug!("Payment {} prorated: {:?}", payment_id, proration);

    let payment = if proration.one_time_fee_paid == payment.one_time_fee_paid {
        payment
    } else {
        let mut active: payment::ActiveModel = payment.into();
        active.one_time_fee_paid = Set(proration.one_time_fee_paid);
        active.update(db).await?
    };

    match proration.months_covered {
        Some(covered) => {
            PaymentMonth::delete_many()
                .filter(payment_month::Column::PaymentId.eq(payment_id))
                .exec(db)
                .await?;

            if covered > 0 {
                let links = months
                    .iter()
                    .take(covered)
                    .map(|m| payment_month::ActiveModel {
                        payment_id: Set(payment_id),
                        month_id: Set(m.id),
                    });
                PaymentMonth::insert_many(links)
                    .exec_without_returning(db)
                    .await?;
            }
        }
        None => {
            // Paid months must stay a subset of the plan's months
            let plan_month_ids: Vec<i64> = months.iter().map(|m| m.id).collect();
            PaymentMonth::delete_many()
                .filter(payment_month::Column::PaymentId.eq(payment_id))
                .filter(payment_month::Column::MonthId.is_not_in(plan_month_ids))
                .exec(db)
                .await?;
        }
    }

    Ok(payment)
}

/// Recomputes one payment in its own transaction.
pub async fn recompute_payment(db: &DatabaseConnection, payment_id: i64) -> Result<PaymentDetails> {
    let txn = db.begin().await?;
    let payment = recompute_months_paid(&txn, payment_id).await?;
    let details = payment_details(&txn, payment).await?;
    txn.commit().await?;
    Ok(details)
}

async fn payment_details<C>(db: &C, payment: payment::Model) -> Result<PaymentDetails>
where
    C: ConnectionTrait,
{
    let total_paid: Decimal = payment
        .find_related(Receipt)
        .all(db)
        .await?
        .iter()
        .map(|r| r.amount_paid)
        .sum();
    let months_paid = payment
        .find_related(Month)
        .order_by_asc(month::Column::SortOrder)
        .all(db)
        .await?;
    Ok(PaymentDetails {
        payment,
        total_paid,
        months_paid,
    })
}

/// Opens a payment for `student_id` under `plan_id` unless one already exists.
///
/// # Returns
/// The new payment, or `None` when the student already pays for that plan
pub async fn ensure_payment_for_plan<C>(
    db: &C,
    student_id: i64,
    plan_id: i64,
) -> Result<Option<payment::Model>>
where
    C: ConnectionTrait,
{
    let existing = Payment::find()
        .filter(payment::Column::StudentId.eq(student_id))
        .filter(payment::Column::PaymentPlanId.eq(plan_id))
        .one(db)
        .await?;
    if existing.is_some() {
        return Ok(None);
    }

    let payment = payment::ActiveModel {
        student_id: Set(Some(student_id)),
        payment_plan_id: Set(plan_id),
        one_time_fee_paid: Set(false),
        academic_year: Set(default_academic_year(Utc::now().date_naive())),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(Some(payment))
}

/// Opens a payment for a student. A student without a plan adopts this one.
pub async fn create_payment(db: &DatabaseConnection, input: PaymentInput) -> Result<PaymentDetails> {
    let academic_year = match input.academic_year.as_deref().map(str::trim) {
        Some(year) if !year.is_empty() => validation::optional_text("Academic year", year, 9)?,
        _ => default_academic_year(Utc::now().date_naive()),
    };

    let txn = db.begin().await?;
    let student = Student::find_by_id(input.student_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Student", input.student_id))?;
    PaymentPlan::find_by_id(input.payment_plan_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Payment plan", input.payment_plan_id))?;

    if student.payment_plan_id.is_none() {
        let mut active: student::ActiveModel = student.into();
        active.payment_plan_id = Set(Some(input.payment_plan_id));
        active.update(&txn).await?;
    }

    let payment = payment::ActiveModel {
        student_id: Set(Some(input.student_id)),
        payment_plan_id: Set(input.payment_plan_id),
        one_time_fee_paid: Set(false),
        academic_year: Set(academic_year),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    let details = payment_details(&txn, payment).await?;
    txn.commit().await?;
    Ok(details)
}

/// Finds a payment with its derived state.
pub async fn get_payment(db: &DatabaseConnection, id: i64) -> Result<Option<PaymentDetails>> {
    match Payment::find_by_id(id).one(db).await? {
        Some(payment) => Ok(Some(payment_details(db, payment).await?)),
        None => Ok(None),
    }
}

/// All payments with their totals, oldest first.
pub async fn list_payments(db: &DatabaseConnection) -> Result<Vec<PaymentDetails>> {
    let payments = Payment::find()
        .order_by_asc(payment::Column::Id)
        .all(db)
        .await?;

    let mut details = Vec::with_capacity(payments.len());
    for payment in payments {
        details.push(payment_details(db, payment).await?);
    }
    Ok(details)
}

/// Deletes a payment and its receipts.
pub async fn delete_payment(db: &DatabaseConnection, id: i64) -> Result<()> {
    let result = Payment::delete_by_id(id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::not_found("Payment", id));
    }
    Ok(())
}

/// Records a receipt and recomputes its payment in the same transaction.
pub async fn record_receipt(db: &DatabaseConnection, input: ReceiptInput) -> Result<RecordedReceipt> {
    if input.amount_paid <= Decimal::ZERO {
        return Err(Error::InvalidAmount {
            amount: input.amount_paid.to_string(),
        });
    }
    let receipt_number = validation::required_text("Receipt number", &input.receipt_number, 100)?;
    let description = validation::optional_text("Description", &input.description, 100)?;

    let txn = db.begin().await?;
    Payment::find_by_id(input.payment_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Payment", input.payment_id))?;

    let duplicate = Receipt::find()
        .filter(receipt::Column::ReceiptNumber.eq(receipt_number.as_str()))
        .one(&txn)
        .await?
        .is_some();
    if duplicate {
        return Err(Error::DuplicateReceipt { receipt_number });
    }

    let receipt = receipt::ActiveModel {
        payment_id: Set(input.payment_id),
        receipt_number: Set(receipt_number),
        description: Set(description),
        amount_paid: Set(input.amount_paid),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let payment = recompute_months_paid(&txn, input.payment_id).await?;
    let payment = payment_details(&txn, payment).await?;
    txn.commit().await?;

    info!(
        "Recorded receipt {} for payment {} ({} paid so far)",
        receipt.receipt_number, receipt.payment_id, payment.total_paid
    );
    Ok(RecordedReceipt { receipt, payment })
}

/// Receipts in the order they were recorded, optionally for one payment.
pub async fn list_receipts(
    db: &DatabaseConnection,
    payment_id: Option<i64>,
) -> Result<Vec<receipt::Model>> {
    let mut query = Receipt::find();
    if let Some(id) = payment_id {
        query = query.filter(receipt::Column::PaymentId.eq(id));
    }
    query
        .order_by_asc(receipt::Column::CreatedAt)
        .order_by_asc(receipt::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}
