//! Bill generation and settlement.
//!
//! A bill collects every sold lot of one product that one farmer brought to
//! one session. Generation snapshots the commissioner's commission rate,
//! subtracts commission and any other named charges from the gross sale value,
//! and links the lots to the bill, all inside a single database transaction.
//!
//! Bills move from `UNPAID` to `PAID` exactly once. Paying or deleting a bill
//! refreshes the payment status of its session.

use crate::{
    config::Settings,
    core::{
        auction_session::{refresh_payment_status, require_session},
        commissioner::require_commissioner,
        farmer::get_farmer_by_id,
        product::get_product_by_id,
        require_text, round_currency,
    },
    entities::{AuctionItem, Bill, BillPaymentStatus, auction_item, bill},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*, sea_query::Expr};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Named deductions such as porterage or transport, keyed by charge name.
pub type OtherCharges = BTreeMap<String, f64>;

/// Money figures of a bill before it is stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BillAmounts {
    pub total_quantity: f64,
    pub gross_amount: f64,
    pub commission_rate: f64,
    pub commission_amount: f64,
    pub other_charges_total: f64,
    pub net_payable: f64,
}

/// Validates charges and returns them keyed by trimmed name.
fn normalize_charges(charges: &OtherCharges) -> Result<OtherCharges> {
    let mut normalized = OtherCharges::new();
    for (name, &amount) in charges {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::validation("Charge name cannot be empty"));
        }
        if !amount.is_finite() || amount < 0.0 {
            return Err(Error::InvalidAmount { amount });
        }
        if normalized.insert(name.to_string(), amount).is_some() {
            return Err(Error::validation(format!(
                "Charge '{name}' is listed more than once"
            )));
        }
    }
    Ok(normalized)
}

fn charges_total(charges: &OtherCharges) -> f64 {
    round_currency(charges.values().sum())
}

fn net_payable(gross_amount: f64, commission_amount: f64, other_total: f64) -> Result<f64> {
    let net = round_currency(gross_amount - commission_amount - other_total);
    if net < 0.0 {
        return Err(Error::validation(format!(
            "Deductions exceed the gross amount by {}",
            -net
        )));
    }
    Ok(net)
}

/// Computes the figures of a bill from its lots.
///
/// # Errors
/// Returns an error if there are no lots, a lot is unsold, a charge is
/// negative or not finite, two charge names are equal once trimmed, or the
/// deductions exceed the gross amount.
pub fn calculate_bill_amounts(
    items: &[auction_item::Model],
    commission_rate: f64,
    other_charges: &OtherCharges,
) -> Result<BillAmounts> {
    if items.is_empty() {
        return Err(Error::validation("A bill needs at least one lot"));
    }

    let mut total_quantity = 0.0;
    let mut gross = 0.0;
    for item in items {
        let amount = item.amount().filter(|_| item.is_sold()).ok_or_else(|| {
            Error::invalid_state(format!("Lot {} has not been sold", item.id))
        })?;
        total_quantity += item.quantity;
        gross += amount;
    }

    let gross_amount = round_currency(gross);
    let commission_amount = round_currency(gross_amount * commission_rate / 100.0);
    let other_total = charges_total(&normalize_charges(other_charges)?);

    Ok(BillAmounts {
        total_quantity,
        gross_amount,
        commission_rate,
        commission_amount,
        other_charges_total: other_total,
        net_payable: net_payable(gross_amount, commission_amount, other_total)?,
    })
}

/// Expects charges already passed through `normalize_charges`.
fn charges_to_json(charges: &OtherCharges) -> Json {
    Json::Object(
        charges
            .iter()
            .map(|(name, amount)| (name.clone(), Json::from(*amount)))
            .collect(),
    )
}

/// Reads the stored `other_charges` column back into a map.
pub fn charges_from_json(value: &Json) -> Result<OtherCharges> {
    if value.is_null() {
        return Ok(OtherCharges::new());
    }
    serde_json::from_value(value.clone())
        .map_err(|e| Error::Database(DbErr::Json(format!("Malformed other_charges: {e}"))))
}

async fn next_bill_number<C>(db: &C, prefix: &str, date: NaiveDate) -> Result<String>
where
    C: ConnectionTrait,
{
    let stem = format!("{}-{}-", prefix.trim(), date.format("%Y%m%d"));

    // LIKE ignores case and treats `_` as a wildcard, so re-check the stem exactly
    let numbers: Vec<String> = Bill::find()
        .select_only()
        .column(bill::Column::BillNumber)
        .filter(bill::Column::BillNumber.starts_with(stem.as_str()))
        .into_tuple()
        .all(db)
        .await?;
    let last = numbers
        .iter()
        .filter_map(|number| number.strip_prefix(stem.as_str()))
        .filter_map(|sequence| sequence.parse::<u32>().ok())
        .max()
        .unwrap_or(0);

    Ok(format!("{stem}{:04}", last + 1))
}

/// Generates the bill for a farmer's product in a session.
///
/// # Errors
/// Returns an error if:
/// - The session, farmer or product does not exist, or the farmer belongs to
///   another commissioner
/// - A bill already exists for the combination ([`Error::Conflict`])
/// - The farmer brought no lots of the product ([`Error::Validation`])
/// - Any of those lots is still unsold ([`Error::InvalidState`])
/// - A charge is invalid or the deductions exceed the gross amount
pub async fn generate_bill(
    db: &DatabaseConnection,
    settings: &Settings,
    farmer_id: i64,
    product_id: i64,
    session_id: i64,
    other_charges: OtherCharges,
) -> Result<bill::Model> {
    let other_charges = normalize_charges(&other_charges)?;

    let txn = db.begin().await?;

    let session = require_session(&txn, session_id).await?;
    let farmer = get_farmer_by_id(&txn, farmer_id)
        .await?
        .ok_or_else(|| Error::not_found("farmer", farmer_id))?;
    if farmer.commissioner_id != session.commissioner_id {
        return Err(Error::validation(format!(
            "Farmer {farmer_id} does not sell in session {session_id}"
        )));
    }
    get_product_by_id(&txn, product_id)
        .await?
        .ok_or_else(|| Error::not_found("product", product_id))?;

    let existing = Bill::find()
        .filter(bill::Column::FarmerId.eq(farmer_id))
        .filter(bill::Column::ProductId.eq(product_id))
        .filter(bill::Column::SessionId.eq(session_id))
        .one(&txn)
        .await?;
    if let Some(existing) = existing {
        return Err(Error::conflict(format!(
            "Bill {} already covers farmer {farmer_id}, product {product_id}, session {session_id}",
            existing.bill_number
        )));
    }

    let items = AuctionItem::find()
        .filter(auction_item::Column::SessionId.eq(session_id))
        .filter(auction_item::Column::FarmerId.eq(farmer_id))
        .filter(auction_item::Column::ProductId.eq(product_id))
        .filter(auction_item::Column::BillId.is_null())
        .order_by_asc(auction_item::Column::Id)
        .all(&txn)
        .await?;

    let commissioner = require_commissioner(&txn, session.commissioner_id).await?;
    let amounts = calculate_bill_amounts(&items, commissioner.commission_rate, &other_charges)?;
    let bill_number = next_bill_number(&txn, &settings.bill_number_prefix, session.date).await?;

    let now = chrono::Utc::now();
    let bill = bill::ActiveModel {
        bill_number: Set(bill_number),
        farmer_id: Set(farmer_id),
        commissioner_id: Set(commissioner.id),
        product_id: Set(product_id),
        session_id: Set(session_id),
        total_quantity: Set(amounts.total_quantity),
        gross_amount: Set(amounts.gross_amount),
        commission_rate: Set(amounts.commission_rate),
        commission_amount: Set(amounts.commission_amount),
        other_charges: Set(charges_to_json(&other_charges)),
        net_payable: Set(amounts.net_payable),
        payment_status: Set(BillPaymentStatus::Unpaid),
        payment_method: Set(None),
        payment_date: Set(None),
        notes: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let item_ids: Vec<i64> = items.iter().map(|item| item.id).collect();
    AuctionItem::update_many()
        .col_expr(auction_item::Column::BillId, Expr::value(bill.id))
        .col_expr(auction_item::Column::UpdatedAt, Expr::value(now))
        .filter(auction_item::Column::Id.is_in(item_ids))
        .exec(&txn)
        .await?;

    refresh_payment_status(&txn, session_id).await?;
    txn.commit().await?;

    info!(
        "Generated bill {} (ID: {}) for farmer {}: {} lots, gross {}, net {}",
        bill.bill_number,
        bill.id,
        farmer_id,
        items.len(),
        bill.gross_amount,
        bill.net_payable
    );
    Ok(bill)
}

/// Finds a bill by its unique ID.
pub async fn get_bill_by_id<C>(db: &C, bill_id: i64) -> Result<Option<bill::Model>>
where
    C: ConnectionTrait,
{
    Bill::find_by_id(bill_id).one(db).await.map_err(Into::into)
}

async fn require_bill<C>(db: &C, bill_id: i64) -> Result<bill::Model>
where
    C: ConnectionTrait,
{
    get_bill_by_id(db, bill_id)
        .await?
        .ok_or_else(|| Error::not_found("bill", bill_id))
}

/// Finds a bill by its unique bill number.
pub async fn get_bill_by_number(
    db: &DatabaseConnection,
    bill_number: &str,
) -> Result<Option<bill::Model>> {
    Bill::find()
        .filter(bill::Column::BillNumber.eq(bill_number.trim()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Bills of a session ordered by bill number.
pub async fn list_bills_for_session(
    db: &DatabaseConnection,
    session_id: i64,
) -> Result<Vec<bill::Model>> {
    Bill::find()
        .filter(bill::Column::SessionId.eq(session_id))
        .order_by_asc(bill::Column::BillNumber)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Bills of a farmer, newest first.
pub async fn list_bills_for_farmer(
    db: &DatabaseConnection,
    farmer_id: i64,
) -> Result<Vec<bill::Model>> {
    Bill::find()
        .filter(bill::Column::FarmerId.eq(farmer_id))
        .order_by_desc(bill::Column::CreatedAt)
        .order_by_desc(bill::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Unpaid bills of a commissioner, oldest first.
pub async fn list_unpaid_bills(
    db: &DatabaseConnection,
    commissioner_id: i64,
) -> Result<Vec<bill::Model>> {
    Bill::find()
        .filter(bill::Column::CommissionerId.eq(commissioner_id))
        .filter(bill::Column::PaymentStatus.eq(BillPaymentStatus::Unpaid))
        .order_by_asc(bill::Column::CreatedAt)
        .order_by_asc(bill::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Lots settled by a bill.
pub async fn list_items_for_bill(
    db: &DatabaseConnection,
    bill_id: i64,
) -> Result<Vec<auction_item::Model>> {
    AuctionItem::find()
        .filter(auction_item::Column::BillId.eq(bill_id))
        .order_by_asc(auction_item::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

fn ensure_unpaid(bill: &bill::Model) -> Result<()> {
    if bill.payment_status == BillPaymentStatus::Paid {
        warn!("Bill {} is already paid", bill.bill_number);
        return Err(Error::invalid_state(format!(
            "Bill {} is already paid",
            bill.bill_number
        )));
    }
    Ok(())
}

/// Replaces the other charges of an unpaid bill and recomputes its net payable.
pub async fn update_other_charges(
    db: &DatabaseConnection,
    bill_id: i64,
    other_charges: OtherCharges,
) -> Result<bill::Model> {
    let other_charges = normalize_charges(&other_charges)?;
    let other_total = charges_total(&other_charges);
    let existing = require_bill(db, bill_id).await?;
    ensure_unpaid(&existing)?;

    let net = net_payable(existing.gross_amount, existing.commission_amount, other_total)?;

    let mut bill: bill::ActiveModel = existing.into();
    bill.other_charges = Set(charges_to_json(&other_charges));
    bill.net_payable = Set(net);
    bill.updated_at = Set(chrono::Utc::now());

    let updated = bill.update(db).await?;
    info!(
        "Bill {} charges updated, net payable now {}",
        updated.bill_number, updated.net_payable
    );
    Ok(updated)
}

/// Marks an unpaid bill as paid.
///
/// `payment_date` defaults to now. The session's payment status is refreshed
/// in the same transaction.
///
/// # Errors
/// Returns [`Error::InvalidState`] if the bill is already paid and
/// [`Error::Validation`] for an empty payment method.
pub async fn record_payment(
    db: &DatabaseConnection,
    bill_id: i64,
    payment_method: &str,
    payment_date: Option<DateTimeUtc>,
    notes: Option<String>,
) -> Result<bill::Model> {
    let payment_method = require_text(payment_method, "Payment method")?;

    let txn = db.begin().await?;

    let existing = require_bill(&txn, bill_id).await?;
    ensure_unpaid(&existing)?;
    let session_id = existing.session_id;

    let now = chrono::Utc::now();
    let mut bill: bill::ActiveModel = existing.into();
    bill.payment_status = Set(BillPaymentStatus::Paid);
    bill.payment_method = Set(Some(payment_method));
    bill.payment_date = Set(Some(payment_date.unwrap_or(now)));
    bill.notes = Set(notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()));
    bill.updated_at = Set(now);
    let updated = bill.update(&txn).await?;

    refresh_payment_status(&txn, session_id).await?;
    txn.commit().await?;

    info!(
        "Bill {} paid: {} via {:?}",
        updated.bill_number, updated.net_payable, updated.payment_method
    );
    Ok(updated)
}

/// Deletes an unpaid bill and releases its lots so it can be regenerated.
pub async fn delete_bill(db: &DatabaseConnection, bill_id: i64) -> Result<()> {
    let txn = db.begin().await?;

    let bill = require_bill(&txn, bill_id).await?;
    ensure_unpaid(&bill)?;
    let session_id = bill.session_id;
    let bill_number = bill.bill_number.clone();

    let released = AuctionItem::update_many()
        .col_expr(auction_item::Column::BillId, Expr::value(Option::<i64>::None))
        .col_expr(auction_item::Column::UpdatedAt, Expr::value(chrono::Utc::now()))
        .filter(auction_item::Column::BillId.eq(bill_id))
        .exec(&txn)
        .await?;
    bill.delete(&txn).await?;

    refresh_payment_status(&txn, session_id).await?;
    txn.commit().await?;

    info!(
        "Deleted bill {} and released {} lots",
        bill_number, released.rows_affected
    );
    Ok(())
}

/// Number of bills of a commissioner, optionally restricted to one payment status.
pub async fn count_bills(
    db: &DatabaseConnection,
    commissioner_id: i64,
    status: Option<BillPaymentStatus>,
) -> Result<u64> {
    let mut query = Bill::find().filter(bill::Column::CommissionerId.eq(commissioner_id));
    if let Some(status) = status {
        query = query.filter(bill::Column::PaymentStatus.eq(status));
    }
    let count = query.count(db).await?;
    debug!("Commissioner {} has {} bills ({:?})", commissioner_id, count, status);
    Ok(count)
}
