//! Report generation business logic.
//!
//! Summaries are computed with SQL aggregates (`COUNT`, `SUM`, `GROUP BY`)
//! where the database can do the work, and return structured data that a
//! front end can format.

use crate::{
    core::{
        auction_item::count_items_for_session,
        auction_session::{count_sessions, require_session},
        bill::list_bills_for_farmer,
        buyer::count_active_buyers,
        commissioner::require_commissioner,
        farmer::{count_active_farmers, get_farmer_by_id},
        round_currency,
    },
    entities::{
        AuctionItem, Bill, BillPaymentStatus, SessionStatus, auction_item, auction_session, bill,
        farmer,
    },
    errors::{Error, Result},
};
use sea_orm::{FromQueryResult, QueryOrder, QuerySelect, prelude::*, sea_query::Expr};
use tracing::debug;

/// Lots, quantity and sale value of one product within a session.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductTotals {
    pub product_id: i64,
    /// Number of lots offered, sold or not
    pub lots: i64,
    pub total_quantity: f64,
    /// Sum of quantity times rate over the sold lots
    pub gross_amount: f64,
}

#[derive(Debug, FromQueryResult)]
struct ProductTotalsRow {
    product_id: i64,
    lots: i64,
    total_quantity: Option<f64>,
    gross_amount: Option<f64>,
}

impl From<ProductTotalsRow> for ProductTotals {
    fn from(row: ProductTotalsRow) -> Self {
        Self {
            product_id: row.product_id,
            lots: row.lots,
            total_quantity: row.total_quantity.unwrap_or(0.0),
            gross_amount: round_currency(row.gross_amount.unwrap_or(0.0)),
        }
    }
}

/// State of one auction day.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub session: auction_session::Model,
    pub lot_count: u64,
    pub sold_count: u64,
    pub billed_count: u64,
    pub bill_count: u64,
    /// Per-product totals ordered by product ID
    pub products: Vec<ProductTotals>,
}

impl SessionSummary {
    /// Lots still waiting for a buyer.
    #[must_use]
    pub const fn unsold_count(&self) -> u64 {
        self.lot_count.saturating_sub(self.sold_count)
    }

    /// Sale value of the whole session.
    #[must_use]
    pub fn gross_amount(&self) -> f64 {
        round_currency(self.products.iter().map(|p| p.gross_amount).sum())
    }
}

/// Builds the summary of a session, grouping its lots by product.
///
/// # Errors
/// Returns [`Error::NotFound`] for an unknown session.
pub async fn session_summary(db: &DatabaseConnection, session_id: i64) -> Result<SessionSummary> {
    let session = require_session(db, session_id).await?;

    let lot_count = count_items_for_session(db, session_id).await?;
    let sold_count = AuctionItem::find()
        .filter(auction_item::Column::SessionId.eq(session_id))
        .filter(auction_item::Column::Rate.is_not_null())
        .filter(auction_item::Column::BuyerId.is_not_null())
        .count(db)
        .await?;
    let billed_count = AuctionItem::find()
        .filter(auction_item::Column::SessionId.eq(session_id))
        .filter(auction_item::Column::BillId.is_not_null())
        .count(db)
        .await?;
    let bill_count = Bill::find()
        .filter(bill::Column::SessionId.eq(session_id))
        .count(db)
        .await?;

    let rows = AuctionItem::find()
        .select_only()
        .column(auction_item::Column::ProductId)
        .column_as(auction_item::Column::Id.count(), "lots")
        .column_as(auction_item::Column::Quantity.sum(), "total_quantity")
        .column_as(
            Expr::expr(
                Expr::col(auction_item::Column::Quantity)
                    .mul(Expr::col(auction_item::Column::Rate)),
            )
            .sum(),
            "gross_amount",
        )
        .filter(auction_item::Column::SessionId.eq(session_id))
        .group_by(auction_item::Column::ProductId)
        .order_by_asc(auction_item::Column::ProductId)
        .into_model::<ProductTotalsRow>()
        .all(db)
        .await?;
    let products: Vec<ProductTotals> = rows.into_iter().map(Into::into).collect();

    debug!(
        "Session {} summary: {} lots, {} sold, {} billed across {} products",
        session_id,
        lot_count,
        sold_count,
        billed_count,
        products.len()
    );

    Ok(SessionSummary {
        session,
        lot_count,
        sold_count,
        billed_count,
        bill_count,
        products,
    })
}

/// Headline figures for a commissioner.
#[derive(Debug, Clone, PartialEq)]
pub struct CommissionerDashboard {
    pub active_farmers: u64,
    pub active_buyers: u64,
    pub active_sessions: u64,
    pub completed_sessions: u64,
    pub unpaid_bills: u64,
    /// Net payable still owed to farmers
    pub outstanding_payable: f64,
    /// Commission across every bill ever generated
    pub commission_earned: f64,
}

async fn sum_bill_column(
    db: &DatabaseConnection,
    commissioner_id: i64,
    column: bill::Column,
    status: Option<BillPaymentStatus>,
) -> Result<f64> {
    let mut query = Bill::find()
        .select_only()
        .column_as(column.sum(), "total")
        .filter(bill::Column::CommissionerId.eq(commissioner_id));
    if let Some(status) = status {
        query = query.filter(bill::Column::PaymentStatus.eq(status));
    }
    let total = query.into_tuple::<Option<f64>>().one(db).await?.flatten();
    Ok(round_currency(total.unwrap_or(0.0)))
}

/// Collects the dashboard counts and money totals of a commissioner.
pub async fn commissioner_dashboard(
    db: &DatabaseConnection,
    commissioner_id: i64,
) -> Result<CommissionerDashboard> {
    require_commissioner(db, commissioner_id).await?;

    let dashboard = CommissionerDashboard {
        active_farmers: count_active_farmers(db, commissioner_id).await?,
        active_buyers: count_active_buyers(db, commissioner_id).await?,
        active_sessions: count_sessions(db, commissioner_id, Some(SessionStatus::Active)).await?,
        completed_sessions: count_sessions(db, commissioner_id, Some(SessionStatus::Completed))
            .await?,
        unpaid_bills: Bill::find()
            .filter(bill::Column::CommissionerId.eq(commissioner_id))
            .filter(bill::Column::PaymentStatus.eq(BillPaymentStatus::Unpaid))
            .count(db)
            .await?,
        outstanding_payable: sum_bill_column(
            db,
            commissioner_id,
            bill::Column::NetPayable,
            Some(BillPaymentStatus::Unpaid),
        )
        .await?,
        commission_earned: sum_bill_column(
            db,
            commissioner_id,
            bill::Column::CommissionAmount,
            None,
        )
        .await?,
    };

    debug!("Dashboard for commissioner {}: {:?}", commissioner_id, dashboard);
    Ok(dashboard)
}

/// Every bill of a farmer with settlement totals.
#[derive(Debug, Clone)]
pub struct FarmerStatement {
    pub farmer: farmer::Model,
    /// Newest first
    pub bills: Vec<bill::Model>,
    pub total_net: f64,
    pub paid_total: f64,
    pub outstanding_total: f64,
}

/// Builds the statement of a farmer.
///
/// # Errors
/// Returns [`Error::NotFound`] for an unknown farmer.
pub async fn farmer_statement(db: &DatabaseConnection, farmer_id: i64) -> Result<FarmerStatement> {
    let farmer = get_farmer_by_id(db, farmer_id)
        .await?
        .ok_or_else(|| Error::not_found("farmer", farmer_id))?;
    let bills = list_bills_for_farmer(db, farmer_id).await?;

    let (paid, outstanding): (Vec<&bill::Model>, Vec<&bill::Model>) = bills
        .iter()
        .partition(|b| b.payment_status == BillPaymentStatus::Paid);
    let paid_total = round_currency(paid.iter().map(|b| b.net_payable).sum());
    let outstanding_total = round_currency(outstanding.iter().map(|b| b.net_payable).sum());

    Ok(FarmerStatement {
        farmer,
        bills,
        total_net: round_currency(paid_total + outstanding_total),
        paid_total,
        outstanding_total,
    })
}
