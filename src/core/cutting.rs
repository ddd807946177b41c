//! Cutting business logic - Moving produced units from uncut to cut stock.
//!
//! Cuttings are grouped into sessions, one session per cutting run at the
//! table. Each cutting draws from a specific production batch and can never
//! take more than the batch's uncut remainder or the product's uncut stock.
//! Cut sale lines draw on individual cuttings, and a cutting that has sold
//! units can no longer be deleted.

use crate::{
    core::stock::{self, EPSILON, ProductDelta},
    entities::{Cutting, CuttingSession, cutting, cutting_session},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{PaginatorTrait, QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::info;

/// One line of a cutting run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CuttingInput {
    /// Batch to cut from
    pub production_id: i64,
    /// Units to cut
    pub quantity: f64,
}

fn cut_delta(quantity: f64) -> ProductDelta {
    ProductDelta {
        new: -quantity,
        cut: quantity,
        ..ProductDelta::default()
    }
}

/// Applies a cutting of `quantity` units to the batch and product totals.
async fn apply_cut<C>(db: &C, production_id: i64, quantity: f64) -> Result<()>
where
    C: ConnectionTrait,
{
    let batch = stock::adjust_production_cut(db, production_id, quantity).await?;
    stock::apply_product_delta(db, batch.product_id, cut_delta(quantity)).await?;
    Ok(())
}

/// Refuses to reverse a cutting that sale lines have drawn on.
fn ensure_unsold(line: &cutting::Model) -> Result<()> {
    if line.sold > EPSILON {
        return Err(Error::InUse {
            kind: "cutting",
            id: line.id,
            reason: format!("{} units already sold", line.sold),
        });
    }
    Ok(())
}

/// Adds a cutting to an open session, inside the caller's transaction.
///
/// A batch appears at most once per session: cutting the same batch again
/// grows the existing line.
async fn add_cutting_in<C>(
    db: &C,
    session_id: i64,
    input: CuttingInput,
) -> Result<cutting::Model>
where
    C: ConnectionTrait,
{
    stock::validate_quantity(input.quantity)?;

    CuttingSession::find_by_id(session_id)
        .one(db)
        .await?
        .ok_or(Error::RecordNotFound {
            kind: "cutting session",
            id: session_id,
        })?;

    apply_cut(db, input.production_id, input.quantity).await?;

    let existing = Cutting::find()
        .filter(cutting::Column::SessionId.eq(session_id))
        .filter(cutting::Column::ProductionId.eq(input.production_id))
        .one(db)
        .await?;

    let line = if let Some(existing) = existing {
        let quantity = existing.quantity + input.quantity;
        let mut line: cutting::ActiveModel = existing.into();
        line.quantity = Set(quantity);
        line.update(db).await?
    } else {
        cutting::ActiveModel {
            session_id: Set(session_id),
            production_id: Set(input.production_id),
            quantity: Set(input.quantity),
            sold: Set(0.0),
            ..Default::default()
        }
        .insert(db)
        .await?
    };

    Ok(line)
}

/// Records a cutting in an existing session.
///
/// `production.cut += q`, `product.total_new -= q`, `product.total_cut += q`.
pub async fn create_cutting(
    db: &DatabaseConnection,
    session_id: i64,
    production_id: i64,
    quantity: f64,
) -> Result<cutting::Model> {
    let txn = db.begin().await?;
    let line = add_cutting_in(
        &txn,
        session_id,
        CuttingInput {
            production_id,
            quantity,
        },
    )
    .await?;
    txn.commit().await?;

    info!("Cut {quantity} from production #{production_id} in session #{session_id}");
    Ok(line)
}

/// Records a whole cutting run: a new session with all its lines, atomically.
pub async fn create_cutting_run(
    db: &DatabaseConnection,
    user_id: String,
    lines: &[CuttingInput],
) -> Result<(cutting_session::Model, Vec<cutting::Model>)> {
    if lines.is_empty() {
        return Err(Error::Config {
            message: "A cutting run needs at least one batch".to_string(),
        });
    }

    let txn = db.begin().await?;

    let session = cutting_session::ActiveModel {
        created_at: Set(Utc::now()),
        created_by: Set(user_id),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let mut cuttings = Vec::with_capacity(lines.len());
    for input in lines {
        cuttings.push(add_cutting_in(&txn, session.id, *input).await?);
    }

    txn.commit().await?;

    info!(
        "Cutting session #{} recorded with {} lines",
        session.id,
        cuttings.len()
    );
    Ok((session, cuttings))
}

/// Deletes a cutting and moves its units back to uncut stock.
///
/// Refused once any of its units have been sold. When this was the last
/// cutting of its session, the session is deleted too. Returns `true` if the
/// session was removed.
pub async fn delete_cutting(db: &DatabaseConnection, cutting_id: i64) -> Result<bool> {
    let txn = db.begin().await?;

    let line = Cutting::find_by_id(cutting_id)
        .one(&txn)
        .await?
        .ok_or(Error::RecordNotFound {
            kind: "cutting",
            id: cutting_id,
        })?;

    ensure_unsold(&line)?;
    let session_id = line.session_id;
    apply_cut(&txn, line.production_id, -line.quantity).await?;
    line.delete(&txn).await?;

    let remaining = Cutting::find()
        .filter(cutting::Column::SessionId.eq(session_id))
        .count(&txn)
        .await?;
    let session_removed = remaining == 0;
    if session_removed {
        CuttingSession::delete_by_id(session_id).exec(&txn).await?;
    }

    txn.commit().await?;

    info!("Cutting #{cutting_id} deleted");
    if session_removed {
        info!("Cutting session #{session_id} was empty and has been removed");
    }
    Ok(session_removed)
}

/// Deletes a whole cutting session and reverses every cutting in it.
///
/// Refused when any cutting of the session has sold units.
pub async fn delete_cutting_session(db: &DatabaseConnection, session_id: i64) -> Result<()> {
    let txn = db.begin().await?;

    let session = CuttingSession::find_by_id(session_id)
        .one(&txn)
        .await?
        .ok_or(Error::RecordNotFound {
            kind: "cutting session",
            id: session_id,
        })?;

    let lines = Cutting::find()
        .filter(cutting::Column::SessionId.eq(session_id))
        .all(&txn)
        .await?;
    for line in lines {
        ensure_unsold(&line)?;
        apply_cut(&txn, line.production_id, -line.quantity).await?;
        line.delete(&txn).await?;
    }
    session.delete(&txn).await?;

    txn.commit().await?;

    info!("Cutting session #{session_id} deleted");
    Ok(())
}

/// Retrieves a cutting session by its unique ID.
pub async fn get_session_by_id(
    db: &DatabaseConnection,
    session_id: i64,
) -> Result<Option<cutting_session::Model>> {
    CuttingSession::find_by_id(session_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves the cuttings of a session.
pub async fn get_cuttings_for_session(
    db: &DatabaseConnection,
    session_id: i64,
) -> Result<Vec<cutting::Model>> {
    Cutting::find()
        .filter(cutting::Column::SessionId.eq(session_id))
        .order_by_asc(cutting::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves every cutting taken from a batch.
pub async fn get_cuttings_for_production(
    db: &DatabaseConnection,
    production_id: i64,
) -> Result<Vec<cutting::Model>> {
    Cutting::find()
        .filter(cutting::Column::ProductionId.eq(production_id))
        .order_by_asc(cutting::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}
