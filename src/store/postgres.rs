//! Postgres store backend.
//!
//! Conditional updates are expressed as `UPDATE ... WHERE id = $1 AND
//! status = $2`; a zero row count reports a CAS conflict. The one-live-bid
//! rule is backed by a partial unique index (see migrations).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::prelude::*;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{
    Bid, BidStatus, EvaluationCriterion, Project, ProjectStatus, Rfp, RfpCategory, RfpStatus,
};

use super::{
    BidTransition, CasOutcome, ProcurementStore, RfpTransition, StoreError, StoreResult,
};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_db_err(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        // 23505: unique_violation
        if db.code().as_deref() == Some("23505") {
            return StoreError::UniqueViolation;
        }
    }
    StoreError::Unavailable(e.to_string())
}

fn cents_to_decimal(cents: i64) -> Decimal {
    Decimal::from(cents) / Decimal::from(100)
}

fn decimal_to_cents(amount: Decimal) -> StoreResult<i64> {
    amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|cents| cents.to_i64())
        .ok_or_else(|| StoreError::Decode(format!("amount out of range for cents: {amount}")))
}

/// Database row for RFP
#[derive(Debug, sqlx::FromRow)]
struct RfpRow {
    id: Uuid,
    municipality_id: Uuid,
    created_by: Uuid,
    title: String,
    description: String,
    category: String,
    budget_min: Option<Decimal>,
    budget_max: Option<Decimal>,
    currency: String,
    deadline: Option<DateTime<Utc>>,
    requirements: Vec<String>,
    evaluation_criteria: Json<Vec<EvaluationCriterion>>,
    status: String,
    published_at: Option<DateTime<Utc>>,
    selected_bid_id: Option<Uuid>,
    project_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RfpRow> for Rfp {
    type Error = StoreError;

    fn try_from(row: RfpRow) -> StoreResult<Self> {
        let category = serde_json::from_value(serde_json::Value::String(row.category.clone()))
            .unwrap_or(RfpCategory::Other);
        Ok(Self {
            id: row.id,
            municipality_id: row.municipality_id,
            created_by: row.created_by,
            title: row.title,
            description: row.description,
            category,
            budget_min: row.budget_min.map(decimal_to_cents).transpose()?,
            budget_max: row.budget_max.map(decimal_to_cents).transpose()?,
            currency: row.currency,
            deadline: row.deadline,
            requirements: row.requirements,
            evaluation_criteria: row.evaluation_criteria.0,
            status: RfpStatus::parse(&row.status).unwrap_or(RfpStatus::Draft),
            published_at: row.published_at,
            selected_bid_id: row.selected_bid_id,
            project_id: row.project_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Database row for bid
#[derive(Debug, sqlx::FromRow)]
struct BidRow {
    id: Uuid,
    rfp_id: Uuid,
    developer_id: Uuid,
    solution_id: Option<Uuid>,
    proposal: String,
    price: Decimal,
    currency: String,
    timeline: String,
    status: String,
    project_id: Option<Uuid>,
    submitted_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BidRow> for Bid {
    type Error = StoreError;

    fn try_from(row: BidRow) -> StoreResult<Self> {
        Ok(Self {
            id: row.id,
            rfp_id: row.rfp_id,
            developer_id: row.developer_id,
            solution_id: row.solution_id,
            proposal: row.proposal,
            price: decimal_to_cents(row.price)?,
            currency: row.currency,
            timeline: row.timeline,
            status: BidStatus::parse(&row.status).unwrap_or(BidStatus::Submitted),
            project_id: row.project_id,
            submitted_at: row.submitted_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Database row for project
#[derive(Debug, sqlx::FromRow)]
struct ProjectRow {
    id: Uuid,
    rfp_id: Uuid,
    winning_bid_id: Uuid,
    solution_id: Option<Uuid>,
    municipality_id: Uuid,
    developer_id: Uuid,
    budget: Decimal,
    currency: String,
    status: String,
    award_key: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProjectRow> for Project {
    type Error = StoreError;

    fn try_from(row: ProjectRow) -> StoreResult<Self> {
        Ok(Self {
            id: row.id,
            rfp_id: row.rfp_id,
            winning_bid_id: row.winning_bid_id,
            solution_id: row.solution_id,
            municipality_id: row.municipality_id,
            developer_id: row.developer_id,
            budget: decimal_to_cents(row.budget)?,
            currency: row.currency,
            status: ProjectStatus::parse(&row.status).unwrap_or(ProjectStatus::Planning),
            award_key: row.award_key,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn category_str(category: &RfpCategory) -> String {
    match serde_json::to_value(category) {
        Ok(serde_json::Value::String(s)) => s,
        _ => "other".to_string(),
    }
}

const RFP_COLUMNS: &str = "id, municipality_id, created_by, title, description, category, \
     budget_min, budget_max, currency, deadline, requirements, evaluation_criteria, \
     status, published_at, selected_bid_id, project_id, created_at, updated_at";

const BID_COLUMNS: &str = "id, rfp_id, developer_id, solution_id, proposal, price, currency, \
     timeline, status, project_id, submitted_at, created_at, updated_at";

const PROJECT_COLUMNS: &str = "id, rfp_id, winning_bid_id, solution_id, municipality_id, \
     developer_id, budget, currency, status, award_key, created_at, updated_at";

#[async_trait]
impl ProcurementStore for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| ())
            .map_err(map_db_err)
    }

    async fn insert_rfp(&self, rfp: &Rfp) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO rfps (id, municipality_id, created_by, title, description, category,
                budget_min, budget_max, currency, deadline, requirements, evaluation_criteria,
                status, published_at, selected_bid_id, project_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            "#,
        )
        .bind(rfp.id)
        .bind(rfp.municipality_id)
        .bind(rfp.created_by)
        .bind(&rfp.title)
        .bind(&rfp.description)
        .bind(category_str(&rfp.category))
        .bind(rfp.budget_min.map(cents_to_decimal))
        .bind(rfp.budget_max.map(cents_to_decimal))
        .bind(&rfp.currency)
        .bind(rfp.deadline)
        .bind(&rfp.requirements)
        .bind(Json(&rfp.evaluation_criteria))
        .bind(rfp.status.as_str())
        .bind(rfp.published_at)
        .bind(rfp.selected_bid_id)
        .bind(rfp.project_id)
        .bind(rfp.created_at)
        .bind(rfp.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(())
    }

    async fn get_rfp(&self, id: Uuid) -> StoreResult<Option<Rfp>> {
        let row = sqlx::query_as::<_, RfpRow>(&format!(
            "SELECT {RFP_COLUMNS} FROM rfps WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;
        row.map(Rfp::try_from).transpose()
    }

    async fn list_rfps(&self, status: Option<RfpStatus>) -> StoreResult<Vec<Rfp>> {
        let rows = match status {
            Some(status) => {
                sqlx::query_as::<_, RfpRow>(&format!(
                    "SELECT {RFP_COLUMNS} FROM rfps WHERE status = $1 ORDER BY created_at"
                ))
                .bind(status.as_str())
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, RfpRow>(&format!(
                    "SELECT {RFP_COLUMNS} FROM rfps ORDER BY created_at"
                ))
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(map_db_err)?;
        rows.into_iter().map(Rfp::try_from).collect()
    }

    async fn update_rfp_if_status(
        &self,
        id: Uuid,
        expected: RfpStatus,
        transition: RfpTransition,
    ) -> StoreResult<CasOutcome> {
        let result = match transition {
            RfpTransition::Publish { published_at } => {
                sqlx::query(
                    r#"
                    UPDATE rfps
                    SET status = 'published', published_at = $3, updated_at = NOW()
                    WHERE id = $1 AND status = $2
                    "#,
                )
                .bind(id)
                .bind(expected.as_str())
                .bind(published_at)
                .execute(&self.pool)
                .await
            }
            RfpTransition::Close {
                selected_bid_id,
                project_id,
            } => {
                sqlx::query(
                    r#"
                    UPDATE rfps
                    SET status = 'closed', selected_bid_id = $3, project_id = $4, updated_at = NOW()
                    WHERE id = $1 AND status = $2
                    "#,
                )
                .bind(id)
                .bind(expected.as_str())
                .bind(selected_bid_id)
                .bind(project_id)
                .execute(&self.pool)
                .await
            }
        }
        .map_err(map_db_err)?;

        Ok(if result.rows_affected() == 1 {
            CasOutcome::Applied
        } else {
            CasOutcome::Conflict
        })
    }

    async fn insert_bid(&self, bid: &Bid) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO bids (id, rfp_id, developer_id, solution_id, proposal, price, currency,
                timeline, status, project_id, submitted_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(bid.id)
        .bind(bid.rfp_id)
        .bind(bid.developer_id)
        .bind(bid.solution_id)
        .bind(&bid.proposal)
        .bind(cents_to_decimal(bid.price))
        .bind(&bid.currency)
        .bind(&bid.timeline)
        .bind(bid.status.as_str())
        .bind(bid.project_id)
        .bind(bid.submitted_at)
        .bind(bid.created_at)
        .bind(bid.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(())
    }

    async fn get_bid(&self, id: Uuid) -> StoreResult<Option<Bid>> {
        let row = sqlx::query_as::<_, BidRow>(&format!(
            "SELECT {BID_COLUMNS} FROM bids WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;
        row.map(Bid::try_from).transpose()
    }

    async fn list_bids(&self, rfp_id: Uuid) -> StoreResult<Vec<Bid>> {
        let rows = sqlx::query_as::<_, BidRow>(&format!(
            "SELECT {BID_COLUMNS} FROM bids WHERE rfp_id = $1 ORDER BY submitted_at"
        ))
        .bind(rfp_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;
        rows.into_iter().map(Bid::try_from).collect()
    }

    async fn find_submitted_bid(
        &self,
        rfp_id: Uuid,
        developer_id: Uuid,
    ) -> StoreResult<Option<Bid>> {
        let row = sqlx::query_as::<_, BidRow>(&format!(
            "SELECT {BID_COLUMNS} FROM bids \
             WHERE rfp_id = $1 AND developer_id = $2 AND status = 'submitted'"
        ))
        .bind(rfp_id)
        .bind(developer_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;
        row.map(Bid::try_from).transpose()
    }

    async fn update_bid_if_status(
        &self,
        id: Uuid,
        expected: BidStatus,
        transition: BidTransition,
    ) -> StoreResult<CasOutcome> {
        let result = match transition {
            BidTransition::Accept { project_id } => {
                sqlx::query(
                    r#"
                    UPDATE bids
                    SET status = 'accepted', project_id = $3, updated_at = NOW()
                    WHERE id = $1 AND status = $2
                    "#,
                )
                .bind(id)
                .bind(expected.as_str())
                .bind(project_id)
                .execute(&self.pool)
                .await
            }
            BidTransition::Reject => {
                sqlx::query(
                    r#"
                    UPDATE bids
                    SET status = 'rejected', updated_at = NOW()
                    WHERE id = $1 AND status = $2
                    "#,
                )
                .bind(id)
                .bind(expected.as_str())
                .execute(&self.pool)
                .await
            }
        }
        .map_err(map_db_err)?;

        Ok(if result.rows_affected() == 1 {
            CasOutcome::Applied
        } else {
            CasOutcome::Conflict
        })
    }

    async fn insert_project(&self, project: &Project) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO projects (id, rfp_id, winning_bid_id, solution_id, municipality_id,
                developer_id, budget, currency, status, award_key, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(project.id)
        .bind(project.rfp_id)
        .bind(project.winning_bid_id)
        .bind(project.solution_id)
        .bind(project.municipality_id)
        .bind(project.developer_id)
        .bind(cents_to_decimal(project.budget))
        .bind(&project.currency)
        .bind(project.status.as_str())
        .bind(&project.award_key)
        .bind(project.created_at)
        .bind(project.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(())
    }

    async fn get_project(&self, id: Uuid) -> StoreResult<Option<Project>> {
        let row = sqlx::query_as::<_, ProjectRow>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;
        row.map(Project::try_from).transpose()
    }

    async fn find_award_project(
        &self,
        rfp_id: Uuid,
        winning_bid_id: Uuid,
    ) -> StoreResult<Option<Project>> {
        let row = sqlx::query_as::<_, ProjectRow>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects \
             WHERE rfp_id = $1 AND winning_bid_id = $2"
        ))
        .bind(rfp_id)
        .bind(winning_bid_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;
        row.map(Project::try_from).transpose()
    }

    async fn delete_project(&self, id: Uuid) -> StoreResult<()> {
        sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn cents_round_trip_through_decimal() {
        let amount = cents_to_decimal(300_000);
        assert_eq!(amount, Decimal::new(3000_00, 2));
        assert_eq!(decimal_to_cents(amount).unwrap(), 300_000);
    }

    #[test]
    fn out_of_range_amount_is_a_decode_error() {
        let err = decimal_to_cents(Decimal::MAX).unwrap_err();
        assert!(matches!(err, StoreError::Decode(_)));
    }
}
