//! Provider rating aggregation
//!
//! A provider's `rating_average` and `total_ratings` are always recomputed
//! from every stored rating, never adjusted incrementally.

use crate::core::{EmployeeId, ProviderId, RatingId, TicketId};
use crate::error::{HelpdeskError, Result};
use crate::storage::Database;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;

/// Lowest accepted score
pub const MIN_SCORE: i64 = 1;
/// Highest accepted score
pub const MAX_SCORE: i64 = 5;

/// Aggregate stored on the provider profile
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProviderRating {
    /// `None` while the provider has no ratings
    pub average: Option<f64>,
    pub total: i64,
}

/// A rating about to be stored
#[derive(Debug, Clone)]
pub struct NewRating {
    pub ticket_id: TicketId,
    pub provider_id: ProviderId,
    pub employee_id: EmployeeId,
    pub score: i64,
    pub feedback: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Reject scores outside `1..=5`
pub fn validate_score(score: i64) -> Result<()> {
    if (MIN_SCORE..=MAX_SCORE).contains(&score) {
        Ok(())
    } else {
        Err(HelpdeskError::InvalidRating(format!(
            "Rating must be between {MIN_SCORE} and {MAX_SCORE}, got {score}"
        )))
    }
}

#[derive(Debug, Clone)]
pub struct RatingAggregator {
    db: Database,
}

impl RatingAggregator {
    #[must_use]
    pub const fn new(db: Database) -> Self {
        Self { db }
    }

    /// Store a rating; a second rating for the same ticket is `DuplicateRating`
    pub async fn insert(&self, conn: &mut SqliteConnection, rating: &NewRating) -> Result<RatingId> {
        validate_score(rating.score)?;

        let result = sqlx::query(
            "INSERT INTO ticket_ratings \
             (ticket_id, provider_id, employee_id, rating, feedback, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(rating.ticket_id)
        .bind(rating.provider_id)
        .bind(rating.employee_id)
        .bind(rating.score)
        .bind(rating.feedback.as_deref())
        .bind(rating.created_at)
        .execute(&mut *conn)
        .await;

        match result {
            Ok(done) => Ok(RatingId(done.last_insert_rowid())),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(HelpdeskError::DuplicateRating {
                    ticket_id: rating.ticket_id.get(),
                })
            },
            Err(e) => Err(e.into()),
        }
    }

    /// Recompute the provider aggregate from the full rating set
    pub async fn recompute(
        &self,
        conn: &mut SqliteConnection,
        provider_id: ProviderId,
    ) -> Result<ProviderRating> {
        let (average, total): (Option<f64>, i64) = sqlx::query_as(
            "SELECT AVG(CAST(rating AS REAL)), COUNT(*) FROM ticket_ratings WHERE provider_id = ?",
        )
        .bind(provider_id)
        .fetch_one(&mut *conn)
        .await?;

        let updated = sqlx::query(
            "UPDATE service_providers SET rating_average = ?, total_ratings = ? WHERE id = ?",
        )
        .bind(average)
        .bind(total)
        .bind(provider_id)
        .execute(&mut *conn)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(HelpdeskError::not_found("Provider", provider_id));
        }

        tracing::debug!(provider_id = %provider_id, ?average, total, "Provider rating recomputed");
        Ok(ProviderRating { average, total })
    }

    /// Stored aggregate for a provider
    pub async fn provider_rating(&self, provider_id: ProviderId) -> Result<ProviderRating> {
        let row: Option<(Option<f64>, i64)> = sqlx::query_as(
            "SELECT rating_average, total_ratings FROM service_providers WHERE id = ?",
        )
        .bind(provider_id)
        .fetch_optional(self.db.pool())
        .await?;

        row.map(|(average, total)| ProviderRating { average, total })
            .ok_or_else(|| HelpdeskError::not_found("Provider", provider_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Priority;
    use crate::test_utils::TestDesk;

    fn rating(desk: &TestDesk, ticket_id: TicketId, score: i64) -> NewRating {
        NewRating {
            ticket_id,
            provider_id: desk.provider_id,
            employee_id: desk.employee_id,
            score,
            feedback: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_validate_score_bounds() {
        assert!(validate_score(1).is_ok());
        assert!(validate_score(5).is_ok());
        assert!(matches!(validate_score(0), Err(HelpdeskError::InvalidRating(_))));
        assert!(matches!(validate_score(6), Err(HelpdeskError::InvalidRating(_))));
    }

    #[tokio::test]
    async fn test_average_of_three_ratings() {
        let desk = TestDesk::new().await;
        let mut tickets = Vec::new();
        for name in ["one", "two", "three"] {
            tickets.push(desk.insert_raw_ticket(name, Priority::Low).await);
        }

        let mut conn = desk.db.pool().acquire().await.unwrap();
        for (ticket_id, score) in tickets.into_iter().zip([5, 3, 4]) {
            desk.ratings
                .insert(&mut conn, &rating(&desk, ticket_id, score))
                .await
                .unwrap();
        }
        let aggregate = desk.ratings.recompute(&mut conn, desk.provider_id).await.unwrap();
        drop(conn);

        assert_eq!(aggregate.total, 3);
        assert!((aggregate.average.unwrap() - 4.0).abs() < f64::EPSILON);
        assert_eq!(desk.ratings.provider_rating(desk.provider_id).await.unwrap(), aggregate);
    }

    #[tokio::test]
    async fn test_no_ratings_means_no_average() {
        let desk = TestDesk::new().await;
        let mut conn = desk.db.pool().acquire().await.unwrap();
        let aggregate = desk.ratings.recompute(&mut conn, desk.provider_id).await.unwrap();
        assert_eq!(aggregate, ProviderRating { average: None, total: 0 });
    }

    #[tokio::test]
    async fn test_second_rating_for_ticket_is_duplicate() {
        let desk = TestDesk::new().await;
        let ticket_id = desk.insert_raw_ticket("Headset", Priority::Low).await;

        let mut conn = desk.db.pool().acquire().await.unwrap();
        desk.ratings
            .insert(&mut conn, &rating(&desk, ticket_id, 4))
            .await
            .unwrap();
        let err = desk
            .ratings
            .insert(&mut conn, &rating(&desk, ticket_id, 2))
            .await
            .unwrap_err();
        assert!(matches!(err, HelpdeskError::DuplicateRating { .. }));
    }

    #[tokio::test]
    async fn test_recompute_unknown_provider() {
        let desk = TestDesk::new().await;
        let mut conn = desk.db.pool().acquire().await.unwrap();
        let err = desk.ratings.recompute(&mut conn, ProviderId(999)).await.unwrap_err();
        assert!(matches!(err, HelpdeskError::NotFound { .. }));
    }
}
