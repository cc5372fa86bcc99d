//! Directory of accounts and reference data
//!
//! Users, departments, device types and provider profiles are owned by the
//! surrounding application. The engine reads them to resolve departments,
//! recipients and providers; the registration helpers here exist so the CLI
//! and tests can populate a fresh database. Passwords are not handled.

use super::db::Database;
use crate::core::{DepartmentId, DeviceTypeId, EmployeeId, ProviderId, UserId, UserType};
use crate::error::{HelpdeskError, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection};

/// Employee fields the lifecycle needs at ticket creation
#[derive(Debug, Clone, Copy, FromRow)]
pub struct EmployeeRecord {
    pub id: EmployeeId,
    pub user_id: UserId,
    pub department_id: DepartmentId,
}

/// Service provider profile with its current workload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Provider {
    pub id: ProviderId,
    pub user_id: UserId,
    pub provider_name: String,
    pub specialization: Option<String>,
    pub email: String,
    pub is_active: bool,
    pub is_available: bool,
    pub max_concurrent_tickets: i64,
    pub rating_average: Option<f64>,
    pub total_ratings: i64,
    /// Tickets currently `assigned` or `in_progress`
    pub current_assignments: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct DeviceType {
    pub id: DeviceTypeId,
    pub type_name: String,
}

#[derive(Debug, Clone)]
pub struct NewEmployee {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub contact_number: Option<String>,
    pub department_id: DepartmentId,
}

#[derive(Debug, Clone)]
pub struct NewProvider {
    pub email: String,
    pub provider_name: String,
    pub specialization: Option<String>,
    pub max_concurrent_tickets: i64,
}

const PROVIDER_SELECT: &str = "SELECT sp.id, sp.user_id, sp.provider_name, sp.specialization, \
     u.email, u.is_active, sp.is_available, sp.max_concurrent_tickets, \
     sp.rating_average, sp.total_ratings, COUNT(t.id) AS current_assignments \
     FROM service_providers sp \
     JOIN users u ON sp.user_id = u.id \
     LEFT JOIN tickets t ON sp.id = t.assigned_provider_id \
         AND t.status IN ('assigned', 'in_progress')";

#[derive(Debug, Clone)]
pub struct Directory {
    db: Database,
}

impl Directory {
    #[must_use]
    pub const fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn add_department(&self, name: &str, category: &str) -> Result<DepartmentId> {
        let result = sqlx::query("INSERT INTO departments (name, category) VALUES (?, ?)")
            .bind(name)
            .bind(category)
            .execute(self.db.pool())
            .await?;
        Ok(DepartmentId(result.last_insert_rowid()))
    }

    pub async fn add_device_type(&self, type_name: &str) -> Result<DeviceTypeId> {
        let result = sqlx::query("INSERT INTO device_types (type_name) VALUES (?)")
            .bind(type_name)
            .execute(self.db.pool())
            .await?;
        Ok(DeviceTypeId(result.last_insert_rowid()))
    }

    /// Register an employee account and profile in one transaction
    pub async fn add_employee(&self, employee: &NewEmployee) -> Result<(UserId, EmployeeId)> {
        let mut tx = self.db.begin().await?;
        let user_id = insert_user(&mut tx, &employee.email, UserType::Employee).await?;
        let result = sqlx::query(
            "INSERT INTO employees (user_id, first_name, last_name, contact_number, department_id) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(&employee.first_name)
        .bind(&employee.last_name)
        .bind(employee.contact_number.as_deref())
        .bind(employee.department_id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok((user_id, EmployeeId(result.last_insert_rowid())))
    }

    /// Register a service provider account and profile in one transaction
    pub async fn add_provider(&self, provider: &NewProvider) -> Result<(UserId, ProviderId)> {
        let mut tx = self.db.begin().await?;
        let user_id = insert_user(&mut tx, &provider.email, UserType::ServiceProvider).await?;
        let result = sqlx::query(
            "INSERT INTO service_providers \
             (user_id, provider_name, specialization, max_concurrent_tickets) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(&provider.provider_name)
        .bind(provider.specialization.as_deref())
        .bind(provider.max_concurrent_tickets)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok((user_id, ProviderId(result.last_insert_rowid())))
    }

    pub async fn add_admin(&self, email: &str) -> Result<UserId> {
        let mut conn = self.db.pool().acquire().await?;
        insert_user(&mut conn, email, UserType::Admin).await
    }

    /// Activate or deactivate an account; returns false for unknown users
    pub async fn set_user_active(&self, user_id: UserId, active: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET is_active = ? WHERE id = ?")
            .bind(active)
            .bind(user_id)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn set_provider_available(&self, provider_id: ProviderId, available: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE service_providers SET is_available = ? WHERE id = ?")
            .bind(available)
            .bind(provider_id)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn device_types(&self) -> Result<Vec<DeviceType>> {
        let types = sqlx::query_as("SELECT id, type_name FROM device_types ORDER BY type_name")
            .fetch_all(self.db.pool())
            .await?;
        Ok(types)
    }

    /// Active providers with their workload, by name
    pub async fn providers(&self) -> Result<Vec<Provider>> {
        let sql = format!(
            "{PROVIDER_SELECT} WHERE u.is_active = 1 GROUP BY sp.id ORDER BY sp.provider_name"
        );
        self.db
            .timed("list_providers", async {
                Ok(sqlx::query_as(&sql).fetch_all(self.db.pool()).await?)
            })
            .await
    }

    /// Providers that can take another ticket, least loaded and best rated first
    pub async fn available_providers(&self) -> Result<Vec<Provider>> {
        let sql = format!(
            "{PROVIDER_SELECT} WHERE u.is_active = 1 AND sp.is_available = 1 \
             GROUP BY sp.id \
             HAVING current_assignments < sp.max_concurrent_tickets \
             ORDER BY current_assignments ASC, sp.rating_average DESC"
        );
        self.db
            .timed("available_providers", async {
                Ok(sqlx::query_as(&sql).fetch_all(self.db.pool()).await?)
            })
            .await
    }

    pub async fn provider(&self, provider_id: ProviderId) -> Result<Option<Provider>> {
        let sql = format!("{PROVIDER_SELECT} WHERE sp.id = ? GROUP BY sp.id");
        let provider = sqlx::query_as(&sql)
            .bind(provider_id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(provider)
    }

    pub(crate) async fn employee(
        conn: &mut SqliteConnection,
        employee_id: EmployeeId,
    ) -> Result<Option<EmployeeRecord>> {
        let record = sqlx::query_as("SELECT id, user_id, department_id FROM employees WHERE id = ?")
            .bind(employee_id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(record)
    }

    pub(crate) async fn provider_exists(conn: &mut SqliteConnection, provider_id: ProviderId) -> Result<bool> {
        let found: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM service_providers WHERE id = ?")
            .bind(provider_id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(found.is_some())
    }

    pub(crate) async fn device_type_exists(
        conn: &mut SqliteConnection,
        device_type_id: DeviceTypeId,
    ) -> Result<bool> {
        let found: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM device_types WHERE id = ?")
            .bind(device_type_id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(found.is_some())
    }

    /// Login account behind a provider profile
    pub async fn provider_user_id(&self, provider_id: ProviderId) -> Result<UserId> {
        let row: Option<(UserId,)> = sqlx::query_as("SELECT user_id FROM service_providers WHERE id = ?")
            .bind(provider_id)
            .fetch_optional(self.db.pool())
            .await?;
        row.map(|(user_id,)| user_id)
            .ok_or_else(|| HelpdeskError::not_found("Provider", provider_id))
    }

    /// Every active admin account
    pub async fn active_admin_ids(&self) -> Result<Vec<UserId>> {
        let rows: Vec<(UserId,)> = sqlx::query_as(
            "SELECT id FROM users WHERE user_type = 'admin' AND is_active = 1 ORDER BY id",
        )
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}

async fn insert_user(conn: &mut SqliteConnection, email: &str, user_type: UserType) -> Result<UserId> {
    let result = sqlx::query("INSERT INTO users (email, user_type, is_active, created_at) VALUES (?, ?, 1, ?)")
        .bind(email)
        .bind(user_type.as_str())
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;
    Ok(UserId(result.last_insert_rowid()))
}
