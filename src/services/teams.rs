use crate::{
    db::DbPool,
    entities::team::{self, generate_team_code, Entity as TeamEntity},
    errors::ServiceError,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

/// Minimal team identity for foreign keys and per-team limits. Onboarding
/// and membership live with the registration collaborator.
#[derive(Clone)]
pub struct TeamService {
    db_pool: Arc<DbPool>,
}

impl TeamService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Creates a team with a freshly generated code. The unique index on
    /// `teams.team_code` is the collision guard; a violation surfaces as a
    /// database error rather than a silent retry.
    #[instrument(skip(self))]
    pub async fn create_team(&self) -> Result<team::Model, ServiceError> {
        let db = &*self.db_pool;

        let new_team = team::ActiveModel {
            team_code: Set(generate_team_code()),
            ..Default::default()
        };

        let new_team = new_team.insert(db).await.map_err(|e| {
            error!(error = %e, "Failed to create team");
            ServiceError::DatabaseError(e)
        })?;

        info!(team_id = %new_team.id, team_code = %new_team.team_code, "Created team");
        Ok(new_team)
    }

    #[instrument(skip(self), fields(team_id = %team_id))]
    pub async fn get_team(&self, team_id: Uuid) -> Result<Option<team::Model>, ServiceError> {
        let db = &*self.db_pool;

        TeamEntity::find_by_id(team_id).one(db).await.map_err(|e| {
            error!(error = %e, team_id = %team_id, "Failed to fetch team");
            ServiceError::DatabaseError(e)
        })
    }

    /// Looks a team up by its code. Codes are stored uppercase; the lookup
    /// normalizes, so "ab12cd34" finds "AB12CD34".
    #[instrument(skip(self), fields(team_code = %team_code))]
    pub async fn get_team_by_code(
        &self,
        team_code: &str,
    ) -> Result<Option<team::Model>, ServiceError> {
        let db = &*self.db_pool;
        let normalized = team_code.trim().to_uppercase();

        TeamEntity::find()
            .filter(team::Column::TeamCode.eq(normalized))
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to fetch team by code");
                ServiceError::DatabaseError(e)
            })
    }
}
