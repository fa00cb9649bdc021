use crate::{
    db::DbPool,
    entities::category::{self, Entity as CategoryEntity},
    entities::hardware::{self, Entity as HardwareEntity},
    entities::hardware_category::{self, Entity as HardwareCategoryEntity},
    errors::ServiceError,
};
use sea_orm::{
    ActiveModelTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateHardwareRequest {
    #[validate(length(min = 1, message = "Hardware name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Model number is required"))]
    pub model_number: String,
    #[validate(length(min = 1, message = "Manufacturer is required"))]
    pub manufacturer: String,
    #[validate(url(message = "Datasheet must be a valid URL"))]
    pub datasheet_url: String,
    #[validate(range(min = 0, message = "Quantity cannot be negative"))]
    pub quantity_available: i32,
    #[validate(range(min = 0, message = "Per-team limit cannot be negative"))]
    pub max_per_team: Option<i32>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, message = "Category name is required"))]
    pub name: String,
    #[validate(range(min = 0, message = "Per-team limit cannot be negative"))]
    pub max_per_team: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HardwareListResponse {
    pub hardware: Vec<hardware::Model>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Seeds and reads the records the engine allocates against: hardware
/// items, categories, and the bindings between them. Editing workflows
/// live with the admin collaborator, not here.
#[derive(Clone)]
pub struct CatalogService {
    db_pool: Arc<DbPool>,
}

impl CatalogService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_hardware(
        &self,
        request: CreateHardwareRequest,
    ) -> Result<hardware::Model, ServiceError> {
        request.validate()?;

        let db = &*self.db_pool;
        let hardware = hardware::ActiveModel {
            name: Set(request.name),
            model_number: Set(request.model_number),
            manufacturer: Set(request.manufacturer),
            datasheet_url: Set(request.datasheet_url),
            quantity_available: Set(request.quantity_available),
            max_per_team: Set(request.max_per_team),
            notes: Set(request.notes),
            ..Default::default()
        };

        let hardware = hardware.insert(db).await.map_err(|e| {
            error!(error = %e, "Failed to create hardware");
            ServiceError::DatabaseError(e)
        })?;

        info!(hardware_id = %hardware.id, name = %hardware.name, "Created hardware");
        Ok(hardware)
    }

    #[instrument(skip(self), fields(hardware_id = %hardware_id))]
    pub async fn get_hardware(
        &self,
        hardware_id: Uuid,
    ) -> Result<Option<hardware::Model>, ServiceError> {
        let db = &*self.db_pool;

        HardwareEntity::find_by_id(hardware_id)
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, hardware_id = %hardware_id, "Failed to fetch hardware");
                ServiceError::DatabaseError(e)
            })
    }

    #[instrument(skip(self))]
    pub async fn list_hardware(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<HardwareListResponse, ServiceError> {
        let db = &*self.db_pool;

        let paginator = HardwareEntity::find()
            .order_by_asc(hardware::Column::Name)
            .paginate(db, per_page);

        let total = paginator.num_items().await.map_err(|e| {
            error!(error = %e, "Failed to count hardware");
            ServiceError::DatabaseError(e)
        })?;

        let hardware = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(|e| {
                error!(error = %e, page = page, per_page = per_page, "Failed to fetch hardware page");
                ServiceError::DatabaseError(e)
            })?;

        Ok(HardwareListResponse {
            hardware,
            total,
            page,
            per_page,
        })
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_category(
        &self,
        request: CreateCategoryRequest,
    ) -> Result<category::Model, ServiceError> {
        request.validate()?;

        let db = &*self.db_pool;
        let cat = category::ActiveModel {
            name: Set(request.name),
            max_per_team: Set(request.max_per_team),
            ..Default::default()
        };

        let cat = cat.insert(db).await.map_err(|e| {
            error!(error = %e, "Failed to create category");
            ServiceError::DatabaseError(e)
        })?;

        info!(category_id = %cat.id, name = %cat.name, "Created category");
        Ok(cat)
    }

    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<category::Model>, ServiceError> {
        let db = &*self.db_pool;

        CategoryEntity::find()
            .order_by_asc(category::Column::Name)
            .all(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to list categories");
                ServiceError::DatabaseError(e)
            })
    }

    /// Binds a hardware item to a category. Idempotent: binding an already
    /// bound pair is a no-op.
    #[instrument(skip(self), fields(hardware_id = %hardware_id, category_id = %category_id))]
    pub async fn assign_category(
        &self,
        hardware_id: Uuid,
        category_id: Uuid,
    ) -> Result<(), ServiceError> {
        let db = &*self.db_pool;

        HardwareEntity::find_by_id(hardware_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::not_found("Hardware", hardware_id))?;

        CategoryEntity::find_by_id(category_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::not_found("Category", category_id))?;

        let existing = HardwareCategoryEntity::find_by_id((hardware_id, category_id))
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        if existing.is_some() {
            return Ok(());
        }

        let binding = hardware_category::ActiveModel {
            hardware_id: Set(hardware_id),
            category_id: Set(category_id),
        };

        binding.insert(db).await.map_err(|e| {
            error!(error = %e, "Failed to bind hardware to category");
            ServiceError::DatabaseError(e)
        })?;

        info!(hardware_id = %hardware_id, category_id = %category_id, "Bound hardware to category");
        Ok(())
    }

    /// The categories a hardware item belongs to.
    #[instrument(skip(self), fields(hardware_id = %hardware_id))]
    pub async fn categories_for_hardware(
        &self,
        hardware_id: Uuid,
    ) -> Result<Vec<category::Model>, ServiceError> {
        let db = &*self.db_pool;

        let hardware = HardwareEntity::find_by_id(hardware_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::not_found("Hardware", hardware_id))?;

        hardware
            .find_related(CategoryEntity)
            .order_by_asc(category::Column::Name)
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)
    }
}
