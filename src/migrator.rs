use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_teams_table::Migration),
            Box::new(m20250101_000002_create_categories_table::Migration),
            Box::new(m20250101_000003_create_hardware_table::Migration),
            Box::new(m20250101_000004_create_hardware_categories_table::Migration),
            Box::new(m20250101_000005_create_orders_table::Migration),
            Box::new(m20250101_000006_create_order_items_table::Migration),
            Box::new(m20250101_000007_create_incidents_table::Migration),
        ]
    }
}

// Migration implementations

mod m20250101_000001_create_teams_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000001_create_teams_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Create teams table aligned with entities::team Model
            manager
                .create_table(
                    Table::create()
                        .table(Teams::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Teams::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Teams::TeamCode).string().not_null())
                        .col(ColumnDef::new(Teams::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Teams::UpdatedAt).timestamp().null())
                        .to_owned(),
                )
                .await?;

            // Storage-level uniqueness backs the generated codes
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_teams_team_code")
                        .table(Teams::Table)
                        .col(Teams::TeamCode)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Teams::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Teams {
        Table,
        Id,
        TeamCode,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250101_000002_create_categories_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000002_create_categories_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Categories::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Categories::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Categories::Name).string().not_null())
                        .col(ColumnDef::new(Categories::MaxPerTeam).integer().null())
                        .col(ColumnDef::new(Categories::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Categories::UpdatedAt).timestamp().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_categories_name")
                        .table(Categories::Table)
                        .col(Categories::Name)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Categories::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Categories {
        Table,
        Id,
        Name,
        MaxPerTeam,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250101_000003_create_hardware_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000003_create_hardware_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Create hardware table aligned with entities::hardware Model
            manager
                .create_table(
                    Table::create()
                        .table(Hardware::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Hardware::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Hardware::Name).string().not_null())
                        .col(ColumnDef::new(Hardware::ModelNumber).string().not_null())
                        .col(ColumnDef::new(Hardware::Manufacturer).string().not_null())
                        .col(ColumnDef::new(Hardware::DatasheetUrl).string().not_null())
                        .col(
                            ColumnDef::new(Hardware::QuantityAvailable)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Hardware::Notes).text().null())
                        .col(ColumnDef::new(Hardware::MaxPerTeam).integer().null())
                        .col(ColumnDef::new(Hardware::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Hardware::UpdatedAt).timestamp().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_hardware_name")
                        .table(Hardware::Table)
                        .col(Hardware::Name)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Hardware::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Hardware {
        Table,
        Id,
        Name,
        ModelNumber,
        Manufacturer,
        DatasheetUrl,
        QuantityAvailable,
        Notes,
        MaxPerTeam,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250101_000004_create_hardware_categories_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000004_create_hardware_categories_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(HardwareCategories::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(HardwareCategories::HardwareId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(HardwareCategories::CategoryId)
                                .uuid()
                                .not_null(),
                        )
                        .primary_key(
                            Index::create()
                                .col(HardwareCategories::HardwareId)
                                .col(HardwareCategories::CategoryId),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_hardware_categories_hardware_id")
                                .from(HardwareCategories::Table, HardwareCategories::HardwareId)
                                .to(Hardware::Table, Hardware::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_hardware_categories_category_id")
                                .from(HardwareCategories::Table, HardwareCategories::CategoryId)
                                .to(Categories::Table, Categories::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            // Limit checks walk from category to member hardware
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_hardware_categories_category_id")
                        .table(HardwareCategories::Table)
                        .col(HardwareCategories::CategoryId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(HardwareCategories::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum HardwareCategories {
        Table,
        HardwareId,
        CategoryId,
    }

    #[derive(DeriveIden)]
    enum Hardware {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    enum Categories {
        Table,
        Id,
    }
}

mod m20250101_000005_create_orders_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000005_create_orders_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Create orders table aligned with entities::order Model
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Orders::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Orders::TeamId).uuid().not_null())
                        .col(
                            ColumnDef::new(Orders::Status)
                                .string()
                                .not_null()
                                .default("Cart"),
                        )
                        .col(ColumnDef::new(Orders::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Orders::UpdatedAt).timestamp().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_orders_team_id")
                                .from(Orders::Table, Orders::TeamId)
                                .to(Teams::Table, Teams::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_team_id")
                        .table(Orders::Table)
                        .col(Orders::TeamId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_status")
                        .table(Orders::Table)
                        .col(Orders::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Orders {
        Table,
        Id,
        TeamId,
        Status,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Teams {
        Table,
        Id,
    }
}

mod m20250101_000006_create_order_items_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000006_create_order_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Create order_items table aligned with entities::order_item Model
            manager
                .create_table(
                    Table::create()
                        .table(OrderItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderItems::OrderId).uuid().not_null())
                        .col(ColumnDef::new(OrderItems::HardwareId).uuid().not_null())
                        .col(
                            ColumnDef::new(OrderItems::PartReturnedHealth)
                                .string()
                                .null(),
                        )
                        .col(ColumnDef::new(OrderItems::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(OrderItems::UpdatedAt).timestamp().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_items_order_id")
                                .from(OrderItems::Table, OrderItems::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_items_hardware_id")
                                .from(OrderItems::Table, OrderItems::HardwareId)
                                .to(Hardware::Table, Hardware::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_order_items_order_id")
                        .table(OrderItems::Table)
                        .col(OrderItems::OrderId)
                        .to_owned(),
                )
                .await?;

            // Live-unit counts scan by hardware
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_order_items_hardware_id")
                        .table(OrderItems::Table)
                        .col(OrderItems::HardwareId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderItems::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum OrderItems {
        Table,
        Id,
        OrderId,
        HardwareId,
        PartReturnedHealth,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Orders {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    enum Hardware {
        Table,
        Id,
    }
}

mod m20250101_000007_create_incidents_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000007_create_incidents_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Create incidents table aligned with entities::incident Model
            manager
                .create_table(
                    Table::create()
                        .table(Incidents::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Incidents::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Incidents::OrderItemId).uuid().not_null())
                        .col(ColumnDef::new(Incidents::State).string().not_null())
                        .col(
                            ColumnDef::new(Incidents::TimeOccurred)
                                .timestamp()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Incidents::Description).text().not_null())
                        .col(ColumnDef::new(Incidents::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Incidents::UpdatedAt).timestamp().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_incidents_order_item_id")
                                .from(Incidents::Table, Incidents::OrderItemId)
                                .to(OrderItems::Table, OrderItems::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            // One incident per line item
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_incidents_order_item_id")
                        .table(Incidents::Table)
                        .col(Incidents::OrderItemId)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Incidents::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Incidents {
        Table,
        Id,
        OrderItemId,
        State,
        TimeOccurred,
        Description,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum OrderItems {
        Table,
        Id,
    }
}
