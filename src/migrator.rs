use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_access_tables::Migration),
            Box::new(m20250101_000002_create_reference_tables::Migration),
            Box::new(m20250101_000003_create_order_delivery_tables::Migration),
            Box::new(m20250101_000004_create_store_activity_tables::Migration),
        ]
    }
}

#[derive(DeriveIden)]
enum StoreGroups {
    Table,
    Id,
    Name,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Username,
    PasswordHash,
    Role,
    Active,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum UserGroups {
    Table,
    Id,
    UserId,
    GroupId,
}

#[derive(DeriveIden)]
enum Suppliers {
    Table,
    Id,
    Name,
    ContactName,
    Phone,
    Email,
    Active,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum NocodbConfigs {
    Table,
    Id,
    GroupId,
    BaseUrl,
    ApiToken,
    ProjectId,
    TableId,
    InvoiceColumn,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Orders {
    Table,
    Id,
    SupplierId,
    GroupId,
    PlannedDate,
    Quantity,
    Unit,
    Status,
    Comment,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Deliveries {
    Table,
    Id,
    OrderId,
    SupplierId,
    GroupId,
    PlannedDate,
    DeliveredDate,
    Quantity,
    Unit,
    Status,
    Comment,
    BlNumber,
    BlAmount,
    InvoiceReference,
    InvoiceAmount,
    Reconciled,
    ValidatedAt,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Publicities {
    Table,
    Id,
    GroupId,
    Title,
    Description,
    StartDate,
    EndDate,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum CustomerOrders {
    Table,
    Id,
    GroupId,
    CustomerName,
    CustomerPhone,
    ProductDescription,
    Quantity,
    Status,
    Deposit,
    Comment,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

fn id_column<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .integer()
        .not_null()
        .auto_increment()
        .primary_key()
        .to_owned()
}

mod m20250101_000001_create_access_tables {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000001_create_access_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StoreGroups::Table)
                        .if_not_exists()
                        .col(id_column(StoreGroups::Id))
                        .col(
                            ColumnDef::new(StoreGroups::Name)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(StoreGroups::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(id_column(Users::Id))
                        .col(
                            ColumnDef::new(Users::Username)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                        .col(ColumnDef::new(Users::Role).string().not_null())
                        .col(
                            ColumnDef::new(Users::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Users::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Users::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(UserGroups::Table)
                        .if_not_exists()
                        .col(id_column(UserGroups::Id))
                        .col(ColumnDef::new(UserGroups::UserId).integer().not_null())
                        .col(ColumnDef::new(UserGroups::GroupId).integer().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_user_groups_user")
                                .from(UserGroups::Table, UserGroups::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_user_groups_group")
                                .from(UserGroups::Table, UserGroups::GroupId)
                                .to(StoreGroups::Table, StoreGroups::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_user_groups_user_group")
                        .table(UserGroups::Table)
                        .col(UserGroups::UserId)
                        .col(UserGroups::GroupId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(UserGroups::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(StoreGroups::Table).to_owned())
                .await
        }
    }
}

mod m20250101_000002_create_reference_tables {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000002_create_reference_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Suppliers::Table)
                        .if_not_exists()
                        .col(id_column(Suppliers::Id))
                        .col(
                            ColumnDef::new(Suppliers::Name)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Suppliers::ContactName).string().null())
                        .col(ColumnDef::new(Suppliers::Phone).string().null())
                        .col(ColumnDef::new(Suppliers::Email).string().null())
                        .col(
                            ColumnDef::new(Suppliers::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Suppliers::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Suppliers::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(NocodbConfigs::Table)
                        .if_not_exists()
                        .col(id_column(NocodbConfigs::Id))
                        .col(
                            ColumnDef::new(NocodbConfigs::GroupId)
                                .integer()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(NocodbConfigs::BaseUrl).string().not_null())
                        .col(ColumnDef::new(NocodbConfigs::ApiToken).string().not_null())
                        .col(ColumnDef::new(NocodbConfigs::ProjectId).string().not_null())
                        .col(ColumnDef::new(NocodbConfigs::TableId).string().not_null())
                        .col(
                            ColumnDef::new(NocodbConfigs::InvoiceColumn)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(NocodbConfigs::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(NocodbConfigs::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_nocodb_configs_group")
                                .from(NocodbConfigs::Table, NocodbConfigs::GroupId)
                                .to(StoreGroups::Table, StoreGroups::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(NocodbConfigs::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Suppliers::Table).to_owned())
                .await
        }
    }
}

mod m20250101_000003_create_order_delivery_tables {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000003_create_order_delivery_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(id_column(Orders::Id))
                        .col(ColumnDef::new(Orders::SupplierId).integer().not_null())
                        .col(ColumnDef::new(Orders::GroupId).integer().not_null())
                        .col(ColumnDef::new(Orders::PlannedDate).date().not_null())
                        .col(ColumnDef::new(Orders::Quantity).integer().null())
                        .col(ColumnDef::new(Orders::Unit).string().null())
                        .col(
                            ColumnDef::new(Orders::Status)
                                .string()
                                .not_null()
                                .default("pending"),
                        )
                        .col(ColumnDef::new(Orders::Comment).text().null())
                        .col(ColumnDef::new(Orders::CreatedBy).integer().not_null())
                        .col(
                            ColumnDef::new(Orders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_orders_supplier")
                                .from(Orders::Table, Orders::SupplierId)
                                .to(Suppliers::Table, Suppliers::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_orders_group")
                                .from(Orders::Table, Orders::GroupId)
                                .to(StoreGroups::Table, StoreGroups::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_group_status")
                        .table(Orders::Table)
                        .col(Orders::GroupId)
                        .col(Orders::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Deliveries::Table)
                        .if_not_exists()
                        .col(id_column(Deliveries::Id))
                        .col(ColumnDef::new(Deliveries::OrderId).integer().null())
                        .col(ColumnDef::new(Deliveries::SupplierId).integer().not_null())
                        .col(ColumnDef::new(Deliveries::GroupId).integer().not_null())
                        .col(ColumnDef::new(Deliveries::PlannedDate).date().not_null())
                        .col(ColumnDef::new(Deliveries::DeliveredDate).date().null())
                        .col(ColumnDef::new(Deliveries::Quantity).integer().not_null())
                        .col(ColumnDef::new(Deliveries::Unit).string().not_null())
                        .col(
                            ColumnDef::new(Deliveries::Status)
                                .string()
                                .not_null()
                                .default("planned"),
                        )
                        .col(ColumnDef::new(Deliveries::Comment).text().null())
                        .col(ColumnDef::new(Deliveries::BlNumber).string().null())
                        .col(ColumnDef::new(Deliveries::BlAmount).decimal_len(12, 2).null())
                        .col(ColumnDef::new(Deliveries::InvoiceReference).string().null())
                        .col(
                            ColumnDef::new(Deliveries::InvoiceAmount)
                                .decimal_len(12, 2)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Deliveries::Reconciled)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Deliveries::ValidatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(Deliveries::CreatedBy).integer().not_null())
                        .col(
                            ColumnDef::new(Deliveries::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Deliveries::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_deliveries_order")
                                .from(Deliveries::Table, Deliveries::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_deliveries_supplier")
                                .from(Deliveries::Table, Deliveries::SupplierId)
                                .to(Suppliers::Table, Suppliers::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_deliveries_group")
                                .from(Deliveries::Table, Deliveries::GroupId)
                                .to(StoreGroups::Table, StoreGroups::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_deliveries_order_id")
                        .table(Deliveries::Table)
                        .col(Deliveries::OrderId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_deliveries_group_status")
                        .table(Deliveries::Table)
                        .col(Deliveries::GroupId)
                        .col(Deliveries::Status)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Deliveries::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }
}

mod m20250101_000004_create_store_activity_tables {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000004_create_store_activity_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Publicities::Table)
                        .if_not_exists()
                        .col(id_column(Publicities::Id))
                        .col(ColumnDef::new(Publicities::GroupId).integer().not_null())
                        .col(ColumnDef::new(Publicities::Title).string().not_null())
                        .col(ColumnDef::new(Publicities::Description).text().null())
                        .col(ColumnDef::new(Publicities::StartDate).date().not_null())
                        .col(ColumnDef::new(Publicities::EndDate).date().not_null())
                        .col(ColumnDef::new(Publicities::CreatedBy).integer().not_null())
                        .col(
                            ColumnDef::new(Publicities::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Publicities::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_publicities_group")
                                .from(Publicities::Table, Publicities::GroupId)
                                .to(StoreGroups::Table, StoreGroups::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(CustomerOrders::Table)
                        .if_not_exists()
                        .col(id_column(CustomerOrders::Id))
                        .col(ColumnDef::new(CustomerOrders::GroupId).integer().not_null())
                        .col(
                            ColumnDef::new(CustomerOrders::CustomerName)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(CustomerOrders::CustomerPhone).string().null())
                        .col(
                            ColumnDef::new(CustomerOrders::ProductDescription)
                                .text()
                                .not_null(),
                        )
                        .col(ColumnDef::new(CustomerOrders::Quantity).integer().not_null())
                        .col(
                            ColumnDef::new(CustomerOrders::Status)
                                .string()
                                .not_null()
                                .default("waiting"),
                        )
                        .col(
                            ColumnDef::new(CustomerOrders::Deposit)
                                .decimal_len(12, 2)
                                .null(),
                        )
                        .col(ColumnDef::new(CustomerOrders::Comment).text().null())
                        .col(ColumnDef::new(CustomerOrders::CreatedBy).integer().not_null())
                        .col(
                            ColumnDef::new(CustomerOrders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CustomerOrders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_customer_orders_group")
                                .from(CustomerOrders::Table, CustomerOrders::GroupId)
                                .to(StoreGroups::Table, StoreGroups::Id),
                        )
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(CustomerOrders::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Publicities::Table).to_owned())
                .await
        }
    }
}
