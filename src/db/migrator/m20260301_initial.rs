use crate::entities::prelude::{PackageFlags, Packages, Users};
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Schema;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let schema = Schema::new(backend);

        manager
            .create_table(
                schema
                    .create_table_from_entity(Users)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(Packages)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(PackageFlags)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // Owner lookups drive the list endpoint
        manager
            .create_index(
                Index::create()
                    .name("idx_packages_user_id")
                    .table(Packages)
                    .col(crate::entities::packages::Column::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_package_flags_package_id")
                    .table(PackageFlags)
                    .col(crate::entities::package_flags::Column::PackageId)
                    .to_owned(),
            )
            .await?;

        // system_logs keeps its insert path free of timestamps, so the
        // column default has to live in the table definition.
        manager
            .create_table(
                Table::create()
                    .table(SystemLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SystemLogs::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SystemLogs::EventType).string().not_null())
                    .col(ColumnDef::new(SystemLogs::Level).string().not_null())
                    .col(ColumnDef::new(SystemLogs::Message).string().not_null())
                    .col(ColumnDef::new(SystemLogs::Actor).integer().null())
                    .col(ColumnDef::new(SystemLogs::Details).string().null())
                    .col(
                        ColumnDef::new(SystemLogs::CreatedAt)
                            .date_time()
                            .not_null()
                            .extra("DEFAULT CURRENT_TIMESTAMP".to_owned()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_system_logs_created_at")
                    .table(SystemLogs::Table)
                    .col(SystemLogs::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SystemLogs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PackageFlags).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Packages).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users).to_owned())
            .await
    }
}

#[derive(Iden)]
enum SystemLogs {
    Table,
    Id,
    EventType,
    Level,
    Message,
    Actor,
    Details,
    CreatedAt,
}
