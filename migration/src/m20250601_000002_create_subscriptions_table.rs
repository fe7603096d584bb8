use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // No foreign key to users: the entitlement merge runs after this insert
        // and may create the user row itself
        manager
            .create_table(
                Table::create()
                    .table(Subscriptions::Table)
                    .if_not_exists()
                    .col(pk_uuid(Subscriptions::Id))
                    .col(string(Subscriptions::UserId).not_null())
                    .col(string(Subscriptions::Provider).not_null())
                    .col(string(Subscriptions::Plan).not_null())
                    .col(double(Subscriptions::AmountSar).not_null().default(0.0))
                    .col(
                        string(Subscriptions::Status)
                            .not_null()
                            .default("active"),
                    )
                    .col(timestamp_with_time_zone(Subscriptions::StartedAt).not_null())
                    .col(timestamp_with_time_zone(Subscriptions::ExpiresAt).not_null())
                    .col(string_null(Subscriptions::ProviderReference))
                    .col(json_binary(Subscriptions::ProviderPayload).not_null())
                    .to_owned(),
            )
            .await?;

        // Postgres treats NULLs as distinct, so deliveries without a reference
        // are never deduplicated
        manager
            .create_index(
                Index::create()
                    .name("idx_subscriptions_provider_reference")
                    .table(Subscriptions::Table)
                    .col(Subscriptions::ProviderReference)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_subscriptions_user_id")
                    .table(Subscriptions::Table)
                    .col(Subscriptions::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Subscriptions::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Subscriptions {
    Table,
    Id,
    UserId,
    Provider,
    Plan,
    AmountSar,
    Status,
    StartedAt,
    ExpiresAt,
    ProviderReference,
    ProviderPayload,
}
