use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Users::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Users::DisplayName).string().null())
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Businesses::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Businesses::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Businesses::OwnerId).string().not_null())
                    .col(ColumnDef::new(Businesses::Name).string().not_null())
                    .col(ColumnDef::new(Businesses::Category).string().null())
                    .col(ColumnDef::new(Businesses::Description).text().null())
                    .col(ColumnDef::new(Businesses::Location).string().null())
                    .col(
                        ColumnDef::new(Businesses::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(FundingRequests::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(FundingRequests::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(FundingRequests::BusinessId).uuid().not_null())
                    .col(ColumnDef::new(FundingRequests::OwnerId).string().not_null())
                    .col(ColumnDef::new(FundingRequests::BusinessName).string().not_null())
                    .col(ColumnDef::new(FundingRequests::Breakdown).text().null())
                    // Money columns hold minor units (cents)
                    .col(ColumnDef::new(FundingRequests::FundingGoalMinor).big_integer().not_null())
                    .col(ColumnDef::new(FundingRequests::RaisedMinor).big_integer().null().default(0))
                    .col(ColumnDef::new(FundingRequests::RepaidMinor).big_integer().null().default(0))
                    .col(ColumnDef::new(FundingRequests::Status).string().not_null())
                    .col(
                        ColumnDef::new(FundingRequests::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(FundingRequests::Deadline).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(FundingRequests::FundedAt).timestamp_with_time_zone().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_funding_requests_business")
                            .from(FundingRequests::Table, FundingRequests::BusinessId)
                            .to(Businesses::Table, Businesses::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Transactions::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Transactions::FundingRequestId).uuid().not_null())
                    .col(ColumnDef::new(Transactions::AmountMinor).big_integer().null())
                    .col(ColumnDef::new(Transactions::Kind).string().not_null())
                    .col(ColumnDef::new(Transactions::ContributorId).string().null())
                    .col(ColumnDef::new(Transactions::BorrowerId).string().null())
                    .col(ColumnDef::new(Transactions::Status).string().not_null())
                    .col(
                        ColumnDef::new(Transactions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transactions_funding_request")
                            .from(Transactions::Table, Transactions::FundingRequestId)
                            .to(FundingRequests::Table, FundingRequests::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // Collection-group style scans filter on these
        for (name, column) in [
            ("idx_transactions_request", Transactions::FundingRequestId),
            ("idx_transactions_contributor", Transactions::ContributorId),
            ("idx_transactions_borrower", Transactions::BorrowerId),
            ("idx_transactions_created_at", Transactions::CreatedAt),
        ] {
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name(name)
                        .table(Transactions::Table)
                        .col(column)
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(FundingRequests::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Businesses::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    DisplayName,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Businesses {
    Table,
    Id,
    OwnerId,
    Name,
    Category,
    Description,
    Location,
    CreatedAt,
}

#[derive(DeriveIden)]
enum FundingRequests {
    Table,
    Id,
    BusinessId,
    OwnerId,
    BusinessName,
    Breakdown,
    FundingGoalMinor,
    RaisedMinor,
    RepaidMinor,
    Status,
    CreatedAt,
    Deadline,
    FundedAt,
}

#[derive(DeriveIden)]
enum Transactions {
    Table,
    Id,
    FundingRequestId,
    AmountMinor,
    Kind,
    ContributorId,
    BorrowerId,
    Status,
    CreatedAt,
}
