//! Initial schema migration - creates all tables from scratch.
//!
//! The complete schema for cambio:
//!
//! - `users`: authentication identity
//! - `sessions`: opaque access/refresh token pairs
//! - `balances`: one row per user and currency, integer minor units
//! - `exchanges`: append-only ledger of completed exchanges

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Users {
    Table,
    Username,
    Password,
    CreatedAt,
}

#[derive(Iden)]
enum Sessions {
    Table,
    AccessToken,
    RefreshToken,
    Username,
    AccessExpiresAt,
    RefreshExpiresAt,
}

#[derive(Iden)]
enum Balances {
    Table,
    Id,
    Username,
    Currency,
    AmountMinor,
}

#[derive(Iden)]
enum Exchanges {
    Table,
    Id,
    Username,
    SourceCurrency,
    TargetCurrency,
    AmountMinor,
    FeeMinor,
    ConvertedMinor,
    Rate,
    CreatedAt,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Users
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Username)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::Password).string().not_null())
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Sessions
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Sessions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Sessions::AccessToken)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Sessions::RefreshToken).string().not_null())
                    .col(ColumnDef::new(Sessions::Username).string().not_null())
                    .col(
                        ColumnDef::new(Sessions::AccessExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Sessions::RefreshExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-sessions-username")
                            .from(Sessions::Table, Sessions::Username)
                            .to(Users::Table, Users::Username),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-sessions-refresh_token-unique")
                    .table(Sessions::Table)
                    .col(Sessions::RefreshToken)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Balances
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Balances::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Balances::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Balances::Username).string().not_null())
                    .col(ColumnDef::new(Balances::Currency).string().not_null())
                    .col(
                        ColumnDef::new(Balances::AmountMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-balances-username")
                            .from(Balances::Table, Balances::Username)
                            .to(Users::Table, Users::Username),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-balances-username-currency-unique")
                    .table(Balances::Table)
                    .col(Balances::Username)
                    .col(Balances::Currency)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Exchanges
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Exchanges::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Exchanges::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Exchanges::Username).string().not_null())
                    .col(
                        ColumnDef::new(Exchanges::SourceCurrency)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Exchanges::TargetCurrency)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Exchanges::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Exchanges::FeeMinor).big_integer().not_null())
                    .col(
                        ColumnDef::new(Exchanges::ConvertedMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Exchanges::Rate).double().not_null())
                    .col(
                        ColumnDef::new(Exchanges::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-exchanges-username")
                            .from(Exchanges::Table, Exchanges::Username)
                            .to(Users::Table, Users::Username),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-exchanges-username-created_at")
                    .table(Exchanges::Table)
                    .col(Exchanges::Username)
                    .col(Exchanges::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Exchanges::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Balances::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Sessions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;

        Ok(())
    }
}
