use sea_orm_migration::prelude::*;

use super::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum Courses {
    Table,
    Id,
    OwnerId,
    Title,
    Day,
    Start,
    End,
    Mode,
}

#[derive(DeriveIden)]
enum Exams {
    Table,
    Id,
    OwnerId,
    Title,
    Kind,
    Date,
    Start,
    End,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Users::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Users::Name).string().not_null())
                    .col(ColumnDef::new(Users::Email).string().not_null().unique_key())
                    .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Courses::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Courses::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Courses::OwnerId).uuid().not_null())
                    .col(ColumnDef::new(Courses::Title).string().not_null())
                    .col(ColumnDef::new(Courses::Day).string().not_null())
                    .col(ColumnDef::new(Courses::Start).string().not_null())
                    .col(ColumnDef::new(Courses::End).string().not_null())
                    .col(ColumnDef::new(Courses::Mode).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_courses_owner")
                            .from(Courses::Table, Courses::OwnerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Exams::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Exams::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Exams::OwnerId).uuid().not_null())
                    .col(ColumnDef::new(Exams::Title).string().not_null())
                    .col(ColumnDef::new(Exams::Kind).string().not_null())
                    .col(ColumnDef::new(Exams::Date).string().not_null())
                    .col(ColumnDef::new(Exams::Start).string().not_null())
                    .col(ColumnDef::new(Exams::End).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_exams_owner")
                            .from(Exams::Table, Exams::OwnerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_courses_owner")
                    .table(Courses::Table)
                    .col(Courses::OwnerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_exams_owner")
                    .table(Exams::Table)
                    .col(Exams::OwnerId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Exams::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Courses::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await
    }
}
