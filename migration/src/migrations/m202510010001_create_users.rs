use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m202510010001_create_users"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("users"))
                    .if_not_exists()
                    .col(ColumnDef::new(Alias::new("id")).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(Alias::new("discord_id")).string().not_null().unique_key())
                    .col(ColumnDef::new(Alias::new("discord_username")).string().not_null())
                    .col(ColumnDef::new(Alias::new("discord_discriminator")).string())
                    .col(ColumnDef::new(Alias::new("discord_global_name")).string())
                    .col(ColumnDef::new(Alias::new("discord_avatar_url")).string())
                    .col(ColumnDef::new(Alias::new("discord_email")).string())
                    .col(ColumnDef::new(Alias::new("can_access_dashboard")).boolean().not_null().default(false))
                    .col(ColumnDef::new(Alias::new("can_manage_votes")).boolean().not_null().default(false))
                    .col(ColumnDef::new(Alias::new("is_super_admin")).boolean().not_null().default(false))
                    .col(ColumnDef::new(Alias::new("is_active")).boolean().not_null().default(true))
                    .col(ColumnDef::new(Alias::new("last_login")).timestamp())
                    .col(ColumnDef::new(Alias::new("created_at")).timestamp().not_null().default(Expr::cust("CURRENT_TIMESTAMP")))
                    .col(ColumnDef::new(Alias::new("updated_at")).timestamp().not_null().default(Expr::cust("CURRENT_TIMESTAMP")))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Alias::new("users")).to_owned())
            .await
    }
}
