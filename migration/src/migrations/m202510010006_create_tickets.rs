use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m202510010006_create_tickets"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("tickets"))
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Alias::new("id"))
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("discord_channel_id"))
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Alias::new("discord_server_id")).string().not_null())
                    .col(ColumnDef::new(Alias::new("title")).text().not_null())
                    .col(ColumnDef::new(Alias::new("category_id")).integer())
                    .col(
                        ColumnDef::new(Alias::new("status"))
                            .string()
                            .not_null()
                            .default("new"),
                    )
                    .col(ColumnDef::new(Alias::new("priority")).string())
                    .col(ColumnDef::new(Alias::new("created_by_discord_id")).string().not_null())
                    .col(ColumnDef::new(Alias::new("created_by_username")).string().not_null())
                    .col(ColumnDef::new(Alias::new("created_by_avatar_url")).string())
                    .col(ColumnDef::new(Alias::new("search_text")).text().not_null().default(""))
                    .col(ColumnDef::new(Alias::new("assigned_to_user_id")).integer())
                    .col(ColumnDef::new(Alias::new("assigned_at")).timestamp())
                    .col(ColumnDef::new(Alias::new("assigned_by_user_id")).integer())
                    .col(ColumnDef::new(Alias::new("is_unread")).boolean().not_null().default(true))
                    .col(ColumnDef::new(Alias::new("unread_count")).integer().not_null().default(0))
                    .col(ColumnDef::new(Alias::new("has_new_messages")).boolean().not_null().default(false))
                    .col(ColumnDef::new(Alias::new("is_archived")).boolean().not_null().default(false))
                    .col(ColumnDef::new(Alias::new("voting_enabled")).boolean().not_null().default(false))
                    .col(ColumnDef::new(Alias::new("voting_closed")).boolean().not_null().default(false))
                    .col(ColumnDef::new(Alias::new("voting_closed_at")).timestamp())
                    .col(ColumnDef::new(Alias::new("voting_closed_by_user_id")).integer())
                    .col(
                        ColumnDef::new(Alias::new("created_at"))
                            .timestamp()
                            .not_null()
                            .default(Expr::cust("CURRENT_TIMESTAMP")),
                    )
                    .col(
                        ColumnDef::new(Alias::new("updated_at"))
                            .timestamp()
                            .not_null()
                            .default(Expr::cust("CURRENT_TIMESTAMP")),
                    )
                    .col(ColumnDef::new(Alias::new("closed_at")).timestamp())
                    .col(ColumnDef::new(Alias::new("last_message_at")).timestamp())
                    .foreign_key(
                        ForeignKey::create()
                            .from(Alias::new("tickets"), Alias::new("category_id"))
                            .to(Alias::new("categories"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Alias::new("tickets"), Alias::new("assigned_to_user_id"))
                            .to(Alias::new("users"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_tickets_status_archived")
                    .table(Alias::new("tickets"))
                    .col(Alias::new("status"))
                    .col(Alias::new("is_archived"))
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Alias::new("tickets")).to_owned())
            .await
    }
}
