use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m202510010011_seed_reference_data"
    }
}

const CATEGORIES: &[(&str, &str, &str)] = &[
    ("Claim", "🎁", "#e74c3c"),
    ("Parrainage", "🤝", "#9b59b6"),
    ("RP", "🎭", "#3498db"),
    ("Dossier", "📁", "#1abc9c"),
    ("Bugs", "🐛", "#e67e22"),
    ("Questions", "❓", "#95a5a6"),
    ("Wipe", "🧹", "#7f8c8d"),
    ("Don", "💝", "#f1c40f"),
];

const ROLES: &[(&str, &str, &str)] = &[
    ("founder", "Founder", "#f1c40f"),
    ("dev", "Developer", "#9b59b6"),
    ("admin", "Administrator", "#e74c3c"),
    ("moderator", "Moderator", "#3498db"),
    ("support", "Support", "#2ecc71"),
];

fn seed(
    table: &str,
    columns: [&str; 3],
    rows: &[(&str, &str, &str)],
) -> Result<InsertStatement, DbErr> {
    let mut stmt = Query::insert();
    stmt.into_table(Alias::new(table))
        .columns(columns.map(Alias::new))
        .on_conflict(OnConflict::column(Alias::new("name")).do_nothing().to_owned());

    for (a, b, c) in rows {
        stmt.values([(*a).into(), (*b).into(), (*c).into()])
            .map_err(|e| DbErr::Custom(e.to_string()))?;
    }

    Ok(stmt.to_owned())
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .exec_stmt(seed("categories", ["name", "emoji", "color"], CATEGORIES)?)
            .await?;
        manager
            .exec_stmt(seed("roles", ["name", "display_name", "color"], ROLES)?)
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let names: Vec<&str> = CATEGORIES.iter().map(|(n, _, _)| *n).collect();
        manager
            .exec_stmt(
                Query::delete()
                    .from_table(Alias::new("categories"))
                    .and_where(Expr::col(Alias::new("name")).is_in(names))
                    .to_owned(),
            )
            .await?;

        let names: Vec<&str> = ROLES.iter().map(|(n, _, _)| *n).collect();
        manager
            .exec_stmt(
                Query::delete()
                    .from_table(Alias::new("roles"))
                    .and_where(Expr::col(Alias::new("name")).is_in(names))
                    .to_owned(),
            )
            .await
    }
}
