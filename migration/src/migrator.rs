use sea_orm_migration::prelude::*;

use crate::migrations;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(migrations::m202510010001_create_users::Migration),
            Box::new(migrations::m202510010002_create_roles::Migration),
            Box::new(migrations::m202510010003_create_user_roles::Migration),
            Box::new(migrations::m202510010004_create_sessions::Migration),
            Box::new(migrations::m202510010005_create_categories::Migration),
            Box::new(migrations::m202510010006_create_tickets::Migration),
            Box::new(migrations::m202510010007_create_ticket_messages::Migration),
            Box::new(migrations::m202510010008_create_ticket_votes::Migration),
            Box::new(migrations::m202510010009_create_ticket_activity_log::Migration),
            Box::new(migrations::m202510010010_create_ticket_read_status::Migration),
            Box::new(migrations::m202510010011_seed_reference_data::Migration),
        ]
    }
}
