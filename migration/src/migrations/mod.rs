pub mod m202510010001_create_users;
pub mod m202510010002_create_roles;
pub mod m202510010003_create_user_roles;
pub mod m202510010004_create_sessions;
pub mod m202510010005_create_categories;
pub mod m202510010006_create_tickets;
pub mod m202510010007_create_ticket_messages;
pub mod m202510010008_create_ticket_votes;
pub mod m202510010009_create_ticket_activity_log;
pub mod m202510010010_create_ticket_read_status;
pub mod m202510010011_seed_reference_data;
