pub mod category;
pub mod role;
pub mod session;
pub mod ticket;
pub mod ticket_activity_log;
pub mod ticket_message;
pub mod ticket_read_status;
pub mod ticket_vote;
pub mod user;
pub mod user_role;

pub use category::Entity as Category;
pub use role::Entity as Role;
pub use session::Entity as Session;
pub use ticket::Entity as Ticket;
pub use ticket_activity_log::Entity as TicketActivityLog;
pub use ticket_message::Entity as TicketMessage;
pub use ticket_read_status::Entity as TicketReadStatus;
pub use ticket_vote::Entity as TicketVote;
pub use user::Entity as User;
pub use user_role::Entity as UserRole;
