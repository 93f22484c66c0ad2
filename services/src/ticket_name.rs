//! Channel-name parser.
//!
//! Ticket channels are named `<number>-<customer>` while unclaimed and
//! `<number>-<staff>-<customer>` once a staff member claims them. Status
//! emojis may be prepended by the ticket bot.

/// Decorations stripped before parsing.
const DECORATIONS: &[char] = &['🔴', '🟠', '🟢', '⚠', '\u{FE0F}', '❓'];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketName {
    pub number: Option<String>,
    pub staff: Option<String>,
    pub customer: String,
}

/// Parses a channel display name. Never fails; unknown shapes keep the whole
/// cleaned name as the customer.
///
/// A hyphenated customer name on an unclaimed ticket (`001-ali-ce`) reads as
/// claimed by `ali`; the naming scheme cannot tell the two apart.
pub fn parse(name: &str) -> TicketName {
    let cleaned: String = name.chars().filter(|c| !DECORATIONS.contains(c)).collect();
    let cleaned = cleaned.trim();

    let parts: Vec<&str> = cleaned.split('-').collect();
    match parts.as_slice() {
        [number, customer] => TicketName {
            number: Some((*number).to_string()),
            staff: None,
            customer: (*customer).to_string(),
        },
        [number, staff, customer @ ..] => TicketName {
            number: Some((*number).to_string()),
            staff: Some((*staff).to_string()),
            customer: customer.join("-"),
        },
        _ => TicketName {
            number: None,
            staff: None,
            customer: cleaned.to_string(),
        },
    }
}
