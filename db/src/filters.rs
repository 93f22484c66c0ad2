use sea_orm::sea_query::{Expr, LikeExpr};
use sea_orm::{ColumnTrait, Condition};

use crate::models::ticket::{Column, TicketPriority, TicketStatus};

/// One typed predicate over the `tickets` table.
#[derive(Debug, Clone, PartialEq)]
pub enum TicketFilter {
    Status(TicketStatus),
    /// `None` selects tickets whose priority is unset.
    Priority(Option<TicketPriority>),
    Category(i64),
    AssignedTo(i64),
    Unassigned,
    /// Case-insensitive substring match on title or creator name.
    Search(String),
    Archived(bool),
}

impl TicketFilter {
    fn condition(&self) -> Condition {
        match self {
            TicketFilter::Status(status) => Condition::all().add(Column::Status.eq(*status)),
            TicketFilter::Priority(Some(priority)) => {
                Condition::all().add(Column::Priority.eq(*priority))
            }
            TicketFilter::Priority(None) => Condition::all().add(Column::Priority.is_null()),
            TicketFilter::Category(id) => Condition::all().add(Column::CategoryId.eq(*id)),
            TicketFilter::AssignedTo(user_id) => {
                Condition::all().add(Column::AssignedToUserId.eq(*user_id))
            }
            TicketFilter::Unassigned => Condition::all().add(Column::AssignedToUserId.is_null()),
            TicketFilter::Search(term) => {
                let pattern = format!("%{}%", escape_like(&term.trim().to_lowercase()));
                Condition::all().add(
                    Expr::col(Column::SearchText).like(LikeExpr::new(pattern).escape('\\')),
                )
            }
            TicketFilter::Archived(archived) => {
                Condition::all().add(Column::IsArchived.eq(*archived))
            }
        }
    }
}

fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Conjunction of ticket predicates, built up the same way the other query
/// filters are: `TicketFilterSet::new().with(...).with(...)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TicketFilterSet {
    filters: Vec<TicketFilter>,
}

impl TicketFilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, filter: TicketFilter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Adds `filter` only when `value` is present.
    pub fn with_opt<T>(self, value: Option<T>, filter: impl FnOnce(T) -> TicketFilter) -> Self {
        match value {
            Some(v) => self.with(filter(v)),
            None => self,
        }
    }

    pub fn filters(&self) -> &[TicketFilter] {
        &self.filters
    }

    pub fn condition(&self) -> Condition {
        self.filters
            .iter()
            .fold(Condition::all(), |cond, f| cond.add(f.condition()))
    }
}
