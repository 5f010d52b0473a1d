use crate::{
    error::Error,
    reclamation::{ListQuery, Reclamation},
};

/// What the list area shows. Exactly one state applies to any query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ListState<'a> {
    /// No data yet.
    Loading,
    /// The request failed; `r` re-issues it.
    Error(&'a Error),
    /// Loaded, zero records.
    Empty,
    Populated(&'a [Reclamation]),
}

impl<'a> ListState<'a> {
    pub fn from_query(query: &'a ListQuery) -> Self {
        if let Some(error) = &query.error {
            return ListState::Error(error);
        }
        match &query.data {
            None => ListState::Loading,
            Some(data) if data.is_empty() => ListState::Empty,
            Some(data) => ListState::Populated(&data.reclamations),
        }
    }

    pub fn rows(&self) -> &'a [Reclamation] {
        match self {
            ListState::Populated(rows) => rows,
            _ => &[],
        }
    }
}
