pub mod api;
pub mod cache;
pub mod schema;
pub mod service;

pub use api::{HttpApi, ReclamationApi};
pub use cache::QueryKey;
pub use schema::{NewReclamation, Reclamation, ReclamationList, ValidationError};
pub use service::{
    FormRecord, ListObserver, ListParams, ListQuery, RecordQuery, ReclamationService, RemoveTarget,
    ServiceOptions,
};

#[cfg(test)]
pub(crate) mod testing;
