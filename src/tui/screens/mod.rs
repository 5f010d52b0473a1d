pub mod form;
pub mod reclamations;
