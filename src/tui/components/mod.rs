pub mod confirm;
pub mod data_list;
pub mod detail;
pub mod header;
pub mod help;
pub mod logs;
pub mod pagination;
