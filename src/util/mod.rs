pub mod csv_import;
pub mod error;
pub mod jwt;
pub mod logger;
pub mod pagination;
pub mod password;
pub mod response;
pub mod template;
