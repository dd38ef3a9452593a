pub mod attachment;
pub mod comment;
pub mod incident;
pub mod sla;
pub mod user;
