pub mod health;
pub mod query;
pub mod recommend;
pub mod resume;
