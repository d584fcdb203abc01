pub mod access;
pub mod condition;
pub mod definition;
pub mod expression;
pub mod query;
pub mod sql;
