//! `SeaORM` entities for the webhook ingestion tables.

pub mod prelude;

pub mod subscriptions;
pub mod users;
