pub mod models;
pub mod order_repo;
pub mod outbox_store;
pub mod reseller_repo;
pub mod submission_client;

#[cfg(test)]
pub mod memory;
#[cfg(test)]
pub(crate) mod test_db;
