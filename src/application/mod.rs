pub mod bulk_submission;
pub mod consolidation;
pub mod dispatcher;
pub mod order_service;
pub mod outbox_service;
pub mod processor;
