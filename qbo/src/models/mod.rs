pub mod core;
pub mod customer;
pub mod invoice;
pub mod item;
pub mod report;
pub mod transaction;
pub mod vendor;
