// Allocation core
pub mod ledger;
pub mod limits;

// Order lifecycle
pub mod checkout;
pub mod orders;
pub mod returns;

// Seeding surfaces for the records the engine consumes
pub mod catalog;
pub mod teams;
