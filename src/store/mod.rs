pub mod catalog;
pub mod orders;
pub mod payments;
pub mod riders;
