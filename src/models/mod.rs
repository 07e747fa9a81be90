pub mod catalog;
pub mod order;
pub mod payment;
pub mod rider;
