pub mod checkout;
pub mod signature;
pub mod webhook;
