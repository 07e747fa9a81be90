pub mod admin;
pub mod claim;
pub mod location;
pub mod orders;
pub mod progression;
