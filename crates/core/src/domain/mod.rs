pub mod inventory;
pub mod organization;
pub mod recommendation;
pub mod settings;
