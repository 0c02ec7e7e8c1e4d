pub mod components;
pub mod messages;
