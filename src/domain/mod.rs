pub mod catalog;
pub mod models;
pub mod profile;
pub mod settings;
