pub mod database;
pub mod settings;
