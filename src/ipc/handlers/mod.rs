pub mod auth;
pub mod core;
pub mod gate;
pub mod import;
pub mod lookup;
pub mod settings;
pub mod students;
