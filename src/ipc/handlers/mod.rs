pub mod backup_exchange;
pub mod classes;
pub mod core;
pub mod marks;
pub mod registrations;
pub mod reports;
pub mod settings;
pub mod students;
pub mod users;
