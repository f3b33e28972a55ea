pub mod controller;
pub mod placeholder;
