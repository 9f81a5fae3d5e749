pub mod agent;
pub mod errors;
pub mod models;
pub mod oura;
pub mod prompt_template;
pub mod providers;
pub mod systems;
