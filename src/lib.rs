pub mod app;
pub mod errors;
pub mod gate;
pub mod jwt;
pub mod routes;
pub mod settings;

// Re-export commonly used items for tests
pub use app::create_app;
pub use gate::{Configuration, GateLayer};
