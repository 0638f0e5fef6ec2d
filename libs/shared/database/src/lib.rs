pub mod pool;
pub mod schema;
pub mod state;

pub use pool::Database;
pub use state::AppState;
