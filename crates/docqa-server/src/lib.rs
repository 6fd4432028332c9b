//! DocQA server library: shared state, HTTP routes and the terminal chat loop.

pub mod repl;
pub mod routes;
pub mod state;

pub use routes::build_router;
pub use state::AppState;
