mod handlers;
mod models;
mod page;
mod state;
mod upload;
mod util;

pub use handlers::{build_router, run_server};
