pub mod handler;

pub use handler::{edit_user, get_user};
