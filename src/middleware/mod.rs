mod auth;
mod error_handler;

pub use auth::{
    CurrentAdmin, CurrentUser, current_user, load_session, require_admin, require_user,
    require_user_page,
};
pub use error_handler::log_errors;
