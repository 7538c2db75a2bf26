mod handler;

pub use handler::{admin_dashboard, admin_login, admin_login_page, admin_logout};
