mod handler;
pub mod model;

pub use handler::{check_auth, login, login_page, logout, signup, signup_page};
pub use model::{AdminCreation, NewUser, User, UserRole, UserSummary, normalize_email};
