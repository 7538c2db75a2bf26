mod handler;
pub mod model;

pub use handler::{predict, review_page, user_reviews};
pub use model::{Review, ReviewWithUser};
