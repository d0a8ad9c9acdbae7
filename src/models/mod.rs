//! Rows stored in the managed backend.
//!
//! The backend owns uniqueness, referential integrity and cascades; these
//! types only describe the shape of each row. `New*` types are insert
//! payloads without server-assigned columns.

mod admin;
mod alert;
mod post;
mod profile;

pub use admin::{Admin, AdminRole, Ban, ContentType, NewBan, NewReport, Permission, Report, ReportStatus};
pub use alert::{AlertCondition, NewPriceAlert, PriceAlert};
pub use post::{Comment, FavoriteCoin, Like, NewComment, NewFavorite, NewLike, NewPost, Post, Sentiment};
pub use profile::{Profile, ProfileUpdate};
