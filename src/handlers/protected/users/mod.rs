pub mod collection;
pub mod export_schedule;
pub mod record;
pub mod views;

pub use collection::get as users_get;
pub use collection::post as users_post;
pub use record::delete as user_delete;
pub use record::get as user_get;
pub use record::patch as user_patch;
pub use views::get as views_get;
