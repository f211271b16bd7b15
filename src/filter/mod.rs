// User list filtering shared by the users endpoints, filter presets and
// the per-role view counts.

pub mod types;
pub mod user_filter;
pub mod views;

pub use types::{FilterStats, UserFilter};
pub use user_filter::{apply, FilterState, FilterTarget};
pub use views::{format_view_count, select_view, view_counts, UserView, ViewCount, USER_VIEWS};
