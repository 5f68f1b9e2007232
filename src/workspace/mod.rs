/// File categories and their naming conventions
pub mod category;
/// Directory backed file storage per category
pub mod store;

pub use category::Category;
pub use store::{DuplicatePolicy, StoreOutcome, WorkspaceStore};
