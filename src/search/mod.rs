//! Search, filter and pagination state shared by the list views.

pub mod controller;
pub mod debounce;
pub mod local_filter;
pub mod pagination;

pub use controller::{SearchController, SearchSource};
pub use debounce::Debouncer;
pub use local_filter::{filter_local, highlight, matches, Searchable, Segment};
pub use pagination::{page_labels, slice_page, PageLabel};
