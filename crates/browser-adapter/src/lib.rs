//! Driver-agnostic browser adapter layer.
//!
//! Defines the contract every browser driver fulfills for the agent core,
//! the extraction pipeline that turns a live page into an element map, and
//! an in-memory [`FakeBrowser`] used throughout the test suite.

mod adapter;
mod error;
mod extract;
mod fake;

pub use adapter::{BrowserAdapter, ScrollDirection, TabInfo};
pub use error::AdapterError;
pub use extract::extract_element_map;
pub use fake::{FakeBrowser, FakePage, PageEffect};
