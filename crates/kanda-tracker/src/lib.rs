//! Client-side instrumentation for Kanda.
//!
//! A [`Tracker`] turns page lifecycle signals (navigation, scroll, click,
//! form activity, page hide) into tracking events and hands them to a
//! [`Transport`]. Tracking never fails the caller: every error is logged at
//! `debug` and dropped.

pub mod detect;
pub mod element;
pub mod storage;
pub mod tracker;
pub mod transport;
pub mod visit;

pub use detect::{detect_browser, detect_os, device_type, utm_params};
pub use element::{closest_trackable, is_trackable, resolve_element_id, ElementDescriptor};
pub use storage::{ClientStorage, MemoryStorage};
pub use tracker::{ClientEnv, Tracker};
pub use transport::{HttpTransport, Transport};
pub use visit::{scroll_percentage, PageVisit};
