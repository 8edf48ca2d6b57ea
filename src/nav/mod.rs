//! Click-path navigation
//!
//! Links a page offers go into a [`LinkRegistry`]; the next request is only
//! honored if its URL is one of them.

pub mod engine;
pub mod link;
pub mod output;
pub mod path;
pub mod redirect;
pub mod registry;
pub mod request;

pub use engine::{AddOutcome, NavServices, NavigationEngine, Rejection};
pub use link::{Link, LinkRecord, DEFAULT_CONTAINER};
pub use output::OutputSink;
pub use path::{AllowAllPaths, PageNamespace, PathValidator, PAGE_PARAM};
pub use redirect::{Redirect, RedirectSettings, REDIRECT_LINK_NAME};
pub use registry::LinkRegistry;
pub use request::RequestContext;
