pub mod checkpoint;
pub mod credential;
pub mod error;
pub mod filter;
pub mod output;
pub mod page;
pub mod profile_url;
pub mod relative_time;
pub mod selectors;
pub mod types;
pub mod urn;

pub use error::{Error, Result};
pub use types::{
    CommenterAggregate, LookbackWindow, PostHandle, RawComment, ResolvedComment, UnresolvedPolicy,
};
