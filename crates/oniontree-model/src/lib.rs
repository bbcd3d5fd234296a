//! OnionTree descriptor model
//!
//! One YAML file per service, grouped into directories that name a tag:
//!
//! ```text
//! tagged/
//!   marketplace/
//!     my-service.yaml     -> tag "marketplace"
//!   forum/
//!     other.yaml          -> tag "forum"
//! ```
//!
//! This crate turns `(path, bytes)` into a [`ServiceEntry`]: the parsed
//! [`Descriptor`] plus its slug and derived tag. It knows nothing about
//! storage; reconciliation lives in `oniontree-ingest`.

pub mod descriptor;
pub mod error;
pub mod slug;
pub mod tag;

pub use descriptor::{Descriptor, PublicKeyEntry, ServiceEntry};
pub use error::ParseError;
pub use self::slug::slugify;
pub use tag::derive_tag;
