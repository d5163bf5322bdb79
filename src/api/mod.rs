//! # Site API
//!
//! [`ApiClient`] issues authenticated calls against the connected site.
//! Commands depend on the [`SiteApi`] trait so they can be exercised
//! against a fake.
//!
//! | Resource | Actions |
//! |----------|---------|
//! | `repos` | `list` |
//! | `orgs` | `list` |
//! | `plans` | `list`, `create` |

mod client;

pub use client::{ApiAction, ApiClient, Params, SiteApi};
