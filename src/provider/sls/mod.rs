//! # SLS
//!
//! Log Service adapter. Every request goes to the project's virtual host
//! (`http://{project}.{region}.log.aliyuncs.com`) with JSON bodies.
//!
//! One [`SlsClient`] serves all four log kinds; each kind's operations live
//! in their own module.

mod client;
mod index;
mod logstore;
mod machine_group;
mod project;

pub use client::{SlsClient, SlsClientFactory};
