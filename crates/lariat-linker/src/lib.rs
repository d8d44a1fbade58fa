//! Lariat dynamic linking layer
//!
//! This crate links call sites that carry no static method signature to
//! concrete invocable targets:
//! - Class-keyed metadata cache with loader-aware retention
//! - Dynamic methods with partial link-time overload resolution
//! - Residual per-invocation dispatch for shapes that stay ambiguous
//! - Relinkable call sites

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod call_site;
pub mod class_map;
pub mod linker;
pub mod method;
pub mod retention;
pub mod services;

pub use call_site::{CallSite, CallSiteDescriptor};
pub use class_map::ClassMap;
pub use linker::{ClassMetadata, DynamicLinker};
pub use method::{CandidateMethod, DynamicMethod, OverloadedMethod};
pub use retention::{can_retain_strongly, RetentionMode};
pub use services::{CoreServices, LinkerServices};
