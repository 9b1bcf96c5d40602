#![doc(html_root_url = "https://docs.rs/strap-dom/0.1.0")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! A retained element-wrapper runtime over the DOM.
//!
//! An [`App`] owns a tree of [`Wrapper`]s, each mediating all access to one native node of a [`Host`].
//! Wrappers are created from declarative [`Options`], linked with [`Wrapper::add`], rendered into their parents'
//! nodes once with [`Wrapper::render`] and torn down with [`Wrapper::destroy`].
//!
//! Everything deferred runs on the app's virtual-time [`Scheduler`]. In the browser, [`host::web::drive`]
//! drains it from `setTimeout`; headless, [`Scheduler::run_until_idle`] does.

pub use wasm_bindgen;
pub use web_sys;

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod app;
pub mod channel;
pub mod element;
pub mod error;
pub mod hooks;
pub mod host;
pub mod index;
pub mod options;
pub mod scheduler;
pub mod value;

pub use app::{App, Settings, Signal, WeakApp};
pub use channel::{ChannelError, ChannelFlags, ChannelRegistry, Event};
pub use element::{Lifecycle, Phase, State, StyleSheet, Target, WeakWrapper, Wrapper};
pub use error::{report, Error, ErrorKind, Template};
pub use hooks::{HookName, HookResult, Hooks};
pub use host::{memory::MemoryHost, web::WebHost, Host, HostError, ListenerOptions};
pub use index::IndexTable;
pub use options::Options;
pub use scheduler::Scheduler;
pub use value::Value;
