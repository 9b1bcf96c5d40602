//! The boundary to the native node implementation.
//!
//! The runtime never touches a DOM directly. Everything it does to a node goes through a [`Host`]:
//! [`web::WebHost`] forwards to the browser through `web-sys`, [`memory::MemoryHost`] keeps an in-process tree.

use crate::value::Value;
use core::fmt::Debug;
use std::rc::Rc;

pub mod memory;
pub mod web;

/// A failure reported by the host DOM.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("host DOM error: {0}")]
pub struct HostError(pub String);

impl HostError {
	pub fn new(message: impl Into<String>) -> Self {
		Self(message.into())
	}
}

/// A class-list operation on one token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassOp<'a> {
	Add(&'a str),
	Remove(&'a str),
	Toggle(&'a str),
	/// Replaces the first token with the second if present.
	Replace(&'a str, &'a str),
}

/// Options of a native event listener.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ListenerOptions {
	pub capture: bool,
	pub once: bool,
	pub passive: bool,
}

impl ListenerOptions {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn with_capture(mut self, capture: bool) -> Self {
		self.capture = capture;
		self
	}

	#[must_use]
	pub fn with_once(mut self, once: bool) -> Self {
		self.once = once;
		self
	}

	#[must_use]
	pub fn with_passive(mut self, passive: bool) -> Self {
		self.passive = passive;
		self
	}
}

/// Native event callback as handed to the host.
pub type NativeCallback<E> = Rc<dyn Fn(&E)>;

/// A native node implementation.
///
/// All methods take `&self`: hosts are shared by every wrapper of an [`App`](`crate::App`).
pub trait Host: 'static {
	/// Handle to one native element. Equality must be identity.
	type Node: Clone + PartialEq + Debug + 'static;
	/// The event type delivered to listeners.
	type Event: 'static;
	/// Keeps a registered native listener alive until it is handed back to [`Host::remove_event_listener`].
	type Binding: 'static;

	/// # Errors
	///
	/// Iff `tag` can't be created.
	fn create_element(&self, tag: &str) -> Result<Self::Node, HostError>;
	fn element_by_id(&self, id: &str) -> Option<Self::Node>;
	/// Appends `child`, moving it out of its current parent first.
	///
	/// # Errors
	///
	/// Iff the resulting tree would be invalid.
	fn append_child(&self, parent: &Self::Node, child: &Self::Node) -> Result<(), HostError>;
	/// # Errors
	///
	/// Iff `child` is not a child of `parent`.
	fn remove_child(&self, parent: &Self::Node, child: &Self::Node) -> Result<(), HostError>;
	fn parent_of(&self, node: &Self::Node) -> Option<Self::Node>;
	/// # Errors
	///
	/// Iff there is no document head.
	fn append_to_head(&self, node: &Self::Node) -> Result<(), HostError>;

	fn set_id(&self, node: &Self::Node, id: &str);
	/// # Errors
	///
	/// Iff `name` is not a valid attribute name.
	fn set_attribute(&self, node: &Self::Node, name: &str, value: &str) -> Result<(), HostError>;
	fn attribute(&self, node: &Self::Node, name: &str) -> Option<String>;
	/// # Errors
	///
	/// Iff `name` is not a valid attribute name.
	fn remove_attribute(&self, node: &Self::Node, name: &str) -> Result<(), HostError>;
	/// # Errors
	///
	/// Iff a token is empty or contains whitespace.
	fn class_list(&self, node: &Self::Node, op: ClassOp<'_>) -> Result<(), HostError>;

	/// Replaces the whole inline style declaration.
	fn set_style_text(&self, node: &Self::Node, css: &str);
	/// # Errors
	///
	/// Iff the style declaration rejects the assignment.
	fn set_style_property(&self, node: &Self::Node, name: &str, value: &str) -> Result<(), HostError>;

	/// Replaces the node's content with `text`.
	fn set_text(&self, node: &Self::Node, text: &str);
	/// The node's text content, including descendants.
	fn text(&self, node: &Self::Node) -> String;

	/// Assigns a plain property.
	///
	/// # Errors
	///
	/// Iff the assignment throws.
	fn set_property(&self, node: &Self::Node, name: &str, value: &Value) -> Result<(), HostError>;
	/// Assigns `key` on the object stored in property `property` (e.g. `style.color`).
	///
	/// # Errors
	///
	/// Iff `property` is not an object or the assignment throws.
	fn merge_property(&self, node: &Self::Node, property: &str, key: &str, value: &Value) -> Result<(), HostError>;
	/// Calls the node method `name` with positional `args`.
	///
	/// # Errors
	///
	/// Iff there is no such method or it throws.
	fn call_method(&self, node: &Self::Node, name: &str, args: &[Value]) -> Result<(), HostError>;

	/// # Errors
	///
	/// Iff the native registration fails.
	fn add_event_listener(&self, node: &Self::Node, event_type: &str, callback: NativeCallback<Self::Event>, options: ListenerOptions) -> Result<Self::Binding, HostError>;
	/// # Errors
	///
	/// Iff the native removal fails.
	fn remove_event_listener(&self, node: &Self::Node, event_type: &str, binding: &Self::Binding, options: ListenerOptions) -> Result<(), HostError>;
	/// Synthesizes a click on `node`.
	fn click(&self, node: &Self::Node);
}
