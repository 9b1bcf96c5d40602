//! Declarative creation options.
//!
//! [`Options`] is a list of typed setters plus a few structural fields, applied in one pass by
//! [`App::create`](`crate::App::create`) in this order:
//!
//! 1. setters, in insertion order,
//! 2. `text`,
//! 3. `data.id` (index name claim),
//! 4. `content`,
//! 5. `parent`,
//! 6. `auto_click`.
//!
//! A failure in the first three steps aborts the creation.

use crate::{
	app::AppInner,
	element::{Listener, StyleSheet, Target, Wrapper},
	error::{report, Error, ErrorKind, Template},
	host::{Host, ListenerOptions},
	value::Value,
};
use core::fmt::{self, Debug, Formatter};
use std::rc::Rc;
use tracing::{error, warn};

/// Prefix of flat listener keys, as in `"onclick"`.
pub const EVENT_PREFIX: &str = "on";

/// One mutation of the new wrapper's node.
pub enum Setter<H: Host> {
	Attribute { name: String, value: String },
	Style(StyleSheet),
	/// Space-separated classes to add.
	ClassName(String),
	Property { name: String, value: Value },
	/// Assigns each entry onto the object stored in `property`, e.g. `style`.
	Merge { property: String, entries: Vec<(String, Value)> },
	/// Calls a node method with positional arguments.
	Call { method: String, args: Vec<Value> },
	Event {
		event_type: String,
		name: Option<String>,
		options: ListenerOptions,
		listener: Listener<H>,
	},
}

impl<H: Host> Clone for Setter<H> {
	fn clone(&self) -> Self {
		match self {
			Setter::Attribute { name, value } => Setter::Attribute {
				name: name.clone(),
				value: value.clone(),
			},
			Setter::Style(style) => Setter::Style(style.clone()),
			Setter::ClassName(names) => Setter::ClassName(names.clone()),
			Setter::Property { name, value } => Setter::Property {
				name: name.clone(),
				value: value.clone(),
			},
			Setter::Merge { property, entries } => Setter::Merge {
				property: property.clone(),
				entries: entries.clone(),
			},
			Setter::Call { method, args } => Setter::Call {
				method: method.clone(),
				args: args.clone(),
			},
			Setter::Event {
				event_type,
				name,
				options,
				listener,
			} => Setter::Event {
				event_type: event_type.clone(),
				name: name.clone(),
				options: *options,
				listener: listener.clone(),
			},
		}
	}
}

impl<H: Host> Debug for Setter<H> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Setter::Attribute { name, .. } => f.debug_struct("Attribute").field("name", name).finish_non_exhaustive(),
			Setter::Style(_) => f.debug_tuple("Style").finish(),
			Setter::ClassName(_) => f.debug_tuple("ClassName").finish(),
			Setter::Property { name, .. } => f.debug_struct("Property").field("name", name).finish_non_exhaustive(),
			Setter::Merge { property, entries } => f
				.debug_struct("Merge")
				.field("property", property)
				.field("keys", &entries.iter().map(|(k, _)| k).collect::<Vec<_>>())
				.finish(),
			Setter::Call { method, args } => f.debug_struct("Call").field("method", method).field("args", &args.len()).finish(),
			Setter::Event {
				event_type, name, options, ..
			} => f
				.debug_struct("Event")
				.field("event_type", event_type)
				.field("name", name)
				.field("options", options)
				.finish_non_exhaustive(),
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Data {
	/// Index name to claim for the new wrapper.
	pub id: Option<String>,
}

pub struct Options<H: Host> {
	pub setters: Vec<Setter<H>>,
	pub text: Option<String>,
	/// Initial children. They are linked, not rendered.
	pub content: Option<Vec<Wrapper<H>>>,
	pub parent: Option<Target<H>>,
	pub data: Data,
	pub auto_click: bool,
}

impl<H: Host> Default for Options<H> {
	fn default() -> Self {
		Self {
			setters: Vec::new(),
			text: None,
			content: None,
			parent: None,
			data: Data::default(),
			auto_click: false,
		}
	}
}

impl<H: Host> Debug for Options<H> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Options")
			.field("setters", &self.setters)
			.field("text", &self.text.as_ref().map(|_| ".."))
			.field("content", &self.content.as_ref().map(Vec::len))
			.field("parent", &self.parent)
			.field("data", &self.data)
			.field("auto_click", &self.auto_click)
			.finish()
	}
}

/// Splits the listener key remainder `type[$name[$options]]`.
///
/// `options` is a comma separated list of `capture`, `once` and `passive`; anything else is ignored with a warning.
#[must_use]
pub fn parse_event_key(key: &str) -> (String, Option<String>, ListenerOptions) {
	let mut parts = key.splitn(3, '$');
	let event_type = parts.next().unwrap_or_default().to_owned();
	let name = parts.next().filter(|name| !name.is_empty()).map(str::to_owned);
	let mut options = ListenerOptions::new();
	for option in parts.next().into_iter().flat_map(|options| options.split(',')).map(str::trim).filter(|option| !option.is_empty()) {
		match option {
			"capture" | "true" => options.capture = true,
			"once" => options.once = true,
			"passive" => options.passive = true,
			other => warn!(key, option = other, "Ignoring unknown listener option."),
		}
	}
	(event_type, name, options)
}

impl<H: Host> Options<H> {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn text(mut self, text: impl Into<String>) -> Self {
		self.text = Some(text.into());
		self
	}

	#[must_use]
	pub fn class_name(mut self, names: impl Into<String>) -> Self {
		self.setters.push(Setter::ClassName(names.into()));
		self
	}

	#[must_use]
	pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.setters.push(Setter::Attribute {
			name: name.into(),
			value: value.into(),
		});
		self
	}

	#[must_use]
	pub fn style(mut self, style: impl Into<StyleSheet>) -> Self {
		self.setters.push(Setter::Style(style.into()));
		self
	}

	#[must_use]
	pub fn property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
		self.setters.push(Setter::Property {
			name: name.into(),
			value: value.into(),
		});
		self
	}

	#[must_use]
	pub fn merge(mut self, property: impl Into<String>, entries: Vec<(String, Value)>) -> Self {
		self.setters.push(Setter::Merge {
			property: property.into(),
			entries,
		});
		self
	}

	#[must_use]
	pub fn call(mut self, method: impl Into<String>, args: Vec<Value>) -> Self {
		self.setters.push(Setter::Call { method: method.into(), args });
		self
	}

	/// Binds `listener` through an event key `type[$name[$options]]`, e.g. `"click$save$capture"`.
	#[must_use]
	pub fn on(mut self, event_key: &str, listener: impl Fn(&Wrapper<H>, &H::Event) + 'static) -> Self {
		let (event_type, name, options) = parse_event_key(event_key);
		self.setters.push(Setter::Event {
			event_type,
			name,
			options,
			listener: Rc::new(listener),
		});
		self
	}

	#[must_use]
	pub fn content(mut self, children: impl IntoIterator<Item = Wrapper<H>>) -> Self {
		self.content = Some(children.into_iter().collect());
		self
	}

	#[must_use]
	pub fn parent(mut self, parent: impl Into<Target<H>>) -> Self {
		self.parent = Some(parent.into());
		self
	}

	/// Adds the new wrapper to whichever wrapper claims (or will claim) the index name `name`.
	#[must_use]
	pub fn parent_name(self, name: &str) -> Self {
		self.parent(Target::Name(name.to_owned()))
	}

	/// Index name to claim.
	#[must_use]
	pub fn id(mut self, name: impl Into<String>) -> Self {
		self.data.id = Some(name.into());
		self
	}

	#[must_use]
	pub fn auto_click(mut self, auto_click: bool) -> Self {
		self.auto_click = auto_click;
		self
	}

	/// Sets a flat configuration entry, classifying `key` once.
	///
	/// # Errors
	///
	/// Iff `value` doesn't fit a structural key (`data`, `parent`, `style`), or `key` is `content`,
	/// which only takes wrappers through [`Options::content`].
	pub fn set(mut self, key: &str, value: impl Into<Value>) -> Result<Self, Error> {
		let value = value.into();
		let invalid = || report(ErrorKind::InvalidOption, Template::InvalidOption, Some(key));
		match key {
			"data" => match value.get("id") {
				Some(Value::Text(id)) => self.data.id = Some(id.clone()),
				Some(_) => return Err(invalid()),
				None if matches!(value, Value::Map(_)) => (),
				None => return Err(invalid()),
			},
			"text" => self.text = Some(value.to_string()),
			"id" => warn!("Ignoring `id` option: The DOM id is owned by the element key. Use `data.id` for an index name."),
			"autoClick" => self.auto_click = value.is_truthy(),
			"parent" => match value {
				Value::Text(name) => self.parent = Some(Target::Name(name)),
				_ => return Err(invalid()),
			},
			"content" => return Err(invalid()),
			"style" => match value {
				Value::Text(css) => self.setters.push(Setter::Style(StyleSheet::Text(css))),
				Value::Map(rules) => self.setters.push(Setter::Style(StyleSheet::Rules(
					rules.into_iter().map(|(name, value)| (name, value.to_string())).collect(),
				))),
				_ => return Err(invalid()),
			},
			"className" | "class" => self.setters.push(Setter::ClassName(value.to_string())),
			_ => match value {
				Value::Map(entries) => self.setters.push(Setter::Merge {
					property: key.to_owned(),
					entries,
				}),
				value => self.setters.push(Setter::Property { name: key.to_owned(), value }),
			},
		}
		Ok(self)
	}

	/// Binds `listener` through a flat key like `"onclick$save"`.
	///
	/// # Errors
	///
	/// Iff `key` doesn't start with `"on"`.
	pub fn set_listener(self, key: &str, listener: impl Fn(&Wrapper<H>, &H::Event) + 'static) -> Result<Self, Error> {
		match key.strip_prefix(EVENT_PREFIX) {
			Some(event_key) if !event_key.is_empty() => Ok(self.on(event_key, listener)),
			_ => Err(report(ErrorKind::InvalidListener, Template::ListenerError, Some(key))),
		}
	}

	pub(crate) fn apply(&self, element: &Wrapper<H>, app: &AppInner<H>) -> Result<(), Error> {
		let (host, node) = (element.host(), element.node());
		for setter in &self.setters {
			match setter {
				Setter::Attribute { name, value } => host.set_attribute(node, name, value)?,
				Setter::Style(style) => {
					element.set_style_sheet(style.clone());
				}
				Setter::ClassName(names) => {
					element.set_class_name(names);
				}
				Setter::Property { name, value } => host.set_property(node, name, value)?,
				Setter::Merge { property, entries } => {
					for (key, value) in entries {
						host.merge_property(node, property, key, value)?;
					}
				}
				Setter::Call { method, args } => host.call_method(node, method, args)?,
				Setter::Event {
					event_type,
					name,
					options,
					listener,
				} => {
					element.add_event_rc(event_type, listener.clone(), name.as_deref(), *options)?;
				}
			}
		}

		if let Some(text) = &self.text {
			element.set_text(text);
		}

		if let Some(name) = &self.data.id {
			element.set_index_name(name)?;
		}

		if let Some(content) = &self.content {
			element.set_content(content.clone());
		}

		match &self.parent {
			Some(Target::Element(parent)) => {
				parent.add(element);
			}
			Some(Target::Name(name)) => {
				let element = element.clone();
				if let Err(error) = app.index.resolve(name, move |parent| {
					parent.add(&element);
				}) {
					error!("Failed to resolve parent {:?}: {}", name, error);
				}
			}
			None => (),
		}

		if self.auto_click {
			element.click();
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::host::memory::MemoryHost;

	#[test]
	fn event_key_parts() {
		let (event_type, name, options) = parse_event_key("click$save$capture,once");
		assert_eq!(event_type, "click");
		assert_eq!(name.as_deref(), Some("save"));
		assert_eq!(options, ListenerOptions::new().with_capture(true).with_once(true));
	}

	#[test]
	fn bare_event_key() {
		let (event_type, name, options) = parse_event_key("input");
		assert_eq!(event_type, "input");
		assert_eq!(name, None);
		assert_eq!(options, ListenerOptions::default());
	}

	#[test]
	fn empty_name_is_generated() {
		let (_, name, options) = parse_event_key("click$$passive");
		assert_eq!(name, None);
		assert!(options.passive);
	}

	#[test]
	fn flat_keys_are_classified() {
		let options = Options::<MemoryHost>::new()
			.set("data", [("id", "menu")])
			.and_then(|options| options.set("text", "Menu"))
			.and_then(|options| options.set("id", "ignored"))
			.and_then(|options| options.set("autoClick", true))
			.and_then(|options| options.set("parent", "main"))
			.and_then(|options| options.set("className", "menu open"))
			.and_then(|options| options.set("style", [("color", "red")]))
			.and_then(|options| options.set("dataset", [("role", "nav")]))
			.and_then(|options| options.set("title", "Main menu"))
			.unwrap();

		assert_eq!(options.data.id.as_deref(), Some("menu"));
		assert_eq!(options.text.as_deref(), Some("Menu"));
		assert!(options.auto_click);
		assert!(matches!(&options.parent, Some(Target::Name(name)) if name == "main"));
		assert_eq!(options.setters.len(), 4);
		assert!(matches!(&options.setters[0], Setter::ClassName(names) if names == "menu open"));
		assert!(matches!(&options.setters[1], Setter::Style(StyleSheet::Rules(rules)) if rules == &[("color".to_owned(), "red".to_owned())]));
		assert!(matches!(&options.setters[2], Setter::Merge { property, .. } if property == "dataset"));
		assert!(matches!(&options.setters[3], Setter::Property { name, value } if name == "title" && value == &Value::from("Main menu")));
	}

	#[test]
	fn content_is_not_flat() {
		let error = Options::<MemoryHost>::new().set("content", Value::List(vec![])).unwrap_err();
		assert_eq!(error.kind(), ErrorKind::InvalidOption);
	}

	#[test]
	fn listener_keys_need_prefix() {
		let error = Options::<MemoryHost>::new().set_listener("click", |_, _| ()).unwrap_err();
		assert_eq!(error.kind(), ErrorKind::InvalidListener);
		assert_eq!(error.to_string(), "InvalidListener: click is not a callback function");

		let options = Options::<MemoryHost>::new().set_listener("onclick$save", |_, _| ()).unwrap();
		assert!(matches!(&options.setters[0], Setter::Event { event_type, name: Some(name), .. } if event_type == "click" && name == "save"));
	}
}
