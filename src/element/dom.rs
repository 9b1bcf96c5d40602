//! Node mutations and queries: text, classes, attributes, inline style, visibility and named event listeners.
//!
//! Host failures in chainable mutators are logged rather than returned.

use super::{Binding, Listener, State, Wrapper};
use crate::{
	error::{not_unique, Error},
	host::{ClassOp, Host, ListenerOptions},
};
use hashbrown::HashMap;
use std::rc::Rc;
use tracing::{debug, error, trace};

/// Inline style input of [`Wrapper::set_style_sheet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleSheet {
	/// Replaces the whole declaration, like assigning `style.cssText`.
	Text(String),
	/// Assigned property by property, in order.
	Rules(Vec<(String, String)>),
}

impl From<&str> for StyleSheet {
	fn from(text: &str) -> Self {
		StyleSheet::Text(text.to_owned())
	}
}

impl From<String> for StyleSheet {
	fn from(text: String) -> Self {
		StyleSheet::Text(text)
	}
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for StyleSheet {
	fn from(rules: [(K, V); N]) -> Self {
		StyleSheet::Rules(rules.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
	}
}

impl From<Vec<(String, String)>> for StyleSheet {
	fn from(rules: Vec<(String, String)>) -> Self {
		StyleSheet::Rules(rules)
	}
}

fn tokens(names: &str) -> impl Iterator<Item = &str> {
	names.split(' ').filter(|token| !token.is_empty())
}

impl<H: Host> Wrapper<H> {
	fn class_op(&self, op: ClassOp<'_>) {
		if let Err(error) = self.host().class_list(self.node(), op) {
			error!("Class list operation {:?} failed on {}: {}", op, self.key(), error);
		}
	}

	/// Replaces the node's content with `text`.
	pub fn set_text(&self, text: &str) -> &Self {
		#[cfg(feature = "dangerous-logging")]
		trace!(key = self.key(), text, "Setting text.");
		#[cfg(not(feature = "dangerous-logging"))]
		trace!(key = self.key(), "Setting text.");
		self.host().set_text(self.node(), text);
		self
	}

	#[must_use]
	pub fn get_text(&self) -> String {
		self.host().text(self.node())
	}

	/// Adds each space-separated class in `names`.
	pub fn set_class_name(&self, names: &str) -> &Self {
		tokens(names).for_each(|token| self.class_op(ClassOp::Add(token)));
		self
	}

	pub fn remove_class_name(&self, names: &str) -> &Self {
		tokens(names).for_each(|token| self.class_op(ClassOp::Remove(token)));
		self
	}

	pub fn toggle_class_name(&self, names: &str) -> &Self {
		tokens(names).for_each(|token| self.class_op(ClassOp::Toggle(token)));
		self
	}

	/// Replaces the n-th class of `old` with the n-th class of `new`. Unpaired tokens are ignored.
	pub fn replace_class_name(&self, old: &str, new: &str) -> &Self {
		tokens(old).zip(tokens(new)).for_each(|(old, new)| self.class_op(ClassOp::Replace(old, new)));
		self
	}

	pub fn add_attr(&self, name: &str, value: &str) -> &Self {
		#[cfg(feature = "dangerous-logging")]
		trace!(key = self.key(), name, value, "Setting attribute.");
		#[cfg(not(feature = "dangerous-logging"))]
		trace!(key = self.key(), name, "Setting attribute.");
		if let Err(error) = self.host().set_attribute(self.node(), name, value) {
			error!("Failed to set attribute {:?} on {}: {}", name, self.key(), error);
		}
		self
	}

	pub fn add_attrs<'a>(&self, attributes: impl IntoIterator<Item = (&'a str, &'a str)>) -> &Self {
		for (name, value) in attributes {
			self.add_attr(name, value);
		}
		self
	}

	#[must_use]
	pub fn get_attr(&self, name: &str) -> Option<String> {
		self.host().attribute(self.node(), name)
	}

	/// Reads several attributes at once.
	#[must_use]
	pub fn get_attrs<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> HashMap<String, Option<String>> {
		names.into_iter().map(|name| (name.to_owned(), self.get_attr(name))).collect()
	}

	pub fn remove_attr(&self, name: &str) -> &Self {
		if let Err(error) = self.host().remove_attribute(self.node(), name) {
			error!("Failed to remove attribute {:?} from {}: {}", name, self.key(), error);
		}
		self
	}

	pub fn remove_attrs<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> &Self {
		for name in names {
			self.remove_attr(name);
		}
		self
	}

	pub fn set_style_sheet(&self, style: impl Into<StyleSheet>) -> &Self {
		match style.into() {
			StyleSheet::Text(css) => self.host().set_style_text(self.node(), &css),
			StyleSheet::Rules(rules) => {
				for (name, value) in rules {
					if let Err(error) = self.host().set_style_property(self.node(), &name, &value) {
						error!("Failed to set style {:?} on {}: {}", name, self.key(), error);
					}
				}
			}
		}
		self
	}

	/// Hides the node through its `hidden` attribute.
	pub fn hide(&self) -> &Self {
		self.add_attr("hidden", "true");
		self.0.state.set(State {
			visible: false,
			..self.state()
		});
		self
	}

	pub fn show(&self) -> &Self {
		self.remove_attr("hidden");
		self.0.state.set(State { visible: true, ..self.state() });
		self
	}

	/// Synthesizes a click on the node.
	pub fn click(&self) -> &Self {
		self.host().click(self.node());
		self
	}

	/// Binds `listener` to `event_type` under `name`, or under a random name if `None`.
	///
	/// Returns the name the listener can be removed by.
	///
	/// # Errors
	///
	/// Iff `name` is bound for `event_type` already (the existing binding is kept) or the host rejects the listener.
	pub fn add_event(
		&self,
		event_type: &str,
		listener: impl Fn(&Wrapper<H>, &H::Event) + 'static,
		name: Option<&str>,
		options: ListenerOptions,
	) -> Result<String, Error> {
		self.add_event_rc(event_type, Rc::new(listener), name, options)
	}

	pub(crate) fn add_event_rc(&self, event_type: &str, listener: Listener<H>, name: Option<&str>, options: ListenerOptions) -> Result<String, Error> {
		let name = name.map_or_else(|| uuid::Uuid::new_v4().simple().to_string(), str::to_owned);
		if self.has_listener(event_type, &name) {
			return Err(not_unique("listener name", &name));
		}

		let weak = self.downgrade();
		let (bound_type, bound_name) = (event_type.to_owned(), name.clone());
		let handle = self.host().add_event_listener(
			self.node(),
			event_type,
			Rc::new(move |event: &H::Event| {
				if let Some(this) = weak.upgrade().filter(|this| !this.is_destroyed()) {
					if options.once {
						// The host dropped the native listener already.
						if let Some(binding) = this.take_binding(&bound_type, &bound_name) {
							trace!(key = this.key(), event_type = bound_type.as_str(), name = bound_name.as_str(), "Once listener fired.");
							match this.app() {
								// The handle may be the callback that is running right now.
								Some(app) => app.scheduler.defer(move || drop(binding)),
								None => drop(binding),
							}
						}
					}
					listener(&this, event);
				}
			}),
			options,
		)?;

		debug!(key = self.key(), event_type, name, "Added listener.");
		self.0
			.events
			.borrow_mut()
			.entry(event_type.to_owned())
			.or_default()
			.insert(name.clone(), Binding { handle, options });
		Ok(name)
	}

	/// Unbinds the listener `name` from `event_type`. Does nothing if there is none.
	pub fn remove_event(&self, event_type: &str, name: &str) -> &Self {
		if let Some(binding) = self.take_binding(event_type, name) {
			if let Err(error) = self.host().remove_event_listener(self.node(), event_type, &binding.handle, binding.options) {
				error!("Failed to remove {} listener {:?} from {}: {}", event_type, name, self.key(), error);
			}
			debug!(key = self.key(), event_type, name, "Removed listener.");
		}
		self
	}

	fn take_binding(&self, event_type: &str, name: &str) -> Option<Binding<H>> {
		let mut events = self.0.events.borrow_mut();
		let named = events.get_mut(event_type)?;
		let binding = named.remove(name);
		if named.is_empty() {
			events.remove(event_type);
		}
		binding
	}

	#[must_use]
	pub fn has_listener(&self, event_type: &str, name: &str) -> bool {
		self.0.events.borrow().get(event_type).map_or(false, |named| named.contains_key(name))
	}

	/// Names of the listeners bound to `event_type`, in no particular order.
	#[must_use]
	pub fn listener_names(&self, event_type: &str) -> Vec<String> {
		self.0.events.borrow().get(event_type).map(|named| named.keys().cloned().collect()).unwrap_or_default()
	}
}
