//! Ordered extension points invoked by the runtime.
//!
//! - `use_init` runs right after a wrapper is constructed,
//! - `use_option` runs after its [`Options`] were applied,
//! - `use_render` runs during its first render, after its children were appended.

use crate::{
	element::Wrapper,
	error::{report, Error, ErrorKind, Template},
	host::Host,
	options::Options,
};
use core::fmt::{self, Debug, Display, Formatter};
use std::rc::Rc;
use tracing::trace;

/// What a hook returns. An `Err` is reported as invalid listener; the remaining hooks still run.
pub type HookResult = Result<(), Error>;
pub type ElementHook<H> = Rc<dyn Fn(&Wrapper<H>) -> HookResult>;
pub type OptionHook<H> = Rc<dyn Fn(&Wrapper<H>, &Options<H>) -> HookResult>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookName {
	UseInit,
	UseOption,
	UseRender,
}

impl Display for HookName {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			HookName::UseInit => "useInit",
			HookName::UseOption => "useOption",
			HookName::UseRender => "useRender",
		})
	}
}

pub struct Hooks<H: Host> {
	use_init: Vec<ElementHook<H>>,
	use_option: Vec<OptionHook<H>>,
	use_render: Vec<ElementHook<H>>,
}

impl<H: Host> Default for Hooks<H> {
	fn default() -> Self {
		Self {
			use_init: Vec::new(),
			use_option: Vec::new(),
			use_render: Vec::new(),
		}
	}
}

impl<H: Host> Debug for Hooks<H> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Hooks")
			.field("use_init", &self.use_init.len())
			.field("use_option", &self.use_option.len())
			.field("use_render", &self.use_render.len())
			.finish()
	}
}

impl<H: Host> Hooks<H> {
	pub fn use_init(&mut self, hook: impl Fn(&Wrapper<H>) -> HookResult + 'static) -> &mut Self {
		self.use_init.push(Rc::new(hook));
		self
	}

	pub fn use_option(&mut self, hook: impl Fn(&Wrapper<H>, &Options<H>) -> HookResult + 'static) -> &mut Self {
		self.use_option.push(Rc::new(hook));
		self
	}

	pub fn use_render(&mut self, hook: impl Fn(&Wrapper<H>) -> HookResult + 'static) -> &mut Self {
		self.use_render.push(Rc::new(hook));
		self
	}

	#[must_use]
	pub fn len(&self, name: HookName) -> usize {
		match name {
			HookName::UseInit => self.use_init.len(),
			HookName::UseOption => self.use_option.len(),
			HookName::UseRender => self.use_render.len(),
		}
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.use_init.is_empty() && self.use_option.is_empty() && self.use_render.is_empty()
	}

	/// Moves all hooks of `other` behind those of `self`.
	pub fn append(&mut self, other: Self) {
		self.use_init.extend(other.use_init);
		self.use_option.extend(other.use_option);
		self.use_render.extend(other.use_render);
	}

	pub(crate) fn element_hooks(&self, name: HookName) -> Vec<ElementHook<H>> {
		match name {
			HookName::UseInit => self.use_init.clone(),
			HookName::UseRender => self.use_render.clone(),
			HookName::UseOption => Vec::new(),
		}
	}

	pub(crate) fn option_hooks(&self) -> Vec<OptionHook<H>> {
		self.use_option.clone()
	}
}

/// Invokes every hook in `hooks` in order through `invoke`.
///
/// Failing hooks are reported through `on_bad_listener` and don't stop the iteration.
pub fn call_hook<F: ?Sized>(name: HookName, hooks: &[Rc<F>], mut on_bad_listener: impl FnMut(Error), invoke: impl Fn(&F) -> HookResult) {
	trace!(%name, count = hooks.len(), "Calling hooks.");
	for (i, hook) in hooks.iter().enumerate() {
		if let Err(error) = invoke(hook.as_ref()) {
			on_bad_listener(report(ErrorKind::InvalidListener, Template::HookFailed, Some(&format!("{} hook #{} ({})", name, i, error))));
		}
	}
}
