//! String aliases for wrappers, resolvable regardless of creation order.

use crate::{
	channel::{ChannelError, ChannelFlags, ChannelRegistry},
	element::Wrapper,
	error::{not_unique, Error},
	host::Host,
	scheduler::Scheduler,
};
use core::fmt::{self, Debug, Formatter};
use std::rc::Rc;
use tracing::debug;

/// Maps index names to live wrappers.
///
/// Each name is a locked channel whose listener sends the claiming wrapper back. A [`resolve`](`IndexTable::resolve`)
/// issued before the name is claimed waits until it is.
pub struct IndexTable<H: Host> {
	channels: ChannelRegistry<(), Wrapper<H>>,
}

impl<H: Host> Clone for IndexTable<H> {
	fn clone(&self) -> Self {
		Self { channels: self.channels.clone() }
	}
}

impl<H: Host> Debug for IndexTable<H> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_tuple("IndexTable").field(&self.channels).finish()
	}
}

impl<H: Host> IndexTable<H> {
	#[must_use]
	pub fn new(scheduler: Rc<Scheduler>) -> Self {
		Self {
			channels: ChannelRegistry::new(scheduler),
		}
	}

	/// Claims `name` for `element`.
	///
	/// # Errors
	///
	/// Iff `name` is empty or already claimed.
	pub fn claim(&self, name: &str, element: &Wrapper<H>) -> Result<(), Error> {
		let weak = element.downgrade();
		let claimed = self.channels.handle_with(
			name,
			move |event, ()| {
				if let Some(element) = weak.upgrade() {
					event.send(element);
				}
			},
			ChannelFlags::LOCKED,
		);
		match claimed {
			Ok(()) => {
				debug!(name, key = element.key(), "Claimed index name.");
				Ok(())
			}
			Err(ChannelError::NonWritable(name)) => Err(not_unique("index name", &name)),
			Err(error) => Err(error.into()),
		}
	}

	/// Calls `callback` with the wrapper claiming `name`, on a later tick. Waits for the claim if necessary.
	///
	/// # Errors
	///
	/// Iff `name` is empty.
	pub fn resolve(&self, name: &str, callback: impl FnOnce(Wrapper<H>) + 'static) -> Result<(), Error> {
		let on_result = Box::new(move |element: Option<Wrapper<H>>| {
			if let Some(element) = element {
				callback(element);
			}
		});
		self.channels.invoke(name, Some(on_result), ()).map_err(Into::into)
	}

	/// Frees `name`. Returns whether it was claimed.
	pub fn release(&self, name: &str) -> bool {
		let released = self.channels.retire(name);
		debug!(name, released, "Released index name.");
		released
	}

	#[must_use]
	pub fn contains(&self, name: &str) -> bool {
		self.channels.has_event(name).unwrap_or(false)
	}
}
