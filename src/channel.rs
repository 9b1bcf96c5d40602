//! Named publish/subscribe channels with deferred delivery.
//!
//! A channel may be [invoked](`ChannelRegistry::invoke`) before it is [handled](`ChannelRegistry::handle`).
//! Such invocations wait in a per-channel queue and are replayed, in arrival order, once a listener is registered.
//! Deliveries always run on a later [`Scheduler`] tick, so `handle` followed by `invoke` behaves exactly like
//! the reverse order.

use crate::scheduler::{ticks, Scheduler};
use core::{
	cell::RefCell,
	fmt::{self, Debug, Formatter},
};
use hashbrown::HashMap;
use std::rc::{Rc, Weak};
use tracing::trace;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
	#[error("Invalid channel name: The channel name must be a non-empty string.")]
	InvalidName,
	#[error("Cannot redefine the channel {0:?} because it is marked as non-writable.")]
	NonWritable(String),
	#[error("Cannot remove the channel {0:?} because it does not exist.")]
	NotFound(String),
	#[error("Cannot remove the channel {0:?} because it is marked as non-removable.")]
	NonRemovable(String),
	#[error("Operation failed: The channel registry has been cleared.")]
	Destroyed,
}

/// Registration flags of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelFlags {
	/// Whether [`ChannelRegistry::remove_event`] may remove the channel.
	pub removable: bool,
	/// Whether a later [`ChannelRegistry::handle`] may replace the listener.
	pub writable: bool,
}

impl ChannelFlags {
	/// Neither removable nor writable.
	pub const LOCKED: Self = Self { removable: false, writable: false };
}

impl Default for ChannelFlags {
	fn default() -> Self {
		Self { removable: true, writable: true }
	}
}

/// Handed to channel listeners to send a result back to the invoker.
#[derive(Debug)]
pub struct Event<R> {
	channel: Rc<str>,
	data: Option<R>,
}

impl<R> Event<R> {
	/// The invoked channel.
	#[must_use]
	pub fn channel(&self) -> &str {
		&self.channel
	}

	/// Stores `data` for the invoker's result callback. A later call overwrites an earlier one.
	pub fn send(&mut self, data: R) {
		self.data = Some(data);
	}
}

type Listener<A, R> = Rc<dyn Fn(&mut Event<R>, A)>;

/// Callback receiving whatever the listener [sent](`Event::send`), if anything.
pub type OnResult<R> = Box<dyn FnOnce(Option<R>)>;

struct Channel<A, R> {
	listener: Listener<A, R>,
	flags: ChannelFlags,
}

struct Registry<A, R> {
	channels: HashMap<Rc<str>, Channel<A, R>>,
	waiting: HashMap<Rc<str>, Vec<Box<dyn FnOnce()>>>,
	destroyed: bool,
}

/// A cheaply cloneable handle to one channel registry.
pub struct ChannelRegistry<A, R> {
	registry: Rc<RefCell<Registry<A, R>>>,
	scheduler: Rc<Scheduler>,
}

impl<A, R> Clone for ChannelRegistry<A, R> {
	fn clone(&self) -> Self {
		Self {
			registry: self.registry.clone(),
			scheduler: self.scheduler.clone(),
		}
	}
}

impl<A, R> Debug for ChannelRegistry<A, R> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let registry = self.registry.borrow();
		f.debug_struct("ChannelRegistry")
			.field("channels", &registry.channels.keys().collect::<Vec<_>>())
			.field("waiting", &registry.waiting.keys().collect::<Vec<_>>())
			.field("destroyed", &registry.destroyed)
			.finish()
	}
}

fn validate(channel: &str) -> Result<(), ChannelError> {
	if channel.trim().is_empty() {
		Err(ChannelError::InvalidName)
	} else {
		Ok(())
	}
}

impl<A: 'static, R: 'static> ChannelRegistry<A, R> {
	#[must_use]
	pub fn new(scheduler: Rc<Scheduler>) -> Self {
		Self {
			registry: Rc::new(RefCell::new(Registry {
				channels: HashMap::new(),
				waiting: HashMap::new(),
				destroyed: false,
			})),
			scheduler,
		}
	}

	fn check_state(&self) -> Result<(), ChannelError> {
		if self.registry.borrow().destroyed {
			Err(ChannelError::Destroyed)
		} else {
			Ok(())
		}
	}

	/// Registers a removable and writable `listener` under `channel`.
	///
	/// # Errors
	///
	/// See [`handle_with`](`ChannelRegistry::handle_with`).
	pub fn handle(&self, channel: &str, listener: impl Fn(&mut Event<R>, A) + 'static) -> Result<(), ChannelError> {
		self.handle_with(channel, listener, ChannelFlags::default())
	}

	/// Registers `listener` under `channel` and replays invocations that arrived earlier.
	///
	/// # Errors
	///
	/// Iff the registry was cleared, the name is empty, or a non-writable channel of that name exists.
	pub fn handle_with(&self, channel: &str, listener: impl Fn(&mut Event<R>, A) + 'static, flags: ChannelFlags) -> Result<(), ChannelError> {
		self.check_state()?;
		validate(channel)?;

		let replay = {
			let mut registry = self.registry.borrow_mut();
			if matches!(registry.channels.get(channel), Some(existing) if !existing.flags.writable) {
				return Err(ChannelError::NonWritable(channel.to_owned()));
			}
			registry.channels.insert(
				channel.into(),
				Channel {
					listener: Rc::new(listener),
					flags,
				},
			);
			registry.waiting.remove(channel).unwrap_or_default()
		};

		trace!(channel, replayed = replay.len(), "Handled channel.");
		for delivery in replay {
			self.scheduler.after(ticks::INVOKE, delivery);
		}
		Ok(())
	}

	/// Schedules the listener of `channel` with `args`, then `on_result` with whatever it sent.
	///
	/// If `channel` has no listener yet, the delivery waits until one is handled.
	///
	/// # Errors
	///
	/// Iff the registry was cleared or the name is empty.
	pub fn invoke(&self, channel: &str, on_result: Option<OnResult<R>>, args: A) -> Result<(), ChannelError> {
		self.check_state()?;
		validate(channel)?;

		let name: Rc<str> = channel.into();
		let delivery = deliver(Rc::downgrade(&self.registry), name.clone(), on_result, args);

		let mut registry = self.registry.borrow_mut();
		if registry.channels.contains_key(channel) {
			drop(registry);
			self.scheduler.after(ticks::INVOKE, delivery);
		} else {
			trace!(channel, "Queued invocation of unhandled channel.");
			registry.waiting.entry(name).or_default().push(Box::new(delivery));
		}
		Ok(())
	}

	/// Removes `channel` together with its waiting invocations.
	///
	/// # Errors
	///
	/// Iff the registry was cleared, the name is empty, or the channel is missing or non-removable.
	pub fn remove_event(&self, channel: &str) -> Result<(), ChannelError> {
		self.check_state()?;
		validate(channel)?;

		let mut registry = self.registry.borrow_mut();
		match registry.channels.get(channel) {
			None => return Err(ChannelError::NotFound(channel.to_owned())),
			Some(existing) if !existing.flags.removable => return Err(ChannelError::NonRemovable(channel.to_owned())),
			Some(_) => (),
		}
		registry.channels.remove(channel);
		registry.waiting.remove(channel);
		Ok(())
	}

	/// Removes `channel` regardless of its flags. Reserved to whoever registered it.
	pub(crate) fn retire(&self, channel: &str) -> bool {
		let mut registry = self.registry.borrow_mut();
		registry.waiting.remove(channel);
		registry.channels.remove(channel).is_some()
	}

	/// Names of all handled channels, in no particular order.
	///
	/// # Errors
	///
	/// Iff the registry was cleared.
	pub fn events_list(&self) -> Result<Vec<String>, ChannelError> {
		self.check_state()?;
		Ok(self.registry.borrow().channels.keys().map(|name| name.to_string()).collect())
	}

	/// # Errors
	///
	/// Iff the registry was cleared.
	pub fn has_event(&self, channel: &str) -> Result<bool, ChannelError> {
		self.check_state()?;
		Ok(self.registry.borrow().channels.contains_key(channel))
	}

	/// Irreversibly disposes the registry. Waiting and scheduled deliveries are dropped.
	///
	/// # Errors
	///
	/// Iff the registry was already cleared.
	pub fn clear(&self) -> Result<(), ChannelError> {
		self.check_state()?;
		let (channels, waiting) = {
			let mut registry = self.registry.borrow_mut();
			registry.destroyed = true;
			(core::mem::take(&mut registry.channels), core::mem::take(&mut registry.waiting))
		};
		// Listeners may own handles to this registry, so they are dropped outside of the borrow.
		drop(channels);
		drop(waiting);
		Ok(())
	}
}

fn deliver<A: 'static, R: 'static>(registry: Weak<RefCell<Registry<A, R>>>, channel: Rc<str>, on_result: Option<OnResult<R>>, args: A) -> impl FnOnce() + 'static {
	move || {
		let Some(registry) = registry.upgrade() else {
			return;
		};
		let listener = {
			let registry = registry.borrow();
			if registry.destroyed {
				return;
			}
			registry.channels.get(&channel).map(|channel| channel.listener.clone())
		};

		let mut event = Event { channel, data: None };
		if let Some(listener) = listener {
			listener(&mut event, args);
		}
		if registry.borrow().destroyed {
			return;
		}
		if let Some(on_result) = on_result {
			on_result(event.data.take());
		}
	}
}
