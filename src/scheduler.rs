//! A single-threaded, virtual-time task queue.
//!
//! All deferred work of the runtime (channel deliveries, lifecycle notifications, destroy grace windows, staggered
//! additions and removals) is queued here as a task due on a given *tick*. Nothing runs until the queue is driven,
//! either explicitly through [`Scheduler::tick`] and friends or by a host waker (see [`crate::host::web::drive`]).

use core::{
	cell::{Cell, RefCell},
	cmp::Ordering,
	fmt::{self, Debug, Formatter},
};
use std::{
	collections::{BinaryHeap, VecDeque},
	rc::{Rc, Weak},
};
use tracing::{trace, warn};

/// A unit of deferred work.
pub type Task = Box<dyn FnOnce()>;

/// Delays used by the runtime, in ticks. One tick is nominally 10ms on the web host.
pub mod ticks {
	/// Channel deliveries always happen on a fresh turn.
	pub const INVOKE: u64 = 1;
	/// Delay of `add` lifecycle listeners.
	pub const ADD_LISTENER: u64 = 1;
	/// Grace window between `destroy()` and the actual teardown.
	pub const DESTROY_GRACE: u64 = 10;
	/// Slot width of staggered additions and removals.
	pub const STAGGER: u64 = 10;
	/// Delay before `render_root` checks readiness.
	pub const RENDER_ROOT: u64 = 50;
	/// Delay between the readiness check and mounting the tree.
	pub const MOUNT: u64 = 30;
	/// Nominal length of one tick in milliseconds.
	pub const TICK_MS: i32 = 10;
}

/// [`Scheduler::run_until_idle`] gives up after this many ticks.
pub const MAX_IDLE_TICKS: u64 = 100_000;

struct Timer {
	due: u64,
	seq: u64,
	task: Task,
}

impl PartialEq for Timer {
	fn eq(&self, other: &Self) -> bool {
		self.due == other.due && self.seq == other.seq
	}
}
impl Eq for Timer {}
impl PartialOrd for Timer {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}
impl Ord for Timer {
	fn cmp(&self, other: &Self) -> Ordering {
		// Min-heap: earliest due first, then scheduling order.
		other.due.cmp(&self.due).then_with(|| other.seq.cmp(&self.seq))
	}
}

#[derive(Default)]
struct Queue {
	now: u64,
	seq: u64,
	timers: BinaryHeap<Timer>,
}

#[derive(Default)]
pub struct Scheduler {
	queue: RefCell<Queue>,
	waker: RefCell<Option<Rc<dyn Fn()>>>,
	running: Cell<bool>,
}

impl Debug for Scheduler {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let queue = self.queue.borrow();
		f.debug_struct("Scheduler").field("now", &queue.now).field("pending", &queue.timers.len()).finish()
	}
}

impl Scheduler {
	#[must_use]
	pub fn new() -> Rc<Self> {
		Rc::new(Self::default())
	}

	/// The current tick.
	#[must_use]
	pub fn now(&self) -> u64 {
		self.queue.borrow().now
	}

	/// Number of queued tasks.
	#[must_use]
	pub fn pending(&self) -> usize {
		self.queue.borrow().timers.len()
	}

	/// Installs a callback that is notified whenever a task is queued.
	pub fn set_waker(&self, waker: impl Fn() + 'static) {
		*self.waker.borrow_mut() = Some(Rc::new(waker));
	}

	/// Runs `task` on the next tick.
	pub fn defer(&self, task: impl FnOnce() + 'static) {
		self.after(1, task);
	}

	/// Runs `task` `ticks` slots from now. Zero is treated as one: nothing ever runs synchronously.
	pub fn after(&self, ticks: u64, task: impl FnOnce() + 'static) {
		{
			let mut queue = self.queue.borrow_mut();
			let due = queue.now + ticks.max(1);
			queue.seq += 1;
			let seq = queue.seq;
			queue.timers.push(Timer { due, seq, task: Box::new(task) });
			trace!(due, seq, "Queued task.");
		}
		let waker = self.waker.borrow().clone();
		if let Some(waker) = waker {
			waker();
		}
	}

	/// Runs `units` one per slot, `interval` ticks apart, starting `interval` ticks from now.
	///
	/// `done` runs in the slot of the last unit, right after it. With no units, it runs in the first slot.
	pub fn stagger(self: &Rc<Self>, interval: u64, units: impl IntoIterator<Item = Task>, done: Option<Task>) {
		next_slot(Rc::downgrade(self), interval, units.into_iter().collect(), done);
	}

	/// Advances by one tick and runs every task that is due.
	///
	/// Returns the number of tasks run.
	pub fn tick(&self) -> usize {
		if self.running.replace(true) {
			warn!("Reentrant `Scheduler::tick` ignored.");
			return 0;
		}
		let now = {
			let mut queue = self.queue.borrow_mut();
			queue.now += 1;
			queue.now
		};

		let mut ran = 0;
		loop {
			let task = {
				let mut queue = self.queue.borrow_mut();
				match queue.timers.peek() {
					Some(timer) if timer.due <= now => queue.timers.pop().map(|timer| timer.task),
					_ => None,
				}
			};
			match task {
				Some(task) => {
					task();
					ran += 1;
				}
				None => break,
			}
		}
		self.running.set(false);
		ran
	}

	/// Runs `ticks` ticks. Returns the number of tasks run.
	pub fn advance(&self, ticks: u64) -> usize {
		(0..ticks).map(|_| self.tick()).sum()
	}

	/// Ticks until the queue is empty. Returns the number of tasks run.
	pub fn run_until_idle(&self) -> usize {
		let mut ran = 0;
		let mut ticks = 0;
		while self.pending() > 0 {
			if ticks == MAX_IDLE_TICKS {
				warn!(pending = self.pending(), "Scheduler did not become idle within {} ticks.", MAX_IDLE_TICKS);
				break;
			}
			ran += self.tick();
			ticks += 1;
		}
		ran
	}
}

fn next_slot(scheduler: Weak<Scheduler>, interval: u64, mut units: VecDeque<Task>, done: Option<Task>) {
	let Some(strong) = scheduler.upgrade() else {
		return;
	};
	strong.after(interval, move || {
		if let Some(unit) = units.pop_front() {
			unit();
		}
		if units.is_empty() {
			if let Some(done) = done {
				done();
			}
		} else {
			next_slot(scheduler, interval, units, done);
		}
	});
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn same_tick_runs_in_scheduling_order() {
		let scheduler = Scheduler::new();
		let log = Rc::new(RefCell::new(Vec::new()));
		for i in 0..3 {
			let log = log.clone();
			scheduler.defer(move || log.borrow_mut().push(i));
		}
		assert_eq!(scheduler.tick(), 3);
		assert_eq!(*log.borrow(), [0, 1, 2]);
	}

	#[test]
	fn nested_defer_waits_for_the_next_tick() {
		let scheduler = Scheduler::new();
		let hits = Rc::new(Cell::new(0));
		{
			let (inner, hits) = (scheduler.clone(), hits.clone());
			scheduler.defer(move || {
				hits.set(hits.get() + 1);
				let hits = hits.clone();
				inner.defer(move || hits.set(hits.get() + 10));
			});
		}
		scheduler.tick();
		assert_eq!(hits.get(), 1);
		scheduler.tick();
		assert_eq!(hits.get(), 11);
	}

	#[test]
	fn stagger_runs_one_unit_per_slot() {
		let scheduler = Scheduler::new();
		let log = Rc::new(RefCell::new(Vec::new()));
		let units = (0..3).map(|i| {
			let log = log.clone();
			Box::new(move || log.borrow_mut().push(i)) as Task
		});
		let done = {
			let log = log.clone();
			Box::new(move || log.borrow_mut().push(99)) as Task
		};
		scheduler.stagger(2, units, Some(done));

		scheduler.advance(2);
		assert_eq!(*log.borrow(), [0]);
		scheduler.advance(2);
		assert_eq!(*log.borrow(), [0, 1]);
		scheduler.advance(2);
		assert_eq!(*log.borrow(), [0, 1, 2, 99]);
		assert_eq!(scheduler.pending(), 0);
	}

	#[test]
	fn stagger_without_units_still_completes() {
		let scheduler = Scheduler::new();
		let done = Rc::new(Cell::new(false));
		let flag = done.clone();
		scheduler.stagger(5, Vec::new(), Some(Box::new(move || flag.set(true))));
		scheduler.run_until_idle();
		assert!(done.get());
		assert_eq!(scheduler.now(), 5);
	}
}
