use rstest::{fixture, rstest};
use std::{cell::RefCell, rc::Rc};
use strap_dom::{
	channel::{ChannelError, ChannelFlags, ChannelRegistry, OnResult},
	Scheduler,
};

mod memory_app_;

#[fixture]
fn scheduler() -> Rc<Scheduler> {
	memory_app_::init_logging();
	Scheduler::new()
}

fn collect<R: 'static>(sink: &Rc<RefCell<Vec<Option<R>>>>) -> Option<OnResult<R>> {
	let sink = sink.clone();
	Some(Box::new(move |data| sink.borrow_mut().push(data)))
}

#[rstest]
fn ping(scheduler: Rc<Scheduler>) {
	let channels = ChannelRegistry::<(), i32>::new(scheduler.clone());
	channels.handle("ping", |event, ()| event.send(42)).unwrap();

	let results = Rc::new(RefCell::new(Vec::new()));
	channels.invoke("ping", collect(&results), ()).unwrap();
	assert!(results.borrow().is_empty());

	scheduler.run_until_idle();
	assert_eq!(*results.borrow(), [Some(42)]);
}

#[rstest]
fn invoke_before_handle(scheduler: Rc<Scheduler>) {
	let channels = ChannelRegistry::<(i32, &'static str), String>::new(scheduler.clone());
	let results = Rc::new(RefCell::new(Vec::new()));
	channels.invoke("greet", collect(&results), (3, "hi")).unwrap();
	scheduler.advance(5);
	assert!(results.borrow().is_empty());

	let calls = Rc::new(RefCell::new(0));
	channels
		.handle("greet", {
			let calls = calls.clone();
			move |event, (times, word)| {
				*calls.borrow_mut() += 1;
				event.send(word.repeat(times as usize));
			}
		})
		.unwrap();
	assert_eq!(*calls.borrow(), 0);

	scheduler.run_until_idle();
	assert_eq!(*calls.borrow(), 1);
	assert_eq!(*results.borrow(), [Some("hihihi".to_owned())]);
}

#[rstest]
fn queued_invocations_keep_order(scheduler: Rc<Scheduler>) {
	let channels = ChannelRegistry::<i32, i32>::new(scheduler.clone());
	let results = Rc::new(RefCell::new(Vec::new()));
	for i in 0..3 {
		channels.invoke("double", collect(&results), i).unwrap();
	}
	channels.handle("double", |event, i| event.send(i * 2)).unwrap();
	scheduler.run_until_idle();
	assert_eq!(*results.borrow(), [Some(0), Some(2), Some(4)]);
}

#[rstest]
fn result_without_send(scheduler: Rc<Scheduler>) {
	let channels = ChannelRegistry::<(), i32>::new(scheduler.clone());
	channels.handle("quiet", |_, ()| ()).unwrap();
	let results = Rc::new(RefCell::new(Vec::new()));
	channels.invoke("quiet", collect(&results), ()).unwrap();
	scheduler.run_until_idle();
	assert_eq!(*results.borrow(), [None]);
}

#[rstest]
#[case("")]
#[case("   ")]
fn invalid_names(scheduler: Rc<Scheduler>, #[case] name: &str) {
	let channels = ChannelRegistry::<(), ()>::new(scheduler);
	assert_eq!(channels.handle(name, |_, ()| ()), Err(ChannelError::InvalidName));
	assert_eq!(channels.invoke(name, None, ()), Err(ChannelError::InvalidName));
	assert_eq!(channels.remove_event(name), Err(ChannelError::InvalidName));
}

#[rstest]
fn locked_channels(scheduler: Rc<Scheduler>) {
	let channels = ChannelRegistry::<(), i32>::new(scheduler.clone());
	channels.handle_with("fixed", |event, ()| event.send(1), ChannelFlags::LOCKED).unwrap();

	assert_eq!(channels.handle("fixed", |event, ()| event.send(2)), Err(ChannelError::NonWritable("fixed".to_owned())));
	assert_eq!(channels.remove_event("fixed"), Err(ChannelError::NonRemovable("fixed".to_owned())));

	let results = Rc::new(RefCell::new(Vec::new()));
	channels.invoke("fixed", collect(&results), ()).unwrap();
	scheduler.run_until_idle();
	assert_eq!(*results.borrow(), [Some(1)]);
}

#[rstest]
fn writable_channels_are_replaced(scheduler: Rc<Scheduler>) {
	let channels = ChannelRegistry::<(), i32>::new(scheduler.clone());
	channels.handle("value", |event, ()| event.send(1)).unwrap();
	channels.handle("value", |event, ()| event.send(2)).unwrap();

	let results = Rc::new(RefCell::new(Vec::new()));
	channels.invoke("value", collect(&results), ()).unwrap();
	scheduler.run_until_idle();
	assert_eq!(*results.borrow(), [Some(2)]);
}

#[rstest]
fn introspection_and_removal(scheduler: Rc<Scheduler>) {
	let channels = ChannelRegistry::<(), ()>::new(scheduler);
	channels.handle("a", |_, ()| ()).unwrap();
	channels.handle("b", |_, ()| ()).unwrap();

	let mut names = channels.events_list().unwrap();
	names.sort();
	assert_eq!(names, ["a", "b"]);
	assert_eq!(channels.has_event("a"), Ok(true));

	channels.remove_event("a").unwrap();
	assert_eq!(channels.has_event("a"), Ok(false));
	assert_eq!(channels.remove_event("a"), Err(ChannelError::NotFound("a".to_owned())));
}

#[rstest]
fn cleared_registry(scheduler: Rc<Scheduler>) {
	let channels = ChannelRegistry::<(), i32>::new(scheduler.clone());
	channels.handle("ping", |event, ()| event.send(42)).unwrap();
	let results = Rc::new(RefCell::new(Vec::new()));
	channels.invoke("ping", collect(&results), ()).unwrap();
	channels.invoke("never", collect(&results), ()).unwrap();

	channels.clear().unwrap();
	scheduler.run_until_idle();
	assert!(results.borrow().is_empty());

	assert_eq!(channels.handle("ping", |_, ()| ()), Err(ChannelError::Destroyed));
	assert_eq!(channels.invoke("ping", None, ()), Err(ChannelError::Destroyed));
	assert_eq!(channels.events_list(), Err(ChannelError::Destroyed));
	assert_eq!(channels.has_event("ping"), Err(ChannelError::Destroyed));
	assert_eq!(channels.remove_event("ping"), Err(ChannelError::Destroyed));
	assert_eq!(channels.clear(), Err(ChannelError::Destroyed));
}
