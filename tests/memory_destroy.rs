use rstest::rstest;
use std::{cell::RefCell, rc::Rc};
use strap_dom::{scheduler::ticks, App, Lifecycle, ListenerOptions, MemoryHost, Options, Phase, Wrapper};

mod memory_app_;
use memory_app_::{app, counter};

fn tree(app: &App<MemoryHost>, children: usize) -> (Wrapper<MemoryHost>, Vec<Wrapper<MemoryHost>>) {
	let children = (0..children).map(|_| app.create("li", Options::new()).unwrap()).collect::<Vec<_>>();
	let parent = app.create("ul", Options::new().content(children.clone())).unwrap();
	parent.render();
	(parent, children)
}

#[rstest]
fn destroy_unlinks_after_grace(app: App<MemoryHost>) {
	let (parent, children) = tree(&app, 2);
	let child = &children[0];
	let count = app.len();

	child.destroy();
	assert_eq!(child.phase(), Phase::Destroying);
	app.scheduler().advance(ticks::DESTROY_GRACE - 1);
	assert_eq!(parent.content().len(), 2);
	assert!(parent.node().contains(child.node()));
	assert!(app.element(child.key()).is_some());

	app.scheduler().tick();
	assert!(child.is_destroyed());
	assert_eq!(parent.content(), [children[1].clone()]);
	assert!(parent.child(child.key()).is_none());
	assert!(!parent.node().contains(child.node()));
	assert_eq!(child.parent(), None);
	assert!(app.element(child.key()).is_none());
	assert_eq!(app.len(), count - 1);
}

#[rstest]
fn destroy_runs_once(app: App<MemoryHost>) {
	let element = app.create("div", Options::new()).unwrap();
	let (count, increment) = counter();
	element.once(Lifecycle::Destroy, move |element, _| {
		assert_eq!(element.phase(), Phase::Destroying);
		increment();
	});

	element.destroy().destroy();
	app.scheduler().run_until_idle();
	element.destroy();
	app.scheduler().run_until_idle();
	assert_eq!(*count.borrow(), 1);
	assert_eq!(element.phase(), Phase::Destroyed);
}

#[rstest]
fn destroy_without_parent_drops_listeners(app: App<MemoryHost>) {
	let element = app.create("button", Options::new()).unwrap();
	let (count, increment) = counter();
	element.add_event("click", move |_, _| increment(), Some("press"), ListenerOptions::new()).unwrap();

	element.destroy();
	app.host().dispatch(element.node(), "click");
	assert_eq!(*count.borrow(), 1);

	app.scheduler().run_until_idle();
	assert_eq!(element.node().listener_count("click"), 0);
	assert!(!element.has_listener("click", "press"));
}

#[rstest]
fn destroyed_wrappers_stay_dead(app: App<MemoryHost>) {
	let element = app.create("div", Options::new()).unwrap();
	element.destroy();
	app.scheduler().run_until_idle();

	let node = element.render();
	assert!(!element.state().rendered);
	assert!(node.id().is_empty());
	assert_eq!(element.phase(), Phase::Destroyed);
}

#[rstest]
fn children_outlive_destroyed_parent(app: App<MemoryHost>) {
	let (parent, children) = tree(&app, 1);
	parent.destroy();
	app.scheduler().run_until_idle();
	assert!(parent.is_destroyed());
	assert_eq!(children[0].phase(), Phase::Alive);
}

#[rstest]
fn remove_by_reference_and_name(app: App<MemoryHost>) {
	let (parent, children) = tree(&app, 2);
	children[1].set_index_name("second").unwrap();

	parent.remove(&children[0]).remove("second");
	app.scheduler().run_until_idle();
	assert!(children.iter().all(Wrapper::is_destroyed));
	assert!(parent.content().is_empty());
	assert!(parent.node().children().is_empty());
}

#[rstest]
fn remove_all_staggers(app: App<MemoryHost>) {
	let (parent, children) = tree(&app, 3);
	let phases = Rc::new(RefCell::new(Vec::new()));
	let on_complete: Box<dyn FnOnce()> = {
		let (phases, children) = (phases.clone(), children.clone());
		Box::new(move || phases.borrow_mut().extend(children.iter().map(Wrapper::phase)))
	};
	parent.remove_all(Some(on_complete));

	app.scheduler().advance(ticks::STAGGER * 2);
	assert_eq!(children.iter().map(Wrapper::phase).collect::<Vec<_>>(), [Phase::Destroying, Phase::Alive, Phase::Alive]);

	app.scheduler().run_until_idle();
	// Completion fires when the last destroy starts.
	assert_eq!(*phases.borrow(), [Phase::Destroyed, Phase::Destroyed, Phase::Destroying]);
	assert!(parent.content().is_empty());
	assert!(parent.node().children().is_empty());
}

#[rstest]
fn remove_all_without_children(app: App<MemoryHost>) {
	let parent = app.create("div", Options::new()).unwrap();
	let (count, increment) = counter();
	let on_complete: Box<dyn FnOnce()> = Box::new(increment);
	parent.remove_all(Some(on_complete));
	app.scheduler().run_until_idle();
	assert_eq!(*count.borrow(), 1);
}
