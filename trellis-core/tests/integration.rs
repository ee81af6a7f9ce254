//! Integration Tests for the Runtime
//!
//! These tests drive the public API end to end: reactive cells, element
//! construction, list reconciliation, routing and async content.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use trellis_core::{
    show, Cleanup, Error, Location, NodeId, Route, RouteContext, Router, Runtime, RuntimeConfig,
};

/// Writing a value equal to the current one notifies nobody.
#[test]
fn equal_write_is_a_no_op() {
    let rt = Runtime::new();
    let (name, set_name) = rt.signal("ada".to_string());
    let runs = Rc::new(Cell::new(0));

    let counter = runs.clone();
    rt.effect(move || {
        name.get();
        counter.set(counter.get() + 1);
    });

    set_name.set("ada".into());
    assert_eq!(runs.get(), 1);

    set_name.set("grace".into());
    assert_eq!(runs.get(), 2);
}

/// An effect only reacts to the cells it read on its most recent run.
#[test]
fn dependencies_are_rediscovered_each_run() {
    let rt = Runtime::new();
    let (use_left, set_use_left) = rt.signal(true);
    let (left, set_left) = rt.signal(1);
    let (right, set_right) = rt.signal(10);
    let seen = Rc::new(RefCell::new(Vec::new()));

    let sink = seen.clone();
    rt.effect(move || {
        let value = if use_left.get() { left.get() } else { right.get() };
        sink.borrow_mut().push(value);
    });

    set_right.set(11);
    set_use_left.set(false);
    set_left.set(2);
    set_right.set(12);

    assert_eq!(*seen.borrow(), [1, 11, 12]);
}

/// Inside a batch each dependent effect runs once, after the batch.
#[test]
fn batch_runs_each_effect_once() {
    let rt = Runtime::new();
    let (first, set_first) = rt.signal("Ada".to_string());
    let (last, set_last) = rt.signal("Lovelace".to_string());
    let seen = Rc::new(RefCell::new(Vec::new()));

    let sink = seen.clone();
    rt.effect(move || sink.borrow_mut().push(format!("{} {}", first.get(), last.get())));

    rt.batch(|| {
        set_first.set("Grace".into());
        set_last.set("Hopper".into());
        assert_eq!(seen.borrow().len(), 1);
    });

    assert_eq!(*seen.borrow(), ["Ada Lovelace", "Grace Hopper"]);
}

/// Disposing a scope runs effect cleanups and scope cleanups, and the
/// effects stop reacting.
#[test]
fn scope_disposal_tears_everything_down() {
    let rt = Runtime::new();
    let (tick, set_tick) = rt.signal(0);
    let log = Rc::new(RefCell::new(Vec::new()));

    let scope = rt.scope();
    scope.run(|| {
        let log = log.clone();
        rt.effect(move || {
            let value = tick.get();
            let log = log.clone();
            log.borrow_mut().push(format!("run {value}"));
            Cleanup::new(move || log.borrow_mut().push(format!("cleanup {value}")))
        });
    });
    let sink = log.clone();
    scope.on_cleanup(move || sink.borrow_mut().push("scope".into()));

    set_tick.set(1);
    scope.dispose();
    set_tick.set(2);

    assert_eq!(
        *log.borrow(),
        ["run 0", "cleanup 0", "run 1", "cleanup 1", "scope"]
    );
    assert!(scope.is_disposed());
}

/// A failing effect is reported and does not stop other effects.
#[test]
fn failing_effect_is_isolated() {
    let rt = Runtime::new();
    let (value, set_value) = rt.signal(0);
    let errors = Rc::new(RefCell::new(Vec::new()));
    let sink = errors.clone();
    rt.on_error(move |error, _| sink.borrow_mut().push(error.to_string()));

    let failing = value.clone();
    rt.effect(move || -> Result<(), Error> {
        if failing.get() > 0 {
            return Err(Error::msg("too big"));
        }
        Ok(())
    });
    let mirror = Rc::new(Cell::new(0));
    let target = mirror.clone();
    rt.effect(move || target.set(value.get()));

    set_value.set(3);

    assert_eq!(*errors.borrow(), ["too big"]);
    assert_eq!(mirror.get(), 3);
}

/// Reordering keeps node identity; removed keys lose their node.
#[test]
fn keyed_list_reorders_and_updates() {
    let rt = Runtime::new();
    let doc = rt.document();
    let ul = doc.create_element("ul");
    let (items, set_items) = rt.signal(vec![1, 2, 3]);
    let renders = Rc::new(Cell::new(0));

    let runtime = rt.clone();
    let counter = renders.clone();
    rt.list(
        ul,
        items,
        |n: &i32| *n,
        move |n: &i32, _| {
            counter.set(counter.get() + 1);
            runtime.el("li").child(n.to_string()).build()
        },
    );
    let before = doc.children(ul);

    set_items.set(vec![3, 1, 2]);
    let after = doc.children(ul);
    assert_eq!(after, [before[2], before[0], before[1]]);
    assert_eq!(renders.get(), 3);

    set_items.set(vec![2, 4]);
    assert_eq!(
        doc.inner_html(ul).unwrap(),
        r#"<li data-key="2">2</li><li data-key="4">4</li>"#
    );
    assert_eq!(doc.children(ul)[0], before[1]);
    assert!(!doc.contains(before[0]));
    assert_eq!(renders.get(), 4);
}

/// `show` swaps its content in and out of the parent.
#[test]
fn conditional_content_follows_its_condition() {
    let rt = Runtime::new();
    let doc = rt.document();
    let (open, set_open) = rt.signal(false);

    let panel = rt
        .el("section")
        .child(show(open, "details"))
        .build();
    assert_eq!(doc.text_content(panel), "");

    set_open.set(true);
    assert_eq!(doc.text_content(panel), "details");

    set_open.set(false);
    assert_eq!(doc.text_content(panel), "");
}

/// Two-way binding keeps an input and a signal in sync.
#[test]
fn bound_input_round_trips() {
    let rt = Runtime::new();
    let doc = rt.document();
    let (text, set_text) = rt.signal(String::from("hello"));

    let input = rt.el("input").bind((text.clone(), set_text.clone())).build();
    assert_eq!(doc.value(input).unwrap(), "hello");

    doc.input(input, "typed").unwrap();
    assert_eq!(text.get(), "typed");

    set_text.set("reset".into());
    assert_eq!(doc.value(input).unwrap(), "reset");
}

/// Configuration loaded from JSON overrides only the fields it names.
#[test]
fn runtime_config_is_loaded_from_json() {
    let config = RuntimeConfig::from_json(r#"{ "key_attribute": "data-id" }"#).unwrap();
    let rt = Runtime::with_config(config);
    let doc = rt.document();
    let ul = doc.create_element("ul");
    let (items, _set_items) = rt.signal(vec!["x"]);

    let runtime = rt.clone();
    rt.list(ul, items, |s: &&str| *s, move |s: &&str, _| runtime.el("li").child(*s).build());
    let li = doc.children(ul)[0];

    assert_eq!(doc.attribute(li, "data-id").as_deref(), Some("x"));
    assert_eq!(doc.attribute(li, "data-key"), None);
    assert_eq!(rt.config().event_prefix, "on");

    assert!(RuntimeConfig::from_json(r#"{ "colour": "red" }"#).is_err());
}

/// Routes are tried in order and the first match wins; navigation
/// re-renders the outlet.
#[test]
fn router_prefers_earlier_routes() {
    let rt = Runtime::new();
    let doc = rt.document();
    let outlet = doc.create_element("main");
    let location = Location::with_hash("#/users/new");

    let user = {
        let rt = rt.clone();
        move |ctx: &RouteContext| rt.text(format!("user {}", ctx.param("id").unwrap_or_default()))
    };
    let create = {
        let rt = rt.clone();
        move |_: &RouteContext| rt.text("create")
    };
    let routes = vec![
        Route::new("/users/:id", user).unwrap(),
        Route::new("/users/new", create).unwrap(),
    ];
    let router = Router::new(&rt, routes, outlet, location.clone());
    assert_eq!(doc.text_content(outlet), "user new");

    location.set_hash("#/users/7");
    assert_eq!(doc.text_content(outlet), "user 7");

    router.dispose();
    location.set_hash("#/users/8");
    assert_eq!(doc.text_content(outlet), "user 7");
    assert_eq!(location.listener_count(), 0);
}

/// Mounting replaces the target's content and runs mount callbacks.
#[test]
fn mount_replaces_content() {
    let rt = Runtime::new();
    let doc = rt.document();
    let root = doc.create_element("div");
    let stale = doc.create_text("server render");
    doc.append_child(root, stale).unwrap();

    let mounted = Rc::new(Cell::new(false));
    let flag = mounted.clone();
    let runtime = rt.clone();
    rt.mount(root, move || {
        runtime.on_mount(move || flag.set(true));
        runtime.el("p").child("app").build()
    })
    .unwrap();

    assert_eq!(doc.inner_html(root).unwrap(), "<p>app</p>");
    assert!(!doc.contains(stale));
    assert!(mounted.get());
}

/// Async content replaces its fallback once the future resolves.
#[tokio::test]
async fn suspense_swaps_in_loaded_content() {
    let rt = Runtime::new();
    let doc = rt.document();
    let (tx, rx) = tokio::sync::oneshot::channel::<Vec<String>>();

    let runtime = rt.clone();
    let content = async move {
        let names = rx.await.map_err(|e| Error::msg(e.to_string()))?;
        let items: Vec<NodeId> = names.iter().map(|name| runtime.el("li").child(name.as_str()).build()).collect();
        Ok::<_, Error>(items)
    };
    let (node, task) = rt.suspense(content, "loading…").split();
    assert_eq!(doc.text_content(node), "loading…");

    let local = tokio::task::LocalSet::new();
    local
        .run_until(async move {
            let handle = tokio::task::spawn_local(task);
            tx.send(vec!["a".into(), "b".into()]).unwrap();
            handle.await.unwrap();
        })
        .await;

    assert_eq!(
        doc.to_html(node).unwrap(),
        r#"<div data-suspense="true"><li>a</li><li>b</li></div>"#
    );
}
