use chrono::NaiveDate;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use tasklane::app::{App, Level};
use tasklane::bulk::{BulkOp, BulkReport};
use tasklane::config::Config;
use tasklane::display::{CursorTarget, DisplayLine};
use tasklane::error::ApiError;
use tasklane::forms::{FormTarget, Modal};
use tasklane::model::{Due, Item, Priority, Project, Section, Snapshot};
use tasklane::runtime::{Effect, Msg, Request};
use tasklane::views::{Overlay, Pane, Tab, View};

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn today() -> NaiveDate {
    day(2024, 1, 2)
}

fn item(id: &str, due: Option<NaiveDate>, level: u8) -> Item {
    Item {
        id: id.into(),
        content: format!("task {id}"),
        due: due.map(Due::on),
        priority: Priority::from_display(level).expect("priority"),
        project_id: "inbox".into(),
        ..Item::default()
    }
}

fn projects() -> Vec<Project> {
    vec![
        Project {
            id: "inbox".into(),
            name: "Inbox".into(),
            inbox: true,
            ..Project::default()
        },
        Project {
            id: "work".into(),
            name: "Work".into(),
            order: 2,
            ..Project::default()
        },
    ]
}

fn session(tab: Tab, items: Vec<Item>, sections: Vec<Section>) -> App {
    let mut app = App::new(&Config::default(), tab, today()).expect("session");
    assert_eq!(app.take_effects(), vec![Effect::Remote(Request::Snapshot)]);
    app.handle_msg(Msg::Snapshot(Ok(Snapshot {
        items,
        projects: projects(),
        sections,
        labels: Vec::new(),
    })));
    app
}

fn press(app: &mut App, code: KeyCode) {
    app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
}

fn ordered_ids(app: &App) -> Vec<String> {
    app.index()
        .ordered()
        .iter()
        .filter_map(|target| target.item_id().map(str::to_string))
        .collect()
}

fn headers(app: &App) -> Vec<String> {
    app.index()
        .lines()
        .iter()
        .filter_map(|line| match line {
            DisplayLine::Header { label } => Some(label.clone()),
            _ => None,
        })
        .collect()
}

fn overdue_sample() -> Vec<Item> {
    vec![
        item("A", Some(day(2024, 1, 1)), 1),
        item("B", None, 4),
        item("C", Some(day(2024, 1, 1)), 3),
    ]
}

#[test]
fn today_groups_overdue_before_undated() {
    let app = session(Tab::Today, overdue_sample(), Vec::new());
    assert_eq!(headers(&app), ["Overdue", "No date"]);
    assert_eq!(ordered_ids(&app), ["A", "C", "B"]);
    assert_eq!(app.status().text, "Synced 3 tasks in 2 projects");
    assert!(!app.is_busy());
}

#[test]
fn bulk_complete_with_partial_failure_keeps_selection() {
    let mut app = session(Tab::Today, overdue_sample(), Vec::new());
    for _ in 0..3 {
        press(&mut app, KeyCode::Char(' '));
        press(&mut app, KeyCode::Char('j'));
    }
    assert_eq!(app.selection().len(), 3);

    press(&mut app, KeyCode::Char('x'));
    let effects = app.take_effects();
    assert_eq!(
        effects,
        vec![Effect::Remote(Request::Bulk {
            op: BulkOp::Complete,
            ids: vec!["A".into(), "B".into(), "C".into()],
        })]
    );

    app.handle_msg(Msg::Bulk(BulkReport {
        op: BulkOp::Complete,
        succeeded: 2,
        failed: 1,
    }));
    assert_eq!(app.status().text, "Completed 2 items, 1 failed");
    assert_eq!(app.status().level, Level::Warn);
    assert_eq!(app.selection().len(), 3);
    assert_eq!(app.take_effects(), vec![Effect::Remote(Request::Items)]);
}

#[test]
fn bulk_delete_clears_selection_after_confirm() {
    let mut app = session(Tab::Today, overdue_sample(), Vec::new());
    press(&mut app, KeyCode::Char('V'));
    assert_eq!(app.selection().len(), 3);

    press(&mut app, KeyCode::Delete);
    assert!(matches!(app.modal(), Some(Modal::Confirm(_))));
    press(&mut app, KeyCode::Char('y'));
    assert!(app.modal().is_none());
    assert!(matches!(
        app.take_effects().as_slice(),
        [Effect::Remote(Request::Bulk { op: BulkOp::Delete, ids })] if ids.len() == 3
    ));

    app.handle_msg(Msg::Bulk(BulkReport {
        op: BulkOp::Delete,
        succeeded: 3,
        failed: 0,
    }));
    assert!(app.selection().is_empty());
    assert_eq!(app.status().text, "Deleted 3 items");
}

#[test]
fn undo_reverses_a_completion() {
    let mut app = session(Tab::Today, overdue_sample(), Vec::new());
    press(&mut app, KeyCode::Char('x'));
    assert!(app.item("A").is_some_and(|item| item.checked));
    assert_eq!(
        app.take_effects(),
        vec![Effect::Remote(Request::SetChecked {
            id: "A".into(),
            checked: true,
            undo: false,
        })]
    );

    app.handle_msg(Msg::Checked {
        id: "A".into(),
        checked: true,
        undo: false,
        result: Ok(()),
    });
    assert_eq!(app.status().text, "Completed \"task A\" (u to undo)");
    assert!(app.undo_record().is_some());
    app.take_effects();

    press(&mut app, KeyCode::Char('u'));
    assert!(app.item("A").is_some_and(|item| !item.checked));
    assert_eq!(
        app.take_effects(),
        vec![Effect::Remote(Request::SetChecked {
            id: "A".into(),
            checked: false,
            undo: true,
        })]
    );
    app.handle_msg(Msg::Checked {
        id: "A".into(),
        checked: false,
        undo: true,
        result: Ok(()),
    });
    assert!(app.undo_record().is_none());
    assert!(app.status().text.starts_with("Undone"));
}

#[test]
fn undo_names_an_item_already_dropped_by_reload() {
    let mut app = session(Tab::Today, overdue_sample(), Vec::new());
    press(&mut app, KeyCode::Char('x'));
    app.handle_msg(Msg::Checked {
        id: "A".into(),
        checked: true,
        undo: false,
        result: Ok(()),
    });
    let remaining: Vec<Item> = overdue_sample()
        .into_iter()
        .filter(|item| item.id != "A")
        .collect();
    app.handle_msg(Msg::Items(Ok(remaining)));
    assert!(app.item("A").is_none());
    app.take_effects();

    press(&mut app, KeyCode::Char('u'));
    app.handle_msg(Msg::Checked {
        id: "A".into(),
        checked: false,
        undo: true,
        result: Ok(()),
    });
    assert_eq!(app.status().text, "Undone: reopened \"task A\"");
}

#[test]
fn deleting_from_detail_with_panel_open_closes_the_detail() {
    let mut app = session(Tab::Today, overdue_sample(), Vec::new());
    press(&mut app, KeyCode::Char('p'));
    assert!(app.nav().panel_open());
    press(&mut app, KeyCode::Enter);
    assert!(matches!(
        app.nav().overlay(),
        Some(Overlay::Detail { item_id }) if item_id == "A"
    ));
    app.take_effects();

    press(&mut app, KeyCode::Delete);
    press(&mut app, KeyCode::Char('y'));
    assert!(!app.nav().overlay_open());
    assert!(app.comments().is_empty());
    assert_eq!(
        app.take_effects(),
        vec![Effect::Remote(Request::Delete { id: "A".into() })]
    );
}

#[test]
fn undo_without_record_has_no_side_effects() {
    let mut app = session(Tab::Today, overdue_sample(), Vec::new());
    let before = app.items().to_vec();
    press(&mut app, KeyCode::Char('u'));
    assert_eq!(app.status().text, "Nothing to undo");
    assert!(app.take_effects().is_empty());
    assert_eq!(app.items(), before.as_slice());
}

#[test]
fn failed_completion_reverts_the_optimistic_flag() {
    let mut app = session(Tab::Today, overdue_sample(), Vec::new());
    press(&mut app, KeyCode::Char('x'));
    app.take_effects();
    app.handle_msg(Msg::Checked {
        id: "A".into(),
        checked: true,
        undo: false,
        result: Err(ApiError::Status {
            method: "POST",
            path: "tasks/A/close".into(),
            status: 401,
            body: String::new(),
        }),
    });
    assert!(app.item("A").is_some_and(|item| !item.checked));
    assert_eq!(app.status().level, Level::Error);
    assert!(app.status().text.contains("tasklane login"));
    assert!(app.undo_record().is_none());
}

#[test]
fn placeholder_open_is_noop_and_add_prefills_section() {
    let sections = vec![Section {
        id: "s1".into(),
        name: "Backlog".into(),
        project_id: "inbox".into(),
        order: 1,
    }];
    let mut app = session(Tab::Projects, Vec::new(), sections);
    assert_eq!(app.nav().project(), Some("inbox"));
    press(&mut app, KeyCode::Enter);
    assert_eq!(app.nav().pane(), Pane::Main);
    assert_eq!(
        app.index().target(app.cursor()),
        Some(&CursorTarget::Placeholder("s1".into()))
    );

    press(&mut app, KeyCode::Enter);
    assert!(!app.nav().overlay_open());
    assert!(app.take_effects().is_empty());

    press(&mut app, KeyCode::Char('a'));
    match app.nav().overlay() {
        Some(Overlay::Form(form)) => {
            assert_eq!(form.section_id(), Some("s1"));
            assert!(matches!(
                &form.target,
                FormTarget::Create { project_id: Some(project), .. } if project == "inbox"
            ));
        }
        other => panic!("expected the task form, got {other:?}"),
    }
}

#[test]
fn cancelled_sequence_dispatches_follow_up_key_once() {
    let mut app = session(Tab::Today, overdue_sample(), Vec::new());
    press(&mut app, KeyCode::Char('j'));
    assert_eq!(app.cursor(), 1);

    press(&mut app, KeyCode::Char('g'));
    assert_eq!(app.keys().pending(), Some('g'));
    assert_eq!(app.cursor(), 1);

    press(&mut app, KeyCode::Char('j'));
    assert_eq!(app.keys().pending(), None);
    assert_eq!(app.cursor(), 2);

    press(&mut app, KeyCode::Char('g'));
    press(&mut app, KeyCode::Char('g'));
    assert_eq!(app.cursor(), 0);
}

#[test]
fn double_d_asks_before_deleting() {
    let mut app = session(Tab::Today, overdue_sample(), Vec::new());
    press(&mut app, KeyCode::Char('d'));
    assert!(app.modal().is_none());
    press(&mut app, KeyCode::Char('d'));
    assert!(matches!(app.modal(), Some(Modal::Confirm(_))));

    press(&mut app, KeyCode::Esc);
    assert!(app.modal().is_none());
    assert!(app.take_effects().is_empty());
}

#[test]
fn tab_switch_refused_while_overlay_open() {
    let mut app = session(Tab::Today, overdue_sample(), Vec::new());
    press(&mut app, KeyCode::Enter);
    assert!(matches!(app.nav().overlay(), Some(Overlay::Detail { .. })));

    press(&mut app, KeyCode::Char('5'));
    assert_eq!(app.nav().tab(), Tab::Today);
    assert_eq!(app.status().text, "Close the overlay first");

    press(&mut app, KeyCode::Esc);
    press(&mut app, KeyCode::Char('5'));
    assert_eq!(app.nav().view(), View::CalendarMonth);
}

#[test]
fn reload_drops_stale_selection_with_warning() {
    let mut app = session(Tab::Today, overdue_sample(), Vec::new());
    press(&mut app, KeyCode::Char('V'));
    app.handle_msg(Msg::Items(Ok(vec![item("A", Some(day(2024, 1, 1)), 1)])));
    assert_eq!(app.selection().len(), 1);
    assert_eq!(app.status().level, Level::Warn);
    assert!(app.status().text.ends_with("dropped 2 stale selection entries"));
}

#[test]
fn cursor_follows_item_across_reload() {
    let mut app = session(Tab::Today, overdue_sample(), Vec::new());
    press(&mut app, KeyCode::Char('j'));
    assert_eq!(app.cursor_item().map(|item| item.id.as_str()), Some("C"));

    let mut items = overdue_sample();
    items.insert(0, item("D", Some(day(2023, 12, 1)), 2));
    app.handle_msg(Msg::Items(Ok(items)));
    assert_eq!(app.cursor_item().map(|item| item.id.as_str()), Some("C"));
}

#[test]
fn quick_priority_updates_cursor_item() {
    let mut app = session(Tab::Today, overdue_sample(), Vec::new());
    press(&mut app, KeyCode::Char('j'));
    press(&mut app, KeyCode::Char('!'));
    assert_eq!(
        app.item("C").map(|item| item.priority.display_level()),
        Some(1)
    );
    assert!(matches!(
        app.take_effects().as_slice(),
        [Effect::Remote(Request::Update { id, patch })]
            if id == "C" && patch.priority == Priority::from_display(1)
    ));
}

#[test]
fn help_overlay_swallows_other_actions() {
    let mut app = session(Tab::Today, overdue_sample(), Vec::new());
    press(&mut app, KeyCode::Char('?'));
    assert!(matches!(app.nav().overlay(), Some(Overlay::Help)));
    press(&mut app, KeyCode::Char('x'));
    assert!(app.take_effects().is_empty());
    press(&mut app, KeyCode::Char('?'));
    assert!(!app.nav().overlay_open());
}

#[test]
fn detail_fetches_comments_and_back_returns() {
    let mut app = session(Tab::Today, overdue_sample(), Vec::new());
    press(&mut app, KeyCode::Enter);
    assert!(matches!(
        app.nav().overlay(),
        Some(Overlay::Detail { item_id }) if item_id == "A"
    ));
    assert_eq!(
        app.take_effects(),
        vec![Effect::Remote(Request::Comments {
            item_id: "A".into()
        })]
    );
    press(&mut app, KeyCode::Esc);
    assert!(!app.nav().overlay_open());
    assert!(app.comments().is_empty());
}

#[test]
fn sync_failure_surfaces_as_error() {
    let mut app = App::new(&Config::default(), Tab::Today, today()).expect("session");
    app.take_effects();
    assert!(app.is_busy());
    app.handle_msg(Msg::Snapshot(Err(ApiError::BaseUrl("nope".into()))));
    assert!(!app.is_busy());
    assert_eq!(app.status().level, Level::Error);
    assert!(app.status().text.starts_with("Sync failed"));
}
