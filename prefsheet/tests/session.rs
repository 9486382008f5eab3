use prefsheet::{
    Activation, CoercionError, Dismissal, NavigationError, PropertyGroup, PropertyRow,
    RowPosition, SchemaError, SchemaRefresh, SessionController, SessionState, SettingsDelegate,
    SettingsError, StaticDelegate, Value, ValueMap, decode_indexed, encode_indexed,
    parse_groups,
};
use serde_json::json;

fn init_log() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn map(value: Value) -> ValueMap {
    value.as_object().cloned().unwrap()
}

fn nested_schema() -> Vec<PropertyGroup> {
    parse_groups(&json!([
        {
            "title": "Root",
            "rows": [
                {"name": "Name", "type": "string", "value": "", "edit": true, "identifier": "x"},
                {"name": "Count", "type": "integer", "value": 1, "edit": true, "identifier": "count"},
                {"name": "More", "type": "multiLevel", "edit": true, "identifier": "K", "value": [
                    {"title": "Child", "rows": [
                        {"name": "A", "type": "integer", "value": 0, "edit": true, "identifier": "a"},
                        {"name": "B", "type": "integer", "value": 0, "edit": true, "identifier": "b"},
                        {"name": "Shadow", "type": "string", "value": "", "edit": true, "identifier": "x"}
                    ]}
                ]}
            ]
        }
    ]))
    .unwrap()
}

#[test]
fn test_fallback_ordering() {
    init_log();
    let groups = parse_groups(&json!([{
        "title": "Tiers",
        "rows": [
            {"name": "None", "type": "string", "value": "declared", "edit": true, "identifier": "none"},
            {"name": "One", "type": "string", "value": "declared", "edit": true, "identifier": "one"},
            {"name": "Two", "type": "string", "value": "declared", "edit": true, "identifier": "two"},
            {"name": "Three", "type": "string", "value": "declared", "edit": true, "identifier": "three"}
        ]
    }]))
    .unwrap();
    let delegate = StaticDelegate::new(map(json!({"two": "in", "three": "in"})))
        .with_defaults(map(json!({"one": "default", "two": "default", "three": "default"})));
    let mut ctl = SessionController::new(groups, delegate).unwrap();
    ctl.commit("three", json!("out")).unwrap();

    assert_eq!(ctl.effective_value("none"), Some(json!("declared")));
    assert_eq!(ctl.effective_value("one"), Some(json!("default")));
    assert_eq!(ctl.effective_value("two"), Some(json!("in")));
    assert_eq!(ctl.effective_value("three"), Some(json!("out")));
    assert_eq!(ctl.effective_value("unknown"), None);
    assert!(ctl.row_for("unknown").is_none());
}

#[test]
fn test_commit_idempotence() {
    let mut once = SessionController::new(nested_schema(), StaticDelegate::default()).unwrap();
    once.commit("count", json!(5)).unwrap();

    let mut twice = SessionController::new(nested_schema(), StaticDelegate::default()).unwrap();
    assert!(twice.commit("count", json!(5)).unwrap().changed);
    assert!(!twice.commit("count", json!(5)).unwrap().changed);

    assert_eq!(once.diff().unwrap(), twice.diff().unwrap());
    assert_eq!(twice.diff().unwrap(), map(json!({"count": 5})));
    assert_eq!(twice.delegate().changes.len(), 1);
}

#[test]
fn test_indexed_identifier_round_trip() {
    for name in ["phone", "email_", "x", "ключ"] {
        for index in (0..25).chain([99, 100, 101, 65_536, usize::MAX]) {
            let key = encode_indexed(name, index).unwrap();
            assert_eq!(key, format!("{name}{index}"));
            assert_eq!(decode_indexed(&key), Some((name, index)));
        }
    }
}

#[test]
fn test_child_merge_overwrites() {
    init_log();
    let mut ctl = SessionController::new(nested_schema(), StaticDelegate::default()).unwrap();
    let root = ctl.current_id().unwrap();
    let pos = ctl.position_of("K").unwrap();

    let child = ctl.push(root, pos).unwrap();
    ctl.commit("a", json!(1)).unwrap();
    ctl.commit("b", json!(2)).unwrap();
    ctl.pop(child).unwrap();
    assert_eq!(ctl.diff().unwrap()["K"], json!({"a": 1, "b": 2}));

    let child = ctl.push(root, pos).unwrap();
    assert_eq!(ctl.effective_value("b"), Some(json!(2)));
    ctl.commit("a", json!(3)).unwrap();
    ctl.pop(child).unwrap();
    assert_eq!(ctl.diff().unwrap()["K"], json!({"a": 3}));

    assert_eq!(ctl.finish().unwrap(), map(json!({"K": {"a": 3}})));
}

#[test]
fn test_single_slot_navigation() {
    let mut ctl = SessionController::new(nested_schema(), StaticDelegate::default()).unwrap();
    let root = ctl.current_id().unwrap();
    let pos = ctl.position_of("K").unwrap();

    let child = ctl.push(root, pos).unwrap();
    assert_eq!(ctl.session(root).unwrap().state(), SessionState::ChildActive);
    assert_eq!(
        ctl.push(root, pos).unwrap_err(),
        SettingsError::Navigation(NavigationError::ChildActive { session: root })
    );

    ctl.pop(child).unwrap();
    assert_eq!(
        ctl.pop(child).unwrap_err(),
        SettingsError::Navigation(NavigationError::Dismissed { session: child })
    );
    let again = ctl.push(root, pos).unwrap();
    assert_ne!(again, child);
}

#[test]
fn test_duplicate_identifiers_per_level() {
    let row = |id: &str| json!({"name": id, "type": "string", "value": "", "edit": true, "identifier": id});

    let same_level = parse_groups(&json!([
        {"title": "One", "rows": [row("x")]},
        {"title": "Two", "rows": [row("x")]}
    ]))
    .unwrap();
    assert!(matches!(
        SessionController::new(same_level, StaticDelegate::default()),
        Err(SettingsError::Schema(SchemaError::DuplicateIdentifier { level: 0, .. }))
    ));

    let nested_child = parse_groups(&json!([{"title": "Root", "rows": [
        row("y"),
        {"name": "More", "type": "multiLevel", "edit": true, "identifier": "more", "value": [
            {"title": "Child", "rows": [row("y"), row("y")]}
        ]}
    ]}]))
    .unwrap();
    assert!(matches!(
        SessionController::new(nested_child, StaticDelegate::default()),
        Err(SettingsError::Schema(SchemaError::DuplicateIdentifier { level: 1, .. }))
    ));

    // `nested_schema` declares `x` at the root and inside `K`.
    assert!(SessionController::new(nested_schema(), StaticDelegate::default()).is_ok());
}

#[test]
fn test_coercion_rejection() {
    let mut ctl = SessionController::new(
        nested_schema(),
        StaticDelegate::new(map(json!({"count": 7}))),
    )
    .unwrap();
    let err = ctl.commit("count", json!("abc")).unwrap_err();
    assert!(matches!(
        err,
        SettingsError::Coercion(CoercionError::TypeMismatch { ref identifier, .. }) if identifier == "count"
    ));
    assert_eq!(ctl.effective_value("count"), Some(json!(7)));
    assert!(ctl.diff().unwrap().is_empty());
    assert!(ctl.delegate().changes.is_empty());
}

#[test]
fn test_shadowed_identifier_stays_in_its_session() {
    let mut ctl = SessionController::new(nested_schema(), StaticDelegate::default()).unwrap();
    ctl.commit("x", json!("root")).unwrap();
    let root = ctl.current_id().unwrap();
    ctl.push(root, ctl.position_of("K").unwrap()).unwrap();
    assert_eq!(ctl.effective_value("x"), Some(json!("")));
    ctl.commit("x", json!("child")).unwrap();
    assert_eq!(
        ctl.finish().unwrap(),
        map(json!({"x": "root", "K": {"x": "child"}}))
    );
}

/// Shows `proxyHost` only while `useProxy` is on.
#[derive(Default)]
struct ProxyDelegate {
    refreshed: usize,
    dismissed: Vec<String>,
}

impl ProxyDelegate {
    fn detail_rows(on: bool) -> Vec<PropertyRow> {
        let mut rows = vec![PropertyRow::boolean("Use proxy", "useProxy", false)];
        if on {
            rows.push(PropertyRow::string("Proxy host", "proxyHost", "localhost"));
        }
        rows
    }
}

impl SettingsDelegate for ProxyDelegate {
    fn initial_values(&mut self) -> ValueMap {
        ValueMap::new()
    }

    fn refresh_schema(&mut self, _groups: &[PropertyGroup], changed: &PropertyRow) -> SchemaRefresh {
        if changed.identifier != "useProxy" {
            return SchemaRefresh::Unchanged;
        }
        self.refreshed += 1;
        SchemaRefresh::Rows {
            group: "network".into(),
            rows: Self::detail_rows(self.refreshed % 2 == 1),
        }
    }

    fn will_dismiss(&mut self, session: &prefsheet::Session) {
        self.dismissed.push(format!("will {}", session.title()));
    }

    fn did_dismiss(&mut self, session: &prefsheet::Session) {
        self.dismissed.push(format!("did {}", session.title()));
    }
}

#[test]
fn test_dependent_field_refresh() {
    init_log();
    let groups = vec![
        PropertyGroup::new("Network", ProxyDelegate::detail_rows(false)).with_key("network"),
    ];
    let mut ctl = SessionController::new(groups, ProxyDelegate::default()).unwrap();
    assert!(ctl.row_for("proxyHost").is_none());

    let toggle = ctl.position_of("useProxy").unwrap();
    let Activation::Committed(outcome) = ctl.activate(toggle).unwrap() else {
        panic!("toggle should commit");
    };
    assert!(outcome.schema_refreshed);
    assert_eq!(ctl.effective_value("proxyHost"), Some(json!("localhost")));

    ctl.begin_edit("proxyHost").unwrap();
    ctl.commit("useProxy", json!(false)).unwrap();
    assert!(ctl.row_for("proxyHost").is_none());
    assert_eq!(ctl.editing(), None);

    let out = ctl.finish().unwrap();
    assert_eq!(out, map(json!({"useProxy": false})));
    assert_eq!(ctl.delegate().dismissed, vec!["will Network", "did Network"]);
}

/// Refreshes with rows that collide on `dup`.
struct BadRefresh;

impl SettingsDelegate for BadRefresh {
    fn initial_values(&mut self) -> ValueMap {
        ValueMap::new()
    }

    fn refresh_schema(&mut self, _groups: &[PropertyGroup], _changed: &PropertyRow) -> SchemaRefresh {
        SchemaRefresh::Rows {
            group: "g".into(),
            rows: vec![
                PropertyRow::string("One", "dup", ""),
                PropertyRow::string("Two", "dup", ""),
            ],
        }
    }
}

#[test]
fn test_rejected_refresh_keeps_schema_and_commit() {
    let groups = vec![PropertyGroup::new("G", vec![PropertyRow::string("Name", "name", "")]).with_key("g")];
    let mut ctl = SessionController::new(groups, BadRefresh).unwrap();
    let err = ctl.commit("name", json!("new")).unwrap_err();
    assert!(matches!(err, SettingsError::Schema(SchemaError::DuplicateIdentifier { .. })));
    assert!(ctl.row_for("name").is_some());
    assert!(ctl.row_for("dup").is_none());
    assert_eq!(ctl.effective_value("name"), Some(json!("new")));
}

struct EmptyChoices;

impl SettingsDelegate for EmptyChoices {
    fn initial_values(&mut self) -> ValueMap {
        ValueMap::new()
    }

    fn refresh_schema(&mut self, _groups: &[PropertyGroup], _changed: &PropertyRow) -> SchemaRefresh {
        SchemaRefresh::Rows {
            group: "g".into(),
            rows: vec![
                PropertyRow::string("Name", "name", ""),
                PropertyRow::multi_value("Color", "c", vec![]),
            ],
        }
    }
}

#[test]
fn test_refresh_with_empty_choices_is_rejected() {
    let groups = vec![PropertyGroup::new("G", vec![PropertyRow::string("Name", "name", "")]).with_key("g")];
    let mut ctl = SessionController::new(groups, EmptyChoices).unwrap();
    let err = ctl.commit("name", json!("new")).unwrap_err();
    assert_eq!(
        err,
        SettingsError::Schema(SchemaError::EmptyChoiceSet {
            path: "groups[0].rows[1]".into()
        })
    );
    assert!(ctl.row_for("c").is_none());
    assert_eq!(ctl.current().unwrap().schema().rows().count(), 1);
}

#[test]
fn test_revisit_without_edits_keeps_nested_values() {
    let mut ctl = SessionController::new(nested_schema(), StaticDelegate::default()).unwrap();
    let root = ctl.current_id().unwrap();
    let k = ctl.position_of("K").unwrap();

    let child = ctl.push(root, k).unwrap();
    ctl.commit("a", json!(7)).unwrap();
    ctl.pop(child).unwrap();
    assert_eq!(ctl.diff().unwrap(), map(json!({"K": {"a": 7}})));

    let child = ctl.push(root, k).unwrap();
    assert_eq!(ctl.effective_value("a"), Some(json!(7)));
    ctl.pop(child).unwrap();
    assert_eq!(ctl.diff().unwrap(), map(json!({"K": {"a": 7}})));
}

#[test]
fn test_property_list_merges_under_group_key() {
    let groups = parse_groups(&json!({"groups": [{"title": "Root", "rows": [
        {"name": "Account", "type": "propertyList", "edit": true, "identifier": "", "value":
            {"title": "Account", "key": "account", "rows": [
                {"name": "Login", "type": "string", "value": "", "edit": true, "identifier": "login"}
            ]}
        }
    ]}]}))
    .unwrap();
    let delegate = StaticDelegate::new(map(json!({"account": {"login": "old"}})));
    let mut ctl = SessionController::new(groups, delegate).unwrap();
    let pos = RowPosition::new(0, 0);
    assert_eq!(ctl.row_at(0, 0).unwrap().merge_key(), "account");
    let Activation::Pushed(child) = ctl.activate(pos).unwrap() else {
        panic!("propertyList should push");
    };
    assert_eq!(ctl.effective_value("login"), Some(json!("old")));
    ctl.commit("login", json!("new")).unwrap();
    let dismissal = ctl.pop(child).unwrap();
    assert!(matches!(dismissal, Dismissal::Merged { ref key, .. } if key == "account"));
    assert_eq!(ctl.diff().unwrap(), map(json!({"account": {"login": "new"}})));
}

#[test]
fn test_uncommitted_edit_discarded_on_dismiss() {
    let mut ctl = SessionController::new(nested_schema(), StaticDelegate::default()).unwrap();
    let root = ctl.current_id().unwrap();
    ctl.push(root, ctl.position_of("K").unwrap()).unwrap();
    ctl.commit("a", json!(4)).unwrap();
    ctl.begin_edit("b").unwrap();
    ctl.dismiss().unwrap();
    assert_eq!(ctl.diff().unwrap(), map(json!({"K": {"a": 4}})));
    assert_eq!(ctl.editing(), None);
}

#[test]
fn test_indexed_rows_through_session() {
    let groups = parse_groups(&json!([{"title": "Contacts", "rows": [
        {"name": "Phone", "type": "string", "value": "", "edit": true, "identifier": "phone"}
    ]}]))
    .unwrap();
    let mut ctl = SessionController::new(
        groups,
        StaticDelegate::new(map(json!({"phone0": "555-0100"}))),
    )
    .unwrap();
    let next = ctl
        .indexed_values("phone")
        .last()
        .map_or(0, |(i, _)| i + 1);
    let key = encode_indexed("phone", next).unwrap();
    ctl.commit(&key, json!("555-0199")).unwrap();
    assert_eq!(
        ctl.finish().unwrap(),
        map(json!({"phone1": "555-0199"}))
    );
}
