use super::*;

#[test]
fn blank_and_comment_lines_are_skipped() {
    assert!(parse_watch_command("   ").unwrap().is_none());
    assert!(parse_watch_command("# pan north").unwrap().is_none());
}

#[test]
fn view_takes_lat_lon_zoom() {
    let command = parse_watch_command("view 42.35 13.4 16").unwrap();
    assert_eq!(command, Some(WatchCommand::View { lat: 42.35, lon: 13.4, zoom: 16 }));
    assert!(parse_watch_command("view 42.35 13.4").is_err());
    assert!(parse_watch_command("view north 13.4 16").is_err());
}

#[test]
fn mark_and_unmark_take_an_identifier() {
    assert_eq!(
        parse_watch_command("mark 9").unwrap(),
        Some(WatchCommand::Mark(FeatureId::new("9").unwrap()))
    );
    assert_eq!(
        parse_watch_command("unmark  abc ").unwrap(),
        Some(WatchCommand::Unmark(FeatureId::new("abc").unwrap()))
    );
    assert!(parse_watch_command("mark").is_err());
}

#[test]
fn save_parses_json_payload() {
    let line = r#"save {"id": 9, "indirizzo": "Via Roma 1", "comune": "L'Aquila", "data_predisposizione": "2024-03-01"}"#;
    let Some(WatchCommand::Save(payload)) = parse_watch_command(line).unwrap() else {
        panic!("expected save");
    };
    assert_eq!(payload.id, 9);
    assert_eq!(payload.comune, "L'Aquila");
    assert!(matches!(parse_watch_command("save {"), Err(CliError::InvalidJson(_))));
}

#[test]
fn unknown_verbs_are_rejected() {
    assert!(matches!(parse_watch_command("zoom 3"), Err(CliError::InvalidCommand(_))));
    assert_eq!(parse_watch_command("quit").unwrap(), Some(WatchCommand::Quit));
    assert_eq!(parse_watch_command("delete 12").unwrap(), Some(WatchCommand::Delete(12)));
}

#[test]
fn initial_viewport_clamps_zoom_and_uses_defaults() {
    let config = MapConfig::default();
    let view = ViewArgs { lat: None, lon: None, zoom: Some(30), width: 800, height: 600 };
    let viewport = initial_viewport(&config, view);
    assert_eq!(viewport.zoom, config.max_zoom);
    assert!((viewport.center.lat - config.default_center.lat).abs() < 1e-9);
    assert!(viewport.bounds.contains(config.default_center));
}
