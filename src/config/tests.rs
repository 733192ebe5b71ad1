use super::*;

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());
    raw.render.delivery = Some("string".to_string());

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        render: RenderOverrides {
            delivery: Some(DeliveryMode::Iterable),
            ..Default::default()
        },
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert_eq!(settings.render.delivery, DeliveryMode::Iterable);
}

#[test]
fn defaults_stream_uncompressed_html() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.render.delivery, DeliveryMode::Stream);
    assert!(!settings.render.compress_html);
    assert_eq!(settings.server.addr.port(), DEFAULT_PORT);
    assert!(matches!(settings.logging.format, LogFormat::Compact));
}

#[test]
fn unknown_delivery_mode_is_rejected() {
    let mut raw = RawSettings::default();
    raw.render.delivery = Some("chunked".to_string());

    let error = Settings::from_raw(raw).expect_err("invalid delivery");
    assert!(matches!(
        error,
        LoadError::Invalid {
            key: "render.delivery",
            ..
        }
    ));
}

#[test]
fn zero_port_is_rejected() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(0);

    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["rendition"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_render_arguments() {
    let args = CliArgs::parse_from([
        "rendition",
        "render",
        "--delivery",
        "iterable",
        "--compress-html",
        "true",
        "/hello/world",
    ]);

    match args.command.expect("render command") {
        Command::Render(render) => {
            assert_eq!(render.path, "/hello/world");
            assert_eq!(render.overrides.delivery, Some(DeliveryMode::Iterable));
            assert_eq!(render.overrides.compress_html, Some(true));
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_serve_overrides() {
    let args = CliArgs::parse_from([
        "rendition",
        "serve",
        "--server-host",
        "0.0.0.0",
        "--delivery",
        "string",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.server_host.as_deref(), Some("0.0.0.0"));
            assert_eq!(serve.overrides.render.delivery, Some(DeliveryMode::String));
        }
        _ => panic!("wrong command parsed"),
    }
}
