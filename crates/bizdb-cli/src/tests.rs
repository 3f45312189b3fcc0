use super::*;

#[test]
fn parses_collect_with_repeated_categories() {
    let cli = Cli::try_parse_from([
        "bizdb-cli",
        "collect",
        "--provider",
        "yelp",
        "--category",
        "Lawyers",
        "--category",
        "Paralegal",
        "--location",
        "Troy, MI",
    ])
    .expect("expected valid cli args");

    match cli.command {
        Some(Commands::Collect {
            provider,
            categories,
            location,
            radius_miles,
        }) => {
            assert_eq!(provider, ProviderKind::Yelp);
            assert_eq!(categories, vec!["Lawyers", "Paralegal"]);
            assert_eq!(location, "Troy, MI");
            assert_eq!(radius_miles, 5);
        }
        other => panic!("expected collect, got {other:?}"),
    }
}

#[test]
fn collect_requires_a_category() {
    let result = Cli::try_parse_from([
        "bizdb-cli",
        "collect",
        "--provider",
        "here",
        "--location",
        "Troy",
    ]);
    assert!(result.is_err());
}

#[test]
fn collect_rejects_unknown_provider() {
    let result = Cli::try_parse_from([
        "bizdb-cli",
        "collect",
        "--provider",
        "bing",
        "--category",
        "Lawyers",
        "--location",
        "Troy",
    ]);
    assert!(result.is_err());
}

#[test]
fn collect_radius_is_bounded() {
    let args = |radius: &'static str| {
        Cli::try_parse_from([
            "bizdb-cli",
            "collect",
            "--provider",
            "google",
            "--category",
            "Lawyers",
            "--location",
            "Troy",
            "--radius-miles",
            radius,
        ])
    };
    assert!(args("0").is_err());
    assert!(args("26").is_err());
    assert!(args("25").is_ok());
}

#[test]
fn parses_list_json_flag() {
    let cli = Cli::try_parse_from(["bizdb-cli", "list", "--json"]).expect("expected valid cli args");
    assert!(matches!(cli.command, Some(Commands::List { json: true })));

    let cli = Cli::try_parse_from(["bizdb-cli", "list"]).expect("expected valid cli args");
    assert!(matches!(cli.command, Some(Commands::List { json: false })));
}

#[test]
fn parses_cycle_commands() {
    let cli = Cli::try_parse_from(["bizdb-cli", "update"]).expect("expected valid cli args");
    assert!(matches!(cli.command, Some(Commands::Update)));

    let cli = Cli::try_parse_from(["bizdb-cli", "refresh"]).expect("expected valid cli args");
    assert!(matches!(cli.command, Some(Commands::Refresh)));

    let cli = Cli::try_parse_from(["bizdb-cli", "schedule"]).expect("expected valid cli args");
    assert!(matches!(cli.command, Some(Commands::Schedule)));
}

#[test]
fn parses_details_command() {
    let cli = Cli::try_parse_from(["bizdb-cli", "details", "--provider", "google", "ChIJ123"])
        .expect("expected valid cli args");

    match cli.command {
        Some(Commands::Details { provider, id }) => {
            assert_eq!(provider, ProviderKind::Google);
            assert_eq!(id, "ChIJ123");
        }
        other => panic!("expected details, got {other:?}"),
    }
}

#[test]
fn parses_db_commands() {
    let cli = Cli::try_parse_from(["bizdb-cli", "db", "ping"]).expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Ping
        })
    ));

    let cli = Cli::try_parse_from(["bizdb-cli", "db", "migrate"]).expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Migrate
        })
    ));

    let cli = Cli::try_parse_from(["bizdb-cli", "db", "clear"]).expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Clear
        })
    ));
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["bizdb-cli"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}
