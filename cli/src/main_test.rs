use clap::CommandFactory;

use super::*;

#[test]
fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn global_flags_parse() {
    let cli = Cli::try_parse_from([
        "authgate",
        "--base-url",
        "http://localhost:9000/",
        "--store",
        "/tmp/session.json",
        "--refresh-policy",
        "single_flight",
        "status",
    ])
    .unwrap();

    assert_eq!(cli.global.base_url.as_deref(), Some("http://localhost:9000/"));
    assert_eq!(cli.global.store, PathBuf::from("/tmp/session.json"));
    assert_eq!(cli.global.refresh_policy, Some(RefreshPolicy::SingleFlight));
    assert!(matches!(cli.command, Command::Status));
}

#[test]
fn unknown_refresh_policy_is_rejected() {
    let result = Cli::try_parse_from(["authgate", "--refresh-policy", "eager", "status"]);
    assert!(result.is_err());
}

#[test]
fn profile_update_takes_optional_bio() {
    let cli = Cli::try_parse_from(["authgate", "profile", "update", "--name", "minji"]).unwrap();
    let Command::Profile(ProfileCommand { command: ProfileSubcommand::Update { name, bio } }) = cli.command else {
        panic!("expected profile update");
    };
    assert_eq!(name, "minji");
    assert_eq!(bio, None);
}

#[test]
fn snapshot_renders_with_wire_field_names() {
    let snapshot = SessionSnapshot { is_logged_in: true, user_name: "minji".into(), user_id: Some(7) };
    assert_eq!(
        snapshot_json(&snapshot),
        serde_json::json!({ "isLoggedIn": true, "userName": "minji", "userId": 7 })
    );
    assert_eq!(
        snapshot_json(&SessionSnapshot::default()),
        serde_json::json!({ "isLoggedIn": false, "userName": "", "userId": null })
    );
}
