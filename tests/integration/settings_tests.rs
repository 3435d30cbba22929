use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use plextube::settings::Settings;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

// Each test touches its own env var names so parallel test threads
// cannot interfere with each other.

#[test]
fn test_settings_defaults_leave_everything_unset() {
    let figment = Figment::from(Serialized::defaults(Settings::default()));
    let settings: Settings = figment.extract().unwrap();

    assert_eq!(settings.plex_url, None);
    assert_eq!(settings.plex_token, None);
    assert_eq!(settings.youtube_api_key, None);
    assert_eq!(settings.library_name, None);
    assert_eq!(settings.cache_path, None);
}

#[test]
fn test_settings_load_from_toml() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    fs::write(
        &config_path,
        r#"
plex_url = "http://plex.local:32400"
plex_token = "secret-token"
youtube_api_key = "yt-key"
library_name = "YouTube"
cache_path = "/var/cache/plextube/metadata_cache.json"
"#,
    )
    .unwrap();

    let figment =
        Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file(&config_path));
    let settings: Settings = figment.extract().unwrap();

    assert_eq!(settings.plex_url.as_deref(), Some("http://plex.local:32400"));
    assert_eq!(settings.plex_token.as_deref(), Some("secret-token"));
    assert_eq!(settings.youtube_api_key.as_deref(), Some("yt-key"));
    assert_eq!(settings.library_name.as_deref(), Some("YouTube"));
    assert_eq!(
        settings.cache_path,
        Some(PathBuf::from("/var/cache/plextube/metadata_cache.json"))
    );
}

#[test]
fn test_settings_load_from_prefixed_env() {
    std::env::set_var("PLEXTUBE_PLEX_URL", "http://env.plex:32400");

    let figment = Figment::from(Serialized::defaults(Settings::default()))
        .merge(Env::prefixed("PLEXTUBE_"));
    let settings: Settings = figment.extract().unwrap();

    assert_eq!(settings.plex_url.as_deref(), Some("http://env.plex:32400"));

    std::env::remove_var("PLEXTUBE_PLEX_URL");
}

#[test]
fn test_settings_recognize_bare_env_names() {
    std::env::set_var("PLEX_URL", "http://bare.plex:32400");

    let figment = Figment::from(Serialized::defaults(Settings::default()))
        .merge(Env::raw().only(&["plex_url"]));
    let settings: Settings = figment.extract().unwrap();

    assert_eq!(settings.plex_url.as_deref(), Some("http://bare.plex:32400"));

    std::env::remove_var("PLEX_URL");
}

#[test]
fn test_prefixed_env_wins_over_bare_names() {
    std::env::set_var("PLEX_TOKEN", "bare");
    std::env::set_var("PLEXTUBE_PLEX_TOKEN", "prefixed");

    let figment = Figment::from(Serialized::defaults(Settings::default()))
        .merge(Env::raw().only(&["plex_token"]))
        .merge(Env::prefixed("PLEXTUBE_"));
    let settings: Settings = figment.extract().unwrap();

    assert_eq!(settings.plex_token.as_deref(), Some("prefixed"));

    std::env::remove_var("PLEX_TOKEN");
    std::env::remove_var("PLEXTUBE_PLEX_TOKEN");
}

#[test]
fn test_env_wins_over_the_config_file() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, "library_name = \"From File\"\n").unwrap();
    std::env::set_var("PLEXTUBE_LIBRARY_NAME", "From Env");

    let figment = Figment::from(Serialized::defaults(Settings::default()))
        .merge(Toml::file(&config_path))
        .merge(Env::prefixed("PLEXTUBE_"));
    let settings: Settings = figment.extract().unwrap();

    assert_eq!(settings.library_name.as_deref(), Some("From Env"));

    std::env::remove_var("PLEXTUBE_LIBRARY_NAME");
}

#[test]
fn test_invalid_toml_reports_an_error() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, "plex_url = unquoted").unwrap();

    let figment =
        Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file(&config_path));
    let result: Result<Settings, _> = figment.extract();

    assert!(result.is_err());
}
