use figment::Jail;

use microblog_core::config::{resolve_with_base, Config};
use microblog_core::traits::{check_page, Indexable};
use microblog_core::types::{EntityKind, Post};

#[test]
fn defaults_apply_without_config_files() {
    Jail::expect_with(|jail| {
        jail.set_env("RUST_ENV", "test");
        let config = Config::load().map_err(|e| e.to_string())?;
        let settings = config.settings().map_err(|e| e.to_string())?;
        assert!(settings.search.enabled);
        assert_eq!(settings.search.posts_per_page, 25);
        assert_eq!(settings.store.path, "data/microblog.json");
        Ok(())
    });
}

#[test]
fn env_file_and_env_vars_layer_over_base_file() {
    Jail::expect_with(|jail| {
        jail.set_env("RUST_ENV", "test");
        jail.create_file("microblog.toml", r#"
            [search]
            posts_per_page = 10
            index_dir = "base/index"
        "#)?;
        jail.create_file("microblog.test.toml", r#"
            [search]
            index_dir = "test/index"
        "#)?;
        jail.set_env("MICROBLOG_LOG__FILTER", "debug");

        let config = Config::load().map_err(|e| e.to_string())?;
        let settings = config.settings().map_err(|e| e.to_string())?;
        assert_eq!(settings.search.posts_per_page, 10);
        assert_eq!(settings.search.index_dir.as_deref(), Some("test/index"));
        assert_eq!(settings.log.filter, "debug");
        let per_page: usize = config.get("search.posts_per_page").map_err(|e| e.to_string())?;
        assert_eq!(per_page, 10);
        Ok(())
    });
}

#[test]
fn invalid_settings_are_rejected_at_load() {
    Jail::expect_with(|jail| {
        jail.set_env("RUST_ENV", "test");
        jail.create_file("microblog.toml", "[search]\nposts_per_page = 0\n")?;
        assert!(Config::load().is_err(), "zero page size must not load");
        Ok(())
    });
}

#[test]
fn relative_paths_resolve_against_base() {
    let base = std::path::Path::new("/srv/blog");
    assert_eq!(resolve_with_base(base, "data/index"), base.join("data/index"));
    assert_eq!(resolve_with_base(base, "/var/index"), std::path::PathBuf::from("/var/index"));
}

#[test]
fn page_zero_is_invalid() {
    assert!(check_page(0, 25).is_err());
    assert!(check_page(1, 0).is_err());
    assert!(check_page(1, 25).is_ok());
}

#[test]
fn only_posts_are_indexable() {
    assert!(EntityKind::Post.is_indexable());
    assert!(!EntityKind::User.is_indexable());
    assert_eq!(<Post as Indexable>::SEARCHABLE, &["body"]);
}
