//! Shared wiring for the microblog binaries.

use std::sync::Arc;

use microblog_core::config::{Config, Settings};
use microblog_core::traits::SearchIndex;
use microblog_store::{CommitReport, Store};
use microblog_sync::SearchableStore;

pub type Blog = SearchableStore<dyn SearchIndex>;

/// Open the store and index named by `config` and wire them together.
pub fn open_blog(config: &Config) -> anyhow::Result<(Blog, Settings)> {
    let settings = config.settings()?;
    let store = Store::open(&config.resolve(&settings.store.path))?;
    let index = microblog_text::open_index(config)?;
    Ok((SearchableStore::new(Arc::new(store), index), settings))
}

/// Print replay failures; the commit itself already succeeded.
pub fn report_commit(report: &CommitReport) {
    for failure in &report.hook_failures {
        eprintln!("⚠️  {} failed after commit: {} (run microblog-reindex to repair)", failure.hook, failure.error);
    }
}

/// Parse `--page N`, defaulting to 1.
pub fn page_arg(args: &[String]) -> anyhow::Result<usize> {
    match args.iter().position(|a| a == "--page") {
        Some(i) => args
            .get(i + 1)
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|p| *p > 0)
            .ok_or_else(|| anyhow::anyhow!("--page requires a positive number")),
        None => Ok(1),
    }
}

/// Join the words of a post body, rejecting one that is blank.
pub fn post_body(words: &[String]) -> anyhow::Result<String> {
    let body = words.join(" ");
    if body.trim().is_empty() { anyhow::bail!("post body must not be empty"); }
    Ok(body)
}

/// Positional args with `--page N` removed.
pub fn positional(args: &[String]) -> Vec<String> {
    let mut out = Vec::new();
    let mut skip = false;
    for a in args {
        if skip { skip = false; continue; }
        if a == "--page" { skip = true; continue; }
        out.push(a.clone());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(v: &[&str]) -> Vec<String> { v.iter().map(|s| s.to_string()).collect() }

    #[test]
    fn page_flag_is_parsed_and_stripped() {
        let a = args(&["rust", "--page", "3", "tips"]);
        assert_eq!(page_arg(&a).expect("page"), 3);
        assert_eq!(positional(&a), args(&["rust", "tips"]));
    }

    #[test]
    fn blank_post_body_is_rejected() {
        assert_eq!(post_body(&args(&["hello", "world"])).expect("body"), "hello world");
        assert!(post_body(&[]).is_err());
        assert!(post_body(&args(&["  ", ""])).is_err());
    }

    #[test]
    fn bad_page_is_rejected() {
        assert!(page_arg(&args(&["--page", "0"])).is_err());
        assert!(page_arg(&args(&["--page"])).is_err());
        assert_eq!(page_arg(&args(&["q"])).expect("default"), 1);
    }
}
