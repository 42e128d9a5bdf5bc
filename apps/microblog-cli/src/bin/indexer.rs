use indicatif::{ProgressBar, ProgressStyle};

use microblog_cli::open_blog;
use microblog_core::config::Config;
use microblog_core::logging;
use microblog_core::types::{EntityKind, Post};

fn main() -> anyhow::Result<()> {
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    logging::init(&config.settings()?.log.filter);
    let (blog, settings) = open_blog(&config)?;
    if !settings.search.enabled { println!("⚠️  search.enabled = false; nothing to reindex"); return Ok(()); }

    println!("Microblog Reindexer\n===================");
    let total = blog.store().count(EntityKind::Post);
    println!("Store: {}  ({} posts)", settings.store.path, total);
    let pb = ProgressBar::new(total as u64);
    pb.set_style(ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} posts ({percent}%)")?.progress_chars("#>-"));
    let stats = blog.reindex::<Post>(settings.search.reindex_batch, |n| pb.inc(n as u64))?;
    pb.finish_and_clear();
    println!("\n✅ Reindexed {} {} rows in {} batches", stats.indexed, stats.kind, stats.batches);
    Ok(())
}
