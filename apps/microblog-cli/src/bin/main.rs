use std::env;

use microblog_cli::{open_blog, page_arg, positional, post_body, report_commit, Blog};
use microblog_core::config::Config;
use microblog_core::logging;
use microblog_core::types::{Post, User};

const USAGE: &str = "Usage: microblog <user|post|edit|delete|follow|unfollow|search|home|timeline> [args...]
  user <username> <email>
  post <username> <text...>
  edit <post_id> <text...>
  delete <post_id>
  follow <username> <other>
  unfollow <username> <other>
  search <query...> [--page N]
  home <username> [--page N]
  timeline [--page N]";

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() { eprintln!("{USAGE}"); std::process::exit(1); }
    let cmd = args.remove(0);
    (cmd, args)
}

fn post_id(arg: Option<&String>) -> anyhow::Result<u64> {
    arg.and_then(|s| s.parse().ok()).ok_or_else(|| anyhow::anyhow!("expected a numeric post id"))
}

fn two_users(blog: &Blog, args: &[String], usage: &str) -> anyhow::Result<(User, User)> {
    let [a, b] = args else { anyhow::bail!("usage: microblog {}", usage) };
    let find = |name: &String| blog.store().find_user(name).ok_or_else(|| anyhow::anyhow!("no user named '{}'", name));
    Ok((find(a)?, find(b)?))
}

fn main() -> anyhow::Result<()> {
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let (cmd, args) = parse_args();
    logging::init(&config.settings()?.log.filter);
    let (blog, settings) = open_blog(&config)?;
    let per_page = settings.search.posts_per_page;

    match cmd.as_str() {
        "user" => {
            let [username, email] = args.as_slice() else { anyhow::bail!("usage: microblog user <username> <email>") };
            if blog.store().find_user(username).is_some() { anyhow::bail!("user '{}' already exists", username); }
            let mut session = blog.begin();
            let id = session.add(User::new(username.as_str(), email.as_str()));
            report_commit(&session.commit()?);
            println!("✅ Created user {} (id={})", username, id);
        }
        "post" => {
            let Some(username) = args.first() else { anyhow::bail!("usage: microblog post <username> <text...>") };
            let user = blog.store().find_user(username).ok_or_else(|| anyhow::anyhow!("no user named '{}'", username))?;
            let body = post_body(&args[1..])?;
            let mut session = blog.begin();
            let id = session.add(Post::new(user.id, body));
            report_commit(&session.commit()?);
            println!("✅ Posted (id={})", id);
        }
        "edit" => {
            let id = post_id(args.first())?;
            let mut session = blog.begin();
            let mut post = session.get::<Post>(id).ok_or_else(|| anyhow::anyhow!("no post with id {}", id))?;
            post.body = post_body(&args[1..])?;
            session.update(post)?;
            report_commit(&session.commit()?);
            println!("✅ Updated post {}", id);
        }
        "delete" => {
            let id = post_id(args.first())?;
            let mut session = blog.begin();
            session.delete::<Post>(id)?;
            report_commit(&session.commit()?);
            println!("🗑️  Deleted post {}", id);
        }
        "follow" => {
            let (user, other) = two_users(&blog, &args, "follow <username> <other>")?;
            let mut session = blog.begin();
            let changed = session.follow(user.id, other.id)?;
            report_commit(&session.commit()?);
            if changed { println!("✅ {} is now following {}", user.username, other.username); }
            else { println!("ℹ️  {} already follows {}", user.username, other.username); }
        }
        "unfollow" => {
            let (user, other) = two_users(&blog, &args, "unfollow <username> <other>")?;
            let mut session = blog.begin();
            let changed = session.unfollow(user.id, other.id)?;
            report_commit(&session.commit()?);
            if changed { println!("✅ {} is no longer following {}", user.username, other.username); }
            else { println!("ℹ️  {} was not following {}", user.username, other.username); }
        }
        "home" => {
            let page = page_arg(&args)?;
            let Some(username) = positional(&args).into_iter().next() else { anyhow::bail!("usage: microblog home <username> [--page N]") };
            let user = blog.store().find_user(&username).ok_or_else(|| anyhow::anyhow!("no user named '{}'", username))?;
            let (posts, total) = blog.store().followed_posts(user.id, page, per_page)?;
            println!("🏠 {} posts in {}'s feed (page {})", total, username, page);
            for post in posts { println!("  [{}] user={}  {}", post.id, post.user_id, post.body); }
        }
        "search" => {
            let page = page_arg(&args)?;
            let query = positional(&args).join(" ");
            if query.trim().is_empty() { anyhow::bail!("usage: microblog search <query...> [--page N]"); }
            let results = blog.search::<Post>(&query, page, per_page)?;
            println!("🔍 Found {} results for: \"{}\" (page {})", results.total, query, page);
            let first_rank = (page - 1).saturating_mul(per_page);
            for (i, post) in results.items.iter().enumerate() {
                println!("\n  {}. id={}  user={}  {}", first_rank.saturating_add(i + 1), post.id, post.user_id, post.timestamp.format("%Y-%m-%d %H:%M"));
                println!("     📝 {}", post.body);
            }
            if let Some(prev) = results.prev_page() { println!("\n⬅️  previous: --page {}", prev); }
            if let Some(next) = results.next_page() { println!("➡️  next: --page {}", next); }
        }
        "timeline" => {
            let page = page_arg(&args)?;
            let (posts, total) = blog.store().recent_posts(page, per_page)?;
            println!("🕒 {} posts (page {})", total, page);
            for post in posts { println!("  [{}] user={}  {}", post.id, post.user_id, post.body); }
        }
        _ => { eprintln!("Unknown command: {}\n{}", cmd, USAGE); std::process::exit(1); }
    }
    Ok(())
}
