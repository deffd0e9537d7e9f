use std::io::{self, Write};
use std::path::PathBuf;

use clap::Parser;

use mail_threader::mbox::open_mbox;
use mail_threader::models::ThreadSummary;
use mail_threader::{Message, MessageId, ThreadManager, ThreadingConfig, Window};

#[derive(Parser, Debug)]
#[command(
    name = "thread-mbox",
    about = "Reconstruct discussion threads from mbox files"
)]
struct Args {
    /// mbox files to thread; each becomes one source, searched in the given order.
    #[arg(required = true)]
    mailboxes: Vec<PathBuf>,

    /// Show only the thread containing this Message-ID.
    #[arg(long)]
    message_id: Option<String>,

    /// With `--message-id`, climb to the root of the thread first.
    #[arg(long, requires = "message_id")]
    start: bool,

    /// Load every message of every mailbox before listing threads.
    #[arg(long)]
    complete: bool,

    /// Treat only the newest N messages of each mailbox as loaded; older ones
    /// are read on demand.
    #[arg(long)]
    resolved_tail: Option<usize>,

    /// Per-ancestor search window (`ALL` or a count); overrides THREADER_WINDOW.
    #[arg(long)]
    window: Option<Window>,

    /// Print threads as JSON instead of text trees.
    #[arg(long)]
    json: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    mail_threader::init_logger();

    let args = Args::parse();

    let mut config = ThreadingConfig::from_env();
    if let Some(window) = args.window {
        config.window = window;
    }

    let mut manager = ThreadManager::new(config)?;
    for path in &args.mailboxes {
        let folder = open_mbox(path, args.resolved_tail)?;
        if !manager.include_source(Box::new(folder))? {
            log::warn!("{} given more than once, ignoring", path.display());
        }
    }

    let roots: Vec<MessageId> = match &args.message_id {
        Some(raw) => {
            let Some(id) = MessageId::parse(raw) else {
                writeln!(io::stderr(), "error: '{raw}' is not a valid Message-ID")?;
                std::process::exit(1);
            };

            manager.process_pending();
            if manager.node(&id).is_none_or(|node| node.is_dummy()) {
                manager.all();
            }

            let Some(message) = manager.node(&id).and_then(|node| node.message().cloned()) else {
                writeln!(io::stderr(), "error: no message with id <{id}> found")?;
                std::process::exit(1);
            };

            let root = if args.start {
                manager.thread_start(&message)
            } else {
                manager.thread(&message)
            };
            root.map(|node| node.id().clone()).into_iter().collect()
        }
        None => {
            let threads = if args.complete {
                manager.sorted_all()
            } else {
                manager.sorted_known()
            };
            threads.iter().map(|node| node.id().clone()).collect()
        }
    };

    if args.json {
        let summaries: Vec<ThreadSummary> = roots
            .iter()
            .filter_map(|root| ThreadSummary::from_index(manager.index(), root))
            .collect();
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    let mut stdout = io::stdout().lock();
    for (i, root) in roots.iter().enumerate() {
        if i > 0 {
            writeln!(stdout)?;
        }
        write!(stdout, "{}", manager.render_thread(root))?;
    }

    log::info!(
        "{} threads, {} messages indexed",
        roots.len(),
        manager
            .index()
            .nodes()
            .filter(|node| node.message().is_some_and(|m| !m.is_deleted()))
            .count()
    );
    Ok(())
}
