use std::io::Write;

use mail_threader::mbox::open_mbox;
use mail_threader::models::ThreadSummary;
use mail_threader::{Message, MessageId, Source, ThreadError, ThreadManager, ThreadingConfig};
use tempfile::NamedTempFile;

const ARCHIVE: &str = concat!(
    "From alice@example.com Fri Mar  1 09:00:00 2024\n",
    "Message-ID: <1@example.com>\n",
    "From: Alice <alice@example.com>\n",
    "Date: Fri, 01 Mar 2024 09:00:00 +0000\n",
    "Subject: Kernel panic on boot\n",
    "\n",
    "It crashes.\n",
    "\n",
    "From bob@example.com Fri Mar  1 10:12:00 2024\n",
    "Message-ID: <2@example.com>\n",
    "From: Bob <bob@example.com>\n",
    "Date: Fri, 01 Mar 2024 10:12:00 +0000\n",
    "Subject: Re: Kernel panic on boot\n",
    "In-Reply-To: <1@example.com>\n",
    "References: <1@example.com>\n",
    "\n",
    "Which config?\n",
    "\n",
    "From carol@example.com Fri Mar  1 11:00:00 2024\n",
    "Message-ID: <unrelated@example.com>\n",
    "Date: Fri, 01 Mar 2024 11:00:00 +0000\n",
    "Subject: Unrelated\n",
    "\n",
    "Hi\n",
    "\n",
    "From alice@example.com Sat Mar  2 08:30:00 2024\n",
    "Message-ID: <4@example.com>\n",
    "From: Alice <alice@example.com>\n",
    "Date: Sat, 02 Mar 2024 08:30:00 +0000\n",
    "Subject: Re: Kernel panic on boot\n",
    "In-Reply-To: <3@example.com>\n",
    "References: <1@example.com> <2@example.com> <3@example.com>\n",
    "\n",
    "Attached.\n",
);

fn write_mbox(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn id(raw: &str) -> MessageId {
    MessageId::parse(raw).unwrap()
}

#[test]
fn thread_start_reads_older_messages_on_demand() {
    let file = write_mbox(ARCHIVE);
    let folder = open_mbox(file.path(), Some(1)).unwrap();
    assert_eq!(folder.len(), 4);
    assert_eq!(folder.loaded_count(), 1);

    let mut manager = ThreadManager::new(ThreadingConfig::default()).unwrap();
    manager.include_source(Box::new(folder)).unwrap();

    let newest = manager
        .node(&id("4@example.com"))
        .and_then(|node| node.message().cloned())
        .unwrap();

    let root = manager.thread_start(&newest).unwrap();
    assert_eq!(root.id(), &id("1@example.com"));
    assert!(!root.is_dummy());

    // <3@example.com> was never stored anywhere
    assert!(manager.node(&id("3@example.com")).unwrap().is_dummy());
    assert_eq!(
        manager.node(&id("4@example.com")).unwrap().parent_id(),
        Some(&id("3@example.com"))
    );

    let rendered = manager.render_thread(&id("1@example.com"));
    assert_eq!(
        rendered,
        "2024-03-01 09:00  Kernel panic on boot  <1@example.com>\n\
         \x20\x20`- 2024-03-01 10:12  Re: Kernel panic on boot  <2@example.com>\n\
         \x20\x20\x20\x20`- [not found]  <3@example.com>\n\
         \x20\x20\x20\x20\x20\x20`- 2024-03-02 08:30  Re: Kernel panic on boot  <4@example.com>\n"
    );
}

#[test]
fn sorted_all_lists_every_thread() {
    let file = write_mbox(ARCHIVE);
    let mut manager = ThreadManager::new(ThreadingConfig::default()).unwrap();
    manager
        .include_source(Box::new(open_mbox(file.path(), Some(0)).unwrap()))
        .unwrap();
    assert!(manager.known().is_empty());

    let roots: Vec<MessageId> = manager.sorted_all().iter().map(|n| n.id().clone()).collect();
    assert_eq!(roots, vec![id("1@example.com"), id("unrelated@example.com")]);

    let summary = ThreadSummary::from_index(manager.index(), &roots[0]).unwrap();
    assert_eq!(summary.message_count, 3);
    assert_eq!(summary.subject.as_deref(), Some("Kernel panic on boot"));
    assert_eq!(summary.members.last().map(|m| m.depth), Some(3));
    let authors: Vec<Option<&str>> = summary.members.iter().map(|m| m.author.as_deref()).collect();
    assert_eq!(authors, vec![Some("Alice"), Some("Bob"), Some("Alice")]);
    assert!(
        summary
            .members
            .iter()
            .all(|m| manager.node(&m.message_id).is_some_and(|n| !n.is_dummy()))
    );
}

#[test]
fn removing_mailbox_drops_its_threads() {
    let file = write_mbox(ARCHIVE);
    let mut manager = ThreadManager::new(ThreadingConfig::default()).unwrap();
    manager
        .include_source(Box::new(open_mbox(file.path(), None).unwrap()))
        .unwrap();
    assert_eq!(manager.known().len(), 2);

    let name = file.path().display().to_string();
    assert_eq!(manager.source_names(), vec![name.as_str()]);

    let removed = manager.remove_source(&name).unwrap();
    assert_eq!(removed.messages().len(), 4);
    assert!(manager.known().is_empty());
    assert!(manager.index().is_empty());
}

#[test]
fn message_timestamps_come_from_date_header() {
    let file = write_mbox(ARCHIVE);
    let folder = open_mbox(file.path(), None).unwrap();
    let messages = folder.messages();

    let first = &messages[0];
    assert_eq!(
        first.timestamp().map(|t| t.to_rfc3339()),
        Some("2024-03-01T09:00:00+00:00".to_string())
    );
    assert_eq!(first.author(), Some("Alice"));
    assert_eq!(messages[3].references.len(), 3);
}

#[test]
fn missing_mailbox_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = open_mbox(&dir.path().join("nope.mbox"), None).unwrap_err();
    assert!(matches!(err, ThreadError::Io { .. }));
}
