//! Filesystem adapter tests against an in-memory share.
//!
//! Covers translation of remote entries, handle lifecycles, capability
//! errors and pass-through of remote errors.

mod common;

use common::TestShare;
use shareftp_gateway::{FileHandle, FsOperation, OpenFile, OpenFlags};
use std::io::SeekFrom;
use std::time::SystemTime;

// ============================================================================
// Stat and listing
// ============================================================================

#[tokio::test]
async fn test_stat_names_never_end_in_separator() {
    let share = TestShare::new();
    share.store.insert_dir("/photos");
    share.store.insert_dir("/photos/2024");
    share.store.insert_file("/photos/2024/beach.jpg", vec![0u8; 2048]);

    for path in ["/photos", "/photos/", "/photos/2024/", "/photos/2024/beach.jpg"] {
        let info = share.fs.stat(path).await.unwrap();
        assert!(!info.name.ends_with('/'), "{path} -> {:?}", info.name);
        assert!(!info.name.is_empty());
    }

    let file = share.fs.stat("/photos/2024/beach.jpg").await.unwrap();
    assert_eq!(file.name, "beach.jpg");
    assert_eq!(file.size, 2048);
    assert!(!file.is_dir);
    assert_eq!(file.mode, 0o664);

    let dir = share.fs.stat("/photos/2024").await.unwrap();
    assert_eq!(dir.name, "2024");
    assert!(dir.is_dir);
    assert_eq!(dir.mode, 0o775);
}

#[tokio::test]
async fn test_stat_root_has_empty_name() {
    let share = TestShare::new();
    let root = share.fs.stat("/").await.unwrap();
    assert_eq!(root.name, "");
    assert!(root.is_dir);
}

#[tokio::test]
async fn test_list_dir_translates_entries_in_remote_order() {
    let share = TestShare::new();
    share.store.insert_file("/a.txt", "aaa");
    share.store.insert_dir("/sub");

    let entries = share.fs.list_dir("/").await.unwrap();
    assert_eq!(entries.len(), 2);

    assert_eq!(entries[0].name, "a.txt");
    assert!(!entries[0].is_dir);
    assert_eq!(entries[0].size, 3);

    assert_eq!(entries[1].name, "sub");
    assert!(entries[1].is_dir);
}

#[tokio::test]
async fn test_list_dir_does_not_sort() {
    let share = TestShare::new();
    for name in ["/zeta", "/alpha", "/mid"] {
        share.store.insert_file(name, "x");
    }
    let names: Vec<String> = share
        .fs
        .list_dir("/")
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert_eq!(names, ["zeta", "alpha", "mid"]);
}

#[tokio::test]
async fn test_stat_missing_propagates_remote_error() {
    let share = TestShare::new();
    let err = share.fs.stat("/nope.txt").await.unwrap_err();
    assert!(err.is_not_found());
    assert!(!err.is_unsupported());
}

// ============================================================================
// Write handles
// ============================================================================

#[tokio::test]
async fn test_two_writes_become_one_upload() {
    let share = TestShare::new();
    let mut handle = share.fs.open_write("/greeting.txt", true);
    handle.write(b"hello").unwrap();
    handle.write(b"world").unwrap();
    assert_eq!(share.store.write_count(), 0);

    handle.close().await.unwrap();

    let writes = share.store.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].1.as_ref(), b"helloworld");
    assert_eq!(
        share.store.content("/greeting.txt").unwrap().as_ref(),
        b"helloworld"
    );
}

#[tokio::test]
async fn test_create_then_close_leaves_path_absent() {
    let share = TestShare::new();
    let mut handle = share.fs.create("/empty.bin").await.unwrap();
    handle.close().await.unwrap();

    assert_eq!(share.store.write_count(), 0);
    assert!(share.fs.stat("/empty.bin").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_concurrent_write_handles_are_independent() {
    let share = TestShare::new();
    let mut first = share.fs.open_write("/one.txt", true);
    let mut second = share.fs.open_write("/two.txt", true);

    first.write(b"first").unwrap();
    second.write(b"second").unwrap();
    first.write(b"-more").unwrap();

    second.close().await.unwrap();
    first.close().await.unwrap();

    let writes = share.store.writes();
    assert_eq!(writes.len(), 2);
    assert_eq!(writes[0].0, "/two.txt");
    assert_eq!(writes[0].1.as_ref(), b"second");
    assert_eq!(writes[1].0, "/one.txt");
    assert_eq!(writes[1].1.as_ref(), b"first-more");
}

#[tokio::test]
async fn test_upload_failure_surfaces_on_close() {
    let share = TestShare::new();
    share.store.set_fail_writes(true);

    let mut handle = share.fs.open_write("/doomed.txt", true);
    handle.write(b"data").unwrap();
    let err = handle.close().await.unwrap_err();
    assert!(!err.is_unsupported());

    // no retry on a second close
    handle.close().await.unwrap();
    assert_eq!(share.store.write_count(), 1);
}

#[tokio::test]
async fn test_upload_into_missing_directory_fails() {
    let share = TestShare::new();
    let mut handle = share.fs.open_write("/missing/file.txt", true);
    handle.write(b"x").unwrap();
    assert!(handle.close().await.is_err());
}

// ============================================================================
// Read handles
// ============================================================================

#[tokio::test]
async fn test_open_read_streams_content() {
    let share = TestShare::new();
    share.store.insert_file("/doc.txt", "line one\nline two\n");

    let mut handle = share.fs.open_read("/doc.txt").await.unwrap();
    let mut out = Vec::new();
    let mut buf = [0u8; 4];
    loop {
        let n = handle.read(&mut buf).await.unwrap();
        if n == 0 {
            break;
        }
        out.extend_from_slice(&buf[..n]);
    }
    handle.close().await.unwrap();
    assert_eq!(out, b"line one\nline two\n");
}

#[tokio::test]
async fn test_read_handle_seek_fails_for_every_offset() {
    let share = TestShare::new();
    share.store.insert_file("/doc.txt", "0123456789");

    let mut handle = share.fs.open_read("/doc.txt").await.unwrap();
    for offset in [0u64, 1, 5, 10, 1 << 40] {
        assert!(handle.seek(SeekFrom::Start(offset)).unwrap_err().is_unsupported());
    }
    for delta in [-3i64, 0, 3] {
        assert!(handle.seek(SeekFrom::Current(delta)).unwrap_err().is_unsupported());
        assert!(handle.seek(SeekFrom::End(delta)).unwrap_err().is_unsupported());
    }

    // the stream is still intact afterwards
    let mut buf = [0u8; 3];
    assert_eq!(handle.read(&mut buf).await.unwrap(), 3);
    assert_eq!(&buf, b"012");
}

#[tokio::test]
async fn test_open_read_missing_file_fails() {
    let share = TestShare::new();
    assert!(share.fs.open_read("/ghost").await.unwrap_err().is_not_found());
}

// ============================================================================
// Flag-based open
// ============================================================================

#[tokio::test]
async fn test_open_file_dispatches_on_flags() {
    let share = TestShare::new();
    share.store.insert_file("/r.txt", "r");

    let opened = share.fs.open_file("/r.txt", OpenFlags::READ_ONLY).await.unwrap();
    assert!(matches!(opened, OpenFile::Read(_)));
    assert_eq!(opened.name(), "/r.txt");

    let mut opened = share.fs.open_file("/w.txt", OpenFlags::WRITE_ONLY).await.unwrap();
    assert!(matches!(opened, OpenFile::Write(_)));
    opened.handle_mut().write(b"w").unwrap();
    opened.close().await.unwrap();
    assert_eq!(share.store.content("/w.txt").unwrap().as_ref(), b"w");

    let err = share
        .fs
        .open_file("/x", OpenFlags::default())
        .await
        .unwrap_err();
    assert!(err.is_unsupported());
}

#[tokio::test]
async fn test_open_for_write_makes_no_remote_call() {
    let share = TestShare::new();
    let _handle = share.fs.open_file("/new.txt", OpenFlags::CREATE).await.unwrap();
    assert_eq!(share.store.write_count(), 0);
    assert!(!share.store.exists("/new.txt"));
}

// ============================================================================
// Directories, removal, rename
// ============================================================================

#[tokio::test]
async fn test_mkdir_and_mkdir_all() {
    let share = TestShare::new();
    share.fs.mkdir("/a").await.unwrap();
    assert!(share.fs.mkdir("/a").await.unwrap_err().is_already_exists());
    assert!(share.fs.mkdir("/x/y").await.is_err());

    share.fs.mkdir_all("/x/y/z").await.unwrap();
    share.fs.mkdir_all("/x/y/z").await.unwrap();
    assert!(share.fs.stat("/x/y/z").await.unwrap().is_dir);
}

#[tokio::test]
async fn test_remove_is_strict_remove_all_is_not() {
    let share = TestShare::new();
    share.store.insert_dir("/tree");
    share.store.insert_file("/tree/leaf", "l");

    assert!(share.fs.remove("/nothing").await.unwrap_err().is_not_found());
    share.fs.remove_all("/nothing").await.unwrap();

    share.fs.remove_all("/tree").await.unwrap();
    assert!(!share.store.exists("/tree/leaf"));
}

#[tokio::test]
async fn test_rename_onto_existing_path_fails() {
    let share = TestShare::new();
    share.store.insert_file("/a.txt", "A");
    share.store.insert_file("/b.txt", "B");

    let err = share.fs.rename("/a.txt", "/b.txt").await.unwrap_err();
    assert!(err.is_already_exists());
    assert_eq!(share.store.content("/a.txt").unwrap().as_ref(), b"A");
    assert_eq!(share.store.content("/b.txt").unwrap().as_ref(), b"B");

    share.fs.rename("/a.txt", "/c.txt").await.unwrap();
    assert!(!share.store.exists("/a.txt"));
    assert_eq!(share.store.content("/c.txt").unwrap().as_ref(), b"A");
}

// ============================================================================
// Unsupported metadata changes
// ============================================================================

#[tokio::test]
async fn test_metadata_changes_always_fail() {
    let share = TestShare::new();
    share.store.insert_file("/f", "f");

    for path in ["/f", "/missing", "/"] {
        for mode in [0, 0o644, 0o777] {
            assert!(share.fs.set_permissions(path, mode).unwrap_err().is_unsupported());
        }
        let now = SystemTime::now();
        assert!(share.fs.set_times(path, now, now).unwrap_err().is_unsupported());
        assert!(
            share
                .fs
                .set_times(path, SystemTime::UNIX_EPOCH, SystemTime::UNIX_EPOCH)
                .unwrap_err()
                .is_unsupported()
        );
        assert!(share.fs.set_owner(path, 0, 0).unwrap_err().is_unsupported());
        assert!(share.fs.set_owner(path, 1000, 1000).unwrap_err().is_unsupported());
    }
    assert_eq!(share.store.write_count(), 0);
}

// ============================================================================
// Audit
// ============================================================================

#[tokio::test]
async fn test_every_call_is_audited() {
    let share = TestShare::for_user("carol");
    share.store.insert_file("/f.txt", "f");

    share.fs.stat("/f.txt").await.unwrap();
    share.fs.list_dir("/").await.unwrap();
    let _ = share.fs.open_read("/f.txt").await.unwrap();
    let _ = share.fs.open_write("/g.txt", true);
    share.fs.mkdir("/d").await.unwrap();
    share.fs.rename("/f.txt", "/h.txt").await.unwrap();
    let _ = share.fs.set_owner("/h.txt", 1, 1);

    let ops = share.audit.operations();
    assert_eq!(
        ops,
        vec![
            FsOperation::Stat { path: "/f.txt".into() },
            FsOperation::ListDir { path: "/".into() },
            FsOperation::OpenRead { path: "/f.txt".into() },
            FsOperation::OpenWrite {
                path: "/g.txt".into(),
                create: true
            },
            FsOperation::Mkdir { path: "/d".into() },
            FsOperation::Rename {
                from: "/f.txt".into(),
                to: "/h.txt".into()
            },
            FsOperation::SetOwner {
                path: "/h.txt".into(),
                uid: 1,
                gid: 1
            },
        ]
    );
    assert!(share.audit.users().iter().all(|u| u == "carol"));
}

#[tokio::test]
async fn test_create_is_audited_as_create_and_open() {
    let share = TestShare::new();
    let _handle = share.fs.create("/new.txt").await.unwrap();
    assert_eq!(
        share.audit.operations(),
        vec![
            FsOperation::Create {
                path: "/new.txt".into()
            },
            FsOperation::OpenFile {
                path: "/new.txt".into(),
                flags: "rdwr|create|trunc".into()
            },
        ]
    );
}
