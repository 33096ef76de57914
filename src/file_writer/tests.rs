use std::fs;
use std::path::PathBuf;

use pretty_assertions::assert_eq;
use tempfile::tempdir;

use crate::file_writer::{
    file_safe_name, AssetWriter, AvatarAsset, WriteError, WriteMode, WriteOutcome, WriteSummary,
};

#[test]
fn creates_missing_directories() {
    let root = tempdir().unwrap();
    let mut writer = AssetWriter::new(root.path(), WriteMode::Overwrite);

    let outcome = writer
        .write(AvatarAsset::new("Alex/frames/Mii_Alex_face_normal_01.png", vec![1, 2, 3]))
        .unwrap();

    let expected = root.path().join("Alex/frames/Mii_Alex_face_normal_01.png");
    assert_eq!(outcome, WriteOutcome::Created(expected.clone()));
    assert_eq!(fs::read(expected).unwrap(), vec![1, 2, 3]);
}

#[test]
fn identical_rerun_leaves_file_untouched() {
    let root = tempdir().unwrap();
    AssetWriter::new(root.path(), WriteMode::Overwrite)
        .write(AvatarAsset::new("roblox_1_avatar.png", vec![9; 16]))
        .unwrap();

    let mut rerun = AssetWriter::new(root.path(), WriteMode::Overwrite);
    let outcome = rerun.write(AvatarAsset::new("roblox_1_avatar.png", vec![9; 16])).unwrap();

    assert_eq!(outcome, WriteOutcome::Unchanged(root.path().join("roblox_1_avatar.png")));
    assert_eq!(rerun.summary(), WriteSummary { created: 0, replaced: 0, unchanged: 1 });
}

#[test]
fn changed_contents_replace_the_file_completely() {
    let root = tempdir().unwrap();
    let path = root.path().join("roblox_1_avatar.png");
    fs::write(&path, vec![7; 64]).unwrap();

    let mut writer = AssetWriter::new(root.path(), WriteMode::Overwrite);
    let outcome = writer.write(AvatarAsset::new("roblox_1_avatar.png", vec![1, 2])).unwrap();

    assert_eq!(outcome, WriteOutcome::Replaced(path.clone()));
    assert_eq!(fs::read(&path).unwrap(), vec![1, 2]);
    assert_eq!(fs::read_dir(root.path()).unwrap().count(), 1, "no temporary file left behind");
}

#[test]
fn keep_history_writes_next_free_suffix() {
    let root = tempdir().unwrap();
    fs::write(root.path().join("avatar.png"), b"first").unwrap();
    fs::write(root.path().join("avatar_2.png"), b"second").unwrap();

    let mut writer = AssetWriter::new(root.path(), WriteMode::KeepHistory);
    let outcome = writer.write(AvatarAsset::new("avatar.png", b"third".to_vec())).unwrap();

    assert_eq!(outcome, WriteOutcome::Created(root.path().join("avatar_3.png")));
    assert_eq!(fs::read(root.path().join("avatar.png")).unwrap(), b"first");
    assert_eq!(fs::read(root.path().join("avatar_3.png")).unwrap(), b"third");
}

#[test]
fn keep_history_recognises_an_older_identical_copy() {
    let root = tempdir().unwrap();
    fs::write(root.path().join("avatar.png"), b"first").unwrap();
    fs::write(root.path().join("avatar_2.png"), b"second").unwrap();

    let mut writer = AssetWriter::new(root.path(), WriteMode::KeepHistory);
    let outcome = writer.write(AvatarAsset::new("avatar.png", b"second".to_vec())).unwrap();

    assert_eq!(outcome, WriteOutcome::Unchanged(root.path().join("avatar_2.png")));
    assert_eq!(fs::read_dir(root.path()).unwrap().count(), 2);
}

#[test]
fn same_asset_cannot_be_written_twice_in_one_run() {
    let root = tempdir().unwrap();
    let mut writer = AssetWriter::new(root.path(), WriteMode::Overwrite);
    writer.write(AvatarAsset::new("a.png", vec![1])).unwrap();

    let err = writer.write(AvatarAsset::new("a.png", vec![2])).unwrap_err();

    match err {
        WriteError::AlreadyWritten(path) => assert_eq!(path, PathBuf::from("a.png")),
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(writer.outcomes().len(), 1);
    assert_eq!(fs::read(root.path().join("a.png")).unwrap(), vec![1]);
}

#[test]
fn paths_leaving_the_root_are_refused() {
    let root = tempdir().unwrap();
    let elsewhere = tempdir().unwrap();
    let mut writer = AssetWriter::new(root.path().join("out"), WriteMode::Overwrite);

    let escaping = [
        elsewhere.path().join("Mii_face_normal.png"),
        PathBuf::from("../Mii_face_normal.png"),
        PathBuf::from("Alex/../../Mii_face_normal.png"),
        PathBuf::from("./Mii_face_normal.png"),
        PathBuf::from(""),
    ];

    for path in escaping {
        let err = writer.write(AvatarAsset::new(path.clone(), vec![1])).unwrap_err();
        match err {
            WriteError::OutsideRoot(refused) => assert_eq!(refused, path),
            other => panic!("unexpected error {other:?}"),
        }
    }

    assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
    assert_eq!(fs::read_dir(elsewhere.path()).unwrap().count(), 0);
    assert!(writer.outcomes().is_empty());
}

#[test]
fn failed_replace_removes_temporary_file() {
    let root = tempdir().unwrap();
    // A non-empty directory where the image should go makes the rename fail.
    let blocker = root.path().join("roblox_1_avatar.png");
    fs::create_dir(&blocker).unwrap();
    fs::write(blocker.join("keep"), b"x").unwrap();

    let mut writer = AssetWriter::new(root.path(), WriteMode::Overwrite);
    let err = writer
        .write(AvatarAsset::new("roblox_1_avatar.png", vec![1, 2, 3]))
        .unwrap_err();

    assert!(matches!(err, WriteError::Io(_)), "{err:?}");
    assert!(!root.path().join("roblox_1_avatar.png.part").exists());
    assert!(blocker.join("keep").exists());
}

#[test]
fn progress_counts_against_planned_assets() {
    let root = tempdir().unwrap();
    let mut writer = AssetWriter::new(root.path(), WriteMode::Overwrite);
    assert_eq!(writer.progress(), (0, 0));

    writer.plan(2);
    writer.write(AvatarAsset::new("a.png", vec![1])).unwrap();
    assert_eq!(writer.progress(), (1, 2));

    writer.plan(1);
    writer.write(AvatarAsset::new("b.png", vec![2])).unwrap();
    writer.write(AvatarAsset::new("c.png", vec![3])).unwrap();
    assert_eq!(writer.progress(), (3, 3));

    // Unannounced writes never show more done than planned.
    writer.write(AvatarAsset::new("d.png", vec![4])).unwrap();
    assert_eq!(writer.progress(), (4, 4));
}

#[test]
fn file_safe_names_keep_only_plain_characters() {
    assert_eq!(file_safe_name("Alex_1-b"), "Alex_1-b");
    assert_eq!(file_safe_name("../tmp/Alex"), "---tmp-Alex");
    assert_eq!(file_safe_name("Zoë Mii"), "Zo--Mii");
    assert_eq!(file_safe_name(""), "");
}
