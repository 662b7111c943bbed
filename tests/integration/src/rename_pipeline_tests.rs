//! Batch rename over realistic card-dump trees

use pretty_assertions::assert_eq;

use dirsync_fs::Renamer;
use dirsync_test_utils::{ImageTree, cr3_bytes, jpeg_bytes};

#[tokio::test(flavor = "multi_thread")]
async fn test_mixed_tree_corrected_in_one_pass() {
    let tree = ImageTree::new();

    // A typical dump: raws miswrapped as .jpg, honest files, a .jpeg
    // spelling, and bytes nothing recognizes.
    tree.write_cr3("100CANON/IMG_0001.jpg");
    tree.write_cr3("100CANON/IMG_0002.cr3");
    tree.write_jpeg("100CANON/IMG_0003.jpg");
    tree.write_jpeg("101CANON/IMG_0004.jpeg");
    tree.write("101CANON/IMG_0005.jpg", b"not an image at all");
    tree.write("notes.txt", b"ignore me");

    let stats = Renamer::default().process_tree(tree.root()).await.unwrap();

    // notes.txt is not a candidate and never counts
    assert_eq!(stats.processed, 5);
    assert_eq!(stats.renamed, 2);
    assert_eq!(stats.conflicts, 0);
    assert_eq!(stats.failed, 0);

    assert!(tree.root().join("100CANON/IMG_0001.cr3").is_file());
    assert!(!tree.root().join("100CANON/IMG_0001.jpg").exists());
    assert!(tree.root().join("100CANON/IMG_0002.cr3").is_file());
    assert!(tree.root().join("100CANON/IMG_0003.jpg").is_file());
    assert!(tree.root().join("101CANON/IMG_0004.jpg").is_file());
    // Unrecognized content keeps whatever name it had
    assert!(tree.root().join("101CANON/IMG_0005.jpg").is_file());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_conflicting_target_preserves_both_files() {
    let tree = ImageTree::new();
    let wrong = tree.write_cr3("IMG_0001.jpg");
    let taken = tree.write("IMG_0001.cr3", b"pre-existing different file");

    let stats = Renamer::default().process_tree(tree.root()).await.unwrap();

    assert_eq!(stats.conflicts, 1);
    assert_eq!(stats.renamed, 0);
    assert!(wrong.is_file());
    assert_eq!(
        std::fs::read(&taken).unwrap(),
        b"pre-existing different file"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rename_keeps_modification_time() {
    let tree = ImageTree::new();
    let wrong = tree.write_cr3("IMG_0001.jpg");

    let stamp = filetime::FileTime::from_unix_time(1_500_000_000, 0);
    filetime::set_file_mtime(&wrong, stamp).unwrap();

    let stats = Renamer::default().process_tree(tree.root()).await.unwrap();
    assert_eq!(stats.renamed, 1);

    let renamed = tree.root().join("IMG_0001.cr3");
    let meta = std::fs::metadata(&renamed).unwrap();
    assert_eq!(filetime::FileTime::from_last_modification_time(&meta), stamp);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_second_pass_is_a_no_op() {
    let tree = ImageTree::new();
    tree.write_cr3("IMG_0001.jpg");
    tree.write_jpeg("IMG_0002.jpeg");

    let renamer = Renamer::default();
    let first = renamer.process_tree(tree.root()).await.unwrap();
    assert_eq!(first.renamed, 2);

    let second = renamer.process_tree(tree.root()).await.unwrap();
    assert_eq!(second.renamed, 0);
    assert_eq!(second.conflicts, 0);
    assert_eq!(second.failed, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_missing_root_is_an_error() {
    let tree = ImageTree::new();
    let gone = tree.root().join("does-not-exist");
    assert!(Renamer::default().process_tree(&gone).await.is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fixture_headers_are_what_they_claim() {
    // Guard the shared fixtures themselves; everything above depends on
    // these byte patterns being right.
    let cr3 = cr3_bytes();
    assert_eq!(&cr3[4..12], b"ftypcrx ");
    let jpeg = jpeg_bytes();
    assert_eq!(&jpeg[..3], &[0xFF, 0xD8, 0xFF]);
}
