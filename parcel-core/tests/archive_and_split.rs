use parcel_core::chunking::splitter::part_name;
use parcel_core::codec::CompressionLevel;
use parcel_core::{ArchiveMode, Archiver, Artifact, Splitter, split};
use std::fs::{self, File};
use std::io::Read;
use tempfile::tempdir;
use zip::ZipArchive;

fn sample(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}

#[test]
fn compressed_artifact_holds_one_named_entry() {
    let src_dir = tempdir().unwrap();
    let scratch = tempdir().unwrap();
    let source = src_dir.path().join("notes.txt");
    let body = b"hello hello hello hello hello".repeat(40);
    fs::write(&source, &body).unwrap();

    let art = Archiver::new(CompressionLevel::Default, None)
        .build(&source, scratch.path())
        .unwrap();
    assert_eq!(art.mode, ArchiveMode::Compressed);
    assert_eq!(art.path, scratch.path().join("notes.txt.zip"));
    assert_eq!(art.size, fs::metadata(&art.path).unwrap().len());
    assert!(art.size < body.len() as u64);

    let mut zip = ZipArchive::new(File::open(&art.path).unwrap()).unwrap();
    assert_eq!(zip.len(), 1);
    let mut entry = zip.by_name("notes.txt").unwrap();
    assert_eq!(entry.compression(), zip::CompressionMethod::Deflated);
    let mut out = Vec::new();
    entry.read_to_end(&mut out).unwrap();
    assert_eq!(out, body);
}

#[test]
fn store_level_keeps_bytes_uncompressed() {
    let src_dir = tempdir().unwrap();
    let scratch = tempdir().unwrap();
    let source = src_dir.path().join("data.bin");
    fs::write(&source, sample(4096)).unwrap();

    let art = Archiver::new(CompressionLevel::Store, None)
        .build(&source, scratch.path())
        .unwrap();
    let mut zip = ZipArchive::new(File::open(&art.path).unwrap()).unwrap();
    let entry = zip.by_name("data.bin").unwrap();
    assert_eq!(entry.compression(), zip::CompressionMethod::Stored);
    assert_eq!(entry.size(), 4096);
}

#[test]
fn encrypted_entry_needs_the_password() {
    let src_dir = tempdir().unwrap();
    let scratch = tempdir().unwrap();
    let source = src_dir.path().join("secret.txt");
    fs::write(&source, b"top secret").unwrap();

    let art = Archiver::new(CompressionLevel::Default, Some("s3cret".into()))
        .build(&source, scratch.path())
        .unwrap();
    assert!(art.is_encrypted());

    let mut zip = ZipArchive::new(File::open(&art.path).unwrap()).unwrap();
    assert!(zip.by_name("secret.txt").is_err());
    assert!(zip.by_name_decrypt("secret.txt", b"wrong").is_err());

    let mut entry = zip.by_name_decrypt("secret.txt", b"s3cret").unwrap();
    let mut out = String::new();
    entry.read_to_string(&mut out).unwrap();
    assert_eq!(out, "top secret");
}

#[test]
fn existing_zip_passes_through_untouched() {
    let src_dir = tempdir().unwrap();
    let scratch = tempdir().unwrap();
    let source = src_dir.path().join("bundle.zip");
    fs::write(&source, b"PK\x05\x06 pretend").unwrap();

    let art = Archiver::new(CompressionLevel::Default, None)
        .build(&source, scratch.path())
        .unwrap();
    assert_eq!(art.mode, ArchiveMode::Passthrough);
    assert_eq!(art.path, source);
    assert_eq!(fs::read_dir(scratch.path()).unwrap().count(), 0);
}

#[test]
fn parts_concatenate_back_to_the_artifact() {
    let dir = tempdir().unwrap();
    let out = tempdir().unwrap();
    let artifact = dir.path().join("movie.mkv.zip");
    let body = sample(60 * 1024);
    fs::write(&artifact, &body).unwrap();

    let parts = split(&artifact, 45 * 1024, out.path()).unwrap();
    assert_eq!(
        parts,
        [
            out.path().join("movie.mkv.zip.001"),
            out.path().join("movie.mkv.zip.002")
        ]
    );
    assert_eq!(fs::metadata(&parts[0]).unwrap().len(), 45 * 1024);
    assert_eq!(fs::metadata(&parts[1]).unwrap().len(), 15 * 1024);

    let joined: Vec<u8> = parts.iter().flat_map(|p| fs::read(p).unwrap()).collect();
    assert_eq!(joined, body);
}

#[test]
fn splitter_knows_total_before_the_first_part() {
    let dir = tempdir().unwrap();
    let out = tempdir().unwrap();
    let artifact = dir.path().join("x.bin");
    fs::write(&artifact, sample(91)).unwrap();

    let mut s = Splitter::open(&artifact, 45, out.path()).unwrap();
    assert_eq!(s.total(), 3);
    assert_eq!(s.artifact_size(), 91);

    let first = s.next_part().unwrap().unwrap();
    assert_eq!((first.index, first.total, first.range.clone()), (1, 3, 0..45));
    // Parts are written lazily.
    assert!(!out.path().join(part_name("x.bin", 2, 3)).exists());

    let rest: Vec<_> = s.map(|p| p.unwrap()).collect();
    assert_eq!(rest.len(), 2);
    assert!(rest[1].is_last());
    assert_eq!(rest[1].len(), 1);
}

#[test]
fn exact_multiple_has_no_empty_tail() {
    let dir = tempdir().unwrap();
    let out = tempdir().unwrap();
    let artifact = dir.path().join("even.bin");
    fs::write(&artifact, sample(90)).unwrap();
    assert_eq!(split(&artifact, 45, out.path()).unwrap().len(), 2);
}

#[test]
fn artifact_file_name_is_the_basename() {
    let art = Artifact {
        path: "/tmp/scratch/a.pdf.zip".into(),
        mode: ArchiveMode::Compressed,
        size: 1,
    };
    assert_eq!(art.file_name(), "a.pdf.zip");
    assert!(!art.is_encrypted());
}

#[test]
fn thousand_parts_glob_back_in_order() {
    let dir = tempdir().unwrap();
    let out = tempdir().unwrap();
    let artifact = dir.path().join("many.bin");
    let body = sample(1001);
    fs::write(&artifact, &body).unwrap();

    let parts = split(&artifact, 1, out.path()).unwrap();
    assert_eq!(parts.len(), 1001);
    assert_eq!(parts[0], out.path().join("many.bin.0001"));
    assert_eq!(parts[1000], out.path().join("many.bin.1001"));

    // What `cat many.bin.*` would see.
    let mut globbed: Vec<_> = fs::read_dir(out.path())
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    globbed.sort();
    let joined: Vec<u8> = globbed.iter().flat_map(|p| fs::read(p).unwrap()).collect();
    assert_eq!(joined, body);
}
