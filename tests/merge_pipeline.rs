// End-to-end merge from local (partly gzipped) files, no network

use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use lab_utils::{local_sources, parse_fasta, run_merge, MergeConfig};

fn write_gz(path: &Path, text: &str) {
    let mut encoder = GzEncoder::new(fs::File::create(path).unwrap(), Compression::default());
    encoder.write_all(text.as_bytes()).unwrap();
    encoder.finish().unwrap();
}

fn fixture(dir: &Path) -> [PathBuf; 3] {
    let reference = dir.join("UP1_9606.fasta.gz");
    let additional = dir.join("additional.fasta");
    let isoforms = dir.join("UP1_9606_additional.fasta.gz");

    write_gz(
        &reference,
        ">tr|Q9|TR1_HUMAN Uncharacterized OS=Homo sapiens OX=9606 PE=4 SV=1\nMKV\n\
         >sp|P1|ALPHA_HUMAN Alpha OS=Homo sapiens OX=9606 GN=A PE=1 SV=2\n\
         MKTAYIAKQRQISFVKSHFSRQLEERLGLIEVQAPILSRVGDGTQDNLSGAEKAVQVKVKALPDAQFEVV\nHVVKAEE\n",
    );
    fs::write(
        &additional,
        ">sp|P7|IGK_HUMAN Immunoglobulin kappa OS=Homo sapiens OX=9606 PE=1 SV=1\nEIVLTQSPGT\n\
         >tr|Q5|DUB_HUMAN Dubious OS=Homo sapiens OX=9606 PE=5 SV=1\nMAAAA\n",
    )
    .unwrap();
    write_gz(
        &isoforms,
        ">sp|P1-2|ALPHA_HUMAN Isoform 2 of Alpha OS=Homo sapiens OX=9606 GN=A\nMKTAYIAK\n\
         >sp|P1|ALPHA_HUMAN Alpha OS=Homo sapiens OX=9606 GN=A PE=1 SV=2\nMKT\n",
    );

    [reference, additional, isoforms]
}

fn headers(path: &Path) -> Vec<String> {
    let records = parse_fasta(std::io::BufReader::new(fs::File::open(path).unwrap())).unwrap();
    records.into_iter().map(|r| r.header).collect()
}

#[test]
fn test_merge_local_sources() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("merged.fasta");
    let sources = local_sources(&fixture(dir.path()));

    let stats = run_merge(&sources, &MergeConfig::default(), &out).unwrap();
    assert_eq!(stats.input, 6);
    assert_eq!(stats.duplicates_dropped, 1);
    assert_eq!(stats.output, 5);

    let ids: Vec<String> = headers(&out)
        .iter()
        .map(|h| h.split('|').nth(1).unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["P1", "Q9", "P7", "Q5", "P1-2"]);

    // 77 residues wrap to 60 + 17
    let text = fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[1].len(), 60);
    assert_eq!(lines[2].len(), 17);
    assert!(!text.contains("\n\n"));
}

#[test]
fn test_merge_drop_dubious() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("merged.fasta");
    let sources = local_sources(&fixture(dir.path()));
    let config = MergeConfig { drop_dubious: true, ..MergeConfig::default() };

    let stats = run_merge(&sources, &config, &out).unwrap();
    assert_eq!(stats.dubious_dropped, 1);
    assert!(headers(&out).iter().all(|h| !h.contains("PE=5")));
}

#[test]
fn test_merge_is_repeatable() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("a.fasta");
    let second = dir.path().join("b.fasta");
    let paths = fixture(dir.path());

    run_merge(&local_sources(&paths), &MergeConfig::default(), &first).unwrap();
    run_merge(&local_sources(&paths), &MergeConfig::default(), &second).unwrap();
    assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
}

#[test]
fn test_merge_missing_source_fails() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("merged.fasta");
    let mut paths = fixture(dir.path());
    paths[1] = dir.path().join("nope.fasta");

    assert!(run_merge(&local_sources(&paths), &MergeConfig::default(), &out).is_err());
    assert!(!out.exists());
}

#[test]
fn test_merge_keeps_good_records_around_bad_ones() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("merged.fasta");
    let reference = dir.path().join("reference.fasta");
    let additional = dir.path().join("additional.fasta");
    let isoforms = dir.path().join("isoforms.fasta");

    fs::write(&reference, ">sp|P1|A PE=1 \nMKT\n>sp|P2|B PE=1 \nMK TAY\n>sp|P3|C PE=1 \n").unwrap();
    fs::write(&additional, "").unwrap();
    fs::write(&isoforms, ">sp|P1-2|A Isoform 2\nMKTA\n").unwrap();

    let sources = local_sources(&[reference, additional, isoforms]);
    let stats = run_merge(&sources, &MergeConfig::default(), &out).unwrap();
    assert_eq!(stats.input, 4);
    assert_eq!(stats.invalid_dropped, 1);

    let text = fs::read_to_string(&out).unwrap();
    assert_eq!(
        text,
        ">sp|P2|B PE=1\nMKTAY\n>sp|P1|A PE=1\nMKT\n>sp|P1-2|A Isoform 2\nMKTA\n"
    );
}
