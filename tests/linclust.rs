//! end to end runs of clustering and search with an oracle computing identity from sequence files

use std::fs;
use std::path::{Path, PathBuf};

use gclust::answer::Clusters;
use gclust::cancel::CancelFlag;
use gclust::cluster::linclust;
use gclust::errors::GclustError;
use gclust::oracle::{AniOracle, AniRecord};
use gclust::search::Searcher;
use gclust::utils::files::{read_fasta, ScratchDir};
use gclust::utils::parameters::{AcceptParams, ClustParams, IndexParams, SketchParams};

/// Identity is the percentage of equal residues over the query length, aligned at the position
/// where the query is found in the reference. Pairs where the query is not a substring up to mismatches
/// are absent, as with fastANI.
struct ScanOracle;

fn read_residues(path: &Path) -> Vec<u8> {
    let txt = fs::read_to_string(path).unwrap();
    txt.lines().filter(|l| !l.starts_with('>')).flat_map(|l| l.bytes()).collect()
}

fn best_identity(query: &[u8], reference: &[u8]) -> Option<f64> {
    if query.len() > reference.len() {
        return None;
    }
    let best = (0..=reference.len() - query.len())
        .map(|start| query.iter().zip(&reference[start..]).filter(|(a, b)| a == b).count())
        .max()?;
    let identity = 100. * best as f64 / query.len() as f64;
    if identity < 80. {
        None
    } else {
        Some(identity)
    }
}

impl AniOracle for ScanOracle {
    fn compare(&self, queries: &[PathBuf], refs: &[PathBuf]) -> Result<Vec<AniRecord>, GclustError> {
        let mut records = Vec::new();
        for q in queries {
            let qseq = read_residues(q);
            for r in refs {
                if let Some(identity) = best_identity(&qseq, &read_residues(r)) {
                    records.push(AniRecord {
                        query: q.display().to_string(),
                        reference: r.display().to_string(),
                        identity,
                        aligned: 1,
                        total: 1,
                    });
                }
            }
        }
        Ok(records)
    }
}

fn random_seq(len: usize, seed: u64) -> Vec<u8> {
    let mut state = seed;
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            b"ACGT"[(state >> 62) as usize]
        })
        .collect()
}

// one mismatch every step residues
fn mutate(seq: &[u8], step: usize) -> Vec<u8> {
    seq.iter()
        .enumerate()
        .map(|(i, &c)| if i % step == step / 2 { if c == b'A' { b'C' } else { b'A' } } else { c })
        .collect()
}

fn write_fasta(path: &Path, records: &[(&str, &[u8])]) {
    let mut txt = String::new();
    for (name, seq) in records {
        txt.push_str(&format!(">{}\n{}\n", name, String::from_utf8_lossy(seq)));
    }
    fs::write(path, txt).unwrap();
}

fn params() -> ClustParams {
    ClustParams::new(SketchParams::new(15, 500, 0, 0, false), IndexParams::new(500, 1), AcceptParams::new(95., false), false)
}

#[test]
fn cluster_fasta_file() {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = tempfile::tempdir().unwrap();
    let genome_a = random_seq(400, 11);
    let genome_b = random_seq(400, 12);
    // a fragment of a with 1% mismatches, a copy of b with 10% mismatches
    let frag_a = mutate(&genome_a[50..350], 100);
    let far_b = mutate(&genome_b, 10);
    let fasta = dir.path().join("input.fa");
    write_fasta(&fasta, &[("frag_a", &frag_a[..]), ("a", &genome_a[..]), ("far_b", &far_b[..]), ("b", &genome_b[..])]);
    //
    let seqdict = read_fasta(&fasta).unwrap();
    let clusters: Clusters = linclust(&seqdict, &params(), ScanOracle, CancelFlag::new()).unwrap();
    // representatives come by decreasing length, ties in file order
    assert_eq!(clusters.by_number(), vec![vec![1, 0], vec![2], vec![3]]);
    assert_eq!(
        clusters.by_name(&seqdict.get_names()),
        vec![vec!["a".to_string(), "frag_a".to_string()], vec!["far_b".to_string()], vec!["b".to_string()]]
    );
    //
    let prefix = dir.path().join("out");
    let (bynumber, byname) = clusters.dump(prefix.to_str().unwrap(), &seqdict.get_names()).unwrap();
    let reloaded: Vec<Vec<usize>> = serde_json::from_str(&fs::read_to_string(bynumber).unwrap()).unwrap();
    assert_eq!(reloaded, clusters.by_number());
    let names: Vec<Vec<String>> = serde_json::from_str(&fs::read_to_string(byname).unwrap()).unwrap();
    assert_eq!(names[0], vec!["a".to_string(), "frag_a".to_string()]);
}

#[test]
fn search_queries_file() {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = tempfile::tempdir().unwrap();
    let genome_a = random_seq(400, 21);
    let genome_b = random_seq(400, 22);
    let refs = dir.path().join("refs.fa");
    write_fasta(&refs, &[("a", &genome_a[..]), ("b", &genome_b[..]), ("a_mid", &genome_a[150..350])]);
    let queries = dir.path().join("queries.fa");
    let unrelated = random_seq(300, 23);
    write_fasta(&queries, &[("qa", &genome_a[100..400]), ("none", &unrelated[..])]);
    //
    let refdict = read_fasta(&refs).unwrap();
    let scratch = ScratchDir::new_in(dir.path()).unwrap();
    let mut searcher = Searcher::new(&refdict, &params(), ScanOracle, CancelFlag::new()).unwrap();
    searcher.stage(&scratch).unwrap();
    searcher.search_file(&queries, &scratch).unwrap();
    scratch.close();
    //
    let matches = searcher.get_matches();
    assert_eq!(matches.len(), 1);
    // a_mid is shorter than qa and is aligned onto it, a contains qa
    let matched = matches.get(0).unwrap();
    assert_eq!(matched.keys().copied().collect::<Vec<usize>>(), vec![0, 2]);
    assert!(matched.values().all(|&s| s == 100.));
    let byname = matches.by_name(searcher.get_query_names(), &refdict.get_names());
    assert!(byname["qa"].contains_key("a_mid"));
    assert!(!byname.contains_key("none"));
}
