//! gclust : greedy clustering of sequences, or search of queries in references, with minhash candidates
//! verified by fastANI.
//!
//! gclust -i input.fa -o prefix \[-r references.fa\] \[options\]
//!
//! - without -r : the sequences of input are clustered. Sequences are processed by decreasing length,
//!   each one not yet clustered becomes a representative and gathers its accepted friends.
//! - with -r : references are indexed and each sequence of input is a query searched among them.
//!
//! Options :
//!
//! --sketch [-n] number of hash values kept in each sketch (default 20)
//! --kmer k-mer size, at most 31 (default 21)
//! --seed [-s] seed of hash function (default 0)
//! --subseq length of subsequences sketched separately, 0 sketches whole sequences (default 10000)
//! --half-steps subsequences overlap by half their length
//! --lookat number of smallest hash values of a sketch used for friendship (default sketch size)
//! --minfriends [-m] number of shared hash values needed to be friends (default 1)
//! --identity [-p] minimum adjusted percent identity to accept a pair (default 90)
//! --tolerate [-t] an alignment missing one fragment is not penalized
//! --fastani path to fastANI program (default fastANI)
//! --keep-partial on interruption, dump results completed so far
//!
//! Outputs are {prefix}.bynumber.json, {prefix}.byname.json and {prefix}.parameters.json.

use std::path::Path;

use clap::{Arg, ArgAction, ArgMatches, Command};

// for logging (debug mostly, switched by RUST_LOG)
use env_logger::{Builder, Env};

use gclust::cancel::{install_interrupt_handler, CancelFlag};
use gclust::cluster::LinClusterer;
use gclust::errors::GclustError;
use gclust::oracle::{FastAni, FASTANI};
use gclust::search::Searcher;
use gclust::utils::files::{read_fasta, scratch_base};
use gclust::utils::parameters::*;

// install a logger facility, info by default
fn init_log() -> u64 {
    Builder::from_env(Env::default().default_filter_or("info")).init();
    println!("\n ************** initializing logger *****************\n");
    1
}

#[doc(hidden)]
fn parse_params(matches: &ArgMatches) -> Result<ClustParams, anyhow::Error> {
    let sketch_size = *matches.get_one::<usize>("sketch_size").unwrap_or(&20);
    let kmer_size = *matches.get_one::<usize>("kmer_size").unwrap_or(&21);
    let seed = *matches.get_one::<u64>("seed").unwrap_or(&0);
    let subseq_len = *matches.get_one::<usize>("subseq").unwrap_or(&DEFAULT_SUBSEQ_LEN);
    let half_steps = matches.get_flag("half_steps");
    let look_at = matches.get_one::<usize>("look_at").copied().unwrap_or(sketch_size);
    let min_friends = *matches.get_one::<usize>("min_friends").unwrap_or(&1);
    let min_identity = *matches.get_one::<f64>("identity").unwrap_or(&90.);
    let tolerate = matches.get_flag("tolerate");
    let keep_partial = matches.get_flag("keep_partial");
    //
    let params = ClustParams::new(
        SketchParams::new(kmer_size, sketch_size, seed, subseq_len, half_steps),
        IndexParams::new(look_at, min_friends),
        AcceptParams::new(min_identity, tolerate),
        keep_partial,
    );
    params.check()?;
    log::info!("parameters : {:?}", params);
    Ok(params)
} // end of parse_params

/// clusters sequences of input, dumping clusters
fn run_cluster(
    input: &Path,
    prefix: &str,
    params: &ClustParams,
    oracle: &FastAni,
    cancel: CancelFlag,
) -> Result<(), GclustError> {
    let seqdict = read_fasta(input)?;
    let mut clusterer = LinClusterer::new(&seqdict, params, oracle, cancel)?;
    let res = clusterer.cluster_in(&scratch_base());
    //
    let names = seqdict.get_names();
    match res {
        Ok(()) => {
            let (bynumber, byname) = clusterer.get_clusters().dump(prefix, &names)?;
            log::info!("clusters dumped in {:?} and {:?}", bynumber, byname);
            Ok(())
        }
        Err(GclustError::Interrupted) if params.get_keep_partial() => {
            let nb_done = clusterer.get_clusters().len();
            log::warn!("interrupted, dumping {} completed clusters", nb_done);
            clusterer.get_clusters().dump(prefix, &names)?;
            Err(GclustError::Interrupted)
        }
        Err(e) => Err(e),
    }
} // end of run_cluster

/// searches sequences of input among references, dumping matches
fn run_search(
    input: &Path,
    references: &Path,
    prefix: &str,
    params: &ClustParams,
    oracle: &FastAni,
    cancel: CancelFlag,
) -> Result<(), GclustError> {
    let refdict = read_fasta(references)?;
    let mut searcher = Searcher::new(&refdict, params, oracle, cancel)?;
    let res = searcher.search_file_in(&scratch_base(), input);
    //
    let rnames = refdict.get_names();
    match res {
        Ok(()) => {
            let qnames = searcher.get_query_names();
            let (bynumber, byname) = searcher.get_matches().dump(prefix, qnames, &rnames)?;
            log::info!("matches dumped in {:?} and {:?}", bynumber, byname);
            Ok(())
        }
        Err(GclustError::Interrupted) if params.get_keep_partial() => {
            let nb_done = searcher.get_query_names().len();
            log::warn!("interrupted, dumping matches of {} completed queries", nb_done);
            searcher.get_matches().dump(prefix, searcher.get_query_names(), &rnames)?;
            Err(GclustError::Interrupted)
        }
        Err(e) => Err(e),
    }
} // end of run_search

//============================================================================================

fn main() -> Result<(), anyhow::Error> {
    let _ = init_log();
    //
    let matches = Command::new("gclust")
        .version("0.1.0")
        .about("Greedy linear clustering and reference search of genomes, verified by fastANI")
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .value_name("FILE")
                .help("fasta file of sequences to cluster, or of queries when references are given")
                .required(true)
                .value_parser(clap::value_parser!(String)),
        )
        .arg(
            Arg::new("references")
                .short('r')
                .long("ref")
                .value_name("FILE")
                .help("fasta file of references, switches to search mode")
                .required(false)
                .value_parser(clap::value_parser!(String)),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("PREFIX")
                .help("prefix of output files")
                .required(true)
                .value_parser(clap::value_parser!(String)),
        )
        .arg(
            Arg::new("sketch_size")
                .short('n')
                .long("sketch")
                .value_name("SKETCH_SIZE")
                .help("number of hash values kept by sketch")
                .default_value("20")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("kmer_size")
                .long("kmer")
                .value_name("KMER_SIZE")
                .help("k-mer size, at most 31")
                .default_value("21")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("seed")
                .short('s')
                .long("seed")
                .value_name("SEED")
                .help("seed of hash function")
                .default_value("0")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("subseq")
                .long("subseq")
                .value_name("LEN")
                .help("length of subsequences sketched separately, 0 for whole sequences")
                .default_value("10000")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("half_steps")
                .long("half-steps")
                .help("subsequences overlap by half their length")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("look_at")
                .long("lookat")
                .value_name("K")
                .help("number of smallest hash values used for friendship, defaults to sketch size")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("min_friends")
                .short('m')
                .long("minfriends")
                .value_name("NB")
                .help("number of shared hash values needed to be friends")
                .default_value("1")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("identity")
                .short('p')
                .long("identity")
                .value_name("PERCENT")
                .help("minimum adjusted percent identity")
                .default_value("90")
                .value_parser(clap::value_parser!(f64)),
        )
        .arg(
            Arg::new("tolerate")
                .short('t')
                .long("tolerate")
                .help("do not penalize an alignment missing one fragment")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("fastani")
                .long("fastani")
                .value_name("PROGRAM")
                .help("path to fastANI")
                .default_value(FASTANI)
                .value_parser(clap::value_parser!(String)),
        )
        .arg(
            Arg::new("keep_partial")
                .long("keep-partial")
                .help("on interruption, dump results completed so far")
                .action(ArgAction::SetTrue),
        )
        .get_matches();
    //
    let params = parse_params(&matches)?;
    let input = matches.get_one::<String>("input").unwrap();
    let prefix = matches.get_one::<String>("output").unwrap();
    let program = matches.get_one::<String>("fastani").unwrap();
    //
    let oracle = FastAni::new(Path::new(program));
    oracle.check()?;
    let paramsfile = params.dump_json(prefix)?;
    log::info!("parameters dumped in {:?}", paramsfile);
    //
    let cancel = CancelFlag::new();
    let _guard = install_interrupt_handler(&cancel)?;
    let res = match matches.get_one::<String>("references") {
        Some(references) => {
            log::info!("search mode, queries {}, references {}", input, references);
            run_search(Path::new(input), Path::new(references), prefix, &params, &oracle, cancel)
        }
        None => {
            log::info!("clustering mode, input {}", input);
            run_cluster(Path::new(input), prefix, &params, &oracle, cancel)
        }
    };
    if let Err(e) = &res {
        if e.is_interrupted() {
            log::error!("run interrupted, restart needed");
        } else {
            log::error!("run failed : {}", e);
        }
    }
    Ok(res?)
} // end of main
