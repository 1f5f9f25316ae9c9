extern crate session_clustering;

use rand::prelude::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use session_clustering::{ClusteringConfig, Coordinator, Page};
use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::sync::mpsc;
use std::time::{Duration, Instant};

const PAGES: usize = 150;
const TOPICS: [&[&str]; 4] = [
    &["rust", "borrow", "trait", "cargo", "lifetime", "crate"],
    &["pasta", "sauce", "basil", "oven", "recipe", "garlic"],
    &["chess", "opening", "endgame", "gambit", "rook", "tactics"],
    &["hiking", "trail", "summit", "boots", "map", "weather"],
];

fn tokens(page: &Page) -> HashSet<&str> {
    page.title
        .as_deref()
        .unwrap_or_default()
        .split_whitespace()
        .collect()
}

/// Jaccard overlap of title words.
fn token_overlap(page: &Page, existing: &[Page]) -> Vec<f64> {
    let own = tokens(page);
    existing
        .iter()
        .map(|other| {
            let other = tokens(other);
            let union = own.union(&other).count();
            if union == 0 {
                0.0
            } else {
                own.intersection(&other).count() as f64 / union as f64
            }
        })
        .collect()
}

fn generate_session(rng: &mut StdRng) -> Vec<(usize, Page)> {
    let mut pages: Vec<(usize, Page)> = Vec::with_capacity(PAGES);
    for id in 0..PAGES {
        let topic = rng.gen_range(0..TOPICS.len());
        let words: Vec<&str> = TOPICS[topic]
            .choose_multiple(rng, 3)
            .copied()
            .collect();
        let mut page = Page::new(id as u64).with_title(words.join(" "));

        let same_topic: Vec<u64> = pages
            .iter()
            .filter(|(t, _)| *t == topic)
            .map(|(_, p)| p.id)
            .collect();
        if rng.gen_bool(0.7) {
            if let Some(&parent) = same_topic.choose(rng) {
                page = page.with_parent(parent);
            }
        }
        pages.push((topic, page));
    }
    pages
}

fn main() -> io::Result<()> {
    env_logger::init();

    let mut rng = StdRng::seed_from_u64(2021);
    let session = generate_session(&mut rng);
    let config = ClusteringConfig {
        seed: Some(7),
        ..ClusteringConfig::default()
    };
    let coordinator = Coordinator::new(config, token_overlap)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

    let mut out_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open("out-session-clustering.tsv")?;
    writeln!(out_file, "Pages\tGroups\tLargestGroup\tAddTime(ms)")?;

    let mut slowest = Duration::ZERO;
    for (count, (_, page)) in session.into_iter().enumerate() {
        let (sender, receiver) = mpsc::channel();
        let now = Instant::now();
        coordinator
            .add(page, move |result| {
                let _ = sender.send(result);
            })
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let groups = match receiver.recv() {
            Ok(Ok(groups)) => groups,
            Ok(Err(e)) => {
                log::error!("add failed: {e}");
                continue;
            }
            Err(e) => return Err(io::Error::new(io::ErrorKind::BrokenPipe, e)),
        };
        let add_time = now.elapsed();
        slowest = slowest.max(add_time);

        writeln!(
            out_file,
            "{}\t{}\t{}\t{:.3}",
            count + 1,
            groups.len(),
            groups.iter().map(Vec::len).max().unwrap_or(0),
            add_time.as_secs_f64() * 1000.0
        )?;
    }

    let (sender, receiver) = mpsc::channel();
    coordinator
        .snapshot(move |result| {
            let _ = sender.send(result);
        })
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    if let Ok(Ok(snapshot)) = receiver.recv() {
        for (label, group) in snapshot.groups().iter().enumerate() {
            println!("group {label}: {} pages", group.len());
        }
    }
    println!("slowest add: {slowest:?}");
    coordinator.shutdown();
    Ok(())
}
