//! Synthetic candidate files for exercising lookup without real data.

use std::collections::HashSet;
use std::fs;

use cnpj_core::cnpj::check_digits;
use cnpj_io::{write_candidates, IoError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::GenerateConfig;
use crate::error::PipelineError;
use crate::model::GenerateReport;

/// Distinct 8-digit roots.
pub const ROOT_SPACE: u64 = 100_000_000;

/// Largest accepted request. Roots are drawn by rejection, which slows down
/// sharply as the request nears `ROOT_SPACE`.
pub const MAX_GENERATED: usize = 10_000_000;

const BRANCH: &str = "0001";

/// `count` valid 14-digit identifiers with pairwise distinct roots.
///
/// The same seed always yields the same list in the same order.
pub fn generate_identifiers(count: usize, seed: Option<u64>) -> Result<Vec<String>, PipelineError> {
    if count > MAX_GENERATED {
        return Err(PipelineError::Generate(format!(
            "cannot generate {count} identifiers (limit {MAX_GENERATED})"
        )));
    }

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut seen = HashSet::with_capacity(count);
    let mut ids = Vec::with_capacity(count);
    while ids.len() < count {
        let root = rng.gen_range(0..ROOT_SPACE);
        if !seen.insert(root) {
            continue;
        }
        let base = format!("{root:08}{BRANCH}");
        let Some([first, second]) = check_digits(&base) else {
            return Err(PipelineError::Generate(format!("bad identifier base {base}")));
        };
        ids.push(format!("{base}{first}{second}"));
    }
    Ok(ids)
}

/// Write a candidate file as configured.
pub fn run_generate(config: &GenerateConfig) -> Result<GenerateReport, PipelineError> {
    config.validate()?;

    let ids = generate_identifiers(config.count, config.seed)?;
    if let Some(parent) = config.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| IoError::from_io(parent, e))?;
    }
    write_candidates(&config.output, &config.column, &ids)?;
    log::info!("wrote {} identifiers to {}", ids.len(), config.output.display());

    Ok(GenerateReport {
        output: config.output.clone(),
        count: ids.len(),
        seed: config.seed,
    })
}
