use std::io::{Read, Write};

use rustc_hash::FxHashSet;

use crate::decode::stream_records;
use crate::error::Result;
use crate::sink::{DigestAlgorithm, DigestWriter, LineSink};

/// How plan relevance participates in location selection.
///
/// The original job computed plan relevance per record but never consulted
/// it before filtering file locations, so the path marker alone decided the
/// output. Both readings are supported; `Advisory` is the faithful default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanGating {
    /// Plan relevance feeds run statistics only; every record's file list
    /// goes through the location filter.
    Advisory,
    /// Only records with at least one relevant plan contribute locations.
    Enforced,
}

/// Plan-name relevance rule.
///
/// A plan name is relevant if, case-insensitively, it contains a region
/// token (the two-letter code or the full region name) and the plan-type
/// token, both in the same name. Matching is plain substring containment:
/// a name like "Sunny PPO" satisfies the "NY" code token.
#[derive(Debug, Clone)]
pub struct PlanRule {
    region_code: String,
    region_name: String,
    plan_type: String,
}

impl PlanRule {
    /// Tokens are lowercased once here so the per-plan check only lowers
    /// the plan name.
    pub fn new(region_code: &str, region_name: &str, plan_type: &str) -> Self {
        PlanRule {
            region_code: region_code.to_lowercase(),
            region_name: region_name.to_lowercase(),
            plan_type: plan_type.to_lowercase(),
        }
    }

    pub fn matches(&self, plan_name: &str) -> bool {
        let name = plan_name.to_lowercase();
        (name.contains(&self.region_code) || name.contains(&self.region_name))
            && name.contains(&self.plan_type)
    }
}

impl Default for PlanRule {
    /// The original job's rule: New York PPO plans.
    fn default() -> Self {
        PlanRule::new("NY", "New York", "PPO")
    }
}

/// Location path rule: raw, case-sensitive substring containment.
///
/// No path normalization and no URL parsing; the marker is matched against
/// the location string exactly as it appears in the index.
#[derive(Debug, Clone)]
pub struct LocationRule {
    marker: String,
}

impl LocationRule {
    pub fn new(marker: &str) -> Self {
        LocationRule {
            marker: marker.to_string(),
        }
    }

    pub fn matches(&self, location: &str) -> bool {
        location.contains(&self.marker)
    }
}

impl Default for LocationRule {
    /// The original job's marker: Anthem's New York directory segment.
    fn default() -> Self {
        LocationRule::new("anthem/NY")
    }
}

/// Counters reported after a run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FilterSummary {
    /// Records traversed in the reporting array.
    pub records: u64,
    /// Records with at least one relevant plan.
    pub relevant_records: u64,
    /// Unique locations written to the output.
    pub locations_written: u64,
    /// Hex checksum of the output, when requested.
    pub digest: Option<String>,
}

/// Stream an index document and write matching file locations, one per line.
///
/// This is the whole pipeline on one sequential path: decode a record,
/// evaluate its plans, filter its file locations by `location_rule`,
/// deduplicate on the raw location string and append first-seen matches to
/// `output`. The dedupe set lives for exactly this call, so repeated runs
/// in one process are independent.
///
/// Output order is first-encounter order from the traversal; nothing is
/// sorted. With a digest algorithm supplied, the returned summary carries a
/// hex checksum of the emitted bytes.
pub fn filter_index_streaming<R: Read, W: Write>(
    input: R,
    output: &mut W,
    plan_rule: &PlanRule,
    location_rule: &LocationRule,
    gating: PlanGating,
    digest_algorithm: Option<DigestAlgorithm>,
) -> Result<FilterSummary> {
    match digest_algorithm {
        Some(algorithm) => {
            // Wrap the output writer to compute the digest as lines stream through.
            let mut digest_writer = DigestWriter::new(output, algorithm);
            let mut summary =
                run_filter(input, &mut digest_writer, plan_rule, location_rule, gating)?;
            summary.digest = Some(digest_writer.finalize());
            Ok(summary)
        }
        None => run_filter(input, output, plan_rule, location_rule, gating),
    }
}

fn run_filter<R: Read, W: Write>(
    input: R,
    output: &mut W,
    plan_rule: &PlanRule,
    location_rule: &LocationRule,
    gating: PlanGating,
) -> Result<FilterSummary> {
    let mut sink = LineSink::new(output);
    let mut seen: FxHashSet<String> = FxHashSet::default();
    let mut relevant_records = 0u64;
    let mut locations_written = 0u64;

    let records = stream_records(input, |record| {
        let relevant = record
            .reporting_plans
            .iter()
            .any(|plan| plan_rule.matches(&plan.plan_name));
        if relevant {
            relevant_records += 1;
        }
        if gating == PlanGating::Enforced && !relevant {
            return Ok(());
        }

        for file in &record.in_network_files {
            if !location_rule.matches(&file.location) {
                continue;
            }
            if seen.contains(&file.location) {
                continue;
            }
            seen.insert(file.location.clone());
            sink.write_line(&file.location)?;
            locations_written += 1;
        }

        Ok(())
    })?;

    sink.finish()?;

    Ok(FilterSummary {
        records,
        relevant_records,
        locations_written,
        digest: None,
    })
}
