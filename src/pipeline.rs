use log::{info, warn};

use crate::client::Transport;
use crate::error::PipelineError;
use crate::investor::ParsedContext;
use crate::portfolio::{allocate_positions, choose_allocation, Position};

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Positions were computed but not sent.
    DryRun(Vec<Position>),
    Submitted {
        positions: Vec<Position>,
        response: String,
    },
}

/// Turn a parsed brief into the positions to submit.
pub fn plan(parsed: &ParsedContext) -> Vec<Position> {
    let horizon = parsed.horizon_months();
    let recipe = choose_allocation(parsed.budget, horizon, parsed.age);
    info!(
        "Using {:?} weights on budget ${} (horizon {:?} months, age {:?})",
        recipe.branch, recipe.budget, horizon, parsed.age
    );
    allocate_positions(recipe.budget, &recipe.weights, &recipe.buckets)
}

fn format_positions(positions: &[Position]) -> String {
    let parts: Vec<String> = positions.iter().map(|p| p.to_string()).collect();
    format!("[{}]", parts.join(", "))
}

/// One pass: team info, fetch brief, parse, allocate, then submit unless `dry_run`.
///
/// A failed `/info` is only logged. Anything else that fails ends the run.
pub async fn run<T: Transport + ?Sized>(transport: &T, dry_run: bool) -> Result<Outcome, PipelineError> {
    match transport.get_my_current_information().await {
        Ok(info) => println!("Team information: {}", info),
        Err(e) => warn!("Could not fetch team information: {}", e),
    }

    let context = transport
        .get_context()
        .await
        .map_err(PipelineError::Fetch)?;
    println!("Context provided: {}", context);

    let parsed = ParsedContext::from_context(&context)?;
    let positions = plan(&parsed);
    println!("Proposed positions: {}", format_positions(&positions));

    if dry_run {
        println!("DRY RUN: not submitting.");
        return Ok(Outcome::DryRun(positions));
    }

    let response = transport
        .send_portfolio(&positions)
        .await
        .map_err(PipelineError::Submit)?;
    println!("Evaluation response: {}", response);

    Ok(Outcome::Submitted {
        positions,
        response,
    })
}
