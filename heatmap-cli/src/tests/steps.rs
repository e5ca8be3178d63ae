//! Behaviour-driven step definitions driving the heatmap CLI scenarios.

use super::helpers::{Workspace, approx_eq};
use super::*;
use heatmap_scorer::MetricError;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use serde_json::Value;
use std::cell::RefCell;

/// Scenario state: a scratch database plus the outcome of the last command.
#[derive(Debug)]
struct CliWorld {
    workspace: Workspace,
    outcome: RefCell<Option<Result<String, CliError>>>,
}

impl CliWorld {
    fn new() -> Self {
        Self {
            workspace: Workspace::new(),
            outcome: RefCell::new(None),
        }
    }

    fn run(&self, command: &str, args: &[&str]) {
        let outcome = self.workspace.invoke(command, args);
        self.outcome.replace(Some(outcome));
    }

    fn report(&self) -> Value {
        let borrowed = self.outcome.borrow();
        let output = borrowed
            .as_ref()
            .expect("command recorded")
            .as_ref()
            .unwrap_or_else(|err| panic!("expected success, found {err}"));
        serde_json::from_str(output).expect("command prints JSON")
    }

    fn error_matches(&self, predicate: impl Fn(&CliError) -> bool) -> bool {
        self.outcome
            .borrow()
            .as_ref()
            .and_then(|outcome| outcome.as_ref().err())
            .is_some_and(predicate)
    }
}

#[fixture]
fn world() -> CliWorld {
    CliWorld::new()
}

#[given("a fresh workspace")]
fn fresh_workspace(#[from(world)] world: &CliWorld) {
    assert!(!world.workspace.database().as_std_path().exists());
}

#[given("the location {location} with the business {business}")]
fn location_with_business(#[from(world)] world: &CliWorld, location: String, business: String) {
    world.workspace.seed(&location, &[business.as_str()]);
}

#[when("I initialise the database under {relative}")]
fn initialise_under(#[from(world)] world: &CliWorld, relative: String) {
    let target = world.workspace.path(&relative);
    let outcome = Cli::try_parse_from(["heatmap", "init", "--database", target.as_str()])
        .map_err(CliError::ArgumentParsing)
        .and_then(|cli| {
            let mut output = Vec::new();
            run_with(cli, &mut output)?;
            Ok(String::from_utf8(output).expect("utf-8 output"))
        });
    world.outcome.replace(Some(outcome));
}

#[when("I record a {interaction} on the business {business}")]
fn record_on_business(#[from(world)] world: &CliWorld, interaction: String, business: String) {
    world.run(
        "record",
        &[
            "--entity-type",
            "Business",
            "--id",
            &business,
            "--kind",
            &interaction,
        ],
    );
}

#[when("I review the business {business} with {stars} stars")]
fn review_business(#[from(world)] world: &CliWorld, business: String, stars: String) {
    world.run(
        "review",
        &[
            "--entity-type",
            "Business",
            "--id",
            &business,
            "--rating",
            &stars,
        ],
    );
}

#[when("I list popular locations")]
fn list_popular(#[from(world)] world: &CliWorld) {
    world.run("popular", &[]);
}

#[then("the database file exists under {relative}")]
fn database_exists(#[from(world)] world: &CliWorld, relative: String) {
    let target = world.workspace.path(&relative);
    assert!(target.as_std_path().is_file(), "expected {target} to exist");
    assert_eq!(world.report()["database"], target.as_str());
}

#[then("the business {business} has activity {activity}")]
fn business_activity(#[from(world)] world: &CliWorld, business: String, activity: f64) {
    let report = world.report();
    assert_eq!(report["entity"]["entity_id"], business.as_str());
    assert!(
        approx_eq(&report["entity"]["activity_count"], activity),
        "unexpected activity in {report}"
    );
}

#[then("the business {business} has heatmap score {score}")]
fn business_score(#[from(world)] world: &CliWorld, business: String, score: u64) {
    let report = world.report();
    assert_eq!(report["entity"]["entity_id"], business.as_str());
    assert_eq!(report["entity"]["heatmap_score"].as_u64(), Some(score));
}

#[then("the credited location {location} has activity {activity}")]
fn parent_activity(#[from(world)] world: &CliWorld, location: String, activity: f64) {
    let report = world.report();
    assert_eq!(report["parent"]["entity_id"], location.as_str());
    assert!(
        approx_eq(&report["parent"]["activity_count"], activity),
        "unexpected parent activity in {report}"
    );
}

#[then("the command fails with an unknown interaction")]
fn fails_unknown_interaction(#[from(world)] world: &CliWorld) {
    assert!(world.error_matches(|err| matches!(
        err,
        CliError::Metric(MetricError::InvalidInteractionKind(_))
    )));
}

#[then("the command fails because the database is missing")]
fn fails_missing_database(#[from(world)] world: &CliWorld) {
    assert!(world.error_matches(|err| matches!(err, CliError::MissingDatabase { .. })));
}

#[then("the ranking starts with {location}")]
fn ranking_starts_with(#[from(world)] world: &CliWorld, location: String) {
    let report = world.report();
    let ranked = report.as_array().expect("ranking is an array");
    let first = ranked.first().expect("ranking is not empty");
    assert_eq!(first["entity_id"], location.as_str());
}

macro_rules! register_cli_scenario {
    ($fn_name:ident, $scenario_title:literal) => {
        #[scenario(path = "tests/features/cli.feature", name = $scenario_title)]
        fn $fn_name(#[from(world)] world: CliWorld) {
            let _ = world;
        }
    };
}

register_cli_scenario!(initialising_database, "initialising a database in a new directory");
register_cli_scenario!(share_credits_location, "a business share credits its location");
register_cli_scenario!(first_five_star_review, "a first five star review");
register_cli_scenario!(unknown_interaction, "rejecting an unknown interaction");
register_cli_scenario!(missing_database, "commands need an initialised database");
register_cli_scenario!(popular_locations, "listing popular locations");
