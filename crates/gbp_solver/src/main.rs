//! Entry point: parse a config and a scenario choice, converge, then print
//! the result.

pub mod cli;
pub mod config;
pub mod scenarios;

use cli::{Cli, Scenario};
use config::Config;
use gbp_factorgraph::graph::FactorGraph;

const NAME: &str = env!("CARGO_PKG_NAME");
const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() -> anyhow::Result<()> {
    let cli: Cli = cli::parse_arguments();
    pretty_env_logger::formatted_builder()
        .filter_level(cli.verbosity().as_log_level_filter())
        .init();
    log::info!("{NAME} v{VERSION} starting");

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    let gbp_config = config.gbp.into();
    let mut graph: FactorGraph = match cli.scenario {
        Scenario::TwoVariable => scenarios::two_variable(gbp_config),
        Scenario::ThreeVariableChain => scenarios::three_variable_chain(gbp_config),
        Scenario::UnaryPose => scenarios::unary_pose(gbp_config),
    };

    scenarios::converge(&mut graph, config.run.iterations);

    for variable in graph.variables() {
        println!("{}: mu = {:?}", variable.id, variable.mu);
    }

    if cli.joint {
        let joint = graph.joint_distribution_inf()?;
        println!("joint information vector = {:?}", joint.information_vector());
        println!("joint precision matrix =\n{:?}", joint.precision_matrix());
    }

    Ok(())
}
