//! Command-line argument parser, mirroring the teacher's `cli.rs` shape
//! (`#[derive(Parser)]`, a `--config` path, a verbosity counter) without the
//! simulation/environment-dumping flags that only make sense in an app with
//! a running scene to dump.

use clap::Parser;

/// Which canonical scenario to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Scenario {
    /// Two 1-D variables joined by a single affine difference factor.
    TwoVariable,
    /// Three 1-D variables joined by two affine difference factors.
    ThreeVariableChain,
    /// A single 6-dof pose variable with a unit prior at the origin.
    UnaryPose,
}

impl std::fmt::Display for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::TwoVariable => "two-variable",
            Self::ThreeVariableChain => "three-variable-chain",
            Self::UnaryPose => "unary-pose",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Parser)]
#[clap(version, author, about)]
pub struct Cli {
    /// Path to a TOML configuration file; defaults are used if omitted.
    #[arg(short, long, value_name = "CONFIG_FILE")]
    pub config: Option<std::path::PathBuf>,

    /// Which canonical scenario to run.
    #[arg(short, long, value_enum, default_value_t = Scenario::TwoVariable)]
    pub scenario: Scenario,

    /// Print the joint distribution's precision and information after
    /// converging, instead of just the per-variable means.
    #[arg(long)]
    pub joint: bool,

    /// Increases logging verbosity each use, up to 3 times.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Verbosity level derived from repeated `-v` flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    #[default]
    None,
    Normal,
    Very,
    Ultra,
}

impl Cli {
    #[must_use]
    pub const fn verbosity(&self) -> Verbosity {
        match self.verbose {
            0 => Verbosity::None,
            1 => Verbosity::Normal,
            2 => Verbosity::Very,
            _ => Verbosity::Ultra,
        }
    }
}

impl Verbosity {
    #[must_use]
    pub const fn as_log_level_filter(self) -> log::LevelFilter {
        match self {
            Verbosity::None => log::LevelFilter::Warn,
            Verbosity::Normal => log::LevelFilter::Info,
            Verbosity::Very => log::LevelFilter::Debug,
            Verbosity::Ultra => log::LevelFilter::Trace,
        }
    }
}

/// Parse arguments from `std::env::args`.
#[must_use]
pub fn parse_arguments() -> Cli {
    Cli::parse()
}
