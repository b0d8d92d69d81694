//! Seminal command-line tool.

use anyhow::{anyhow, Result};
use log::debug;
use seminal::passes::seeds;
use seminal::trace::{InputRoutines, LedgerScope, StorePolicy, TraceConfig, Tracer};
use seminal::Module;
use std::path::{Path, PathBuf};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "seminal-util", about = "Seminal origin-tracing utility.")]
struct Options {
    #[structopt(short, long)]
    debug: bool,

    #[structopt(subcommand)]
    command: Command,
}

#[derive(Debug, StructOpt)]
enum Command {
    #[structopt(name = "print-ir", about = "Parse text IR and print it back")]
    PrintIR {
        #[structopt(help = "IR file to parse")]
        ir: PathBuf,
    },
    #[structopt(name = "seeds", about = "List the values that would be traced")]
    Seeds {
        #[structopt(help = "IR file to parse")]
        ir: PathBuf,
        #[structopt(flatten)]
        routines: RoutineOptions,
    },
    #[structopt(name = "trace", about = "Trace every seed back to its origins")]
    Trace {
        #[structopt(help = "IR file to parse")]
        ir: PathBuf,
        #[structopt(
            long,
            default_value = "per-seed",
            help = "Ledger lifetime: per-seed or per-module"
        )]
        scope: LedgerScope,
        #[structopt(
            long,
            default_value = "terminal",
            help = "Store handling: terminal or follow-source"
        )]
        store_policy: StorePolicy,
        #[structopt(long, help = "Do not scan the users of storage origins")]
        no_forward_scan: bool,
        #[structopt(long, help = "Only trace seeds in this function")]
        function: Option<String>,
        #[structopt(flatten)]
        routines: RoutineOptions,
    },
}

#[derive(Debug, StructOpt)]
struct RoutineOptions {
    #[structopt(
        long = "input-routine",
        number_of_values = 1,
        help = "Additional function name to treat as an input routine"
    )]
    input_routines: Vec<String>,
    #[structopt(long, help = "Do not use the built-in list of input routines")]
    no_default_routines: bool,
}

impl RoutineOptions {
    fn routines(&self) -> InputRoutines {
        let mut routines = if self.no_default_routines {
            InputRoutines::none()
        } else {
            InputRoutines::default()
        };
        for name in &self.input_routines {
            routines.add_exact(name);
        }
        routines
    }
}

fn load(path: &Path) -> Result<Module> {
    let text = std::fs::read_to_string(path)?;
    debug!("Loaded {} bytes of IR text", text.len());
    Module::from_text(&text).map_err(|e| anyhow!("{}: {:#}", path.display(), e))
}

fn main() -> Result<()> {
    let opts = Options::from_args();

    let mut logger = env_logger::Builder::from_default_env();
    if opts.debug {
        logger.filter_level(log::LevelFilter::Debug);
    }
    let _ = logger.try_init();

    match opts.command {
        Command::PrintIR { ir } => {
            let module = load(&ir)?;
            print!("{}", module.display());
        }
        Command::Seeds { ir, routines } => {
            let module = load(&ir)?;
            let config = TraceConfig {
                input_routines: routines.routines(),
                ..TraceConfig::default()
            };
            for seed in seeds::collect(&module, &config) {
                println!("{}", seed.display(&module));
            }
        }
        Command::Trace {
            ir,
            scope,
            store_policy,
            no_forward_scan,
            function,
            routines,
        } => {
            let module = load(&ir)?;
            let config = TraceConfig {
                scope,
                store_policy,
                forward_scan: !no_forward_scan,
                input_routines: routines.routines(),
            };
            let filter = match &function {
                Some(name) => Some(
                    module
                        .func_by_name(name)
                        .ok_or_else(|| anyhow!("no function named @{}", name))?,
                ),
                None => None,
            };
            debug!("trace config: {:?}", config);

            let graph = module.graph();
            let mut tracer = Tracer::new(&graph, &config);
            for seed in seeds::collect_in(&graph, &config) {
                if filter.map_or(false, |func| func != seed.site) {
                    continue;
                }
                let result = tracer.trace(seed.node);
                println!("seed {}", seed.display(&module));
                print!("{}", result.display(&graph));
            }
        }
    }

    Ok(())
}
