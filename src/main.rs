use std::fs;
use std::io::Write;
use std::process;

use anyhow::Result;
use chrono::Local;
use clap::Parser;

use pingsim::session::{ExecuteRequest, Session};

#[derive(Debug, Parser)]
#[clap(
    name = "pingsim",
    version = "0.1.0",
    about = "A ping diagnostic with simulated probing and iteration sessions."
)]
struct Opt {
    #[clap(
        long = "definition",
        help = "print the capability descriptor and exit",
        conflicts_with = "execute"
    )]
    definition: bool,

    #[clap(
        long = "execute",
        value_name = "JSON",
        help = "run one diagnostic call with the given JSON parameter object"
    )]
    execute: Option<String>,

    #[clap(
        long = "file",
        default_value = "plugin.json",
        help = "path of the capability descriptor file"
    )]
    file: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] {}",
                Local::now().format("%H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .init();

    let opt = Opt::parse();

    if opt.definition {
        // The descriptor is externally authored configuration, printed as-is.
        let definition = fs::read_to_string(&opt.file)?;
        print!("{}", definition);
        return Ok(());
    }

    let Some(params_json) = opt.execute else {
        eprintln!("Usage: pingsim --definition | --execute='{{\"host\": ...}}'");
        process::exit(1);
    };

    let params = match serde_json::from_str(&params_json) {
        Ok(params) => params,
        Err(e) => fail(&format!("invalid parameter JSON: {}", e)),
    };

    let request = match ExecuteRequest::from_value(&params) {
        Ok(request) => request,
        Err(e) => fail(&e.to_string()),
    };

    let mut session = Session::simulated();
    match session.execute(&request) {
        Ok(response) => {
            println!("{}", serde_json::to_string(&response)?);
            Ok(())
        }
        Err(e) => fail(&e.to_string()),
    }
}

/// Print the `{error}` JSON shape and exit non-zero.
fn fail(message: &str) -> ! {
    println!("{}", serde_json::json!({ "error": message }));
    process::exit(1);
}
