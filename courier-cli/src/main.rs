//! The `courier` binary.
//!
//! Three modes, picked from the command line:
//! - no mode flag: assemble a message from the free arguments and write
//!   it to the local output file
//! - `--connect ADDR`: dispatch the message to the agent at ADDR, which
//!   writes it on its own filesystem
//! - `--serve`: run an agent that executes write jobs for controllers

use std::error::Error;
use std::io;
use std::process;

use log::info;

use courier_core::config::Config;
use courier_core::io::assemble_message;
use courier_core::{ExecutionContext, LocalContext, Payload};
use courier_net::{AgentServer, RemoteContext};

fn init_logging(verbose: bool) {
    use simplelog::{ColorChoice, Config as LogConfig, LevelFilter, TermLogger, TerminalMode};

    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };

    TermLogger::init(level, LogConfig::default(), TerminalMode::Stderr, ColorChoice::Auto)
        .expect("Failed to initialize logger");
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let verbose = args.iter().any(|a| a == "--verbose" || a == "-v");
    init_logging(verbose);

    let config = Config::load();

    let serve_mode = args.iter().any(|a| a == "--serve");
    let connect_addr = flag_value(&args, "--connect");
    let listen_addr = flag_value(&args, "--listen");
    let agent_name = flag_value(&args, "--name");
    let target_path = flag_value(&args, "--path");
    let tokens = message_tokens(&args);

    let result: Result<(), Box<dyn Error>> = if serve_mode {
        run_serve(&config, listen_addr.as_deref(), agent_name.as_deref()).map_err(Into::into)
    } else if let Some(addr) = connect_addr {
        run_dispatch(&config, &addr, target_path.as_deref(), &tokens).map_err(Into::into)
    } else {
        run_local(&config, target_path.as_deref(), &tokens).map_err(Into::into)
    };

    if let Err(e) = result {
        eprintln!("courier: {}", e);
        process::exit(1);
    }
}

/// Write the assembled message in this process.
fn run_local(
    config: &Config,
    path: Option<&str>,
    tokens: &[String],
) -> Result<(), courier_core::DispatchError> {
    let target = match path {
        Some(p) => p,
        None => config.local_file(),
    };
    let payload = Payload::new(assemble_message(tokens), target);

    let delivery = LocalContext.dispatch(&payload)?;
    info!("Wrote {}", delivery.path);
    Ok(())
}

/// Ship the assembled message to a remote agent.
fn run_dispatch(
    config: &Config,
    addr: &str,
    path: Option<&str>,
    tokens: &[String],
) -> Result<(), courier_core::DispatchError> {
    let target = match path {
        Some(p) => p,
        None => config.remote_file(),
    };
    let payload = Payload::new(assemble_message(tokens), target);

    info!("Message: {:?}", payload.message());
    info!("Target file: {}", payload.target_path());

    let mut ctx = RemoteContext::connect(addr, "courier-cli")?;
    let delivery = ctx.dispatch(&payload)?;
    info!("Agent '{}' wrote {}", ctx.name(), delivery.path);

    let _ = ctx.disconnect();
    Ok(())
}

/// Run an agent until the process is killed.
fn run_serve(config: &Config, listen: Option<&str>, name: Option<&str>) -> io::Result<()> {
    let addr = match listen {
        Some(a) => a,
        None => config.listen_addr(),
    };
    let name = match name {
        Some(n) => n,
        None => config.agent_name(),
    };

    let mut agent = AgentServer::bind(addr, name)?;
    agent.run();
    Ok(())
}

/// Value following `flag`, if present.
fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1).cloned())
}

/// Arguments that are neither flags nor flag values: these form the
/// message.
fn message_tokens(args: &[String]) -> Vec<String> {
    const VALUE_FLAGS: [&str; 4] = ["--connect", "--listen", "--name", "--path"];

    let mut tokens = Vec::new();
    let mut skip_next = false;
    for arg in args {
        if skip_next {
            skip_next = false;
            continue;
        }
        if VALUE_FLAGS.contains(&arg.as_str()) {
            skip_next = true;
            continue;
        }
        if arg.starts_with('-') {
            continue;
        }
        tokens.push(arg.clone());
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn flag_value_returns_following_argument() {
        let a = args(&["--connect", "10.0.0.5:7171", "hello"]);
        assert_eq!(flag_value(&a, "--connect").as_deref(), Some("10.0.0.5:7171"));
        assert_eq!(flag_value(&a, "--listen"), None);
    }

    #[test]
    fn flag_value_at_end_without_operand_is_none() {
        let a = args(&["hello", "--path"]);
        assert_eq!(flag_value(&a, "--path"), None);
    }

    #[test]
    fn message_tokens_skip_flags_and_their_values() {
        let a = args(&["--connect", "10.0.0.5:7171", "hello", "world", "-v"]);
        assert_eq!(message_tokens(&a), args(&["hello", "world"]));
    }

    #[test]
    fn message_tokens_empty_when_only_flags() {
        let a = args(&["--serve", "--listen", "0.0.0.0:7171"]);
        assert!(message_tokens(&a).is_empty());
    }

    #[test]
    fn local_run_writes_assembled_message() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("writeToFile.out");
        let config = Config::load();

        run_local(
            &config,
            Some(out.to_str().unwrap()),
            &args(&["hello", "world"]),
        )
        .unwrap();

        assert_eq!(std::fs::read_to_string(&out).unwrap(), "hello world \n");
    }

    #[test]
    fn local_run_without_tokens_writes_default_message() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("writeToFile.out");
        let config = Config::load();

        run_local(&config, Some(out.to_str().unwrap()), &[]).unwrap();

        assert_eq!(std::fs::read_to_string(&out).unwrap(), "Default message\n");
    }
}
