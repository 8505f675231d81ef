//! ---
//! zmq_section: "05-external-interfaces"
//! zmq_subsection: "binary"
//! zmq_type: "source"
//! zmq_scope: "code"
//! zmq_description: "Command line entry point for one-shot publishing."
//! zmq_version: "v0.1.0"
//! zmq_owner: "tbd"
//! ---
use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::{ArgAction, Parser};
use zmqpipe_common::PipeConfig;
use zmqpipe_logging as logging;
use zmqpipe_msg::{InMemoryPublisher, PipeError, SendReport, Session, SettleDelay};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Publish stdin as a single message on a ZeroMQ PUB socket",
    long_about = None,
    after_help = "The publish flags also accept a single dash: -addr, -topic, -decodehex, -fakeseqnum."
)]
struct Cli {
    /// Bind address, host:port
    #[arg(long, value_name = "HOST:PORT")]
    addr: Option<String>,
    /// Topic sent as the first frame
    #[arg(long)]
    topic: Option<String>,
    /// Decode hex input to raw bytes [default: true]
    #[arg(long, value_name = "BOOL", num_args = 0..=1, default_missing_value = "true")]
    decodehex: Option<bool>,
    /// Append a constant zero sequence-number frame
    #[arg(long, value_name = "BOOL", num_args = 0..=1, default_missing_value = "true")]
    fakeseqnum: Option<bool>,
    /// Fail on malformed hex instead of sending the input literally
    #[arg(long)]
    strict_hex: bool,
    /// Wait this long after bind before sending
    #[arg(long, value_name = "MS")]
    settle_ms: Option<u64>,
    /// TOML configuration file (also read from ZMQPIPE_CONFIG)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Print the frames instead of binding a socket
    #[arg(long)]
    dry_run: bool,
    /// Increase diagnostic output on stderr (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    /// Flags given on the command line win over the configuration file.
    fn apply(&self, config: &mut PipeConfig) {
        if let Some(addr) = &self.addr {
            config.publish.addr = addr.clone();
        }
        if let Some(topic) = &self.topic {
            config.publish.topic = topic.clone();
        }
        if let Some(decode_hex) = self.decodehex {
            config.publish.decode_hex = decode_hex;
        }
        if let Some(fake_seq_num) = self.fakeseqnum {
            config.publish.fake_seq_num = fake_seq_num;
        }
        if self.strict_hex {
            config.publish.strict_hex = true;
        }
        if let Some(settle_ms) = self.settle_ms {
            config.timing.settle = Duration::from_millis(settle_ms);
        }
    }

    fn log_directive<'a>(&self, configured: &'a str) -> &'a str {
        match self.verbose {
            0 => configured,
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Long flags that older scripts pass with one dash, e.g. `-addr 127.0.0.1:5555`.
const SINGLE_DASH_FLAGS: [&str; 4] = ["addr", "topic", "decodehex", "fakeseqnum"];

fn is_single_dash_flag(arg: &str) -> bool {
    let Some(rest) = arg.strip_prefix('-') else {
        return false;
    };
    if rest.starts_with('-') {
        return false;
    }
    let name = rest.split_once('=').map_or(rest, |(name, _)| name);
    SINGLE_DASH_FLAGS.contains(&name)
}

/// Rewrite `-addr`-style flags to their `--addr` form. Nothing after `--` is touched.
fn normalize_args(args: impl IntoIterator<Item = OsString>) -> Vec<OsString> {
    let mut positional = false;
    args.into_iter()
        .map(|arg| {
            if positional {
                return arg;
            }
            if arg == "--" {
                positional = true;
                return arg;
            }
            if arg.to_str().is_some_and(is_single_dash_flag) {
                let mut flag = OsString::from("-");
                flag.push(&arg);
                return flag;
            }
            arg
        })
        .collect()
}

fn main() -> ExitCode {
    let cli = Cli::parse_from(normalize_args(std::env::args_os()));
    match run(&cli) {
        Ok(code) => code,
        Err(err) => {
            println!("Error config: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let loaded = PipeConfig::load(cli.config.as_deref())?;
    let mut config = loaded.config;
    cli.apply(&mut config);
    logging::init_with(config.logging.format, cli.log_directive(&config.logging.level));
    if let Some(source) = &loaded.source {
        logging::pipe_debug!("configuration loaded from {}", source.display());
    }

    if let Err(err) = config.validate() {
        println!("Usage: zmqpipe --addr HOST:PORT --topic TOPIC");
        report_failure(&PipeError::from(err));
        return Ok(ExitCode::FAILURE);
    }

    let mut session = Session::new(&config);
    let stdin = io::stdin().lock();
    let result = if cli.dry_run {
        println!("Binding to {} (dry run)", config.publish.addr);
        dry_run(&mut session, stdin)
    } else {
        println!("Binding to {}", config.publish.addr);
        session.run(stdin)
    };

    match result {
        Ok(report) => {
            println!(
                "Sent {} bytes on {}.",
                report.payload_bytes, config.publish.topic
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            report_failure(&err);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn dry_run(session: &mut Session<'_>, input: impl io::Read) -> zmqpipe_msg::Result<SendReport> {
    let publisher = InMemoryPublisher::new();
    let handle = publisher.handle();
    let report = session.run_with(publisher, &SettleDelay::new(Duration::ZERO), input)?;
    for (index, frame) in handle.frames().iter().enumerate() {
        println!(
            "frame {index}: {} bytes{} {}",
            frame.bytes.len(),
            if frame.more { " +more" } else { "" },
            hex::encode(&frame.bytes)
        );
    }
    Ok(report)
}

fn report_failure(err: &PipeError) {
    println!("Error {}: {}", err.stage(), err);
}
