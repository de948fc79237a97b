//! Main entry point for kmodctl
use anyhow::{anyhow, Context};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use regex::Regex;
use std::io::{BufRead, IsTerminal, Write};
use std::sync::Arc;
use std::time::Duration;

use kmodctl::cli::args::{Cli, ModuleCommand};
use kmodctl::cli::shell::{parse_line, ShellCommand, SHELL_HELP};
use kmodctl::kernel::controller::InventoryController;
use kmodctl::kernel::lifecycle::Action;
use kmodctl::kernel::{ModuleRecord, Snapshot};
use kmodctl::session::Session;
use kmodctl::formats::traits::{OutputDestination, OutputFormat, OutputWriter};
use kmodctl::system::{HostSystem, ModuleSystem};

fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_level()))
        .init();

    let config = cli.controller_config();
    debug!("Controller configuration: {:?}", config);

    let output_dest = if let Some(output_path) = &cli.output {
        OutputDestination::File(output_path.clone())
    } else {
        OutputDestination::Stdout
    };
    let output_writer = OutputWriter::new(cli.output_format(), output_dest);

    let mut controller = InventoryController::new(HostSystem::new(&config), config);

    let command = cli.command.clone().unwrap_or(ModuleCommand::List {
        name: None,
        loaded: false,
        unloaded: false,
    });

    match command {
        ModuleCommand::List {
            name,
            loaded,
            unloaded,
        } => {
            let filter = ModuleFilter::new(name.as_deref(), loaded, unloaded)?;
            let snapshot = refresh_with_spinner(&mut controller, &output_writer);
            output_writer.write_modules(&snapshot, &filter.apply(&snapshot))?;
        }
        ModuleCommand::Show { name } => {
            let snapshot = refresh_with_spinner(&mut controller, &output_writer);
            let record = installed_record(&snapshot, &name)?;
            output_writer.write_modules(&snapshot, &[record])?;
        }
        ModuleCommand::Load { name, anyway } => {
            request_transition(&mut controller, &output_writer, Action::Load, &name, anyway)?;
        }
        ModuleCommand::Unload { name, anyway } => {
            request_transition(&mut controller, &output_writer, Action::Unload, &name, anyway)?;
        }
        ModuleCommand::Watch {
            interval,
            iterations,
        } => {
            watch(&mut controller, &output_writer, interval, iterations)?;
        }
        ModuleCommand::Shell => {
            run_shell(Session::spawn(controller), &output_writer)?;
        }
    }

    Ok(())
}

/// Name and state filter applied to a snapshot before rendering
struct ModuleFilter {
    name: Option<Regex>,
    loaded: Option<bool>,
}

impl ModuleFilter {
    fn new(name: Option<&str>, loaded: bool, unloaded: bool) -> anyhow::Result<Self> {
        let name = name
            .map(Regex::new)
            .transpose()
            .context("invalid --name pattern")?;
        let loaded = match (loaded, unloaded) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        };
        Ok(Self { name, loaded })
    }

    fn apply(&self, snapshot: &Snapshot) -> Vec<ModuleRecord> {
        snapshot.filtered(|m| {
            self.loaded.map_or(true, |loaded| m.loaded == loaded)
                && self.name.as_ref().map_or(true, |re| re.is_match(&m.name))
        })
    }
}

fn refresh_with_spinner<S: ModuleSystem>(
    controller: &mut InventoryController<S>,
    output_writer: &OutputWriter,
) -> Arc<Snapshot> {
    let spinner = (output_writer.format() == OutputFormat::Text && std::io::stderr().is_terminal())
        .then(|| {
            let spinner = ProgressBar::new_spinner();
            spinner.set_style(ProgressStyle::default_spinner());
            spinner.set_message("Reading kernel module inventory...");
            spinner.enable_steady_tick(Duration::from_millis(100));
            spinner
        });

    let snapshot = controller.refresh();

    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    snapshot
}

fn installed_record(snapshot: &Snapshot, name: &str) -> anyhow::Result<ModuleRecord> {
    snapshot.get(name).cloned().ok_or_else(|| match snapshot.notice() {
        Some(notice) => anyhow!("{}", notice),
        None => anyhow!(
            "module {} is not installed for kernel {}",
            name,
            snapshot.kernel_release().unwrap_or("unknown")
        ),
    })
}

/// Why `action` is disabled for `record`, if it is.
fn disabled_reason(record: Option<&ModuleRecord>, action: Action) -> Option<String> {
    let record = record?;
    if record.available_action() == action {
        return None;
    }
    Some(format!("Module {} is already {}.", record.name, record.state()))
}

fn request_transition<S: ModuleSystem>(
    controller: &mut InventoryController<S>,
    output_writer: &OutputWriter,
    action: Action,
    name: &str,
    anyway: bool,
) -> anyhow::Result<()> {
    let snapshot = refresh_with_spinner(controller, output_writer);

    if !anyway {
        if let Some(reason) = disabled_reason(snapshot.get(name), action) {
            println!("{} Nothing to {} (use --anyway to try regardless).", reason, action);
            return Ok(());
        }
    }

    info!("Requesting {} of {}", action, name);
    let outcome = controller.request(action, name);
    output_writer.write_outcome(&outcome)?;
    outcome.result.map_err(anyhow::Error::from)
}

fn watch<S: ModuleSystem>(
    controller: &mut InventoryController<S>,
    output_writer: &OutputWriter,
    interval: u64,
    iterations: Option<u64>,
) -> anyhow::Result<()> {
    let clear = output_writer.format() == OutputFormat::Text
        && output_writer.is_stdout()
        && std::io::stdout().is_terminal();

    let mut round = 0;
    loop {
        let snapshot = controller.refresh();
        if clear {
            print!("\x1B[2J\x1B[H");
        }
        output_writer.write_modules(&snapshot, snapshot.records())?;

        round += 1;
        if iterations.is_some_and(|limit| round >= limit) {
            return Ok(());
        }
        std::thread::sleep(Duration::from_secs(interval));
    }
}

fn run_shell(mut session: Session, output_writer: &OutputWriter) -> anyhow::Result<()> {
    let interactive = std::io::stdin().is_terminal();
    let mut snapshot = session.refresh()?;
    output_writer.write_modules(&snapshot, snapshot.records())?;

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        if interactive {
            print!("kmodctl> ");
            std::io::stdout().flush()?;
        }
        let Some(line) = lines.next() else {
            return Ok(());
        };
        let command = match parse_line(&line?) {
            Ok(command) => command,
            Err(message) => {
                println!("{}", message);
                continue;
            }
        };

        match command {
            ShellCommand::Empty => {}
            ShellCommand::Help => println!("{}", SHELL_HELP),
            ShellCommand::Quit => return Ok(()),
            ShellCommand::Refresh => {
                snapshot = session.refresh()?;
                output_writer.write_modules(&snapshot, snapshot.records())?;
            }
            ShellCommand::List(pattern) => match ModuleFilter::new(pattern.as_deref(), false, false) {
                Ok(filter) => output_writer.write_modules(&snapshot, &filter.apply(&snapshot))?,
                Err(e) => println!("{:#}", e),
            },
            ShellCommand::Show(name) => match installed_record(&snapshot, &name) {
                Ok(record) => output_writer.write_modules(&snapshot, &[record])?,
                Err(e) => println!("{}", e),
            },
            ShellCommand::Apply(action, name) => {
                if let Some(reason) = disabled_reason(snapshot.get(&name), action) {
                    println!("{} '{}' is disabled for this module.", reason, action);
                    continue;
                }
                let outcome = session.apply(action, &name)?;
                output_writer.write_outcome(&outcome)?;
                snapshot = Arc::clone(&outcome.snapshot);
            }
        }
    }
}
