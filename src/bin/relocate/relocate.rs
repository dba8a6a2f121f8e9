use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use media_relocate::config::DEFAULT_ALIAS_PATH;
use media_relocate::mover::{self, ProgressCallback};
use media_relocate::{
    AliasTable, ClassificationContext, ContextResolver, MediaItem, MoveEngine, MoveOutcome, MoveReport, ParserAdapter,
    get_relative_path_or_filename, planner, print_bold, print_error, print_warning,
};

use crate::RelocateArgs;
use crate::config::Config;
use crate::logger::FileLogger;

const PROGRESS_BAR_CHARS: &str = "=>-";
const PROGRESS_BAR_TEMPLATE: &str =
    "[{elapsed_precise}] {bar:60.magenta/blue} {bytes}/{total_bytes} {percent}% {wide_msg}";

#[derive(Debug)]
pub struct Relocate {
    config: Config,
    sources: Vec<PathBuf>,
    destination: PathBuf,
}

impl Relocate {
    pub fn new(args: RelocateArgs) -> Result<Self> {
        let config = Config::from_args(args);
        if config.debug {
            eprintln!("Config: {config:#?}");
        }

        let sources = if config.sources.is_empty() {
            vec![media_relocate::resolve_input_path(None)?]
        } else {
            config
                .sources
                .iter()
                .map(|source| media_relocate::resolve_input_path(Some(source)))
                .collect::<Result<Vec<_>>>()?
        };
        let destination = match config.destination.as_deref() {
            Some(path) => media_relocate::resolve_output_path(path)?,
            None => PathBuf::new(),
        };
        mover::validate_plan_request(&sources, &destination)?;

        if config.debug {
            eprintln!("Sources: {sources:#?}");
            eprintln!("Destination: {}", destination.display());
        }

        Ok(Self {
            config,
            sources,
            destination,
        })
    }

    pub fn run(&self) -> Result<()> {
        let resolver = ContextResolver::new()
            .with_protected_names(&self.config.protected_dirs)
            .with_source_roots(&self.sources);

        let plan = self.analyze(resolver.clone())?;
        if plan.is_empty() {
            println!("No files to move");
            return Ok(());
        }

        self.print_plan(&plan);
        if self.config.dryrun {
            return Ok(());
        }

        if !self.config.auto && !Self::confirm(plan.len())? {
            println!("Cancelled");
            return Ok(());
        }

        let engine = MoveEngine::new(self.sources.clone())
            .with_resolver(resolver)
            .with_cleanup(self.config.cleanup);

        let mut logger = match FileLogger::new() {
            Ok(logger) => Some(logger),
            Err(error) => {
                print_warning!("Failed to create log file: {error:#}");
                None
            }
        };
        if let Some(logger) = logger.as_mut() {
            logger.log_init(&self.config, &self.sources, &self.destination, plan.len());
        }

        let start = Instant::now();
        match self.execute(&engine, &plan)? {
            MoveOutcome::NothingToDo => {
                println!("Nothing to move");
                Ok(())
            }
            MoveOutcome::Completed(report) => {
                if let Some(logger) = logger.as_mut() {
                    logger.log_report(&report, start.elapsed());
                    if self.config.verbose {
                        println!("Log file: {}", logger.path().display());
                    }
                }
                self.print_summary(&report, start.elapsed());
                if report.has_errors() {
                    anyhow::bail!("{} error(s) while moving files", report.errors().count());
                }
                Ok(())
            }
        }
    }

    /// Scan and classify on a worker thread while a spinner runs.
    fn analyze(&self, resolver: ContextResolver) -> Result<Vec<MediaItem>> {
        let aliases = AliasTable::load_or_default(
            self.config.aliases.as_deref().or(DEFAULT_ALIAS_PATH.as_deref()),
            self.config.verbose,
        );
        let oracles = if self.config.oracle {
            ParserAdapter::with_default_oracles()
        } else {
            ParserAdapter::new()
        };
        let mut context = ClassificationContext::new(&self.destination)
            .with_aliases(Arc::new(aliases))
            .with_resolver(resolver)
            .with_oracles(oracles)
            .with_layout(self.config.layout.clone());

        let spinner = ProgressBar::new_spinner();
        spinner.set_message("Analyzing source directories...");
        spinner.enable_steady_tick(Duration::from_millis(100));

        let plan = thread::scope(|scope| {
            scope
                .spawn(|| planner::analyze_sources(&self.sources, &mut context))
                .join()
        })
        .map_err(|_| anyhow::anyhow!("Analysis thread panicked"))?;

        spinner.finish_and_clear();
        Ok(plan)
    }

    fn print_plan(&self, plan: &[MediaItem]) {
        print_bold!("Plan: {} file(s)", plan.len());
        for item in plan {
            let destination = get_relative_path_or_filename(&item.destination_path(), &self.destination);
            if self.config.verbose {
                println!("{} {}", item.content_kind().to_string().cyan(), item.rule.dimmed());
            }
            media_relocate::show_diff(&item.source_filename(), &destination);
            if self.config.verbose {
                println!("{}", item.source_path.display().to_string().dimmed());
            }
        }
        println!();
    }

    fn confirm(count: usize) -> Result<bool> {
        print!("{}", format!("Move {count} file(s)? (y/n): ").magenta());
        std::io::stdout().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;
        Ok(input.trim().eq_ignore_ascii_case("y"))
    }

    /// Run the plan on a worker thread with a byte progress bar.
    fn execute(&self, engine: &MoveEngine, plan: &[MediaItem]) -> Result<MoveOutcome> {
        let cancel_flag = engine.cancel_flag();
        ctrlc::set_handler(move || {
            if cancel_flag.load(Ordering::SeqCst) {
                // Second Ctrl+C - force exit
                std::process::exit(130);
            }
            println!("\n{}", "Received Ctrl+C, finishing current file...".yellow().bold());
            cancel_flag.store(true, Ordering::SeqCst);
        })
        .context("Failed to set Ctrl+C handler")?;

        let progress_bar = ProgressBar::new(mover::compute_total_bytes(plan));
        progress_bar.set_style(
            ProgressStyle::default_bar()
                .template(PROGRESS_BAR_TEMPLATE)?
                .progress_chars(PROGRESS_BAR_CHARS),
        );

        let bar = progress_bar.clone();
        let on_progress = move |done: u64, total: u64, label: &str| {
            bar.set_length(total);
            bar.set_position(done);
            bar.set_message(label.to_string());
        };
        let callback: &ProgressCallback<'_> = &on_progress;

        let outcome = thread::scope(|scope| scope.spawn(|| engine.execute_plan(plan, callback)).join())
            .map_err(|_| anyhow::anyhow!("Move thread panicked"))?;

        progress_bar.finish_and_clear();
        if self.config.verbose {
            println!("{}", "Move finished".green());
        }
        Ok(outcome)
    }

    fn print_summary(&self, report: &MoveReport, duration: Duration) {
        if report.cancelled {
            println!("{}", "Aborted by user".bold().red());
        }
        for error in report.errors() {
            print_error!("{error}");
        }
        if self.config.verbose {
            for dir in &report.removed_dirs {
                println!("Removed: {}", dir.display());
            }
        }

        print_bold!(
            "Moved {} file(s), {} in {}",
            report.moved.len(),
            media_relocate::format_size(report.bytes_done),
            media_relocate::format_duration(duration)
        );
        if report.companions_moved > 0 {
            println!("Companion files: {}", report.companions_moved);
        }
        if !report.removed_dirs.is_empty() {
            println!("Removed directories: {}", report.removed_dirs.len());
        }
        if report.has_errors() {
            println!(
                "{}",
                format!(
                    "Errors: {} move, {} cleanup",
                    report.move_errors.len(),
                    report.cleanup_errors.len()
                )
                .red()
            );
        }
    }
}
