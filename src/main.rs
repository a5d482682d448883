use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::{ArgAction, Parser};
use surveydoc::{
    block::{image_files, Block},
    worker, ContextError, CropMode, ReportConfiguration, RunConfiguration, RunSummary,
};

const PROGRESS_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct CliArguments {
    /// Title of the documents, the prefix of every output file name.
    #[arg(short = 't', long = "title", value_name = "title")]
    title: Option<String>,
    /// White margins to crop: none, sides, topbottom or both.
    #[arg(short = 'c', long = "crop", value_name = "mode")]
    crop_mode: Option<CropMode>,
    /// Stamps a caption derived from the file name above every screenshot.
    #[arg(short = 'l', long = "label")]
    add_label: bool,
    #[arg(short = 'o', long = "output", value_name = "directory")]
    output_directory: Option<PathBuf>,
    /// A block of screenshots, as NAME=PATH[,PATH...]; folders expand to their images.
    #[arg(short = 'b', long = "block", value_name = "name=paths")]
    blocks: Vec<String>,
    /// JSON description of the run.
    #[arg(long = "run", value_name = "json_file")]
    run_file_path: Option<PathBuf>,
    /// JSON file overriding the lookup tables, the label style and the page layout.
    #[arg(long = "configuration", value_name = "json_file")]
    configuration_file_path: Option<PathBuf>,
    /// Appends _cut and _labeled to the output file names.
    #[arg(long = "mode-suffix")]
    mode_suffix: bool,
    /// Appends the sections to the reports already in the output folder instead of replacing them.
    #[arg(short = 'a', long = "append")]
    append: bool,
    /// Asks for the run on the console.
    #[arg(short = 'i', long = "interactive")]
    interactive: bool,
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbosity: u8,
}

fn main() {
    if let Err(error) = fallible_main() {
        log::error!("{}", error);
        std::process::exit(1);
    }
}

fn fallible_main() -> Result<(), ContextError> {
    let arguments = CliArguments::parse();
    initialize_logging(arguments.verbosity);
    log::debug!("{:?}", arguments);

    let configuration = match &arguments.configuration_file_path {
        Some(configuration_file_path) => ReportConfiguration::from_path(configuration_file_path)?,
        None => ReportConfiguration::default(),
    };
    let run = if arguments.interactive {
        let stdin = std::io::stdin();
        let stdout = std::io::stdout();
        prompt_run(&mut stdin.lock(), &mut stdout.lock())?
    } else {
        run_from_arguments(&arguments)?
    };

    if run.blocks.images().next().is_none() {
        println!("No images were selected, nothing to generate.");
        return Ok(());
    }
    log::debug!("{:?}", run);

    let summary = generate(run, configuration)?;
    log::info!(
        "Generated {} documents in the folder {:?}",
        summary.documents.len(),
        summary.output_directory
    );
    for document in &summary.documents {
        log::info!(
            "{}: {} pictures in {} sections, {} skipped{}",
            document.path.display(),
            document.pictures,
            document.sections.len(),
            document.skipped,
            if document.appended { ", appended" } else { "" }
        );
    }

    Ok(())
}

fn initialize_logging(verbosity: u8) {
    let level = match verbosity {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    let mut builder = env_logger::builder();
    if std::env::var_os("RUST_LOG").is_none() {
        builder.filter_level(level);
    }
    builder.init();
}

/// Runs the generation on the worker and logs while waiting for it.
fn generate(
    run: RunConfiguration,
    configuration: ReportConfiguration,
) -> Result<RunSummary, ContextError> {
    let started = Instant::now();
    let mut handle = worker::spawn_generation(run, configuration)?;
    loop {
        if let Some(completion) = handle.wait_timeout(PROGRESS_INTERVAL) {
            return completion;
        }
        log::info!(
            "Still generating, {} seconds elapsed",
            started.elapsed().as_secs()
        );
    }
}

fn run_from_arguments(arguments: &CliArguments) -> Result<RunConfiguration, ContextError> {
    let mut run = match &arguments.run_file_path {
        Some(run_file_path) => RunConfiguration::from_path(run_file_path)?,
        None => RunConfiguration::new(
            arguments.title.clone().unwrap_or_default(),
            PathBuf::from("."),
        ),
    };
    if let Some(title) = &arguments.title {
        run.title = title.clone();
    }
    if let Some(crop_mode) = arguments.crop_mode {
        run.crop_mode = crop_mode;
    }
    if let Some(output_directory) = &arguments.output_directory {
        run.output_directory = output_directory.clone();
    }
    run.add_label |= arguments.add_label;
    run.mode_suffix |= arguments.mode_suffix;
    run.append |= arguments.append;
    for block_argument in &arguments.blocks {
        run.blocks.insert(parse_block(block_argument)?);
    }

    Ok(run)
}

fn parse_block(block_argument: &str) -> Result<Block, ContextError> {
    let (name, paths) = block_argument.split_once('=').ok_or_else(|| {
        ContextError::with_context(format!(
            "The block {:?} is not in the form NAME=PATH[,PATH...]",
            block_argument
        ))
    })?;
    let name = name.trim();
    if name.is_empty() {
        return Err(ContextError::with_context(format!(
            "The block {:?} has no name",
            block_argument
        )));
    }
    let images = expand_paths(paths.split(','))?;

    Ok(Block::new(name, images))
}

fn expand_paths<'a>(paths: impl Iterator<Item = &'a str>) -> Result<Vec<PathBuf>, ContextError> {
    let mut images = Vec::new();
    for path in paths.map(str::trim).filter(|path| !path.is_empty()) {
        images.extend(image_files(Path::new(path))?);
    }
    Ok(images)
}

/// Asks for the title, the processing options, the output folder and the blocks.
fn prompt_run(
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> Result<RunConfiguration, ContextError> {
    let title = ask(input, output, "Document title: ")?;
    let crop_mode = if ask_yes_no(input, output, "Crop the white borders? [y/N] ")? {
        CropMode::Both
    } else {
        CropMode::None
    };
    let add_label = ask_yes_no(input, output, "Add a label above each image? [y/N] ")?;
    let output_directory = ask(input, output, "Output folder [.]: ")?;
    let output_directory = if output_directory.is_empty() {
        PathBuf::from(".")
    } else {
        PathBuf::from(output_directory)
    };

    let mut run = RunConfiguration::new(title, output_directory);
    run.crop_mode = crop_mode;
    run.add_label = add_label;

    while ask_yes_no(input, output, "Add a block of images? [y/N] ")? {
        let name = ask(input, output, "Block name: ")?;
        if name.is_empty() {
            writeln!(output, "A block needs a name.").map_err(console_error)?;
            continue;
        }
        let paths = ask(input, output, "Images or folders, separated by ';': ")?;
        let images = expand_paths(paths.split(';'))?;
        writeln!(output, "{} images added to {:?}.", images.len(), name).map_err(console_error)?;
        run.blocks.insert(Block::new(name, images));
    }

    Ok(run)
}

/// Reads one trimmed line; the end of the input reads as an empty answer.
fn ask(
    input: &mut impl BufRead,
    output: &mut impl Write,
    question: &str,
) -> Result<String, ContextError> {
    write!(output, "{}", question).map_err(console_error)?;
    output.flush().map_err(console_error)?;
    let mut answer = String::new();
    input.read_line(&mut answer).map_err(console_error)?;
    Ok(answer.trim().to_string())
}

fn ask_yes_no(
    input: &mut impl BufRead,
    output: &mut impl Write,
    question: &str,
) -> Result<bool, ContextError> {
    let answer = ask(input, output, question)?;
    Ok(matches!(answer.to_lowercase().as_str(), "y" | "yes"))
}

fn console_error(error: std::io::Error) -> ContextError {
    ContextError::with_error("Failed to use the console", &error)
}
