use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use plotwrap::palette::BuiltinPalette;
use plotwrap::render::{render_png, RenderConfig};
use plotwrap::shell::{launch_with, PngPreview, PromptEvents, ScriptEvents};
use plotwrap::{build_plot, Dataset, PlotArgs};
use std::fs::{self, File};
use std::io::{self, BufReader, Write};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "plotwrap")]
#[command(about = "Themed point, line, boxplot and violin charts from CSV data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build one chart and write it to stdout
    Plot(PlotCommand),
    /// List the built-in palette names
    Palettes,
    /// Build a chart from a form, previewing every change
    Interactive(InteractiveCommand),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Png,
    Json,
}

#[derive(Args, Debug)]
struct PlotCommand {
    #[arg(short = 'x', long = "x", required = true, help = "X-axis column name")]
    x_column: String,

    #[arg(short = 'y', long = "y", required = true, help = "Y-axis column name")]
    y_column: String,

    #[arg(short = 'g', long = "group", help = "Column whose values color/fill the series")]
    group: Option<String>,

    #[arg(long = "type", default_value = "point", help = "point, line, boxplot or violin")]
    plot_type: String,

    #[arg(short = 'p', long = "palette", help = "Built-in palette (unknown names use viridis)")]
    palette: Option<String>,

    #[arg(long = "theme", default_value = "minimal", help = "minimal or classic")]
    theme: String,

    #[arg(short = 't', long = "title", help = "Graph title (defaults to \"Plot of Y by X\")")]
    title: Option<String>,

    #[arg(long = "subtitle")]
    subtitle: Option<String>,

    #[arg(long = "caption")]
    caption: Option<String>,

    #[arg(short = 'd', long = "data", help = "CSV file (reads stdin when omitted)")]
    data: Option<PathBuf>,

    #[arg(long = "width", default_value = "800", help = "Output width in pixels")]
    width: u32,

    #[arg(long = "height", default_value = "600", help = "Output height in pixels")]
    height: u32,

    #[arg(long = "format", value_enum, default_value_t = Format::Png)]
    format: Format,
}

#[derive(Args, Debug)]
struct InteractiveCommand {
    #[arg(short = 'd', long = "data", required = true, help = "CSV file to explore")]
    data: PathBuf,

    #[arg(long = "script", help = "Read commands from a file instead of the terminal form")]
    script: Option<PathBuf>,

    #[arg(long = "preview", help = "Where the live preview PNG is written")]
    preview: Option<PathBuf>,

    #[arg(short = 'o', long = "out", help = "Write the confirmed chart as PNG")]
    out: Option<PathBuf>,

    #[arg(long = "width", default_value = "800", help = "Output width in pixels")]
    width: u32,

    #[arg(long = "height", default_value = "600", help = "Output height in pixels")]
    height: u32,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Plot(cmd) => run_plot(cmd),
        Command::Palettes => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            for palette in BuiltinPalette::ALL {
                let colors: Vec<String> = palette.swatch().iter().map(|c| c.to_string()).collect();
                writeln!(handle, "{:<10} {}", palette.name(), colors.join(" "))
                    .context("Failed to write palette list")?;
            }
            Ok(())
        }
        Command::Interactive(cmd) => run_interactive(cmd),
    }
}

fn run_plot(cmd: PlotCommand) -> Result<()> {
    let dataset = match &cmd.data {
        Some(path) => Dataset::from_path(path),
        None => Dataset::from_stdin(),
    }
    .context("Failed to read CSV data")?;

    let mut args = PlotArgs::new(cmd.x_column, cmd.y_column)
        .plot_type(cmd.plot_type)
        .theme(cmd.theme);
    args.group = cmd.group;
    args.palette = cmd.palette;
    args.title = cmd.title;
    args.subtitle = cmd.subtitle;
    args.caption = cmd.caption;

    let chart = build_plot(&dataset, &args).context("Failed to build chart")?;

    let bytes = match cmd.format {
        Format::Json => {
            let mut json = serde_json::to_vec_pretty(&chart).context("Failed to serialize chart")?;
            json.push(b'\n');
            json
        }
        Format::Png => {
            let config = RenderConfig {
                width: cmd.width,
                height: cmd.height,
            };
            render_png(&chart, &config).context("Failed to generate graph")?
        }
    };

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(&bytes)
        .context("Failed to write output to stdout")?;
    handle.flush().context("Failed to flush stdout")?;

    Ok(())
}

fn run_interactive(cmd: InteractiveCommand) -> Result<()> {
    let dataset = Dataset::from_path(&cmd.data)
        .with_context(|| format!("Failed to read {}", cmd.data.display()))?;

    let config = RenderConfig {
        width: cmd.width,
        height: cmd.height,
    };
    let preview_path = cmd
        .preview
        .unwrap_or_else(|| std::env::temp_dir().join("plotwrap-preview.png"));
    let mut preview = PngPreview::new(preview_path).with_config(config);

    let outcome = match &cmd.script {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open script {}", path.display()))?;
            launch_with(dataset, &mut ScriptEvents::new(BufReader::new(file)), &mut preview)?
        }
        None => launch_with(dataset, &mut PromptEvents::new(), &mut preview)?,
    };

    let Some(outcome) = outcome else {
        info!("No chart confirmed");
        return Ok(());
    };

    if let Some(out) = &cmd.out {
        let png = render_png(&outcome.chart, &config).context("Failed to generate graph")?;
        fs::write(out, png).with_context(|| format!("Failed to write {}", out.display()))?;
        info!(path = %out.display(), "chart written");
    }

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(outcome.source.as_bytes())
        .context("Failed to write source to stdout")?;
    handle.flush().context("Failed to flush stdout")?;

    Ok(())
}
