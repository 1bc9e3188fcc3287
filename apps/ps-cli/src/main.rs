use clap::{Parser, Subcommand, ValueEnum};
use ps_app::{AppResult, project_service};
use ps_core::PhaseSet;
use ps_project::Project;
use ps_topology::SectionKind;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Parser)]
#[command(name = "ps-cli")]
#[command(about = "PSBuilder CLI - pseudosection topology tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    Pt,
    Tx,
    Px,
}

impl From<Kind> for SectionKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Pt => SectionKind::Pt,
            Kind::Tx => SectionKind::Tx,
            Kind::Px => SectionKind::Px,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty project
    New {
        /// Path of the project file (.json or .yaml)
        project_path: PathBuf,
        /// Project name
        #[arg(long, default_value = "Untitled")]
        name: String,
        /// Section axes
        #[arg(long, value_enum, default_value = "pt")]
        kind: Kind,
        /// Phases in excess, space separated
        #[arg(long, default_value = "")]
        excess: String,
    },
    /// Validate project file syntax and structure
    Validate {
        /// Path to the project file
        project_path: PathBuf,
    },
    /// Summarize a project
    Info {
        /// Path to the project file
        project_path: PathBuf,
    },
    /// Reconstruct and list the divariant fields
    Areas {
        /// Path to the project file
        project_path: PathBuf,
        /// Print the reconstruction log
        #[arg(long)]
        log: bool,
    },
    /// List univariant lines with their end points
    Topology {
        /// Path to the project file
        project_path: PathBuf,
    },
    /// Retrim every univariant line and save the project
    Trim {
        /// Path to the project file
        project_path: PathBuf,
        /// Write to this file instead of overwriting the input
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> AppResult<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::New {
            project_path,
            name,
            kind,
            excess,
        } => cmd_new(&project_path, name, kind.into(), &excess),
        Commands::Validate { project_path } => cmd_validate(&project_path),
        Commands::Info { project_path } => cmd_info(&project_path),
        Commands::Areas { project_path, log } => cmd_areas(&project_path, log),
        Commands::Topology { project_path } => cmd_topology(&project_path),
        Commands::Trim {
            project_path,
            output,
        } => cmd_trim(&project_path, output.as_deref()),
    }
}

fn cmd_new(project_path: &Path, name: String, kind: SectionKind, excess: &str) -> AppResult<()> {
    let workdir = project_path
        .parent()
        .filter(|d| !d.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    let mut project = Project::new(name, kind, workdir);
    project.section.excess = PhaseSet::parse(excess);
    project.session.excess = project.section.excess.clone();
    project_service::save_project(project_path, &mut project)?;
    println!("✓ Created {}", project_path.display());
    Ok(())
}

fn cmd_validate(project_path: &Path) -> AppResult<()> {
    println!("Validating project: {}", project_path.display());
    let project = project_service::load_project(project_path)?;
    project_service::validate_project(&project)?;
    let warnings = project_service::connection_warnings(&project);
    for warning in &warnings {
        println!("⚠ {warning}");
    }
    if warnings.is_empty() {
        println!("✓ Project is valid");
    } else {
        println!("✓ Project is valid ({} connection warnings)", warnings.len());
    }
    Ok(())
}

fn cmd_info(project_path: &Path) -> AppResult<()> {
    let project = project_service::load_project(project_path)?;
    let summary = project_service::summarize(&project);
    let w = summary.window;
    println!("Project: {}", summary.name);
    println!(
        "  Section: {} vs {}",
        summary.kind.x_label(),
        summary.kind.y_label()
    );
    println!(
        "  Window: {}-{} x {}-{}",
        w.xmin, w.xmax, w.ymin, w.ymax
    );
    if !summary.excess.is_empty() {
        println!("  Excess: {}", summary.excess);
    }
    println!("  Invariant points: {}", summary.inv_count);
    println!("  Univariant lines: {}", summary.uni_count);
    println!("  Dogmins: {}", summary.dogmin_count);
    if let Some(saved) = &summary.saved {
        println!("  Saved: {saved}");
    }
    if let Some(grid) = &project.grid {
        println!("  {grid}");
    }
    let isolated = project.section.isolated_points();
    if !isolated.is_empty() {
        let ids: Vec<String> = isolated.iter().map(ToString::to_string).collect();
        println!("  Unconnected invariant points: {}", ids.join(", "));
    }
    Ok(())
}

fn cmd_areas(project_path: &Path, show_log: bool) -> AppResult<()> {
    let project = project_service::load_project(project_path)?;
    let (areas, log) = project_service::list_areas(&project);
    if areas.is_empty() {
        println!("No areas could be constructed");
    } else {
        println!("Areas in section:");
        for area in &areas {
            let edges: Vec<String> = area.edges.iter().map(ToString::to_string).collect();
            println!(
                "  {} ({} edges: {}) area {:.4}",
                area.key,
                edges.len(),
                edges.join(" "),
                area.area
            );
        }
    }
    if show_log {
        for line in &log {
            println!("{line}");
        }
    } else if !log.is_empty() {
        println!("{} reconstruction messages, use --log to show", log.len());
    }
    Ok(())
}

fn cmd_topology(project_path: &Path) -> AppResult<()> {
    let project = project_service::load_project(project_path)?;
    let rows = project_service::list_topology(&project);
    if rows.is_empty() {
        println!("No univariant lines in project");
        return Ok(());
    }
    println!("{:>5} {:>9} {:>8}  Label", "Id", "Ends", "Samples");
    for row in rows {
        let samples = if row.manual {
            "manual".to_string()
        } else {
            row.samples.to_string()
        };
        println!("{:>5} {:>9} {:>8}  {}", row.id, row.ends, samples, row.label);
    }
    Ok(())
}

fn cmd_trim(project_path: &Path, output: Option<&Path>) -> AppResult<()> {
    let mut project = project_service::load_project(project_path)?;
    let bound = project_service::trim_project(&mut project);
    let target = output.unwrap_or(project_path);
    debug!(path = %target.display(), bound, "writing trimmed project");
    project_service::save_project(target, &mut project)?;
    println!(
        "✓ Trimmed {} lines ({} bound at both ends), saved to {}",
        project.section.uni_count(),
        bound,
        target.display()
    );
    Ok(())
}
