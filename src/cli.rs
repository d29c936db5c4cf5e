//! Command-line interface for javaflow.

use clap::{Args, Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::analysis::{AnalysisContext, AnalysisError, FileAnalysis};
use crate::comments::{generate_comments, CommandGenerator};
use crate::config::{self, Settings, DEFAULT_TEMPLATE};
use crate::render::{self, Theme};
use crate::report::{self, JsonFile, JsonOutline};

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Path argument that reads source from standard input.
const STDIN_PATH: &str = "-";

/// Control-flow graphs and class structure for Java sources and snippets.
///
/// Javaflow accepts whole compilation units or bare fragments (a method, a
/// few statements). Fragments are wrapped in a placeholder class before
/// parsing and reported with their original line numbers.
#[derive(Parser)]
#[command(name = "javaflow")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the control-flow graph
    #[command(visible_alias = "graph")]
    Cfg(CfgArgs),
    /// Extract class and method source spans
    Structure(InputArgs),
    /// Detect association, aggregation and composition between classes
    Relations(InputArgs),
    /// Print the class hierarchy outline
    Outline(OutlineArgs),
    /// Write a default javaflow.yaml
    Init(InitArgs),
}

/// Input selection shared by the analysis commands.
#[derive(Args)]
pub struct InputArgs {
    /// File or directory to analyze, or `-` for standard input
    pub path: PathBuf,

    /// Path to settings YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format: pretty or json (cfg also accepts dot)
    #[arg(short, long, default_value = "pretty")]
    pub format: String,
}

/// Arguments for the cfg command.
#[derive(Args)]
pub struct CfgArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Color theme for DOT output: light or dark (default: from settings)
    #[arg(short, long)]
    pub theme: Option<String>,
}

/// Arguments for the outline command.
#[derive(Args)]
pub struct OutlineArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Command that turns code into comments, one line in, one line out
    #[arg(long)]
    pub comment_cmd: Option<String>,
}

/// Arguments for the init command.
#[derive(Args)]
pub struct InitArgs {
    /// Output file path
    #[arg(short, long, default_value = "javaflow.yaml")]
    pub output: PathBuf,
}

/// Analyzed inputs of one invocation.
struct Inputs {
    settings: Settings,
    analyses: Vec<FileAnalysis>,
    errors: Vec<AnalysisError>,
}

impl Inputs {
    fn exit_code(&self) -> i32 {
        if self.errors.is_empty() {
            EXIT_SUCCESS
        } else {
            EXIT_FAILED
        }
    }
}

fn check_format(format: &str, allowed: &[&str]) -> bool {
    if allowed.contains(&format) {
        return true;
    }
    eprintln!(
        "Error: invalid format {:?}, must be one of: {}",
        format,
        allowed.join(", ")
    );
    false
}

/// Collect `.java` files under `root`, honoring excluded_paths.
pub fn collect_files(root: &Path, settings: &Settings) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| {
            let name = e.file_name().to_string_lossy();
            // Skip hidden directories
            !(e.depth() > 0 && e.file_type().is_dir() && name.starts_with('.'))
        })
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("java") {
            continue;
        }
        let rel = path.strip_prefix(root).unwrap_or(path);
        if settings.is_path_excluded(rel) {
            tracing::debug!(path = %rel.display(), "excluded by settings");
            continue;
        }
        files.push(path.to_path_buf());
    }

    files.sort();
    Ok(files)
}

/// Load settings and analyze the requested path. Usage and I/O problems are
/// reported here and turned into `EXIT_ERROR`.
fn load_inputs(args: &InputArgs) -> Result<Inputs, i32> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let settings = match config::load(args.config.as_deref(), &cwd) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: invalid settings: {}", e);
            return Err(EXIT_ERROR);
        }
    };

    if args.path.as_os_str() == STDIN_PATH {
        let mut source = String::new();
        if let Err(e) = std::io::stdin().read_to_string(&mut source) {
            eprintln!("Error: failed to read standard input: {}", e);
            return Err(EXIT_ERROR);
        }
        let ctx = AnalysisContext::new(&cwd, settings.clone());
        let (analyses, errors) = match ctx.analyze_source(STDIN_PATH, &source) {
            Ok(a) => (vec![a], Vec::new()),
            Err(e) => (Vec::new(), vec![e]),
        };
        return Ok(Inputs {
            settings,
            analyses,
            errors,
        });
    }

    let abs_path = match args.path.canonicalize() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: cannot access path {:?}: {}", args.path, e);
            return Err(EXIT_ERROR);
        }
    };

    let (base, files) = if abs_path.is_dir() {
        match collect_files(&abs_path, &settings) {
            Ok(files) => (abs_path, files),
            Err(e) => {
                eprintln!("Error: {}", e);
                return Err(EXIT_ERROR);
            }
        }
    } else {
        let base = abs_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| cwd.clone());
        (base, vec![abs_path])
    };

    if files.is_empty() {
        eprintln!("Warning: no Java files to analyze");
    }

    let ctx = AnalysisContext::new(base, settings.clone());
    let (analyses, errors) = ctx.analyze_files_parallel(&files);
    Ok(Inputs {
        settings,
        analyses,
        errors,
    })
}

fn print_pretty(command: &str, args: &InputArgs, inputs: &Inputs, sections: Vec<String>) {
    print!(
        "{}",
        report::render_header(command, &args.path.to_string_lossy())
    );
    for section in sections {
        print!("{}", section);
    }
    print!("{}", report::render_errors(&inputs.errors));
    print!(
        "{}",
        report::render_summary(inputs.analyses.len(), inputs.errors.len())
    );
}

/// Run the cfg command.
pub fn run_cfg(args: &CfgArgs) -> anyhow::Result<i32> {
    if !check_format(&args.input.format, &["pretty", "json", "dot"]) {
        return Ok(EXIT_ERROR);
    }
    let theme_override = match args.theme.as_deref().map(str::parse::<Theme>) {
        None => None,
        Some(Ok(theme)) => Some(theme),
        Some(Err(e)) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    };

    let inputs = match load_inputs(&args.input) {
        Ok(i) => i,
        Err(code) => return Ok(code),
    };
    let theme = theme_override.unwrap_or(inputs.settings.theme);

    let graphs: Vec<_> = inputs
        .analyses
        .iter()
        .map(|a| (a, a.cfg(&inputs.settings)))
        .collect();

    match args.input.format.as_str() {
        "json" => {
            let files = graphs
                .iter()
                .map(|(a, cfg)| JsonFile {
                    path: a.path.clone(),
                    wrapped: a.wrapped(),
                    payload: report::graph_json(cfg),
                })
                .collect();
            report::write_json(files, &inputs.errors)?;
        }
        "dot" => {
            for (_, cfg) in &graphs {
                print!("{}", render::to_dot(cfg, theme));
            }
            for e in &inputs.errors {
                eprintln!("Error: {}", e);
            }
        }
        _ => {
            let sections = graphs
                .iter()
                .map(|(a, cfg)| report::render_graph(&a.path, a.wrapped(), cfg))
                .collect();
            print_pretty("cfg", &args.input, &inputs, sections);
        }
    }

    Ok(inputs.exit_code())
}

/// Run the structure command.
pub fn run_structure(args: &InputArgs) -> anyhow::Result<i32> {
    if !check_format(&args.format, &["pretty", "json"]) {
        return Ok(EXIT_ERROR);
    }
    let inputs = match load_inputs(args) {
        Ok(i) => i,
        Err(code) => return Ok(code),
    };

    if args.format == "json" {
        let files = inputs
            .analyses
            .iter()
            .map(|a| JsonFile {
                path: a.path.clone(),
                wrapped: a.wrapped(),
                payload: a.structure(),
            })
            .collect();
        report::write_json(files, &inputs.errors)?;
    } else {
        let sections = inputs
            .analyses
            .iter()
            .map(|a| report::render_structure(&a.path, a.wrapped(), &a.structure()))
            .collect();
        print_pretty("structure", args, &inputs, sections);
    }

    Ok(inputs.exit_code())
}

/// Run the relations command.
pub fn run_relations(args: &InputArgs) -> anyhow::Result<i32> {
    if !check_format(&args.format, &["pretty", "json"]) {
        return Ok(EXIT_ERROR);
    }
    let inputs = match load_inputs(args) {
        Ok(i) => i,
        Err(code) => return Ok(code),
    };

    if args.format == "json" {
        let files = inputs
            .analyses
            .iter()
            .map(|a| JsonFile {
                path: a.path.clone(),
                wrapped: a.wrapped(),
                payload: a.relationships(),
            })
            .collect();
        report::write_json(files, &inputs.errors)?;
    } else {
        let sections = inputs
            .analyses
            .iter()
            .map(|a| report::render_relationships(&a.path, a.wrapped(), &a.relationships()))
            .collect();
        print_pretty("relations", args, &inputs, sections);
    }

    Ok(inputs.exit_code())
}

/// Run the outline command.
pub fn run_outline(args: &OutlineArgs) -> anyhow::Result<i32> {
    if !check_format(&args.input.format, &["pretty", "json"]) {
        return Ok(EXIT_ERROR);
    }
    let generator = match args.comment_cmd.as_deref() {
        None => None,
        Some(cmd) => match CommandGenerator::parse(cmd) {
            Some(g) => Some(g),
            None => {
                eprintln!("Error: --comment-cmd must not be empty");
                return Ok(EXIT_ERROR);
            }
        },
    };

    let inputs = match load_inputs(&args.input) {
        Ok(i) => i,
        Err(code) => return Ok(code),
    };

    let outlines: Vec<_> = inputs
        .analyses
        .iter()
        .map(|a| {
            let comments = generator.as_ref().map(|g| {
                generate_comments(&a.structure(), g, inputs.settings.comment_batch_size)
            });
            (a, a.outline(comments.as_ref()))
        })
        .collect();

    if args.input.format == "json" {
        let files = outlines
            .into_iter()
            .map(|(a, outline)| JsonFile {
                path: a.path.clone(),
                wrapped: a.wrapped(),
                payload: JsonOutline { outline },
            })
            .collect();
        report::write_json(files, &inputs.errors)?;
    } else {
        let sections = outlines
            .iter()
            .map(|(a, outline)| report::render_outline(&a.path, a.wrapped(), outline))
            .collect();
        print_pretty("outline", &args.input, &inputs, sections);
    }

    Ok(inputs.exit_code())
}

/// Run the init command.
pub fn run_init(args: &InitArgs) -> anyhow::Result<i32> {
    // Check if output already exists
    if args.output.exists() {
        eprintln!("Error: file already exists: {}", args.output.display());
        eprintln!("Remove it or use --output to specify a different path");
        return Ok(EXIT_ERROR);
    }

    // Create output directory if needed
    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() && parent != Path::new(".") {
            if let Err(e) = std::fs::create_dir_all(parent) {
                eprintln!("Error: failed to create directory: {}", e);
                return Ok(EXIT_ERROR);
            }
        }
    }

    if let Err(e) = std::fs::write(&args.output, DEFAULT_TEMPLATE) {
        eprintln!("Error: failed to write settings: {}", e);
        return Ok(EXIT_ERROR);
    }

    println!("Created {}", args.output.display());
    println!();
    println!("Next steps:");
    println!("  1. Edit {} to customize wrapping, labels and exclusions", args.output.display());
    println!("  2. Run: javaflow cfg . --config {}", args.output.display());

    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_cli_parses_alias_and_flags() {
        let cli = Cli::try_parse_from(["javaflow", "graph", "Foo.java", "--format", "dot", "--theme", "dark"])
            .unwrap();
        match cli.command {
            Commands::Cfg(args) => {
                assert_eq!(args.input.path, PathBuf::from("Foo.java"));
                assert_eq!(args.input.format, "dot");
                assert_eq!(args.theme.as_deref(), Some("dark"));
            }
            _ => panic!("expected cfg command"),
        }

        let cli = Cli::try_parse_from(["javaflow", "outline", "-", "--comment-cmd", "cat"]).unwrap();
        assert!(matches!(cli.command, Commands::Outline(ref a) if a.comment_cmd.as_deref() == Some("cat")));
    }

    #[test]
    fn test_collect_files_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src/generated")).unwrap();
        fs::create_dir_all(dir.path().join(".hidden")).unwrap();
        fs::write(dir.path().join("src/B.java"), "class B {}").unwrap();
        fs::write(dir.path().join("src/A.java"), "class A {}").unwrap();
        fs::write(dir.path().join("src/notes.txt"), "").unwrap();
        fs::write(dir.path().join("src/generated/G.java"), "class G {}").unwrap();
        fs::write(dir.path().join(".hidden/H.java"), "class H {}").unwrap();

        let settings = Settings {
            excluded_paths: vec!["**/generated/**".to_string()],
            ..Settings::default()
        };
        let files = collect_files(dir.path(), &settings).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["A.java", "B.java"]);
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("conf/javaflow.yaml");
        let args = InitArgs {
            output: output.clone(),
        };
        assert_eq!(run_init(&args).unwrap(), EXIT_SUCCESS);
        assert_eq!(fs::read_to_string(&output).unwrap(), DEFAULT_TEMPLATE);
        assert_eq!(run_init(&args).unwrap(), EXIT_ERROR);
    }

    #[test]
    fn test_invalid_format_is_usage_error() {
        let args = InputArgs {
            path: PathBuf::from("Foo.java"),
            config: None,
            format: "sarif".to_string(),
        };
        assert_eq!(run_structure(&args).unwrap(), EXIT_ERROR);
    }

    #[test]
    fn test_exit_codes_follow_parse_failures() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("javaflow.yaml");
        fs::write(&config, "").unwrap();
        fs::write(dir.path().join("Ok.java"), "class Ok { void f() {} }\n").unwrap();

        let args = |path: PathBuf| InputArgs {
            path,
            config: Some(config.clone()),
            format: "json".to_string(),
        };
        assert_eq!(run_relations(&args(dir.path().join("Ok.java"))).unwrap(), EXIT_SUCCESS);

        fs::write(dir.path().join("Bad.java"), "class Bad {\n").unwrap();
        assert_eq!(run_relations(&args(dir.path().to_path_buf())).unwrap(), EXIT_FAILED);
        assert_eq!(run_relations(&args(dir.path().join("Nope.java"))).unwrap(), EXIT_ERROR);
    }
}
