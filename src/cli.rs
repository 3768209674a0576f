use crate::config::Configuration;
use crate::document::Document;
use crate::generator::{Collaborators, Generator};
use crate::manifest::RouteManifest;
use crate::parser::{DocIndex, SourceMetadataResolver};
use crate::route::{HttpMethod, MetadataResolver};
use crate::serializer::{self, OutputFormat};
use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info, warn};
use std::path::PathBuf;

/// OpenAPI from routes - Generate OpenAPI documentation from an application's route table
#[derive(Parser, Debug)]
#[command(name = "openapi-from-routes")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Route manifest (YAML, or JSON with a .json extension)
    #[arg(short = 'r', long = "routes", value_name = "FILE")]
    pub routes_path: PathBuf,

    /// Generator configuration file (defaults are used when omitted)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config_path: Option<PathBuf>,

    /// Source directory scanned for handler doc comments
    #[arg(short = 's', long = "source", value_name = "DIR")]
    pub source_path: Option<PathBuf>,

    /// Only document routes whose URI starts with this prefix
    #[arg(long = "filter", value_name = "PREFIX")]
    pub filter: Option<String>,

    /// Output format (yaml or json; inferred from the output file extension, else yaml)
    #[arg(short = 'f', long = "format", value_enum)]
    pub output_format: Option<OutputFormat>,

    /// Output file path (if not specified, outputs to stdout)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output_path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

impl CliArgs {
    /// Explicit `--format`, else the output file's extension, else YAML
    pub fn format(&self) -> OutputFormat {
        self.output_format
            .or_else(|| self.output_path.as_deref().and_then(OutputFormat::from_path))
            .unwrap_or(OutputFormat::Yaml)
    }
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if !args.routes_path.is_file() {
        anyhow::bail!(
            "Route manifest does not exist: {}",
            args.routes_path.display()
        );
    }

    if let Some(config) = &args.config_path {
        if !config.is_file() {
            anyhow::bail!("Configuration file does not exist: {}", config.display());
        }
    }

    if let Some(source) = &args.source_path {
        if !source.is_dir() {
            anyhow::bail!("Source path is not a directory: {}", source.display());
        }
    }

    info!("Route manifest: {}", args.routes_path.display());
    match &args.config_path {
        Some(config) => info!("Configuration: {}", config.display()),
        None => info!("Configuration: defaults"),
    }
    info!("Output format: {:?}", args.format());
    if let Some(ref output) = args.output_path {
        info!("Output file: {}", output.display());
    } else {
        info!("Output: stdout");
    }

    Ok(args)
}

/// Generate the document described by `args`
pub fn build_document(args: &CliArgs) -> Result<Document> {
    let config = match &args.config_path {
        Some(path) => Configuration::load(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => Configuration::default(),
    };

    let manifest = RouteManifest::load(&args.routes_path).with_context(|| {
        format!("Failed to load route manifest {}", args.routes_path.display())
    })?;

    let source_metadata = args.source_path.as_ref().map(|source| {
        info!("Indexing doc comments under {}", source.display());
        let index = DocIndex::from_directory(source);
        if index.is_empty() {
            warn!("No documented handlers found under {}", source.display());
        } else {
            info!("Indexed {} handler doc comments", index.len());
        }
        SourceMetadataResolver::new(&manifest, index)
    });
    let metadata: &dyn MetadataResolver = match &source_metadata {
        Some(resolver) => resolver,
        None => &manifest,
    };

    let sources = Collaborators {
        routes: &manifest,
        metadata,
        scopes: &manifest,
        middleware: &manifest,
    };
    let mut generator = Generator::new(&config, sources);
    if let Some(prefix) = &args.filter {
        info!("Filtering routes by prefix {}", prefix);
        generator = generator.with_route_filter(prefix)?;
    }

    generator
        .generate()
        .context("Failed to generate OpenAPI document")
}

/// Generate the document described by `args` and return it serialized
pub fn render(args: &CliArgs) -> Result<String> {
    let document = build_document(args)?;
    serialize(&document, args.format())
}

fn serialize(document: &Document, output_format: OutputFormat) -> Result<String> {
    info!("Serializing to {:?} format...", output_format);
    Ok(serializer::format(document, output_format)?)
}

fn operation_count(document: &Document) -> usize {
    document
        .paths
        .values()
        .map(|item| {
            HttpMethod::ALL
                .iter()
                .filter(|method| item.get(**method).is_some())
                .count()
        })
        .sum()
}

/// Run the main workflow
pub fn run(args: CliArgs) -> Result<()> {
    info!("Starting OpenAPI document generation...");

    let document = build_document(&args)?;
    let content = serialize(&document, args.format())?;

    if let Some(output_path) = &args.output_path {
        info!("Writing output to: {}", output_path.display());
        serializer::write_to_file(&content, output_path)
            .with_context(|| format!("Failed to write {}", output_path.display()))?;
        info!("Successfully wrote OpenAPI document to {}", output_path.display());
    } else {
        println!("{}", content);
    }

    info!("Generation complete!");
    info!("Summary:");
    info!("  - Paths: {}", document.paths.len());
    info!("  - Operations: {}", operation_count(&document));
    info!(
        "  - Security schemes: {}",
        document
            .components
            .as_ref()
            .map_or(0, |components| components.security_schemes.len())
    );

    Ok(())
}
