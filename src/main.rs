use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use indexmap::IndexMap;
use itertools::Itertools;
use publish_sanitizer::assets::RepresentationCatalog;
use publish_sanitizer::checks::model_names;
use publish_sanitizer::config::{ShaderListConfig, SHADER_ROOT_ENV};
use publish_sanitizer::extractors::layout;
use publish_sanitizer::fbx_scene::{FbxScene, WORLD};
use publish_sanitizer::publish::PublishValidationError;
use publish_sanitizer::scene::SceneSnapshot;
use std::io::Write;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

fn main() {
    // Custom logging formatting: "[ERROR] Error text."
    env_logger::Builder::new()
        .format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()))
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli_matches = App::new("Publish Sanitizer")
        .version("1.0")
        .about("Checks Maya publishes before they go to Unreal: model naming and layout export.")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .subcommand(
            SubCommand::with_name("validate-names")
                .about("Checks that meshes are named <Part>_<shader>_GEO or <Part>_<shader>_MESH.")
                .arg(Arg::with_name("summary").long("summary").takes_value(false).help(
                    "Outputs a one-line summary for each file passed in, rather than all errors.",
                ))
                .arg(
                    Arg::with_name("shader-root")
                        .long("shader-root")
                        .takes_value(true)
                        .env(SHADER_ROOT_ENV)
                        .help("Studio tools root holding the allowed shader list."),
                )
                .arg(
                    Arg::with_name("files")
                        .multiple(true)
                        .takes_value(true)
                        .required(true)
                        .help("Binary fbx files, scene snapshots (.json) or directories of them."),
                ),
        )
        .subcommand(
            SubCommand::with_name("extract-layout")
                .about("Writes <instance>.json layout files for every layout instance in a scene snapshot.")
                .arg(
                    Arg::with_name("catalog")
                        .long("catalog")
                        .takes_value(true)
                        .required(true)
                        .help("JSON export of the project's representations."),
                )
                .arg(
                    Arg::with_name("staging-dir")
                        .long("staging-dir")
                        .takes_value(true)
                        .required(true)
                        .help("Directory that receives one folder per instance."),
                )
                .arg(
                    Arg::with_name("scene")
                        .takes_value(true)
                        .required(true)
                        .help("Scene snapshot (.json)."),
                ),
        )
        .get_matches();

    let success = match cli_matches.subcommand() {
        ("validate-names", Some(args)) => validate_names(args),
        ("extract-layout", Some(args)) => match extract_layout(args) {
            Ok(()) => true,
            Err(e) => {
                log::error!("{:#}", e);
                false
            }
        },
        _ => false,
    };

    if !success {
        std::process::exit(1);
    }
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .map_or(false, |e| e.to_string_lossy().eq_ignore_ascii_case(ext))
}

/// Expands directories into the fbx and json files below them.
fn collect_inputs<'a>(paths: impl Iterator<Item = &'a str>) -> Vec<PathBuf> {
    let mut files = vec![];
    for path in paths.map(Path::new) {
        if path.is_dir() {
            files.extend(
                WalkDir::new(path)
                    .follow_links(true)
                    .into_iter()
                    .filter_map(|e| e.ok())
                    .map(|e| e.into_path())
                    .filter(|p| has_extension(p, "fbx") || has_extension(p, "json")),
            );
        } else {
            files.push(path.to_owned());
        }
    }
    files
}

/// Keeps validation failures for the report and passes any other error on.
fn record_failure(
    failures: &mut IndexMap<String, PublishValidationError>,
    instance: String,
    result: anyhow::Result<()>,
) -> anyhow::Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(e) => {
            let failure = e.downcast::<PublishValidationError>()?;
            failures.insert(instance, failure);
            Ok(())
        }
    }
}

/// Runs the name check on every model instance found in the file. Returns the failures keyed by
/// instance name.
fn check_file(
    path: &Path,
    shader_config: &ShaderListConfig,
) -> anyhow::Result<IndexMap<String, PublishValidationError>> {
    let mut failures = IndexMap::new();

    if has_extension(path, "fbx") {
        let scene = FbxScene::load(path)?;
        log::debug!("{} has {} models", path.display(), scene.model_count());
        let instance = path
            .file_stem()
            .map_or_else(|| path.display().to_string(), |s| s.to_string_lossy().into_owned());
        let result = model_names::verify(&scene, WORLD, &shader_config.load());
        record_failure(&mut failures, instance, result)?;
    } else if has_extension(path, "json") {
        let scene = SceneSnapshot::load(path)?;
        for instance in &scene.instances {
            if !instance.active || !instance.has_family("model") {
                continue;
            }
            let result = model_names::verify(&scene, &instance.name, &shader_config.load());
            record_failure(&mut failures, instance.name.clone(), result)?;
        }
    } else {
        anyhow::bail!("File is not an fbx or scene snapshot: {}", path.display());
    }

    Ok(failures)
}

/// Returns true if there were no errors.
fn validate_names(args: &ArgMatches) -> bool {
    let shader_config = ShaderListConfig {
        root: args.value_of("shader-root").map(PathBuf::from),
    };
    let files = collect_inputs(args.values_of("files").into_iter().flatten());

    let mut any_errs = false;
    for path in files {
        let failures = match check_file(&path, &shader_config) {
            Ok(f) => f,
            Err(e) => {
                log::error!("Could not check {}: {:#}", path.display(), e);
                any_errs = true;
                continue;
            }
        };

        if failures.is_empty() {
            continue;
        }
        any_errs = true;

        let total_errors: usize = failures.values().map(|e| e.invalid.len()).sum();
        if args.is_present("summary") {
            log::error!(
                "{},{},{}",
                path.display(),
                total_errors,
                failures.keys().join(",")
            );
        } else {
            log::error!("The file {} has {} errors:", path.display(), total_errors);
            for (instance, error) in &failures {
                log::error!("[{}] {}", instance, error);
            }
            if let Some(error) = failures.values().next() {
                println!("{}", error.description);
            }
            println!();
        }
    }

    !any_errs
}

fn extract_layout(args: &ArgMatches) -> anyhow::Result<()> {
    let scene_path = Path::new(args.value_of("scene").unwrap_or_default());
    let catalog_path = Path::new(args.value_of("catalog").unwrap_or_default());
    let staging_root = Path::new(args.value_of("staging-dir").unwrap_or_default());

    let mut scene = SceneSnapshot::load(scene_path)?;
    let catalog = RepresentationCatalog::load(catalog_path)?;

    let mut instances = std::mem::take(&mut scene.instances);
    let mut artifacts = vec![];
    for instance in instances.iter_mut() {
        if !instance.active || !instance.has_family("layout") {
            continue;
        }
        let staging_dir = staging_root.join(&instance.name);
        let artifact = layout::extract(&scene, &catalog, &scene.context, instance, &staging_dir)?;
        log::info!(
            "Extracted instance '{}' to {}",
            instance.name,
            artifact.files.iter().map(|f| staging_dir.join(f).display().to_string()).join(", ")
        );
        artifacts.push(artifact);
    }

    if artifacts.is_empty() {
        log::warn!("No active layout instances in {}", scene_path.display());
    }
    println!("{}", serde_json::to_string_pretty(&artifacts)?);
    Ok(())
}
