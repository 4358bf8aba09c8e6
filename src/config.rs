//! Options from the command line, the environment and a config file.
//!
//! Every flag is optional at this layer so that sources can be stacked:
//! flag, then `KUBECTL_SLICE_*` environment variable (both handled by clap),
//! then the YAML config file, then the built-in default.

use crate::Result;
use crate::filter::FilterSpec;
use crate::input::{DEFAULT_EXTENSIONS, InputSource, normalize_extension};
use crate::store::{OutputTarget, StoreOptions};
use anyhow::{Context, bail};
use clap::builder::BoolishValueParser;
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Eq, clap::Args, Deserialize)]
#[serde(default)]
pub struct SliceArgs {
    /// Input file; if empty or "-", stdin is used
    #[arg(short = 'f', long, env = "KUBECTL_SLICE_INPUT_FILE")]
    pub input_file: Option<String>,

    /// Read every matching file in this folder instead of a single file
    #[arg(long, env = "KUBECTL_SLICE_INPUT_FOLDER")]
    pub input_folder: Option<PathBuf>,

    /// File extensions read from the input folder [default: .yaml,.yml]
    #[arg(long, value_delimiter = ',', env = "KUBECTL_SLICE_EXTENSIONS")]
    #[serde(deserialize_with = "one_or_many")]
    pub extensions: Option<Vec<String>>,

    /// Descend into sub-folders of the input folder
    #[arg(long, env = "KUBECTL_SLICE_RECURSE", num_args = 0..=1, require_equals = true, default_missing_value = "true", value_parser = BoolishValueParser::new())]
    pub recurse: Option<bool>,

    /// Directory the sliced files are written to
    #[arg(short = 'o', long, env = "KUBECTL_SLICE_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Template used to name each output file
    #[arg(short = 't', long, env = "KUBECTL_SLICE_TEMPLATE")]
    pub template: Option<String>,

    /// Print what would be written without creating files
    #[arg(long, env = "KUBECTL_SLICE_DRY_RUN", num_args = 0..=1, require_equals = true, default_missing_value = "true", value_parser = BoolishValueParser::new())]
    pub dry_run: Option<bool>,

    /// Enable debug logging
    #[arg(long, hide = true, env = "KUBECTL_SLICE_DEBUG", num_args = 0..=1, require_equals = true, default_missing_value = "true", value_parser = BoolishValueParser::new())]
    pub debug: Option<bool>,

    /// Suppress progress and summary messages on stderr
    #[arg(short = 'q', long, env = "KUBECTL_SLICE_QUIET", num_args = 0..=1, require_equals = true, default_missing_value = "true", value_parser = BoolishValueParser::new())]
    pub quiet: Option<bool>,

    /// Kinds to include (case insensitive, glob supported)
    #[arg(long, value_delimiter = ',', env = "KUBECTL_SLICE_INCLUDE_KIND")]
    #[serde(deserialize_with = "one_or_many")]
    pub include_kind: Option<Vec<String>>,

    /// Kinds to exclude (case insensitive, glob supported)
    #[arg(long, value_delimiter = ',', env = "KUBECTL_SLICE_EXCLUDE_KIND")]
    #[serde(deserialize_with = "one_or_many")]
    pub exclude_kind: Option<Vec<String>>,

    /// Names to include (case insensitive, glob supported)
    #[arg(long, value_delimiter = ',', env = "KUBECTL_SLICE_INCLUDE_NAME")]
    #[serde(deserialize_with = "one_or_many")]
    pub include_name: Option<Vec<String>>,

    /// Names to exclude (case insensitive, glob supported)
    #[arg(long, value_delimiter = ',', env = "KUBECTL_SLICE_EXCLUDE_NAME")]
    #[serde(deserialize_with = "one_or_many")]
    pub exclude_name: Option<Vec<String>>,

    /// Resources to include, as <kind>/<name> (case insensitive, glob supported)
    #[arg(long, value_delimiter = ',', env = "KUBECTL_SLICE_INCLUDE")]
    #[serde(deserialize_with = "one_or_many")]
    pub include: Option<Vec<String>>,

    /// Resources to exclude, as <kind>/<name> (case insensitive, glob supported)
    #[arg(long, value_delimiter = ',', env = "KUBECTL_SLICE_EXCLUDE")]
    #[serde(deserialize_with = "one_or_many")]
    pub exclude: Option<Vec<String>>,

    /// API groups to include (case insensitive, glob supported)
    #[arg(long, value_delimiter = ',', env = "KUBECTL_SLICE_INCLUDE_GROUP")]
    #[serde(deserialize_with = "one_or_many")]
    pub include_group: Option<Vec<String>>,

    /// API groups to exclude (case insensitive, glob supported)
    #[arg(long, value_delimiter = ',', env = "KUBECTL_SLICE_EXCLUDE_GROUP")]
    #[serde(deserialize_with = "one_or_many")]
    pub exclude_group: Option<Vec<String>>,

    /// Skip documents lacking apiVersion, kind or metadata.name
    #[arg(short = 's', long, env = "KUBECTL_SLICE_SKIP_NON_K8S", num_args = 0..=1, require_equals = true, default_missing_value = "true", value_parser = BoolishValueParser::new())]
    pub skip_non_k8s: Option<bool>,

    /// Sort resources by kind in install order before writing
    #[arg(long, env = "KUBECTL_SLICE_SORT_BY_KIND", num_args = 0..=1, require_equals = true, default_missing_value = "true", value_parser = BoolishValueParser::new())]
    pub sort_by_kind: Option<bool>,

    /// Print resources to stdout instead of writing files
    #[arg(long, env = "KUBECTL_SLICE_STDOUT", num_args = 0..=1, require_equals = true, default_missing_value = "true", value_parser = BoolishValueParser::new())]
    pub stdout: Option<bool>,

    /// Resources with an empty kind are not an error when filtering
    #[arg(long, env = "KUBECTL_SLICE_ALLOW_EMPTY_KINDS", num_args = 0..=1, require_equals = true, default_missing_value = "true", value_parser = BoolishValueParser::new())]
    pub allow_empty_kinds: Option<bool>,

    /// Resources with an empty name are not an error when filtering
    #[arg(long, env = "KUBECTL_SLICE_ALLOW_EMPTY_NAMES", num_args = 0..=1, require_equals = true, default_missing_value = "true", value_parser = BoolishValueParser::new())]
    pub allow_empty_names: Option<bool>,

    /// Start every written file with "---"
    #[arg(long, env = "KUBECTL_SLICE_INCLUDE_TRIPLE_DASH", num_args = 0..=1, require_equals = true, default_missing_value = "true", value_parser = BoolishValueParser::new())]
    pub include_triple_dash: Option<bool>,

    /// Empty the output directory before writing
    #[arg(long, env = "KUBECTL_SLICE_PRUNE", num_args = 0..=1, require_equals = true, default_missing_value = "true", value_parser = BoolishValueParser::new())]
    pub prune: Option<bool>,

    /// Omit the "# File:" headers when printing to stdout
    #[arg(long, env = "KUBECTL_SLICE_REMOVE_COMMENTS", num_args = 0..=1, require_equals = true, default_missing_value = "true", value_parser = BoolishValueParser::new())]
    pub remove_comments: Option<bool>,
}

/// Config files accept either a YAML list or a comma separated string.
fn one_or_many<'de, D: Deserializer<'de>>(de: D) -> std::result::Result<Option<Vec<String>>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(Option::<OneOrMany>::deserialize(de)?.map(|v| match v {
        OneOrMany::One(s) => s.split(',').map(|p| p.trim().to_string()).collect(),
        OneOrMany::Many(items) => items,
    }))
}

macro_rules! layered {
    ($top:ident, $bottom:ident, $($field:ident),+ $(,)?) => {
        SliceArgs {
            $($field: $top.$field.or($bottom.$field)),+
        }
    };
}

impl SliceArgs {
    /// Fill every unset option from `lower`.
    pub fn or(self, lower: SliceArgs) -> SliceArgs {
        layered!(
            self,
            lower,
            input_file,
            input_folder,
            extensions,
            recurse,
            output_dir,
            template,
            dry_run,
            debug,
            quiet,
            include_kind,
            exclude_kind,
            include_name,
            exclude_name,
            include,
            exclude,
            include_group,
            exclude_group,
            skip_non_k8s,
            sort_by_kind,
            stdout,
            allow_empty_kinds,
            allow_empty_names,
            include_triple_dash,
            prune,
            remove_comments,
        )
    }
}

/// Read a YAML config file. Keys are flag names with `_` instead of `-`.
pub fn load_config_file(path: &Path) -> Result<SliceArgs> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read configuration file {:?}", path))?;
    if raw.trim().is_empty() {
        return Ok(SliceArgs::default());
    }
    serde_yaml::from_str(&raw)
        .with_context(|| format!("failed to parse configuration file {:?}", path))
}

/// Fully resolved run configuration.
#[derive(Debug, Clone)]
pub struct Options {
    pub input: InputSource,
    pub template: String,
    pub filters: FilterSpec,
    pub sort_by_kind: bool,
    pub store: StoreOptions,
    pub debug: bool,
    pub quiet: bool,
}

impl Options {
    /// Apply defaults and check that the options make sense together.
    /// Filter conflicts are checked later, when the slicer is built.
    pub fn resolve(args: SliceArgs) -> Result<Self> {
        let flag = |v: Option<bool>| v.unwrap_or(false);
        let list = |v: Option<Vec<String>>| {
            v.unwrap_or_default()
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
        };

        let input_file = args.input_file.filter(|f| !f.is_empty() && f != "-");
        let input = match (input_file, args.input_folder) {
            (Some(_), Some(_)) => bail!("cannot specify both input file and input folder"),
            (None, Some(path)) => {
                let mut extensions: Vec<String> = list(args.extensions)
                    .iter()
                    .map(|e| normalize_extension(e))
                    .collect();
                if extensions.is_empty() {
                    extensions = DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect();
                }
                InputSource::Folder {
                    path,
                    extensions,
                    recurse: flag(args.recurse),
                }
            }
            (Some(file), None) => InputSource::File(PathBuf::from(file)),
            (None, None) => InputSource::Stdin,
        };

        let output_dir = args.output_dir.filter(|d| !d.as_os_str().is_empty());
        let target = match (flag(args.stdout), output_dir) {
            (true, Some(_)) => bail!(
                "cannot specify both output to stdout and output to file: output directory flag is set"
            ),
            (true, None) => OutputTarget::Stdout,
            (false, Some(dir)) => OutputTarget::Directory(dir),
            (false, None) => bail!("output directory flag is empty or not set"),
        };

        let quiet = flag(args.quiet);
        Ok(Self {
            input,
            template: args.template.unwrap_or_default(),
            filters: FilterSpec {
                included_kinds: list(args.include_kind),
                excluded_kinds: list(args.exclude_kind),
                included_names: list(args.include_name),
                excluded_names: list(args.exclude_name),
                included: list(args.include),
                excluded: list(args.exclude),
                included_groups: list(args.include_group),
                excluded_groups: list(args.exclude_group),
                allow_empty_kinds: flag(args.allow_empty_kinds),
                allow_empty_names: flag(args.allow_empty_names),
                strict_kubernetes: flag(args.skip_non_k8s),
            },
            sort_by_kind: flag(args.sort_by_kind),
            store: StoreOptions {
                target,
                dry_run: flag(args.dry_run),
                prune: flag(args.prune),
                include_triple_dash: flag(args.include_triple_dash),
                remove_comments: flag(args.remove_comments),
                quiet,
            },
            debug: flag(args.debug),
            quiet,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: SliceArgs,
    }

    fn parse(argv: &[&str]) -> SliceArgs {
        TestCli::try_parse_from(std::iter::once("kubectl-slice").chain(argv.iter().copied()))
            .unwrap()
            .args
    }

    fn out_dir() -> SliceArgs {
        SliceArgs {
            output_dir: Some(PathBuf::from("out")),
            ..Default::default()
        }
    }

    #[test]
    fn flags_parse() {
        let args = parse(&[
            "-f",
            "in.yaml",
            "-o",
            "out",
            "--include-kind",
            "Pod,Service",
            "--include-kind=Namespace",
            "--dry-run",
            "--sort-by-kind=false",
            "-s",
        ]);
        assert_eq!(args.input_file.as_deref(), Some("in.yaml"));
        assert_eq!(
            args.include_kind,
            Some(vec!["Pod".to_string(), "Service".to_string(), "Namespace".to_string()])
        );
        assert_eq!(args.dry_run, Some(true));
        assert_eq!(args.sort_by_kind, Some(false));
        assert_eq!(args.skip_non_k8s, Some(true));
        assert_eq!(args.stdout, None);
    }

    #[test]
    fn config_file_fills_unset_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "output_dir: from-file\ntemplate: \"{{.kind}}.yaml\"\ninclude_kind: [Pod]\nexclude_name: a,b\nsort_by_kind: true\n",
        )
        .unwrap();
        let file = load_config_file(&path).unwrap();
        assert_eq!(file.exclude_name, Some(vec!["a".to_string(), "b".to_string()]));

        let cli = SliceArgs {
            output_dir: Some(PathBuf::from("from-flag")),
            ..Default::default()
        };
        let merged = cli.or(file);
        assert_eq!(merged.output_dir, Some(PathBuf::from("from-flag")));
        assert_eq!(merged.template.as_deref(), Some("{{.kind}}.yaml"));
        assert_eq!(merged.include_kind, Some(vec!["Pod".to_string()]));
        assert_eq!(merged.sort_by_kind, Some(true));
    }

    #[test]
    fn empty_config_file_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.yaml");
        std::fs::write(&path, "\n").unwrap();
        assert_eq!(load_config_file(&path).unwrap(), SliceArgs::default());
    }

    #[test]
    fn resolves_defaults() {
        let opts = Options::resolve(out_dir()).unwrap();
        assert_eq!(opts.input, InputSource::Stdin);
        assert_eq!(opts.template, "");
        assert_eq!(opts.store.target, OutputTarget::Directory(PathBuf::from("out")));
        assert!(!opts.sort_by_kind);
        assert!(!opts.store.dry_run);
    }

    #[test]
    fn dash_means_stdin() {
        let opts = Options::resolve(SliceArgs {
            input_file: Some("-".to_string()),
            ..out_dir()
        })
        .unwrap();
        assert_eq!(opts.input, InputSource::Stdin);
    }

    #[test]
    fn folder_input_normalizes_extensions() {
        let opts = Options::resolve(SliceArgs {
            input_folder: Some(PathBuf::from("manifests")),
            extensions: Some(vec!["JSON".to_string(), " ".to_string()]),
            recurse: Some(true),
            ..out_dir()
        })
        .unwrap();
        assert_eq!(
            opts.input,
            InputSource::Folder {
                path: PathBuf::from("manifests"),
                extensions: vec![".json".to_string()],
                recurse: true,
            }
        );
    }

    #[test]
    fn conflicting_sources_and_targets() {
        let both_inputs = SliceArgs {
            input_file: Some("a.yaml".to_string()),
            input_folder: Some(PathBuf::from("dir")),
            ..out_dir()
        };
        let err = Options::resolve(both_inputs).unwrap_err();
        assert_eq!(err.to_string(), "cannot specify both input file and input folder");

        let both_outputs = SliceArgs {
            stdout: Some(true),
            ..out_dir()
        };
        assert!(Options::resolve(both_outputs).is_err());

        let err = Options::resolve(SliceArgs::default()).unwrap_err();
        assert_eq!(err.to_string(), "output directory flag is empty or not set");
    }

    #[test]
    fn filters_are_carried_over() {
        let opts = Options::resolve(SliceArgs {
            exclude: Some(vec!["deployment/kube*".to_string()]),
            include_group: Some(vec!["apps".to_string()]),
            skip_non_k8s: Some(true),
            stdout: Some(true),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(opts.filters.excluded, vec!["deployment/kube*".to_string()]);
        assert_eq!(opts.filters.included_groups, vec!["apps".to_string()]);
        assert!(opts.filters.strict_kubernetes);
        assert_eq!(opts.store.target, OutputTarget::Stdout);
    }

    #[test]
    fn debug_comes_from_flag_or_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "output_dir: out\ndebug: true\n").unwrap();
        let file = load_config_file(&path).unwrap();

        let opts = Options::resolve(parse(&[]).or(file)).unwrap();
        assert!(opts.debug);

        let opts = Options::resolve(parse(&["-o", "out", "--debug"])).unwrap();
        assert!(opts.debug);
        assert!(!Options::resolve(out_dir()).unwrap().debug);
    }
}
