// Batch commands: generate, validate, groups

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use labelgen_config::Settings;
use labelgen_io::dataset::GROUP_FIELD;
use labelgen_io::{
    archive_name, generate_labels, load_joined, package, read_template, validate, write_labels,
    DataError, InputSpec, JoinStats, LoadedInput, TemplateReport,
};

use crate::util::{count_table, excerpt};
use crate::{CliError, DataArgs};

pub(crate) struct GenerateArgs {
    pub data: DataArgs,
    pub template: Option<PathBuf>,
    pub out: Option<PathBuf>,
    pub name: Option<String>,
    pub limit: Option<usize>,
    pub dry_run: bool,
    pub zip: bool,
}

/// `--template`, else the settings default.
pub(crate) fn resolve_template(explicit: Option<PathBuf>, settings: &Settings) -> Option<PathBuf> {
    explicit.or_else(|| settings.output.template.clone())
}

fn require_template(explicit: Option<PathBuf>, settings: &Settings) -> Result<PathBuf, CliError> {
    resolve_template(explicit, settings).ok_or_else(|| {
        CliError::usage("no template given")
            .with_hint("pass --template <FILE> or set output.template in settings.toml")
    })
}

pub(crate) fn print_join_stats(stats: &JoinStats) {
    eprintln!(
        "joined {} product row(s): {} with barcode, {} without",
        stats.total, stats.matched, stats.unmatched
    );
}

/// Load the input, printing join statistics before stable keys are checked
/// so the counts show even when unmatched rows fail key validation.
pub(crate) fn load_reported(spec: &InputSpec) -> Result<LoadedInput, DataError> {
    let loaded = load_joined(spec)?;
    if let Some(stats) = &loaded.join {
        print_join_stats(stats);
    }
    if spec.strict {
        loaded.validate_keys()?;
    }
    Ok(loaded)
}

pub(crate) fn warn_missing_placeholders(report: &TemplateReport) {
    if !report.missing.is_empty() {
        eprintln!(
            "warning: no column for placeholder(s): {} (left as written)",
            report.missing.join(", ")
        );
    }
}

/// Records with an empty `Group` still form a group of their own.
pub(crate) fn group_label(group: &str) -> &str {
    if group.is_empty() {
        "(no group)"
    } else {
        group
    }
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "(none)".to_string()
    } else {
        items.join(", ")
    }
}

fn write_report(out: &mut impl Write, report: &TemplateReport) -> io::Result<()> {
    writeln!(out, "placeholders: {}", list_or_none(&report.placeholders))?;
    writeln!(out, "missing:      {}", list_or_none(&report.missing))?;
    writeln!(out, "unused:       {}", list_or_none(&report.unused))?;
    Ok(())
}

// ============================================================================
// generate
// ============================================================================

pub(crate) fn cmd_generate(settings: &Settings, args: GenerateArgs) -> Result<(), CliError> {
    let template_path = require_template(args.template, settings)?;
    let template = read_template(&template_path).map_err(CliError::data)?;

    let spec = args.data.input_spec(settings, false)?;
    let loaded = load_reported(&spec).map_err(CliError::data)?;
    let dataset = loaded.dataset;
    if dataset.is_empty() {
        return Err(CliError::empty(format!("no records in {}", dataset.source_label())));
    }

    let report = validate(&template, &dataset.headers);
    warn_missing_placeholders(&report);

    let pattern = args
        .name
        .unwrap_or_else(|| settings.output.filename_pattern.clone());
    let labels = generate_labels(&template, &dataset.records, &pattern, args.limit);

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if args.dry_run {
        writeln!(out, "records:      {}", dataset.len())?;
        writeln!(out, "labels:       {}", labels.len())?;
        write_report(&mut out, &report)?;
        if let Some(first) = labels.first() {
            writeln!(out, "example file: {}", first.filename)?;
            writeln!(out, "--- {} ---", first.filename)?;
            writeln!(out, "{}", excerpt(&first.content, settings.session.preview_chars))?;
        }
        return Ok(());
    }

    let out_dir = args.out.unwrap_or_else(|| settings.output.out_dir.clone());
    if args.zip {
        let bytes = package(&labels).map_err(CliError::data)?;
        let path = out_dir.join(archive_name(labels.len()));
        save_bytes(&path, &bytes)?;
        writeln!(out, "wrote {} label(s) to {}", labels.len(), path.display())?;
    } else {
        let written = write_labels(&out_dir, &labels).map_err(CliError::data)?;
        writeln!(out, "wrote {} label(s) to {}", written.len(), out_dir.display())?;
    }
    Ok(())
}

/// Write a fully built archive, creating parent directories.
pub(crate) fn save_bytes(path: &Path, bytes: &[u8]) -> Result<(), CliError> {
    let write_err = |e: io::Error| {
        CliError::data(DataError::Write {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }
    std::fs::write(path, bytes).map_err(write_err)
}

// ============================================================================
// validate
// ============================================================================

#[derive(Serialize)]
struct ValidateOutput<'a> {
    records: usize,
    key_field: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    join: Option<JoinStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    template: Option<&'a TemplateReport>,
}

pub(crate) fn cmd_validate(
    settings: &Settings,
    data: &DataArgs,
    template: Option<PathBuf>,
    json: bool,
) -> Result<(), CliError> {
    // Template problems are reported after the data checks, but a missing
    // template file is an input error up front.
    let template = match resolve_template(template, settings) {
        Some(path) => Some(read_template(&path).map_err(CliError::data)?),
        None => None,
    };

    let spec = data.input_spec(settings, true)?;
    let loaded = load_reported(&spec).map_err(CliError::data)?;
    let dataset = &loaded.dataset;
    if dataset.is_empty() {
        return Err(CliError::empty(format!("no records in {}", dataset.source_label())));
    }

    let report = template.as_deref().map(|t| validate(t, &dataset.headers));

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if json {
        let output = ValidateOutput {
            records: dataset.len(),
            key_field: dataset.key_field(),
            join: loaded.join,
            template: report.as_ref(),
        };
        let text = serde_json::to_string_pretty(&output).map_err(|e| CliError::general(e.to_string()))?;
        writeln!(out, "{text}")?;
    } else {
        writeln!(out, "records:      {}", dataset.len())?;
        writeln!(out, "key field:    {} (all unique)", dataset.key_field())?;
        if let Some(stats) = &loaded.join {
            writeln!(
                out,
                "join:         {} matched, {} unmatched of {}",
                stats.matched, stats.unmatched, stats.total
            )?;
        }
        if let Some(report) = &report {
            write_report(&mut out, report)?;
        }
    }

    match report {
        Some(report) if !report.is_valid => Err(CliError::template(format!(
            "template placeholder(s) without a column: {}",
            report.missing.join(", ")
        ))),
        _ => Ok(()),
    }
}

// ============================================================================
// groups
// ============================================================================

#[derive(Serialize)]
struct GroupRow<'a> {
    group: &'a str,
    count: usize,
}

pub(crate) fn cmd_groups(settings: &Settings, data: &DataArgs, json: bool) -> Result<(), CliError> {
    let spec = data.input_spec(settings, false)?;
    let loaded = load_reported(&spec).map_err(CliError::data)?;
    let dataset = loaded.dataset;
    dataset.require_columns(&[GROUP_FIELD]).map_err(CliError::data)?;
    if dataset.is_empty() {
        return Err(CliError::empty(format!("no records in {}", dataset.source_label())));
    }

    let counts = dataset.group_counts();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    if json {
        let rows: Vec<GroupRow> = counts
            .iter()
            .map(|(group, count)| GroupRow { group, count: *count })
            .collect();
        let text = serde_json::to_string_pretty(&rows).map_err(|e| CliError::general(e.to_string()))?;
        writeln!(out, "{text}")?;
    } else {
        let labelled: Vec<(String, usize)> = counts
            .iter()
            .map(|(group, count)| (group_label(group).to_string(), *count))
            .collect();
        for line in count_table(&labelled, 40) {
            writeln!(out, "{line}")?;
        }
        writeln!(out, "{} group(s), {} record(s)", counts.len(), dataset.len())?;
    }
    Ok(())
}
