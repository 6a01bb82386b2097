// Interactive selection session: line commands on stdin, text on stdout.
//
// Each line is one interaction. After it runs, the selection state does a
// full pass (purge stale keys, resolve, prune), so what `show` prints is
// always the resolved selection of the current dataset.

use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use labelgen_config::Settings;
use labelgen_io::{
    archive_name, generate_labels, package, read_template, validate, DataError, Dataset, InputSpec,
    Record,
};
use labelgen_selection::{
    diff_edits, Catalog, LoadOutcome, SelectionError, SelectionEvent, SelectionState,
};

use crate::generate::{group_label, load_reported, resolve_template, save_bytes};
use crate::util::{count_table, excerpt, pad_right};
use crate::{CliError, DataArgs};

const HELP: &str = "\
commands:
  groups [filter]          list groups (optionally only names containing filter)
  more | less              show more groups / back to the first page
  group <name> on|off      select or deselect a whole group
  search [text]            filter products by Code or Desc; no text clears it
  select-visible           select every product in view (all when no search)
  deselect-visible         deselect every product in view
  set <key>[,<key>] on|off change single products (pending until `apply`)
  apply | discard          keep or drop pending changes
  show [n]                 list products in view with their selection
  status                   selection summary
  reload                   read the data files again
  generate                 build the label archive from the selection
  save <path>              write the archive (a directory gets the default name)
  quit";

/// Rows printed by `show` without an explicit count.
const SHOW_DEFAULT_ROWS: usize = 50;

pub(crate) fn cmd_session(
    settings: &Settings,
    data: &DataArgs,
    template: Option<PathBuf>,
) -> Result<(), CliError> {
    let spec = data.input_spec(settings, true)?;
    let template = resolve_template(template, settings);
    let mut session = Session::open(settings, spec, template)?;

    let stdin = io::stdin();
    let stdout = io::stdout();
    session.run(stdin.lock(), stdout.lock())
}

/// Why a single command did not run. Only output failures end the session.
#[derive(Debug)]
enum StepError {
    Invalid(String),
    Io(io::Error),
}

impl From<io::Error> for StepError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<SelectionError> for StepError {
    fn from(err: SelectionError) -> Self {
        Self::Invalid(err.to_string())
    }
}

impl From<DataError> for StepError {
    fn from(err: DataError) -> Self {
        Self::Invalid(err.to_string())
    }
}

fn invalid<T>(msg: impl Into<String>) -> Result<T, StepError> {
    Err(StepError::Invalid(msg.into()))
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Last generated archive, kept until saved or replaced.
struct Archive {
    name: String,
    bytes: Vec<u8>,
    labels: usize,
    /// Resolved selection the archive was built from, pending edits included.
    selection: BTreeMap<String, bool>,
}

impl Archive {
    fn is_stale(&self, state: &SelectionState, catalog: &Catalog) -> bool {
        state.resolve(catalog).by_key != self.selection
    }
}

struct Session<'a> {
    settings: &'a Settings,
    spec: InputSpec,
    template: Option<PathBuf>,
    dataset: Dataset,
    catalog: Catalog,
    state: SelectionState,
    group_filter: String,
    groups_shown: usize,
    search: String,
    archive: Option<Archive>,
}

impl<'a> Session<'a> {
    fn open(settings: &'a Settings, spec: InputSpec, template: Option<PathBuf>) -> Result<Self, CliError> {
        let loaded = load_reported(&spec).map_err(CliError::data)?;
        let dataset = loaded.dataset;
        if dataset.is_empty() {
            return Err(CliError::empty(format!("no records in {}", dataset.source_label())));
        }

        let catalog = dataset.catalog();
        let mut state = SelectionState::new();
        state.load(dataset.fingerprint(), &catalog);

        Ok(Self {
            settings,
            spec,
            template,
            dataset,
            catalog,
            state,
            group_filter: String::new(),
            groups_shown: settings.session.groups_page_size,
            search: String::new(),
            archive: None,
        })
    }

    fn run(&mut self, input: impl BufRead, mut out: impl Write) -> Result<(), CliError> {
        writeln!(
            out,
            "{} product(s) from {}, {} group(s). Type `help` for commands.",
            self.dataset.len(),
            self.dataset.source_label(),
            self.dataset.group_counts().len()
        )?;

        for line in input.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            log::debug!("> {line}");
            match self.execute(line, &mut out) {
                Ok(Flow::Quit) => break,
                Ok(Flow::Continue) => {}
                Err(StepError::Invalid(msg)) => writeln!(out, "error: {msg}")?,
                Err(StepError::Io(e)) => return Err(e.into()),
            }
            self.state.refresh(&self.catalog);
        }
        out.flush()?;
        Ok(())
    }

    fn execute(&mut self, line: &str, out: &mut impl Write) -> Result<Flow, StepError> {
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((c, r)) => (c, r.trim()),
            None => (line, ""),
        };

        match command {
            "groups" => {
                self.group_filter = rest.to_string();
                self.groups_shown = self.settings.session.groups_page_size;
                self.print_groups(out)?;
            }
            "more" => {
                self.groups_shown += self.settings.session.groups_page_step;
                self.print_groups(out)?;
            }
            "less" => {
                self.groups_shown = self.settings.session.groups_page_size;
                self.print_groups(out)?;
            }
            "group" => self.toggle_group(rest, out)?,
            "search" => {
                self.search = rest.to_string();
                let visible = self.visible().len();
                if self.search.is_empty() {
                    writeln!(out, "search cleared: {visible} product(s) in view")?;
                } else {
                    writeln!(out, "{visible} of {} product(s) match {:?}", self.dataset.len(), self.search)?;
                }
            }
            "select-visible" => self.set_visible(true, out)?,
            "deselect-visible" => self.set_visible(false, out)?,
            "set" => self.set_items(rest, out)?,
            "apply" => {
                let pending = self.state.edits().len();
                self.state.apply(SelectionEvent::ApplyEdits, &self.catalog)?;
                writeln!(out, "applied {pending} change(s)")?;
            }
            "discard" => {
                let pending = self.state.edits().len();
                self.state.apply(SelectionEvent::DiscardEdits, &self.catalog)?;
                writeln!(out, "discarded {pending} change(s)")?;
            }
            "show" => {
                let limit = if rest.is_empty() {
                    SHOW_DEFAULT_ROWS
                } else {
                    match rest.parse::<usize>() {
                        Ok(n) => n,
                        Err(_) => return invalid(format!("`show` takes a row count, got {rest:?}")),
                    }
                };
                self.print_products(limit, out)?;
            }
            "status" => self.print_status(out)?,
            "reload" => self.reload(out)?,
            "generate" => self.generate(out)?,
            "save" => self.save(rest, out)?,
            "help" => writeln!(out, "{HELP}")?,
            "quit" | "exit" => return Ok(Flow::Quit),
            other => return invalid(format!("unknown command `{other}` (try `help`)")),
        }
        Ok(Flow::Continue)
    }

    /// Dataset indices matching the current search.
    fn visible(&self) -> Vec<usize> {
        self.dataset.search(&self.search)
    }

    fn visible_keys(&self) -> Vec<String> {
        let items = self.catalog.items();
        self.visible()
            .into_iter()
            .filter_map(|idx| items.get(idx).and_then(|item| item.stable_key()))
            .map(str::to_string)
            .collect()
    }

    fn print_groups(&self, out: &mut impl Write) -> io::Result<()> {
        let filter = self.group_filter.to_lowercase();
        let groups: Vec<(String, usize)> = self
            .dataset
            .group_counts()
            .into_iter()
            .filter(|(g, _)| filter.is_empty() || g.to_lowercase().contains(&filter))
            .collect();

        if groups.is_empty() {
            return writeln!(out, "no groups match {:?}", self.group_filter);
        }

        let shown: Vec<(String, usize)> = groups
            .iter()
            .take(self.groups_shown)
            .map(|(g, n)| {
                let mark = if self.state.is_group_selected(g) { "[x]" } else { "[ ]" };
                (format!("{mark} {}", group_label(g)), *n)
            })
            .collect();
        for line in count_table(&shown, 44) {
            writeln!(out, "{line}")?;
        }
        if groups.len() > shown.len() {
            writeln!(out, "... {} more group(s), type `more`", groups.len() - shown.len())?;
        }
        Ok(())
    }

    fn toggle_group(&mut self, args: &str, out: &mut impl Write) -> Result<(), StepError> {
        let (name, selected) = parse_switch(args, "group <name> on|off")?;
        let group = if name == group_label("") { "" } else { name };
        self.state.apply(
            SelectionEvent::ToggleGroup {
                group: group.to_string(),
                selected,
            },
            &self.catalog,
        )?;
        let summary = self.state.summary(&self.catalog);
        writeln!(
            out,
            "group {} {}: {} of {} selected",
            group_label(group),
            on_off(selected),
            summary.selected,
            summary.total
        )?;
        Ok(())
    }

    fn set_visible(&mut self, selected: bool, out: &mut impl Write) -> Result<(), StepError> {
        let keys = self.visible_keys();
        let scope = if self.search.is_empty() { "all" } else { "visible" };
        let count = keys.len();
        self.state.apply(SelectionEvent::SetVisible { keys, selected }, &self.catalog)?;
        let verb = if selected { "selected" } else { "deselected" };
        writeln!(out, "{verb} {scope} {count} product(s)")?;
        Ok(())
    }

    /// Per-product changes, applied the way an editable table reports them:
    /// the view before and after the change, compared by stable key.
    fn set_items(&mut self, args: &str, out: &mut impl Write) -> Result<(), StepError> {
        let (names, selected) = parse_switch(args, "set <key>[,<key>...] on|off")?;
        let wanted: Vec<&str> = names.split(',').map(str::trim).filter(|k| !k.is_empty()).collect();

        let resolution = self.state.resolve(&self.catalog);
        let items = self.catalog.items();
        let before: Vec<(Option<&str>, bool)> = self
            .visible()
            .into_iter()
            .map(|idx| (items[idx].stable_key(), resolution.flags[idx]))
            .collect();

        for key in &wanted {
            if !self.catalog.contains_key(key) {
                return Err(SelectionError::UnknownKey(key.to_string()).into());
            }
            if !before.iter().any(|(k, _)| *k == Some(*key)) {
                return invalid(format!("{key} is not in view (clear the search first)"));
            }
        }

        let after: Vec<(Option<&str>, bool)> = before
            .iter()
            .map(|&(k, v)| match k {
                Some(key) if wanted.contains(&key) => (k, selected),
                _ => (k, v),
            })
            .collect();
        let edits = diff_edits(before, after);

        if edits.is_empty() {
            writeln!(out, "no change")?;
            return Ok(());
        }
        for (key, value) in edits {
            self.state.apply(SelectionEvent::Edit { key, selected: value }, &self.catalog)?;
        }
        writeln!(
            out,
            "{} pending change(s); `apply` to keep them, `discard` to drop them",
            self.state.edits().len()
        )?;
        Ok(())
    }

    fn print_products(&self, limit: usize, out: &mut impl Write) -> io::Result<()> {
        let resolution = self.state.resolve(&self.catalog);
        let visible = self.visible();
        let key_field = self.dataset.key_field();

        writeln!(
            out,
            "    {} {} {} {} {} {}",
            pad_right(key_field, 14),
            pad_right("Code", 10),
            pad_right("Desc", 28),
            pad_right("Color", 10),
            pad_right("Size", 6),
            "Group"
        )?;
        for &idx in visible.iter().take(limit) {
            let record = &self.dataset.records[idx];
            let mark = if resolution.flags[idx] { 'x' } else { ' ' };
            let pending = match self.catalog.items()[idx].stable_key() {
                Some(key) if self.state.edits().contains_key(key) => '*',
                _ => ' ',
            };
            writeln!(
                out,
                "[{mark}]{pending}{} {} {} {} {} {}",
                pad_right(record.value(key_field), 14),
                pad_right(record.value("Code"), 10),
                pad_right(record.value("Desc"), 28),
                pad_right(record.value("Color"), 10),
                pad_right(record.value("Size"), 6),
                group_label(record.value("Group"))
            )?;
        }
        if visible.len() > limit {
            writeln!(out, "... {} more, use `show {}`", visible.len() - limit, visible.len())?;
        }
        Ok(())
    }

    fn print_status(&self, out: &mut impl Write) -> io::Result<()> {
        let summary = self.state.summary(&self.catalog);
        writeln!(out, "selected:  {} of {}", summary.selected, summary.total)?;
        let groups: Vec<&str> = summary.groups.iter().map(|g| group_label(g)).collect();
        writeln!(
            out,
            "groups:    {}",
            if groups.is_empty() { "(none)".to_string() } else { groups.join(", ") }
        )?;
        writeln!(out, "overrides: {}", summary.overrides)?;
        writeln!(out, "pending:   {}", summary.pending_edits)?;
        if !self.search.is_empty() {
            writeln!(out, "search:    {:?} ({} in view)", self.search, self.visible().len())?;
        }
        if let Some(archive) = &self.archive {
            let stale = if archive.is_stale(&self.state, &self.catalog) { ", selection changed since" } else { "" };
            writeln!(out, "archive:   {} ({} label(s){stale})", archive.name, archive.labels)?;
        }
        Ok(())
    }

    fn reload(&mut self, out: &mut impl Write) -> Result<(), StepError> {
        let loaded = load_reported(&self.spec)?;
        if loaded.dataset.is_empty() {
            return invalid("the data has no records now; keeping the previous load");
        }

        let catalog = loaded.dataset.catalog();
        let outcome = self.state.load(loaded.dataset.fingerprint(), &catalog);
        self.dataset = loaded.dataset;
        self.catalog = catalog;

        match outcome {
            LoadOutcome::Fresh => writeln!(out, "loaded {} product(s)", self.dataset.len())?,
            LoadOutcome::Reset => {
                self.archive = None;
                self.search.clear();
                self.group_filter.clear();
                self.groups_shown = self.settings.session.groups_page_size;
                writeln!(out, "different data ({} product(s)): selection cleared", self.dataset.len())?;
            }
            LoadOutcome::Reloaded { purged } => writeln!(
                out,
                "reloaded {} product(s); dropped {purged} choice(s) for products no longer present",
                self.dataset.len()
            )?,
        }
        Ok(())
    }

    fn generate(&mut self, out: &mut impl Write) -> Result<(), StepError> {
        let Some(template_path) = &self.template else {
            return invalid("no template; start the session with --template <FILE>");
        };
        let template = read_template(template_path)?;

        let resolution = self.state.resolve(&self.catalog);
        let selected: Vec<&Record> = resolution
            .selected_indices()
            .into_iter()
            .map(|idx| &self.dataset.records[idx])
            .collect();

        let columns: &[String] = if selected.is_empty() { &[] } else { &self.dataset.headers };
        let report = validate(&template, columns);
        if selected.is_empty() {
            return invalid("nothing selected");
        }
        if !report.is_valid {
            return invalid(format!(
                "template placeholder(s) without a column: {}",
                report.missing.join(", ")
            ));
        }
        if !report.unused.is_empty() {
            writeln!(out, "unused columns: {}", report.unused.join(", "))?;
        }

        let labels = generate_labels(&template, selected, &self.settings.output.filename_pattern, None);
        let bytes = package(&labels)?;
        let name = archive_name(labels.len());

        writeln!(out, "{} label(s) ready: {name} ({} bytes). Use `save <path>`.", labels.len(), bytes.len())?;
        if let Some(first) = labels.first() {
            writeln!(out, "--- {} ---", first.filename)?;
            writeln!(out, "{}", excerpt(&first.content, self.settings.session.preview_chars))?;
        }

        self.archive = Some(Archive {
            name,
            bytes,
            labels: labels.len(),
            selection: resolution.by_key,
        });
        Ok(())
    }

    fn save(&self, target: &str, out: &mut impl Write) -> Result<(), StepError> {
        let Some(archive) = &self.archive else {
            return invalid("nothing generated yet; run `generate` first");
        };
        if target.is_empty() {
            return invalid("usage: save <path>");
        }

        let target = Path::new(target);
        let path = if target.is_dir() || target.as_os_str().to_string_lossy().ends_with(['/', '\\']) {
            target.join(&archive.name)
        } else {
            target.to_path_buf()
        };
        save_bytes(&path, &archive.bytes).map_err(|e| StepError::Invalid(e.message))?;

        if archive.is_stale(&self.state, &self.catalog) {
            writeln!(out, "note: the selection changed after `generate`")?;
        }
        writeln!(out, "saved {} label(s) to {}", archive.labels, path.display())?;
        Ok(())
    }
}

/// Split `<target> on|off`; the target may contain spaces.
fn parse_switch<'s>(args: &'s str, usage: &str) -> Result<(&'s str, bool), StepError> {
    let Some((target, state)) = args.rsplit_once(char::is_whitespace) else {
        return invalid(format!("usage: {usage}"));
    };
    let selected = match state.to_lowercase().as_str() {
        "on" | "yes" | "true" | "1" => true,
        "off" | "no" | "false" | "0" => false,
        _ => return invalid(format!("expected on or off, got {state:?}")),
    };
    let target = target.trim();
    if target.is_empty() {
        return invalid(format!("usage: {usage}"));
    }
    Ok((target, selected))
}

fn on_off(selected: bool) -> &'static str {
    if selected {
        "on"
    } else {
        "off"
    }
}
