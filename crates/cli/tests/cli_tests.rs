// Integration tests running the labelgen binary end to end.
// Run with: cargo test -p labelgen-cli --test cli_tests -- --nocapture

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

const PRODUCTS: &str = "\
Code;Desc;Color;Size;Group;Barcode
A1;Wool hat;Red;M;HATS;800001
A2;Cotton sock;Blue;L;SOCKS;800002
A3;Wool scarf;Red;U;HATS;800003
";

const TEMPLATE: &str = "<Label><Text>{{Code}} {{Desc}}</Text><Barcode>{{Barcode}}</Barcode></Label>";

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        // empty settings file keeps the user's real settings out of the tests
        fs::write(dir.path().join("settings.toml"), "").unwrap();
        fs::write(dir.path().join("label.dymo"), TEMPLATE).unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn labelgen(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_labelgen"));
        cmd.current_dir(self.dir.path());
        cmd.arg("--config").arg(self.path("settings.toml"));
        cmd
    }
}

fn run(cmd: &mut Command) -> Output {
    cmd.output().expect("run labelgen")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn exit_code(output: &Output) -> i32 {
    output.status.code().expect("exit code")
}

fn dymo_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

// ===========================================================================
// generate
// ===========================================================================

#[test]
fn generate_writes_one_file_per_record() {
    let fx = Fixture::new();
    let data = fx.write("products.csv", PRODUCTS);

    let output = run(fx.labelgen().args(["generate", "-t", "label.dymo", "-d"]).arg(&data).args(["-o", "out"]));
    assert_eq!(exit_code(&output), 0, "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("wrote 3 label(s)"));

    assert_eq!(
        dymo_files(&fx.path("out")),
        vec!["A1_Red_M.dymo", "A2_Blue_L.dymo", "A3_Red_U.dymo"]
    );
    let label = fs::read_to_string(fx.path("out/A2_Blue_L.dymo")).unwrap();
    assert_eq!(label, "<Label><Text>A2 Cotton sock</Text><Barcode>800002</Barcode></Label>");
}

#[test]
fn generate_zip_with_pattern_and_limit() {
    let fx = Fixture::new();
    let data = fx.write("products.csv", PRODUCTS);

    let output = run(fx
        .labelgen()
        .args(["generate", "-t", "label.dymo", "-d"])
        .arg(&data)
        .args(["-o", "out", "--zip", "--limit", "2", "--name", "{i}-{Code}.dymo"]));
    assert_eq!(exit_code(&output), 0, "stderr: {}", stderr(&output));

    let bytes = fs::read(fx.path("out/dymo_labels_2.zip")).unwrap();
    let mut zip = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
    let mut names: Vec<String> = zip.file_names().map(str::to_string).collect();
    names.sort();
    assert_eq!(names, vec!["1-A1.dymo", "2-A2.dymo"]);

    let mut content = String::new();
    zip.by_name("1-A1.dymo").unwrap().read_to_string(&mut content).unwrap();
    assert!(content.contains("A1 Wool hat"));
}

#[test]
fn generate_zero_limit_writes_everything() {
    let fx = Fixture::new();
    let data = fx.write("products.csv", PRODUCTS);

    let output = run(fx
        .labelgen()
        .args(["generate", "-t", "label.dymo", "-d"])
        .arg(&data)
        .args(["-o", "out", "--limit", "0"]));
    assert_eq!(exit_code(&output), 0, "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("wrote 3 label(s)"));
    assert_eq!(dymo_files(&fx.path("out")).len(), 3);
}

#[test]
fn generate_dry_run_writes_nothing() {
    let fx = Fixture::new();
    let data = fx.write("products.csv", PRODUCTS);

    let output = run(fx
        .labelgen()
        .args(["generate", "-t", "label.dymo", "-d"])
        .arg(&data)
        .args(["-o", "out", "--dry-run"]));
    assert_eq!(exit_code(&output), 0, "stderr: {}", stderr(&output));

    let out = stdout(&output);
    assert!(out.contains("example file: A1_Red_M.dymo"), "{out}");
    assert!(out.contains("unused:       Color, Group, Size"), "{out}");
    assert!(out.contains("<Text>A1 Wool hat</Text>"), "{out}");
    assert!(!fx.path("out").exists());
}

#[test]
fn generate_warns_about_missing_placeholders() {
    let fx = Fixture::new();
    let data = fx.write("products.csv", PRODUCTS);
    fx.write("price.dymo", "<Label>{{Code}} {{Price}}</Label>");

    let output = run(fx.labelgen().args(["generate", "-t", "price.dymo", "-d"]).arg(&data).args(["-o", "out"]));
    assert_eq!(exit_code(&output), 0);
    assert!(stderr(&output).contains("warning: no column for placeholder(s): Price"));
    let label = fs::read_to_string(fx.path("out/A1_Red_M.dymo")).unwrap();
    assert_eq!(label, "<Label>A1 {{Price}}</Label>");
}

#[test]
fn generate_missing_files_are_input_errors() {
    let fx = Fixture::new();
    let data = fx.write("products.csv", PRODUCTS);

    let output = run(fx.labelgen().args(["generate", "-t", "nope.dymo", "-d"]).arg(&data));
    assert_eq!(exit_code(&output), 3);
    assert!(stderr(&output).contains("error: file not found"));

    let output = run(fx.labelgen().args(["generate", "-t", "label.dymo", "-d", "missing.xlsx"]));
    assert_eq!(exit_code(&output), 3);

    let txt = fx.write("products.txt", PRODUCTS);
    let output = run(fx.labelgen().args(["generate", "-t", "label.dymo", "-d"]).arg(&txt));
    assert_eq!(exit_code(&output), 3);
    assert!(stderr(&output).contains("unsupported data format '.txt'"));
}

#[test]
fn generate_without_template_is_usage_error() {
    let fx = Fixture::new();
    let data = fx.write("products.csv", PRODUCTS);

    let output = run(fx.labelgen().args(["generate", "-d"]).arg(&data));
    assert_eq!(exit_code(&output), 2);
    assert!(stderr(&output).contains("hint:  pass --template"));
}

#[test]
fn generate_empty_data_fails() {
    let fx = Fixture::new();
    let data = fx.write("empty.csv", "Code;Desc;Color;Size;Group;Barcode\n");

    let output = run(fx.labelgen().args(["generate", "-t", "label.dymo", "-d"]).arg(&data));
    assert_eq!(exit_code(&output), 8);
    assert!(stderr(&output).contains("no records in empty.csv"));
}

#[test]
fn settings_supply_template_and_pattern() {
    let fx = Fixture::new();
    let data = fx.write("products.csv", PRODUCTS);
    fx.write(
        "settings.toml",
        "[output]\ntemplate = \"label.dymo\"\nfilename_pattern = \"{Barcode}.dymo\"\nout_dir = \"labels\"\n",
    );

    let output = run(fx.labelgen().args(["generate", "-d"]).arg(&data));
    assert_eq!(exit_code(&output), 0, "stderr: {}", stderr(&output));
    assert_eq!(
        dymo_files(&fx.path("labels")),
        vec!["800001.dymo", "800002.dymo", "800003.dymo"]
    );
}

#[test]
fn broken_settings_file_is_usage_error() {
    let fx = Fixture::new();
    let data = fx.write("products.csv", PRODUCTS);
    fx.write("settings.toml", "[input\n");

    let output = run(fx.labelgen().args(["groups", "-d"]).arg(&data));
    assert_eq!(exit_code(&output), 2);
    assert!(stderr(&output).contains("invalid settings"));
}

// ===========================================================================
// validate
// ===========================================================================

#[test]
fn validate_reports_duplicate_keys_with_rows() {
    let fx = Fixture::new();
    let data = fx.write("products.csv", &PRODUCTS.replace("800003", "800001"));

    let output = run(fx.labelgen().args(["validate", "-d"]).arg(&data));
    assert_eq!(exit_code(&output), 4);
    let err = stderr(&output);
    assert!(err.contains("\"800001\" on rows 1, 3"), "{err}");
    assert!(err.contains("hint:"), "{err}");
}

#[test]
fn validate_reports_missing_columns() {
    let fx = Fixture::new();
    let data = fx.write("products.csv", "Code;Desc\nA1;Hat\n");

    let output = run(fx.labelgen().args(["validate", "-d"]).arg(&data));
    assert_eq!(exit_code(&output), 3);
    assert!(stderr(&output).contains("missing required column(s): Color, Size, Group, Barcode"));
}

#[test]
fn validate_template_missing_placeholder() {
    let fx = Fixture::new();
    let data = fx.write("products.csv", PRODUCTS);
    fx.write("price.dymo", "<Label>{{Code}} {{Missing}}</Label>");

    let output = run(fx.labelgen().args(["validate", "-t", "price.dymo", "-d"]).arg(&data));
    assert_eq!(exit_code(&output), 5);
    assert!(stdout(&output).contains("missing:      Missing"));
}

#[test]
fn validate_two_file_mode() {
    let fx = Fixture::new();
    let data = fx.write(
        "products.csv",
        "Code,Desc,Color,Size,Group\nA1,Hat,Red,M,HATS\nA2,Sock,Blue,L,SOCKS\nA3,Scarf,Red,U,HATS\n",
    );
    let ean = fx.write("ean.csv", "Code,Barcode\nA1,800001\nA2,800002\nA3,800003\n");

    let output = run(fx.labelgen().args(["validate", "-t", "label.dymo", "-d"]).arg(&data).arg("--ean").arg(&ean));
    assert_eq!(exit_code(&output), 0, "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("join:         3 matched, 0 unmatched of 3"), "{out}");
    assert!(out.contains("key field:    Barcode"), "{out}");
}

#[test]
fn validate_join_without_key_column() {
    let fx = Fixture::new();
    let data = fx.write("products.csv", "Code,Desc,Color,Size,Group\nA1,Hat,Red,M,HATS\n");
    let ean = fx.write("ean.csv", "Sku,Barcode\nA1,800001\n");

    let output = run(fx.labelgen().args(["validate", "-d"]).arg(&data).arg("--ean").arg(&ean));
    assert_eq!(exit_code(&output), 6);
    let err = stderr(&output);
    assert!(err.contains("column 'Code' not found in ean.csv"), "{err}");
    assert!(err.contains("input.join_key"), "{err}");
}

#[test]
fn validate_with_configured_join_settings() {
    let fx = Fixture::new();
    fx.write("settings.toml", "[input]\njoin_key = \"Sku\"\nmapped_field = \"Ean13\"\n");
    let data = fx.write(
        "products.csv",
        "Sku,Code,Desc,Color,Size,Group\nS1,A1,Hat,Red,M,HATS\nS2,A2,Sock,Blue,L,SOCKS\n",
    );
    let ean = fx.write("ean.csv", "Sku,Ean13\nS1,4000001\nS2,4000002\n");

    let output = run(fx.labelgen().args(["validate", "-d"]).arg(&data).arg("--ean").arg(&ean));
    assert_eq!(exit_code(&output), 0, "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("key field:    Ean13"), "{out}");
    assert!(out.contains("join:         2 matched, 0 unmatched of 2"), "{out}");
}

#[test]
fn validate_unmatched_rows_have_no_barcode() {
    let fx = Fixture::new();
    let data = fx.write(
        "products.csv",
        "Code,Desc,Color,Size,Group\nA1,Hat,Red,M,HATS\nA2,Sock,Blue,L,SOCKS\n",
    );
    let ean = fx.write("ean.csv", "Code,Barcode\nA1,800001\n");

    let output = run(fx.labelgen().args(["validate", "-d"]).arg(&data).arg("--ean").arg(&ean));
    assert_eq!(exit_code(&output), 4);
    let err = stderr(&output);
    assert!(err.contains("joined 2 product row(s): 1 with barcode, 1 without"), "{err}");
    assert!(err.contains("1 row(s) without 'Barcode': 2"), "{err}");
}

// ===========================================================================
// groups
// ===========================================================================

#[test]
fn groups_lists_largest_first() {
    let fx = Fixture::new();
    let data = fx.write("products.csv", PRODUCTS);

    let output = run(fx.labelgen().args(["groups", "-d"]).arg(&data));
    assert_eq!(exit_code(&output), 0, "stderr: {}", stderr(&output));
    let out = stdout(&output);
    let lines: Vec<&str> = out.lines().collect();
    assert!(lines[0].starts_with("HATS"), "{out}");
    assert!(lines[1].starts_with("SOCKS"), "{out}");
    assert_eq!(lines[2], "2 group(s), 3 record(s)");
}

// ===========================================================================
// session
// ===========================================================================

fn session(fx: &Fixture, data: &Path, script: &str) -> Output {
    let mut child = fx
        .labelgen()
        .args(["session", "-t", "label.dymo", "-d"])
        .arg(data)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn labelgen session");
    if let Some(mut stdin) = child.stdin.take() {
        // the session may exit before reading (e.g. invalid data)
        let _ = stdin.write_all(script.as_bytes());
    }
    child.wait_with_output().unwrap()
}

#[test]
fn session_selects_and_saves_archive() {
    let fx = Fixture::new();
    let data = fx.write("products.csv", PRODUCTS);

    let output = session(
        &fx,
        &data,
        "group HATS on\nset 800003 off\nset 800002 on\napply\nshow\nstatus\ngenerate\nsave out/\nquit\n",
    );
    assert_eq!(exit_code(&output), 0, "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("selected:  2 of 3"), "{out}");
    assert!(out.contains("overrides: 2"), "{out}");
    assert!(out.contains("2 label(s) ready: dymo_labels_2.zip"), "{out}");

    let bytes = fs::read(fx.path("out/dymo_labels_2.zip")).unwrap();
    let zip = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
    let mut names: Vec<String> = zip.file_names().map(str::to_string).collect();
    names.sort();
    assert_eq!(names, vec!["A1_Red_M.dymo", "A2_Blue_L.dymo"]);
}

#[test]
fn session_refuses_duplicate_keys() {
    let fx = Fixture::new();
    let data = fx.write("products.csv", &PRODUCTS.replace("800002", "800001"));

    let output = session(&fx, &data, "status\n");
    assert_eq!(exit_code(&output), 4);
    assert!(stdout(&output).is_empty());
}

// ===========================================================================
// xlsx input
// ===========================================================================

#[test]
fn generate_from_named_xlsx_sheet() {
    let fx = Fixture::new();
    let path = fx.path("products.xlsx");

    let mut workbook = rust_xlsxwriter::Workbook::new();
    let notes = workbook.add_worksheet();
    notes.set_name("Notes").unwrap();
    notes.write_string(0, 0, "not product data").unwrap();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Products").unwrap();
    for (col, header) in ["Code", "Desc", "Color", "Size", "Group", "Barcode"].iter().enumerate() {
        sheet.write_string(0, col as u16, *header).unwrap();
    }
    sheet.write_string(1, 0, "A1").unwrap();
    sheet.write_string(1, 1, "Hat & cap").unwrap();
    sheet.write_string(1, 2, "Red").unwrap();
    sheet.write_number(1, 3, 42.0).unwrap();
    sheet.write_string(1, 4, "HATS").unwrap();
    sheet.write_number(1, 5, 8001234567890.0).unwrap();
    workbook.save(&path).unwrap();

    let output = run(fx
        .labelgen()
        .args(["generate", "-t", "label.dymo", "-d"])
        .arg(&path)
        .args(["--sheet", "Products", "-o", "out"]));
    assert_eq!(exit_code(&output), 0, "stderr: {}", stderr(&output));

    let label = fs::read_to_string(fx.path("out/A1_Red_42.dymo")).unwrap();
    assert_eq!(
        label,
        "<Label><Text>A1 Hat &amp; cap</Text><Barcode>8001234567890</Barcode></Label>"
    );
}
