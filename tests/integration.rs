use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn fgroup_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("fgroup");
    path
}

fn setup_test_env(files: &[(&str, &str)]) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let files_dir = root.join("files");
    fs::create_dir_all(&files_dir).unwrap();
    for (name, body) in files {
        fs::write(files_dir.join(name), body).unwrap();
    }

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    let config_content = format!(
        r#"[grouping]
output_folder = "{}/grouped"
similarity_threshold = 0.5

[progress]
mode = "off"
"#,
        root.display()
    );
    let config_path = config_dir.join("fgroup.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_fgroup(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = fgroup_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run fgroup binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

fn files_dir(tmp: &TempDir) -> String {
    tmp.path().join("files").to_string_lossy().to_string()
}

/// File name -> every output subfolder that holds a copy of it.
fn placements(output: &Path) -> HashMap<String, Vec<String>> {
    let mut seen: HashMap<String, Vec<String>> = HashMap::new();
    for sub in fs::read_dir(output).unwrap() {
        let sub = sub.unwrap();
        if !sub.file_type().unwrap().is_dir() {
            continue;
        }
        let folder = sub.file_name().to_string_lossy().to_string();
        for file in fs::read_dir(sub.path()).unwrap() {
            let name = file.unwrap().file_name().to_string_lossy().to_string();
            seen.entry(name).or_default().push(folder.clone());
        }
    }
    seen
}

#[test]
fn test_group_near_duplicates() {
    let (tmp, config_path) = setup_test_env(&[
        ("fox_a.txt", "The quick brown fox jumps."),
        ("fox_b.txt", "The quick brown fox jumps over the lazy dog."),
        ("revenue.txt", "Quarterly revenue report figures."),
    ]);

    let (stdout, stderr, success) = run_fgroup(
        &config_path,
        &["group", &files_dir(&tmp), "--threshold", "0.3"],
    );
    assert!(success, "group failed: stdout={}, stderr={}", stdout, stderr);

    let result: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(result["status"], "success");
    assert_eq!(result["message"], "Grouped 1 sets of related files");
    let groups = result["groups"].as_array().unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0]["group_name"], "group_1");
    assert_eq!(groups[0]["files"], serde_json::json!(["fox_a.txt", "fox_b.txt"]));

    let output = PathBuf::from(result["output_folder"].as_str().unwrap());
    assert!(output.is_absolute());
    assert!(output.join("group_1").join("fox_b.txt").exists());
    assert!(output.join("ungrouped").join("revenue.txt").exists());
    assert!(!output.join("ungrouped").join("fox_a.txt").exists());
}

#[test]
fn test_group_empty_folder() {
    let (tmp, config_path) = setup_test_env(&[]);

    let (stdout, _, success) = run_fgroup(&config_path, &["group", &files_dir(&tmp)]);
    assert!(!success, "empty folder must exit non-zero");
    let result: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(
        result,
        serde_json::json!({
            "status": "error",
            "message": "No files found in the specified folder"
        })
    );
}

#[test]
fn test_group_unreadable_files() {
    let (tmp, config_path) = setup_test_env(&[
        ("broken.pdf", "not a valid pdf"),
        ("photo.png", "\u{89}PNG not really"),
    ]);

    let (stdout, _, success) = run_fgroup(&config_path, &["group", &files_dir(&tmp)]);
    assert!(!success);
    let result: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(result["status"], "error");
    assert_eq!(result["message"], "No readable content found in any files");
}

#[test]
fn test_group_missing_folder() {
    let (tmp, config_path) = setup_test_env(&[]);
    let missing = tmp.path().join("nowhere");

    let (stdout, _, success) =
        run_fgroup(&config_path, &["group", missing.to_str().unwrap()]);
    assert!(!success);
    let result: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(result["status"], "error");
    assert!(result["message"]
        .as_str()
        .unwrap()
        .starts_with("Error processing files:"));
    assert!(result.get("groups").is_none());
}

#[test]
fn test_group_rejects_nan_threshold() {
    let (tmp, config_path) = setup_test_env(&[("a.txt", "words"), ("b.txt", "words")]);

    let (stdout, _, success) = run_fgroup(
        &config_path,
        &["group", &files_dir(&tmp), "--threshold", "NaN"],
    );
    assert!(!success);
    let result: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(result["status"], "error");
    assert!(result["message"]
        .as_str()
        .unwrap()
        .contains("similarity threshold must be a finite number"));
    assert!(!tmp.path().join("grouped").exists());
}

#[test]
fn test_every_file_lands_exactly_once() {
    let (tmp, config_path) = setup_test_env(&[
        ("a.md", "rust cargo crates ownership"),
        ("b.md", "rust cargo crates borrowing"),
        ("c.txt", "kubernetes docker deployment"),
        ("d.txt", "kubernetes docker infrastructure"),
        ("e.csv", "date,revenue\n2024,100"),
        ("f.bin", "opaque"),
        ("g.json", "{\"note\": \"   \"}"),
    ]);
    fs::create_dir_all(tmp.path().join("files").join("nested")).unwrap();

    let (stdout, stderr, success) = run_fgroup(
        &config_path,
        &["group", &files_dir(&tmp), "--threshold", "0.2"],
    );
    assert!(success, "group failed: stdout={}, stderr={}", stdout, stderr);

    let seen = placements(&tmp.path().join("grouped"));
    let mut names: Vec<&String> = seen.keys().collect();
    names.sort();
    assert_eq!(
        names,
        vec!["a.md", "b.md", "c.txt", "d.txt", "e.csv", "f.bin", "g.json"]
    );
    for (name, folders) in &seen {
        assert_eq!(folders.len(), 1, "{} placed in {:?}", name, folders);
    }
    assert_eq!(seen["f.bin"], vec!["ungrouped"]);
}

#[test]
fn test_group_uses_config_defaults() {
    let (tmp, config_path) = setup_test_env(&[("only.txt", "a single document")]);

    let (stdout, _, success) = run_fgroup(&config_path, &["group", &files_dir(&tmp)]);
    assert!(success);
    let result: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(result["groups"], serde_json::json!([]));
    assert!(tmp
        .path()
        .join("grouped")
        .join("ungrouped")
        .join("only.txt")
        .exists());
}

#[test]
fn test_group_json_progress_on_stderr() {
    let (tmp, config_path) = setup_test_env(&[
        ("one.txt", "shared words everywhere"),
        ("two.txt", "shared words everywhere"),
    ]);

    let (stdout, stderr, success) = run_fgroup(
        &config_path,
        &["group", &files_dir(&tmp), "--progress", "json"],
    );
    assert!(success);
    // stdout stays a single JSON document
    serde_json::from_str::<serde_json::Value>(&stdout).unwrap();
    let events: Vec<serde_json::Value> = stderr
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert!(events.iter().any(|e| e["phase"] == "extracting"));
    assert!(events
        .iter()
        .any(|e| e["event"] == "group" && e["group"] == "group_1"));
}

#[test]
fn test_unknown_progress_mode_fails() {
    let (tmp, config_path) = setup_test_env(&[("one.txt", "text")]);
    let (_, stderr, success) = run_fgroup(
        &config_path,
        &["group", &files_dir(&tmp), "--progress", "loud"],
    );
    assert!(!success);
    assert!(stderr.contains("Unknown progress mode"));
}

#[test]
fn test_extract_prints_text() {
    let (tmp, config_path) = setup_test_env(&[("notes.md", "# Notes\n\nbody text\n")]);
    let file = tmp.path().join("files").join("notes.md");

    let (stdout, _, success) = run_fgroup(&config_path, &["extract", file.to_str().unwrap()]);
    assert!(success);
    assert_eq!(stdout, "# Notes\n\nbody text\n");
}

#[test]
fn test_extract_unsupported_prints_nothing() {
    let (tmp, config_path) = setup_test_env(&[("image.gif", "GIF89a")]);
    let file = tmp.path().join("files").join("image.gif");

    let (stdout, _, success) = run_fgroup(&config_path, &["extract", file.to_str().unwrap()]);
    assert!(success);
    assert!(stdout.is_empty());
}

#[test]
fn test_tools_list() {
    let (_tmp, config_path) = setup_test_env(&[]);
    let (stdout, _, success) = run_fgroup(&config_path, &["tools", "list"]);
    assert!(success);
    let catalog: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let names: Vec<&str> = catalog
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["group_related_files", "extract_text"]);
}

#[test]
fn test_tools_call_group() {
    let (tmp, config_path) = setup_test_env(&[
        ("x.txt", "identical content here"),
        ("y.txt", "identical content here"),
    ]);
    let out = tmp.path().join("via_tool");
    let folder_param = format!("folder_path={}", files_dir(&tmp));
    let output_param = format!("output_folder={}", out.display());

    let (stdout, stderr, success) = run_fgroup(
        &config_path,
        &[
            "tools",
            "call",
            "group_related_files",
            "--param",
            &folder_param,
            "--param",
            &output_param,
            "--param",
            "similarity_threshold=0.9",
        ],
    );
    assert!(success, "tools call failed: {}", stderr);
    let result: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(result["status"], "success");
    assert_eq!(result["groups"][0]["files"], serde_json::json!(["x.txt", "y.txt"]));
    assert!(out.join("group_1").join("x.txt").exists());
}

#[test]
fn test_tools_call_unknown() {
    let (_tmp, config_path) = setup_test_env(&[]);
    let (_, stderr, success) = run_fgroup(&config_path, &["tools", "call", "adjust_volume"]);
    assert!(!success);
    assert!(stderr.contains("Unknown tool"));
}
