//! CLI-level tests driving the compiled binary.

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;

fn write_sample(name: &str, contents: &str) -> std::path::PathBuf {
    let path = std::env::temp_dir().join(name);
    let mut file = std::fs::File::create(&path).expect("create sample source");
    file.write_all(contents.as_bytes()).expect("write sample source");
    path
}

#[test]
fn compile_prints_javascript() {
    let path = write_sample(
        "yantra_cli_compile.clj",
        "(ns app)\n(def main (fn [] (js/console.log \"hi\")))",
    );
    Command::cargo_bin("yantra")
        .unwrap()
        .arg("compile")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("RT.ns(\"app\");"))
        .stdout(predicate::str::contains(
            "app.main = function () {\nreturn console.log(\"hi\");\n};",
        ));
}

#[test]
fn expand_prints_expanded_forms() {
    let path = write_sample("yantra_cli_expand.clj", "(Foo. 1)");
    Command::cargo_bin("yantra")
        .unwrap()
        .arg("expand")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("(new Foo 1)"));
}

#[test]
fn ast_prints_json() {
    let path = write_sample("yantra_cli_ast.clj", "(def x 1)");
    Command::cargo_bin("yantra")
        .unwrap()
        .arg("ast")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"Def\""));
}

#[test]
fn missing_files_fail_with_an_io_error() {
    Command::cargo_bin("yantra")
        .unwrap()
        .arg("compile")
        .arg("no-such-file.clj")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read"));
}

#[test]
fn malformed_source_fails() {
    let path = write_sample("yantra_cli_broken.clj", "(recur 1)");
    Command::cargo_bin("yantra")
        .unwrap()
        .arg("compile")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("recur"));
}
