use std::{
    ffi::OsStr,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use proofline::{Diagnostic, File};

fn format_diagnostic(diagnostic: &Diagnostic) -> String {
    format!(
        "{:?} at {}\n{}",
        diagnostic.kind,
        diagnostic.location(),
        diagnostic
    )
}

fn fixtures() -> Vec<PathBuf> {
    let dir = Path::new("tests/proof_successes");
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => panic!("failed to read {dir:?}: {err}"),
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.extension() == Some(OsStr::new("proof")))
        .collect();
    files.sort();
    files
}

#[test]
fn proof_success_snapshots() {
    let files = fixtures();
    assert!(
        !files.is_empty(),
        "no .proof fixtures found in tests/proof_successes"
    );
    for path in files {
        let input = fs::read_to_string(&path)
            .unwrap_or_else(|err| panic!("failed to read {}: {err}", path.display()));
        let snapshot_name = path
            .file_stem()
            .expect("fixture without file_stem")
            .to_string_lossy()
            .replace('.', "_");
        let file = Arc::new(File::new(path.display().to_string(), input));
        if let Err(diagnostic) = proofline::check_file(file) {
            panic!(
                "expected {} to be valid\n{}",
                path.display(),
                format_diagnostic(&diagnostic)
            );
        }
        let formatted = format!("ok\nfixture: {}", path.display());
        insta::assert_snapshot!(snapshot_name, formatted);
    }
}

#[test]
fn process_reports_through_anyhow() {
    let file = Arc::new(File::new("<test>", "assert x == 1\nassert x == 2 # Z\n"));
    let err = proofline::process(file).expect_err("the second step is not arithmetic");
    let chain: Vec<_> = err.chain().map(|cause| cause.to_string()).collect();
    assert_eq!(chain[0], "proof check failed");
    assert!(
        chain[1].starts_with("unproved step: conjunct not proved: x == 2 at <test>:2:1"),
        "chain was: {chain:?}"
    );
}
