//! End-to-end runs of the staged pipeline against a recording toolchain.
//!
//! These tests lay out small sample trees in a scratch directory and check
//! the generated trees, the order of tool calls and the failure behavior.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use irstage::{
    Language, OptLevel, Pipeline, PipelineConfig, PipelineError, RecordingToolchain, StageKind,
    ToolCall,
};
use tempfile::TempDir;
use walkdir::WalkDir;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn config(root: &Path) -> PipelineConfig {
    PipelineConfig::new("clang", "opt", root.join("src"), root.join("out"))
}

/// Every file under `root`, relative and `/`-separated, with its contents.
fn snapshot(root: &Path) -> BTreeMap<String, Vec<u8>> {
    if !root.exists() {
        return BTreeMap::new();
    }
    WalkDir::new(root)
        .into_iter()
        .map(|e| e.unwrap())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let rel = e.path().strip_prefix(root).unwrap();
            let key = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            (key, fs::read(e.path()).unwrap())
        })
        .collect()
}

#[test]
fn single_source_fans_out_over_every_stage_and_level() {
    init_logging();
    let dir = TempDir::new().unwrap();
    write(dir.path(), "src/a/b.c", "int main(void) { return 0; }\n");

    let mut pipeline = Pipeline::new(config(dir.path()), RecordingToolchain::new());
    pipeline.run().unwrap();

    let files: Vec<String> = snapshot(&dir.path().join("out")).into_keys().collect();
    let mut expected = Vec::new();
    for level in 0..4 {
        expected.push(format!("asm/{level}/a/b.c.ll.s"));
        expected.push(format!("ir/{level}/a/b.c.ll"));
        expected.push(format!("ir-unoptimized/{level}/a/b.c.ll"));
        expected.push(format!("obj/{level}/a/b.c.ll.s.o"));
        expected.push(format!("programs/{level}/a/b.c.ll.s.o"));
    }
    expected.sort();
    assert_eq!(files, expected);
}

#[test]
fn emit_ir_alone_produces_one_file_per_level() {
    init_logging();
    let dir = TempDir::new().unwrap();
    write(dir.path(), "src/a/b.c", "");

    let mut pipeline = Pipeline::new(config(dir.path()), RecordingToolchain::new());
    pipeline.emit_ir().unwrap();

    let ir: Vec<String> = snapshot(&dir.path().join("out/ir")).into_keys().collect();
    assert_eq!(ir, ["0/a/b.c.ll", "1/a/b.c.ll", "2/a/b.c.ll", "3/a/b.c.ll"]);
}

#[test]
fn calls_follow_stage_then_level_then_file_order() {
    init_logging();
    let dir = TempDir::new().unwrap();
    write(dir.path(), "src/x.c", "");
    write(dir.path(), "src/y.cpp", "");

    let mut pipeline = Pipeline::new(config(dir.path()), RecordingToolchain::new());
    pipeline.run().unwrap();
    let calls = pipeline.into_invoker().take_calls();

    let names: Vec<&str> = calls.iter().map(|c| c.name()).collect();
    let mut expected = vec!["compile"; 8];
    for stage in ["optimize", "lower", "assemble", "link"] {
        expected.extend(std::iter::repeat(stage).take(8));
    }
    assert_eq!(names, expected);

    let compile_levels: Vec<(Language, u8)> = calls
        .iter()
        .filter_map(|c| match c {
            ToolCall::Compile { language, level, .. } => Some((*language, level.get())),
            _ => None,
        })
        .collect();
    assert_eq!(
        compile_levels,
        [
            (Language::C, 0),
            (Language::C, 1),
            (Language::C, 2),
            (Language::C, 3),
            (Language::Cxx, 0),
            (Language::Cxx, 1),
            (Language::Cxx, 2),
            (Language::Cxx, 3),
        ]
    );

    // Each stage consumes exactly what the previous one wrote.
    let lower_sources: Vec<&Path> = calls
        .iter()
        .filter_map(|c| match c {
            ToolCall::Lower { source, .. } => Some(source.as_path()),
            _ => None,
        })
        .collect();
    let optimize_dests: Vec<&Path> = calls
        .iter()
        .filter_map(|c| match c {
            ToolCall::Optimize { dest, .. } => Some(dest.as_path()),
            _ => None,
        })
        .collect();
    assert_eq!(lower_sources, optimize_dests);
}

#[test]
fn rerun_yields_identical_tree() {
    init_logging();
    let dir = TempDir::new().unwrap();
    write(dir.path(), "src/a/b.c", "int f(void);\n");
    write(dir.path(), "src/c.cpp", "int g();\n");

    let mut pipeline = Pipeline::new(config(dir.path()), RecordingToolchain::new());
    pipeline.run().unwrap();
    let first = snapshot(&dir.path().join("out"));

    // Stale artifacts from an older layout must not survive a run.
    write(dir.path(), "out/ir/0/stale.c.ll", "old");

    pipeline.run().unwrap();
    let second = snapshot(&dir.path().join("out"));

    assert_eq!(first, second);
    assert!(!first.is_empty());
}

#[test]
fn destination_mirrors_source_directories() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let sources = ["src/top.c", "src/one/two/three.cpp", "src/one/x.c"];
    for s in sources {
        write(dir.path(), s, "");
    }

    let mut pipeline = Pipeline::new(config(dir.path()), RecordingToolchain::new());
    pipeline.run().unwrap();

    let layout = pipeline.layout().clone();
    for level in OptLevel::ALL {
        for s in sources {
            let rel = s.strip_prefix("src/").unwrap();
            let obj = layout.obj(level).join(format!("{rel}.ll.s.o"));
            assert!(obj.is_file(), "missing {}", obj.display());
        }
    }
}

#[cfg(unix)]
#[test]
fn symlinked_sample_is_built_like_any_other() {
    init_logging();
    let dir = TempDir::new().unwrap();
    write(dir.path(), "shared/real.c", "int main(void) { return 0; }\n");
    fs::create_dir_all(dir.path().join("src")).unwrap();
    std::os::unix::fs::symlink(dir.path().join("shared/real.c"), dir.path().join("src/link.c"))
        .unwrap();

    let mut pipeline = Pipeline::new(config(dir.path()), RecordingToolchain::new());
    let stats = pipeline.run().unwrap();

    assert_eq!(stats.stage_total(StageKind::CompileC), 4);
    for level in OptLevel::ALL {
        let layout = pipeline.layout();
        assert!(layout.ir(level).join("link.c.ll").is_file());
        assert!(layout.programs(level).join("link.c.ll.s.o").is_file());
    }
}

#[test]
fn missing_source_tree_produces_nothing() {
    init_logging();
    let dir = TempDir::new().unwrap();

    let mut pipeline = Pipeline::new(config(dir.path()), RecordingToolchain::new());
    let stats = pipeline.run().unwrap();

    assert_eq!(stats.tool_invocations, 0);
    assert!(pipeline.invoker().calls().is_empty());
    assert!(snapshot(&dir.path().join("out")).is_empty());
}

#[test]
fn first_failure_aborts_the_run() {
    init_logging();
    let dir = TempDir::new().unwrap();
    write(dir.path(), "src/a.c", "");
    write(dir.path(), "src/b.c", "");

    let toolchain = RecordingToolchain::new().fail_when(|call| {
        matches!(call, ToolCall::Compile { source, level, .. }
            if source.ends_with("b.c") && level.get() == 1)
    });
    let mut pipeline = Pipeline::new(config(dir.path()), toolchain);

    let err = pipeline.run().unwrap_err();
    match &err {
        PipelineError::ToolFailed { tool, diagnostics, .. } => {
            assert_eq!(tool, "compile");
            assert!(diagnostics.contains("simulated failure"));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let calls = pipeline.invoker().calls();
    // a.c@0, b.c@0, a.c@1, then the failing b.c@1.
    assert_eq!(calls.len(), 4);
    assert!(calls.iter().all(|c| matches!(c, ToolCall::Compile { .. })));
    assert!(!dir.path().join("out/ir").exists());
}

#[test]
fn failing_link_leaves_later_levels_untouched() {
    init_logging();
    let dir = TempDir::new().unwrap();
    write(dir.path(), "src/main.c", "");

    let toolchain = RecordingToolchain::new().fail_when(|call| {
        matches!(call, ToolCall::Link { dest, .. } if dest.starts_with(link_root(dest, 2)))
    });
    let mut pipeline = Pipeline::new(config(dir.path()), toolchain);

    assert!(pipeline.run().is_err());
    assert!(dir.path().join("out/programs/1/main.c.ll.s.o").is_file());
    assert!(!dir.path().join("out/programs/3").exists());
}

/// `<out>/programs/<level>` for a destination somewhere under `<out>/programs`.
fn link_root(dest: &Path, level: u8) -> PathBuf {
    let mut root = dest.to_path_buf();
    while root.file_name().is_some_and(|n| n != "programs") {
        root.pop();
    }
    root.join(level.to_string())
}

#[cfg(unix)]
#[test]
fn linked_programs_are_executable() {
    use std::os::unix::fs::PermissionsExt;

    init_logging();
    let dir = TempDir::new().unwrap();
    write(dir.path(), "src/main.c", "");

    let mut pipeline = Pipeline::new(config(dir.path()), RecordingToolchain::new());
    let stats = pipeline.run().unwrap();
    assert_eq!(stats.stage_total(StageKind::Link), 4);

    for level in OptLevel::ALL {
        let program = pipeline.layout().programs(level).join("main.c.ll.s.o");
        let mode = fs::metadata(&program).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111, "{} not executable", program.display());

        let object = pipeline.layout().obj(level).join("main.c.ll.s.o");
        let mode = fs::metadata(&object).unwrap().permissions().mode();
        assert_eq!(mode & 0o100, 0, "{} should not be executable", object.display());
    }
}
