//! A generation run: scripts, staged files and edit paths.
//!
//! ```text
//! FilesEditor::enter(files, overlay)          Idle ──► Active
//!     │
//!     ├── run_script(runner, "a.rhai")        Running ──► Done
//!     ├── run_script(runner, "b.rhai")        Running ──► Failed ─┐
//!     │                                                           │
//!     └── finish()  ◄─────────────────────────────────────────────┘
//!             │                               Finalizing ──► Closed
//!             └── reconcile(files, overlay) ──► EditorOutput
//! ```
//!
//! Only one editor can be active in the process at a time.

use crate::{
    edit::EditPathRegistry,
    error::{GenFilesError, Result},
    files::Files,
    log,
    overlay::{LogicalPath, OpenMode, OverlayDirectory, VirtualFile},
    reconcile::reconcile,
    script::{ScriptEnd, ScriptRunner},
};
use parking_lot::Mutex;
use std::{
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

/// Set while a `FilesEditor` exists.
static ACTIVE: AtomicBool = AtomicBool::new(false);

/// Releases the process-wide activation flag on drop.
#[derive(Debug)]
struct ActiveGuard(());

impl ActiveGuard {
    fn acquire() -> Result<Self> {
        ACTIVE
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| Self(()))
            .map_err(|_| GenFilesError::AlreadyActive)
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        ACTIVE.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug)]
struct RunState {
    overlay: OverlayDirectory,
    /// The host's collection as it was before the run
    files: Files,
    edit_paths: EditPathRegistry,
    /// First fatal error raised through the API, even if a script caught it
    fatal: Option<GenFilesError>,
}

impl RunState {
    fn check<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(GenFilesError::PathEscape(path)) = &result {
            self.fatal
                .get_or_insert_with(|| GenFilesError::PathEscape(path.clone()));
        }
        result
    }
}

/// File API of a running generation, handed to scripts.
///
/// Cheap to clone; all clones share the same run.
#[derive(Debug, Clone)]
pub struct ScriptContext {
    state: Arc<Mutex<RunState>>,
}

impl ScriptContext {
    /// Open `path` in `mode` (see [`OverlayDirectory::open`]).
    pub fn open(&self, path: &str, mode: OpenMode) -> Result<VirtualFile> {
        let mut state = self.state.lock();
        let RunState { overlay, files, .. } = &mut *state;
        let result = overlay.open(path, mode, files);
        state.check(result)
    }

    pub fn read_text(&self, path: &str) -> Result<String> {
        self.open(path, OpenMode::READ)?.read_text()
    }

    pub fn read_bytes(&self, path: &str) -> Result<Vec<u8>> {
        self.open(path, OpenMode::parse("rb")?)?.read_bytes()
    }

    /// Replace the content of `path`.
    pub fn write_text(&self, path: &str, text: &str) -> Result<()> {
        self.open(path, OpenMode::WRITE)?.write_text(text)
    }

    pub fn write_bytes(&self, path: &str, bytes: &[u8]) -> Result<()> {
        self.open(path, OpenMode::parse("wb")?)?.write_bytes(bytes)
    }

    /// Append to `path`, starting from the real file's content if there is one.
    pub fn append_text(&self, path: &str, text: &str) -> Result<()> {
        self.open(path, OpenMode::APPEND)?.write_text(text)
    }

    pub fn exists(&self, path: &str) -> Result<bool> {
        let mut state = self.state.lock();
        let result = state.overlay.exists(path, &state.files);
        state.check(result)
    }

    /// Record where the page at `path` is really authored.
    ///
    /// `None` disables the edit link for that page.
    pub fn set_edit_path(&self, path: &str, edit_path: Option<&str>) -> Result<()> {
        let mut state = self.state.lock();
        let result = LogicalPath::parse(path);
        let path = state.check(result)?;
        let edit_path = edit_path.map(|p| p.replace('\\', "/"));
        state.edit_paths.set(path, edit_path);
        Ok(())
    }

    fn take_fatal(&self) -> Option<GenFilesError> {
        self.state.lock().fatal.take()
    }
}

/// Result of a finished run.
#[derive(Debug)]
pub struct EditorOutput {
    /// Host files merged with everything the scripts wrote
    pub files: Files,
    pub edit_paths: EditPathRegistry,
    /// Staging directory backing the generated entries of `files`
    pub overlay: OverlayDirectory,
}

/// An active generation run.
///
/// Callers must call [`FilesEditor::finish`] after the scripts, whether
/// they succeeded or not; dropping the editor without finishing discards
/// the run and releases the activation flag.
#[derive(Debug)]
pub struct FilesEditor {
    ctx: ScriptContext,
    _active: ActiveGuard,
}

impl FilesEditor {
    /// Start a run over the host's `files`, staging into `overlay`.
    pub fn enter(files: Files, overlay: OverlayDirectory) -> Result<Self> {
        let active = ActiveGuard::acquire()?;
        let state = RunState {
            overlay,
            files,
            edit_paths: EditPathRegistry::default(),
            fatal: None,
        };
        Ok(Self {
            ctx: ScriptContext {
                state: Arc::new(Mutex::new(state)),
            },
            _active: active,
        })
    }

    pub fn context(&self) -> &ScriptContext {
        &self.ctx
    }

    /// Run one script with `runner`.
    ///
    /// `exit(0)` (or any falsy value) counts as success, any other exit
    /// value is a `ScriptExit` error naming the script. Other script errors
    /// are returned unchanged.
    pub fn run_script(&mut self, runner: &dyn ScriptRunner, script: &Path) -> Result<()> {
        log!("gen_files"; "running {}", script.display());
        let outcome = runner.run(script, self.ctx.clone());

        if let Some(fatal) = self.ctx.take_fatal() {
            return Err(fatal);
        }

        match outcome {
            Ok(ScriptEnd::Completed) => Ok(()),
            Ok(ScriptEnd::Exit(status)) if !status.is_failure() => Ok(()),
            Ok(ScriptEnd::Exit(status)) => Err(GenFilesError::ScriptExit {
                script: script.to_path_buf(),
                status: status.to_string(),
            }),
            Err(err) => Err(GenFilesError::ScriptRuntime(err)),
        }
    }

    /// Merge the staged files into the host collection and close the run.
    pub fn finish(self) -> Result<EditorOutput> {
        let Self { ctx, _active } = self;
        let state = Arc::try_unwrap(ctx.state)
            .map_err(|_| GenFilesError::StillInUse)?
            .into_inner();

        let files = reconcile(state.files, &state.overlay);
        log!(
            "gen_files"; "{} generated files, {} edit paths",
            state.overlay.touched().len(),
            state.edit_paths.len()
        );

        Ok(EditorOutput {
            files,
            edit_paths: state.edit_paths,
            overlay: state.overlay,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        script::{ExitStatus, RhaiRunner},
        test_support::serial,
    };
    use std::{fs, path::PathBuf};
    use tempfile::TempDir;

    struct Fixture {
        docs: TempDir,
        staging: TempDir,
        scripts: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let fixture = Self {
                docs: TempDir::new().unwrap(),
                staging: TempDir::new().unwrap(),
                scripts: TempDir::new().unwrap(),
            };
            fs::write(fixture.docs.path().join("index.md"), "# Home\n").unwrap();
            fs::write(fixture.docs.path().join("about.md"), "# About\n").unwrap();
            fixture
        }

        fn host(&self) -> Files {
            Files::scan(self.docs.path()).unwrap()
        }

        fn editor(&self) -> FilesEditor {
            let overlay = OverlayDirectory::persistent(self.staging.path()).unwrap();
            FilesEditor::enter(self.host(), overlay).unwrap()
        }

        fn script(&self, name: &str, source: &str) -> PathBuf {
            let path = self.scripts.path().join(name);
            fs::write(&path, source).unwrap();
            path
        }
    }

    fn read(files: &Files, path: &str) -> String {
        fs::read_to_string(&files.get(path).unwrap().abs_src_path).unwrap()
    }

    fn names(files: &Files) -> Vec<String> {
        files.iter().map(|f| f.src_uri.clone()).collect()
    }

    #[test]
    fn test_only_one_active_editor() {
        let _lock = serial();
        let fixture = Fixture::new();
        let editor = fixture.editor();

        let overlay = OverlayDirectory::temporary(true).unwrap();
        assert!(matches!(
            FilesEditor::enter(Files::default(), overlay),
            Err(GenFilesError::AlreadyActive)
        ));

        drop(editor);
        let overlay = OverlayDirectory::temporary(true).unwrap();
        assert!(FilesEditor::enter(Files::default(), overlay).is_ok());
    }

    #[test]
    fn test_script_writes_are_reconciled() {
        let _lock = serial();
        let fixture = Fixture::new();
        let script = fixture.script(
            "gen.rhai",
            r##"
                let f = open("reference/api.md", "w");
                f.write("# API\n");
                f.close();
                write_file("index.md", "# Generated home\n");
                write_file("reference/api.md", "# API v2\n");
                append_file("about.md", "more\n");
            "##,
        );

        let mut editor = fixture.editor();
        editor.run_script(&RhaiRunner, &script).unwrap();
        let output = editor.finish().unwrap();

        assert_eq!(names(&output.files), ["about.md", "index.md", "reference/api.md"]);
        assert_eq!(read(&output.files, "reference/api.md"), "# API v2\n");
        assert_eq!(read(&output.files, "index.md"), "# Generated home\n");
        assert_eq!(read(&output.files, "about.md"), "# About\nmore\n");
        assert!(output.files.iter().all(|f| f.generated));

        // the real sources are untouched
        assert_eq!(fs::read_to_string(fixture.docs.path().join("index.md")).unwrap(), "# Home\n");
    }

    #[test]
    fn test_untouched_entries_are_identical() {
        let _lock = serial();
        let fixture = Fixture::new();
        let script = fixture.script("gen.rhai", r#"write_file("new.md", "x");"#);
        let host = fixture.host();

        let mut editor = fixture.editor();
        editor.run_script(&RhaiRunner, &script).unwrap();
        let output = editor.finish().unwrap();

        assert_eq!(output.files.get("about.md"), host.get("about.md"));
        assert_eq!(output.files.get("index.md"), host.get("index.md"));
        assert_eq!(names(&output.files), ["about.md", "index.md", "new.md"]);
    }

    #[test]
    fn test_scripts_read_through_overlay() {
        let _lock = serial();
        let fixture = Fixture::new();
        let first = fixture.script("first.rhai", r#"write_file("data.txt", "42");"#);
        let second = fixture.script(
            "second.rhai",
            r#"
                let home = read_file("index.md");
                let data = open("data.txt").read();
                write_file("summary.md", home + data);
                if !exists("data.txt") || exists("nope.md") { exit(3); }
            "#,
        );

        let mut editor = fixture.editor();
        editor.run_script(&RhaiRunner, &first).unwrap();
        editor.run_script(&RhaiRunner, &second).unwrap();
        let output = editor.finish().unwrap();

        assert_eq!(read(&output.files, "summary.md"), "# Home\n42");
    }

    #[test]
    fn test_exit_zero_is_success() {
        let _lock = serial();
        let fixture = Fixture::new();
        let script = fixture.script(
            "gen.rhai",
            r#"
                write_file("done.md", "ok");
                exit(0);
                write_file("never.md", "no");
            "#,
        );

        let mut editor = fixture.editor();
        editor.run_script(&RhaiRunner, &script).unwrap();
        let output = editor.finish().unwrap();

        assert!(output.files.get("done.md").is_some());
        assert!(output.files.get("never.md").is_none());
    }

    #[test]
    fn test_exit_without_value_is_success() {
        let _lock = serial();
        let fixture = Fixture::new();
        let script = fixture.script("gen.rhai", "fn stop() { exit(); } stop(); write_file(\"x.md\", \"\");");

        let mut editor = fixture.editor();
        assert!(editor.run_script(&RhaiRunner, &script).is_ok());
        let output = editor.finish().unwrap();
        assert!(output.files.get("x.md").is_none());
    }

    #[test]
    fn test_exit_nonzero_names_script_and_still_reconciles() {
        let _lock = serial();
        let fixture = Fixture::new();
        let script = fixture.script(
            "broken.rhai",
            r#"
                write_file("partial.md", "half");
                exit(2);
            "#,
        );

        let mut editor = fixture.editor();
        let err = editor.run_script(&RhaiRunner, &script).unwrap_err();
        match &err {
            GenFilesError::ScriptExit { script: name, status } => {
                assert_eq!(name, &script);
                assert_eq!(status, "2");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("broken.rhai"));

        let output = editor.finish().unwrap();
        assert_eq!(read(&output.files, "partial.md"), "half");
    }

    #[test]
    fn test_runtime_error_propagates_unchanged() {
        let _lock = serial();
        let fixture = Fixture::new();
        let script = fixture.script("bad.rhai", "write_file(\"a.md\", \"a\");\nlet x = undefined_var + 1;");

        let mut editor = fixture.editor();
        let err = editor.run_script(&RhaiRunner, &script).unwrap_err();
        assert!(matches!(err, GenFilesError::ScriptRuntime(_)));
        assert!(err.to_string().contains("undefined_var"));

        let output = editor.finish().unwrap();
        assert!(output.files.get("a.md").is_some());
    }

    #[test]
    fn test_path_escape_is_fatal_even_when_caught() {
        let _lock = serial();
        let fixture = Fixture::new();
        let script = fixture.script(
            "escape.rhai",
            r#"
                try {
                    write_file("../../etc/passwd", "root");
                } catch (err) {
                    print(err);
                }
            "#,
        );
        let host = fixture.host();

        let mut editor = fixture.editor();
        let err = editor.run_script(&RhaiRunner, &script).unwrap_err();
        assert!(matches!(err, GenFilesError::PathEscape(_)));

        let output = editor.finish().unwrap();
        assert_eq!(output.files, host);
        assert!(output.overlay.touched().is_empty());
        assert_eq!(fs::read_dir(fixture.staging.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_set_edit_path() {
        let _lock = serial();
        let fixture = Fixture::new();
        let script = fixture.script(
            "gen.rhai",
            r##"
                write_file("api/index.md", "# API");
                set_edit_path("api/index.md", "gen\\api.rhai");
                set_edit_path("./about.md", ());
            "##,
        );

        let mut editor = fixture.editor();
        editor.run_script(&RhaiRunner, &script).unwrap();
        let output = editor.finish().unwrap();

        assert_eq!(output.edit_paths.get("api/index.md"), Some(Some("gen/api.rhai")));
        assert_eq!(output.edit_paths.get("about.md"), Some(None));
        assert_eq!(output.edit_paths.get("index.md"), None);
    }

    #[test]
    fn test_rust_callers_share_the_context() {
        let _lock = serial();
        let fixture = Fixture::new();
        let editor = fixture.editor();
        let ctx = editor.context().clone();

        ctx.write_text("b.md", "b").unwrap();
        ctx.write_bytes("img/a.bin", &[1, 2, 3]).unwrap();
        assert_eq!(ctx.read_bytes("img/a.bin").unwrap(), [1, 2, 3]);
        drop(ctx);

        let output = editor.finish().unwrap();
        assert_eq!(names(&output.files), ["about.md", "index.md", "b.md", "img/a.bin"]);
    }

    #[test]
    fn test_finish_fails_while_handles_are_alive() {
        let _lock = serial();
        let fixture = Fixture::new();
        let editor = fixture.editor();
        let ctx = editor.context().clone();

        assert!(matches!(editor.finish(), Err(GenFilesError::StillInUse)));
        drop(ctx);
        assert!(!ACTIVE.load(Ordering::SeqCst));
    }

    #[test]
    fn test_idempotent_runs() {
        let _lock = serial();
        let fixture = Fixture::new();
        let script = fixture.script(
            "gen.rhai",
            r##"
                for i in 0..3 { write_file(`page${i}.md`, `# Page ${i}`); }
                write_file("about.md", "# Generated about");
            "##,
        );

        let mut runs = Vec::new();
        for _ in 0..2 {
            let mut editor = fixture.editor();
            editor.run_script(&RhaiRunner, &script).unwrap();
            let output = editor.finish().unwrap();
            let contents: Vec<_> = output
                .files
                .iter()
                .map(|f| (f.src_uri.clone(), fs::read_to_string(&f.abs_src_path).unwrap()))
                .collect();
            runs.push((output.files, contents));
        }
        assert_eq!(runs[0], runs[1]);
    }

    struct StubRunner(ScriptEnd);

    impl ScriptRunner for StubRunner {
        fn run(&self, _: &Path, ctx: ScriptContext) -> anyhow::Result<ScriptEnd> {
            ctx.write_text("stub.md", "stub")?;
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_custom_runner() {
        let _lock = serial();
        let fixture = Fixture::new();
        let mut editor = fixture.editor();

        let ok = StubRunner(ScriptEnd::Exit(ExitStatus::new("0", false)));
        editor.run_script(&ok, Path::new("stub")).unwrap();

        let failing = StubRunner(ScriptEnd::Exit(ExitStatus::new("'bad'", true)));
        let err = editor.run_script(&failing, Path::new("stub")).unwrap_err();
        assert!(err.to_string().contains("exit('bad')"));

        let output = editor.finish().unwrap();
        assert_eq!(output.files.get("stub.md").map(|f| f.generated), Some(true));
        assert_eq!(output.files.get("index.md").map(|f| f.generated), Some(false));
    }
}
