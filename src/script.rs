//! Running user scripts.
//!
//! Scripts are [Rhai](https://rhai.rs) programs. Each one is compiled and run
//! by a fresh engine with an empty top-level scope, and sees the generated
//! files only through the functions registered here:
//!
//! ```rhai
//! let f = open("reference/index.md", "w");
//! f.write("# Reference\n");
//! f.close();
//!
//! write_file("reference/cli.md", "# CLI\n");
//! set_edit_path("reference/cli.md", "gen/ref_pages.rhai");
//!
//! if !exists("index.md") { exit(1); }
//! ```

use crate::{
    editor::ScriptContext,
    error::GenFilesError,
    log,
    overlay::{OpenMode, VirtualFile},
};
use anyhow::Result;
use parking_lot::Mutex;
use rhai::{Blob, Dynamic, Engine, EvalAltResult, Position, Scope};
use std::{fmt, path::Path, sync::Arc};

/// How a script stopped, when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptEnd {
    /// Ran to the end
    Completed,
    /// Called `exit`
    Exit(ExitStatus),
}

/// Value a script passed to `exit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitStatus {
    display: String,
    failure: bool,
}

impl ExitStatus {
    pub fn new(display: impl Into<String>, failure: bool) -> Self {
        Self {
            display: display.into(),
            failure,
        }
    }

    /// `()`, `false`, `0`, `0.0` and `""` are success, anything else fails.
    pub fn from_value(value: &Dynamic) -> Self {
        let failure = if value.is_unit() {
            false
        } else if let Ok(flag) = value.as_bool() {
            flag
        } else if let Ok(code) = value.as_int() {
            code != 0
        } else if let Ok(code) = value.as_float() {
            code != 0.0
        } else if value.is_string() {
            value.clone().into_string().is_ok_and(|s| !s.is_empty())
        } else {
            true
        };
        Self::new(value.to_string(), failure)
    }

    pub const fn is_failure(&self) -> bool {
        self.failure
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

/// Executes one unit of user code against a generation run.
pub trait ScriptRunner {
    /// Run `script` to completion.
    ///
    /// A deliberate termination is `Ok(ScriptEnd::Exit(..))`; any other
    /// failure is returned as the script's own error.
    fn run(&self, script: &Path, ctx: ScriptContext) -> Result<ScriptEnd>;
}

/// Runs `.rhai` scripts.
#[derive(Debug, Default, Clone, Copy)]
pub struct RhaiRunner;

impl ScriptRunner for RhaiRunner {
    fn run(&self, script: &Path, ctx: ScriptContext) -> Result<ScriptEnd> {
        let exit = Arc::new(Mutex::new(None));
        let engine = create_engine(&ctx, &exit);

        let result = engine.run_file_with_scope(&mut Scope::new(), script.to_path_buf());

        if let Some(status) = exit.lock().take() {
            return Ok(ScriptEnd::Exit(status));
        }
        result.map(|()| ScriptEnd::Completed).map_err(anyhow::Error::from)
    }
}

/// File handle exposed to scripts.
#[derive(Debug, Clone)]
struct ScriptFile {
    path: String,
    file: Arc<Mutex<VirtualFile>>,
}

impl ScriptFile {
    fn new(file: VirtualFile) -> Self {
        Self {
            path: file.path().to_string(),
            file: Arc::new(Mutex::new(file)),
        }
    }
}

type RhaiResult<T> = Result<T, Box<EvalAltResult>>;

fn to_rhai(err: GenFilesError) -> Box<EvalAltResult> {
    err.to_string().into()
}

/// Create an engine with the generation API bound to `ctx`.
fn create_engine(ctx: &ScriptContext, exit: &Arc<Mutex<Option<ExitStatus>>>) -> Engine {
    let mut engine = Engine::new();

    engine.on_print(|text| log!("script"; "{}", text));
    engine.on_debug(|text, source, pos| match source {
        Some(source) => log!("script"; "{} @ {}: {}", source, pos, text),
        None => log!("script"; "{}: {}", pos, text),
    });

    register_file_type(&mut engine);

    // open(path) / open(path, mode) → File
    let c = ctx.clone();
    engine.register_fn("open", move |path: &str| -> RhaiResult<ScriptFile> {
        c.open(path, OpenMode::READ).map(ScriptFile::new).map_err(to_rhai)
    });
    let c = ctx.clone();
    engine.register_fn("open", move |path: &str, mode: &str| -> RhaiResult<ScriptFile> {
        let mode = OpenMode::parse(mode).map_err(to_rhai)?;
        c.open(path, mode).map(ScriptFile::new).map_err(to_rhai)
    });

    let c = ctx.clone();
    engine.register_fn("read_file", move |path: &str| -> RhaiResult<String> {
        c.read_text(path).map_err(to_rhai)
    });
    let c = ctx.clone();
    engine.register_fn("write_file", move |path: &str, text: &str| -> RhaiResult<()> {
        c.write_text(path, text).map_err(to_rhai)
    });
    let c = ctx.clone();
    engine.register_fn("write_file", move |path: &str, bytes: Blob| -> RhaiResult<()> {
        c.write_bytes(path, &bytes).map_err(to_rhai)
    });
    let c = ctx.clone();
    engine.register_fn("append_file", move |path: &str, text: &str| -> RhaiResult<()> {
        c.append_text(path, text).map_err(to_rhai)
    });
    let c = ctx.clone();
    engine.register_fn("exists", move |path: &str| -> RhaiResult<bool> {
        c.exists(path).map_err(to_rhai)
    });

    // set_edit_path(path, "src/x.py") records a source, set_edit_path(path, ()) disables the link
    let c = ctx.clone();
    engine.register_fn("set_edit_path", move |path: &str, edit: &str| -> RhaiResult<()> {
        c.set_edit_path(path, Some(edit)).map_err(to_rhai)
    });
    let c = ctx.clone();
    engine.register_fn("set_edit_path", move |path: &str, _: ()| -> RhaiResult<()> {
        c.set_edit_path(path, None).map_err(to_rhai)
    });

    let e = exit.clone();
    engine.register_fn("exit", move || -> RhaiResult<()> {
        request_exit(&e, Dynamic::UNIT)
    });
    let e = exit.clone();
    engine.register_fn("exit", move |value: Dynamic| -> RhaiResult<()> {
        request_exit(&e, value)
    });

    engine
}

/// Record the exit request and stop the script.
fn request_exit(exit: &Mutex<Option<ExitStatus>>, value: Dynamic) -> RhaiResult<()> {
    exit.lock().get_or_insert_with(|| ExitStatus::from_value(&value));
    Err(EvalAltResult::ErrorTerminated(value, Position::NONE).into())
}

fn register_file_type(engine: &mut Engine) {
    engine
        .register_type_with_name::<ScriptFile>("File")
        .register_get("path", |f: &mut ScriptFile| f.path.clone())
        .register_fn("write", |f: &mut ScriptFile, text: &str| -> RhaiResult<()> {
            f.file.lock().write_text(text).map_err(to_rhai)
        })
        .register_fn("write", |f: &mut ScriptFile, bytes: Blob| -> RhaiResult<()> {
            f.file.lock().write_bytes(&bytes).map_err(to_rhai)
        })
        .register_fn("read", |f: &mut ScriptFile| -> RhaiResult<String> {
            f.file.lock().read_text().map_err(to_rhai)
        })
        .register_fn("read_blob", |f: &mut ScriptFile| -> RhaiResult<Blob> {
            f.file.lock().read_bytes().map_err(to_rhai)
        })
        .register_fn("rewind", |f: &mut ScriptFile| -> RhaiResult<()> {
            f.file.lock().rewind().map_err(to_rhai)
        })
        .register_fn("close", |f: &mut ScriptFile| -> RhaiResult<()> {
            f.file.lock().flush().map_err(to_rhai)
        });
}
