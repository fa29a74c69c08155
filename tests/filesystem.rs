//! Wrapped functions working against real files on disk.

#[path = "support/error.rs"]
mod error;

use std::fs;
use std::io::{self, Read};
use std::rc::Rc;

use camino::Utf8PathBuf;
use fnfn::{
    Arguments, CallError, Callable, Decorator, ErrorKind, FileHandle, Function, Signature, Value,
    wrap,
};
use rstest::{fixture, rstest};
use error::TestError;
use tempfile::TempDir;

#[fixture]
fn workspace() -> TempDir {
    TempDir::new().expect("failed to create temp dir")
}

fn path_in(dir: &TempDir, name: &str) -> Utf8PathBuf {
    Utf8PathBuf::try_from(dir.path().join(name)).expect("temp dir path not UTF-8")
}

fn reader() -> Function<String, TestError> {
    Function::new("read", Signature::new().positional("file"), |args: Arguments| {
        let file = args
            .file(0, "file")
            .ok_or_else(|| TestError::Body("no file passed".to_owned()))?;
        Ok(file.read_text()?)
    })
}

fn writer() -> Function<(), TestError> {
    Function::new(
        "write",
        Signature::new().positional("text").positional("file"),
        |args: Arguments| {
            let text = args
                .get(0)
                .and_then(Value::as_str)
                .ok_or_else(|| TestError::Body("no text passed".to_owned()))?;
            let file = args
                .file(1, "file")
                .ok_or_else(|| TestError::Body("no file passed".to_owned()))?;
            Ok(file.write_text(text)?)
        },
    )
}

fn call_value<T>(wrapper: &impl Callable<Item = T, Error = TestError>, args: Arguments) -> T {
    wrapper
        .call(args)
        .expect("call should succeed")
        .into_value()
        .expect("eager callables return values")
}

#[rstest]
fn reads_files_named_by_utf8_paths(workspace: TempDir) {
    let path = path_in(&workspace, "notes.txt");
    fs::write(&path, "first\nsecond\n").expect("failed to seed file");
    let wrapper = wrap(reader()).expect("reader has a file parameter");

    let text = call_value(&wrapper, Arguments::new().arg(path.as_path()));

    assert_eq!(text, "first\nsecond\n");
}

#[rstest]
#[case("w", "fresh", "fresh")]
#[case("a", " and more", "seed and more")]
fn writes_through_the_configured_mode(
    workspace: TempDir,
    #[case] mode: &str,
    #[case] text: &str,
    #[case] expected: &str,
) {
    let path = path_in(&workspace, "out.txt");
    fs::write(&path, "seed").expect("failed to seed file");
    let wrapper = Decorator::new()
        .filearg("file")
        .option("mode", mode)
        .apply(writer())
        .expect("writer has a file parameter");

    call_value(&wrapper, Arguments::new().arg(text).arg(path.as_str()));

    assert_eq!(fs::read_to_string(&path).expect("file readable"), expected);
}

#[rstest]
fn exclusive_mode_refuses_existing_files(workspace: TempDir) {
    let path = path_in(&workspace, "taken.txt");
    fs::write(&path, "").expect("failed to seed file");
    let wrapper = Decorator::new()
        .filearg(1)
        .option("mode", "x")
        .apply(writer())
        .expect("writer has a file parameter");

    let error = wrapper
        .call(Arguments::new().arg("data").kwarg("file", path.as_str()))
        .expect_err("the file already exists");

    match error {
        TestError::Call(CallError::Open { source, .. }) => {
            assert_eq!(source.kind(), io::ErrorKind::AlreadyExists);
        }
        other => panic!("expected an open error, got {other:?}"),
    }
}

#[rstest]
fn missing_files_report_an_io_error(workspace: TempDir) {
    let path = path_in(&workspace, "absent.txt");
    let wrapper = wrap(reader()).expect("reader has a file parameter");

    let error = wrapper
        .call(Arguments::new().arg(path.as_str()))
        .expect_err("the file does not exist");

    assert!(matches!(
        &error,
        TestError::Call(call) if call.kind() == ErrorKind::Io
    ));
    assert!(error.to_string().contains("absent.txt"));
}

#[rstest]
fn binary_unbuffered_reads_return_raw_bytes(workspace: TempDir) {
    let path = path_in(&workspace, "blob.bin");
    fs::write(&path, [0_u8, 159, 255]).expect("failed to seed file");
    let sizes = Function::new("size", Signature::new().positional("blob"), |args: Arguments| {
        let mut file = args
            .file(0, "blob")
            .cloned()
            .ok_or_else(|| TestError::Body("no file passed".to_owned()))?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        Ok::<_, TestError>(bytes)
    });
    let wrapper = Decorator::new()
        .option("mode", "rb")
        .option("buffering", 0_i64)
        .apply(sizes)
        .expect("options are valid");

    let bytes = call_value(&wrapper, Arguments::new().arg(path.as_std_path()));

    assert_eq!(bytes, [0, 159, 255]);
}

#[rstest]
fn text_options_control_decoding(workspace: TempDir) {
    let path = path_in(&workspace, "latin.txt");
    fs::write(&path, b"caf\xe9\r\nna\xefve\r\n").expect("failed to seed file");
    let wrapper = Decorator::new()
        .option("encoding", "latin-1")
        .apply(reader())
        .expect("options are valid");

    let text = call_value(&wrapper, Arguments::new().arg(path.as_str()));

    assert_eq!(text, "café\nnaïve\n");
}

#[cfg(unix)]
#[rstest]
fn byte_string_filenames_are_opened(workspace: TempDir) {
    let path = path_in(&workspace, "bytes.txt");
    fs::write(&path, "raw").expect("failed to seed file");
    let wrapper = wrap(reader()).expect("reader has a file parameter");

    let text = call_value(&wrapper, Arguments::new().arg(path.as_str().as_bytes()));

    assert_eq!(text, "raw");
}

#[rstest]
fn sequences_read_lazily_from_disk(workspace: TempDir) {
    let path = path_in(&workspace, "lines.txt");
    fs::write(&path, "one\ntwo\n").expect("failed to seed file");
    let seen = Rc::new(std::cell::RefCell::new(None::<FileHandle>));
    let record = Rc::clone(&seen);
    let lines = Function::generator(
        "lines",
        Signature::new().positional("file"),
        move |args: Arguments| {
            let handle = args.file(0, "file").cloned();
            record.replace(handle.clone());
            std::iter::from_fn(move || {
                let file = handle.as_ref()?;
                file.read_line().map_err(TestError::from).transpose()
            })
        },
    );
    let wrapper = wrap(lines).expect("lines has a file parameter");

    let mut sequence = wrapper
        .call(Arguments::new().arg(path.as_str()))
        .expect("call should succeed")
        .into_sequence()
        .expect("generators return sequences");
    fs::write(&path, "rewritten\n").expect("failed to rewrite file");
    let items = sequence
        .by_ref()
        .collect::<Result<Vec<_>, _>>()
        .expect("lines are readable");

    assert_eq!(items, ["rewritten\n"], "the file is opened on the first poll");
    let handle = seen.borrow().clone().expect("the generator ran");
    assert!(handle.is_closed());
}
