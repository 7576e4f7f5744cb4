use std::fs::File;
use std::io::Write;

use criterion::{criterion_group, criterion_main, Criterion};
use tempfile::tempdir;

use cprep::preprocess::preprocess_file;

fn bench_preprocess_short(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("input.c");
    File::create(&path)
        .unwrap()
        .write_all(
            b"\
#define VERSIONAR {3,5, 0, 0}
#define FOO(x  , y ) #x z x_y x##_##y
#define QUOTE(x) #x
#define DOUBLES(x,y) x##_##y
#define ADDON DOUBLES(ace, frag)

class CfgPatches {
    class ADDON{
        units[] = { };
        weapons[] = {};
        requiredVersion = 1.56;
        requiredAddons[] = {\"ace_common\"};
        author[] = {\"Nou\"}   ;
        version = QUOTE(3.5.0.0) ;versionStr=\"3.5.0.0\";
        versionAr [] = VERSIONAR;
    };
};",
        )
        .unwrap();

    c.bench_function("preprocess", |b| {
        b.iter(|| preprocess_file(&path, &[]).unwrap())
    });
}

criterion_group!(benches, bench_preprocess_short);
criterion_main!(benches);
