use criterion::{Criterion, criterion_group, criterion_main};
use gvend::graph::{
    self, ImportTable, Package, PackageLoader, PackageLocation, PackageRoot, scan,
};
use gvend::manifest::{Dependency, Manifest};
use std::collections::HashMap;
use std::hint::black_box;
use std::path::PathBuf;

/// A layered graph: every package imports a handful of packages from the
/// layer below, and the bottom layer imports a few paths nobody provides.
struct LayeredLoader {
    graph: HashMap<String, Vec<String>>,
}

impl LayeredLoader {
    fn new(layers: usize, width: usize) -> Self {
        let name = |layer: usize, i: usize| format!("example.com/l{}/p{}", layer, i);
        let mut graph = HashMap::new();
        for layer in 0..layers {
            for i in 0..width {
                let imports = if layer + 1 == layers {
                    vec![format!("missing.org/m{}", i % 4), "C".to_string()]
                } else {
                    (0..4).map(|k| name(layer + 1, (i + k) % width)).collect()
                };
                graph.insert(name(layer, i), imports);
            }
        }
        Self { graph }
    }
}

impl PackageLoader for LayeredLoader {
    fn discover(&self, root: &PackageRoot) -> gvend::Result<Vec<PackageLocation>> {
        Ok(self
            .graph
            .keys()
            .map(|p| PackageLocation {
                import_path: p.clone(),
                dir: root.dir.join(p),
            })
            .collect())
    }

    fn load(&self, location: &PackageLocation) -> gvend::Result<Package> {
        Ok(Package {
            import_path: location.import_path.clone(),
            imports: self.graph[&location.import_path].clone(),
        })
    }
}

const SOURCE: &str = r#"// Package demo does things.
package demo

import (
	"fmt"
	"os"
	str "strings"

	_ "github.com/lib/pq"
	. "example.com/dot"
)

import "C"

func main() { fmt.Println(os.Args, str.ToUpper("x")) }
"#;

fn bench_find_missing(c: &mut Criterion) {
    let loader = LayeredLoader::new(8, 64);
    let roots = [PackageRoot::new(PathBuf::from("/src"), "")];
    let table = ImportTable::build(&roots, &loader).unwrap();
    let targets: Vec<String> = (0..64).map(|i| format!("example.com/l0/p{}", i)).collect();

    c.bench_function("find_missing_layered", |b| {
        b.iter(|| graph::find_missing(black_box(&targets), &table, &loader))
    });
}

fn bench_parse_imports(c: &mut Criterion) {
    c.bench_function("parse_imports", |b| {
        b.iter(|| scan::parse_imports(black_box(SOURCE)))
    });
}

fn bench_manifest_insert(c: &mut Criterion) {
    c.bench_function("manifest_add_500", |b| {
        b.iter(|| {
            let mut manifest = Manifest::default();
            for i in (0..500).rev() {
                manifest
                    .add_dependency(Dependency {
                        importpath: format!("github.com/org{}/repo", i),
                        repository: format!("https://github.com/org{}/repo", i),
                        revision: "0000000000000000000000000000000000000000".to_string(),
                        branch: String::new(),
                        path: String::new(),
                    })
                    .unwrap();
            }
            manifest
        })
    });
}

criterion_group!(
    benches,
    bench_find_missing,
    bench_parse_imports,
    bench_manifest_insert
);
criterion_main!(benches);
