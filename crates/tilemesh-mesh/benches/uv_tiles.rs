//! Benchmarks for per-face projection and tile snapping on large grids.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rhizome_tilemesh_mesh::{
    BlurVertexColors, DotShade, Grid, MeshSelection, Operator, UvProjectPerFace, UvSnapToTile,
};

fn grid_object(cells: u32) -> rhizome_tilemesh_mesh::MeshObject {
    Grid {
        columns: cells,
        rows: cells,
        ..Default::default()
    }
    .apply()
}

fn bench_project_per_face(c: &mut Criterion) {
    let object = grid_object(100);
    let op = UvProjectPerFace::default();
    c.bench_function("project_per_face_10000", |b| {
        b.iter(|| black_box(op.apply(&object)))
    });
}

fn bench_snap_to_tile(c: &mut Criterion) {
    let mut object = grid_object(100);
    UvProjectPerFace::default()
        .execute(&mut object)
        .expect("projection succeeds");
    let selection = MeshSelection::all(&object.mesh);
    let object = object.with_edit_mode().with_selection(selection);

    let op = UvSnapToTile {
        tile_index: 27,
        ..Default::default()
    };
    c.bench_function("snap_to_tile_10000", |b| b.iter(|| black_box(op.apply(&object))));
}

fn bench_dot_shade_and_blur(c: &mut Criterion) {
    let object = grid_object(60);
    c.bench_function("dot_shade_3600", |b| {
        b.iter(|| black_box(DotShade::default().apply(&object)))
    });

    let shaded = DotShade::default()
        .apply(&object)
        .expect("dot shade succeeds");
    let blur = BlurVertexColors { iterations: 5 };
    c.bench_function("blur_vertex_colors_5x_3600", |b| {
        b.iter(|| black_box(blur.apply(&shaded)))
    });
}

criterion_group!(
    benches,
    bench_project_per_face,
    bench_snap_to_tile,
    bench_dot_shade_and_blur
);
criterion_main!(benches);
