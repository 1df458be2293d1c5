//! Edit session demo: builds a cube, runs a short modeling session through
//! an `EditContext` and compiles the result.
//!
//! Usage:
//! ```text
//! cargo run --example edit_session
//! RUST_LOG=polyweld=debug cargo run --example edit_session
//! ```

use polyweld::compile::{RecomputeNormals, RecomputeTangents};
use polyweld::context::{EditContext, EditSettings, Selection};
use polyweld::mesh::{shapes, Edge};
use polyweld::operations::FlipNormals;
use polyweld::topology::{all_edges, BoundaryLoops, EdgeLoop};
use polyweld::{Outcome, PolyweldError};

fn report<T>(step: &str, outcome: &Outcome<T>) {
    match outcome.declined() {
        Some(reason) => tracing::warn!(step, %reason, "declined"),
        None => tracing::info!(step, "applied"),
    }
}

fn main() -> Result<(), PolyweldError> {
    // Default: WARN for everything, INFO for polyweld.
    // Override with RUST_LOG env var (e.g. RUST_LOG=polyweld=debug).
    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing_subscriber::filter::LevelFilter::WARN.into())
        .add_directive("edit_session=info".parse().unwrap_or_default())
        .add_directive("polyweld=info".parse().unwrap_or_default());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let context = EditContext::new(EditSettings {
        extrude_distance: 0.25,
        ..EditSettings::default()
    });
    let mut mesh = shapes::cube(1.0);

    // Pull the top up, then cut a loop around the sides.
    let extruded = context.extrude(&mut mesh, &Selection::Faces(vec![4]))?;
    report("extrude top", &extruded);
    let looped = EdgeLoop::new(&[Edge::new(0, 1)]).execute(&mesh)?;
    report("select loop", &looped);
    let connected = context.connect(&mut mesh, &Selection::Edges(vec![Edge::new(0, 3), Edge::new(1, 2)]))?;
    report("connect", &connected);

    // Open a hole and look at its border.
    let deleted = context.delete(&mut mesh, &Selection::Faces(vec![1]))?;
    report("delete back", &deleted);
    let loops = BoundaryLoops::new().execute(&mesh);
    tracing::info!(loops = loops.len(), edges = all_edges(&mesh).len(), "boundary");

    let flipped = FlipNormals::new(&[0]).execute(&mut mesh)?;
    report("flip front", &flipped);
    let _ = FlipNormals::new(&[0]).execute(&mut mesh)?;

    RecomputeNormals::new().execute(&mut mesh)?;
    RecomputeTangents::new().execute(&mut mesh)?;
    for (i, piece) in context.compile(&mesh)?.iter().enumerate() {
        tracing::info!(
            piece = i,
            vertices = piece.compiled.vertex_count(),
            triangles = piece.compiled.triangle_count(),
            submeshes = piece.compiled.submeshes.len(),
            position_groups = piece.mesh.shared_vertices().len(),
            "compiled"
        );
    }
    Ok(())
}
