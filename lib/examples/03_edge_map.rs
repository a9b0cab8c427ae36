use painting_restoration as pr;

fn main() -> Result<(), pr::Error> {
    pr::EdgeDetector::new()
        // fewer, stronger strokes
        .thresholds(80.0, 200.0)
        .create_edge_map("dataset/test/art_0.jpg", "out/03_edges.jpg")?;

    Ok(())
}
