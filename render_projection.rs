/// Redraw a saved word projection without reloading the model
/// Usage: cargo run --bin render_projection --release -- projection.json [output.png]
use charnmt::{export::ProjectionExport, plotting};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let input = args
        .next()
        .ok_or("usage: render_projection <projection.json> [output.png|output.svg]")?;
    let output = args.next().unwrap_or_else(|| "tsne_words.png".to_string());

    println!("📊 Rendering saved projection...");
    let projection = ProjectionExport::load_json(&input)?;
    println!("📁 Loaded {} projected words from {}", projection.points.len(), input);

    plotting::plot_word_embedding(
        &projection.coordinates(),
        &projection.labels(),
        projection.title.as_deref(),
        &output,
    )?;

    println!("✅ Plot regenerated: {}", output);
    Ok(())
}
