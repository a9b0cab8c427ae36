use painting_restoration as pr;

fn main() -> Result<(), pr::Error> {
    let restorer = pr::Restorer::new(pr::ContextEncoderConfig::new(), pr::DEFAULT_WEIGHTS_PATH)?
        // scale the model output back up to the size of the photograph
        .keep_original_size(true);

    restorer.restore_file("dataset/test/art_0.jpg", "out/04_restored.jpg")?;

    pr::Enhancer::new()
        .contrast(1.3)
        .enhance_image("out/04_restored.jpg", "out/04_enhanced.jpg")?;

    Ok(())
}
