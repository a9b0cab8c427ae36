use painting_restoration as pr;

fn main() -> Result<(), pr::Error> {
    let report = pr::Trainer::builder()
        .dataset("dataset/train")
        .weights("weights/context_encoder.bin")
        // a handful of epochs is enough to see the loss go down, real
        // restorations need a lot more
        .epochs(3)
        .build()?
        .run(Some(Box::new(|update: pr::TrainingUpdate| {
            println!(
                "epoch {} batch {}/{} loss {:.5}",
                update.epoch + 1,
                update.batch + 1,
                update.batches,
                update.loss
            );
        })))?;

    println!("weights saved to {}", report.weights.display());
    Ok(())
}
