use painting_restoration as pr;

fn main() -> Result<(), pr::Error> {
    // 20 training and 5 test images of random strokes on a sepia canvas
    pr::synth::generate_dataset("dataset", 0)
}
